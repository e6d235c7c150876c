use actix_session::Session;
use actix_web::{web, HttpResponse};
use sqlx::{PgConnection, PgPool};

use crate::auth::session::{CurrentUser, require_permission};
use crate::errors::AppError;
use crate::models::document::{self, DocumentSummary, ValidUpload};
use crate::models::meeting_item::{
    self, CreateMeetingItemRequest, CreateMeetingItemResponse, ItemStatus, ValidItemFields,
};
use crate::models::template::{self, TemplateWithFields};
use crate::models::decision_board;
use crate::models::user::{PERM_ITEM_CREATE, PERM_ITEM_DOCUMENT};
use crate::responses::{FieldError, created};
use crate::storage::BlobStore;

use super::{finish_unit_of_work, save_field_values, validate_uploads};

/// POST /api/meeting-items
/// Creates a Draft item with the session user as requestor, its dynamic
/// field values and any attached documents, in one unit of work.
pub async fn create(
    pool: web::Data<PgPool>,
    blobs: web::Data<dyn BlobStore>,
    session: Session,
    body: web::Json<CreateMeetingItemRequest>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_ITEM_CREATE)?;
    let req = body.into_inner();
    if !req.documents.is_empty() {
        user.require(PERM_ITEM_DOCUMENT)?;
    }

    let mut errors = Vec::new();
    let fields = match meeting_item::validate_item_fields(&req.fields) {
        Ok(fields) => Some(fields),
        Err(e) => {
            errors.extend(e);
            None
        }
    };
    errors.extend(meeting_item::validate_requestor(&user.username));
    let uploads = validate_uploads(&req.documents, "documents", &mut errors);

    let mut tx = pool.begin().await?;

    let template = resolve_template(&mut *tx, req.decision_board_id, req.template_id, &mut errors).await?;
    match &template {
        Some(t) => {
            errors.extend(template::validate_field_values(&t.fields, &req.field_values));
            let missing = template::missing_required(&t.fields, |d| {
                req.field_values
                    .iter()
                    .any(|v| v.field_name == d.field_name && v.value.is_filled(d.field_type))
            });
            errors.extend(template::required_errors(&missing));
        }
        None if !req.field_values.is_empty() && errors.iter().all(|e| e.field != "templateId") => {
            errors.push(FieldError::new("fieldValues", "Dynamic field values need a template"));
        }
        None => {}
    }

    let Some(fields) = fields.filter(|_| errors.is_empty()) else {
        return Err(AppError::Validation(errors));
    };

    let mut written = Vec::new();
    let result = persist(
        &mut *tx,
        blobs.get_ref(),
        &user,
        &req,
        template.as_ref(),
        &fields,
        &uploads,
        &mut written,
    )
    .await;
    let response = finish_unit_of_work(tx, blobs.get_ref(), &written, result).await?;

    log::info!(
        "Meeting item {} created by {} with {} document(s)",
        response.id,
        user.username,
        response.documents.len()
    );
    Ok(created(response))
}

/// The explicit template (must be active and on the board) or the board's default.
async fn resolve_template(
    conn: &mut PgConnection,
    board_id: i64,
    template_id: Option<i64>,
    errors: &mut Vec<FieldError>,
) -> Result<Option<TemplateWithFields>, AppError> {
    if !decision_board::exists_active(conn, board_id).await? {
        errors.push(FieldError::new("decisionBoardId", "Decision board does not exist or is inactive"));
        return Ok(None);
    }

    let Some(id) = template_id else {
        return template::find_default_for_board(conn, board_id).await;
    };
    match template::find_with_fields(conn, id).await? {
        None => errors.push(FieldError::new("templateId", "Template does not exist")),
        Some(t) if !t.template.is_active => errors.push(FieldError::new("templateId", "Template is not active")),
        Some(t) if t.template.decision_board_id != board_id => errors.push(FieldError::new(
            "templateId",
            "Template does not belong to the selected decision board",
        )),
        Some(t) => return Ok(Some(t)),
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
async fn persist(
    conn: &mut PgConnection,
    blobs: &dyn BlobStore,
    user: &CurrentUser,
    req: &CreateMeetingItemRequest,
    template: Option<&TemplateWithFields>,
    fields: &ValidItemFields,
    uploads: &[ValidUpload],
    written: &mut Vec<String>,
) -> Result<CreateMeetingItemResponse, AppError> {
    let template_id = template.map(|t| t.template.id);
    let id = meeting_item::create(conn, req.decision_board_id, template_id, fields, &user.username).await?;

    if let Some(t) = template {
        save_field_values(conn, id, &t.fields, &req.field_values).await?;
    }

    let mut documents = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let doc = document::store_document(conn, blobs, id, upload, None, &user.username, written).await?;
        documents.push(DocumentSummary::from(&doc));
    }

    let details = serde_json::json!({
        "decision_board_id": req.decision_board_id,
        "template_id": template_id,
        "documents": documents.len(),
        "summary": format!("Created meeting item '{}'", fields.topic)
    });
    crate::audit::log(conn, user.id, "meeting_item.created", "meeting_item", id, details).await?;

    Ok(CreateMeetingItemResponse {
        id,
        status: ItemStatus::Draft,
        template_id,
        documents,
    })
}
