use actix_session::Session;
use actix_web::{web, HttpResponse};
use sqlx::{PgConnection, PgPool};

use crate::auth::session::{CurrentUser, require_permission};
use crate::errors::AppError;
use crate::models::document::{self, DocumentSummary, ValidUpload};
use crate::models::meeting_item::{
    self, ItemStatus, MeetingItem, UpdateMeetingItemRequest, UpdateMeetingItemResponse, ValidItemFields,
};
use crate::models::template::{self, FieldDefinition};
use crate::models::user::{PERM_ITEM_DOCUMENT, PERM_ITEM_UPDATE};
use crate::responses::{FieldError, ok};
use crate::storage::BlobStore;

use super::{finish_unit_of_work, load_for_update, save_field_values, validate_uploads};

struct ValidUpdate {
    fields: ValidItemFields,
    new_documents: Vec<ValidUpload>,
    versions: Vec<(i64, ValidUpload)>,
}

/// PUT /api/meeting-items/{id}
/// Updates static fields and dynamic values, then processes document
/// deletions, new uploads and new versions, all in one unit of work.
/// Only the requestor or owner/presenter may update, and never once the
/// item is Discussed or Denied. Status is not changed here.
pub async fn update(
    pool: web::Data<PgPool>,
    blobs: web::Data<dyn BlobStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<UpdateMeetingItemRequest>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_ITEM_UPDATE)?;
    let id = path.into_inner();
    let req = body.into_inner();

    if req.id.is_some_and(|body_id| body_id != id) {
        return Err(AppError::BadRequest("Meeting item id in the body does not match the URL".to_string()));
    }
    let touches_documents =
        !req.new_documents.is_empty() || !req.document_versions.is_empty() || !req.documents_to_delete.is_empty();
    if touches_documents {
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
    let new_documents = validate_uploads(&req.new_documents, "newDocuments", &mut errors);
    let mut versions = Vec::with_capacity(req.document_versions.len());
    for (i, version) in req.document_versions.iter().enumerate() {
        match document::validate_upload(&version.document, &format!("documentVersions[{i}].document")) {
            Ok(upload) => versions.push((version.base_document_id, upload)),
            Err(e) => errors.extend(e),
        }
    }

    let mut tx = pool.begin().await?;
    let item = load_for_update(&mut *tx, id).await?;

    if !item.is_owned_by(&user.username) {
        return Err(AppError::PermissionDenied(
            "Only the requestor or owner/presenter can update this meeting item".to_string(),
        ));
    }
    if !item.is_editable() {
        return Err(AppError::BadRequest(format!(
            "Meeting item cannot be updated once it is {}",
            item.status
        )));
    }

    let definitions = match item.template_id {
        Some(template_id) => template::find_fields(&mut *tx, template_id).await?,
        None => Vec::new(),
    };
    if item.template_id.is_none() && !req.field_values.is_empty() {
        errors.push(FieldError::new("fieldValues", "Dynamic field values need a template"));
    } else {
        errors.extend(template::validate_field_values(&definitions, &req.field_values));
    }
    // Items past Draft have been checked for required fields; keep it that way
    if item.status != ItemStatus::Draft {
        errors.extend(missing_after_update(&mut *tx, &item, &definitions, &req).await?);
    }

    let Some(fields) = fields.filter(|_| errors.is_empty()) else {
        return Err(AppError::Validation(errors));
    };
    let valid = ValidUpdate { fields, new_documents, versions };

    let mut written = Vec::new();
    let result = persist(&mut *tx, blobs.get_ref(), &user, &item, &definitions, &req, &valid, &mut written).await;
    let (response, removed_paths) = finish_unit_of_work(tx, blobs.get_ref(), &written, result).await?;

    // Blobs of deleted documents go only after the commit
    document::remove_blobs(blobs.get_ref(), &removed_paths).await;

    log::info!(
        "Meeting item {id} updated by {}: {} new, {} versioned, {} deleted document(s)",
        user.username,
        response.newly_uploaded_documents.len(),
        response.versioned_documents.len(),
        response.deleted_document_ids.len()
    );
    Ok(ok(response))
}

/// Required-field errors for the item's values once this update is applied.
async fn missing_after_update(
    conn: &mut PgConnection,
    item: &MeetingItem,
    definitions: &[FieldDefinition],
    req: &UpdateMeetingItemRequest,
) -> Result<Vec<FieldError>, AppError> {
    let stored = meeting_item::find_field_values(conn, item.id).await?;
    let missing = template::missing_required(definitions, |d| {
        match req.field_values.iter().find(|v| v.field_name == d.field_name) {
            Some(input) => input.value.is_filled(d.field_type),
            None => stored
                .iter()
                .any(|s| s.field_definition_id == d.id && s.value.is_filled(d.field_type)),
        }
    });
    Ok(template::required_errors(&missing))
}

#[allow(clippy::too_many_arguments)]
async fn persist(
    conn: &mut PgConnection,
    blobs: &dyn BlobStore,
    user: &CurrentUser,
    item: &MeetingItem,
    definitions: &[FieldDefinition],
    req: &UpdateMeetingItemRequest,
    valid: &ValidUpdate,
    written: &mut Vec<String>,
) -> Result<(UpdateMeetingItemResponse, Vec<String>), AppError> {
    meeting_item::update_fields(conn, item.id, &valid.fields, &user.username).await?;
    save_field_values(conn, item.id, definitions, &req.field_values).await?;

    let mut deleted_document_ids = Vec::with_capacity(req.documents_to_delete.len());
    let mut removed_paths = Vec::with_capacity(req.documents_to_delete.len());
    for doc_id in &req.documents_to_delete {
        let doc = document::delete_document(conn, item.id, *doc_id, &user.username).await?;
        deleted_document_ids.push(doc.id);
        removed_paths.push(doc.storage_path);
    }

    let mut newly_uploaded_documents = Vec::with_capacity(valid.new_documents.len());
    for (upload, raw) in valid.new_documents.iter().zip(&req.new_documents) {
        let doc = document::store_document(conn, blobs, item.id, upload, raw.base_document_id, &user.username, written)
            .await?;
        newly_uploaded_documents.push(DocumentSummary::from(&doc));
    }

    let mut versioned_documents = Vec::with_capacity(valid.versions.len());
    for (base_id, upload) in &valid.versions {
        let doc = document::store_document(conn, blobs, item.id, upload, Some(*base_id), &user.username, written)
            .await?;
        versioned_documents.push(DocumentSummary::from(&doc));
    }

    let details = serde_json::json!({
        "new_documents": newly_uploaded_documents.len(),
        "versioned_documents": versioned_documents.len(),
        "deleted_documents": deleted_document_ids,
        "summary": format!("Updated meeting item '{}'", valid.fields.topic)
    });
    crate::audit::log(conn, user.id, "meeting_item.updated", "meeting_item", item.id, details).await?;

    Ok((
        UpdateMeetingItemResponse {
            meeting_item_id: item.id,
            newly_uploaded_documents,
            versioned_documents,
            deleted_document_ids,
        },
        removed_paths,
    ))
}
