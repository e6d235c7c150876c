use actix_session::Session;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::models::meeting_item::{self, ItemStatus, StatusChangeRequest, StatusChangeResult};
use crate::models::template;
use crate::models::user::PERM_ITEM_VIEW;
use crate::responses::ok;

use super::load_for_update;

/// PATCH /api/meeting-items/{id}/status
/// Moves an item along the workflow and appends a status history row.
pub async fn change_status(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<StatusChangeRequest>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_ITEM_VIEW)?;
    let id = path.into_inner();
    let change = meeting_item::validate_status_change(&body).map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;
    let item = load_for_update(&mut *tx, id).await?;
    let from = item.status;

    meeting_item::check_transition(from, change.status, &user, item.is_owned_by(&user.username))?;

    if from == ItemStatus::Draft {
        if let Some(template_id) = item.template_id {
            let definitions = template::find_fields(&mut *tx, template_id).await?;
            let stored = meeting_item::find_field_values(&mut *tx, id).await?;
            let missing = template::missing_required(&definitions, |d| {
                stored
                    .iter()
                    .any(|s| s.field_definition_id == d.id && s.value.is_filled(d.field_type))
            });
            if !missing.is_empty() {
                return Err(AppError::Validation(template::required_errors(&missing)));
            }
        }
    }

    meeting_item::update_status(&mut *tx, id, change.status, change.denial_reason.as_deref(), &user.username)
        .await?;
    let changed_at = meeting_item::insert_history(
        &mut *tx,
        id,
        from,
        change.status,
        change.comment.as_deref(),
        change.denial_reason.as_deref(),
        &user.username,
    )
    .await?;

    let details = serde_json::json!({
        "from": from.as_str(),
        "to": change.status.as_str(),
        "comment": change.comment,
        "summary": format!("Moved meeting item #{id} from {from} to {}", change.status)
    });
    crate::audit::log(&mut *tx, user.id, "meeting_item.status_changed", "meeting_item", id, details).await?;
    tx.commit().await?;

    log::info!("Meeting item {id}: {from} -> {} by {}", change.status, user.username);
    Ok(ok(StatusChangeResult {
        meeting_item_id: id,
        previous_status: from,
        new_status: change.status,
        changed_by: user.username,
        changed_at,
    }))
}
