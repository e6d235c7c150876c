use actix_session::Session;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::models::document;
use crate::models::meeting_item::{self, MeetingItemDetail};
use crate::models::user::PERM_ITEM_VIEW;
use crate::responses::ok;

/// GET /api/meeting-items/{id}
/// Item with board and template names, active and historical field values,
/// live documents and the status changes open to the caller.
pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_ITEM_VIEW)?;
    let id = path.into_inner();

    let mut conn = pool.acquire().await?;
    let item = meeting_item::find_by_id(&mut *conn, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let (decision_board_name, template_name) = meeting_item::find_display_names(&mut *conn, id).await?;
    let rows = meeting_item::find_field_values(&mut *conn, id).await?;
    let (active_fields, historical_fields) = meeting_item::split_field_values(rows)?;
    let documents = document::find_for_item(&mut *conn, id).await?;
    let available_transitions =
        meeting_item::available_transitions(item.status, &user, item.is_owned_by(&user.username));

    Ok(ok(MeetingItemDetail {
        item,
        decision_board_name,
        template_name,
        active_fields,
        historical_fields,
        documents,
        available_transitions,
    }))
}

/// GET /api/meeting-items/{id}/status-history
pub async fn status_history(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_ITEM_VIEW)?;
    let id = path.into_inner();

    let mut conn = pool.acquire().await?;
    meeting_item::find_by_id(&mut *conn, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let history = meeting_item::find_history(&mut *conn, id).await?;

    Ok(ok(history))
}
