use actix_session::Session;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use std::collections::HashMap;

use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::models::meeting_item::{self, ItemFilter, ItemStatus};
use crate::models::{decision_board, template};
use crate::models::user::{PERM_ITEM_VIEW, PERM_TEMPLATE_VIEW};
use crate::responses::{FieldError, PaginatedResponse, ok, page_params};

/// GET /api/meeting-items
/// Query params: decisionBoardId, status, page (default 1), per_page (default 25, max 100).
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_ITEM_VIEW)?;

    let mut errors = Vec::new();
    let decision_board_id = match query.get("decisionBoardId").or_else(|| query.get("decision_board_id")) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(FieldError::new("decisionBoardId", "Decision board id must be a number"));
                None
            }
        },
        None => None,
    };
    let status = match query.get("status").filter(|s| !s.trim().is_empty()) {
        Some(raw) => match raw.parse::<ItemStatus>() {
            Ok(status) => Some(status),
            Err(msg) => {
                errors.push(FieldError::new("status", msg));
                None
            }
        },
        None => None,
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let (page, per_page) = page_params(&query);
    let filter = ItemFilter { decision_board_id, status };

    let mut conn = pool.acquire().await?;
    let (items, total) = meeting_item::find_paginated(&mut *conn, &filter, page, per_page).await?;

    Ok(ok(PaginatedResponse { items, page, per_page, total }))
}

/// GET /api/meeting-items/decision-board/{board_id}
pub async fn by_board(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_ITEM_VIEW)?;
    let board_id = path.into_inner();

    let mut conn = pool.acquire().await?;
    decision_board::find_by_id(&mut *conn, board_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = meeting_item::find_by_board(&mut *conn, board_id).await?;

    Ok(ok(items))
}

/// GET /api/meeting-items/template/{board_id}
/// The board's default template as a form: active fields and active options only.
pub async fn form_template(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_TEMPLATE_VIEW)?;
    let board_id = path.into_inner();

    let mut conn = pool.acquire().await?;
    let template = template::find_default_for_board(&mut *conn, board_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ok(template.active_only()))
}
