use actix_session::Session;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::auth::session::require_permission;
use crate::auth::validate::{collect, validate_optional, validate_required};
use crate::errors::AppError;
use crate::models::decision_board::{self, NewDecisionBoard};
use crate::models::template;
use crate::models::user::{PERM_BOARD_MANAGE, PERM_ITEM_VIEW, PERM_TEMPLATE_VIEW};
use crate::responses::{FieldError, created, ok};

/// GET /api/decision-boards
pub async fn list(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_ITEM_VIEW)?;
    let mut conn = pool.acquire().await?;
    let boards = decision_board::find_all(&mut *conn).await?;
    Ok(ok(boards))
}

/// GET /api/decision-boards/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_ITEM_VIEW)?;
    let mut conn = pool.acquire().await?;
    let board = decision_board::find_by_id(&mut *conn, path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ok(board))
}

/// POST /api/decision-boards
pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewDecisionBoard>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_BOARD_MANAGE)?;
    let new = body.into_inner();

    let mut errors: Vec<FieldError> = Vec::new();
    collect(&mut errors, "name", validate_required(&new.name, "Name", 100));
    collect(&mut errors, "abbreviation", validate_optional(new.abbreviation.as_deref(), "Abbreviation", 10));
    collect(&mut errors, "description", validate_optional(new.description.as_deref(), "Description", 1000));

    let mut tx = pool.begin().await?;
    if errors.is_empty() && decision_board::name_taken(&mut *tx, &new.name).await? {
        errors.push(FieldError::new("name", "A decision board with this name already exists"));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let id = decision_board::create(&mut *tx, &new).await?;
    let details = serde_json::json!({
        "name": new.name.trim(),
        "summary": format!("Created decision board '{}'", new.name.trim())
    });
    crate::audit::log(&mut *tx, user.id, "decision_board.created", "decision_board", id, details).await?;
    tx.commit().await?;

    let mut conn = pool.acquire().await?;
    let board = decision_board::find_by_id(&mut *conn, id).await?.ok_or(AppError::NotFound)?;
    Ok(created(board))
}

/// GET /api/decision-boards/{id}/templates
pub async fn templates(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_TEMPLATE_VIEW)?;
    let board_id = path.into_inner();

    let mut conn = pool.acquire().await?;
    decision_board::find_by_id(&mut *conn, board_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let templates = template::find_for_board(&mut *conn, board_id).await?;
    Ok(ok(templates))
}
