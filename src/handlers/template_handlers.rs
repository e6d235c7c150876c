use actix_session::Session;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::auth::session::require_permission;
use crate::auth::validate::{collect, validate_optional, validate_required};
use crate::errors::AppError;
use crate::models::decision_board;
use crate::models::template::{self, DeactivateFieldRequest, NewFieldDefinition, NewTemplate};
use crate::models::user::{PERM_TEMPLATE_MANAGE, PERM_TEMPLATE_VIEW};
use crate::responses::{FieldError, created, ok};

/// POST /api/decision-boards/{id}/templates
/// Creates a template for the board, optionally making it the board's default.
pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<NewTemplate>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_TEMPLATE_MANAGE)?;
    let board_id = path.into_inner();
    let new = body.into_inner();

    let mut errors: Vec<FieldError> = Vec::new();
    collect(&mut errors, "name", validate_required(&new.name, "Name", 200));
    collect(&mut errors, "description", validate_optional(new.description.as_deref(), "Description", 1000));
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mut tx = pool.begin().await?;
    if !decision_board::exists_active(&mut *tx, board_id).await? {
        return Err(AppError::NotFound);
    }
    let id = template::create(&mut *tx, board_id, &new, &user.username).await?;
    if new.make_default {
        decision_board::set_default_template(&mut *tx, board_id, id).await?;
    }
    let details = serde_json::json!({
        "decision_board_id": board_id,
        "default": new.make_default,
        "summary": format!("Created template '{}'", new.name.trim())
    });
    crate::audit::log(&mut *tx, user.id, "template.created", "template", id, details).await?;
    tx.commit().await?;

    let mut conn = pool.acquire().await?;
    let template = template::find_with_fields(&mut *conn, id).await?.ok_or(AppError::NotFound)?;
    Ok(created(template))
}

/// GET /api/templates/{id}
/// The template with every field, deactivated ones included.
pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_TEMPLATE_VIEW)?;
    let mut conn = pool.acquire().await?;
    let template = template::find_with_fields(&mut *conn, path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ok(template))
}

/// POST /api/templates/{id}/fields
pub async fn add_field(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<NewFieldDefinition>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_TEMPLATE_MANAGE)?;
    let template_id = path.into_inner();
    let field = body.into_inner();

    let mut errors = template::validate_new_field(&field);

    let mut tx = pool.begin().await?;
    template::find_by_id(&mut *tx, template_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if errors.is_empty() && template::field_name_taken(&mut *tx, template_id, &field.field_name).await? {
        errors.push(FieldError::new("fieldName", "This template already has a field with that name"));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let field_id = template::add_field(&mut *tx, template_id, &field).await?;
    let details = serde_json::json!({
        "field_id": field_id,
        "field_type": field.field_type.as_str(),
        "summary": format!("Added field '{}' to template #{template_id}", field.field_name.trim())
    });
    crate::audit::log(&mut *tx, user.id, "template.field_added", "template", template_id, details).await?;
    tx.commit().await?;

    let mut conn = pool.acquire().await?;
    let template = template::find_with_fields(&mut *conn, template_id).await?.ok_or(AppError::NotFound)?;
    Ok(created(template))
}

/// POST /api/templates/{id}/fields/{field_id}/deactivate
/// Existing values stay on their items and show up as historical fields.
pub async fn deactivate_field(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<(i64, i64)>,
    body: web::Json<DeactivateFieldRequest>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_TEMPLATE_MANAGE)?;
    let (template_id, field_id) = path.into_inner();

    let mut errors = Vec::new();
    collect(&mut errors, "reason", validate_optional(body.reason.as_deref(), "Reason", 500));
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let reason = body.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());

    let mut tx = pool.begin().await?;
    if !template::deactivate_field(&mut *tx, template_id, field_id, reason).await? {
        return Err(AppError::NotFound);
    }
    let details = serde_json::json!({
        "field_id": field_id,
        "reason": reason,
        "summary": format!("Deactivated field #{field_id} on template #{template_id}")
    });
    crate::audit::log(&mut *tx, user.id, "template.field_deactivated", "template", template_id, details).await?;
    tx.commit().await?;

    log::info!("Field {field_id} on template {template_id} deactivated by {}", user.username);
    Ok(ok(serde_json::json!({ "fieldId": field_id, "isActive": false })))
}
