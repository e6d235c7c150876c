use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::errors::AppError;
use super::types::*;

const SELECT_TEMPLATE: &str = "SELECT id, decision_board_id, name, description, is_active, created_by, created_at \
                               FROM templates";

#[derive(sqlx::FromRow)]
struct FieldRow {
    id: i64,
    template_id: i64,
    field_name: String,
    label: String,
    field_type: String,
    is_required: bool,
    category: String,
    display_order: i32,
    help_text: Option<String>,
    placeholder_text: Option<String>,
    validation_rules: Option<serde_json::Value>,
    is_active: bool,
    deactivated_at: Option<DateTime<Utc>>,
    deactivation_reason: Option<String>,
}

impl FieldRow {
    fn into_definition(self, options: Vec<FieldOption>) -> Result<FieldDefinition, AppError> {
        let field_type = self
            .field_type
            .parse::<FieldType>()
            .map_err(|e| AppError::Db(sqlx::Error::Decode(e.into())))?;
        // Rules that no longer parse are treated as absent
        let validation_rules = self.validation_rules.and_then(|v| {
            serde_json::from_value::<ValidationRules>(v)
                .inspect_err(|e| log::warn!("Ignoring unreadable rules on field {}: {e}", self.id))
                .ok()
        });
        Ok(FieldDefinition {
            id: self.id,
            template_id: self.template_id,
            field_name: self.field_name,
            label: self.label,
            field_type,
            is_required: self.is_required,
            category: self.category,
            display_order: self.display_order,
            help_text: self.help_text,
            placeholder_text: self.placeholder_text,
            validation_rules,
            is_active: self.is_active,
            deactivated_at: self.deactivated_at,
            deactivation_reason: self.deactivation_reason,
            options,
        })
    }
}

pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Template>, AppError> {
    let template = sqlx::query_as::<_, Template>(&format!("{SELECT_TEMPLATE} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(template)
}

pub async fn find_for_board(conn: &mut PgConnection, board_id: i64) -> Result<Vec<Template>, AppError> {
    let templates = sqlx::query_as::<_, Template>(&format!(
        "{SELECT_TEMPLATE} WHERE decision_board_id = $1 ORDER BY name"
    ))
    .bind(board_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(templates)
}

/// All field definitions of a template, deactivated ones included, with their options.
pub async fn find_fields(conn: &mut PgConnection, template_id: i64) -> Result<Vec<FieldDefinition>, AppError> {
    let rows = sqlx::query_as::<_, FieldRow>(
        "SELECT id, template_id, field_name, label, field_type, is_required, category, display_order, \
                help_text, placeholder_text, validation_rules, is_active, deactivated_at, deactivation_reason \
         FROM field_definitions WHERE template_id = $1 \
         ORDER BY category, display_order, id",
    )
    .bind(template_id)
    .fetch_all(&mut *conn)
    .await?;

    let options = sqlx::query_as::<_, FieldOption>(
        "SELECT o.id, o.field_definition_id, o.value, o.label, o.display_order, o.is_default, o.is_active \
         FROM field_options o \
         JOIN field_definitions f ON f.id = o.field_definition_id \
         WHERE f.template_id = $1 \
         ORDER BY o.display_order, o.id",
    )
    .bind(template_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let own: Vec<FieldOption> = options
                .iter()
                .filter(|o| o.field_definition_id == row.id)
                .cloned()
                .collect();
            row.into_definition(own)
        })
        .collect()
}

pub async fn find_with_fields(conn: &mut PgConnection, id: i64) -> Result<Option<TemplateWithFields>, AppError> {
    let Some(template) = find_by_id(conn, id).await? else {
        return Ok(None);
    };
    let fields = find_fields(conn, template.id).await?;
    Ok(Some(TemplateWithFields { template, fields }))
}

/// The board's default template, when one is set and still active.
pub async fn find_default_for_board(
    conn: &mut PgConnection,
    board_id: i64,
) -> Result<Option<TemplateWithFields>, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT t.id FROM decision_boards b \
         JOIN templates t ON t.id = b.default_template_id \
         WHERE b.id = $1 AND t.is_active",
    )
    .bind(board_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some((id,)) => find_with_fields(conn, id).await,
        None => Ok(None),
    }
}

pub async fn create(
    conn: &mut PgConnection,
    board_id: i64,
    new: &NewTemplate,
    created_by: &str,
) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO templates (decision_board_id, name, description, created_by) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(board_id)
    .bind(new.name.trim())
    .bind(new.description.as_deref())
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn field_name_taken(conn: &mut PgConnection, template_id: i64, field_name: &str) -> Result<bool, AppError> {
    let (taken,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM field_definitions WHERE template_id = $1 AND field_name = $2)",
    )
    .bind(template_id)
    .bind(field_name.trim())
    .fetch_one(&mut *conn)
    .await?;
    Ok(taken)
}

/// Insert a field definition and its options. Returns the new field id.
pub async fn add_field(
    conn: &mut PgConnection,
    template_id: i64,
    field: &NewFieldDefinition,
) -> Result<i64, AppError> {
    let rules = match &field.validation_rules {
        Some(r) if !r.is_empty() => Some(
            serde_json::to_value(r).map_err(|e| AppError::BadRequest(format!("Invalid validation rules: {e}")))?,
        ),
        _ => None,
    };
    let category = field
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("General");

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO field_definitions \
            (template_id, field_name, label, field_type, is_required, category, display_order, \
             help_text, placeholder_text, validation_rules) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(template_id)
    .bind(field.field_name.trim())
    .bind(field.label.trim())
    .bind(field.field_type.as_str())
    .bind(field.is_required)
    .bind(category)
    .bind(field.display_order)
    .bind(field.help_text.as_deref())
    .bind(field.placeholder_text.as_deref())
    .bind(rules)
    .fetch_one(&mut *conn)
    .await?;

    if field.field_type.uses_options() {
        for option in &field.options {
            sqlx::query(
                "INSERT INTO field_options (field_definition_id, value, label, display_order, is_default) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(option.value.trim())
            .bind(option.label.trim())
            .bind(option.display_order)
            .bind(option.is_default)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(id)
}

/// Deactivate a field. Stored values are kept and shown as historical.
/// Returns false when the field does not exist on the template or is already inactive.
pub async fn deactivate_field(
    conn: &mut PgConnection,
    template_id: i64,
    field_id: i64,
    reason: Option<&str>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE field_definitions \
         SET is_active = FALSE, deactivated_at = now(), deactivation_reason = $1 \
         WHERE id = $2 AND template_id = $3 AND is_active",
    )
    .bind(reason)
    .bind(field_id)
    .bind(template_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
