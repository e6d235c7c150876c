use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::errors::AppError;
use crate::models::template::TypedValue;
use super::types::*;

const ITEM_COLUMNS: &str = "i.id, i.decision_board_id, i.template_id, i.topic, i.purpose, i.outcome, \
                            i.duration_minutes, i.digital_product, i.requestor, i.owner_presenter, i.sponsor, \
                            i.status, i.denial_reason, i.submission_date, i.created_by, i.created_at, \
                            i.updated_by, i.updated_at";

/// Shared FROM clause for list queries; adds board name and live document count.
const LIST_FROM: &str = "FROM meeting_items i \
                         JOIN decision_boards b ON b.id = i.decision_board_id";

fn list_select() -> String {
    format!(
        "SELECT {ITEM_COLUMNS}, b.name AS decision_board_name, \
                (SELECT COUNT(*) FROM documents d WHERE d.meeting_item_id = i.id AND NOT d.is_deleted) \
                    AS document_count \
         {LIST_FROM}"
    )
}

/// Insert a new item in Draft. Returns its id.
pub async fn create(
    conn: &mut PgConnection,
    decision_board_id: i64,
    template_id: Option<i64>,
    fields: &ValidItemFields,
    requestor: &str,
) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO meeting_items \
            (decision_board_id, template_id, topic, purpose, outcome, duration_minutes, digital_product, \
             requestor, owner_presenter, sponsor, status, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $8) \
         RETURNING id",
    )
    .bind(decision_board_id)
    .bind(template_id)
    .bind(&fields.topic)
    .bind(&fields.purpose)
    .bind(fields.outcome.as_str())
    .bind(fields.duration_minutes)
    .bind(&fields.digital_product)
    .bind(requestor)
    .bind(&fields.owner_presenter)
    .bind(fields.sponsor.as_deref())
    .bind(ItemStatus::Draft.as_str())
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<MeetingItem>, AppError> {
    let row = sqlx::query_as::<_, MeetingItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM meeting_items i WHERE i.id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(MeetingItem::try_from).transpose()
}

/// Load an item for modification, taking a row lock for the rest of the transaction.
pub async fn find_for_update(conn: &mut PgConnection, id: i64) -> Result<Option<MeetingItem>, AppError> {
    let row = sqlx::query_as::<_, MeetingItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM meeting_items i WHERE i.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(MeetingItem::try_from).transpose()
}

/// Board name and template name shown with an item.
pub async fn find_display_names(
    conn: &mut PgConnection,
    id: i64,
) -> Result<(String, Option<String>), AppError> {
    let names: (String, Option<String>) = sqlx::query_as(
        "SELECT b.name, t.name FROM meeting_items i \
         JOIN decision_boards b ON b.id = i.decision_board_id \
         LEFT JOIN templates t ON t.id = i.template_id \
         WHERE i.id = $1",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(names)
}

/// Items of one decision board, newest first.
pub async fn find_by_board(conn: &mut PgConnection, board_id: i64) -> Result<Vec<MeetingItemListItem>, AppError> {
    let rows = sqlx::query_as::<_, MeetingItemListRow>(&format!(
        "{} WHERE i.decision_board_id = $1 ORDER BY i.created_at DESC, i.id DESC",
        list_select()
    ))
    .bind(board_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(MeetingItemListItem::try_from).collect()
}

/// One page of items matching `filter`, with the total match count.
pub async fn find_paginated(
    conn: &mut PgConnection,
    filter: &ItemFilter,
    page: i64,
    per_page: i64,
) -> Result<(Vec<MeetingItemListItem>, i64), AppError> {
    let status = filter.status.map(|s| s.as_str());
    let filter_sql = "WHERE ($1::BIGINT IS NULL OR i.decision_board_id = $1) \
                        AND ($2::TEXT IS NULL OR i.status = $2)";

    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) {LIST_FROM} {filter_sql}"))
        .bind(filter.decision_board_id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;

    // Past the end just yields an empty page
    let offset = (page.max(1) - 1).saturating_mul(per_page);
    let rows = sqlx::query_as::<_, MeetingItemListRow>(&format!(
        "{} {filter_sql} ORDER BY i.created_at DESC, i.id DESC LIMIT $3 OFFSET $4",
        list_select()
    ))
    .bind(filter.decision_board_id)
    .bind(status)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    let items = rows
        .into_iter()
        .map(MeetingItemListItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((items, total))
}

/// Overwrite the static fields. Status is untouched.
pub async fn update_fields(
    conn: &mut PgConnection,
    id: i64,
    fields: &ValidItemFields,
    updated_by: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE meeting_items \
         SET topic = $1, purpose = $2, outcome = $3, duration_minutes = $4, digital_product = $5, \
             owner_presenter = $6, sponsor = $7, updated_by = $8, updated_at = now() \
         WHERE id = $9",
    )
    .bind(&fields.topic)
    .bind(&fields.purpose)
    .bind(fields.outcome.as_str())
    .bind(fields.duration_minutes)
    .bind(&fields.digital_product)
    .bind(&fields.owner_presenter)
    .bind(fields.sponsor.as_deref())
    .bind(updated_by)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Stored values of an item joined with their definitions.
pub async fn find_field_values(conn: &mut PgConnection, item_id: i64) -> Result<Vec<FieldValueRow>, AppError> {
    let rows = sqlx::query_as::<_, FieldValueRow>(
        "SELECT v.field_definition_id, f.field_name, f.label, f.field_type, f.category, f.display_order, \
                f.is_active, f.deactivated_at, f.deactivation_reason, \
                v.text_value, v.number_value, v.date_value, v.boolean_value, v.json_value \
         FROM meeting_item_field_values v \
         JOIN field_definitions f ON f.id = v.field_definition_id \
         WHERE v.meeting_item_id = $1 \
         ORDER BY f.category, f.display_order, f.id",
    )
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn upsert_field_value(
    conn: &mut PgConnection,
    item_id: i64,
    field_definition_id: i64,
    value: &TypedValue,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO meeting_item_field_values \
            (meeting_item_id, field_definition_id, text_value, number_value, date_value, boolean_value, json_value) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (meeting_item_id, field_definition_id) DO UPDATE \
         SET text_value = EXCLUDED.text_value, number_value = EXCLUDED.number_value, \
             date_value = EXCLUDED.date_value, boolean_value = EXCLUDED.boolean_value, \
             json_value = EXCLUDED.json_value",
    )
    .bind(item_id)
    .bind(field_definition_id)
    .bind(value.text_value.as_deref())
    .bind(value.number_value)
    .bind(value.date_value)
    .bind(value.boolean_value)
    .bind(value.json_value.as_ref())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Set a new status. The submission date is stamped the first time an item leaves Draft.
pub async fn update_status(
    conn: &mut PgConnection,
    id: i64,
    status: ItemStatus,
    denial_reason: Option<&str>,
    updated_by: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE meeting_items \
         SET status = $1, \
             denial_reason = COALESCE($2, denial_reason), \
             submission_date = CASE WHEN $1 = 'Submitted' THEN COALESCE(submission_date, now()) \
                                    ELSE submission_date END, \
             updated_by = $3, updated_at = now() \
         WHERE id = $4",
    )
    .bind(status.as_str())
    .bind(denial_reason)
    .bind(updated_by)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Append a status history row and return its timestamp.
pub async fn insert_history(
    conn: &mut PgConnection,
    item_id: i64,
    from: ItemStatus,
    to: ItemStatus,
    comment: Option<&str>,
    denial_reason: Option<&str>,
    changed_by: &str,
) -> Result<DateTime<Utc>, AppError> {
    let (changed_at,): (DateTime<Utc>,) = sqlx::query_as(
        "INSERT INTO meeting_item_status_history \
            (meeting_item_id, from_status, to_status, comment, denial_reason, changed_by) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING changed_at",
    )
    .bind(item_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(comment)
    .bind(denial_reason)
    .bind(changed_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(changed_at)
}

/// Status history of an item, oldest first.
pub async fn find_history(conn: &mut PgConnection, item_id: i64) -> Result<Vec<StatusHistoryEntry>, AppError> {
    let rows = sqlx::query_as::<_, StatusHistoryEntry>(
        "SELECT id, meeting_item_id, from_status, to_status, comment, denial_reason, changed_by, changed_at \
         FROM meeting_item_status_history \
         WHERE meeting_item_id = $1 \
         ORDER BY changed_at, id",
    )
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
