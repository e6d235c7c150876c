use sqlx::PgConnection;

use crate::errors::AppError;
use super::types::*;

const DOCUMENT_COLUMNS: &str = "id, meeting_item_id, original_file_name, stored_file_name, storage_path, \
                                file_size, content_type, version, base_document_id, is_latest_version, \
                                is_deleted, deleted_by, deleted_at, uploaded_by, uploaded_at";

/// Find a document by id, deleted or not.
pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Document>, AppError> {
    let doc = sqlx::query_as::<_, Document>(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(doc)
}

/// Abbreviation of the board a meeting item belongs to, used as the stored file name prefix.
pub async fn find_board_abbreviation(conn: &mut PgConnection, meeting_item_id: i64) -> Result<String, AppError> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT b.abbreviation FROM meeting_items m \
         JOIN decision_boards b ON b.id = m.decision_board_id \
         WHERE m.id = $1",
    )
    .bind(meeting_item_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|(abbr,)| abbr).unwrap_or_else(|| "DB".to_string()))
}

/// Non-deleted documents of a meeting item, oldest upload first.
pub async fn find_for_item(conn: &mut PgConnection, meeting_item_id: i64) -> Result<Vec<Document>, AppError> {
    let docs = sqlx::query_as::<_, Document>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents \
         WHERE meeting_item_id = $1 AND NOT is_deleted \
         ORDER BY uploaded_at, id"
    ))
    .bind(meeting_item_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(docs)
}

/// Non-deleted versions of a chain, newest first.
pub async fn find_chain(conn: &mut PgConnection, root_id: i64) -> Result<Vec<Document>, AppError> {
    let docs = sqlx::query_as::<_, Document>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents \
         WHERE COALESCE(base_document_id, id) = $1 AND NOT is_deleted \
         ORDER BY version DESC"
    ))
    .bind(root_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(docs)
}

/// Next version number of a chain. Deleted versions still count, so numbers are never reused.
pub async fn next_version(conn: &mut PgConnection, root_id: i64) -> Result<i32, AppError> {
    let (next,): (i32,) = sqlx::query_as(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM documents WHERE COALESCE(base_document_id, id) = $1",
    )
    .bind(root_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(next)
}

/// Drop the latest flag from every entry of a chain.
pub async fn clear_latest(conn: &mut PgConnection, root_id: i64) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE documents SET is_latest_version = FALSE \
         WHERE COALESCE(base_document_id, id) = $1 AND is_latest_version",
    )
    .bind(root_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn insert(conn: &mut PgConnection, new: &NewDocument<'_>) -> Result<Document, AppError> {
    let doc = sqlx::query_as::<_, Document>(&format!(
        "INSERT INTO documents \
            (meeting_item_id, original_file_name, stored_file_name, storage_path, file_size, \
             content_type, version, base_document_id, is_latest_version, uploaded_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9) \
         RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(new.meeting_item_id)
    .bind(new.original_file_name)
    .bind(new.stored_file_name)
    .bind(new.storage_path)
    .bind(new.file_size)
    .bind(new.content_type)
    .bind(new.version)
    .bind(new.base_document_id)
    .bind(new.uploaded_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(doc)
}

/// Mark a document deleted. Returns `None` when it does not exist or is already deleted.
pub async fn soft_delete(conn: &mut PgConnection, id: i64, deleted_by: &str) -> Result<Option<Document>, AppError> {
    let doc = sqlx::query_as::<_, Document>(&format!(
        "UPDATE documents \
         SET is_deleted = TRUE, is_latest_version = FALSE, deleted_by = $1, deleted_at = now() \
         WHERE id = $2 AND NOT is_deleted \
         RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(deleted_by)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(doc)
}

/// Give the latest flag to the highest remaining version when the chain has none.
/// Returns the promoted document id.
pub async fn promote_latest(conn: &mut PgConnection, root_id: i64) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE documents SET is_latest_version = TRUE \
         WHERE id = ( \
             SELECT id FROM documents \
             WHERE COALESCE(base_document_id, id) = $1 AND NOT is_deleted \
             ORDER BY version DESC LIMIT 1) \
           AND NOT EXISTS ( \
             SELECT 1 FROM documents \
             WHERE COALESCE(base_document_id, id) = $1 AND NOT is_deleted AND is_latest_version) \
         RETURNING id",
    )
    .bind(root_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|(id,)| id))
}
