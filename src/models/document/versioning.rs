//! Storing uploads and maintaining document version chains.

use chrono::Utc;
use sqlx::PgConnection;

use super::naming::{generate_stored_name, storage_path};
use super::queries;
use super::types::{Document, NewDocument, ValidUpload};
use crate::errors::AppError;
use crate::storage::BlobStore;

/// Write an upload to blob storage and record it.
///
/// Without `base_document_id` the upload starts a new chain at version 1.
/// With one, it becomes the next version of that document's chain: the base
/// is resolved to its chain root, the latest flag is cleared on the whole
/// chain and the new row takes `max(version) + 1`.
///
/// Paths written to blob storage are pushed onto `written` so the caller can
/// remove them if the surrounding transaction does not commit.
pub async fn store_document(
    conn: &mut PgConnection,
    blobs: &dyn BlobStore,
    meeting_item_id: i64,
    upload: &ValidUpload,
    base_document_id: Option<i64>,
    uploaded_by: &str,
    written: &mut Vec<String>,
) -> Result<Document, AppError> {
    let (version, root) = match base_document_id {
        Some(base_id) => {
            let base = queries::find_by_id(conn, base_id)
                .await?
                .filter(|d| !d.is_deleted)
                .ok_or(AppError::NotFound)?;
            if base.meeting_item_id != meeting_item_id {
                return Err(AppError::BadRequest(format!(
                    "Document {base_id} does not belong to meeting item {meeting_item_id}"
                )));
            }
            let root = base.chain_root();
            queries::clear_latest(conn, root).await?;
            (queries::next_version(conn, root).await?, Some(root))
        }
        None => (1, None),
    };

    let abbreviation = queries::find_board_abbreviation(conn, meeting_item_id).await?;
    let stored_name = generate_stored_name(&abbreviation, &upload.original_file_name, Utc::now());
    let path = storage_path(meeting_item_id, &stored_name);
    blobs.upload(&path, &upload.bytes, &upload.content_type).await?;
    written.push(path.clone());

    let doc = queries::insert(
        conn,
        &NewDocument {
            meeting_item_id,
            original_file_name: &upload.original_file_name,
            stored_file_name: &stored_name,
            storage_path: &path,
            file_size: upload.bytes.len() as i64,
            content_type: &upload.content_type,
            version,
            base_document_id: root,
            uploaded_by,
        },
    )
    .await?;

    log::info!(
        "Stored document {} v{} for meeting item {meeting_item_id} ({} bytes)",
        doc.id,
        doc.version,
        doc.file_size
    );
    Ok(doc)
}

/// Soft-delete a document of `meeting_item_id` and promote the next latest version.
/// The blob is left in place; callers remove it once the transaction commits.
pub async fn delete_document(
    conn: &mut PgConnection,
    meeting_item_id: i64,
    document_id: i64,
    deleted_by: &str,
) -> Result<Document, AppError> {
    let belongs = queries::find_by_id(conn, document_id)
        .await?
        .is_some_and(|d| d.meeting_item_id == meeting_item_id && !d.is_deleted);
    if !belongs {
        return Err(AppError::NotFound);
    }

    let doc = queries::soft_delete(conn, document_id, deleted_by)
        .await?
        .ok_or(AppError::NotFound)?;
    // No-op unless the deleted row was the chain's latest
    if let Some(promoted) = queries::promote_latest(conn, doc.chain_root()).await? {
        log::debug!("Promoted document {promoted} to latest after deleting {document_id}");
    }
    Ok(doc)
}

/// Best-effort removal of blobs, used after commit or after a failed unit of work.
pub async fn remove_blobs(blobs: &dyn BlobStore, paths: &[String]) {
    for path in paths {
        if let Err(e) = blobs.delete(path).await {
            log::warn!("Failed to remove blob {path}: {e}");
        }
    }
}
