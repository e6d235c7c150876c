//! REST handlers for meeting items, mounted under both `/api/meeting-items`
//! and `/api/MeetingItems`.

pub mod create;
pub mod documents;
pub mod list;
pub mod read;
pub mod status;
pub mod update;

use sqlx::{PgConnection, Postgres, Transaction};

use crate::errors::AppError;
use crate::models::document::{self, DocumentUpload, ValidUpload};
use crate::models::meeting_item::{self, MeetingItem};
use crate::models::template::{FieldDefinition, FieldValueInput};
use crate::responses::FieldError;
use crate::storage::BlobStore;

/// Validate every upload, collecting errors as `{prefix}[i].field`.
pub(crate) fn validate_uploads(
    uploads: &[DocumentUpload],
    prefix: &str,
    errors: &mut Vec<FieldError>,
) -> Vec<ValidUpload> {
    let mut valid = Vec::with_capacity(uploads.len());
    for (i, upload) in uploads.iter().enumerate() {
        match document::validate_upload(upload, &format!("{prefix}[{i}]")) {
            Ok(v) => valid.push(v),
            Err(e) => errors.extend(e),
        }
    }
    valid
}

/// Write validated dynamic field values, keeping only the column matching each field's type.
pub(crate) async fn save_field_values(
    conn: &mut PgConnection,
    item_id: i64,
    definitions: &[FieldDefinition],
    values: &[FieldValueInput],
) -> Result<(), AppError> {
    for input in values {
        let Some(def) = definitions.iter().find(|d| d.field_name == input.field_name && d.is_active) else {
            continue;
        };
        let value = input.value.normalized(def.field_type);
        meeting_item::upsert_field_value(conn, item_id, def.id, &value).await?;
    }
    Ok(())
}

/// Load an item inside the unit of work, or 404.
pub(crate) async fn load_for_update(conn: &mut PgConnection, id: i64) -> Result<MeetingItem, AppError> {
    meeting_item::find_for_update(conn, id).await?.ok_or(AppError::NotFound)
}

/// Commit the unit of work. On failure, roll back and remove any blobs it wrote.
pub(crate) async fn finish_unit_of_work<T>(
    tx: Transaction<'_, Postgres>,
    blobs: &dyn BlobStore,
    written: &[String],
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    let value = match result {
        Ok(value) => value,
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                log::warn!("Rollback failed: {rollback}");
            }
            document::remove_blobs(blobs, written).await;
            return Err(e);
        }
    };
    if let Err(e) = tx.commit().await {
        document::remove_blobs(blobs, written).await;
        return Err(e.into());
    }
    Ok(value)
}
