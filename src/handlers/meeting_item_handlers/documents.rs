use actix_session::Session;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType, HeaderValue};
use actix_web::{web, HttpResponse};
use sqlx::{PgConnection, PgPool};

use crate::auth::session::{CurrentUser, require_permission};
use crate::errors::AppError;
use crate::models::document::{self, Document, DocumentSummary, DocumentUpload};
use crate::models::meeting_item::MeetingItem;
use crate::models::user::{PERM_ITEM_DOCUMENT, PERM_ITEM_STATUS, PERM_ITEM_VIEW};
use crate::responses::{created, ok};
use crate::storage::{BlobStore, StorageError};

use super::{finish_unit_of_work, load_for_update};

/// Owners manage their item's documents; status managers may too.
fn require_document_access(item: &MeetingItem, user: &CurrentUser) -> Result<(), AppError> {
    if !item.is_owned_by(&user.username) && !user.permissions.has(PERM_ITEM_STATUS) {
        return Err(AppError::PermissionDenied(
            "Only the requestor, owner/presenter or a secretary can change this item's documents".to_string(),
        ));
    }
    if !item.is_editable() {
        return Err(AppError::BadRequest(format!(
            "Documents cannot be changed once the item is {}",
            item.status
        )));
    }
    Ok(())
}

/// A document of `item_id`, deleted or not; 404 when it belongs elsewhere.
async fn find_item_document(conn: &mut PgConnection, item_id: i64, doc_id: i64) -> Result<Document, AppError> {
    document::find_by_id(conn, doc_id)
        .await?
        .filter(|d| d.meeting_item_id == item_id)
        .ok_or(AppError::NotFound)
}

/// POST /api/meeting-items/{id}/documents
/// Uploads a document; with `baseDocumentId` it becomes that chain's next version.
pub async fn upload(
    pool: web::Data<PgPool>,
    blobs: web::Data<dyn BlobStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<DocumentUpload>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_ITEM_DOCUMENT)?;
    let id = path.into_inner();
    let valid = document::validate_upload(&body, "document").map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;
    let item = load_for_update(&mut *tx, id).await?;
    require_document_access(&item, &user)?;

    let mut written = Vec::new();
    let result = async {
        let doc = document::store_document(
            &mut *tx,
            blobs.get_ref(),
            id,
            &valid,
            body.base_document_id,
            &user.username,
            &mut written,
        )
        .await?;
        let details = serde_json::json!({
            "document_id": doc.id,
            "version": doc.version,
            "summary": format!("Uploaded '{}' (v{}) to meeting item #{id}", doc.original_file_name, doc.version)
        });
        crate::audit::log(&mut *tx, user.id, "meeting_item.document_uploaded", "meeting_item", id, details).await?;
        Ok::<_, AppError>(DocumentSummary::from(&doc))
    }
    .await;
    let summary = finish_unit_of_work(tx, blobs.get_ref(), &written, result).await?;

    Ok(created(summary))
}

/// GET /api/meeting-items/{id}/documents/{doc_id}/versions
/// Every live version of the document's chain, newest first.
pub async fn versions(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_ITEM_VIEW)?;
    let (id, doc_id) = path.into_inner();

    let mut conn = pool.acquire().await?;
    let doc = find_item_document(&mut *conn, id, doc_id).await?;
    let chain = document::find_chain(&mut *conn, doc.chain_root()).await?;

    Ok(ok(chain))
}

/// GET /api/meeting-items/{id}/documents/{doc_id}/content
/// Streams the stored bytes back with the original file name.
pub async fn content(
    pool: web::Data<PgPool>,
    blobs: web::Data<dyn BlobStore>,
    session: Session,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, PERM_ITEM_VIEW)?;
    let (id, doc_id) = path.into_inner();

    let mut conn = pool.acquire().await?;
    let doc = find_item_document(&mut *conn, id, doc_id).await?;
    if doc.is_deleted {
        return Err(AppError::NotFound);
    }
    drop(conn);

    let bytes = blobs.download(&doc.storage_path).await.map_err(|e| match e {
        StorageError::NotFound(path) => {
            log::error!("Document {doc_id} has no blob at {path}");
            AppError::NotFound
        }
        other => other.into(),
    })?;

    let content_type = HeaderValue::from_str(&doc.content_type).unwrap_or_else(|_| {
        log::warn!("Document {doc_id} has an unusable content type, serving as octet-stream");
        HeaderValue::from_static("application/octet-stream")
    });

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(doc.original_file_name.clone())],
        })
        .body(bytes))
}

/// DELETE /api/meeting-items/{id}/documents/{doc_id}
/// Soft-deletes the document and promotes the next version; the blob is removed after commit.
pub async fn delete(
    pool: web::Data<PgPool>,
    blobs: web::Data<dyn BlobStore>,
    session: Session,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, PERM_ITEM_DOCUMENT)?;
    let (id, doc_id) = path.into_inner();

    let mut tx = pool.begin().await?;
    let item = load_for_update(&mut *tx, id).await?;
    require_document_access(&item, &user)?;

    let doc = document::delete_document(&mut *tx, id, doc_id, &user.username).await?;
    let details = serde_json::json!({
        "document_id": doc.id,
        "summary": format!("Deleted '{}' (v{}) from meeting item #{id}", doc.original_file_name, doc.version)
    });
    crate::audit::log(&mut *tx, user.id, "meeting_item.document_deleted", "meeting_item", id, details).await?;
    tx.commit().await?;

    if let Err(e) = blobs.delete(&doc.storage_path).await {
        log::warn!("Document {doc_id} deleted but its blob could not be removed: {e}");
    }

    Ok(ok(serde_json::json!({ "deletedDocumentId": doc.id })))
}
