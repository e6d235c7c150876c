//! Document storage and version chain tests against PostgreSQL.

mod common;
use common::*;

use meeting_items::errors::AppError;
use meeting_items::models::document::{self, NewDocument, ValidUpload};
use meeting_items::models::meeting_item;
use meeting_items::storage::{BlobStore, MemoryBlobStore};

fn upload(name: &str, body: &[u8]) -> ValidUpload {
    ValidUpload {
        original_file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: body.to_vec(),
    }
}

async fn new_item(pool: &sqlx::PgPool, board_id: i64) -> i64 {
    let mut conn = pool.acquire().await.expect("acquire");
    let fields = meeting_item::validate_item_fields(&item_fields("alice")).expect("valid");
    meeting_item::create(&mut *conn, board_id, None, &fields, "alice")
        .await
        .expect("create item")
}

// ============================================================================
// VERSION CHAINS
// ============================================================================

#[tokio::test]
async fn test_versions_share_chain_with_single_latest() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let item_id = new_item(db.pool(), board_id).await;
    let blobs = MemoryBlobStore::new();
    let mut written = Vec::new();
    let mut conn = db.conn().await;

    let v1 = document::store_document(&mut *conn, &blobs, item_id, &upload("Agenda.pdf", b"one"), None, "alice", &mut written)
        .await
        .expect("v1");
    assert_eq!(v1.version, 1);
    assert!(v1.base_document_id.is_none());
    assert!(v1.is_latest_version);
    // board abbreviation leads the stored name
    assert!(v1.stored_file_name.starts_with("TB_Agenda_"), "{}", v1.stored_file_name);
    assert!(v1.stored_file_name.ends_with(".pdf"));

    let v2 = document::store_document(&mut *conn, &blobs, item_id, &upload("Agenda.pdf", b"two"), Some(v1.id), "alice", &mut written)
        .await
        .expect("v2");
    // versioning from a non-root member still lands on the root's chain
    let v3 = document::store_document(&mut *conn, &blobs, item_id, &upload("Agenda.pdf", b"three"), Some(v2.id), "alice", &mut written)
        .await
        .expect("v3");
    assert_eq!(v2.version, 2);
    assert_eq!(v3.version, 3);
    assert_eq!(v2.base_document_id, Some(v1.id));
    assert_eq!(v3.base_document_id, Some(v1.id));

    let chain = document::find_chain(&mut *conn, v1.id).await.expect("chain");
    let versions: Vec<i32> = chain.iter().map(|d| d.version).collect();
    assert_eq!(versions, vec![3, 2, 1]);
    let latest: Vec<i64> = chain.iter().filter(|d| d.is_latest_version).map(|d| d.id).collect();
    assert_eq!(latest, vec![v3.id]);

    assert_eq!(written.len(), 3);
    assert_eq!(blobs.len(), 3);
    assert!(written.iter().all(|p| p.starts_with(&format!("meeting-items/{item_id}/"))));
    assert_eq!(blobs.download(&v2.storage_path).await.expect("blob"), b"two");

    drop(conn);
    db.teardown().await;
}

#[tokio::test]
async fn test_delete_latest_promotes_previous_and_versions_are_not_reused() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let item_id = new_item(db.pool(), board_id).await;
    let blobs = MemoryBlobStore::new();
    let mut written = Vec::new();
    let mut conn = db.conn().await;

    let v1 = document::store_document(&mut *conn, &blobs, item_id, &upload("Plan.pdf", b"1"), None, "alice", &mut written)
        .await
        .expect("v1");
    let v2 = document::store_document(&mut *conn, &blobs, item_id, &upload("Plan.pdf", b"2"), Some(v1.id), "alice", &mut written)
        .await
        .expect("v2");

    let deleted = document::delete_document(&mut *conn, item_id, v2.id, "alice").await.expect("delete");
    assert_eq!(deleted.id, v2.id);

    let chain = document::find_chain(&mut *conn, v1.id).await.expect("chain");
    assert_eq!(chain.len(), 1);
    assert!(chain[0].is_latest_version);
    assert_eq!(chain[0].id, v1.id);

    let listed = document::find_for_item(&mut *conn, item_id).await.expect("list");
    assert_eq!(listed.len(), 1);

    // the deleted row still holds version 2
    let v3 = document::store_document(&mut *conn, &blobs, item_id, &upload("Plan.pdf", b"3"), Some(v1.id), "alice", &mut written)
        .await
        .expect("v3");
    assert_eq!(v3.version, 3);

    let again = document::delete_document(&mut *conn, item_id, v2.id, "alice").await;
    assert!(matches!(again, Err(AppError::NotFound)));

    drop(conn);
    db.teardown().await;
}

#[tokio::test]
async fn test_deleting_older_version_keeps_latest() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let item_id = new_item(db.pool(), board_id).await;
    let blobs = MemoryBlobStore::new();
    let mut written = Vec::new();
    let mut conn = db.conn().await;

    let v1 = document::store_document(&mut *conn, &blobs, item_id, &upload("Design.pdf", b"1"), None, "alice", &mut written)
        .await
        .expect("v1");
    let v2 = document::store_document(&mut *conn, &blobs, item_id, &upload("Design.pdf", b"2"), Some(v1.id), "alice", &mut written)
        .await
        .expect("v2");

    document::delete_document(&mut *conn, item_id, v1.id, "alice").await.expect("delete");
    let latest = document::find_by_id(&mut *conn, v2.id).await.expect("query").expect("exists");
    assert!(latest.is_latest_version);

    drop(conn);
    db.teardown().await;
}

// ============================================================================
// GUARDS
// ============================================================================

#[tokio::test]
async fn test_base_document_must_belong_to_item() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let item_a = new_item(db.pool(), board_id).await;
    let item_b = new_item(db.pool(), board_id).await;
    let blobs = MemoryBlobStore::new();
    let mut written = Vec::new();
    let mut conn = db.conn().await;

    let doc = document::store_document(&mut *conn, &blobs, item_a, &upload("A.pdf", b"a"), None, "alice", &mut written)
        .await
        .expect("store");

    let wrong_item =
        document::store_document(&mut *conn, &blobs, item_b, &upload("B.pdf", b"b"), Some(doc.id), "alice", &mut written).await;
    assert!(matches!(wrong_item, Err(AppError::BadRequest(_))));

    let missing =
        document::store_document(&mut *conn, &blobs, item_a, &upload("C.pdf", b"c"), Some(doc.id + 999), "alice", &mut written).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    // nothing was written for the rejected uploads
    assert_eq!(written.len(), 1);

    let foreign_delete = document::delete_document(&mut *conn, item_b, doc.id, "alice").await;
    assert!(matches!(foreign_delete, Err(AppError::NotFound)));

    drop(conn);
    db.teardown().await;
}

#[tokio::test]
async fn test_index_rejects_second_latest_in_chain() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let item_id = new_item(db.pool(), board_id).await;
    let blobs = MemoryBlobStore::new();
    let mut written = Vec::new();
    let mut conn = db.conn().await;

    let root = document::store_document(&mut *conn, &blobs, item_id, &upload("R.pdf", b"r"), None, "alice", &mut written)
        .await
        .expect("root");

    // skipping clear_latest leaves two latest rows in one chain
    let result = document::insert(
        &mut *conn,
        &NewDocument {
            meeting_item_id: item_id,
            original_file_name: "R.pdf",
            stored_file_name: "R_dup.pdf",
            storage_path: "meeting-items/dup/R_dup.pdf",
            file_size: 1,
            content_type: "application/pdf",
            version: 2,
            base_document_id: Some(root.id),
            uploaded_by: "alice",
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Db(_))));

    drop(conn);
    db.teardown().await;
}

#[tokio::test]
async fn test_remove_blobs_ignores_missing() {
    let blobs = MemoryBlobStore::new();
    blobs.upload("meeting-items/1/a.pdf", b"a", "application/pdf").await.expect("upload");
    document::remove_blobs(&blobs, &["meeting-items/1/a.pdf".to_string(), "meeting-items/1/gone.pdf".to_string()]).await;
    assert!(blobs.is_empty());
}
