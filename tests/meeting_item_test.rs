//! Meeting item model tests against PostgreSQL.
//! Skipped unless `TEST_DATABASE_URL` points at a server we can create databases on.

mod common;
use common::*;

use meeting_items::models::meeting_item::{self, ItemFilter, ItemStatus, ValidItemFields};
use meeting_items::models::template::{self, TypedValue};

fn valid_fields(owner: &str) -> ValidItemFields {
    meeting_item::validate_item_fields(&item_fields(owner)).expect("valid fields")
}

// ============================================================================
// CREATE AND READ
// ============================================================================

#[tokio::test]
async fn test_create_starts_in_draft() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Architecture Board").await;
    let template_id = create_template(db.pool(), board_id, true).await;
    let mut conn = db.conn().await;

    let id = meeting_item::create(&mut *conn, board_id, Some(template_id), &valid_fields("alice"), "alice")
        .await
        .expect("create item");

    let item = meeting_item::find_by_id(&mut *conn, id).await.expect("query").expect("item exists");
    assert_eq!(item.status, ItemStatus::Draft);
    assert_eq!(item.requestor, "alice");
    assert_eq!(item.created_by, "alice");
    assert_eq!(item.template_id, Some(template_id));
    assert_eq!(item.duration_minutes, 30);
    assert!(item.submission_date.is_none());
    assert!(item.is_owned_by("ALICE"));
    assert!(item.is_editable());

    let (board_name, template_name) = meeting_item::find_display_names(&mut *conn, id).await.expect("names");
    assert_eq!(board_name, "Architecture Board");
    assert_eq!(template_name.as_deref(), Some("Standard request"));

    assert!(meeting_item::find_by_id(&mut *conn, id + 1000).await.expect("query").is_none());

    drop(conn);
    db.teardown().await;
}

#[tokio::test]
async fn test_update_fields_keeps_status() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let mut conn = db.conn().await;

    let id = meeting_item::create(&mut *conn, board_id, None, &valid_fields("alice"), "alice")
        .await
        .expect("create");
    let mut changed = valid_fields("bob");
    changed.topic = "Revised topic".to_string();
    meeting_item::update_fields(&mut *conn, id, &changed, "alice").await.expect("update");

    let item = meeting_item::find_by_id(&mut *conn, id).await.expect("query").expect("exists");
    assert_eq!(item.topic, "Revised topic");
    assert_eq!(item.owner_presenter, "bob");
    assert_eq!(item.status, ItemStatus::Draft);
    assert_eq!(item.updated_by.as_deref(), Some("alice"));
    assert!(item.updated_at.is_some());

    drop(conn);
    db.teardown().await;
}

// ============================================================================
// LISTING
// ============================================================================

#[tokio::test]
async fn test_paginated_filters() {
    let Some(db) = setup_test_db().await else { return };
    let board_a = create_board(db.pool(), "Board A").await;
    let board_b = create_board(db.pool(), "Board B").await;
    let mut conn = db.conn().await;

    for _ in 0..3 {
        meeting_item::create(&mut *conn, board_a, None, &valid_fields("alice"), "alice")
            .await
            .expect("create");
    }
    let submitted = meeting_item::create(&mut *conn, board_b, None, &valid_fields("alice"), "alice")
        .await
        .expect("create");
    meeting_item::update_status(&mut *conn, submitted, ItemStatus::Submitted, None, "alice")
        .await
        .expect("status");

    let (all, total) = meeting_item::find_paginated(&mut *conn, &ItemFilter::default(), 1, 2)
        .await
        .expect("page");
    assert_eq!(total, 4);
    assert_eq!(all.len(), 2);

    let (page_two, _) = meeting_item::find_paginated(&mut *conn, &ItemFilter::default(), 2, 2)
        .await
        .expect("page");
    assert_eq!(page_two.len(), 2);

    let by_board = ItemFilter { decision_board_id: Some(board_a), status: None };
    let (items, total) = meeting_item::find_paginated(&mut *conn, &by_board, 1, 20).await.expect("page");
    assert_eq!(total, 3);
    assert!(items.iter().all(|i| i.decision_board_name == "Board A"));

    let by_status = ItemFilter { decision_board_id: None, status: Some(ItemStatus::Submitted) };
    let (items, total) = meeting_item::find_paginated(&mut *conn, &by_status, 1, 20).await.expect("page");
    assert_eq!(total, 1);
    assert_eq!(items[0].item.id, submitted);
    assert_eq!(items[0].document_count, 0);

    let board_items = meeting_item::find_by_board(&mut *conn, board_b).await.expect("by board");
    assert_eq!(board_items.len(), 1);

    drop(conn);
    db.teardown().await;
}

// ============================================================================
// FIELD VALUES
// ============================================================================

#[tokio::test]
async fn test_deactivated_field_becomes_historical() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let template_id = create_template(db.pool(), board_id, true).await;
    let mut conn = db.conn().await;

    let id = meeting_item::create(&mut *conn, board_id, Some(template_id), &valid_fields("alice"), "alice")
        .await
        .expect("create");
    let tmpl = template::find_with_fields(&mut *conn, template_id)
        .await
        .expect("query")
        .expect("template");
    let field_id = |name: &str| {
        tmpl.fields
            .iter()
            .find(|f| f.field_name == name)
            .map(|f| f.id)
            .expect("field exists")
    };

    let cost_center = TypedValue { text_value: Some("CC-100".into()), ..Default::default() };
    let priority = TypedValue { text_value: Some("high".into()), ..Default::default() };
    meeting_item::upsert_field_value(&mut *conn, id, field_id("costCenter"), &cost_center)
        .await
        .expect("upsert");
    meeting_item::upsert_field_value(&mut *conn, id, field_id("priority"), &priority)
        .await
        .expect("upsert");
    // upsert replaces rather than duplicates
    let cheaper = TypedValue { text_value: Some("CC-200".into()), ..Default::default() };
    meeting_item::upsert_field_value(&mut *conn, id, field_id("costCenter"), &cheaper)
        .await
        .expect("upsert");

    let deactivated = template::deactivate_field(&mut *conn, template_id, field_id("priority"), Some("Retired"))
        .await
        .expect("deactivate");
    assert!(deactivated);

    let rows = meeting_item::find_field_values(&mut *conn, id).await.expect("values");
    let (active, historical) = meeting_item::split_field_values(rows).expect("split");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].field_name, "costCenter");
    assert_eq!(active[0].value.text_value.as_deref(), Some("CC-200"));
    assert_eq!(historical.len(), 1);
    assert_eq!(historical[0].display_value, "high");
    assert_eq!(historical[0].deactivation_reason.as_deref(), Some("Retired"));
    assert!(historical[0].deactivated_at.is_some());

    drop(conn);
    db.teardown().await;
}

// ============================================================================
// STATUS
// ============================================================================

#[tokio::test]
async fn test_status_update_and_history() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let mut conn = db.conn().await;

    let id = meeting_item::create(&mut *conn, board_id, None, &valid_fields("alice"), "alice")
        .await
        .expect("create");

    meeting_item::update_status(&mut *conn, id, ItemStatus::Submitted, None, "alice")
        .await
        .expect("submit");
    meeting_item::insert_history(&mut *conn, id, ItemStatus::Draft, ItemStatus::Submitted, Some("Ready"), None, "alice")
        .await
        .expect("history");
    let submitted = meeting_item::find_by_id(&mut *conn, id).await.expect("query").expect("exists");
    let first_submission = submitted.submission_date.expect("submission date stamped");
    assert!(submitted.is_editable());

    meeting_item::update_status(&mut *conn, id, ItemStatus::Denied, Some("Out of scope"), "chair")
        .await
        .expect("deny");
    meeting_item::insert_history(
        &mut *conn,
        id,
        ItemStatus::Submitted,
        ItemStatus::Denied,
        None,
        Some("Out of scope"),
        "chair",
    )
    .await
    .expect("history");

    let denied = meeting_item::find_by_id(&mut *conn, id).await.expect("query").expect("exists");
    assert_eq!(denied.status, ItemStatus::Denied);
    assert_eq!(denied.denial_reason.as_deref(), Some("Out of scope"));
    assert_eq!(denied.submission_date, Some(first_submission));
    assert!(!denied.is_editable());

    let history = meeting_item::find_history(&mut *conn, id).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].from_status, "Draft");
    assert_eq!(history[0].to_status, "Submitted");
    assert_eq!(history[0].comment.as_deref(), Some("Ready"));
    assert_eq!(history[1].to_status, "Denied");
    assert_eq!(history[1].changed_by, "chair");

    drop(conn);
    db.teardown().await;
}
