//! Template and field definition tests against PostgreSQL.

mod common;
use common::*;

use meeting_items::models::decision_board;
use meeting_items::models::template::{self, FieldType};

#[tokio::test]
async fn test_template_fields_and_options() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let template_id = create_template(db.pool(), board_id, false).await;
    let mut conn = db.conn().await;

    let tmpl = template::find_with_fields(&mut *conn, template_id)
        .await
        .expect("query")
        .expect("template");
    assert_eq!(tmpl.template.decision_board_id, board_id);
    assert_eq!(tmpl.fields.len(), 3);

    let names: Vec<&str> = tmpl.fields.iter().map(|f| f.field_name.as_str()).collect();
    assert_eq!(names, vec!["costCenter", "priority", "budget"]);
    assert!(tmpl.fields.iter().all(|f| f.category == "General"));

    let priority = &tmpl.fields[1];
    assert_eq!(priority.field_type, FieldType::Dropdown);
    assert_eq!(priority.active_option_values(), vec!["low", "high"]);

    let budget = &tmpl.fields[2];
    let rules = budget.validation_rules.as_ref().expect("rules stored");
    assert_eq!(rules.min, Some(0.0));
    assert_eq!(rules.max, Some(1000.0));
    assert!(tmpl.fields[0].validation_rules.is_none());

    let listed = template::find_for_board(&mut *conn, board_id).await.expect("list");
    assert_eq!(listed.len(), 1);

    drop(conn);
    db.teardown().await;
}

#[tokio::test]
async fn test_default_template_lookup() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let mut conn = db.conn().await;

    assert!(template::find_default_for_board(&mut *conn, board_id).await.expect("query").is_none());
    drop(conn);

    let template_id = create_template(db.pool(), board_id, true).await;
    let mut conn = db.conn().await;
    let board = decision_board::find_by_id(&mut *conn, board_id).await.expect("query").expect("board");
    assert_eq!(board.default_template_id, Some(template_id));

    let default = template::find_default_for_board(&mut *conn, board_id)
        .await
        .expect("query")
        .expect("default set");
    assert_eq!(default.template.id, template_id);

    drop(conn);
    db.teardown().await;
}

#[tokio::test]
async fn test_field_names_unique_per_template() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let first = create_template(db.pool(), board_id, false).await;
    let second = template::create(
        &mut *db.conn().await,
        board_id,
        &template::NewTemplate { name: "Empty".into(), description: None, make_default: false },
        "admin",
    )
    .await
    .expect("create");
    let mut conn = db.conn().await;

    assert!(template::field_name_taken(&mut *conn, first, "costCenter").await.expect("query"));
    assert!(!template::field_name_taken(&mut *conn, second, "costCenter").await.expect("query"));

    let dup = field("costCenter", "Again", FieldType::Text, false, 9, vec![], None);
    assert!(template::add_field(&mut *conn, first, &dup).await.is_err());

    drop(conn);
    db.teardown().await;
}

#[tokio::test]
async fn test_deactivate_field_once() {
    let Some(db) = setup_test_db().await else { return };
    let board_id = create_board(db.pool(), "Board").await;
    let template_id = create_template(db.pool(), board_id, false).await;
    let mut conn = db.conn().await;

    let tmpl = template::find_with_fields(&mut *conn, template_id)
        .await
        .expect("query")
        .expect("template");
    let budget_id = tmpl.fields[2].id;

    assert!(template::deactivate_field(&mut *conn, template_id, budget_id, None).await.expect("deactivate"));
    assert!(!template::deactivate_field(&mut *conn, template_id, budget_id, None).await.expect("again"));
    assert!(!template::deactivate_field(&mut *conn, template_id + 99, tmpl.fields[0].id, None)
        .await
        .expect("wrong template"));

    let after = template::find_with_fields(&mut *conn, template_id)
        .await
        .expect("query")
        .expect("template");
    // deactivated fields stay on the template for history, but leave the form
    assert_eq!(after.fields.len(), 3);
    assert!(!after.fields.iter().find(|f| f.id == budget_id).expect("budget").is_active);
    assert_eq!(after.active_only().fields.len(), 2);

    drop(conn);
    db.teardown().await;
}
