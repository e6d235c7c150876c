//! Shared test infrastructure for database-backed tests.
//!
//! # Test Database Setup
//! - `setup_test_db()` - fresh PostgreSQL database with migrations applied.
//!   Connects through `TEST_DATABASE_URL`; when it is unset the helper
//!   returns `None` and the calling test is skipped.
//! - Fixture helpers for users, boards and templates.

#![allow(dead_code)]

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, Executor, PgConnection, PgPool};
use std::str::FromStr;

use meeting_items::auth::password;
use meeting_items::auth::session::{CurrentUser, Permissions};
use meeting_items::models::decision_board::{self, NewDecisionBoard};
use meeting_items::models::meeting_item::ItemFields;
use meeting_items::models::template::{self, FieldType, NewFieldDefinition, NewFieldOption, NewTemplate, ValidationRules};
use meeting_items::models::user::{self, NewUser};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const TEST_PASS: &str = "password123";

// ============================================================================
// DATABASE SETUP
// ============================================================================

/// A throwaway database. Call `teardown()` at the end of the test to drop it.
pub struct TestDb {
    pool: PgPool,
    name: String,
    admin: PgConnectOptions,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn conn(&self) -> sqlx::pool::PoolConnection<sqlx::Postgres> {
        self.pool.acquire().await.expect("acquire connection")
    }

    pub async fn teardown(self) {
        self.pool.close().await;
        if let Ok(mut conn) = self.admin.connect().await {
            let _ = conn
                .execute(format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name).as_str())
                .await;
            let _ = conn.close().await;
        }
    }
}

/// Create a uniquely named database and run the migrations in it.
pub async fn setup_test_db() -> Option<TestDb> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };
    let admin = PgConnectOptions::from_str(&url).expect("parse TEST_DATABASE_URL");
    let name = format!("mi_test_{:016x}", rand::random::<u64>());

    let mut conn: PgConnection = admin.connect().await.expect("connect to TEST_DATABASE_URL");
    conn.execute(format!("CREATE DATABASE \"{name}\"").as_str())
        .await
        .expect("create test database");
    conn.close().await.expect("close admin connection");

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(admin.clone().database(&name))
        .await
        .expect("connect to test database");
    meeting_items::db::run_migrations(&pool).await.expect("run migrations");

    Some(TestDb { pool, name, admin })
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Create a user holding `role` and return the session view of them.
pub async fn seed_user(pool: &PgPool, username: &str, role: &str) -> CurrentUser {
    let mut conn = pool.acquire().await.expect("acquire");
    let hash = password::hash_password(TEST_PASS).expect("hash");
    let id = user::create(
        &mut *conn,
        &NewUser {
            username: username.to_string(),
            password: hash,
            display_name: username.to_uppercase(),
        },
    )
    .await
    .expect("create user");
    user::assign_role(&mut *conn, id, role).await.expect("assign role");
    let permissions = user::find_permission_codes(&mut *conn, id).await.expect("permissions");

    CurrentUser {
        id,
        username: username.to_string(),
        roles: vec![role.to_string()],
        permissions: Permissions(permissions),
    }
}

pub async fn create_board(pool: &PgPool, name: &str) -> i64 {
    let mut conn = pool.acquire().await.expect("acquire");
    decision_board::create(
        &mut *conn,
        &NewDecisionBoard {
            name: name.to_string(),
            abbreviation: Some("TB".to_string()),
            description: None,
        },
    )
    .await
    .expect("create board")
}

/// A template with a required text field `costCenter`, a dropdown `priority`
/// (low/high) and a number `budget` (0 to 1000).
pub async fn create_template(pool: &PgPool, board_id: i64, make_default: bool) -> i64 {
    let mut conn = pool.acquire().await.expect("acquire");
    let id = template::create(
        &mut *conn,
        board_id,
        &NewTemplate {
            name: "Standard request".to_string(),
            description: None,
            make_default,
        },
        "admin",
    )
    .await
    .expect("create template");
    if make_default {
        decision_board::set_default_template(&mut *conn, board_id, id)
            .await
            .expect("set default");
    }

    let fields = [
        field("costCenter", "Cost center", FieldType::Text, true, 1, vec![], None),
        field(
            "priority",
            "Priority",
            FieldType::Dropdown,
            false,
            2,
            vec![option("low", "Low", 1), option("high", "High", 2)],
            None,
        ),
        field(
            "budget",
            "Budget",
            FieldType::Number,
            false,
            3,
            vec![],
            Some(ValidationRules { min: Some(0.0), max: Some(1000.0), ..Default::default() }),
        ),
    ];
    for f in &fields {
        template::add_field(&mut *conn, id, f).await.expect("add field");
    }
    id
}

pub fn field(
    name: &str,
    label: &str,
    field_type: FieldType,
    required: bool,
    order: i32,
    options: Vec<NewFieldOption>,
    rules: Option<ValidationRules>,
) -> NewFieldDefinition {
    NewFieldDefinition {
        field_name: name.to_string(),
        label: label.to_string(),
        field_type,
        is_required: required,
        category: None,
        display_order: order,
        help_text: None,
        placeholder_text: None,
        validation_rules: rules,
        options,
    }
}

pub fn option(value: &str, label: &str, order: i32) -> NewFieldOption {
    NewFieldOption {
        value: value.to_string(),
        label: label.to_string(),
        display_order: order,
        is_default: false,
    }
}

pub fn item_fields(owner: &str) -> ItemFields {
    ItemFields {
        topic: "Quarterly budget review".to_string(),
        purpose: "Agree the budget envelope for next quarter".to_string(),
        outcome: "Decision".to_string(),
        digital_product: "Finance portal".to_string(),
        duration: 30,
        owner_presenter: owner.to_string(),
        sponsor: None,
    }
}

// ============================================================================
// HTTP APP
// ============================================================================

/// Signing key shared by every test app so cookies survive between requests.
pub const TEST_SESSION_KEY: [u8; 64] = [7u8; 64];

/// Build an initialized actix service wired like `main`, over the given pool
/// and `web::Data<dyn BlobStore>`.
macro_rules! test_app {
    ($pool:expr, $blobs:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::from(&common::TEST_SESSION_KEY[..]),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::new($pool.clone()))
                .app_data($blobs.clone())
                .app_data(actix_web::web::Data::new(
                    meeting_items::auth::rate_limit::RateLimiter::new(),
                ))
                .configure(meeting_items::handlers::configure),
        )
        .await
    };
}
#[allow(unused_imports)]
pub(crate) use test_app;

/// Log in through the API and return the session cookie.
macro_rules! login_cookie {
    ($app:expr, $username:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({ "username": $username, "password": common::TEST_PASS }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "login as {}", $username);
        resp.response()
            .cookies()
            .find(|c| c.name() == "id")
            .map(|c| c.into_owned())
            .expect("session cookie")
    }};
}
#[allow(unused_imports)]
pub(crate) use login_cookie;
