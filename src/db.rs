use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;

use crate::errors::AppError;
use crate::models::user::{self, NewUser, ROLE_ADMIN};

pub type DbPool = PgPool;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the `admin` account on an empty database.
pub async fn seed_admin(pool: &DbPool, admin_password_hash: &str) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let count = user::count(&mut *tx).await?;
    if count > 0 {
        log::info!("Database already has {count} users, skipping admin seed");
        return Ok(());
    }

    let id = user::create(
        &mut *tx,
        &NewUser {
            username: "admin".to_string(),
            password: admin_password_hash.to_string(),
            display_name: "Administrator".to_string(),
        },
    )
    .await?;
    user::assign_role(&mut *tx, id, ROLE_ADMIN).await?;
    tx.commit().await?;

    log::info!("Seeded admin user (id {id})");
    Ok(())
}
