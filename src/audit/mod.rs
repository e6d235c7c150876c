use serde_json::Value;
use sqlx::PgConnection;

use crate::db::DbPool;

#[derive(Debug)]
pub enum AuditError {
    DbError(sqlx::Error),
}

impl From<sqlx::Error> for AuditError {
    fn from(err: sqlx::Error) -> Self {
        AuditError::DbError(err)
    }
}

impl std::fmt::Display for AuditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditError::DbError(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for AuditError {}

/// Record an audit entry. Runs on the caller's connection so it commits or
/// rolls back with the change it describes.
pub async fn log(
    conn: &mut PgConnection,
    user_id: i64,
    action: &str,
    target_type: &str,
    target_id: i64,
    details: Value,
) -> Result<(), AuditError> {
    sqlx::query(
        "INSERT INTO audit_log (user_id, action, target_type, target_id, details) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(details)
    .execute(&mut *conn)
    .await?;
    log::debug!("audit: user {user_id} {action} {target_type}#{target_id}");
    Ok(())
}

/// Delete entries older than `retention_days`. Returns the number removed.
/// The retention is clamped to between one day and a century.
pub async fn cleanup_old_entries(pool: &DbPool, retention_days: i64) -> Result<u64, AuditError> {
    let result = sqlx::query("DELETE FROM audit_log WHERE created_at < now() - make_interval(days => $1)")
        .bind(retention_interval_days(retention_days))
        .execute(pool)
        .await?;
    let removed = result.rows_affected();
    if removed > 0 {
        log::info!("Audit cleanup removed {removed} entries older than {retention_days} days");
    }
    Ok(removed)
}

/// Upper bound on the retention interval, about a century.
const MAX_RETENTION_DAYS: i64 = 36_525;

fn retention_interval_days(retention_days: i64) -> i32 {
    retention_days.clamp(1, MAX_RETENTION_DAYS) as i32
}
