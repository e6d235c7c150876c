use sqlx::PgConnection;

use crate::errors::AppError;
use super::types::{NewUser, User};

/// Find user by username for authentication. Returns internal User with password hash.
pub async fn find_by_username(conn: &mut PgConnection, username: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, display_name FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

/// Count all users.
pub async fn count(conn: &mut PgConnection) -> Result<i64, AppError> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;
    Ok(n)
}

/// Create a user and return its id.
pub async fn create(conn: &mut PgConnection, new: &NewUser) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (username, password, display_name) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&new.username)
    .bind(&new.password)
    .bind(&new.display_name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Grant a role to a user. Granting an existing role is a no-op.
pub async fn assign_role(conn: &mut PgConnection, user_id: i64, role: &str) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(role)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Role names held by a user, sorted.
pub async fn find_roles(conn: &mut PgConnection, user_id: i64) -> Result<Vec<String>, AppError> {
    let roles: Vec<(String,)> = sqlx::query_as(
        "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(roles.into_iter().map(|r| r.0).collect())
}

/// Permission codes aggregated across all of a user's roles.
pub async fn find_permission_codes(conn: &mut PgConnection, user_id: i64) -> Result<Vec<String>, AppError> {
    let codes: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT rp.permission \
         FROM user_roles ur \
         JOIN role_permissions rp ON rp.role = ur.role \
         WHERE ur.user_id = $1 \
         ORDER BY rp.permission",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(codes.into_iter().map(|c| c.0).collect())
}
