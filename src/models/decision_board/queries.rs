use sqlx::PgConnection;

use crate::errors::AppError;
use super::types::*;

const SELECT_BOARD: &str = "SELECT id, name, abbreviation, description, default_template_id, \
                                   is_active, created_at \
                            FROM decision_boards";

pub async fn find_all(conn: &mut PgConnection) -> Result<Vec<DecisionBoard>, AppError> {
    let boards = sqlx::query_as::<_, DecisionBoard>(&format!("{SELECT_BOARD} ORDER BY name"))
        .fetch_all(&mut *conn)
        .await?;
    Ok(boards)
}

pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<DecisionBoard>, AppError> {
    let board = sqlx::query_as::<_, DecisionBoard>(&format!("{SELECT_BOARD} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(board)
}

/// True when the board exists and is active.
pub async fn exists_active(conn: &mut PgConnection, id: i64) -> Result<bool, AppError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM decision_boards WHERE id = $1 AND is_active)",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

/// Insert a board. A missing abbreviation falls back to "DB".
pub async fn create(conn: &mut PgConnection, new: &NewDecisionBoard) -> Result<i64, AppError> {
    let abbreviation = new
        .abbreviation
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or("DB");

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO decision_boards (name, abbreviation, description) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(new.name.trim())
    .bind(abbreviation)
    .bind(new.description.as_deref())
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn name_taken(conn: &mut PgConnection, name: &str) -> Result<bool, AppError> {
    let (taken,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM decision_boards WHERE lower(name) = lower($1))",
    )
    .bind(name.trim())
    .fetch_one(&mut *conn)
    .await?;
    Ok(taken)
}

pub async fn set_default_template(conn: &mut PgConnection, board_id: i64, template_id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE decision_boards SET default_template_id = $1 WHERE id = $2")
        .bind(template_id)
        .bind(board_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
