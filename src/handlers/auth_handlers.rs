use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{password, rate_limit::RateLimiter, session};
use crate::errors::AppError;
use crate::models::user::{self, UserProfile};
use crate::responses::{ApiResponse, ok};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

const MSG_BAD_CREDENTIALS: &str = "Invalid username or password";

/// POST /api/auth/login
pub async fn login(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<LoginRequest>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    // Rate-limit check BEFORE any database access
    let ip = req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

    if limiter.is_blocked(ip) {
        return Ok(ApiResponse::error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many failed login attempts. Please try again later.",
            vec![],
        ));
    }

    let mut conn = pool.acquire().await?;
    let found = user::find_by_username(&mut *conn, body.username.trim()).await?;

    let Some(u) = found else {
        limiter.record_failure(ip);
        return Ok(ApiResponse::error_response(StatusCode::UNAUTHORIZED, MSG_BAD_CREDENTIALS, vec![]));
    };
    if !password::verify_password(&body.password, &u.password).unwrap_or(false) {
        limiter.record_failure(ip);
        log::info!("Failed login for {}", u.username);
        return Ok(ApiResponse::error_response(StatusCode::UNAUTHORIZED, MSG_BAD_CREDENTIALS, vec![]));
    }

    // Successful login, clear rate limit for this IP
    limiter.clear(ip);

    // Multi-role: aggregate permissions across all assigned roles
    let roles = user::find_roles(&mut *conn, u.id).await?;
    let permissions = user::find_permission_codes(&mut *conn, u.id).await?;
    session::sign_in(&session, u.id, &u.username, &roles, &permissions)?;

    log::info!("User {} signed in", u.username);
    Ok(ok(UserProfile {
        id: u.id,
        username: u.username,
        display_name: u.display_name,
        roles,
        permissions,
    }))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> Result<HttpResponse, AppError> {
    session.purge();
    Ok(ok(()))
}

/// GET /api/auth/me
pub async fn me(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    let current = session::current_user(&session)?;
    let mut conn = pool.acquire().await?;
    let u = user::find_by_username(&mut *conn, &current.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(ok(UserProfile {
        id: u.id,
        username: u.username,
        display_name: u.display_name,
        roles: current.roles,
        permissions: current.permissions.0,
    }))
}
