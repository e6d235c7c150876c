use actix_session::Session;

use crate::errors::AppError;

/// Wrapper around permission codes with a `has()` check.
#[derive(Debug, Clone, Default)]
pub struct Permissions(pub Vec<String>);

impl Permissions {
    pub fn has(&self, code: &str) -> bool {
        self.0.iter().any(|p| p == code)
    }

    pub fn from_csv(csv: &str) -> Self {
        let codes = csv
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Permissions(codes)
    }
}

/// The signed-in user as seen by handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Permissions,
}

impl CurrentUser {
    pub fn require(&self, code: &str) -> Result<(), AppError> {
        if self.permissions.has(code) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(code.to_string()))
        }
    }
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>("user_id").unwrap_or(None)
}

pub fn get_username(session: &Session) -> Result<String, String> {
    match session.get::<String>("username") {
        Ok(Some(username)) => Ok(username),
        Ok(None) => Err("No username in session".to_string()),
        Err(e) => Err(format!("Session error: {}", e)),
    }
}

pub fn get_permissions(session: &Session) -> Result<Permissions, String> {
    match session.get::<String>("permissions") {
        Ok(Some(csv)) => Ok(Permissions::from_csv(&csv)),
        Ok(None) => Err("No permissions in session".to_string()),
        Err(e) => Err(format!("Session error: {}", e)),
    }
}

pub fn get_roles(session: &Session) -> Vec<String> {
    session
        .get::<String>("roles")
        .unwrap_or(None)
        .map(|csv| Permissions::from_csv(&csv).0)
        .unwrap_or_default()
}

/// Store the authenticated identity in the session cookie.
pub fn sign_in(
    session: &Session,
    user_id: i64,
    username: &str,
    roles: &[String],
    permissions: &[String],
) -> Result<(), AppError> {
    session.renew();
    session
        .insert("user_id", user_id)
        .and_then(|_| session.insert("username", username))
        .and_then(|_| session.insert("roles", roles.join(",")))
        .and_then(|_| session.insert("permissions", permissions.join(",")))
        .map_err(|e| AppError::Session(e.to_string()))
}

/// Resolve the signed-in user; 401 when the session carries no identity.
pub fn current_user(session: &Session) -> Result<CurrentUser, AppError> {
    let id = get_user_id(session).ok_or(AppError::Unauthorized)?;
    let username = get_username(session).map_err(AppError::Session)?;
    let permissions = get_permissions(session).map_err(AppError::Session)?;
    Ok(CurrentUser {
        id,
        username,
        roles: get_roles(session),
        permissions,
    })
}

/// Check permission; returns Err(AppError) if denied.
pub fn require_permission(session: &Session, code: &str) -> Result<CurrentUser, AppError> {
    let user = current_user(session)?;
    user.require(code)?;
    Ok(user)
}
