use serde::Serialize;

/// Internal user struct for authentication, includes the password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub display_name: String,
}

/// User as exposed over the API (no password hash).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// New user data for creation. `password` is already hashed.
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CHAIR: &str = "chair";
pub const ROLE_SECRETARY: &str = "secretary";
pub const ROLE_REQUESTOR: &str = "requestor";

pub const PERM_ITEM_VIEW: &str = "meeting_item.view";
pub const PERM_ITEM_CREATE: &str = "meeting_item.create";
pub const PERM_ITEM_UPDATE: &str = "meeting_item.update";
pub const PERM_ITEM_STATUS: &str = "meeting_item.status";
pub const PERM_ITEM_DOCUMENT: &str = "meeting_item.document";
pub const PERM_TEMPLATE_VIEW: &str = "template.view";
pub const PERM_TEMPLATE_MANAGE: &str = "template.manage";
pub const PERM_BOARD_MANAGE: &str = "decision_board.manage";
