use std::env;

/// Runtime configuration, read from the environment (a `.env` file is loaded first by `main`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub blob_root: String,
    pub session_key: Option<String>,
    pub static_dir: Option<String>,
    pub admin_password: String,
    pub audit_retention_days: i64,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (lets tests avoid touching process env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        let audit_retention_days = match lookup("AUDIT_RETENTION_DAYS") {
            Some(v) => v
                .parse::<i64>()
                .map_err(|_| format!("AUDIT_RETENTION_DAYS must be a number, got '{v}'"))?,
            None => 365,
        };
        // Zero or negative would make every audit entry "expired"
        if audit_retention_days < 1 {
            return Err(format!("AUDIT_RETENTION_DAYS must be at least 1, got {audit_retention_days}"));
        }

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .map_err(|_| format!("DB_MAX_CONNECTIONS must be a number, got '{v}'"))?,
            None => 8,
        };

        Ok(AppConfig {
            database_url,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            blob_root: lookup("BLOB_ROOT").unwrap_or_else(|| "data/blobs".to_string()),
            session_key: lookup("SESSION_KEY"),
            static_dir: lookup("STATIC_DIR").filter(|v| !v.trim().is_empty()),
            admin_password: lookup("ADMIN_PASSWORD").unwrap_or_else(|| "admin123".to_string()),
            audit_retention_days,
            db_max_connections,
        })
    }
}
