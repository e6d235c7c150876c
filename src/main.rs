use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};
use std::sync::Arc;

use meeting_items::auth::{self, rate_limit::RateLimiter};
use meeting_items::config::AppConfig;
use meeting_items::storage::{BlobStore, FsBlobStore};
use meeting_items::{audit, db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    // Initialize database
    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .map_err(std::io::Error::other)?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;

    // Seed the admin account if the database is empty
    let admin_hash = auth::password::hash_password(&config.admin_password).map_err(std::io::Error::other)?;
    db::seed_admin(&pool, &admin_hash).await.map_err(std::io::Error::other)?;

    // Clean up old audit entries based on retention policy
    if let Err(e) = audit::cleanup_old_entries(&pool, config.audit_retention_days).await {
        log::warn!("Audit cleanup failed: {e}");
    }

    tokio::fs::create_dir_all(&config.blob_root).await?;
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.blob_root));
    let blobs = web::Data::from(blobs);

    // Session encryption key, load from SESSION_KEY for persistent sessions across restarts
    let secret_key = match config.session_key.as_deref() {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let limiter = web::Data::new(RateLimiter::new());
    let static_dir = config.static_dir.clone();

    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(false)
        .cookie_http_only(true)
        .build();

        let mut app = App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(blobs.clone())
            .app_data(limiter.clone())
            .configure(handlers::configure);

        // Built SPA bundle, served last so API routes win
        if let Some(dir) = &static_dir {
            app = app.service(actix_files::Files::new("/", dir).index_file("index.html"));
        }
        app
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
