pub mod auth_handlers;
pub mod decision_board_handlers;
pub mod meeting_item_handlers;
pub mod template_handlers;

use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::web;

use crate::auth::middleware::{require_auth, require_json_content_type};
use crate::responses::ApiResponse;

/// Largest accepted JSON body; uploads arrive base64-encoded inside it.
pub const JSON_LIMIT: usize = 16 * 1024 * 1024;

/// Both route prefixes serve the same meeting item handlers.
pub const MEETING_ITEM_PREFIXES: [&str; 2] = ["/api/meeting-items", "/api/MeetingItems"];

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| {
            let message = format!("Invalid request body: {err}");
            let response = ApiResponse::error_response(StatusCode::BAD_REQUEST, message, vec![]);
            InternalError::from_response(err, response).into()
        })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let response = ApiResponse::error_response(StatusCode::NOT_FOUND, crate::errors::MSG_NOT_FOUND, vec![]);
        InternalError::from_response(err, response).into()
    })
}

/// Register every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use meeting_item_handlers::{create, documents, list, read, status, update};

    cfg.app_data(json_config()).app_data(path_config());

    cfg.service(
        web::scope("/api/auth")
            .wrap(from_fn(require_json_content_type))
            .route("/login", web::post().to(auth_handlers::login))
            .route("/logout", web::post().to(auth_handlers::logout))
            .route("/me", web::get().to(auth_handlers::me)),
    );

    for prefix in MEETING_ITEM_PREFIXES {
        // Fixed segments BEFORE /{id} to avoid routing conflicts
        cfg.service(
            web::scope(prefix)
                .wrap(from_fn(require_auth))
                .wrap(from_fn(require_json_content_type))
                .route("", web::get().to(list::list))
                .route("", web::post().to(create::create))
                .route("/decision-board/{board_id}", web::get().to(list::by_board))
                .route("/template/{board_id}", web::get().to(list::form_template))
                .route("/{id}", web::get().to(read::read))
                .route("/{id}", web::put().to(update::update))
                .route("/{id}/status", web::patch().to(status::change_status))
                .route("/{id}/status-history", web::get().to(read::status_history))
                .route("/{id}/documents", web::post().to(documents::upload))
                .route("/{id}/documents/{doc_id}/versions", web::get().to(documents::versions))
                .route("/{id}/documents/{doc_id}/content", web::get().to(documents::content))
                .route("/{id}/documents/{doc_id}", web::delete().to(documents::delete)),
        );
    }

    cfg.service(
        web::scope("/api/decision-boards")
            .wrap(from_fn(require_auth))
            .wrap(from_fn(require_json_content_type))
            .route("", web::get().to(decision_board_handlers::list))
            .route("", web::post().to(decision_board_handlers::create))
            .route("/{id}", web::get().to(decision_board_handlers::read))
            .route("/{id}/templates", web::get().to(decision_board_handlers::templates))
            .route("/{id}/templates", web::post().to(template_handlers::create)),
    );

    cfg.service(
        web::scope("/api/templates")
            .wrap(from_fn(require_auth))
            .wrap(from_fn(require_json_content_type))
            .route("/{id}", web::get().to(template_handlers::read))
            .route("/{id}/fields", web::post().to(template_handlers::add_field))
            .route("/{id}/fields/{field_id}/deactivate", web::post().to(template_handlers::deactivate_field)),
    );
}
