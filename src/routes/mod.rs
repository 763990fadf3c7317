//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Base64 photos from phone cameras run well past axum's 2 MB default.
pub const IMAGE_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - JSON API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Catalog
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/courses", get(http::http_list_courses))
        .route("/api/v1/courses/:course_id", get(http::http_get_course))
        .route("/api/v1/tip", get(http::http_get_tip))
        // Navigation
        .route("/api/v1/session", get(http::http_get_session))
        .route("/api/v1/session/navigate", post(http::http_post_navigate))
        .route("/api/v1/session/course", post(http::http_post_select_course))
        .route("/api/v1/session/chapter", post(http::http_post_select_chapter))
        .route("/api/v1/session/advance", post(http::http_post_advance))
        // Practice + explanations
        .route("/api/v1/practice", post(http::http_post_practice))
        .route("/api/v1/explain", get(http::http_get_explain).post(http::http_post_explain))
        // Profile
        .route("/api/v1/progress", get(http::http_get_progress))
        .route("/api/v1/progress/:course_id", get(http::http_get_course_progress))
        .route("/api/v1/theme", post(http::http_post_theme))
        // Playground + assistant
        .route("/api/v1/playground/check", post(http::http_post_check_code))
        .route(
            "/api/v1/playground/image",
            post(http::http_post_image).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        .route("/api/v1/speech", post(http::http_post_speech))
        .route("/api/v1/chat", post(http::http_post_chat))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
