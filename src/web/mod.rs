//! Browser-facing HTTP surface.
//!
//! This module handles:
//! - Router construction and shared application state
//! - Session lifecycle endpoints (create, delete, reset)
//! - File upload, sample loading, SQL execution, schema listing

mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::session::SessionRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions, each owning its own in-memory database connection.
    pub sessions: Arc<SessionRegistry>,
    /// Maximum upload body size in bytes.
    pub upload_limit_bytes: usize,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/sessions", post(handlers::create_session))
        .route("/api/v1/sessions/:id", delete(handlers::delete_session))
        .route("/api/v1/sessions/:id/upload", post(handlers::upload))
        .route("/api/v1/sessions/:id/sample", post(handlers::load_sample))
        .route("/api/v1/sessions/:id/sql", post(handlers::run_sql))
        .route("/api/v1/sessions/:id/schema", get(handlers::schema))
        .route("/api/v1/sessions/:id/editor", get(handlers::editor))
        .route("/api/v1/sessions/:id/reset", post(handlers::reset))
        .layer(DefaultBodyLimit::max(state.upload_limit_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
