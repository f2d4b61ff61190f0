//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, health_handler, rename_handler, set_handler,
    stats_handler, summary_handler, sweep_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a value
/// - `GET /get/:key` - Retrieve a value (`?partition=`)
/// - `DELETE /del/:key` - Delete a key (`?partition=`)
/// - `POST /rename` - Move an entry to another key
/// - `POST /sweep` - Run an expiration sweep now
/// - `DELETE /clear` - Drop every entry
/// - `GET /summary` - Per-bucket usage of live entries
/// - `GET /stats` - Entry count and sweep status
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/rename", post(rename_handler))
        .route("/sweep", post(sweep_handler))
        .route("/clear", delete(clear_handler))
        .route("/summary", get(summary_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
