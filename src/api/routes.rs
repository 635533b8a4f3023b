//! API Routes
//!
//! Configures the Axum router with all cache admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_key_handler, delete_prefix_handler, event_handler, health_handler,
    invalidate_handler, keys_handler, list_caches_handler, reset_stats_handler, stats_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /caches` - Stats of every cache
/// - `GET /caches/:name/stats` - Stats of one cache
/// - `POST /caches/:name/stats/reset` - Zero the counters of one cache
/// - `GET /caches/:name/keys` - Stored keys of one cache
/// - `DELETE /caches/:name` - Clear one cache
/// - `DELETE /caches/:name/keys/:key` - Drop one key
/// - `DELETE /caches/:name/prefix/:prefix` - Drop every key with a prefix
/// - `POST /caches/:name/invalidate` - Apply an invalidation body
/// - `POST /events` - Publish a mutation and apply its rules
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/caches", get(list_caches_handler))
        .route("/caches/:name", delete(clear_handler))
        .route("/caches/:name/stats", get(stats_handler))
        .route("/caches/:name/stats/reset", post(reset_stats_handler))
        .route("/caches/:name/keys", get(keys_handler))
        .route("/caches/:name/keys/:key", delete(delete_key_handler))
        .route("/caches/:name/prefix/:prefix", delete(delete_prefix_handler))
        .route("/caches/:name/invalidate", post(invalidate_handler))
        .route("/events", post(event_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
