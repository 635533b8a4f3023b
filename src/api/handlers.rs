//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::caches::{default_rules, AppCaches};
use crate::error::{AppError, Result};
use crate::invalidation::{CacheRegistry, Invalidation, Invalidator, ManagedCache};
use crate::models::{
    CachesResponse, EventResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
    KeysResponse, MutationRequest, StatsResponse,
};

/// Application state shared across all handlers.
///
/// Caches synchronize internally, so the state is only cheap `Arc` clones.
#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: Arc<CacheRegistry>,
    pub invalidator: Invalidator,
}

impl AppState {
    /// Creates a new AppState around an invalidator and the registry it drives.
    pub fn new(invalidator: Invalidator) -> Self {
        Self {
            registry: invalidator.registry().clone(),
            invalidator,
        }
    }

    /// Creates a new AppState over the application caches with the default rules.
    pub fn from_caches(caches: &AppCaches) -> Self {
        let registry = Arc::new(caches.registry());
        Self::new(Invalidator::new(registry, default_rules()))
    }

    fn cache(&self, name: &str) -> Result<Arc<dyn ManagedCache>> {
        self.registry
            .get(name)
            .ok_or_else(|| AppError::CacheNotFound(name.to_string()))
    }

    fn invalidate(&self, name: &str, target: Invalidation) -> Result<InvalidateResponse> {
        let cache = self.cache(name)?;
        let removed = cache.invalidate(&target);
        info!(cache = name, ?target, removed, "manual invalidation");
        Ok(InvalidateResponse::new(name, removed))
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.registry.len()))
}

/// Handler for GET /caches
///
/// Stats of every registered cache, in registration order.
pub async fn list_caches_handler(State(state): State<AppState>) -> Json<CachesResponse> {
    Json(CachesResponse::new(state.registry.stats()))
}

/// Handler for GET /caches/:name/stats
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatsResponse>> {
    let cache = state.cache(&name)?;
    Ok(Json(StatsResponse::new(cache.stats())))
}

/// Handler for POST /caches/:name/stats/reset
///
/// Zeroes the hit, miss and eviction counters. Entries are kept.
pub async fn reset_stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatsResponse>> {
    let cache = state.cache(&name)?;
    cache.reset_stats();
    info!("Stats reset for cache '{}'", name);
    Ok(Json(StatsResponse::new(cache.stats())))
}

/// Handler for GET /caches/:name/keys
///
/// Lists stored keys, including expired ones the reaper has not removed yet.
pub async fn keys_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<KeysResponse>> {
    let cache = state.cache(&name)?;
    Ok(Json(KeysResponse::new(name, cache.key_strings())))
}

/// Handler for DELETE /caches/:name/keys/:key
pub async fn delete_key_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Json<InvalidateResponse>> {
    state.invalidate(&name, Invalidation::Key(key)).map(Json)
}

/// Handler for DELETE /caches/:name/prefix/:prefix
pub async fn delete_prefix_handler(
    State(state): State<AppState>,
    Path((name, prefix)): Path<(String, String)>,
) -> Result<Json<InvalidateResponse>> {
    state.invalidate(&name, Invalidation::Prefix(prefix)).map(Json)
}

/// Handler for DELETE /caches/:name
pub async fn clear_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    state.invalidate(&name, Invalidation::All).map(Json)
}

/// Handler for POST /caches/:name/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    state.invalidate(&name, req.target).map(Json)
}

/// Handler for POST /events
///
/// Publishes a mutation: every cache the rules tie to it is invalidated
/// before the response is sent.
pub async fn event_handler(
    State(state): State<AppState>,
    Json(event): Json<MutationRequest>,
) -> Json<EventResponse> {
    let entity = event.entity;
    let action = event.action;
    let invalidated = state.invalidator.publish(event);

    Json(EventResponse {
        entity,
        action,
        invalidated,
    })
}
