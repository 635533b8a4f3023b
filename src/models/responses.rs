//! Response DTOs for the cache admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::invalidation::{Action, Entity, InvalidationOutcome};

/// Response body for `GET /caches/:name/stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(stats: CacheStats) -> Self {
        let hit_rate = stats.hit_rate();
        Self { stats, hit_rate }
    }
}

/// Response body for `GET /caches`
#[derive(Debug, Clone, Serialize)]
pub struct CachesResponse {
    pub caches: Vec<StatsResponse>,
}

impl CachesResponse {
    pub fn new(stats: Vec<CacheStats>) -> Self {
        Self {
            caches: stats.into_iter().map(StatsResponse::new).collect(),
        }
    }
}

/// Response body for `GET /caches/:name/keys`
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub cache: String,
    pub keys: Vec<String>,
}

impl KeysResponse {
    /// Creates a KeysResponse with keys sorted for stable output
    pub fn new(cache: impl Into<String>, mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            cache: cache.into(),
            keys,
        }
    }
}

/// Response body for every single-cache invalidation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Cache that was invalidated
    pub cache: String,
    /// Number of entries removed
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(cache: impl Into<String>, removed: usize) -> Self {
        Self {
            cache: cache.into(),
            removed,
        }
    }
}

/// Response body for `POST /events`
#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub entity: Entity,
    pub action: Action,
    /// What each matching rule removed
    pub invalidated: Vec<InvalidationOutcome>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Number of registered caches
    pub caches: usize,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(caches: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            caches,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
