//! Application Caches
//!
//! The FLUPSY backend's cache instances, each with its own TTL and payload
//! type, and the invalidation rules that keep them honest.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ResponseCache;
use crate::cache::{filter_key, normalize_query, CacheEngine, CacheOptions, Clock, SystemClock};
use crate::config::Config;
use crate::invalidation::{CacheRegistry, Entity, InvalidationRules, Target};

// == Cache Names ==
pub const OPERATIONS: &str = "operations";
pub const BASKETS: &str = "baskets";
pub const POSITIONS: &str = "positions";
pub const LOT_STATISTICS: &str = "lot_statistics";
pub const DASHBOARD: &str = "dashboard";
pub const AI_QUERY: &str = "ai_query";
pub const RESPONSES: &str = "responses";

// == Payloads ==
/// Position history of one basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionHistory {
    pub basket_exists: bool,
    pub positions: Vec<Value>,
}

/// Animal counts per lot quality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityCounts {
    pub normali: f64,
    pub teste: f64,
    pub code: f64,
    pub totale: f64,
}

/// Share of each quality, in percent with one decimal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityPercentages {
    pub normali: f64,
    pub teste: f64,
    pub code: f64,
}

/// Aggregate statistics over all lots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LotStatistics {
    pub total_count: u64,
    pub counts: QualityCounts,
    pub percentages: QualityPercentages,
}

impl LotStatistics {
    /// Builds the statistics from raw quality counts.
    pub fn from_counts(total_count: u64, counts: QualityCounts) -> Self {
        let share = |part: f64| {
            if counts.totale > 0.0 {
                (part / counts.totale * 1000.0).round() / 10.0
            } else {
                0.0
            }
        };
        let percentages = QualityPercentages {
            normali: share(counts.normali),
            teste: share(counts.teste),
            code: share(counts.code),
        };
        Self {
            total_count,
            counts,
            percentages,
        }
    }
}

/// Result rows of an AI-generated report query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedQueryResult {
    pub rows: Vec<Value>,
    pub analysis: Value,
    pub cached_at: DateTime<Utc>,
}

impl CachedQueryResult {
    pub fn new(rows: Vec<Value>, analysis: Value) -> Self {
        Self {
            rows,
            analysis,
            cached_at: Utc::now(),
        }
    }
}

/// A GET response body kept by the response cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// Unix ms on the cache clock when the response was stored
    pub cached_at: u64,
}

// == Key Helpers ==
/// Key of a filtered operations list.
pub fn operations_key<I, N, V>(filters: I) -> String
where
    I: IntoIterator<Item = (N, V)>,
    N: Into<String>,
    V: std::fmt::Display,
{
    filter_key(OPERATIONS, filters)
}

/// Key of a filtered baskets list.
pub fn baskets_key<I, N, V>(filters: I) -> String
where
    I: IntoIterator<Item = (N, V)>,
    N: Into<String>,
    V: std::fmt::Display,
{
    filter_key(BASKETS, filters)
}

/// Key of a single basket's detail view.
pub fn basket_detail_key(basket_id: i64) -> String {
    format!("basket:{}", basket_id)
}

/// Key of an AI report query.
pub fn ai_query_key(sql: &str) -> String {
    normalize_query(sql)
}

// == App Caches ==
/// Every cache instance of the application.
///
/// Each one is a separate engine; handlers receive the ones they need.
#[derive(Debug, Clone)]
pub struct AppCaches {
    pub operations: Arc<CacheEngine<String, Value>>,
    pub baskets: Arc<CacheEngine<String, Value>>,
    pub positions: Arc<CacheEngine<i64, PositionHistory>>,
    pub lot_statistics: Arc<CacheEngine<String, LotStatistics>>,
    pub dashboard: Arc<CacheEngine<String, Value>>,
    pub ai_query: Arc<CacheEngine<String, CachedQueryResult>>,
    /// HTTP GET responses, per-route TTLs
    pub responses: ResponseCache,
}

impl AppCaches {
    pub fn from_config(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let options = |name: &str, ttl_secs: u64| {
            CacheOptions::new(name, Duration::from_secs(ttl_secs)).max_entries(config.max_entries)
        };

        Self {
            operations: Arc::new(CacheEngine::with_clock(
                options(OPERATIONS, config.operations_ttl),
                clock.clone(),
            )),
            baskets: Arc::new(CacheEngine::with_clock(
                options(BASKETS, config.baskets_ttl),
                clock.clone(),
            )),
            positions: Arc::new(CacheEngine::with_clock(
                options(POSITIONS, config.positions_ttl),
                clock.clone(),
            )),
            lot_statistics: Arc::new(CacheEngine::with_clock(
                options(LOT_STATISTICS, config.lot_stats_ttl),
                clock.clone(),
            )),
            dashboard: Arc::new(CacheEngine::with_clock(
                options(DASHBOARD, config.dashboard_ttl),
                clock.clone(),
            )),
            ai_query: Arc::new(CacheEngine::with_clock(
                options(AI_QUERY, config.ai_query_ttl),
                clock.clone(),
            )),
            // Every store passes its route TTL; the default only covers direct writes
            responses: ResponseCache::new(
                Arc::new(CacheEngine::with_clock(
                    options(RESPONSES, config.operations_ttl),
                    clock,
                )),
                &config.response_ttls,
            ),
        }
    }

    /// Registry over all instances, for the reaper, invalidator and admin API.
    pub fn registry(&self) -> CacheRegistry {
        let mut registry = CacheRegistry::new();
        registry.register(self.operations.clone());
        registry.register(self.baskets.clone());
        registry.register(self.positions.clone());
        registry.register(self.lot_statistics.clone());
        registry.register(self.dashboard.clone());
        registry.register(self.ai_query.clone());
        registry.register(self.responses.engine().clone());
        registry
    }
}

// == Default Rules ==
/// Which caches each kind of FLUPSY write makes stale.
pub fn default_rules() -> InvalidationRules {
    let basket_lists = || Target::prefix(BASKETS, &format!("{}_", BASKETS));
    let basket_detail = || Target::key(BASKETS, "basket:{basket_id}");
    let route = |path: &str| Target::prefix(RESPONSES, path);

    InvalidationRules::new()
        .on(
            Entity::Operation,
            [
                Target::all(OPERATIONS),
                Target::all(DASHBOARD),
                basket_lists(),
                basket_detail(),
                Target::all(LOT_STATISTICS),
                Target::all(AI_QUERY),
            ],
        )
        .on(
            Entity::Basket,
            [
                basket_lists(),
                basket_detail(),
                Target::key(POSITIONS, "{basket_id}"),
                Target::all(DASHBOARD),
                Target::all(AI_QUERY),
            ],
        )
        .on(
            Entity::Position,
            [
                Target::key(POSITIONS, "{basket_id}"),
                basket_lists(),
                basket_detail(),
                Target::all(DASHBOARD),
            ],
        )
        .on(
            Entity::Cycle,
            [
                Target::all(OPERATIONS),
                basket_lists(),
                Target::all(DASHBOARD),
                Target::all(AI_QUERY),
            ],
        )
        .on(
            Entity::Lot,
            [
                Target::all(LOT_STATISTICS),
                Target::all(DASHBOARD),
                Target::all(AI_QUERY),
            ],
        )
        .on(
            Entity::Flupsy,
            [
                Target::all(BASKETS),
                Target::all(POSITIONS),
                Target::all(DASHBOARD),
                Target::all(AI_QUERY),
            ],
        )
        // Screening rewrites cycles, operations and baskets in one transaction
        .on(
            Entity::Screening,
            [
                Target::all(OPERATIONS),
                Target::all(BASKETS),
                Target::all(POSITIONS),
                Target::all(LOT_STATISTICS),
                Target::all(DASHBOARD),
                Target::all(AI_QUERY),
            ],
        )
        .on(Entity::Sgr, [Target::all(DASHBOARD), Target::all(AI_QUERY)])
        // Cached GET responses are keyed by path and query
        .on(
            Entity::Operation,
            [
                route("/api/operations"),
                route("/api/dashboard-data"),
                route("/api/baskets"),
                route("/api/cycles"),
                route("/api/diario"),
                route("/api/quick-operations"),
            ],
        )
        .on(
            Entity::Basket,
            [route("/api/baskets"), route("/api/dashboard-data")],
        )
        .on(Entity::Position, [route("/api/baskets")])
        .on(
            Entity::Cycle,
            [
                route("/api/cycles"),
                route("/api/statistics"),
                route("/api/dashboard-data"),
            ],
        )
        .on(
            Entity::Lot,
            [route("/api/lots"), route("/api/dashboard-data")],
        )
        .on(
            Entity::Flupsy,
            [
                route("/api/flupsys"),
                route("/api/baskets"),
                route("/api/dashboard-data"),
            ],
        )
        .on(Entity::Screening, [Target::all(RESPONSES)])
        .on(
            Entity::Sgr,
            [route("/api/sgr"), route("/api/size-predictions")],
        )
}
