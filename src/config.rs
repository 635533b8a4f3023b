//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Cached GET routes and their TTL in seconds.
const DEFAULT_RESPONSE_TTLS: &[(&str, u64)] = &[
    ("/api/flupsys", 3600),
    ("/api/sizes", 3600),
    ("/api/sgrs", 3600),
    ("/api/mortality-rates", 3600),
    ("/api/proxy/tide-data", 1800),
    ("/api/proxy/tide-forecast", 1800),
    ("/api/lots", 900),
    ("/api/lots/optimized", 900),
    ("/api/size-predictions", 900),
    ("/api/notifications", 600),
    ("/api/baskets", 600),
    ("/api/baskets/detail", 600),
    ("/api/operations", 300),
    ("/api/operations-optimized", 300),
    ("/api/cycles", 300),
    ("/api/dashboard-data", 300),
    ("/api/statistics/cycles/comparison", 300),
    ("/api/cycles/active", 300),
    ("/api/cycles/active-with-details", 300),
    ("/api/diario/operations-by-date", 300),
    ("/api/sgr-giornalieri", 120),
    ("/api/quick-operations", 120),
];

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// TTLs are per cache instance and fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Background reaper interval in seconds, 0 disables the reaper
    pub reaper_interval: u64,
    /// Capacity bound of each cache instance, 0 for unbounded
    pub max_entries: usize,
    /// Operations list cache TTL in seconds
    pub operations_ttl: u64,
    /// Baskets cache TTL in seconds
    pub baskets_ttl: u64,
    /// Basket position history cache TTL in seconds
    pub positions_ttl: u64,
    /// Lot statistics cache TTL in seconds
    pub lot_stats_ttl: u64,
    /// Unified dashboard cache TTL in seconds
    pub dashboard_ttl: u64,
    /// AI report query cache TTL in seconds
    pub ai_query_ttl: u64,
    /// GET routes whose responses are cached, with their TTL in seconds
    pub response_ttls: HashMap<String, u64>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REAPER_INTERVAL` - Expired entry sweep frequency in seconds, 0 = disabled (default: 600)
    /// - `MAX_ENTRIES` - Per-cache capacity, 0 = unbounded (default: 1000)
    /// - `OPERATIONS_CACHE_TTL` - seconds (default: 120)
    /// - `BASKETS_CACHE_TTL` - seconds (default: 600)
    /// - `POSITIONS_CACHE_TTL` - seconds (default: 300)
    /// - `LOT_STATS_CACHE_TTL` - seconds (default: 300)
    /// - `DASHBOARD_CACHE_TTL` - seconds (default: 30)
    /// - `AI_QUERY_CACHE_TTL` - seconds (default: 1800)
    /// - `RESPONSE_CACHE_TTLS` - `path=seconds` pairs separated by commas,
    ///   merged over the built-in route table; `path=0` stops caching a route
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut response_ttls = defaults.response_ttls;
        if let Ok(overrides) = env::var("RESPONSE_CACHE_TTLS") {
            for (path, ttl) in parse_route_ttls(&overrides) {
                if ttl == 0 {
                    response_ttls.remove(&path);
                } else {
                    response_ttls.insert(path, ttl);
                }
            }
        }

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            reaper_interval: env_or("REAPER_INTERVAL", defaults.reaper_interval),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            operations_ttl: env_or("OPERATIONS_CACHE_TTL", defaults.operations_ttl),
            baskets_ttl: env_or("BASKETS_CACHE_TTL", defaults.baskets_ttl),
            positions_ttl: env_or("POSITIONS_CACHE_TTL", defaults.positions_ttl),
            lot_stats_ttl: env_or("LOT_STATS_CACHE_TTL", defaults.lot_stats_ttl),
            dashboard_ttl: env_or("DASHBOARD_CACHE_TTL", defaults.dashboard_ttl),
            ai_query_ttl: env_or("AI_QUERY_CACHE_TTL", defaults.ai_query_ttl),
            response_ttls,
        }
    }

    /// Reaper period, `None` when the reaper is disabled.
    pub fn reaper_period(&self) -> Option<Duration> {
        (self.reaper_interval > 0).then(|| Duration::from_secs(self.reaper_interval))
    }
}

/// Parses `path=seconds,path=seconds`. Malformed pairs are skipped.
fn parse_route_ttls(raw: &str) -> Vec<(String, u64)> {
    raw.split(',')
        .filter_map(|pair| {
            let (path, ttl) = pair.split_once('=')?;
            let path = path.trim();
            if !path.starts_with('/') {
                return None;
            }
            Some((path.to_string(), ttl.trim().parse().ok()?))
        })
        .collect()
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            reaper_interval: 600,
            max_entries: 1000,
            operations_ttl: 120,
            baskets_ttl: 600,
            positions_ttl: 300,
            lot_stats_ttl: 300,
            dashboard_ttl: 30,
            ai_query_ttl: 1800,
            response_ttls: DEFAULT_RESPONSE_TTLS
                .iter()
                .map(|&(path, ttl)| (path.to_string(), ttl))
                .collect(),
        }
    }
}
