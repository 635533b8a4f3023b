//! FLUPSY Cache - read-through TTL caches for the FLUPSY manager backend
//!
//! Named cache instances with per-entry expiry, explicit invalidation driven
//! by mutation events, and a background reaper for entries nobody reads again.

pub mod api;
pub mod cache;
pub mod caches;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use caches::AppCaches;
pub use config::Config;
pub use tasks::spawn_reaper;
