//! API Module
//!
//! HTTP handlers and routing for the cache admin REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /caches` - Stats of every cache
//! - `GET /caches/:name/stats` / `GET /caches/:name/keys` - Inspect one cache
//! - `POST /caches/:name/stats/reset` - Zero the counters of one cache
//! - `DELETE /caches/:name[/keys/:key | /prefix/:prefix]` - Manual invalidation
//! - `POST /caches/:name/invalidate` - Invalidation from a JSON body
//! - `POST /events` - Publish a mutation event
//!
//! [`ResponseCache`] is a separate layer for host routers: it caches GET
//! responses of configured routes and tags them with `X-Cache`.

pub mod handlers;
pub mod response_cache;
pub mod routes;

pub use handlers::*;
pub use response_cache::{cache_responses, ResponseCache};
pub use routes::create_router;
