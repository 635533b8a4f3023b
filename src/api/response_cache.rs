//! Response Cache Middleware
//!
//! Caches GET responses of the routes listed in the TTL table, keyed by path
//! and query string. Hits carry `X-Cache: HIT` and `X-Cache-Age`, fresh
//! responses carry `X-Cache: MISS`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tracing::{debug, warn};

use crate::cache::CacheEngine;
use crate::caches::CachedResponse;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_CACHE_AGE: HeaderName = HeaderName::from_static("x-cache-age");

// == Response Cache ==
/// Cache engine plus the per-route TTL table.
///
/// Routes match on the exact path. Routes missing from the table are never
/// cached.
#[derive(Clone, Debug)]
pub struct ResponseCache {
    cache: Arc<CacheEngine<String, CachedResponse>>,
    route_ttls: Arc<HashMap<String, Duration>>,
}

impl ResponseCache {
    /// Creates the layer state. Routes with a TTL of 0 are left out.
    pub fn new(
        cache: Arc<CacheEngine<String, CachedResponse>>,
        route_ttls: &HashMap<String, u64>,
    ) -> Self {
        let route_ttls = route_ttls
            .iter()
            .filter(|(_, secs)| **secs > 0)
            .map(|(path, secs)| (path.clone(), Duration::from_secs(*secs)))
            .collect();

        Self {
            cache,
            route_ttls: Arc::new(route_ttls),
        }
    }

    pub fn engine(&self) -> &Arc<CacheEngine<String, CachedResponse>> {
        &self.cache
    }

    pub fn ttl_for(&self, path: &str) -> Option<Duration> {
        self.route_ttls.get(path).copied()
    }

    /// Applies the caching middleware to every route of `router`.
    pub fn wrap<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self.clone(), cache_responses))
    }
}

// == Middleware ==
/// Serves cached GET responses and stores fresh 2xx JSON ones.
///
/// Other methods and unlisted routes pass straight through without an
/// `X-Cache` header.
pub async fn cache_responses(
    State(cache): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Response {
    if *request.method() != Method::GET {
        return next.run(request).await;
    }

    let Some(ttl) = cache.ttl_for(request.uri().path()) else {
        return next.run(request).await;
    };

    let key = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if let Some(cached) = cache.cache.get(&key) {
        let age_secs = (cache.cache.now_ms().saturating_sub(cached.cached_at) + 500) / 1000;
        debug!(key = %key, age_secs, "response cache hit");
        return hit_response(cached, age_secs);
    }

    let response = next.run(request).await;
    store_and_tag(&cache, key, ttl, response).await
}

fn hit_response(cached: CachedResponse, age_secs: u64) -> Response {
    let status = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK);
    let mut response = (status, cached.body).into_response();
    let headers = response.headers_mut();

    headers.remove(header::CONTENT_TYPE);
    if let Some(value) = cached
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(X_CACHE, HeaderValue::from_static("HIT"));
    headers.insert(X_CACHE_AGE, HeaderValue::from(age_secs));
    response
}

/// Buffers a cacheable response, stores it and tags it as a miss.
///
/// Only successful JSON bodies are stored; anything else is passed on with
/// the MISS tag and nothing cached.
async fn store_and_tag(
    cache: &ResponseCache,
    key: String,
    ttl: Duration,
    response: Response,
) -> Response {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let is_json = content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("application/json"));

    if !response.status().is_success() || !is_json {
        return tagged_miss(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = match body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(key = %key, "failed to buffer response body: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        let cached = CachedResponse {
            status: parts.status.as_u16(),
            content_type,
            body: text.to_string(),
            cached_at: cache.cache.now_ms(),
        };
        debug!(key = %key, ttl_secs = ttl.as_secs(), "response cached");
        cache.cache.set(key, cached, Some(ttl));
    }

    tagged_miss(Response::from_parts(parts, Body::from(bytes)))
}

fn tagged_miss(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static("MISS"));
    response
}
