//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::invalidation::{Invalidation, MutationEvent};

/// Request body for `POST /caches/:name/invalidate`
///
/// Example: `{"scope": "prefix", "value": "basket:"}`
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct InvalidateRequest {
    pub target: Invalidation,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    /// An empty prefix would match every key; callers must say `all` instead.
    pub fn validate(&self) -> Option<String> {
        match &self.target {
            Invalidation::Key(key) if key.is_empty() => Some("Key cannot be empty".to_string()),
            Invalidation::Prefix(prefix) if prefix.is_empty() => {
                Some("Prefix cannot be empty, use scope \"all\" to clear a cache".to_string())
            }
            _ => None,
        }
    }
}

/// Request body for `POST /events`
pub type MutationRequest = MutationEvent;
