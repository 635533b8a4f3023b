//! Cache Keys
//!
//! Keys are opaque to the engine except for prefix invalidation, which looks
//! at their string rendering.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;

// == Cache Key Trait ==
/// Anything usable as a cache key.
///
/// Blanket-implemented for every `Display + FromStr` type, so `String` and
/// numeric ids (basket ids for the position cache) both work.
pub trait CacheKey: Eq + Hash + Clone + Send + Sync + 'static {
    /// String form used for prefix matching and size estimates.
    fn key_string(&self) -> String;

    /// The key whose string form is exactly `s`, if there is one.
    fn from_key_string(s: &str) -> Option<Self>;

    /// Returns true if the string form starts with `prefix`.
    fn has_prefix(&self, prefix: &str) -> bool {
        self.key_string().starts_with(prefix)
    }
}

impl<T> CacheKey for T
where
    T: Eq + Hash + Clone + Send + Sync + Display + FromStr + 'static,
{
    fn key_string(&self) -> String {
        self.to_string()
    }

    fn from_key_string(s: &str) -> Option<Self> {
        // "012" parses to 12, which renders as "12"
        s.parse::<T>().ok().filter(|key| key.to_string() == s)
    }
}

// == Filter Key ==
/// Builds a stable key from a set of list filters.
///
/// Filter names are sorted, so the same filters always yield the same key:
/// `{namespace}_{name1_name2}_{value1_value2}`.
pub fn filter_key<I, N, V>(namespace: &str, filters: I) -> String
where
    I: IntoIterator<Item = (N, V)>,
    N: Into<String>,
    V: Display,
{
    let sorted: BTreeMap<String, String> = filters
        .into_iter()
        .map(|(name, value)| (name.into(), value.to_string()))
        .collect();

    let names: Vec<&str> = sorted.keys().map(String::as_str).collect();
    let values: Vec<&str> = sorted.values().map(String::as_str).collect();

    format!("{}_{}_{}", namespace, names.join("_"), values.join("_"))
}

// == Normalize Query ==
/// Normalizes SQL text so superficial differences hit the same entry.
///
/// Runs of whitespace collapse to one space, the result is trimmed and lowercased.
pub fn normalize_query(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
