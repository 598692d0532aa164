//! Time-bounded memoization for the per-field computations of the analyzer.
//!
//! Entries store an absolute expiry and are evicted lazily at read time; there
//! is no background sweeping. TTL alone is not a correctness mechanism: the
//! engine calls `invalidate_field`/`clear` at the dataset-update boundary.

use crate::{ColumnType, FieldStatistics};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

/// Default TTL for analyzer results (type, range, unique values, stats).
pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

/// Short TTL for suggestion queries: high-cardinality keys with low reuse.
pub const SUGGEST_TTL_SECS: i64 = 60;

/// The heterogeneous results the analyzer memoizes, one variant per operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    ColumnType(ColumnType),
    Values(Vec<String>),
    Range(f64, f64),
    Statistics(FieldStatistics),
}

/// A cached value with its absolute expiry instant.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: CacheValue,
    expires_at: DateTime<Utc>,
}

/// TTL cache keyed by `op:field[:params]` strings (e.g. `unique:status:50`).
///
/// Field names are a full `:`-separated segment of every key, which is what
/// makes `invalidate_field` exact rather than a substring guess.
#[derive(Debug, Default)]
pub struct TtlCache {
    entries: HashMap<String, CacheEntry>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key`, evicting it first if expired.
    pub fn get(&mut self, key: &str) -> Option<CacheValue> {
        self.get_at(key, Utc::now())
    }

    /// Clock-injected variant of [`TtlCache::get`] for deterministic tests.
    pub fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<CacheValue> {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                // Expired: delete and report a miss so the caller recomputes.
                tracing::trace!("cache entry '{key}' expired");
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key` for `ttl_secs` from now.
    pub fn insert(&mut self, key: &str, value: CacheValue, ttl_secs: i64) {
        self.insert_at(key, value, ttl_secs, Utc::now());
    }

    /// Clock-injected variant of [`TtlCache::insert`] for deterministic tests.
    pub fn insert_at(&mut self, key: &str, value: CacheValue, ttl_secs: i64, now: DateTime<Utc>) {
        let expires_at = now + TimeDelta::seconds(ttl_secs);
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    /// Removes every cache key that references `field` as one of its
    /// `:`-separated segments. Called when a single column's data changed.
    pub fn invalidate_field(&mut self, field: &str) {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| !key.split(':').any(|segment| segment == field));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!("invalidated {evicted} cache entries for field '{field}'");
        }
    }

    /// Empties the whole cache. Called whenever the column set changes, since
    /// type/range/stat results are no longer valid.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!("cleared {} cache entries", self.entries.len());
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// cargo test -- --show-output tests_cache
#[cfg(test)]
mod tests_cache {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_hit_within_ttl_and_miss_after_expiry() {
        let mut cache = TtlCache::new();
        let now = t0();
        cache.insert_at("range:price", CacheValue::Range(1.0, 9.0), DEFAULT_TTL_SECS, now);

        // T+4min: within the 5-minute TTL, reused verbatim.
        let at = now + TimeDelta::minutes(4);
        assert_eq!(cache.get_at("range:price", at), Some(CacheValue::Range(1.0, 9.0)));

        // T+6min: expired, entry deleted on lookup.
        let at = now + TimeDelta::minutes(6);
        assert_eq!(cache.get_at("range:price", at), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_field_matches_whole_segment() {
        let mut cache = TtlCache::new();
        let now = t0();
        cache.insert_at("type:age", CacheValue::ColumnType(ColumnType::Number), 300, now);
        cache.insert_at("unique:age:50", CacheValue::Values(vec![]), 300, now);
        cache.insert_at("type:agenda", CacheValue::ColumnType(ColumnType::Text), 300, now);

        cache.invalidate_field("age");

        // 'agenda' merely contains 'age' as a substring and must survive.
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("type:agenda", now).is_some());
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut cache = TtlCache::new();
        cache.insert("a:b", CacheValue::Range(0.0, 1.0), 300);
        cache.insert("c:d", CacheValue::Range(0.0, 1.0), 300);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_overwrites_existing_key() {
        let mut cache = TtlCache::new();
        let now = t0();
        cache.insert_at("range:x", CacheValue::Range(0.0, 1.0), 300, now);
        cache.insert_at("range:x", CacheValue::Range(5.0, 6.0), 300, now);
        assert_eq!(cache.get_at("range:x", now), Some(CacheValue::Range(5.0, 6.0)));
        assert_eq!(cache.len(), 1);
    }
}
