//! Column analysis over the dataset exposed by the tabular view: type
//! inference, unique values, numeric ranges, substring suggestions and
//! per-field statistics. Results are memoized in a `TtlCache` owned
//! exclusively by the analyzer.

use crate::{
    CacheValue, ColumnType, DEFAULT_TTL_SECS, RowScan, SUGGEST_TTL_SECS, SharedView, TabularView,
    TtlCache,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::{cmp::Ordering, collections::HashSet, sync::OnceLock};

// --- Constants ---

/// Maximum number of non-null values sampled for type inference.
pub const TYPE_SAMPLE_LIMIT: usize = 50;

/// Fraction of samples that must parse as finite numbers for `Number`.
pub const NUMERIC_RATIO_THRESHOLD: f64 = 0.8;

/// Maximum distinct/sample ratio for `Category`.
pub const CATEGORY_DISTINCT_RATIO: f64 = 0.5;

/// Maximum distinct sample count for `Category`.
pub const CATEGORY_DISTINCT_LIMIT: usize = 20;

/// Returns the compiled date-like field-name pattern.
///
/// A field is date-like when its name contains one of the usual temporal
/// substrings or ends in `_at`/`_on`, case-insensitive. Compiled once; the
/// pattern is a literal alternation and cannot fail.
fn date_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:date|time|created|updated|modified|timestamp|datetime|_(?:at|on)$)")
            .unwrap_or_else(|e| unreachable!("invalid date-name pattern: {e}"))
    })
}

/// Parses a cell as a finite number. Whitespace-only cells are not numeric.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric-aware value ordering: if both sides parse as numbers, compare
/// numerically; otherwise compare case-insensitively (with a case-sensitive
/// tie-break so the ordering stays total).
pub fn compare_values(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
    }
}

/// Single-pass per-field statistics.
///
/// A cell counts as null when the view reports no value or the value trims to
/// an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStatistics {
    /// Total number of rows scanned.
    pub total: usize,
    /// Rows with a non-null value for the field.
    pub non_null: usize,
    /// Rows with a null value for the field.
    pub null_count: usize,
    /// Number of distinct non-null values (trimmed form).
    pub unique_count: usize,
    /// `non_null / total * 100`, or 0 when the table is empty.
    pub completeness: f64,
}

// --- DataAnalyzer Struct ---

/// Infers column types and computes per-field summaries over the tabular view.
///
/// All operations are pure with respect to external state except the cache:
/// a lookup that finds an expired entry deletes it and recomputes. Malformed
/// or missing view access returns the documented fallback and logs a warning;
/// the analyzer never panics.
pub struct DataAnalyzer {
    view: SharedView,
    cache: TtlCache,
}

impl DataAnalyzer {
    pub fn new(view: SharedView) -> Self {
        DataAnalyzer {
            view,
            cache: TtlCache::new(),
        }
    }

    // --- Public Operations ---

    /// Infers the column type for `field`.
    ///
    /// ### Logic (first match wins)
    /// 1. Field name matches the date-like pattern → `Date`.
    /// 2. ≥80% of up to 50 sampled non-null values parse as finite numbers → `Number`.
    /// 3. Distinct/sample ratio ≤ 0.5 AND distinct count ≤ 20 → `Category`.
    /// 4. Otherwise (including an empty sample set) → `Text`.
    ///
    /// Cached under `type:<field>` with the default TTL.
    pub fn infer_column_type(&mut self, field: &str) -> ColumnType {
        self.infer_column_type_at(field, Utc::now())
    }

    /// Clock-injected variant of [`DataAnalyzer::infer_column_type`].
    pub fn infer_column_type_at(&mut self, field: &str, now: DateTime<Utc>) -> ColumnType {
        let key = format!("type:{field}");
        if let Some(CacheValue::ColumnType(cached)) = self.cache.get_at(&key, now) {
            return cached;
        }

        let inferred = self.infer_column_type_uncached(field);
        self.cache
            .insert_at(&key, CacheValue::ColumnType(inferred), DEFAULT_TTL_SECS, now);
        inferred
    }

    fn infer_column_type_uncached(&self, field: &str) -> ColumnType {
        // (a) The name pattern wins even when the values would also parse
        // numerically (e.g. epoch seconds in a 'created_at' column).
        if date_name_pattern().is_match(field) {
            tracing::debug!("field '{field}' matched the date-like name pattern");
            return ColumnType::Date;
        }

        let samples = self.sample_values(field, TYPE_SAMPLE_LIMIT);
        if samples.is_empty() {
            return ColumnType::Text;
        }

        // (b) Mostly numeric samples.
        let numeric = samples.iter().filter(|v| parse_number(v).is_some()).count();
        if numeric as f64 / samples.len() as f64 >= NUMERIC_RATIO_THRESHOLD {
            return ColumnType::Number;
        }

        // (c) Low cardinality relative to the sample.
        let distinct: HashSet<&str> = samples.iter().map(|v| v.as_str()).collect();
        let ratio = distinct.len() as f64 / samples.len() as f64;
        if ratio <= CATEGORY_DISTINCT_RATIO && distinct.len() <= CATEGORY_DISTINCT_LIMIT {
            return ColumnType::Category;
        }

        // (d) Fallback.
        ColumnType::Text
    }

    /// Returns up to `max_values` distinct values of `field`, deduplicated on
    /// trimmed form in row-iteration order, then sorted numeric-aware.
    ///
    /// Cached under `unique:<field>:<max_values>` with the default TTL.
    pub fn unique_values(&mut self, field: &str, max_values: usize) -> Vec<String> {
        self.unique_values_at(field, max_values, Utc::now())
    }

    /// Clock-injected variant of [`DataAnalyzer::unique_values`].
    pub fn unique_values_at(
        &mut self,
        field: &str,
        max_values: usize,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let key = format!("unique:{field}:{max_values}");
        if let Some(CacheValue::Values(cached)) = self.cache.get_at(&key, now) {
            return cached;
        }

        let mut seen = HashSet::new();
        let mut values: Vec<String> = Vec::new();
        self.with_view((), |view| {
            view.for_each_row(&mut |row| {
                if let Some(raw) = row.value(field) {
                    let trimmed = raw.trim();
                    if !trimmed.is_empty() && seen.insert(trimmed.to_string()) {
                        values.push(trimmed.to_string());
                    }
                }
                if values.len() >= max_values {
                    RowScan::Stop
                } else {
                    RowScan::Continue
                }
            });
        });

        values.sort_by(|a, b| compare_values(a, b));
        self.cache
            .insert_at(&key, CacheValue::Values(values.clone()), DEFAULT_TTL_SECS, now);
        values
    }

    /// Returns the `(min, max)` of the numeric values in `field`, scanning all
    /// rows and ignoring non-finite parses. Falls back to `(0.0, 100.0)` when
    /// no numeric value was found.
    ///
    /// Cached under `range:<field>` with the default TTL.
    pub fn numeric_range(&mut self, field: &str) -> (f64, f64) {
        self.numeric_range_at(field, Utc::now())
    }

    /// Clock-injected variant of [`DataAnalyzer::numeric_range`].
    pub fn numeric_range_at(&mut self, field: &str, now: DateTime<Utc>) -> (f64, f64) {
        let key = format!("range:{field}");
        if let Some(CacheValue::Range(min, max)) = self.cache.get_at(&key, now) {
            return (min, max);
        }

        let mut bounds: Option<(f64, f64)> = None;
        self.with_view((), |view| {
            view.for_each_row(&mut |row| {
                if let Some(v) = row.value(field).and_then(parse_number) {
                    bounds = Some(match bounds {
                        Some((min, max)) => (min.min(v), max.max(v)),
                        None => (v, v),
                    });
                }
                RowScan::Continue
            });
        });

        let (min, max) = bounds.unwrap_or_else(|| {
            tracing::warn!("no numeric value found in field '{field}'; using default range");
            (0.0, 100.0)
        });
        self.cache
            .insert_at(&key, CacheValue::Range(min, max), DEFAULT_TTL_SECS, now);
        (min, max)
    }

    /// Returns the first `limit` distinct values of `field` containing `query`
    /// case-insensitively, in row-iteration order.
    ///
    /// Cached under `suggest:<field>:<query>:<limit>` with the short TTL:
    /// suggestion keys are high-cardinality and low-reuse.
    pub fn suggestions(&mut self, field: &str, query: &str, limit: usize) -> Vec<String> {
        self.suggestions_at(field, query, limit, Utc::now())
    }

    /// Clock-injected variant of [`DataAnalyzer::suggestions`].
    pub fn suggestions_at(
        &mut self,
        field: &str,
        query: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let key = format!("suggest:{field}:{query}:{limit}");
        if let Some(CacheValue::Values(cached)) = self.cache.get_at(&key, now) {
            return cached;
        }

        let needle = query.trim().to_lowercase();
        let mut seen = HashSet::new();
        let mut matches: Vec<String> = Vec::new();
        self.with_view((), |view| {
            view.for_each_row(&mut |row| {
                if let Some(raw) = row.value(field) {
                    let trimmed = raw.trim();
                    if !trimmed.is_empty()
                        && trimmed.to_lowercase().contains(&needle)
                        && seen.insert(trimmed.to_string())
                    {
                        matches.push(trimmed.to_string());
                    }
                }
                if matches.len() >= limit {
                    RowScan::Stop
                } else {
                    RowScan::Continue
                }
            });
        });

        self.cache
            .insert_at(&key, CacheValue::Values(matches.clone()), SUGGEST_TTL_SECS, now);
        matches
    }

    /// Computes per-field statistics in a single pass.
    ///
    /// Cached under `stats:<field>` with the default TTL.
    pub fn field_statistics(&mut self, field: &str) -> FieldStatistics {
        self.field_statistics_at(field, Utc::now())
    }

    /// Clock-injected variant of [`DataAnalyzer::field_statistics`].
    pub fn field_statistics_at(&mut self, field: &str, now: DateTime<Utc>) -> FieldStatistics {
        let key = format!("stats:{field}");
        if let Some(CacheValue::Statistics(cached)) = self.cache.get_at(&key, now) {
            return cached;
        }

        let mut total = 0usize;
        let mut non_null = 0usize;
        let mut distinct = HashSet::new();
        self.with_view((), |view| {
            view.for_each_row(&mut |row| {
                total += 1;
                if let Some(raw) = row.value(field) {
                    let trimmed = raw.trim();
                    if !trimmed.is_empty() {
                        non_null += 1;
                        distinct.insert(trimmed.to_string());
                    }
                }
                RowScan::Continue
            });
        });

        let completeness = if total == 0 {
            0.0
        } else {
            non_null as f64 / total as f64 * 100.0
        };
        let stats = FieldStatistics {
            total,
            non_null,
            null_count: total - non_null,
            unique_count: distinct.len(),
            completeness,
        };
        self.cache
            .insert_at(&key, CacheValue::Statistics(stats.clone()), DEFAULT_TTL_SECS, now);
        stats
    }

    // --- Cache Discipline ---

    /// Drops every cached result that references `field`.
    pub fn invalidate_field(&mut self, field: &str) {
        self.cache.invalidate_field(field);
    }

    /// Drops the whole cache. Called whenever the column set changes.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of live cache entries (expired entries may still be counted
    /// until their next lookup).
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    // --- Internal Helpers ---

    /// Samples up to `limit` non-null values for `field`, early-exiting the
    /// row traversal once the limit is reached.
    fn sample_values(&self, field: &str, limit: usize) -> Vec<String> {
        let mut samples = Vec::new();
        self.with_view((), |view| {
            view.for_each_row(&mut |row| {
                if let Some(raw) = row.value(field) {
                    let trimmed = raw.trim();
                    if !trimmed.is_empty() {
                        samples.push(trimmed.to_string());
                    }
                }
                if samples.len() >= limit {
                    RowScan::Stop
                } else {
                    RowScan::Continue
                }
            });
        });
        samples
    }

    /// Runs `f` against the shared view, or returns `fallback` with a warning
    /// when the view is unavailable (already mutably borrowed elsewhere).
    fn with_view<R>(&self, fallback: R, f: impl FnOnce(&dyn TabularView) -> R) -> R {
        match self.view.try_borrow() {
            Ok(view) => f(&*view),
            Err(_) => {
                tracing::warn!("tabular view unavailable; analyzer falling back to default");
                fallback
            }
        }
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
