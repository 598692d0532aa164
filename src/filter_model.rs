//! Translation from abstract `FilterSpec`s to the tabular view's native filter
//! model, plus the predicate evaluation used by in-process view backends.
//!
//! The translation is a small closed mapping over the spec variants so that
//! adding a filter type is a compile-time checked change, not string dispatch.

use crate::{ActiveFilters, FilterSpec, MatchMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The tabular view's native per-field filter representation.
///
/// Opaque to everything except the engine's translation logic and the view
/// backend that evaluates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeFilter {
    /// Row passes when the trimmed cell is a member of `values`.
    SetMembership { values: BTreeSet<String> },
    /// Row passes when the cell parses to a finite number in `[min, max]`.
    BoundedRange { min: f64, max: f64 },
    /// Row passes when the cell matches `value` under `mode` (case-insensitive).
    StringMatch { value: String, mode: MatchMode },
}

/// Complete native filter state of the view: one native filter per field.
pub type NativeFilterModel = BTreeMap<String, NativeFilter>;

/// Translates one abstract spec into its native counterpart.
///
/// Per-type mapping: multi-select → set membership, range → bounded range,
/// text → string match. Values are trimmed on the way in so membership tests
/// line up with the trimmed-form deduplication done by the analyzer.
pub fn to_native(spec: &FilterSpec) -> NativeFilter {
    match spec {
        FilterSpec::MultiSelect { values } => NativeFilter::SetMembership {
            values: values.iter().map(|v| v.trim().to_string()).collect(),
        },
        FilterSpec::Range { min, max } => NativeFilter::BoundedRange {
            min: *min,
            max: *max,
        },
        FilterSpec::Text { value, mode } => NativeFilter::StringMatch {
            value: value.trim().to_string(),
            mode: *mode,
        },
    }
}

/// Builds a full native model from an active-filter map in one pass.
/// Used by `FilterEngine::apply_state_filters_to_grid` for batched re-apply.
pub fn build_native_model(filters: &ActiveFilters) -> NativeFilterModel {
    filters
        .iter()
        .map(|(field, spec)| (field.clone(), to_native(spec)))
        .collect()
}

impl NativeFilter {
    /// Evaluates the predicate against a single cell.
    ///
    /// A null cell (`None`) fails every predicate: filtering a field expresses
    /// interest in rows that *have* a value for it.
    pub fn matches(&self, cell: Option<&str>) -> bool {
        let Some(raw) = cell else {
            return false;
        };

        match self {
            NativeFilter::SetMembership { values } => values.contains(raw.trim()),
            NativeFilter::BoundedRange { min, max } => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => *min <= v && v <= *max,
                _ => false,
            },
            NativeFilter::StringMatch { value, mode } => {
                let cell_lower = raw.trim().to_lowercase();
                let needle = value.to_lowercase();
                match mode {
                    MatchMode::Contains => cell_lower.contains(&needle),
                    MatchMode::Equals => cell_lower == needle,
                    MatchMode::StartsWith => cell_lower.starts_with(&needle),
                    MatchMode::EndsWith => cell_lower.ends_with(&needle),
                    MatchMode::NotEqual => cell_lower != needle,
                }
            }
        }
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// cargo test -- --show-output tests_filter_model
#[cfg(test)]
mod tests_filter_model {
    use super::*;

    #[test]
    fn test_translation_is_per_variant() {
        let spec = FilterSpec::MultiSelect {
            values: vec![" a ".to_string(), "b".to_string()],
        };
        let native = to_native(&spec);
        assert_eq!(
            native,
            NativeFilter::SetMembership {
                values: ["a", "b"].iter().map(|s| s.to_string()).collect(),
            }
        );

        let spec = FilterSpec::Range {
            min: 18.0,
            max: 65.0,
        };
        assert_eq!(
            to_native(&spec),
            NativeFilter::BoundedRange {
                min: 18.0,
                max: 65.0
            }
        );

        let spec = FilterSpec::Text {
            value: "smith".to_string(),
            mode: MatchMode::EndsWith,
        };
        assert_eq!(
            to_native(&spec),
            NativeFilter::StringMatch {
                value: "smith".to_string(),
                mode: MatchMode::EndsWith
            }
        );
    }

    #[test]
    fn test_set_membership_matches_trimmed() {
        let f = NativeFilter::SetMembership {
            values: ["active"].iter().map(|s| s.to_string()).collect(),
        };
        assert!(f.matches(Some("active")));
        assert!(f.matches(Some(" active ")));
        assert!(!f.matches(Some("inactive")));
        assert!(!f.matches(None));
    }

    #[test]
    fn test_bounded_range_is_inclusive() {
        let f = NativeFilter::BoundedRange {
            min: 18.0,
            max: 65.0,
        };
        assert!(f.matches(Some("18")));
        assert!(f.matches(Some("65")));
        assert!(f.matches(Some("42.5")));
        assert!(!f.matches(Some("17.99")));
        assert!(!f.matches(Some("abc")));
        assert!(!f.matches(None));
    }

    #[test]
    fn test_string_match_modes_are_case_insensitive() {
        let m = |mode| NativeFilter::StringMatch {
            value: "Ann".to_string(),
            mode,
        };
        assert!(m(MatchMode::Contains).matches(Some("Joanne")));
        assert!(m(MatchMode::Equals).matches(Some("ANN")));
        assert!(m(MatchMode::StartsWith).matches(Some("Annette")));
        assert!(m(MatchMode::EndsWith).matches(Some("Joann")));
        assert!(m(MatchMode::NotEqual).matches(Some("Bob")));
        assert!(!m(MatchMode::NotEqual).matches(Some("ann")));
    }

    #[test]
    fn test_build_native_model_covers_all_fields() {
        let mut active = ActiveFilters::new();
        active.insert(
            "status".to_string(),
            FilterSpec::MultiSelect {
                values: vec!["open".to_string()],
            },
        );
        active.insert(
            "age".to_string(),
            FilterSpec::Range {
                min: 0.0,
                max: 10.0,
            },
        );

        let model = build_native_model(&active);
        assert_eq!(model.len(), 2);
        assert!(matches!(
            model.get("status"),
            Some(NativeFilter::SetMembership { .. })
        ));
        assert!(matches!(
            model.get("age"),
            Some(NativeFilter::BoundedRange { .. })
        ));
    }
}
