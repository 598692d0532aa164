//! Defines the abstract, type-tagged description of per-field filter predicates.
//! This module contains the core types shared by the analyzer, the state store
//! and the engine: column types, text match modes and the `FilterSpec` union.

use crate::{GridFilterError, GridFilterResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from field name to its filter specification.
///
/// At most one `FilterSpec` per field; setting a field overwrites the previous
/// spec. A `BTreeMap` keeps serialization deterministic (insertion order is
/// irrelevant to the semantics).
pub type ActiveFilters = BTreeMap<String, FilterSpec>;

/// Inferred type of a column, driving which filter widget is offered.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Free-form text; filtered with a string-match predicate.
    Text,
    /// Numeric values; filtered with an inclusive range.
    Number,
    /// Date-like values, detected from the field name pattern.
    Date,
    /// Low-cardinality text; filtered with a multi-select.
    Category,
}

impl ColumnType {
    /// Short human-readable label, used by the filter panel.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Category => "category",
        }
    }
}

/// How a text filter compares its value against a cell.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    #[default]
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    NotEqual,
}

impl MatchMode {
    /// All modes, in the order the UI presents them.
    pub const ALL: [MatchMode; 5] = [
        MatchMode::Contains,
        MatchMode::Equals,
        MatchMode::StartsWith,
        MatchMode::EndsWith,
        MatchMode::NotEqual,
    ];

    /// Short human-readable label, used by the filter panel.
    pub fn label(&self) -> &'static str {
        match self {
            MatchMode::Contains => "contains",
            MatchMode::Equals => "equals",
            MatchMode::StartsWith => "starts with",
            MatchMode::EndsWith => "ends with",
            MatchMode::NotEqual => "not equal",
        }
    }
}

/// An abstract, type-tagged description of a per-field predicate.
///
/// Specs are built by the `FilterEngine` from validated user input, stored in
/// the `StateStore`, and translated to the tabular view's native filter model
/// by `filter_model::to_native`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterSpec {
    /// Keep rows whose cell equals one of the selected values.
    MultiSelect { values: Vec<String> },
    /// Keep rows whose cell parses to a number within `[min, max]` (inclusive).
    Range { min: f64, max: f64 },
    /// Keep rows whose cell matches `value` under the given mode.
    Text { value: String, mode: MatchMode },
}

impl FilterSpec {
    /// Checks the structural invariants of the spec.
    ///
    /// ### Returns
    /// `Ok(())` if the spec is well-formed, or `GridFilterError::InvalidFilter`
    /// describing the violated invariant.
    pub fn validate(&self) -> GridFilterResult<()> {
        match self {
            FilterSpec::MultiSelect { values } => {
                if values.is_empty() || values.iter().all(|v| v.trim().is_empty()) {
                    return Err(GridFilterError::InvalidFilter(
                        "multi-select requires at least one non-empty value".to_string(),
                    ));
                }
            }
            FilterSpec::Range { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(GridFilterError::InvalidFilter(format!(
                        "range bounds must be finite (got {min}..{max})"
                    )));
                }
                if min > max {
                    return Err(GridFilterError::InvalidFilter(format!(
                        "range min ({min}) must not exceed max ({max})"
                    )));
                }
            }
            FilterSpec::Text { value, .. } => {
                if value.trim().is_empty() {
                    return Err(GridFilterError::InvalidFilter(
                        "text filter requires a non-empty value".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// One-line summary of the predicate, used by the active-filter list in the panel.
    pub fn summary(&self) -> String {
        match self {
            FilterSpec::MultiSelect { values } => {
                format!("in [{}]", values.join(", "))
            }
            FilterSpec::Range { min, max } => format!("{min} ..= {max}"),
            FilterSpec::Text { value, mode } => format!("{} '{value}'", mode.label()),
        }
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// cargo test -- --show-output tests_filter_spec
#[cfg(test)]
mod tests_filter_spec {
    use super::*;

    #[test]
    fn test_multi_select_requires_values() {
        let spec = FilterSpec::MultiSelect { values: vec![] };
        assert!(spec.validate().is_err());

        let spec = FilterSpec::MultiSelect {
            values: vec![" ".to_string()],
        };
        assert!(spec.validate().is_err());

        let spec = FilterSpec::MultiSelect {
            values: vec!["active".to_string()],
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_range_invariants() {
        assert!(FilterSpec::Range { min: 1.0, max: 9.0 }.validate().is_ok());
        // Degenerate range (min == max) is allowed.
        assert!(FilterSpec::Range { min: 5.0, max: 5.0 }.validate().is_ok());
        assert!(FilterSpec::Range { min: 9.0, max: 1.0 }.validate().is_err());
        assert!(
            FilterSpec::Range {
                min: f64::NAN,
                max: 1.0
            }
            .validate()
            .is_err()
        );
        assert!(
            FilterSpec::Range {
                min: 0.0,
                max: f64::INFINITY
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_text_requires_value() {
        let spec = FilterSpec::Text {
            value: "  ".to_string(),
            mode: MatchMode::Contains,
        };
        assert!(spec.validate().is_err());

        let spec = FilterSpec::Text {
            value: "abc".to_string(),
            mode: MatchMode::NotEqual,
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_serde_round_trip_preserves_tag_and_mode() {
        let spec = FilterSpec::Text {
            value: "abc".to_string(),
            mode: MatchMode::StartsWith,
        };
        let json = serde_json::to_string(&spec).unwrap();
        // Tagged representation with camelCase names, stable across reloads.
        assert!(json.contains("\"type\":\"text\""));
        assert!(json.contains("startsWith"));

        let back: FilterSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_active_filters_one_spec_per_field() {
        let mut active = ActiveFilters::new();
        active.insert(
            "age".to_string(),
            FilterSpec::Range {
                min: 18.0,
                max: 65.0,
            },
        );
        active.insert(
            "age".to_string(),
            FilterSpec::Range {
                min: 21.0,
                max: 30.0,
            },
        );
        assert_eq!(active.len(), 1);
        assert_eq!(
            active.get("age"),
            Some(&FilterSpec::Range {
                min: 21.0,
                max: 30.0
            })
        );
    }
}
