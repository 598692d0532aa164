//! Single source of truth for active filters, named presets and the small
//! UI-state bag, with write-through session persistence and durable presets
//! behind the injected `KeyValueStore`.

use crate::{
    ActiveFilters, FilterEvent, FilterSpec, GridFilterError, GridFilterResult, KeyValueStore,
    NotificationChannel,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

// --- Constants ---

/// How long a session snapshot stays restorable.
pub const SESSION_TTL_SECS: i64 = 60 * 60;

/// Storage key holding the durable preset collection (all scopes).
const PRESETS_KEY: &str = "gridfilter:presets";

/// Storage key holding the session snapshot for one dataset scope.
fn session_key(scope: &str) -> String {
    format!("gridfilter:session:{scope}")
}

// --- Persisted Types ---

/// A named, durable, user-saved snapshot of active filters.
/// Immutable once saved except via delete+recreate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Opaque generated identifier, unique and stable.
    pub id: String,
    pub name: String,
    pub description: String,
    pub filters: ActiveFilters,
    pub created_at: DateTime<Utc>,
    /// Dataset identifier the preset was saved against.
    pub scope: String,
}

/// A single, expiring, auto-persisted snapshot of active filters tied to one
/// dataset scope. Not a history: each save overwrites the previous snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFilterSnapshot {
    pub scope: String,
    pub filters: ActiveFilters,
    pub saved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The small UI-state bag the presentation adapters read and write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    /// Whether the filter builder panel is expanded.
    pub builder_visible: bool,
    /// Field currently selected in the builder.
    pub selected_field: Option<String>,
    /// Columns available for filtering, as computed by the engine.
    pub available_columns: Vec<String>,
}

/// Full serializable state for cross-session transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedState {
    pub ui: UiState,
    pub active_filters: ActiveFilters,
    pub presets: Vec<Preset>,
}

// --- StateStore Struct ---

/// Owns `ActiveFilters`, the `Preset` collection and the UI state.
///
/// Every mutation is persisted immediately (write-through, no batching);
/// storage failures are caught here, logged, and the store continues with
/// in-memory state only. Change notifications go out on the injected channel.
pub struct StateStore {
    scope: String,
    active: ActiveFilters,
    presets: Vec<Preset>,
    ui: UiState,
    storage: Box<dyn KeyValueStore>,
    channel: Rc<dyn NotificationChannel>,
    preset_seq: u64,
}

impl StateStore {
    /// Creates a store scoped to one dataset identifier, loading any durable
    /// presets found in storage.
    pub fn new(
        scope: &str,
        storage: Box<dyn KeyValueStore>,
        channel: Rc<dyn NotificationChannel>,
    ) -> Self {
        let mut store = StateStore {
            scope: scope.to_string(),
            active: ActiveFilters::new(),
            presets: Vec::new(),
            ui: UiState::default(),
            storage,
            channel,
            preset_seq: 0,
        };
        store.load_presets_from_storage();
        store
    }

    // --- Active Filters ---

    /// Sets (or overwrites) the filter spec for `field`, emitting
    /// `active-filter-changed` and persisting the session snapshot.
    pub fn set_active_filter(&mut self, field: &str, spec: FilterSpec) -> GridFilterResult<()> {
        let field = field.trim();
        if field.is_empty() {
            return Err(GridFilterError::InvalidFilter(
                "field name must not be empty".to_string(),
            ));
        }
        spec.validate()?;

        self.active.insert(field.to_string(), spec.clone());
        self.channel.emit(&FilterEvent::ActiveFilterChanged {
            field: field.to_string(),
            spec,
        });
        self.save_to_session();
        Ok(())
    }

    /// Removes the filter for `field`. Returns whether anything was removed.
    pub fn remove_active_filter(&mut self, field: &str) -> bool {
        if self.active.remove(field).is_none() {
            return false;
        }
        self.channel.emit(&FilterEvent::ActiveFilterRemoved {
            field: field.to_string(),
        });
        if self.active.is_empty() {
            self.clear_session_snapshot();
        } else {
            self.save_to_session();
        }
        true
    }

    /// Clears all active filters. A second call in a row is a no-op: no
    /// duplicate event, no error. Returns whether anything was cleared.
    pub fn clear_active_filters(&mut self) -> bool {
        if self.active.is_empty() {
            return false;
        }
        self.active.clear();
        self.channel.emit(&FilterEvent::ActiveFiltersCleared);
        self.clear_session_snapshot();
        true
    }

    pub fn active_filters(&self) -> &ActiveFilters {
        &self.active
    }

    pub fn active_filter_count(&self) -> usize {
        self.active.len()
    }

    // --- Presets ---

    /// Saves the given filters (or the current active set) as a durable preset.
    ///
    /// ### Returns
    /// The generated preset id, or an error when `name` is empty or the
    /// filter set to save is empty. Neither failure mutates state.
    pub fn save_preset(
        &mut self,
        name: &str,
        description: &str,
        filters: Option<ActiveFilters>,
    ) -> GridFilterResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GridFilterError::EmptyPresetName);
        }
        let filters = filters.unwrap_or_else(|| self.active.clone());
        if filters.is_empty() {
            return Err(GridFilterError::EmptyFilterSet);
        }

        let id = self.next_preset_id();
        self.presets.push(Preset {
            id: id.clone(),
            name: name.to_string(),
            description: description.trim().to_string(),
            filters,
            created_at: Utc::now(),
            scope: self.scope.clone(),
        });
        self.persist_presets();
        self.channel.emit(&FilterEvent::PresetSaved {
            id: id.clone(),
            name: name.to_string(),
        });
        tracing::info!("saved preset '{name}' ({id})");
        Ok(id)
    }

    /// Replaces the current active filters with the preset's snapshot,
    /// re-applying each filter through `set_active_filter` so the per-filter
    /// semantics (match mode, inclusive bounds) are preserved exactly.
    pub fn load_preset(&mut self, id: &str) -> GridFilterResult<()> {
        let preset = self
            .presets
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| GridFilterError::PresetNotFound(id.to_string()))?;

        // Stored presets bypass set_active_filter on their way in (storage
        // load, import): re-check every spec before the current active set is
        // touched, so a bad preset leaves state untouched.
        for (field, spec) in &preset.filters {
            if field.trim().is_empty() {
                return Err(GridFilterError::InvalidFilter(
                    "field name must not be empty".to_string(),
                ));
            }
            spec.validate()?;
        }

        self.clear_active_filters();
        for (field, spec) in preset.filters {
            self.set_active_filter(&field, spec)?;
        }
        self.channel.emit(&FilterEvent::PresetLoaded {
            id: id.to_string(),
        });
        Ok(())
    }

    /// Removes the preset if present. Idempotent; emits `preset-deleted`
    /// only when something was actually removed.
    pub fn delete_preset(&mut self, id: &str) -> bool {
        let Some(index) = self.presets.iter().position(|p| p.id == id) else {
            tracing::warn!("delete_preset: unknown preset id '{id}'");
            return false;
        };
        self.presets.remove(index);
        self.persist_presets();
        self.channel.emit(&FilterEvent::PresetDeleted {
            id: id.to_string(),
        });
        true
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    pub fn get_preset(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    // --- Session Persistence ---

    /// Persists the current active filters as the session snapshot for this
    /// dataset scope. Write-through: called on every active-filter mutation.
    pub fn save_to_session(&mut self) {
        self.save_to_session_at(Utc::now());
    }

    /// Clock-injected variant of [`StateStore::save_to_session`].
    pub fn save_to_session_at(&mut self, now: DateTime<Utc>) {
        let snapshot = SessionFilterSnapshot {
            scope: self.scope.clone(),
            filters: self.active.clone(),
            saved_at: now,
            expires_at: now + TimeDelta::seconds(SESSION_TTL_SECS),
        };
        let key = session_key(&self.scope);
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                if let Err(e) = self.storage.set(&key, &json) {
                    // Degraded but functional: in-memory state stays authoritative.
                    tracing::warn!("failed to persist session snapshot: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize session snapshot: {e}"),
        }
    }

    /// Restores active filters from the session snapshot for this scope.
    ///
    /// Snapshots older than [`SESSION_TTL_SECS`] or saved against a different
    /// dataset scope are discarded and treated as absent.
    ///
    /// ### Returns
    /// `true` when filters were restored.
    pub fn load_from_session(&mut self) -> bool {
        self.load_from_session_at(Utc::now())
    }

    /// Clock-injected variant of [`StateStore::load_from_session`].
    pub fn load_from_session_at(&mut self, now: DateTime<Utc>) -> bool {
        let key = session_key(&self.scope);
        let Some(json) = self.storage.get(&key) else {
            return false;
        };

        let snapshot: SessionFilterSnapshot = match serde_json::from_str(&json) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("discarding malformed session snapshot: {e}");
                self.clear_session_snapshot();
                return false;
            }
        };

        if snapshot.scope != self.scope {
            tracing::warn!(
                "session snapshot scope '{}' does not match '{}'; ignoring",
                snapshot.scope,
                self.scope
            );
            return false;
        }
        if snapshot.expires_at <= now {
            tracing::debug!("session snapshot expired; discarding");
            self.clear_session_snapshot();
            return false;
        }

        self.active = snapshot.filters;
        tracing::info!("restored {} filters from session", self.active.len());
        true
    }

    fn clear_session_snapshot(&mut self) {
        let key = session_key(&self.scope);
        if let Err(e) = self.storage.remove(&key) {
            tracing::warn!("failed to clear session snapshot: {e}");
        }
    }

    // --- Export / Import ---

    /// Full round-trip serialization of UI state, active filters and presets.
    pub fn export_state(&self) -> ExportedState {
        ExportedState {
            ui: self.ui.clone(),
            active_filters: self.active.clone(),
            presets: self.presets.clone(),
        }
    }

    /// Imports a previously exported state: UI state and active filters are
    /// replaced wholesale, presets are merged by id (existing presets win).
    pub fn import_state(&mut self, state: ExportedState) {
        self.ui = state.ui;
        self.active = state.active_filters;
        for preset in state.presets {
            if self.get_preset(&preset.id).is_none() {
                self.presets.push(preset);
            }
        }
        self.persist_presets();
        self.save_to_session();
    }

    // --- UI State ---

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn set_builder_visible(&mut self, visible: bool) {
        self.ui.builder_visible = visible;
    }

    pub fn set_selected_field(&mut self, field: Option<String>) {
        self.ui.selected_field = field;
    }

    pub fn set_available_columns(&mut self, columns: Vec<String>) {
        self.ui.available_columns = columns;
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    // --- Internal Helpers ---

    /// Generates an opaque preset id: unique within this store even when two
    /// saves land on the same millisecond.
    fn next_preset_id(&mut self) -> String {
        self.preset_seq += 1;
        format!(
            "preset-{:x}-{}",
            Utc::now().timestamp_millis(),
            self.preset_seq
        )
    }

    fn load_presets_from_storage(&mut self) {
        let Some(json) = self.storage.get(PRESETS_KEY) else {
            return;
        };
        match serde_json::from_str::<Vec<Preset>>(&json) {
            Ok(presets) => {
                tracing::debug!("loaded {} presets from storage", presets.len());
                self.presets = presets;
            }
            Err(e) => tracing::warn!("discarding malformed preset collection: {e}"),
        }
    }

    fn persist_presets(&mut self) {
        match serde_json::to_string(&self.presets) {
            Ok(json) => {
                if let Err(e) = self.storage.set(PRESETS_KEY, &json) {
                    tracing::warn!("failed to persist presets: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize presets: {e}"),
        }
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// cargo test -- --show-output tests_state_store
#[cfg(test)]
mod tests_state_store {
    use super::*;
    use crate::{EventLog, MatchMode, MemoryKeyValueStore};
    use std::cell::RefCell;

    type SharedStorage = Rc<RefCell<MemoryKeyValueStore>>;

    fn make_store(scope: &str) -> (StateStore, Rc<EventLog>, SharedStorage) {
        let storage: SharedStorage = Rc::new(RefCell::new(MemoryKeyValueStore::new()));
        let log = Rc::new(EventLog::new());
        let channel = Rc::clone(&log) as Rc<dyn NotificationChannel>;
        let store = StateStore::new(scope, Box::new(Rc::clone(&storage)), channel);
        (store, log, storage)
    }

    /// Simulates a reload: a fresh StateStore over the same backing storage.
    fn reload(scope: &str, storage: &SharedStorage) -> StateStore {
        StateStore::new(
            scope,
            Box::new(Rc::clone(storage)),
            Rc::new(EventLog::new()),
        )
    }

    fn age_range() -> FilterSpec {
        FilterSpec::Range {
            min: 18.0,
            max: 65.0,
        }
    }

    #[test]
    fn test_set_active_filter_overwrites_and_emits() {
        let (mut store, log, _) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();
        store
            .set_active_filter(
                "age",
                FilterSpec::Range {
                    min: 21.0,
                    max: 30.0,
                },
            )
            .unwrap();

        assert_eq!(store.active_filter_count(), 1);
        assert_eq!(
            log.names(),
            vec!["active-filter-changed", "active-filter-changed"]
        );
    }

    #[test]
    fn test_invalid_specs_do_not_mutate_state() {
        let (mut store, log, _) = make_store("ds1");
        assert!(store.set_active_filter("", age_range()).is_err());
        assert!(
            store
                .set_active_filter(
                    "age",
                    FilterSpec::Range {
                        min: 10.0,
                        max: 5.0
                    }
                )
                .is_err()
        );
        assert_eq!(store.active_filter_count(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_clear_active_filters_is_idempotent() {
        let (mut store, log, _) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();

        assert!(store.clear_active_filters());
        // Second call: no-op, no duplicate event, no error.
        assert!(!store.clear_active_filters());
        assert_eq!(
            log.names(),
            vec!["active-filter-changed", "active-filters-cleared"]
        );
    }

    #[test]
    fn test_save_preset_validations() {
        let (mut store, _, _) = make_store("ds1");

        // Empty name fails.
        assert!(matches!(
            store.save_preset("", "", None),
            Err(GridFilterError::EmptyPresetName)
        ));
        // Zero active filters fails.
        assert!(matches!(
            store.save_preset("mine", "", None),
            Err(GridFilterError::EmptyFilterSet)
        ));
        assert_eq!(store.preset_count(), 0);

        // One active filter succeeds.
        store.set_active_filter("age", age_range()).unwrap();
        let id = store.save_preset("mine", "adults", None).unwrap();
        assert_eq!(store.preset_count(), 1);
        assert_eq!(store.get_preset(&id).unwrap().name, "mine");
    }

    #[test]
    fn test_preset_round_trip_restores_deep_equal_filters() {
        let (mut store, log, _) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();
        store
            .set_active_filter(
                "name",
                FilterSpec::Text {
                    value: "ann".to_string(),
                    mode: MatchMode::StartsWith,
                },
            )
            .unwrap();
        let saved = store.active_filters().clone();
        let id = store.save_preset("two", "", None).unwrap();

        store.clear_active_filters();
        assert_eq!(store.active_filter_count(), 0);

        store.load_preset(&id).unwrap();
        assert_eq!(store.active_filters(), &saved);
        assert_eq!(log.names().last(), Some(&"preset-loaded"));
    }

    #[test]
    fn test_load_preset_with_invalid_spec_keeps_active_filters() {
        let (mut store, _, _) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();

        // A preset that never went through set_active_filter, e.g. from
        // tampered storage or a foreign export.
        let mut filters = ActiveFilters::new();
        filters.insert(
            "score".to_string(),
            FilterSpec::Range {
                min: 10.0,
                max: 5.0,
            },
        );
        store.import_state(ExportedState {
            ui: UiState::default(),
            active_filters: store.active_filters().clone(),
            presets: vec![Preset {
                id: "preset-bad-1".to_string(),
                name: "bad".to_string(),
                description: String::new(),
                filters,
                created_at: Utc::now(),
                scope: "ds1".to_string(),
            }],
        });

        assert!(matches!(
            store.load_preset("preset-bad-1"),
            Err(GridFilterError::InvalidFilter(_))
        ));
        // The previous active set survives the failed load untouched.
        assert_eq!(store.active_filter_count(), 1);
        assert_eq!(store.active_filters().get("age"), Some(&age_range()));
    }

    #[test]
    fn test_load_unknown_preset_fails() {
        let (mut store, _, _) = make_store("ds1");
        assert!(matches!(
            store.load_preset("nope"),
            Err(GridFilterError::PresetNotFound(_))
        ));
    }

    #[test]
    fn test_delete_preset_is_idempotent() {
        let (mut store, log, _) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();
        let id = store.save_preset("mine", "", None).unwrap();

        assert!(store.delete_preset(&id));
        assert!(!store.delete_preset(&id));
        // preset-deleted emitted exactly once.
        assert_eq!(
            log.names().iter().filter(|n| **n == "preset-deleted").count(),
            1
        );
    }

    #[test]
    fn test_presets_survive_reload() {
        let (mut store, _, storage) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();
        let id = store.save_preset("durable", "", None).unwrap();
        drop(store);

        let reloaded = reload("ds1", &storage);
        assert_eq!(reloaded.preset_count(), 1);
        assert_eq!(reloaded.get_preset(&id).unwrap().name, "durable");
    }

    #[test]
    fn test_session_round_trip_across_reload() {
        let (mut store, _, storage) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();
        drop(store);

        let mut reloaded = reload("ds1", &storage);
        assert!(reloaded.load_from_session());
        assert_eq!(
            reloaded.active_filters().get("age"),
            Some(&age_range())
        );
    }

    #[test]
    fn test_session_snapshot_expires_after_one_hour() {
        let (mut store, _, storage) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();
        let old = Utc::now() - TimeDelta::hours(2);
        store.save_to_session_at(old);
        drop(store);

        let mut reloaded = reload("ds1", &storage);
        assert!(!reloaded.load_from_session());
        assert_eq!(reloaded.active_filter_count(), 0);
        // Expired snapshot was discarded from storage too.
        assert!(reloaded.storage.get(&session_key("ds1")).is_none());
    }

    #[test]
    fn test_session_snapshot_is_scoped_to_one_dataset() {
        let (mut store, _, storage) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();
        drop(store);

        // A store for another dataset sees nothing.
        let mut other = reload("ds2", &storage);
        assert!(!other.load_from_session());
        assert_eq!(other.active_filter_count(), 0);

        // A snapshot stored under our key but stamped with a different scope
        // is also ignored.
        let foreign = SessionFilterSnapshot {
            scope: "ds9".to_string(),
            filters: ActiveFilters::new(),
            saved_at: Utc::now(),
            expires_at: Utc::now() + TimeDelta::hours(1),
        };
        storage
            .borrow_mut()
            .set(&session_key("ds2"), &serde_json::to_string(&foreign).unwrap())
            .unwrap();
        assert!(!other.load_from_session());
    }

    #[test]
    fn test_storage_failure_degrades_gracefully() {
        let storage: SharedStorage = Rc::new(RefCell::new(MemoryKeyValueStore::new()));
        storage.borrow_mut().set_fail_writes(true);
        let mut store = StateStore::new(
            "ds1",
            Box::new(Rc::clone(&storage)),
            Rc::new(EventLog::new()),
        );

        // Writes fail underneath, but the in-memory state still works.
        store.set_active_filter("age", age_range()).unwrap();
        assert_eq!(store.active_filter_count(), 1);
        let id = store.save_preset("mine", "", None).unwrap();
        assert!(store.get_preset(&id).is_some());
    }

    #[test]
    fn test_export_import_round_trip() {
        let (mut store, _, _) = make_store("ds1");
        store.set_active_filter("age", age_range()).unwrap();
        store.save_preset("mine", "", None).unwrap();
        store.set_builder_visible(true);
        store.set_selected_field(Some("age".to_string()));
        let exported = store.export_state();

        let (mut fresh, _, _) = make_store("ds1");
        fresh
            .set_active_filter(
                "other",
                FilterSpec::MultiSelect {
                    values: vec!["x".to_string()],
                },
            )
            .unwrap();
        fresh.import_state(exported.clone());

        // Active filters replaced wholesale; UI merged; presets imported.
        assert_eq!(fresh.active_filters(), &exported.active_filters);
        assert!(fresh.ui().builder_visible);
        assert_eq!(fresh.preset_count(), 1);
        assert_eq!(fresh.export_state(), exported);
    }
}
