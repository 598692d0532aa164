//! The coordinator bridging `StateStore` + `DataAnalyzer` to the external
//! tabular view: validates user actions, mutates the store, translates specs
//! to the native filter model and pushes it to the view.

use crate::{
    ActiveFilters, ColumnType, DataAnalyzer, FieldStatistics, FilterEvent, FilterSpec,
    GridFilterResult, KeyValueStore, MatchMode, NotificationChannel, Preset, SharedView,
    StateStore, build_native_model, to_native,
};

use std::rc::Rc;

/// Global engine lifecycle: `Ready` is entered once available columns are
/// computed and re-entered after every schema change.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EnginePhase {
    Uninitialized,
    Ready,
}

/// Orchestrates filter operations end to end.
///
/// Data flow: UI action → engine validates & normalizes → `StateStore`
/// mutation → engine pushes the native filter model to the tabular view →
/// view re-renders. The engine owns neither the filters nor the cache; it
/// only coordinates.
pub struct FilterEngine {
    view: SharedView,
    analyzer: DataAnalyzer,
    store: StateStore,
    channel: Rc<dyn NotificationChannel>,
    phase: EnginePhase,
    available_columns: Vec<String>,
}

impl FilterEngine {
    /// Wires the engine to its collaborators. Call [`FilterEngine::initialize`]
    /// before applying filters.
    pub fn new(
        view: SharedView,
        storage: Box<dyn KeyValueStore>,
        channel: Rc<dyn NotificationChannel>,
        scope: &str,
    ) -> Self {
        let analyzer = DataAnalyzer::new(Rc::clone(&view));
        let store = StateStore::new(scope, storage, Rc::clone(&channel));
        FilterEngine {
            view,
            analyzer,
            store,
            channel,
            phase: EnginePhase::Uninitialized,
            available_columns: Vec::new(),
        }
    }

    /// Computes the available columns from the current column set and enters
    /// the `Ready` phase.
    pub fn initialize(&mut self) {
        self.available_columns = self.view.borrow().columns();
        self.store
            .set_available_columns(self.available_columns.clone());
        self.phase = EnginePhase::Ready;
        tracing::debug!(
            "engine ready with {} available columns",
            self.available_columns.len()
        );
    }

    /// Restores the session snapshot for the current dataset scope, if one is
    /// present and unexpired, and pushes the restored filters to the view in
    /// one batched apply.
    pub fn restore_session(&mut self) -> bool {
        let restored = self.store.load_from_session();
        if restored {
            self.apply_state_filters_to_grid();
        }
        restored
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn available_columns(&self) -> &[String] {
        &self.available_columns
    }

    // --- Apply / Clear ---

    /// Applies a multi-select filter. Values are trimmed and deduplicated.
    ///
    /// ### Returns
    /// `false` without mutating state when the field is unknown or no
    /// non-empty value remains.
    pub fn apply_multi_select_filter(&mut self, field: &str, values: &[String]) -> bool {
        if !self.accepts_field(field) {
            return false;
        }

        let mut selected: Vec<String> = Vec::new();
        for value in values {
            let trimmed = value.trim();
            if !trimmed.is_empty() && !selected.iter().any(|v| v == trimmed) {
                selected.push(trimmed.to_string());
            }
        }
        if selected.is_empty() {
            tracing::warn!("multi-select filter on '{field}' rejected: no values");
            return false;
        }

        self.push_filter(field, FilterSpec::MultiSelect { values: selected })
    }

    /// Applies an inclusive numeric range filter.
    ///
    /// ### Returns
    /// `false` without mutating state when a bound is non-finite or min > max.
    pub fn apply_range_filter(&mut self, field: &str, min: f64, max: f64) -> bool {
        if !self.accepts_field(field) {
            return false;
        }
        if !min.is_finite() || !max.is_finite() || min > max {
            tracing::warn!("range filter on '{field}' rejected: invalid bounds {min}..{max}");
            return false;
        }

        self.push_filter(field, FilterSpec::Range { min, max })
    }

    /// Applies a text-match filter.
    ///
    /// ### Returns
    /// `false` without mutating state when the trimmed value is empty.
    pub fn apply_text_filter(&mut self, field: &str, value: &str, mode: MatchMode) -> bool {
        if !self.accepts_field(field) {
            return false;
        }
        let value = value.trim();
        if value.is_empty() {
            tracing::warn!("text filter on '{field}' rejected: empty value");
            return false;
        }

        self.push_filter(
            field,
            FilterSpec::Text {
                value: value.to_string(),
                mode,
            },
        )
    }

    /// Removes the filter for `field` from the store and the view's native
    /// model symmetrically. Returns whether a filter was removed.
    pub fn clear_filter(&mut self, field: &str) -> bool {
        if !self.store.remove_active_filter(field) {
            tracing::warn!("clear_filter: no active filter on '{field}'");
            return false;
        }

        {
            let mut view = self.view.borrow_mut();
            let mut model = view.filter_model();
            model.remove(field);
            view.set_filter_model(model);
            view.on_filter_changed();
        }
        self.channel.emit(&FilterEvent::FilterRemoved {
            field: field.to_string(),
        });
        true
    }

    /// Clears every filter from the store and the view. Calling it again when
    /// nothing is active is a no-op (no duplicate event, no error).
    pub fn clear_all_filters(&mut self) -> bool {
        if !self.store.clear_active_filters() {
            return false;
        }

        {
            let mut view = self.view.borrow_mut();
            view.set_filter_model(Default::default());
            view.on_filter_changed();
        }
        self.channel.emit(&FilterEvent::FiltersCleared);
        true
    }

    /// Rebuilds the view's entire native filter model from the current active
    /// filters in one batched apply, avoiding a re-render per field. Used
    /// after loading a preset or restoring a session snapshot.
    pub fn apply_state_filters_to_grid(&mut self) {
        let model = build_native_model(self.store.active_filters());
        let mut view = self.view.borrow_mut();
        view.set_filter_model(model);
        view.on_filter_changed();
    }

    // --- Schema Changes ---

    /// Reacts to an upstream column-set change.
    ///
    /// ### Logic
    /// 1. Drop the whole analyzer cache: type/range/stat results are stale.
    /// 2. Soft-invalidation: remove only the filters whose fields disappeared;
    ///    filters on surviving fields are preserved.
    /// 3. Recompute available columns and re-push the surviving filters to the
    ///    view in one batched apply.
    /// 4. Re-enter the `Ready` phase.
    pub fn handle_schema_change(&mut self) {
        let new_columns = self.view.borrow().columns();
        let removed: Vec<String> = self
            .available_columns
            .iter()
            .filter(|c| !new_columns.contains(c))
            .cloned()
            .collect();
        tracing::info!(
            "schema change: {} -> {} columns ({} removed)",
            self.available_columns.len(),
            new_columns.len(),
            removed.len()
        );

        self.analyzer.clear_cache();

        for field in &removed {
            if self.store.remove_active_filter(field) {
                // Active -> Unset: the filter cannot be re-applied.
                self.channel.emit(&FilterEvent::FilterRemoved {
                    field: field.clone(),
                });
            }
        }

        self.available_columns = new_columns.clone();
        self.store.set_available_columns(new_columns);
        self.apply_state_filters_to_grid();
        self.phase = EnginePhase::Ready;
    }

    /// Drops cached analyzer results for one field whose data (not schema)
    /// changed outside the engine's knowledge.
    pub fn invalidate_field(&mut self, field: &str) {
        self.analyzer.invalidate_field(field);
    }

    // --- Analyzer Passthroughs ---

    pub fn column_type(&mut self, field: &str) -> ColumnType {
        self.analyzer.infer_column_type(field)
    }

    pub fn unique_values(&mut self, field: &str, max_values: usize) -> Vec<String> {
        self.analyzer.unique_values(field, max_values)
    }

    pub fn numeric_range(&mut self, field: &str) -> (f64, f64) {
        self.analyzer.numeric_range(field)
    }

    pub fn suggestions(&mut self, field: &str, query: &str, limit: usize) -> Vec<String> {
        self.analyzer.suggestions(field, query, limit)
    }

    pub fn field_statistics(&mut self, field: &str) -> FieldStatistics {
        self.analyzer.field_statistics(field)
    }

    // --- StateStore Passthroughs ---

    pub fn active_filters(&self) -> &ActiveFilters {
        self.store.active_filters()
    }

    pub fn active_filter_count(&self) -> usize {
        self.store.active_filter_count()
    }

    pub fn presets(&self) -> &[Preset] {
        self.store.presets()
    }

    pub fn preset_count(&self) -> usize {
        self.store.preset_count()
    }

    /// Saves the current active filters as a named preset.
    pub fn save_preset(&mut self, name: &str, description: &str) -> GridFilterResult<String> {
        self.store.save_preset(name, description, None)
    }

    /// Loads a preset and pushes its filters to the view in one batched apply.
    pub fn load_preset(&mut self, id: &str) -> GridFilterResult<()> {
        self.store.load_preset(id)?;
        self.apply_state_filters_to_grid();
        Ok(())
    }

    pub fn delete_preset(&mut self, id: &str) -> bool {
        self.store.delete_preset(id)
    }

    /// Read/write access to the UI-state bag and session operations for
    /// presentation adapters.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    // --- Internal Helpers ---

    /// Engine-level field validation shared by every apply operation.
    fn accepts_field(&self, field: &str) -> bool {
        if self.phase != EnginePhase::Ready {
            tracing::warn!("filter on '{field}' rejected: engine not initialized");
            return false;
        }
        if !self.available_columns.iter().any(|c| c == field) {
            tracing::warn!("filter rejected: unknown field '{field}'");
            return false;
        }
        true
    }

    /// Pushes a validated spec into the store, then into the view's native
    /// model, and emits `filter-applied`.
    fn push_filter(&mut self, field: &str, spec: FilterSpec) -> bool {
        if let Err(e) = self.store.set_active_filter(field, spec.clone()) {
            tracing::warn!("filter on '{field}' rejected by store: {e}");
            return false;
        }

        {
            let mut view = self.view.borrow_mut();
            let mut model = view.filter_model();
            model.insert(field.to_string(), to_native(&spec));
            view.set_filter_model(model);
            view.on_filter_changed();
        }
        self.channel.emit(&FilterEvent::FilterApplied {
            field: field.to_string(),
            spec,
        });
        true
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// cargo test -- --show-output tests_engine
#[cfg(test)]
mod tests_engine {
    use super::*;
    use crate::{EventLog, MemoryKeyValueStore, MemoryTable, TabularView};
    use std::cell::RefCell;

    type SharedTable = Rc<RefCell<MemoryTable>>;
    type SharedStorage = Rc<RefCell<MemoryKeyValueStore>>;

    fn sample_table() -> MemoryTable {
        let mut table = MemoryTable::new(
            ["name", "age", "status"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        let rows = [
            ("Ann", "34", "open"),
            ("Bob", "17", "closed"),
            ("Cleo", "28", "open"),
            ("Dan", "71", "closed"),
        ];
        for (name, age, status) in rows {
            table.push_row(vec![
                Some(name.to_string()),
                Some(age.to_string()),
                Some(status.to_string()),
            ]);
        }
        table
    }

    fn make_engine() -> (FilterEngine, SharedTable, Rc<EventLog>, SharedStorage) {
        let table: SharedTable = Rc::new(RefCell::new(sample_table()));
        let storage: SharedStorage = Rc::new(RefCell::new(MemoryKeyValueStore::new()));
        let log = Rc::new(EventLog::new());
        let channel = Rc::clone(&log) as Rc<dyn crate::NotificationChannel>;
        let mut engine = FilterEngine::new(
            Rc::clone(&table) as SharedView,
            Box::new(Rc::clone(&storage)),
            channel,
            "people",
        );
        engine.initialize();
        (engine, table, log, storage)
    }

    #[test]
    fn test_uninitialized_engine_rejects_filters() {
        let table: SharedTable = Rc::new(RefCell::new(sample_table()));
        let mut engine = FilterEngine::new(
            Rc::clone(&table) as SharedView,
            Box::new(MemoryKeyValueStore::new()),
            Rc::new(EventLog::new()),
            "people",
        );
        assert_eq!(engine.phase(), EnginePhase::Uninitialized);
        assert!(!engine.apply_range_filter("age", 0.0, 10.0));
    }

    #[test]
    fn test_invalid_range_returns_false_without_mutation() {
        let (mut engine, table, log, _) = make_engine();

        // min > max.
        assert!(!engine.apply_range_filter("age", 10.0, 5.0));
        // Non-finite bound.
        assert!(!engine.apply_range_filter("age", f64::NEG_INFINITY, 5.0));

        assert_eq!(engine.active_filter_count(), 0);
        assert!(table.borrow().filter_model().is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_apply_range_filter_pushes_native_model() {
        let (mut engine, table, log, _) = make_engine();

        assert!(engine.apply_range_filter("age", 18.0, 65.0));
        assert_eq!(engine.active_filter_count(), 1);

        let view = table.borrow();
        assert!(view.filter_model().contains_key("age"));
        // Bob (17) and Dan (71) are filtered out.
        assert_eq!(view.visible_count(), 2);
        drop(view);

        assert_eq!(
            log.names(),
            vec!["active-filter-changed", "filter-applied"]
        );
    }

    #[test]
    fn test_multi_select_normalizes_values() {
        let (mut engine, table, _, _) = make_engine();

        // Blank and duplicate entries are dropped before validation.
        let values = vec![
            " open ".to_string(),
            "open".to_string(),
            "".to_string(),
        ];
        assert!(engine.apply_multi_select_filter("status", &values));
        assert_eq!(table.borrow().visible_count(), 2);

        // All-blank input is rejected.
        assert!(!engine.apply_multi_select_filter("status", &[" ".to_string()]));
    }

    #[test]
    fn test_text_filter_validation_and_matching() {
        let (mut engine, table, _, _) = make_engine();

        assert!(!engine.apply_text_filter("name", "   ", MatchMode::Contains));
        assert!(engine.apply_text_filter("name", "an", MatchMode::Contains));
        // Ann and Dan match case-insensitively.
        assert_eq!(table.borrow().visible_count(), 2);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let (mut engine, _, log, _) = make_engine();
        assert!(!engine.apply_range_filter("salary", 0.0, 10.0));
        assert!(!engine.apply_text_filter("salary", "x", MatchMode::Equals));
        assert!(log.is_empty());
    }

    #[test]
    fn test_clear_filter_is_symmetric() {
        let (mut engine, table, _, _) = make_engine();
        engine.apply_range_filter("age", 18.0, 65.0);

        assert!(engine.clear_filter("age"));
        assert_eq!(engine.active_filter_count(), 0);
        assert!(table.borrow().filter_model().is_empty());
        assert_eq!(table.borrow().visible_count(), 4);

        // Nothing left to clear.
        assert!(!engine.clear_filter("age"));
    }

    #[test]
    fn test_clear_all_filters_is_idempotent() {
        let (mut engine, _, log, _) = make_engine();
        engine.apply_range_filter("age", 18.0, 65.0);
        engine.apply_text_filter("name", "a", MatchMode::Contains);

        assert!(engine.clear_all_filters());
        let events_after_first = log.len();
        assert!(!engine.clear_all_filters());
        // No duplicate filters-cleared emission.
        assert_eq!(log.len(), events_after_first);
    }

    #[test]
    fn test_preset_load_rebuilds_grid_in_one_apply() {
        let (mut engine, table, _, _) = make_engine();
        engine.apply_range_filter("age", 18.0, 65.0);
        engine.apply_multi_select_filter("status", &["open".to_string()]);
        let id = engine.save_preset("working set", "").unwrap();

        engine.clear_all_filters();
        assert_eq!(table.borrow().visible_count(), 4);

        engine.load_preset(&id).unwrap();
        assert_eq!(engine.active_filter_count(), 2);
        // Ann (34, open) and Cleo (28, open).
        assert_eq!(table.borrow().visible_count(), 2);
        assert_eq!(table.borrow().filter_model().len(), 2);
    }

    #[test]
    fn test_schema_change_soft_invalidation() {
        let (mut engine, table, _, _) = make_engine();
        engine.apply_range_filter("age", 18.0, 65.0);
        engine.apply_multi_select_filter("status", &["open".to_string()]);
        // Warm the analyzer cache.
        engine.column_type("age");
        assert!(engine.analyzer.cache_len() > 0);

        table.borrow_mut().drop_column("age");
        engine.handle_schema_change();

        assert_eq!(engine.phase(), EnginePhase::Ready);
        // The age filter is gone, the status filter survived.
        assert_eq!(engine.active_filter_count(), 1);
        assert!(engine.active_filters().contains_key("status"));
        assert!(table.borrow().filter_model().contains_key("status"));
        assert!(!table.borrow().filter_model().contains_key("age"));
        // Cache fully cleared on column-set change.
        assert_eq!(engine.analyzer.cache_len(), 0);
        // Filters on removed fields cannot be re-applied.
        assert!(!engine.apply_range_filter("age", 0.0, 10.0));
    }

    #[test]
    fn test_session_restore_after_reload() {
        let (mut engine, _, _, storage) = make_engine();
        engine.apply_range_filter("age", 18.0, 65.0);
        drop(engine);

        // Simulated reload: fresh engine over the same storage and data.
        let table: SharedTable = Rc::new(RefCell::new(sample_table()));
        let mut engine = FilterEngine::new(
            Rc::clone(&table) as SharedView,
            Box::new(Rc::clone(&storage)),
            Rc::new(EventLog::new()),
            "people",
        );
        engine.initialize();
        assert!(engine.restore_session());
        assert_eq!(
            engine.active_filters().get("age"),
            Some(&FilterSpec::Range {
                min: 18.0,
                max: 65.0
            })
        );
        assert_eq!(table.borrow().visible_count(), 2);
    }

    #[test]
    fn test_analyzer_passthroughs() {
        let (mut engine, _, _, _) = make_engine();
        assert_eq!(engine.column_type("age"), ColumnType::Number);
        assert_eq!(engine.numeric_range("age"), (17.0, 71.0));
        assert_eq!(engine.unique_values("status", 10), vec!["closed", "open"]);
        assert_eq!(engine.suggestions("name", "AN", 5), vec!["Ann", "Dan"]);
        assert_eq!(engine.field_statistics("name").total, 4);
    }
}
