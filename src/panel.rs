//! The side-panel UI for building, applying and managing filters.
//!
//! `FilterPanel` holds only transient widget state (drafts, the field being
//! edited); all durable state lives in the engine's `StateStore`. Every frame
//! it renders against the current engine state and forwards user actions.

use crate::{ColumnType, FilterEngine, FilterSpec, MatchMode};

use egui::{Align, ComboBox, DragValue, Grid, Layout, RichText, ScrollArea, TextEdit, Ui, Vec2};

// --- Constants ---

/// Maximum number of distinct values offered as multi-select checkboxes.
const MAX_CATEGORY_OPTIONS: usize = 50;

/// Maximum number of autocomplete suggestions shown under the text input.
const MAX_SUGGESTIONS: usize = 8;

// --- FilterPanel Struct ---

/// Transient widget state for the filter side panel.
///
/// Drafts are reset whenever the selected field changes; nothing here is
/// persisted. Applied filters, presets and the selected field survive in the
/// `StateStore` instead.
#[derive(Debug, Default)]
pub struct FilterPanel {
    /// The field currently being edited in the builder.
    selected_field: Option<String>,
    /// Draft bounds for a range filter.
    draft_min: f64,
    draft_max: f64,
    /// Draft value and mode for a text filter.
    draft_text: String,
    draft_mode: MatchMode,
    /// Draft selection for a multi-select filter, keyed by value.
    draft_selected: Vec<(String, bool)>,
    /// Name and description inputs for saving a preset.
    preset_name: String,
    preset_description: String,
}

impl FilterPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the whole panel: field selector, type-specific builder, the
    /// active-filter list and the preset manager.
    pub fn render_panel(&mut self, ui: &mut Ui, engine: &mut FilterEngine) {
        ui.allocate_ui_with_layout(
            Vec2::new(ui.available_width(), ui.available_height()),
            Layout::top_down(Align::LEFT),
            |ui| {
                ScrollArea::vertical().show(ui, |ui| {
                    ui.collapsing("Filter Builder", |ui| {
                        self.render_field_selector(ui, engine);
                        if let Some(field) = self.selected_field.clone() {
                            self.render_builder(ui, engine, &field);
                            self.render_field_statistics(ui, engine, &field);
                        }
                    });

                    ui.collapsing("Active Filters", |ui| {
                        self.render_active_filters(ui, engine);
                    });

                    ui.collapsing("Presets", |ui| {
                        self.render_presets(ui, engine);
                    });
                });
            },
        );
    }

    // --- Field Selection ---

    /// Renders the column picker. Changing the selection resets the drafts
    /// from the analyzer's view of the new field.
    fn render_field_selector(&mut self, ui: &mut Ui, engine: &mut FilterEngine) {
        let columns = engine.available_columns().to_vec();
        let mut changed = false;

        ComboBox::from_label("Field")
            .selected_text(self.selected_field.as_deref().unwrap_or("(choose)"))
            .show_ui(ui, |ui| {
                for column in &columns {
                    let is_selected = self.selected_field.as_deref() == Some(column);
                    if ui.selectable_label(is_selected, column.as_str()).clicked() && !is_selected {
                        self.selected_field = Some(column.clone());
                        changed = true;
                    }
                }
            });

        if changed {
            if let Some(field) = self.selected_field.clone() {
                self.prepare_drafts(engine, &field);
                engine.store_mut().set_selected_field(Some(field));
            }
        }
    }

    /// Seeds the draft widgets from the analyzer when a field is selected:
    /// range bounds from the observed numeric range, checkbox options from the
    /// distinct values.
    fn prepare_drafts(&mut self, engine: &mut FilterEngine, field: &str) {
        self.draft_text.clear();
        self.draft_mode = MatchMode::Contains;
        self.draft_selected.clear();

        match engine.column_type(field) {
            ColumnType::Number => {
                let (min, max) = engine.numeric_range(field);
                self.draft_min = min;
                self.draft_max = max;
            }
            ColumnType::Category => {
                self.draft_selected = engine
                    .unique_values(field, MAX_CATEGORY_OPTIONS)
                    .into_iter()
                    .map(|value| (value, false))
                    .collect();
            }
            ColumnType::Text | ColumnType::Date => {}
        }

        // Re-seed from an already-active filter so editing starts from it.
        match engine.active_filters().get(field) {
            Some(FilterSpec::Range { min, max }) => {
                self.draft_min = *min;
                self.draft_max = *max;
            }
            Some(FilterSpec::Text { value, mode }) => {
                self.draft_text = value.clone();
                self.draft_mode = *mode;
            }
            Some(FilterSpec::MultiSelect { values }) => {
                for (value, checked) in &mut self.draft_selected {
                    *checked = values.contains(value);
                }
            }
            None => {}
        }
    }

    // --- Builder ---

    /// Dispatches to the builder widgets for the field's inferred type.
    fn render_builder(&mut self, ui: &mut Ui, engine: &mut FilterEngine, field: &str) {
        let column_type = engine.column_type(field);
        ui.label(RichText::new(format!("inferred type: {}", column_type.label())).weak());

        match column_type {
            ColumnType::Number => self.render_range_builder(ui, engine, field),
            ColumnType::Category => self.render_multi_select_builder(ui, engine, field),
            ColumnType::Text | ColumnType::Date => self.render_text_builder(ui, engine, field),
        }
    }

    fn render_range_builder(&mut self, ui: &mut Ui, engine: &mut FilterEngine, field: &str) {
        Grid::new("range_builder_grid")
            .num_columns(2)
            .spacing([10.0, 8.0])
            .show(ui, |ui| {
                ui.label("Min:");
                ui.add(DragValue::new(&mut self.draft_min).speed(1.0))
                    .on_hover_text("Lower bound (inclusive).");
                ui.end_row();

                ui.label("Max:");
                ui.add(DragValue::new(&mut self.draft_max).speed(1.0))
                    .on_hover_text("Upper bound (inclusive).");
                ui.end_row();
            });

        if ui.button("Apply range").clicked()
            && !engine.apply_range_filter(field, self.draft_min, self.draft_max)
        {
            // Rejected input; widgets keep the draft so the user can fix it.
            tracing::debug!("range draft rejected for '{field}'");
        }
    }

    fn render_multi_select_builder(&mut self, ui: &mut Ui, engine: &mut FilterEngine, field: &str) {
        for (value, checked) in &mut self.draft_selected {
            ui.checkbox(checked, value.as_str());
        }

        if ui.button("Apply selection").clicked() {
            let values: Vec<String> = self
                .draft_selected
                .iter()
                .filter(|(_, checked)| *checked)
                .map(|(value, _)| value.clone())
                .collect();
            engine.apply_multi_select_filter(field, &values);
        }
    }

    fn render_text_builder(&mut self, ui: &mut Ui, engine: &mut FilterEngine, field: &str) {
        Grid::new("text_builder_grid")
            .num_columns(2)
            .spacing([10.0, 8.0])
            .show(ui, |ui| {
                ui.label("Value:");
                let text_edit =
                    TextEdit::singleline(&mut self.draft_text).desired_width(f32::INFINITY);
                ui.add(text_edit)
                    .on_hover_text("Matching is case-insensitive on trimmed values.");
                ui.end_row();

                ui.label("Mode:");
                ComboBox::from_id_salt("text_match_mode")
                    .selected_text(self.draft_mode.label())
                    .show_ui(ui, |ui| {
                        for mode in MatchMode::ALL {
                            ui.selectable_value(&mut self.draft_mode, mode, mode.label());
                        }
                    });
                ui.end_row();
            });

        // Autocomplete from the analyzer's suggestion cache.
        if !self.draft_text.trim().is_empty() {
            let suggestions = engine.suggestions(field, &self.draft_text, MAX_SUGGESTIONS);
            if !suggestions.is_empty() {
                ui.separator();
                for suggestion in suggestions {
                    if ui.small_button(&suggestion).clicked() {
                        self.draft_text = suggestion;
                    }
                }
            }
        }

        if ui.button("Apply text filter").clicked() {
            engine.apply_text_filter(field, &self.draft_text, self.draft_mode);
        }
    }

    /// Shows completeness and cardinality for the selected field.
    fn render_field_statistics(&mut self, ui: &mut Ui, engine: &mut FilterEngine, field: &str) {
        ui.collapsing("Statistics", |ui| {
            let stats = engine.field_statistics(field);
            Grid::new("field_stats_grid")
                .num_columns(2)
                .spacing([10.0, 4.0])
                .striped(true)
                .show(ui, |ui| {
                    ui.label("Rows:");
                    ui.label(stats.total.to_string());
                    ui.end_row();

                    ui.label("Nulls:");
                    ui.label(stats.null_count.to_string());
                    ui.end_row();

                    ui.label("Distinct:");
                    ui.label(stats.unique_count.to_string());
                    ui.end_row();

                    ui.label("Completeness:");
                    ui.label(format!("{:.1}%", stats.completeness));
                    ui.end_row();
                });
        });
    }

    // --- Active Filters ---

    /// Lists the active filters with per-field remove buttons and a
    /// clear-all button.
    fn render_active_filters(&mut self, ui: &mut Ui, engine: &mut FilterEngine) {
        if engine.active_filter_count() == 0 {
            ui.label(RichText::new("No active filters.").weak());
            return;
        }

        let mut to_remove: Option<String> = None;
        Grid::new("active_filters_grid")
            .num_columns(3)
            .spacing([10.0, 6.0])
            .striped(true)
            .show(ui, |ui| {
                for (field, spec) in engine.active_filters() {
                    ui.label(field.as_str());
                    ui.label(spec.summary());
                    if ui
                        .small_button("✖")
                        .on_hover_text("Remove this filter.")
                        .clicked()
                    {
                        to_remove = Some(field.clone());
                    }
                    ui.end_row();
                }
            });

        if let Some(field) = to_remove {
            engine.clear_filter(&field);
        }

        if ui.button("Clear all").clicked() {
            engine.clear_all_filters();
        }
    }

    // --- Presets ---

    /// Save-as-preset inputs plus the load/delete list.
    fn render_presets(&mut self, ui: &mut Ui, engine: &mut FilterEngine) {
        Grid::new("preset_save_grid")
            .num_columns(2)
            .spacing([10.0, 6.0])
            .show(ui, |ui| {
                ui.label("Name:");
                ui.add(TextEdit::singleline(&mut self.preset_name).desired_width(f32::INFINITY));
                ui.end_row();

                ui.label("Description:");
                ui.add(
                    TextEdit::singleline(&mut self.preset_description)
                        .desired_width(f32::INFINITY),
                );
                ui.end_row();
            });

        if ui
            .button("Save preset")
            .on_hover_text("Snapshot the current active filters under this name.")
            .clicked()
        {
            match engine.save_preset(&self.preset_name, &self.preset_description) {
                Ok(id) => {
                    tracing::debug!("saved preset '{id}'");
                    self.preset_name.clear();
                    self.preset_description.clear();
                }
                Err(e) => {
                    tracing::warn!("preset not saved: {e}");
                }
            }
        }

        ui.separator();

        if engine.preset_count() == 0 {
            ui.label(RichText::new("No presets saved.").weak());
            return;
        }

        let mut to_load: Option<String> = None;
        let mut to_delete: Option<String> = None;
        Grid::new("preset_list_grid")
            .num_columns(3)
            .spacing([10.0, 6.0])
            .striped(true)
            .show(ui, |ui| {
                for preset in engine.presets() {
                    let label = ui.label(preset.name.as_str());
                    if !preset.description.is_empty() {
                        label.on_hover_text(preset.description.as_str());
                    }
                    if ui.small_button("Load").clicked() {
                        to_load = Some(preset.id.clone());
                    }
                    if ui.small_button("Delete").clicked() {
                        to_delete = Some(preset.id.clone());
                    }
                    ui.end_row();
                }
            });

        if let Some(id) = to_load {
            if let Err(e) = engine.load_preset(&id) {
                tracing::warn!("preset load failed: {e}");
            }
        }
        if let Some(id) = to_delete {
            engine.delete_preset(&id);
        }
    }
}
