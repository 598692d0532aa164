//! In-memory `TabularView` backend.
//!
//! Holds the authoritative row set as `Option<String>` cells, evaluates the
//! native filter model to maintain the visible-row index, and can be loaded
//! from a CSV file for the demo viewer.

use crate::{GridFilterResult, NativeFilterModel, RowScan, RowView, TabularView};

use std::path::Path;

/// One row of the table, exposed to visitors during traversal.
struct MemoryRow<'a> {
    columns: &'a [String],
    cells: &'a [Option<String>],
}

impl RowView for MemoryRow<'_> {
    fn value(&self, field: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == field)?;
        self.cells.get(index)?.as_deref()
    }
}

/// An in-memory table implementing `TabularView`.
///
/// `for_each_row` always traverses the full dataset; the native filter model
/// only affects the `visible_*` accessors, recomputed by `on_filter_changed`.
#[derive(Debug, Default)]
pub struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    model: NativeFilterModel,
    visible: Vec<usize>,
}

impl MemoryTable {
    pub fn new(columns: Vec<String>) -> Self {
        MemoryTable {
            columns,
            ..Default::default()
        }
    }

    /// Loads a table from a delimited file. The header row provides the column
    /// names; empty cells become nulls.
    pub fn from_csv_path(path: &Path, delimiter: u8) -> GridFilterResult<Self> {
        tracing::debug!("Loading CSV table from: {}", path.display());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = MemoryTable::new(columns);
        for record in reader.records() {
            let record = record?;
            table.push_row(
                record
                    .iter()
                    .map(|cell| {
                        let trimmed = cell.trim();
                        if trimmed.is_empty() {
                            None
                        } else {
                            Some(trimmed.to_string())
                        }
                    })
                    .collect(),
            );
        }

        tracing::debug!(
            "CSV load complete: {} columns, {} rows",
            table.columns.len(),
            table.rows.len()
        );
        Ok(table)
    }

    /// Appends a row, padding or truncating to the current column count.
    /// The visible index includes the row until the next re-filter.
    pub fn push_row(&mut self, mut cells: Vec<Option<String>>) {
        cells.resize(self.columns.len(), None);
        self.visible.push(self.rows.len());
        self.rows.push(cells);
    }

    /// Removes a column and its cells. Simulates an upstream schema change;
    /// the caller is expected to run the engine's schema-change handling next.
    pub fn drop_column(&mut self, name: &str) {
        let Some(index) = self.columns.iter().position(|c| c == name) else {
            return;
        };
        self.columns.remove(index);
        for row in &mut self.rows {
            if index < row.len() {
                row.remove(index);
            }
        }
        tracing::debug!("dropped column '{name}'");
    }

    /// Adds an empty column at the end of the schema.
    pub fn add_column(&mut self, name: &str) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Cell at (visible row, column index), in filtered order.
    pub fn visible_cell(&self, visible_row: usize, column: usize) -> Option<&str> {
        let row_index = *self.visible.get(visible_row)?;
        self.rows.get(row_index)?.get(column)?.as_deref()
    }

    /// Recomputes the visible-row index by evaluating every native filter
    /// against every row (AND across fields).
    fn refilter(&mut self) {
        self.visible = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, cells)| {
                self.model.iter().all(|(field, filter)| {
                    let row = MemoryRow {
                        columns: &self.columns,
                        cells,
                    };
                    filter.matches(row.value(field))
                })
            })
            .map(|(index, _)| index)
            .collect();
    }
}

impl TabularView for MemoryTable {
    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn for_each_row(&self, visit: &mut dyn FnMut(&dyn RowView) -> RowScan) {
        for cells in &self.rows {
            let row = MemoryRow {
                columns: &self.columns,
                cells,
            };
            if visit(&row) == RowScan::Stop {
                break;
            }
        }
    }

    fn filter_model(&self) -> NativeFilterModel {
        self.model.clone()
    }

    fn set_filter_model(&mut self, model: NativeFilterModel) {
        self.model = model;
    }

    fn on_filter_changed(&mut self) {
        self.refilter();
        tracing::debug!(
            "re-filtered: {}/{} rows visible",
            self.visible.len(),
            self.rows.len()
        );
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
