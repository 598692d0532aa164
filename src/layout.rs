//! The demo viewer application: an `eframe` shell wiring the filter panel to
//! the engine and rendering the filtered table in the central panel.

use crate::{FilterEngine, FilterPanel, MemoryTable, TabularView};

use egui::{
    CentralPanel, Context, ScrollArea, SidePanel, TextStyle, TopBottomPanel, ViewportCommand,
    menu, style::Visuals, warn_if_debug_build, widgets,
};
use egui_extras::{Column, TableBuilder, TableRow};
use std::{cell::RefCell, path::PathBuf, rc::Rc};

/// The main application struct for the grid filter viewer.
///
/// Holds the engine (which owns the durable filter state), a concrete handle
/// to the in-memory table for cell access, and the panel's widget state. The
/// engine sees the same table through its `SharedView` handle.
pub struct GridFilterApp {
    engine: FilterEngine,
    table: Rc<RefCell<MemoryTable>>,
    panel: FilterPanel,
    /// The path the table was loaded from, shown in the footer.
    source_path: Option<PathBuf>,
}

impl GridFilterApp {
    /// Creates the application and brings the engine up: columns are computed
    /// and the previous session's filters are restored if still valid.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        table: Rc<RefCell<MemoryTable>>,
        mut engine: FilterEngine,
        source_path: Option<PathBuf>,
    ) -> Self {
        cc.egui_ctx.set_visuals(Visuals::dark());

        engine.initialize();
        if engine.restore_session() {
            tracing::info!("restored previous session filters");
        }

        GridFilterApp {
            engine,
            table,
            panel: FilterPanel::new(),
            source_path,
        }
    }

    /// Renders the filtered rows as an `egui` table.
    fn render_table(&self, ui: &mut egui::Ui) {
        let table = self.table.borrow();
        let columns = table.columns();
        let col_number = columns.len().max(1) as f32;

        let style = ui.style();
        let text_height = TextStyle::Body.resolve(style).size;
        let available_space = ui.available_width()
            - col_number * style.spacing.item_spacing.x
            - style.spacing.scroll.bar_width;
        let initial_col_width = available_space / col_number;
        let header_height = style.spacing.interact_size.y + 2.0 * style.spacing.item_spacing.y;
        let min_col_width = style.spacing.interact_size.x.max(initial_col_width / 4.0);

        let render_header = |mut table_row: TableRow<'_, '_>| {
            for column_name in &columns {
                table_row.col(|ui| {
                    ui.strong(column_name.as_str());
                });
            }
        };

        let render_rows = |mut table_row: TableRow<'_, '_>| {
            let row_index = table_row.index();
            for col_index in 0..columns.len() {
                let value = table.visible_cell(row_index, col_index).unwrap_or("");
                table_row.col(|ui| {
                    ui.label(value);
                });
            }
        };

        let column = Column::initial(initial_col_width)
            .at_least(min_col_width)
            .resizable(true)
            .clip(true);

        TableBuilder::new(ui)
            .striped(true)
            .columns(column, columns.len())
            .column(Column::remainder())
            .auto_shrink([false, false])
            .header(header_height, render_header)
            .body(|body| {
                let num_rows = table.visible_count();
                body.rows(text_height, num_rows, render_rows);
            });
    }
}

impl eframe::App for GridFilterApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        // Layout:
        //
        //  | menu_bar        widgets |
        //  ---------------------------
        //  |         |               |
        //  | Filter  |   filtered    |
        //  | Panel   |   table       |
        //  |         |               |
        //  ---------------------------
        //  | footer: path and counts |

        TopBottomPanel::top("top_panel").show(ctx, |ui| {
            menu::bar(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.menu_button("File", |ui| {
                        if ui.button("Clear all filters").clicked() {
                            self.engine.clear_all_filters();
                            ui.close_menu();
                        }
                        if ui.button("Quit").clicked() {
                            ui.ctx().send_viewport_cmd(ViewportCommand::Close);
                        }
                    });

                    // Align the theme switch to the right.
                    let delta = ui.available_width() - 15.0;
                    if delta > 0.0 {
                        ui.add_space(delta);
                        widgets::global_theme_preference_switch(ui);
                    }
                });
            });
        });

        SidePanel::left("side_panel")
            .resizable(true)
            .show(ctx, |ui| {
                ScrollArea::vertical().show(ui, |ui| {
                    self.panel.render_panel(ui, &mut self.engine);
                });
            });

        TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.source_path {
                    Some(path) => {
                        ui.label(format!("{}", path.display()));
                    }
                    None => {
                        ui.label("no file set");
                    }
                }
                ui.separator();
                let (visible, total) = {
                    let table = self.table.borrow();
                    (table.visible_count(), table.row_count())
                };
                ui.label(format!("{visible} of {total} rows"));
                ui.separator();
                ui.label(format!("{} filters active", self.engine.active_filter_count()));
            });
        });

        // CentralPanel must be added after all other panels.
        CentralPanel::default().show(ctx, |ui| {
            warn_if_debug_build(ui);

            ScrollArea::horizontal()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.style_mut().spacing.scroll.handle_min_length = 32.0;
                    self.render_table(ui);
                });
        });
    }
}
