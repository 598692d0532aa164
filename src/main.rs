#![warn(clippy::all)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use gridfilter::{
    Arguments, FilterEngine, GridFilterApp, JsonFileStore, KeyValueStore, MemoryKeyValueStore,
    MemoryTable, NullChannel, SharedView,
};
use std::{cell::RefCell, rc::Rc};
use tracing::error;

/*
cargo fmt
cargo test -- --nocapture
cargo test -- --show-output tests_engine
cargo run -- --help
cargo run -- data.csv
cargo doc --open
cargo b -r && cargo install --path=.
*/

fn main() -> eframe::Result<()> {
    // Initialize the tracing subscriber for logging.
    // Use RUST_LOG environment variable to set logging level. eg `export RUST_LOG=info`
    tracing_subscriber::fmt::init();

    // Parse command-line arguments.
    let args = Arguments::build();

    // Load the table up front; a bad path or malformed CSV is a startup error.
    let table = match MemoryTable::from_csv_path(&args.path, args.delimiter_byte()) {
        Ok(table) => Rc::new(RefCell::new(table)),
        Err(err) => {
            error!("Failed to load '{}': {err}", args.path.display());
            std::process::exit(1);
        }
    };

    // Presets and session snapshots go to the state file if one was given,
    // otherwise they only live for this run.
    let storage: Box<dyn KeyValueStore> = match &args.state_file {
        Some(path) => match JsonFileStore::open(path) {
            Ok(store) => Box::new(store),
            Err(err) => {
                error!("Failed to open state file '{}': {err}", path.display());
                std::process::exit(1);
            }
        },
        None => Box::new(MemoryKeyValueStore::new()),
    };

    let engine = FilterEngine::new(
        Rc::clone(&table) as SharedView,
        storage,
        Rc::new(NullChannel),
        &args.scope,
    );

    // Configure the native options for the eframe application.
    let native_options = eframe::NativeOptions {
        centered: true,
        persist_window: true,
        vsync: true,
        viewport: egui::ViewportBuilder::default().with_drag_and_drop(true),
        ..Default::default()
    };

    // Run the eframe application.
    eframe::run_native(
        "GridFilter",
        native_options,
        Box::new(move |creation_context| {
            let app = GridFilterApp::new(creation_context, table, engine, Some(args.path.clone()));
            Ok(Box::new(app))
        }),
    )
}
