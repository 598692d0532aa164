#![warn(clippy::all)]
#![doc = include_str!("../README.md")]

// Modules that make up the GridFilter library.
mod analyzer;
mod args;
mod cache;
mod engine;
mod error;
mod events;
mod filter_model;
mod filter_spec;
mod layout;
mod panel;
mod state_store;
mod storage;
mod table;
mod traits;

// Publicly expose the contents of these modules.
pub use self::{
    // add to lib
    analyzer::*,
    args::Arguments,
    cache::*,
    engine::*,
    error::*,
    events::*,
    filter_model::*,
    filter_spec::*,
    layout::*,
    panel::*,
    state_store::*,
    storage::*,
    table::*,
    traits::*,
};
