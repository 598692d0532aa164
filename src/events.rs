//! Named events emitted by the `StateStore` and the `FilterEngine`, plus two
//! ready-made `NotificationChannel` implementations: a silent default and a
//! recording log used by tests and debugging overlays.

use crate::{FilterSpec, NotificationChannel};

use std::cell::RefCell;

/// A named change notification carrying the affected field or preset and the
/// resulting state.
///
/// Store-level events (`ActiveFilter*`) fire on every `StateStore` mutation;
/// engine-level events (`FilterApplied`, ...) fire once the change has also
/// been pushed to the tabular view.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEvent {
    ActiveFilterChanged { field: String, spec: FilterSpec },
    ActiveFilterRemoved { field: String },
    ActiveFiltersCleared,
    FilterApplied { field: String, spec: FilterSpec },
    FilterRemoved { field: String },
    FiltersCleared,
    PresetSaved { id: String, name: String },
    PresetLoaded { id: String },
    PresetDeleted { id: String },
}

impl FilterEvent {
    /// The stable kebab-case event name, part of the public contract with
    /// presentation adapters.
    pub fn name(&self) -> &'static str {
        match self {
            FilterEvent::ActiveFilterChanged { .. } => "active-filter-changed",
            FilterEvent::ActiveFilterRemoved { .. } => "active-filter-removed",
            FilterEvent::ActiveFiltersCleared => "active-filters-cleared",
            FilterEvent::FilterApplied { .. } => "filter-applied",
            FilterEvent::FilterRemoved { .. } => "filter-removed",
            FilterEvent::FiltersCleared => "filters-cleared",
            FilterEvent::PresetSaved { .. } => "preset-saved",
            FilterEvent::PresetLoaded { .. } => "preset-loaded",
            FilterEvent::PresetDeleted { .. } => "preset-deleted",
        }
    }
}

/// Channel that drops events after tracing them. Used when the embedder does
/// not care about notifications.
#[derive(Debug, Default)]
pub struct NullChannel;

impl NotificationChannel for NullChannel {
    fn emit(&self, event: &FilterEvent) {
        tracing::trace!("event '{}' dropped by NullChannel", event.name());
    }
}

/// Channel that records every emitted event, in order.
///
/// `RefCell` keeps `emit` callable through the shared `Rc<dyn
/// NotificationChannel>` handle; execution is single-threaded.
#[derive(Debug, Default)]
pub struct EventLog {
    events: RefCell<Vec<FilterEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<FilterEvent> {
        self.events.borrow().clone()
    }

    /// Recorded event names, oldest first. Convenient for assertions.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(FilterEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl NotificationChannel for EventLog {
    fn emit(&self, event: &FilterEvent) {
        tracing::debug!("event '{}': {:?}", event.name(), event);
        self.events.borrow_mut().push(event.clone());
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
