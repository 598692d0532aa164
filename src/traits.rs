//! Defines the interfaces at the engine's seams.
//!
//! This module centralizes the contracts consumed from external collaborators:
//! the tabular view holding the authoritative row set (`TabularView`), the
//! persistent key-value storage (`KeyValueStore`), and the notification channel
//! (`NotificationChannel`). All three are injected into the engine rather than
//! looked up from ambient state.

use crate::{FilterEvent, GridFilterResult, NativeFilterModel};

use std::{cell::RefCell, rc::Rc};

/// Visitor verdict for `TabularView::for_each_row`: continue or early-terminate.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RowScan {
    Continue,
    Stop,
}

/// Read access to one row during traversal.
pub trait RowView {
    /// Returns the raw cell value for `field`, or `None` when the cell is null
    /// or the field is unknown to this row.
    fn value(&self, field: &str) -> Option<&str>;
}

/// The external component rendering rows/columns and holding the authoritative
/// row set and native filter state.
///
/// Traversal is synchronous and assumed fast relative to a single UI tick; the
/// analyzer bounds its scans with sampling limits where possible.
pub trait TabularView {
    /// Current column names, in display order.
    fn columns(&self) -> Vec<String>;

    /// Visits every row of the full (unfiltered) dataset in iteration order.
    /// The visitor may early-terminate by returning `RowScan::Stop`.
    fn for_each_row(&self, visit: &mut dyn FnMut(&dyn RowView) -> RowScan);

    /// Snapshot of the view's native filter model.
    fn filter_model(&self) -> NativeFilterModel;

    /// Replaces the view's native filter model wholesale.
    fn set_filter_model(&mut self, model: NativeFilterModel);

    /// Requests a re-filter/re-render after the model changed.
    fn on_filter_changed(&mut self);
}

/// Shared handle to the tabular view.
///
/// The engine, the analyzer and the embedding application all hold clones of
/// this handle; execution is single-threaded and every mutation completes
/// before the next begins, so `Rc<RefCell<..>>` is the whole locking story.
pub type SharedView = Rc<RefCell<dyn TabularView>>;

/// Persistent key-value storage used for preset durability and session
/// snapshots. Failures (e.g., quota exceeded) surface as
/// `GridFilterError::Storage` and are caught and logged at the `StateStore`
/// boundary, never propagated as fatal.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> GridFilterResult<()>;
    fn remove(&mut self, key: &str) -> GridFilterResult<()>;
}

// A shared handle to a store is itself a store. Lets the embedder keep a
// handle to the backing store while the StateStore owns its own.
impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<RefCell<S>> {
    fn get(&self, key: &str) -> Option<String> {
        self.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> GridFilterResult<()> {
        self.borrow_mut().set(key, value)
    }

    fn remove(&mut self, key: &str) -> GridFilterResult<()> {
        self.borrow_mut().remove(key)
    }
}

/// Channel on which the store and the engine publish named events for
/// presentation adapters (toasts, badge counts, ...).
pub trait NotificationChannel {
    fn emit(&self, event: &FilterEvent);
}
