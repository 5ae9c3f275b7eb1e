//! Observable List
//!
//! A list-like container tracked by a single structural atom: any read of
//! the list observes the whole structure, and any mutation invalidates all
//! of it. Per-index atoms are deliberately not supported; index identity is
//! too unstable under insertion and removal to be worth tracking.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::reactive::Atom;
use crate::value::Value;

/// Counter for generating unique list IDs.
static LIST_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique list ID.
fn next_list_id() -> u64 {
    LIST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The administration record of a list: its name and the one structural
/// atom guarding the whole container.
pub struct ListAdmin {
    name: String,
    atom: Arc<Atom>,
}

impl ListAdmin {
    fn new(name: String) -> Arc<Self> {
        Arc::new(Self {
            atom: Atom::new(name.clone()),
            name,
        })
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The structural atom guarding the container.
    pub fn atom(&self) -> &Arc<Atom> {
        &self.atom
    }
}

impl Debug for ListAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListAdmin").field("name", &self.name).finish()
    }
}

/// A list of dynamic values tracked as a single unit.
///
/// Cloning shares the underlying storage.
pub struct ObservableList {
    admin: Arc<ListAdmin>,
    items: Arc<RwLock<Vec<Value>>>,
}

impl ObservableList {
    /// Create an empty list with a generated diagnostic name.
    pub fn new() -> Self {
        Self::named(format!("ObservableList@{}", next_list_id()))
    }

    /// Create an empty list with an explicit diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            admin: ListAdmin::new(name.into()),
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        self.admin.name()
    }

    /// The administration record.
    pub fn admin(&self) -> &Arc<ListAdmin> {
        &self.admin
    }

    /// Number of items. Observes the structure.
    pub fn len(&self) -> usize {
        self.admin.atom.report_observed();
        self.items.read().expect("items lock poisoned").len()
    }

    /// Whether the list is empty. Observes the structure.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the item at `index`. Observes the structure.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.admin.atom.report_observed();
        self.items
            .read()
            .expect("items lock poisoned")
            .get(index)
            .cloned()
    }

    /// Append an item and notify observers.
    pub fn push(&self, value: Value) {
        self.items.write().expect("items lock poisoned").push(value);
        self.admin.atom.report_changed();
    }

    /// Replace the item at `index`. Returns false if out of bounds.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let replaced = {
            let mut items = self.items.write().expect("items lock poisoned");
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            }
        };

        if replaced {
            self.admin.atom.report_changed();
        }
        replaced
    }

    /// Remove and return the last item, notifying observers.
    pub fn pop(&self) -> Option<Value> {
        let popped = self.items.write().expect("items lock poisoned").pop();
        if popped.is_some() {
            self.admin.atom.report_changed();
        }
        popped
    }
}

impl Default for ObservableList {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ObservableList {
    fn clone(&self) -> Self {
        Self {
            admin: Arc::clone(&self.admin),
            items: Arc::clone(&self.items),
        }
    }
}

impl Debug for ObservableList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableList")
            .field("name", &self.name())
            .field("len", &self.items.read().expect("items lock poisoned").len())
            .finish()
    }
}
