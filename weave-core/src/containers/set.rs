//! Observable Set
//!
//! A set-like container tracked by a single atom. Sets have no addressable
//! sub-key, so membership reads and mutations all go through one unit; the
//! set itself serves as its own administration record.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexSet;

use crate::reactive::Atom;
use crate::value::Value;

/// Counter for generating unique set IDs.
static SET_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique set ID.
fn next_set_id() -> u64 {
    SET_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A set of dynamic values tracked as a single unit.
///
/// Iteration order is insertion order. Cloning shares the underlying
/// storage.
pub struct ObservableSet {
    atom: Arc<Atom>,
    items: Arc<RwLock<IndexSet<Value>>>,
}

impl ObservableSet {
    /// Create an empty set with a generated diagnostic name.
    pub fn new() -> Self {
        Self::named(format!("ObservableSet@{}", next_set_id()))
    }

    /// Create an empty set with an explicit diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            atom: Atom::new(name.into()),
            items: Arc::new(RwLock::new(IndexSet::new())),
        }
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        self.atom.name()
    }

    /// The atom guarding the whole set.
    pub fn atom(&self) -> &Arc<Atom> {
        &self.atom
    }

    /// Whether `value` is in the set. Observes the set.
    pub fn contains(&self, value: &Value) -> bool {
        self.atom.report_observed();
        self.items
            .read()
            .expect("items lock poisoned")
            .contains(value)
    }

    /// Insert a value. Notifies observers only if the value was new.
    pub fn insert(&self, value: Value) -> bool {
        let inserted = self
            .items
            .write()
            .expect("items lock poisoned")
            .insert(value);

        if inserted {
            self.atom.report_changed();
        }
        inserted
    }

    /// Remove a value. Notifies observers only if the value was present.
    pub fn remove(&self, value: &Value) -> bool {
        let removed = self
            .items
            .write()
            .expect("items lock poisoned")
            .shift_remove(value);

        if removed {
            self.atom.report_changed();
        }
        removed
    }

    /// Number of values. Observes the set.
    pub fn len(&self) -> usize {
        self.atom.report_observed();
        self.items.read().expect("items lock poisoned").len()
    }

    /// Whether the set is empty. Observes the set.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the values in insertion order. Observes the set.
    pub fn values(&self) -> Vec<Value> {
        self.atom.report_observed();
        self.items
            .read()
            .expect("items lock poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for ObservableSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ObservableSet {
    fn clone(&self) -> Self {
        Self {
            atom: Arc::clone(&self.atom),
            items: Arc::clone(&self.items),
        }
    }
}

impl Debug for ObservableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableSet")
            .field("name", &self.name())
            .field("len", &self.items.read().expect("items lock poisoned").len())
            .finish()
    }
}
