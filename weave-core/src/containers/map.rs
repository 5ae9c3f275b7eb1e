//! Observable Map
//!
//! A map-like container with three tracking granularities:
//!
//! - a *keys atom* guarding the key set as a whole (size, iteration);
//! - one *value atom* per present entry, named `{map}.{key}`, notified when
//!   that entry's value changes;
//! - a per-key *presence table* ([`AtomMap`]) making "does key K exist"
//!   observable even for keys that were never inserted.
//!
//! The map serves as its own administration record.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::reactive::{Atom, AtomMap};
use crate::value::Value;

/// Counter for generating unique map IDs.
static MAP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique map ID.
fn next_map_id() -> u64 {
    MAP_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A map of dynamic keys to dynamic values with per-entry tracking.
///
/// Iteration order is insertion order. Cloning shares the underlying
/// storage.
pub struct ObservableMap {
    name: String,

    /// Guards the key set: size, iteration, key membership in bulk.
    keys_atom: Arc<Atom>,

    /// The entries themselves.
    data: Arc<RwLock<IndexMap<Value, Value>>>,

    /// One atom per present entry, tracking its value.
    value_atoms: Arc<RwLock<IndexMap<Value, Arc<Atom>>>>,

    /// Key-presence tracking, including for absent keys.
    has_atoms: AtomMap,
}

impl ObservableMap {
    /// Create an empty map with a generated diagnostic name.
    pub fn new() -> Self {
        Self::named(format!("ObservableMap@{}", next_map_id()))
    }

    /// Create an empty map with an explicit diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            keys_atom: Atom::new(format!("{name}.keys()")),
            has_atoms: AtomMap::new(name.clone()),
            data: Arc::new(RwLock::new(IndexMap::new())),
            value_atoms: Arc::new(RwLock::new(IndexMap::new())),
            name,
        }
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The atom guarding the key set.
    pub fn keys_atom(&self) -> &Arc<Atom> {
        &self.keys_atom
    }

    /// The value atom for a present entry, if any. Never creates one.
    pub fn value_atom(&self, key: &Value) -> Option<Arc<Atom>> {
        self.value_atoms
            .read()
            .expect("value atoms lock poisoned")
            .get(key)
            .cloned()
    }

    /// The presence atom for a key, if one was ever observed. Never
    /// creates one.
    pub fn has_atom(&self, key: &Value) -> Option<Arc<Atom>> {
        self.has_atoms.get(key)
    }

    /// Get the value for `key`.
    ///
    /// A present entry observes its value atom; an absent key observes the
    /// key's presence, so the reader re-runs if the key later appears.
    pub fn get(&self, key: &Value) -> Option<Value> {
        let value = self.data.read().expect("data lock poisoned").get(key).cloned();

        match value {
            Some(_) => {
                if let Some(atom) = self.value_atom(key) {
                    atom.report_observed();
                }
            }
            None => self.has_atoms.report_observed(key),
        }

        value
    }

    /// Whether `key` is present. Observes the key's presence.
    pub fn has(&self, key: &Value) -> bool {
        self.has_atoms.report_observed(key);
        self.data.read().expect("data lock poisoned").contains_key(key)
    }

    /// Insert or update an entry.
    ///
    /// A new key notifies the key set and the key's presence observers; an
    /// updated value notifies only that entry's value observers, and only
    /// if the value actually changed.
    pub fn insert(&self, key: Value, value: Value) {
        let previous = self
            .data
            .write()
            .expect("data lock poisoned")
            .insert(key.clone(), value.clone());

        match previous {
            Some(old) => {
                if old != value {
                    if let Some(atom) = self.value_atom(&key) {
                        atom.report_changed();
                    }
                }
            }
            None => {
                self.value_atoms
                    .write()
                    .expect("value atoms lock poisoned")
                    .insert(key.clone(), Atom::new(format!("{}.{}", self.name, key)));

                self.keys_atom.report_changed();
                self.has_atoms.report_changed(&key);
            }
        }
    }

    /// Remove an entry. Returns whether the key was present.
    ///
    /// Notifies the removed entry's value observers, the key set, and the
    /// key's presence observers.
    pub fn remove(&self, key: &Value) -> bool {
        let removed = self
            .data
            .write()
            .expect("data lock poisoned")
            .shift_remove(key)
            .is_some();

        if removed {
            let atom = self
                .value_atoms
                .write()
                .expect("value atoms lock poisoned")
                .shift_remove(key);
            if let Some(atom) = atom {
                atom.report_changed();
            }

            self.keys_atom.report_changed();
            self.has_atoms.report_changed(key);
        }

        removed
    }

    /// Number of entries. Observes the key set.
    pub fn len(&self) -> usize {
        self.keys_atom.report_observed();
        self.data.read().expect("data lock poisoned").len()
    }

    /// Whether the map is empty. Observes the key set.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the keys in insertion order. Observes the key set.
    pub fn keys(&self) -> Vec<Value> {
        self.keys_atom.report_observed();
        self.data
            .read()
            .expect("data lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for ObservableMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ObservableMap {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            keys_atom: Arc::clone(&self.keys_atom),
            data: Arc::clone(&self.data),
            value_atoms: Arc::clone(&self.value_atoms),
            has_atoms: self.has_atoms.clone(),
        }
    }
}

impl Debug for ObservableMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableMap")
            .field("name", &self.name)
            .field("len", &self.data.read().expect("data lock poisoned").len())
            .finish()
    }
}
