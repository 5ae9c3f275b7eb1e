//! Per-Key Tracking Table
//!
//! An AtomMap lazily creates one atom per key of a dynamic, heterogeneous
//! domain. Map-like containers use it to make "does key K exist" observable
//! even before K is ever inserted.
//!
//! # Storage Strategy
//!
//! Two physically distinct tables, both allocated lazily so the no-entries
//! case stays allocation-free:
//!
//! - primitive keys (by-value equality) live in a strong table; the entry's
//!   atom carries an unobserved hook that removes the entry when the last
//!   observer detaches, so a churn of transient keys cannot grow the table
//!   without bound;
//!
//! - `Ref` keys (identity equality) live in an identity table that holds
//!   only a `Weak` to the key object, so an entry never keeps an
//!   otherwise-dropped key alive. Dead entries read as absent immediately
//!   and are swept when the next identity entry is inserted. The `Weak`
//!   pins the key's allocation, so the address used as table index cannot
//!   be reused while the entry exists.
//!
//! At most one live entry exists per (map, key) pair.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock, Weak};

use tracing::trace;

use crate::value::{ref_addr, Value};

use super::atom::Atom;

/// An entry in the identity table: a non-owning handle to the key object
/// plus the atom tracking it.
struct IdentityEntry {
    key: Weak<dyn Any + Send + Sync>,
    atom: Arc<Atom>,
}

impl IdentityEntry {
    fn is_live(&self) -> bool {
        self.key.strong_count() > 0
    }
}

/// A lazily populated key-to-atom table with per-key-kind storage.
///
/// Cloning shares the underlying tables.
pub struct AtomMap {
    /// Prefix for the diagnostic names of lazily created atoms; never used
    /// for lookup.
    name_prefix: String,

    /// Strong table for primitive keys. None until the first entry.
    by_value: Arc<RwLock<Option<HashMap<Value, Arc<Atom>>>>>,

    /// Identity table for `Ref` keys, indexed by key address.
    /// None until the first entry.
    by_identity: Arc<RwLock<Option<HashMap<usize, IdentityEntry>>>>,
}

impl AtomMap {
    /// Create an empty table. No storage is allocated until the first
    /// entry is created.
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            by_value: Arc::new(RwLock::new(None)),
            by_identity: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the name prefix used for lazily created atoms.
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// Whether an entry currently exists for `key`. Never creates one.
    pub fn has(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    /// Get the existing atom for `key` without creating one.
    ///
    /// An identity entry whose key object has been dropped reads as absent.
    pub fn get(&self, key: &Value) -> Option<Arc<Atom>> {
        match key {
            Value::Ref(obj) => {
                let table = self.by_identity.read().expect("identity table poisoned");
                let entry = table.as_ref()?.get(&ref_addr(obj))?;
                if !entry.is_live() {
                    return None;
                }
                Some(Arc::clone(&entry.atom))
            }
            _ => {
                let table = self.by_value.read().expect("value table poisoned");
                table.as_ref()?.get(key).cloned()
            }
        }
    }

    /// Register the current read context as depending on `key`.
    ///
    /// Creates the entry lazily on first observation. Safe to call outside
    /// a read context; the entry is still created, but no dependency is
    /// recorded.
    pub fn report_observed(&self, key: &Value) {
        let atom = match self.get(key) {
            Some(atom) => atom,
            None => self.create_entry(key),
        };

        atom.report_observed();
    }

    /// Notify observers of `key` that its state changed.
    ///
    /// A no-op when no entry exists: there is nothing to notify, and
    /// changed-reporting must never itself create a dependency.
    pub fn report_changed(&self, key: &Value) {
        if let Some(atom) = self.get(key) {
            atom.report_changed();
        }
    }

    /// Number of live entries across both tables.
    pub fn entry_count(&self) -> usize {
        let strong = self
            .by_value
            .read()
            .expect("value table poisoned")
            .as_ref()
            .map_or(0, HashMap::len);

        let identity = self
            .by_identity
            .read()
            .expect("identity table poisoned")
            .as_ref()
            .map_or(0, |table| {
                table.values().filter(|entry| entry.is_live()).count()
            });

        strong + identity
    }

    /// Physical size of the identity table, dead entries included.
    #[cfg(test)]
    fn identity_slots(&self) -> usize {
        self.by_identity
            .read()
            .expect("identity table poisoned")
            .as_ref()
            .map_or(0, HashMap::len)
    }

    /// Create the entry for `key`, choosing the table by key kind.
    fn create_entry(&self, key: &Value) -> Arc<Atom> {
        let name = format!("{}.{}?", self.name_prefix, key);

        match key {
            Value::Ref(obj) => {
                let mut table = self.by_identity.write().expect("identity table poisoned");
                let entries = table.get_or_insert_with(HashMap::new);

                // Re-check under the write lock so two racing observers
                // cannot both create an entry.
                if let Some(entry) = entries.get(&ref_addr(obj)) {
                    if entry.is_live() {
                        return Arc::clone(&entry.atom);
                    }
                }

                // Sweep entries whose key object has been dropped; their
                // addresses may now be reused.
                let before = entries.len();
                entries.retain(|_, entry| entry.is_live());
                if entries.len() < before {
                    trace!(
                        table = %self.name_prefix,
                        swept = before - entries.len(),
                        "swept dead identity entries"
                    );
                }

                let atom = Atom::new(name);
                entries.insert(
                    ref_addr(obj),
                    IdentityEntry {
                        key: Arc::downgrade(obj),
                        atom: Arc::clone(&atom),
                    },
                );
                atom
            }
            _ => {
                let mut table = self.by_value.write().expect("value table poisoned");
                let entries = table.get_or_insert_with(HashMap::new);

                if let Some(atom) = entries.get(key) {
                    return Arc::clone(atom);
                }

                // The eviction hook removes the entry once the atom's last
                // observer detaches.
                let table_handle = Arc::clone(&self.by_value);
                let evict_key = key.clone();
                let prefix = self.name_prefix.clone();
                let atom = Atom::with_hooks(
                    name,
                    None,
                    Some(Box::new(move || {
                        if let Some(entries) = table_handle
                            .write()
                            .expect("value table poisoned")
                            .as_mut()
                        {
                            entries.remove(&evict_key);
                            trace!(table = %prefix, key = %evict_key, "evicted unobserved entry");
                        }
                    })),
                );

                entries.insert(key.clone(), Arc::clone(&atom));
                atom
            }
        }
    }
}

impl Clone for AtomMap {
    fn clone(&self) -> Self {
        Self {
            name_prefix: self.name_prefix.clone(),
            by_value: Arc::clone(&self.by_value),
            by_identity: Arc::clone(&self.by_identity),
        }
    }
}

impl Debug for AtomMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomMap")
            .field("name_prefix", &self.name_prefix)
            .field("entry_count", &self.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::context::ReactiveContext;
    use crate::reactive::observer::ObserverId;
    use crate::value::RefValue;

    #[test]
    fn starts_with_no_entries() {
        let map = AtomMap::new("coll");
        assert_eq!(map.entry_count(), 0);
        assert!(!map.has(&Value::from("x")));
        assert!(map.get(&Value::from("x")).is_none());
    }

    #[test]
    fn report_observed_creates_an_entry() {
        let map = AtomMap::new("coll");
        let key = Value::from("x");

        map.report_observed(&key);

        assert!(map.has(&key));
        assert_eq!(map.entry_count(), 1);
    }

    #[test]
    fn entry_names_carry_prefix_and_key() {
        let map = AtomMap::new("coll");
        let key = Value::from("x");

        map.report_observed(&key);

        let atom = map.get(&key).unwrap();
        assert!(atom.name().contains("coll"));
        assert!(atom.name().contains('x'));
    }

    #[test]
    fn at_most_one_entry_per_key() {
        let map = AtomMap::new("coll");
        let key = Value::from(7i64);

        map.report_observed(&key);
        let first = map.get(&key).unwrap();

        map.report_observed(&key);
        let second = map.get(&key).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(map.entry_count(), 1);
    }

    #[test]
    fn report_changed_without_entry_creates_nothing() {
        let map = AtomMap::new("coll");
        let key = Value::from("missing");

        map.report_changed(&key);

        assert!(!map.has(&key));
        assert_eq!(map.entry_count(), 0);
    }

    #[test]
    fn primitive_entry_is_evicted_when_unobserved() {
        let map = AtomMap::new("coll");
        let key = Value::from("x");
        let id = ObserverId::new();

        {
            let _ctx = ReactiveContext::enter(id);
            map.report_observed(&key);
        }
        assert!(map.has(&key));

        let atom = map.get(&key).unwrap();
        atom.unsubscribe(id);

        // Last observer detached: the eviction hook removed the entry.
        assert!(!map.has(&key));
        assert_eq!(map.entry_count(), 0);
    }

    #[test]
    fn unobserved_primitive_entry_survives_until_observed_once() {
        // An entry created outside a read context has no observers, so it
        // never transitions to unobserved and stays in the table.
        let map = AtomMap::new("coll");
        let key = Value::from("x");

        map.report_observed(&key);
        assert!(map.has(&key));
    }

    #[test]
    fn identity_keys_use_the_identity_table() {
        let map = AtomMap::new("coll");
        let obj: RefValue = Arc::new(41u32);
        let key = Value::reference(Arc::clone(&obj));

        map.report_observed(&key);

        assert!(map.has(&key));
        // A distinct object with equal contents is a different key.
        let other: RefValue = Arc::new(41u32);
        assert!(!map.has(&Value::reference(other)));
    }

    #[test]
    fn dropped_identity_key_reads_as_absent() {
        let map = AtomMap::new("coll");
        let obj: RefValue = Arc::new("payload".to_string());
        let key = Value::reference(Arc::clone(&obj));

        map.report_observed(&key);
        assert_eq!(map.entry_count(), 1);

        drop(obj);
        drop(key);

        // The table may still physically hold the slot, but it is dead.
        assert_eq!(map.entry_count(), 0);
    }

    #[test]
    fn dead_identity_entries_are_swept_on_insert() {
        let map = AtomMap::new("coll");

        let obj: RefValue = Arc::new(1u8);
        map.report_observed(&Value::reference(Arc::clone(&obj)));
        drop(obj);

        assert_eq!(map.identity_slots(), 1);
        assert_eq!(map.entry_count(), 0);

        // Inserting a fresh identity entry sweeps the dead slot.
        let fresh: RefValue = Arc::new(2u8);
        map.report_observed(&Value::reference(Arc::clone(&fresh)));

        assert_eq!(map.identity_slots(), 1);
        assert_eq!(map.entry_count(), 1);
    }

    #[test]
    fn clones_share_entries() {
        let map = AtomMap::new("coll");
        let clone = map.clone();

        map.report_observed(&Value::from("x"));

        assert!(clone.has(&Value::from("x")));
        assert_eq!(clone.entry_count(), 1);
    }
}
