//! Observable Object
//!
//! An object-like container exposing named members, each guarded by its own
//! atom. Member atoms are materialized lazily: declaring a member costs
//! nothing until somebody reads, writes, or resolves it. The object's
//! administration record is the table of member atoms.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::reactive::Atom;
use crate::value::Value;

/// Counter for generating unique object IDs.
static OBJECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique object ID.
fn next_object_id() -> u64 {
    OBJECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The administration record of an object: its name and the member atoms
/// materialized so far.
pub struct ObjectAdmin {
    name: String,
    values: RwLock<IndexMap<String, Arc<Atom>>>,
}

impl ObjectAdmin {
    fn new(name: String) -> Arc<Self> {
        Arc::new(Self {
            name,
            values: RwLock::new(IndexMap::new()),
        })
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The atom for a member, if it has been materialized.
    pub fn member_atom(&self, member: &str) -> Option<Arc<Atom>> {
        self.values
            .read()
            .expect("values lock poisoned")
            .get(member)
            .cloned()
    }

    /// Whether the member's atom has been materialized.
    pub fn has_member_atom(&self, member: &str) -> bool {
        self.values
            .read()
            .expect("values lock poisoned")
            .contains_key(member)
    }

    /// Number of materialized member atoms.
    pub fn member_count(&self) -> usize {
        self.values.read().expect("values lock poisoned").len()
    }

    /// Get or create the atom for a member.
    fn materialize(&self, member: &str) -> Arc<Atom> {
        let mut values = self.values.write().expect("values lock poisoned");
        if let Some(atom) = values.get(member) {
            return Arc::clone(atom);
        }

        let atom = Atom::new(format!("{}.{}", self.name, member));
        values.insert(member.to_string(), Arc::clone(&atom));
        atom
    }
}

impl Debug for ObjectAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectAdmin")
            .field("name", &self.name)
            .field("member_count", &self.member_count())
            .finish()
    }
}

/// An object with named, individually tracked members.
///
/// Cloning shares the underlying storage.
pub struct ObservableObject {
    admin: Arc<ObjectAdmin>,
    fields: Arc<RwLock<IndexMap<String, Value>>>,
}

impl ObservableObject {
    /// Create an empty object with a generated diagnostic name.
    pub fn new() -> Self {
        Self::named(format!("ObservableObject@{}", next_object_id()))
    }

    /// Create an empty object with an explicit diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            admin: ObjectAdmin::new(name.into()),
            fields: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        self.admin.name()
    }

    /// The administration record.
    pub fn admin(&self) -> &Arc<ObjectAdmin> {
        &self.admin
    }

    /// Declare a member with an initial value.
    ///
    /// No atom is materialized yet; the first read, write, or resolution
    /// of the member does that.
    pub fn declare(&self, member: impl Into<String>, value: Value) {
        self.fields
            .write()
            .expect("fields lock poisoned")
            .insert(member.into(), value);
    }

    /// Whether the member has been declared.
    pub fn has_member(&self, member: &str) -> bool {
        self.fields
            .read()
            .expect("fields lock poisoned")
            .contains_key(member)
    }

    /// Read a member, observing it.
    ///
    /// Returns None for undeclared members; nothing is observed then.
    pub fn read(&self, member: &str) -> Option<Value> {
        let value = self
            .fields
            .read()
            .expect("fields lock poisoned")
            .get(member)
            .cloned()?;

        self.admin.materialize(member).report_observed();
        Some(value)
    }

    /// Write a member, notifying its observers if the value changed.
    ///
    /// Returns false for undeclared members.
    pub fn write(&self, member: &str, value: Value) -> bool {
        let changed = {
            let mut fields = self.fields.write().expect("fields lock poisoned");
            match fields.get_mut(member) {
                Some(slot) => {
                    let changed = *slot != value;
                    *slot = value;
                    Some(changed)
                }
                None => None,
            }
        };

        match changed {
            Some(true) => {
                self.admin.materialize(member).report_changed();
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    /// Materialize the member's atom without observing it, if the member
    /// is declared.
    ///
    /// Resolution paths use this to reach members that exist but have
    /// never been read.
    pub fn touch(&self, member: &str) {
        if self.has_member(member) {
            self.admin.materialize(member);
        }
    }
}

impl Default for ObservableObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ObservableObject {
    fn clone(&self) -> Self {
        Self {
            admin: Arc::clone(&self.admin),
            fields: Arc::clone(&self.fields),
        }
    }
}

impl Debug for ObservableObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableObject")
            .field("name", &self.name())
            .field(
                "members",
                &self.fields.read().expect("fields lock poisoned").len(),
            )
            .finish()
    }
}
