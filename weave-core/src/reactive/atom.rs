//! Atom Implementation
//!
//! An Atom is the minimal trackable unit. It holds no value of its own; it
//! represents "a piece of state somebody may depend on" and tracks which
//! observers currently depend on it.
//!
//! # How Atoms Work
//!
//! 1. When an atom is read within a read context (derived value/reaction),
//!    the atom registers that observer as a dependent.
//!
//! 2. When the state the atom guards changes, `report_changed` notifies all
//!    dependents through the runtime.
//!
//! 3. The atom fires lifecycle hooks on the edges of its observed state:
//!    `on_become_observed` when the first observer attaches and
//!    `on_become_unobserved` when the last one detaches. The unobserved
//!    hook is what lazily-created atoms use to remove themselves from the
//!    tables that own them.
//!
//! # Thread Safety
//!
//! The observer set is protected by a RwLock. Lifecycle hooks run after the
//! lock is released, so a hook may freely touch other tracked structures.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::trace;

use super::context::ReactiveContext;
use super::observer::ObserverId;
use super::runtime::Runtime;

/// Counter for generating unique atom IDs.
static ATOM_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique atom ID.
fn next_atom_id() -> u64 {
    ATOM_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A lifecycle hook invoked on observed/unobserved edge transitions.
pub type LifecycleHook = Box<dyn Fn() + Send + Sync>;

/// The minimal trackable unit.
///
/// # Example
///
/// ```rust,ignore
/// let atom = Atom::new("door.open");
///
/// // In some computation:
/// atom.report_observed();
///
/// // When the guarded state changes:
/// atom.report_changed();
/// ```
pub struct Atom {
    /// Unique identifier for this atom.
    id: u64,

    /// Diagnostic name, used for debug output and error messages.
    name: String,

    /// Ids of the observers that currently depend on this atom.
    observers: RwLock<HashSet<ObserverId>>,

    /// Invoked when the observer set goes from empty to non-empty.
    on_become_observed: Option<LifecycleHook>,

    /// Invoked when the observer set goes from non-empty to empty.
    on_become_unobserved: Option<LifecycleHook>,
}

impl Atom {
    /// Create a new atom with the given diagnostic name.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_hooks(name, None, None)
    }

    /// Create a new atom with lifecycle hooks.
    ///
    /// Hooks fire only on edge transitions of the observer set; an atom
    /// that is never observed never fires either hook.
    pub fn with_hooks(
        name: impl Into<String>,
        on_become_observed: Option<LifecycleHook>,
        on_become_unobserved: Option<LifecycleHook>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: next_atom_id(),
            name: name.into(),
            observers: RwLock::new(HashSet::new()),
            on_become_observed,
            on_become_unobserved,
        })
    }

    /// Get the atom's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the atom's diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register the current read context as a dependent of this atom.
    ///
    /// Returns true if a dependency was recorded. Outside an active read
    /// context this is safe and simply records nothing.
    pub fn report_observed(self: &Arc<Self>) -> bool {
        let Some(observer) = ReactiveContext::current_observer() else {
            return false;
        };

        let (inserted, became_observed) = {
            let mut observers = self.observers.write().expect("observers lock poisoned");
            let was_empty = observers.is_empty();
            let inserted = observers.insert(observer);
            (inserted, inserted && was_empty)
        };

        // Track only newly recorded subscriptions so a repeated read inside
        // one run registers the dependency once.
        if inserted {
            ReactiveContext::track_atom(Arc::clone(self));
        }

        if became_observed {
            trace!(atom = %self.name, "atom became observed");
            if let Some(hook) = &self.on_become_observed {
                hook();
            }
        }

        true
    }

    /// Notify all dependents that the state this atom guards has changed.
    ///
    /// Observers are invalidated through the runtime: lazy ones are marked
    /// maybe-dirty, eager ones run synchronously.
    pub fn report_changed(&self) {
        let observers: Vec<ObserverId> = self
            .observers
            .read()
            .expect("observers lock poisoned")
            .iter()
            .copied()
            .collect();

        if observers.is_empty() {
            return;
        }

        trace!(atom = %self.name, dependents = observers.len(), "atom changed");
        Runtime::invalidate(&observers);
    }

    /// Detach one observer from this atom.
    ///
    /// Fires `on_become_unobserved` if this was the last observer.
    pub fn unsubscribe(&self, observer: ObserverId) {
        let became_unobserved = {
            let mut observers = self.observers.write().expect("observers lock poisoned");
            observers.remove(&observer) && observers.is_empty()
        };

        if became_unobserved {
            trace!(atom = %self.name, "atom became unobserved");
            if let Some(hook) = &self.on_become_unobserved {
                hook();
            }
        }
    }

    /// Whether any observer currently depends on this atom.
    pub fn is_being_observed(&self) -> bool {
        !self
            .observers
            .read()
            .expect("observers lock poisoned")
            .is_empty()
    }

    /// Get the number of observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .expect("observers lock poisoned")
            .len()
    }
}

impl Debug for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn atom_ids_are_unique() {
        let a = Atom::new("a");
        let b = Atom::new("b");
        let c = Atom::new("c");

        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), c.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn report_observed_outside_context_records_nothing() {
        let atom = Atom::new("lonely");

        assert!(!atom.report_observed());
        assert!(!atom.is_being_observed());
        assert_eq!(atom.observer_count(), 0);
    }

    #[test]
    fn report_observed_registers_current_observer() {
        let atom = Atom::new("watched");
        let id = ObserverId::new();

        let _ctx = ReactiveContext::enter(id);
        assert!(atom.report_observed());

        assert!(atom.is_being_observed());
        assert_eq!(atom.observer_count(), 1);

        // The context collected the atom for later unsubscription.
        let observed = ReactiveContext::observed_atoms();
        assert_eq!(observed.len(), 1);
        assert!(Arc::ptr_eq(&observed[0], &atom));
    }

    #[test]
    fn repeated_reads_register_once() {
        let atom = Atom::new("watched");
        let id = ObserverId::new();

        let _ctx = ReactiveContext::enter(id);
        atom.report_observed();
        atom.report_observed();
        atom.report_observed();

        assert_eq!(atom.observer_count(), 1);
        assert_eq!(ReactiveContext::observed_atoms().len(), 1);
    }

    #[test]
    fn lifecycle_hooks_fire_on_edge_transitions() {
        let observed_count = Arc::new(AtomicI32::new(0));
        let unobserved_count = Arc::new(AtomicI32::new(0));

        let observed_clone = observed_count.clone();
        let unobserved_clone = unobserved_count.clone();

        let atom = Atom::with_hooks(
            "edges",
            Some(Box::new(move || {
                observed_clone.fetch_add(1, Ordering::SeqCst);
            })),
            Some(Box::new(move || {
                unobserved_clone.fetch_add(1, Ordering::SeqCst);
            })),
        );

        let first = ObserverId::new();
        let second = ObserverId::new();

        {
            let _ctx = ReactiveContext::enter(first);
            atom.report_observed();
        }
        {
            let _ctx = ReactiveContext::enter(second);
            atom.report_observed();
        }

        // First observer triggered the hook; the second did not.
        assert_eq!(observed_count.load(Ordering::SeqCst), 1);

        atom.unsubscribe(first);
        assert_eq!(unobserved_count.load(Ordering::SeqCst), 0);

        atom.unsubscribe(second);
        assert_eq!(unobserved_count.load(Ordering::SeqCst), 1);

        // Re-observation fires the observed hook again.
        {
            let _ctx = ReactiveContext::enter(first);
            atom.report_observed();
        }
        assert_eq!(observed_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_unknown_observer_is_a_no_op() {
        let unobserved_count = Arc::new(AtomicI32::new(0));
        let unobserved_clone = unobserved_count.clone();

        let atom = Atom::with_hooks(
            "stable",
            None,
            Some(Box::new(move || {
                unobserved_clone.fetch_add(1, Ordering::SeqCst);
            })),
        );

        atom.unsubscribe(ObserverId::new());
        assert_eq!(unobserved_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn report_changed_without_observers_is_a_no_op() {
        let atom = Atom::new("quiet");
        // Nothing to notify; must not panic or allocate observers.
        atom.report_changed();
        assert_eq!(atom.observer_count(), 0);
    }
}
