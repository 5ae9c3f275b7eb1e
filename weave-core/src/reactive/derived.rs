//! Derived Value Implementation
//!
//! A Derived is a cached computation that re-evaluates only when one of the
//! atoms it read has changed.
//!
//! # How Derived Values Work
//!
//! 1. On first access, the derived runs its computation inside a read
//!    context and caches the result.
//!
//! 2. When accessed again, if no dependency has changed, the cached value
//!    is returned.
//!
//! 3. When a dependency atom reports a change, the derived is marked
//!    "maybe dirty". It stays lazy: nothing recomputes until the next
//!    access.
//!
//! 4. On recompute, old subscriptions are dropped, new ones established,
//!    and the derived's own atom reports a change only if the computed
//!    value actually moved (PartialEq).
//!
//! Eager propagation through chains of lazy derived values is the job of
//! an external scheduler; observers attached directly to a derived's atom
//! are notified synchronously when it recomputes to a different value.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::atom::Atom;
use super::context::ReactiveContext;
use super::observer::ObserverId;
use super::runtime::{Observer, ObserverHandle, Runtime};

/// Counter for generating unique derived-value IDs.
static DERIVED_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique derived-value ID.
fn next_derived_id() -> u64 {
    DERIVED_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Dirty state for a derived value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency might have changed. Need to check.
    MaybeDirty,

    /// The derived definitely needs to recompute.
    Dirty,
}

/// The non-generic core of a derived value: identity, dependency
/// bookkeeping, and the atom its own dependents attach to.
///
/// This is the shape the resolver works with; the value cache and the
/// computation live in [`Derived`].
pub struct DerivedState {
    /// Unique identifier for this derived value.
    id: u64,

    /// The observer ID used for dependency tracking.
    observer_id: ObserverId,

    /// The atom through which dependents observe this derived value.
    atom: Arc<Atom>,

    /// Current dirty state.
    dirty: RwLock<DirtyState>,

    /// Atoms read during the last computation.
    observing: RwLock<Vec<Arc<Atom>>>,
}

impl DerivedState {
    fn new(name: Option<String>) -> Arc<Self> {
        let id = next_derived_id();
        let name = name.unwrap_or_else(|| format!("Derived@{id}"));

        Arc::new(Self {
            id,
            observer_id: ObserverId::new(),
            atom: Atom::new(name),
            dirty: RwLock::new(DirtyState::Dirty),
            observing: RwLock::new(Vec::new()),
        })
    }

    /// Get the derived value's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the observer ID used for dependency tracking.
    pub fn observer_id(&self) -> ObserverId {
        self.observer_id
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        self.atom.name()
    }

    /// The atom through which dependents observe this derived value.
    pub fn atom(&self) -> &Arc<Atom> {
        &self.atom
    }

    /// Get the current dirty state.
    pub fn dirty_state(&self) -> DirtyState {
        *self.dirty.read().expect("dirty lock poisoned")
    }

    /// Get the number of atoms observed by the last computation.
    pub fn dependency_count(&self) -> usize {
        self.observing.read().expect("observing lock poisoned").len()
    }
}

impl Debug for DerivedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedState")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("state", &self.dirty_state())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

impl Observer for DerivedState {
    fn observer_id(&self) -> ObserverId {
        self.observer_id
    }

    fn mark_maybe_dirty(&self) {
        let mut dirty = self.dirty.write().expect("dirty lock poisoned");
        if *dirty == DirtyState::Clean {
            *dirty = DirtyState::MaybeDirty;
        }
    }

    fn schedule(&self) {
        // Lazy: recomputation happens on the next access.
    }

    fn is_eager(&self) -> bool {
        false
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Must be Clone + Send + Sync +
///   PartialEq.
///
/// The PartialEq bound is needed to detect when the computed value actually
/// changed (a derived may return the same value even if inputs changed).
pub struct Derived<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Identity and dependency bookkeeping; shared with the resolver.
    state: Arc<DerivedState>,

    /// The computation function.
    compute: Arc<dyn Fn() -> T + Send + Sync>,

    /// The cached value (None if never computed).
    value: Arc<RwLock<Option<T>>>,

    /// Keeps the runtime registration alive for as long as any clone
    /// exists.
    _registration: Arc<ObserverHandle>,
}

impl<T> Derived<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a new derived value with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(None, compute)
    }

    /// Create a new derived value with an explicit diagnostic name.
    pub fn named<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(Some(name.into()), compute)
    }

    fn build<F>(name: Option<String>, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let state = DerivedState::new(name);
        let registration = Arc::new(Runtime::register(state.clone()));

        Self {
            state,
            compute: Arc::new(compute),
            value: Arc::new(RwLock::new(None)),
            _registration: registration,
        }
    }

    /// Identity and dependency bookkeeping; the shape the resolver holds.
    pub fn state(&self) -> &Arc<DerivedState> {
        &self.state
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// Reading a derived value inside a read context registers the current
    /// observer as depending on it.
    pub fn get(&self) -> T {
        self.state.atom.report_observed();

        match self.state.dirty_state() {
            DirtyState::Clean => self
                .value
                .read()
                .expect("value lock poisoned")
                .clone()
                .expect("clean derived should have a value"),
            DirtyState::MaybeDirty | DirtyState::Dirty => self.recompute(),
        }
    }

    /// Check if the derived has a cached value.
    pub fn has_value(&self) -> bool {
        self.value.read().expect("value lock poisoned").is_some()
    }

    /// Recompute the value inside a read context, rewiring subscriptions.
    fn recompute(&self) -> T {
        // Drop old subscriptions first; atoms that lose their last observer
        // fire their unobserved hooks here.
        for atom in self
            .state
            .observing
            .write()
            .expect("observing lock poisoned")
            .drain(..)
        {
            atom.unsubscribe(self.state.observer_id);
        }

        let new_value = {
            let _ctx = ReactiveContext::enter(self.state.observer_id);
            let value = (self.compute)();

            *self
                .state
                .observing
                .write()
                .expect("observing lock poisoned") = ReactiveContext::observed_atoms();

            value
        };

        let value_changed = {
            let current = self.value.read().expect("value lock poisoned");
            current.as_ref() != Some(&new_value)
        };

        *self.value.write().expect("value lock poisoned") = Some(new_value.clone());
        *self.state.dirty.write().expect("dirty lock poisoned") = DirtyState::Clean;

        if value_changed {
            self.state.atom.report_changed();
        }

        new_value
    }
}

impl<T> Clone for Derived<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            compute: Arc::clone(&self.compute),
            value: Arc::clone(&self.value),
            _registration: Arc::clone(&self._registration),
        }
    }
}

impl<T> Debug for Derived<T>
where
    T: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.state.id)
            .field("name", &self.state.name())
            .field("state", &self.state.dirty_state())
            .field("has_value", &self.has_value())
            .finish()
    }
}
