//! Reaction Implementation
//!
//! A Reaction is a side-effecting subscriber that re-runs whenever one of
//! the atoms it read reports a change.
//!
//! # How Reactions Work
//!
//! 1. When created, the reaction runs its action immediately to establish
//!    initial subscriptions.
//!
//! 2. When any observed atom changes, the reaction re-runs synchronously.
//!
//! 3. Before each re-run, the reaction detaches from all previously
//!    observed atoms and re-attaches to whatever the new run reads. Atoms
//!    that lose their last observer fire their unobserved hooks at that
//!    point.
//!
//! # Disposal
//!
//! `dispose()` detaches the reaction from every atom it observes and
//! prevents further runs. Disposal is how "became unobserved" cleanup is
//! ultimately driven: a per-key tracking entry whose only observer is a
//! disposed reaction is evicted immediately.
//!
//! The [`Disposer`] returned by [`autorun`] is a first-class value carrying
//! its reaction, so diagnostics code can resolve a disposer back to the
//! subscriber it controls.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::atom::Atom;
use super::context::ReactiveContext;
use super::observer::ObserverId;
use super::runtime::{Observer, ObserverHandle, Runtime};

/// Counter for generating unique reaction IDs.
static REACTION_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique reaction ID.
fn next_reaction_id() -> u64 {
    REACTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Shared core of a reaction; what the runtime schedules.
struct ReactionCore {
    /// Unique identifier for this reaction.
    id: u64,

    /// Diagnostic name.
    name: String,

    /// The observer ID used for dependency tracking.
    observer_id: ObserverId,

    /// The side-effecting action.
    action: Box<dyn Fn() + Send + Sync>,

    /// Atoms observed during the last run.
    observing: RwLock<Vec<Arc<Atom>>>,

    /// Whether the reaction has been disposed.
    disposed: AtomicBool,

    /// Number of times the reaction has run.
    run_count: AtomicUsize,
}

impl ReactionCore {
    /// Run the action inside a read context, rewiring subscriptions.
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        // Detach from the previous run's atoms; last-observer transitions
        // fire their unobserved hooks here.
        for atom in self
            .observing
            .write()
            .expect("observing lock poisoned")
            .drain(..)
        {
            atom.unsubscribe(self.observer_id);
        }

        {
            let _ctx = ReactiveContext::enter(self.observer_id);
            (self.action)();

            *self.observing.write().expect("observing lock poisoned") =
                ReactiveContext::observed_atoms();
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl Observer for ReactionCore {
    fn observer_id(&self) -> ObserverId {
        self.observer_id
    }

    fn mark_maybe_dirty(&self) {
        // Nothing cached; re-running is the only response to a change.
    }

    fn schedule(&self) {
        self.execute();
    }

    fn is_eager(&self) -> bool {
        true
    }
}

/// A side-effecting subscriber that re-runs when its dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let door_open = Atom::new("door.open");
///
/// let reaction = Reaction::new(move || {
///     door_open.report_observed();
///     println!("checking the door");
/// });
///
/// door_open.report_changed(); // re-runs the action
/// reaction.dispose();
/// ```
pub struct Reaction {
    core: Arc<ReactionCore>,

    /// Keeps the runtime registration alive for as long as any clone
    /// exists.
    _registration: Arc<ObserverHandle>,
}

impl Reaction {
    /// Create a new reaction with the given action.
    ///
    /// The action runs immediately to establish initial subscriptions.
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(None, action)
    }

    /// Create a new reaction with an explicit diagnostic name.
    pub fn named<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(Some(name.into()), action)
    }

    fn build<F>(name: Option<String>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = next_reaction_id();
        let core = Arc::new(ReactionCore {
            id,
            name: name.unwrap_or_else(|| format!("Reaction@{id}")),
            observer_id: ObserverId::new(),
            action: Box::new(action),
            observing: RwLock::new(Vec::new()),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let registration = Arc::new(Runtime::register(core.clone()));

        // Run immediately to establish subscriptions
        core.execute();

        Self {
            core,
            _registration: registration,
        }
    }

    /// Get the reaction's unique ID.
    pub fn id(&self) -> u64 {
        self.core.id
    }

    /// Get the diagnostic name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Get the observer ID used for dependency tracking.
    pub fn observer_id(&self) -> ObserverId {
        self.core.observer_id
    }

    /// Get the number of times the reaction has run.
    pub fn run_count(&self) -> usize {
        self.core.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of atoms observed by the last run.
    pub fn dependency_count(&self) -> usize {
        self.core
            .observing
            .read()
            .expect("observing lock poisoned")
            .len()
    }

    /// Check if the reaction has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.core.disposed.load(Ordering::SeqCst)
    }

    /// Dispose of the reaction.
    ///
    /// Detaches from every observed atom and prevents further runs.
    /// Idempotent.
    pub fn dispose(&self) {
        if self.core.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        for atom in self
            .core
            .observing
            .write()
            .expect("observing lock poisoned")
            .drain(..)
        {
            atom.unsubscribe(self.core.observer_id);
        }

        debug!(reaction = %self.core.name, "reaction disposed");
    }

    /// Whether two handles control the same reaction.
    pub fn same_reaction(&self, other: &Reaction) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl Clone for Reaction {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            _registration: Arc::clone(&self._registration),
        }
    }
}

impl Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A callable record that tears down the reaction it carries.
///
/// Returned by [`autorun`]; diagnostics code can resolve it back to the
/// attached reaction.
pub struct Disposer {
    reaction: Reaction,
}

impl Disposer {
    /// The reaction this disposer controls.
    pub fn reaction(&self) -> &Reaction {
        &self.reaction
    }

    /// Dispose the attached reaction. Idempotent.
    pub fn dispose(&self) {
        self.reaction.dispose();
    }
}

impl Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("reaction", &self.reaction.name())
            .finish()
    }
}

/// Run `action` now and again whenever an atom it read changes.
///
/// Returns a [`Disposer`] that stops the subscription.
pub fn autorun<F>(action: F) -> Disposer
where
    F: Fn() + Send + Sync + 'static,
{
    Disposer {
        reaction: Reaction::new(action),
    }
}
