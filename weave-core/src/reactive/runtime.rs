//! Observer Registry
//!
//! The runtime is the central coordinator between atoms and the observers
//! that depend on them. Atoms record observer *ids*; the registry resolves
//! those ids back to live observers when a change must be propagated.
//!
//! # How It Works
//!
//! 1. When a derived value or reaction is created, it registers with the
//!    runtime and holds the returned handle.
//!
//! 2. When an atom reports a change, the runtime looks up each recorded
//!    observer, marks it as "maybe dirty", and synchronously runs the eager
//!    ones (reactions). Lazy observers (derived values) recompute on their
//!    next access.
//!
//! 3. Dropping the handle unregisters the observer; the registry only ever
//!    holds weak references, so it never keeps a dead observer alive.
//!
//! # Thread Safety
//!
//! The read context is thread-local, but observers may be shared across
//! threads, so the registry itself is a concurrent map.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;

use super::context::ReactiveContext;
use super::observer::ObserverId;

/// A trait for computations that can be notified when dependencies change.
pub trait Observer: Send + Sync {
    /// Get the observer ID for this computation.
    fn observer_id(&self) -> ObserverId;

    /// Mark this computation as potentially needing update.
    fn mark_maybe_dirty(&self);

    /// Run this computation now (eager observers only).
    fn schedule(&self);

    /// Check if this observer is eager (reaction) or lazy (derived value).
    fn is_eager(&self) -> bool;
}

/// Handle to a registered observer.
///
/// Dropping this handle unregisters the observer from the runtime.
pub struct ObserverHandle {
    observer_id: ObserverId,
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.observer_id);
    }
}

// Global registry of observers. Weak references only, so registration never
// extends an observer's lifetime.
static REGISTRY: OnceLock<DashMap<ObserverId, Weak<dyn Observer>>> = OnceLock::new();

fn registry() -> &'static DashMap<ObserverId, Weak<dyn Observer>> {
    REGISTRY.get_or_init(DashMap::new)
}

/// The global reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Register an observer with the runtime.
    ///
    /// Returns a handle that unregisters the observer when dropped.
    pub fn register(observer: Arc<dyn Observer>) -> ObserverHandle {
        let id = observer.observer_id();
        registry().insert(id, Arc::downgrade(&observer));
        ObserverHandle { observer_id: id }
    }

    /// Unregister an observer.
    fn unregister(id: ObserverId) {
        registry().remove(&id);
    }

    /// Invalidate the given observers after an atom changed.
    ///
    /// Every live observer is marked maybe-dirty; eager observers are run
    /// after all lookups complete, so no registry entry is borrowed while
    /// user code executes.
    pub fn invalidate(observers: &[ObserverId]) {
        let mut eager = Vec::new();

        for id in observers {
            if let Some(weak) = registry().get(id) {
                if let Some(observer) = weak.upgrade() {
                    observer.mark_maybe_dirty();

                    if observer.is_eager() {
                        eager.push(observer);
                    }
                }
            }
        }

        for observer in eager {
            observer.schedule();
        }
    }

    /// Whether the given observer is currently registered.
    pub fn is_registered(id: ObserverId) -> bool {
        registry().contains_key(&id)
    }

    /// Get the observer currently being tracked, if any.
    pub fn current_observer() -> Option<ObserverId> {
        ReactiveContext::current_observer()
    }

    /// Check if we're inside a read context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
