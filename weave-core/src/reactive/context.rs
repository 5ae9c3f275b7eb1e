//! Read Context
//!
//! The read context tracks which observer is currently running. This enables
//! automatic dependency tracking: when an atom is read, it registers the
//! current observer as a dependent and hands the context a reference to
//! itself so the observer can unsubscribe precisely later.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing observer.
//! When entering a read context (e.g., running a derived value or a
//! reaction), we push the observer onto the stack. When the computation
//! completes, we pop it.
//!
//! This design supports nested read contexts (e.g., a derived value that
//! reads from another derived value).

use std::cell::RefCell;
use std::sync::Arc;

use smallvec::SmallVec;

use super::atom::Atom;
use super::observer::ObserverId;

/// The read-context stack.
///
/// Each thread has its own stack to track which observer is running. The
/// thread-local approach avoids synchronization in the common case of
/// single-threaded reactivity.
thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = RefCell::new(Vec::new());
}

/// An entry in the read-context stack.
struct ContextEntry {
    /// The id of the observer currently running.
    observer_id: ObserverId,
    /// Atoms observed during this run. Most computations read only a
    /// handful of atoms, so the collection stays inline.
    observed: SmallVec<[Arc<Atom>; 8]>,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if the
/// computation panics.
pub struct ReactiveContext {
    observer_id: ObserverId,
}

impl ReactiveContext {
    /// Enter a new read context for the given observer.
    ///
    /// While this context is active, any atoms that are read will register
    /// the observer as a dependent.
    ///
    /// The context is automatically exited when the returned guard is
    /// dropped.
    pub fn enter(observer_id: ObserverId) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                observer_id,
                observed: SmallVec::new(),
            });
        });

        Self { observer_id }
    }

    /// Check if there is an active read context.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the id of the observer currently running, if any.
    pub fn current_observer() -> Option<ObserverId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.observer_id))
    }

    /// Record that the current observer read the given atom.
    ///
    /// Called by atoms when they are read inside an active context.
    pub fn track_atom(atom: Arc<Atom>) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                entry.observed.push(atom);
            }
        });
    }

    /// The atoms observed so far in the current context.
    pub fn observed_atoms() -> Vec<Arc<Atom>> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.observed.to_vec())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the right context. This helps catch bugs
            // where contexts are mismatched.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.observer_id, self.observer_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.observer_id, entry.observer_id
                );
            }
        });
    }
}
