//! Observer identity.
//!
//! An observer is any computation that depends on trackable state: a derived
//! value, a reaction, or an embedder-provided subscriber. Observers are
//! identified by process-unique ids so atoms can hold them in plain sets
//! without owning the computations themselves.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an observer.
///
/// Each observer (derived value, reaction, or other computation) gets a
/// unique ID when created. The ID is what atoms record in their observer
/// sets and what the registry resolves back to a live handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}
