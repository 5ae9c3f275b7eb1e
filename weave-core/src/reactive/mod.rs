//! Reactive Primitives
//!
//! This module implements the observation layer that the rest of the crate
//! is built on: atoms, the read context, the observer registry, derived
//! values, reactions, and the per-key tracking table.
//!
//! # Concepts
//!
//! ## Atoms
//!
//! An Atom is the minimal trackable unit. It holds no value; it stands for
//! a piece of state that observers may depend on. Reading it inside a
//! tracking context registers the current observer; reporting a change
//! notifies every registered observer.
//!
//! ## Derived values
//!
//! A Derived is a computation whose result is cached and invalidated based
//! on the atoms it read. Derived values are lazy; they recompute on the
//! next access after an invalidation.
//!
//! ## Reactions
//!
//! A Reaction is an eager subscriber that re-runs a side-effecting action
//! whenever an atom it read changes. Disposing a reaction detaches it from
//! everything it observes, which is what drives "became unobserved"
//! cleanup in the tracking tables.
//!
//! ## AtomMap
//!
//! An AtomMap lazily creates one atom per key of a dynamic, heterogeneous
//! key domain, with separate storage for by-value and by-identity keys.
//! Map-like containers use it to make key presence observable.
//!
//! # Implementation Notes
//!
//! The system uses a thread-local tracking context to automatically detect
//! dependencies. When an atom is read, we check if there is an active
//! tracking context and, if so, register the dependency.

mod atom;
mod atom_map;
mod context;
mod derived;
mod observer;
mod reaction;
mod runtime;

pub use atom::{Atom, LifecycleHook};
pub use atom_map::AtomMap;
pub use context::ReactiveContext;
pub use derived::{Derived, DerivedState, DirtyState};
pub use observer::ObserverId;
pub use reaction::{autorun, Disposer, Reaction};
pub use runtime::{Observer, ObserverHandle, Runtime};
