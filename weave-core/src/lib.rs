//! Weave Core
//!
//! This crate provides the observation and introspection core of the Weave
//! reactive state framework. It implements:
//!
//! - Trackable units (atoms) with an observed/unobserved lifecycle
//! - Automatic dependency tracking via a thread-local read context
//! - Derived values and reactions built on that tracking
//! - A lazy per-key tracking table with memory-safe storage for
//!   identity-keyed entries
//! - A resolution protocol that locates the exact atom (or owning
//!   administration record) behind any trackable value or member
//!
//! # Architecture
//!
//! The crate is organized into three modules:
//!
//! - `reactive`: atoms, the read context, the observer registry, derived
//!   values, reactions, and the per-key tracking table
//! - `containers`: minimal observable containers (list, set, map, object)
//!   owning the administration records the resolver dispatches on
//! - `introspect`: the resolution protocol and its failure taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use weave_core::containers::ObservableMap;
//! use weave_core::introspect::{get_atom, Observable};
//! use weave_core::reactive::autorun;
//! use weave_core::value::Value;
//!
//! let settings = ObservableMap::named("settings");
//!
//! // Observe a key that does not exist yet.
//! let watched = settings.clone();
//! let disposer = autorun(move || {
//!     if watched.has(&Value::from("volume")) {
//!         println!("volume is configured");
//!     }
//! });
//!
//! // The insert re-runs the subscriber above.
//! settings.insert(Value::from("volume"), Value::from(7i64));
//!
//! // Diagnostics can resolve the exact atom behind the entry.
//! let atom = get_atom(&Observable::Map(settings), Some(&Value::from("volume")));
//!
//! disposer.dispose();
//! ```

pub mod containers;
pub mod introspect;
pub mod reactive;
pub mod value;

pub use containers::{ObservableList, ObservableMap, ObservableObject, ObservableSet};
pub use introspect::{
    get_administration, get_atom, get_debug_name, set_verbose_diagnostics, Administration,
    DepNode, Observable, ResolveError,
};
pub use reactive::{autorun, Atom, AtomMap, Derived, Disposer, Reaction, ReactiveContext, Runtime};
pub use value::Value;
