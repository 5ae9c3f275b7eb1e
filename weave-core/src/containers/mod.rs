//! Observable Containers
//!
//! Minimal container variants over the dynamic [`Value`](crate::value::Value)
//! domain, each owning the administration shape the resolver dispatches on:
//!
//! - [`ObservableList`]: one structural atom for the whole list; no
//!   per-index tracking.
//! - [`ObservableSet`]: one atom; the set has no addressable sub-key.
//! - [`ObservableMap`]: a keys atom, one value atom per present entry, and
//!   a per-key presence table for absent-key observation.
//! - [`ObservableObject`]: named members with lazily materialized member
//!   atoms.

mod list;
mod map;
mod object;
mod set;

pub use list::{ListAdmin, ObservableList};
pub use map::ObservableMap;
pub use object::{ObjectAdmin, ObservableObject};
pub use set::ObservableSet;
