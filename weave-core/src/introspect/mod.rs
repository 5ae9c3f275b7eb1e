//! Introspection
//!
//! The resolution protocol and its failure taxonomy: given an arbitrary
//! trackable value, locate the atom or administration record responsible
//! for it (or for one member of it), and derive diagnostic names.

mod error;
mod resolve;

pub use error::{set_verbose_diagnostics, verbose_diagnostics, ResolveError};
pub use resolve::{get_administration, get_atom, get_debug_name, Administration, DepNode, Observable};
