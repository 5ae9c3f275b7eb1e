//! Resolution Failures
//!
//! Every failure in the resolution protocol is a programmer error: it is
//! raised eagerly at the point of detection and never retried. The *detail*
//! strings carried in the errors (container names, keys, value
//! descriptions) are built only while verbose diagnostics are enabled;
//! the failure itself occurs unconditionally.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Whether failure messages carry full diagnostic detail.
///
/// On by default. Production embedders flip it off once at startup to skip
/// message construction on hot failure paths.
static VERBOSE_DIAGNOSTICS: AtomicBool = AtomicBool::new(true);

/// Enable or disable diagnostic detail in failure messages.
pub fn set_verbose_diagnostics(enabled: bool) {
    VERBOSE_DIAGNOSTICS.store(enabled, Ordering::Relaxed);
}

/// Whether diagnostic detail is currently enabled.
pub fn verbose_diagnostics() -> bool {
    VERBOSE_DIAGNOSTICS.load(Ordering::Relaxed)
}

/// Build a detail string only when verbose diagnostics are enabled.
pub(crate) fn describe<F>(build: F) -> String
where
    F: FnOnce() -> String,
{
    if verbose_diagnostics() {
        build()
    } else {
        String::new()
    }
}

/// Serializes tests that toggle or depend on the diagnostics switch, since
/// the switch is process-global.
#[cfg(test)]
pub(crate) static DIAGNOSTICS_TEST_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// A failure of the resolution protocol.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Null where a container was required.
    #[error("expected an observable value")]
    InvalidArgument,

    /// Object-like resolution requires a member name.
    #[error("a member name is required to resolve a property of '{container}'")]
    MissingProperty {
        /// Diagnostic name of the container (empty when diagnostics are
        /// off).
        container: String,
    },

    /// The request shape is structurally meaningless, e.g. member-level
    /// tracking on a list.
    #[error("it is not possible to obtain member atoms from the list '{container}'")]
    UnsupportedOperation {
        /// Diagnostic name of the container (empty when diagnostics are
        /// off).
        container: String,
    },

    /// The named member or key does not exist on the target.
    #[error("the entry '{key}' does not exist in the observable container '{container}'")]
    EntryNotFound {
        /// Diagnostic name of the container (empty when diagnostics are
        /// off).
        container: String,
        /// The requested key (empty when diagnostics are off).
        key: String,
    },

    /// The target value is not a trackable shape at all.
    #[error("cannot obtain an atom from {value}")]
    NotObservable {
        /// Description of the offending value (empty when diagnostics are
        /// off).
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_builds_detail_only_when_enabled() {
        let _guard = DIAGNOSTICS_TEST_GUARD.lock().expect("guard poisoned");

        assert!(verbose_diagnostics());
        assert_eq!(describe(|| "detail".to_string()), "detail");

        set_verbose_diagnostics(false);
        assert_eq!(describe(|| "detail".to_string()), "");

        set_verbose_diagnostics(true);
        assert_eq!(describe(|| "detail".to_string()), "detail");
    }

    #[test]
    fn messages_name_container_and_key() {
        let err = ResolveError::EntryNotFound {
            container: "settings".to_string(),
            key: "volume".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("settings"));
        assert!(message.contains("volume"));
    }
}
