//! # Validation Module
//!
//! Governs what happens when a caller breaks a precondition, such as indexing
//! past an axis or stepping by a value that does not divide the innermost
//! extent.
//!
//! The process-wide default is taken from Cargo features:
//! - `unchecked` disables the checks;
//! - `terminate_on_violation` logs and aborts;
//! - otherwise violations come back as `Err`.
//!
//! It can be changed at runtime with [`set_validation_mode`] and overridden per
//! expression with `Expression::with_validation`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::error;

use crate::enums::error::LazyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValidationMode {
    /// Report a violation as `Err`.
    Recoverable = 0,
    /// Log the violation and abort the process.
    Terminate = 1,
    /// Skip the check.
    Disabled = 2,
}

const fn default_mode() -> ValidationMode {
    if cfg!(feature = "unchecked") {
        ValidationMode::Disabled
    } else if cfg!(feature = "terminate_on_violation") {
        ValidationMode::Terminate
    } else {
        ValidationMode::Recoverable
    }
}

static MODE: AtomicU8 = AtomicU8::new(default_mode() as u8);

impl ValidationMode {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ValidationMode::Terminate,
            2 => ValidationMode::Disabled,
            _ => ValidationMode::Recoverable,
        }
    }

    /// Applies the mode to a precondition.
    ///
    /// `violation` is only built when `holds` is false.
    pub fn check(
        self,
        holds: bool,
        violation: impl FnOnce() -> LazyError,
    ) -> Result<(), LazyError> {
        if holds {
            return Ok(());
        }
        match self {
            ValidationMode::Recoverable => Err(violation()),
            ValidationMode::Disabled => Ok(()),
            ValidationMode::Terminate => {
                let e = violation();
                error!(error = %e, "precondition violated, aborting");
                std::process::abort()
            }
        }
    }
}

impl Default for ValidationMode {
    fn default() -> Self {
        default_mode()
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationMode::Recoverable => "recoverable",
            ValidationMode::Terminate => "terminate",
            ValidationMode::Disabled => "disabled",
        })
    }
}

/// Sets the process-wide mode.
pub fn set_validation_mode(mode: ValidationMode) {
    MODE.store(mode as u8, Ordering::Relaxed);
}

/// Current process-wide mode.
pub fn validation_mode() -> ValidationMode {
    ValidationMode::from_u8(MODE.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_builds_error_lazily() {
        let mut built = false;
        let ok = ValidationMode::Recoverable.check(true, || {
            built = true;
            LazyError::ReadOnly
        });
        assert!(ok.is_ok());
        assert!(!built);
        assert_eq!(
            ValidationMode::Recoverable.check(false, || LazyError::ReadOnly),
            Err(LazyError::ReadOnly)
        );
    }

    #[test]
    fn test_disabled_passes() {
        assert!(ValidationMode::Disabled.check(false, || LazyError::ReadOnly).is_ok());
    }


    #[cfg(not(any(feature = "unchecked", feature = "terminate_on_violation")))]
    #[test]
    fn test_default_is_recoverable() {
        assert_eq!(ValidationMode::default(), ValidationMode::Recoverable);
    }
}
