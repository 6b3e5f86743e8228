//! # Error Module - Custom *Lazyexpr* Error Type
//!
//! Defines the unified error type for the expression engine.
//!
//! ## Features
//! - Separates definition-time failures (the expression can never be built
//! with these operands) from access-time failures (a particular offset, step
//! or borrow was invalid when the expression was evaluated).
//! - Implements `Display` for readable output and `Error` for integration
//! with standard Rust error handling.

use std::error::Error;
use std::fmt;

/// Broad class of a [`LazyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Raised while building an expression. No expression object exists.
    Definition,
    /// Raised while indexing or evaluating an existing expression.
    Access,
    /// Raised by the user's operation itself.
    Kernel,
}

/// Why a set of operands cannot form an expression with an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Incompatibility {
    Arity {
        expected: usize,
        found: usize,
    },
    /// The operand has fewer dimensions than the operation expects.
    RankDeficit {
        operand: usize,
        expected: i32,
        found: i32,
    },
    /// No adaptation rule turns the operand's element into the parameter type.
    Adaptation {
        operand: usize,
        from: String,
        to: String,
    },
    /// Axis sizes are neither equal nor 1.
    Broadcast {
        operand: usize,
        axis: usize,
        expected: usize,
        found: usize,
    },
    /// Inner axis sizes differ between siblings of a nested container.
    Ragged {
        operand: usize,
        axis: usize,
        expected: usize,
        found: usize,
    },
    /// The operand keeps unconsumed axes after every broadcast level,
    /// e.g. the receiver of a bound call carrying extra dimensions.
    Unreduced {
        operand: usize,
        remaining: usize,
    },
}

/// Catch all error type for `Lazyexpr`
#[derive(Debug, Clone, PartialEq)]
pub enum LazyError {
    IncompatibleExpression(Incompatibility),
    OutOfBounds {
        axis: usize,
        index: usize,
        size: usize,
    },
    StepMismatch {
        step: usize,
        size: usize,
    },
    RankMismatch {
        expected: &'static str,
        found: usize,
    },
    OffsetCount {
        expected: usize,
        found: usize,
    },
    Adaptation {
        from: String,
        to: String,
    },
    Conversion {
        value: String,
        target: String,
    },
    TypeError {
        expected: String,
        found: String,
    },
    ReadOnly,
    BorrowConflict,
    Kernel {
        message: String,
    },
}

impl LazyError {
    /// Shorthand for errors raised from inside user operations.
    pub fn kernel(message: impl Into<String>) -> Self {
        LazyError::Kernel {
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            LazyError::IncompatibleExpression(_) => ErrorClass::Definition,
            LazyError::Kernel { .. } => ErrorClass::Kernel,
            _ => ErrorClass::Access,
        }
    }

    pub fn is_incompatible(&self) -> bool {
        matches!(self, LazyError::IncompatibleExpression(_))
    }
}

impl From<Incompatibility> for LazyError {
    fn from(reason: Incompatibility) -> Self {
        LazyError::IncompatibleExpression(reason)
    }
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Incompatibility::Arity { expected, found } => {
                write!(f, "operation takes {} operands, {} were given", expected, found)
            }
            Incompatibility::RankDeficit { operand, expected, found } => write!(
                f,
                "operand {} has rank {} but the operation expects at least {}",
                operand, found, expected
            ),
            Incompatibility::Adaptation { operand, from, to } => write!(
                f,
                "operand {} of type '{}' cannot be adapted to parameter type '{}'",
                operand, from, to
            ),
            Incompatibility::Broadcast { operand, axis, expected, found } => write!(
                f,
                "operand {} has size {} on axis {}, expected 1 or {}",
                operand, found, axis, expected
            ),
            Incompatibility::Ragged { operand, axis, expected, found } => write!(
                f,
                "operand {} is ragged: axis {} has sizes {} and {}",
                operand, axis, expected, found
            ),
            Incompatibility::Unreduced { operand, remaining } => write!(
                f,
                "operand {} keeps {} axes that no broadcast level consumes",
                operand, remaining
            ),
        }
    }
}

impl fmt::Display for LazyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LazyError::IncompatibleExpression(reason) => {
                write!(f, "Incompatible expression: {}.", reason)
            }
            LazyError::OutOfBounds { axis, index, size } => {
                write!(f, "Out of bounds: index {} on axis {} of size {}.", index, axis, size)
            }
            LazyError::StepMismatch { step, size } => write!(
                f,
                "Step mismatch: step {} does not evenly divide the innermost axis of size {}.",
                step, size
            ),
            LazyError::RankMismatch { expected, found } => {
                write!(f, "Rank mismatch: expected rank {}, expression has rank {}.", expected, found)
            }
            LazyError::OffsetCount { expected, found } => {
                write!(f, "Offset count mismatch: expected {} offsets, found {}.", expected, found)
            }
            LazyError::Adaptation { from, to } => {
                write!(f, "Adaptation error: cannot adapt '{}' to '{}'.", from, to)
            }
            LazyError::Conversion { value, target } => {
                write!(f, "Conversion error: value '{}' cannot be represented as '{}'.", value, target)
            }
            LazyError::TypeError { expected, found } => {
                write!(f, "Type error: expected '{}', found '{}'.", expected, found)
            }
            LazyError::ReadOnly => write!(f, "Write through a read-only reference."),
            LazyError::BorrowConflict => {
                write!(f, "Shared storage is already borrowed for writing.")
            }
            LazyError::Kernel { message } => write!(f, "Operation failed: {}", message),
        }
    }
}

impl Error for LazyError {}
