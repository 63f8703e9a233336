use std::{error::Error, fmt};

use crate::optimizer::Phase;

/// The optimizer crate's result type.
pub type Result<T> = std::result::Result<T, OptimError>;

/// Precondition violations surfaced by the two-phase optimizer.
///
/// Every variant is detected before any parameter is touched, so a failed
/// call leaves values, gradients, rule state and the cache exactly as they
/// were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimError {
    /// A phase method was called out of alternation order.
    InvalidPhase {
        /// The method that was called.
        op: &'static str,
        /// The phase the optimizer was actually in.
        phase: Phase,
    },
    /// A tracked parameter had no gradient when one was required.
    MissingGradient { param: usize },
    /// A gradient's length differs from its parameter's.
    ShapeMismatch {
        param: usize,
        got: usize,
        expected: usize,
    },
    /// The parameter set passed in is not the set the optimizer was built
    /// over (tracked identities must stay stable across calls).
    ParamCountMismatch { got: usize, expected: usize },
    /// A construction-time hyperparameter was outside its valid range.
    InvalidHyper(&'static str),
    /// A checkpoint does not fit the parameter set it is restored against.
    CheckpointMismatch {
        /// What failed to line up (e.g. "parameter count").
        what: &'static str,
        got: usize,
        expected: usize,
    },
}

impl fmt::Display for OptimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimError::InvalidPhase { op, phase } => {
                write!(f, "{op}() called while optimizer is {}", phase.name())
            }
            OptimError::MissingGradient { param } => {
                write!(f, "no gradient set for parameter {param}")
            }
            OptimError::ShapeMismatch {
                param,
                got,
                expected,
            } => write!(
                f,
                "gradient length mismatch for parameter {param}: got {got}, expected {expected}"
            ),
            OptimError::ParamCountMismatch { got, expected } => {
                write!(
                    f,
                    "tracked parameter count changed: got {got}, expected {expected}"
                )
            }
            OptimError::InvalidHyper(msg) => write!(f, "invalid hyperparameter: {msg}"),
            OptimError::CheckpointMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "checkpoint {what} mismatch: got {got}, expected {expected}"
            ),
        }
    }
}

impl Error for OptimError {}
