//! Failure taxonomy of an implicit Euler step.

use std::fmt;

use thiserror::Error;

/// Reported by a [`LinearSolver`](crate::traits::LinearSolver) when the
/// matrix cannot be inverted to working precision.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("matrix is singular to working precision (min |pivot| = {min_pivot:e})")]
pub struct SingularMatrix {
    /// Smallest pivot magnitude found, relative to the solver's scaling.
    pub min_pivot: f64,
}

/// Quantity in which non-finite values were detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Residual,
    Jacobian,
    Correction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Residual => "Newton residual",
            Stage::Jacobian => "Newton iteration matrix",
            Stage::Correction => "Newton correction",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("State dimension mismatch. Expected {expected}, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid problem parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid Newton settings: {0}")]
    InvalidSettings(String),

    #[error("Newton solver failed to converge in {iterations} iterations (‖Δ‖∞ = {correction_norm:e}).")]
    NonConvergence {
        iterations: usize,
        correction_norm: f64,
    },

    #[error("Singular Newton iteration matrix at iteration {iteration}.")]
    SingularSystem {
        iteration: usize,
        #[source]
        source: SingularMatrix,
    },

    #[error("Non-finite values in the {stage} at iteration {iteration}.")]
    NonFinite { iteration: usize, stage: Stage },
}

impl StepError {
    /// Whether retrying the step with a smaller dt may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StepError::NonConvergence { .. } | StepError::NonFinite { .. }
        )
    }
}
