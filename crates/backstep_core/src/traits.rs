use nalgebra::{DMatrix, DVector};

use crate::error::SingularMatrix;
use crate::params::ProblemParameters;

/// Right-hand side f(t, u) of an ODE system du/dt = f(t, u).
///
/// The stepper evaluates `rhs` once per Newton residual and `neq + 1` times per
/// Jacobian build, possibly from several threads, so implementations must be
/// stateless.
pub trait OdeSystem: Sync {
    /// Evaluates the vector field.
    /// t: evaluation time
    /// u: state, `params.neq` entries
    /// out: buffer to write du/dt
    fn rhs(&self, t: f64, u: &[f64], params: &ProblemParameters, out: &mut [f64]);
}

impl<F> OdeSystem for F
where
    F: Fn(f64, &[f64], &ProblemParameters, &mut [f64]) + Sync,
{
    fn rhs(&self, t: f64, u: &[f64], params: &ProblemParameters, out: &mut [f64]) {
        self(t, u, params, out)
    }
}

/// Dense linear-solve backend used for the Newton correction.
pub trait LinearSolver {
    /// Solves `matrix * x = rhs` for a square `matrix`.
    ///
    /// Must fail rather than return garbage when `matrix` is singular to
    /// working precision.
    fn solve(
        &self,
        matrix: &DMatrix<f64>,
        rhs: &DVector<f64>,
    ) -> Result<DVector<f64>, SingularMatrix>;
}
