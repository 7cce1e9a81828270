use log::{debug, trace, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{Stage, StepError};
use crate::jacobian::newton_matrix;
use crate::linear::LuSolver;
use crate::params::ProblemParameters;
use crate::traits::{LinearSolver, OdeSystem};

/// Stopping rule for the Newton iteration of one implicit Euler step.
///
/// The step converges once ‖Δ‖∞ of a correction drops below `tolerance`. It
/// fails when more than `max_iterations` corrections have been applied
/// without converging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 10,
        }
    }
}

impl NewtonSettings {
    /// Tight tolerance with a generous iteration budget, for problems whose
    /// steps should be solved to round-off.
    pub fn strict() -> Self {
        Self {
            tolerance: 1e-14,
            max_iterations: 1000,
        }
    }

    pub fn validate(&self) -> Result<(), StepError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(StepError::InvalidSettings(format!(
                "tolerance must be positive (got {}).",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(StepError::InvalidSettings(
                "max_iterations must be greater than zero.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a converged implicit Euler step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Solution at `time`.
    pub state: Vec<f64>,
    pub time: f64,
    /// Newton iterations performed, including the converging one.
    pub iterations: usize,
    /// ‖Δ‖∞ of every correction, in order.
    pub correction_norms: Vec<f64>,
}

/// Writes g(u) = u − u_prev − dt·f(t, u) into `out`.
pub fn newton_residual<S>(
    system: &S,
    t: f64,
    previous: &[f64],
    iterate: &[f64],
    params: &ProblemParameters,
    out: &mut [f64],
) where
    S: OdeSystem + ?Sized,
{
    system.rhs(t, iterate, params, out);
    for k in 0..out.len() {
        out[k] = iterate[k] - previous[k] - params.dt * out[k];
    }
}

/// Advances `previous` from `time` to `time + params.dt` with one implicit
/// Euler step.
///
/// Every iteration rebuilds the finite-difference Newton matrix at the
/// current iterate and solves it with `solver`. A singular matrix or a
/// non-finite residual, matrix or correction aborts the step immediately.
pub fn advance<S, L>(
    system: &S,
    solver: &L,
    time: f64,
    previous: &[f64],
    params: &ProblemParameters,
    settings: NewtonSettings,
) -> Result<StepReport, StepError>
where
    S: OdeSystem + ?Sized,
    L: LinearSolver + ?Sized,
{
    params
        .validate()
        .map_err(|err| StepError::InvalidParameters(err.to_string()))
        .map_err(reject)?;
    settings.validate().map_err(reject)?;
    let dim = params.neq;
    if previous.len() != dim {
        return Err(reject(StepError::DimensionMismatch {
            expected: dim,
            actual: previous.len(),
        }));
    }

    let t_new = time + params.dt;
    let mut iterate = DVector::from_column_slice(previous);
    let mut residual = DVector::zeros(dim);
    let mut correction_norms = Vec::new();

    loop {
        let iteration = correction_norms.len();

        newton_residual(
            system,
            t_new,
            previous,
            iterate.as_slice(),
            params,
            residual.as_mut_slice(),
        );
        ensure_finite(residual.as_slice(), iteration, Stage::Residual)?;

        let matrix = newton_matrix(system, t_new, iterate.as_slice(), params);
        ensure_finite(matrix.as_slice(), iteration, Stage::Jacobian)?;

        let correction = solver
            .solve(&matrix, &residual)
            .map_err(|source| reject(StepError::SingularSystem { iteration, source }))?;
        ensure_finite(correction.as_slice(), iteration, Stage::Correction)?;

        iterate -= &correction;
        let correction_norm = correction.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        correction_norms.push(correction_norm);
        trace!("Newton iteration {iteration} at t = {t_new}: ‖Δ‖∞ = {correction_norm:e}");

        if correction_norm < settings.tolerance {
            debug!(
                "Implicit Euler step to t = {t_new} converged in {} iterations.",
                correction_norms.len()
            );
            return Ok(StepReport {
                state: iterate.iter().cloned().collect(),
                time: t_new,
                iterations: correction_norms.len(),
                correction_norms,
            });
        }

        if correction_norms.len() > settings.max_iterations {
            return Err(reject(StepError::NonConvergence {
                iterations: correction_norms.len(),
                correction_norm,
            }));
        }
    }
}

/// Implicit Euler stepper bundling Newton settings with a linear solver.
#[derive(Debug, Clone, Default)]
pub struct ImplicitEuler<L = LuSolver> {
    pub settings: NewtonSettings,
    pub solver: L,
}

impl ImplicitEuler<LuSolver> {
    pub fn new(settings: NewtonSettings) -> Self {
        Self {
            settings,
            solver: LuSolver::default(),
        }
    }
}

impl<L: LinearSolver> ImplicitEuler<L> {
    pub fn with_solver(settings: NewtonSettings, solver: L) -> Self {
        Self { settings, solver }
    }

    /// One step of size `params.dt` from `(time, state)`.
    pub fn step(
        &self,
        system: &impl OdeSystem,
        time: f64,
        state: &[f64],
        params: &ProblemParameters,
    ) -> Result<StepReport, StepError> {
        advance(system, &self.solver, time, state, params, self.settings)
    }
}

fn ensure_finite(values: &[f64], iteration: usize, stage: Stage) -> Result<(), StepError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(reject(StepError::NonFinite { iteration, stage }))
    }
}

fn reject(err: StepError) -> StepError {
    warn!("Implicit Euler step failed: {err}");
    err
}
