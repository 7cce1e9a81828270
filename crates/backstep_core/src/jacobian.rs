//! Finite-difference approximation of the Newton iteration matrix.
//!
//! Matrices are `nalgebra::DMatrix<f64>` (column-major storage) with entry
//! `(j, i)` holding the derivative of component `j` with respect to `u[i]`.
//! [`LinearSolver`](crate::traits::LinearSolver) backends consume the same
//! type, so no layout conversion happens between the two.

use nalgebra::DMatrix;

use crate::params::ProblemParameters;
use crate::traits::OdeSystem;

/// Forward-difference perturbation applied to each state coordinate.
pub const FD_PERTURBATION: f64 = 1e-5;

/// Approximates ∂f/∂u at `(t, u)` with forward differences.
///
/// The unperturbed right-hand side is evaluated once and shared by every
/// column, so a build costs `u.len() + 1` evaluations.
pub fn rhs_jacobian<S>(system: &S, t: f64, u: &[f64], params: &ProblemParameters) -> DMatrix<f64>
where
    S: OdeSystem + ?Sized,
{
    let dim = u.len();
    let mut base = vec![0.0; dim];
    system.rhs(t, u, params, &mut base);

    let mut jacobian = DMatrix::zeros(dim, dim);
    if dim == 0 {
        return jacobian;
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        jacobian
            .as_mut_slice()
            .par_chunks_mut(dim)
            .enumerate()
            .for_each_init(
                || (u.to_vec(), vec![0.0; dim]),
                |(perturbed, shifted), (i, column)| {
                    fill_column(system, t, u, params, &base, i, perturbed, shifted, column)
                },
            );
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut perturbed = u.to_vec();
        let mut shifted = vec![0.0; dim];
        for (i, column) in jacobian.as_mut_slice().chunks_mut(dim).enumerate() {
            fill_column(system, t, u, params, &base, i, &mut perturbed, &mut shifted, column);
        }
    }

    jacobian
}

/// Builds M = I − dt·∂f/∂u, the matrix of the implicit Euler Newton system.
pub fn newton_matrix<S>(system: &S, t: f64, u: &[f64], params: &ProblemParameters) -> DMatrix<f64>
where
    S: OdeSystem + ?Sized,
{
    let mut matrix = rhs_jacobian(system, t, u, params);
    matrix *= -params.dt;
    for i in 0..matrix.nrows() {
        matrix[(i, i)] += 1.0;
    }
    matrix
}

// `perturbed` must equal `u` on entry and is restored before returning.
#[allow(clippy::too_many_arguments)]
fn fill_column<S>(
    system: &S,
    t: f64,
    u: &[f64],
    params: &ProblemParameters,
    base: &[f64],
    i: usize,
    perturbed: &mut [f64],
    shifted: &mut [f64],
    column: &mut [f64],
) where
    S: OdeSystem + ?Sized,
{
    perturbed[i] = u[i] + FD_PERTURBATION;
    system.rhs(t, perturbed, params, shifted);
    perturbed[i] = u[i];

    for j in 0..column.len() {
        column[j] = (shifted[j] - base[j]) / FD_PERTURBATION;
    }
}

#[cfg(test)]
mod tests {
    use super::{newton_matrix, rhs_jacobian};
    use crate::params::ProblemParameters;
    use nalgebra::DMatrix;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const A: [f64; 9] = [2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.5, -1.0, 3.0];

    fn linear_decay(_t: f64, u: &[f64], _params: &ProblemParameters, out: &mut [f64]) {
        let a = DMatrix::from_row_slice(3, 3, &A);
        for j in 0..3 {
            out[j] = -(0..3).map(|k| a[(j, k)] * u[k]).sum::<f64>();
        }
    }

    #[test]
    fn newton_matrix_matches_analytic_for_linear_rhs() {
        let params = ProblemParameters::with_dt(3, 10, 0.0, 1.0, 0.1).expect("valid parameters");
        let u = [0.3, -1.2, 2.5];
        let matrix = newton_matrix(&linear_decay, 0.1, &u, &params);

        let a = DMatrix::from_row_slice(3, 3, &A);
        let expected = DMatrix::<f64>::identity(3, 3) + a * params.dt;
        for j in 0..3 {
            for i in 0..3 {
                assert!(
                    (matrix[(j, i)] - expected[(j, i)]).abs() < 1e-8,
                    "entry ({j}, {i}): {} vs {}",
                    matrix[(j, i)],
                    expected[(j, i)]
                );
            }
        }
    }

    #[test]
    fn forward_difference_error_is_first_order() {
        // f(u) = -u^2 has f'' = -2, so the forward difference is off by about d.
        let params = ProblemParameters::with_dt(1, 1, 0.0, 1.0, 1.0).expect("valid parameters");
        let square = |_t: f64, u: &[f64], _p: &ProblemParameters, out: &mut [f64]| {
            out[0] = -u[0] * u[0];
        };
        let jacobian = rhs_jacobian(&square, 0.0, &[1.5], &params);
        let error = (jacobian[(0, 0)] - (-3.0)).abs();
        assert!(error < 2.0 * super::FD_PERTURBATION);
        assert!(error > 0.1 * super::FD_PERTURBATION);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_columns_match_sequential_loop() {
        use crate::systems::Brusselator;
        use crate::traits::OdeSystem;

        let system = Brusselator::default();
        let params = ProblemParameters::new(24, 100, 0.0, 1.0).expect("valid parameters");
        let u = system.initial_condition(&params).expect("valid grid");
        let t = 0.01;
        let dim = u.len();

        let mut base = vec![0.0; dim];
        system.rhs(t, &u, &params, &mut base);
        let mut expected = DMatrix::zeros(dim, dim);
        let mut shifted = vec![0.0; dim];
        for i in 0..dim {
            let mut perturbed = u.clone();
            perturbed[i] = u[i] + super::FD_PERTURBATION;
            system.rhs(t, &perturbed, &params, &mut shifted);
            for j in 0..dim {
                expected[(j, i)] = (shifted[j] - base[j]) / super::FD_PERTURBATION;
            }
        }

        let jacobian = rhs_jacobian(&system, t, &u, &params);
        for (parallel, sequential) in jacobian.iter().zip(expected.iter()) {
            assert_eq!(parallel.to_bits(), sequential.to_bits());
        }
    }

    #[test]
    fn jacobian_build_reuses_base_evaluation() {
        let calls = AtomicUsize::new(0);
        let counting = |_t: f64, u: &[f64], _p: &ProblemParameters, out: &mut [f64]| {
            calls.fetch_add(1, Ordering::SeqCst);
            out.copy_from_slice(u);
        };
        let params = ProblemParameters::with_dt(4, 1, 0.0, 1.0, 0.5).expect("valid parameters");
        let u = [1.0, 2.0, 3.0, 4.0];
        let matrix = newton_matrix(&counting, 0.0, &u, &params);

        assert_eq!(calls.load(Ordering::SeqCst), u.len() + 1);
        for j in 0..4 {
            for i in 0..4 {
                let expected = if i == j { 0.5 } else { 0.0 };
                assert!((matrix[(j, i)] - expected).abs() < 1e-9);
            }
        }
    }
}
