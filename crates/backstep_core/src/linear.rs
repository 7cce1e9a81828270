use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::SingularMatrix;
use crate::traits::LinearSolver;

/// Dense LU solve with partial pivoting on the row-equilibrated system.
///
/// Every row of the matrix (and the matching right-hand side entry) is divided
/// by its largest absolute entry before factorising, so stiff but invertible
/// systems keep pivots of order one. A matrix is treated as singular when it
/// holds non-finite entries or a zero row, or when an LU pivot of the
/// equilibrated matrix is no larger than `pivot_tolerance`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LuSolver {
    pub pivot_tolerance: f64,
}

impl Default for LuSolver {
    fn default() -> Self {
        Self {
            pivot_tolerance: 1e-13,
        }
    }
}

impl LinearSolver for LuSolver {
    fn solve(
        &self,
        matrix: &DMatrix<f64>,
        rhs: &DVector<f64>,
    ) -> Result<DVector<f64>, SingularMatrix> {
        debug_assert!(matrix.is_square());
        debug_assert_eq!(matrix.nrows(), rhs.len());

        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(SingularMatrix { min_pivot: 0.0 });
        }

        let mut scaled = matrix.clone();
        let mut scaled_rhs = rhs.clone();
        for i in 0..scaled.nrows() {
            let row_max = scaled.row(i).iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            if row_max == 0.0 {
                return Err(SingularMatrix { min_pivot: 0.0 });
            }
            scaled.row_mut(i).scale_mut(1.0 / row_max);
            scaled_rhs[i] /= row_max;
        }

        let lu = scaled.lu();
        let min_pivot = lu
            .u()
            .diagonal()
            .iter()
            .fold(f64::INFINITY, |acc, p| acc.min(p.abs()));
        if min_pivot <= self.pivot_tolerance {
            return Err(SingularMatrix { min_pivot });
        }

        lu.solve(&scaled_rhs).ok_or(SingularMatrix { min_pivot })
    }
}

#[cfg(test)]
mod tests {
    use super::LuSolver;
    use crate::traits::LinearSolver;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn solves_row_major_system() {
        let matrix = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0]);
        let expected = DVector::from_column_slice(&[1.0, -2.0, 0.5]);
        let rhs = &matrix * &expected;

        let solution = LuSolver::default()
            .solve(&matrix, &rhs)
            .expect("matrix is well conditioned");
        for i in 0..3 {
            assert!((solution[i] - expected[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_rank_deficient_matrix() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let rhs = DVector::from_column_slice(&[1.0, 1.0]);
        let err = LuSolver::default()
            .solve(&matrix, &rhs)
            .expect_err("rank-deficient matrix must be rejected");
        assert!(err.min_pivot <= 1e-13);
    }

    #[test]
    fn solves_badly_scaled_diagonal_system() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1e14 + 1.0, 0.0, 0.0, 1.0]);
        let rhs = DVector::from_column_slice(&[1e14, 2.0]);
        let solution = LuSolver::default()
            .solve(&matrix, &rhs)
            .expect("stiff diagonal matrix is invertible");
        assert!((solution[0] - 1e14 / (1e14 + 1.0)).abs() < 1e-15);
        assert_eq!(solution[1], 2.0);
    }

    #[test]
    fn row_scaling_keeps_mixed_magnitude_rows_solvable() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1e12, 2e12, 1e-3, 3e-3]);
        let expected = DVector::from_column_slice(&[1.0, -1.0]);
        let rhs = &matrix * &expected;
        let solution = LuSolver::default()
            .solve(&matrix, &rhs)
            .expect("rows are independent");
        for i in 0..2 {
            assert!((solution[i] - expected[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_zero_and_non_finite_matrices() {
        let rhs = DVector::from_column_slice(&[1.0, 1.0]);
        let solver = LuSolver::default();
        assert!(solver.solve(&DMatrix::zeros(2, 2), &rhs).is_err());

        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, 0.0, 1.0]);
        assert!(solver.solve(&matrix, &rhs).is_err());
    }
}
