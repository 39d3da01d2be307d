//! Small dense linear solves
//!
//! Sized for regression problems with a handful of columns; rows are
//! stored as `Vec<f64>` and solved through the normal equations.

use crate::{MathError, Result};

/// Solve `a * x = b` by Gaussian elimination with partial pivoting
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {}x{} system",
            n, n
        )));
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(MathError::CalculationError(
                "Singular system in linear solve".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

/// Ordinary least squares `min |X beta - y|^2` with an optional ridge term
pub fn least_squares(rows: &[Vec<f64>], targets: &[f64], ridge: f64) -> Result<Vec<f64>> {
    if rows.is_empty() || rows.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Least squares needs matching non-empty rows and targets ({} vs {})",
            rows.len(),
            targets.len()
        )));
    }

    let width = rows[0].len();
    if rows.iter().any(|r| r.len() != width) {
        return Err(MathError::InvalidInput(
            "All design rows must have the same width".to_string(),
        ));
    }
    if rows.len() < width {
        return Err(MathError::InsufficientData(format!(
            "{} rows cannot determine {} coefficients",
            rows.len(),
            width
        )));
    }

    let mut xtx = vec![vec![0.0; width]; width];
    let mut xty = vec![0.0; width];
    for (row, &y) in rows.iter().zip(targets) {
        for i in 0..width {
            xty[i] += row[i] * y;
            for j in 0..width {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, diag) in xtx.iter_mut().enumerate() {
        diag[i] += ridge;
    }

    solve(xtx, xty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_solve_two_by_two() {
        let x = solve(vec![vec![2.0, 1.0], vec![1.0, 3.0]], vec![3.0, 5.0]).unwrap();
        assert_abs_diff_eq!(x[0], 0.8, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], 1.4, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_system_is_error() {
        let result = solve(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]);
        assert!(matches!(result, Err(MathError::CalculationError(_))));
    }

    #[test]
    fn test_least_squares_recovers_line() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|i| 2.0 + 0.5 * i as f64).collect();
        let beta = least_squares(&rows, &targets, 0.0).unwrap();
        assert_abs_diff_eq!(beta[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(beta[1], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_least_squares_shape_checks() {
        assert!(least_squares(&[], &[], 0.0).is_err());
        assert!(least_squares(&[vec![1.0, 2.0]], &[1.0], 0.0).is_err());
    }
}
