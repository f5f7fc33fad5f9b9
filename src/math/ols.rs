//! Ordinary least squares.
//!
//! Two entry points:
//!
//! - `solve_least_squares`: coefficients only (trend line, seasonal regressions)
//! - `ols_fit`: coefficients plus classical standard errors (ADF regression)
//!
//! We use SVD so tall design matrices are handled without forming normal
//! equations. (Nalgebra's `QR::solve` is intended for square systems and will
//! panic for non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// OLS estimate with residual variance and coefficient standard errors.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub beta: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Residual variance `SSE / (n - k)`.
    pub sigma2: f64,
    pub std_errors: DVector<f64>,
}

/// Fit `y = X β + e` and compute `se(β) = sqrt(σ² diag((X'X)^-1))`.
///
/// Returns `None` when there are no residual degrees of freedom or `X'X` is
/// singular.
pub fn ols_fit(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsFit> {
    let (n, k) = x.shape();
    if n <= k || y.len() != n {
        return None;
    }

    let beta = solve_least_squares(x, y)?;
    let residuals = y - x * &beta;
    let sse = residuals.dot(&residuals);
    let sigma2 = sse / (n - k) as f64;

    let xtx_inv = (x.transpose() * x).try_inverse()?;
    let mut std_errors = DVector::zeros(k);
    for j in 0..k {
        let v = sigma2 * xtx_inv[(j, j)];
        if !(v.is_finite() && v >= 0.0) {
            return None;
        }
        std_errors[j] = v.sqrt();
    }

    Some(OlsFit {
        beta,
        residuals,
        sigma2,
        std_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn ols_fit_matches_textbook_standard_errors() {
        // x = 1..5, y = [1, 3, 2, 5, 4]: slope 0.8, intercept 0.6, SSE 3.6.
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut data = Vec::new();
        for &v in &xs {
            data.push(1.0);
            data.push(v);
        }
        let x = DMatrix::from_row_slice(5, 2, &data);
        let y = DVector::from_row_slice(&[1.0, 3.0, 2.0, 5.0, 4.0]);

        let fit = ols_fit(&x, &y).unwrap();
        assert!((fit.beta[0] - 0.6).abs() < 1e-10);
        assert!((fit.beta[1] - 0.8).abs() < 1e-10);
        assert!((fit.sigma2 - 1.2).abs() < 1e-10);
        // se(slope) = sqrt(sigma2 / Sxx) = sqrt(1.2 / 10)
        assert!((fit.std_errors[1] - (0.12f64).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn ols_fit_rejects_singular_design() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert!(ols_fit(&x, &y).is_none());
    }
}
