//! Nonlinear least squares.
//!
//! A scalar Levenberg–Marquardt solver for small parameter vectors: minimize
//! `||f(x)||²` for a residual function `f: Rⁿ → Rᵐ`, with a [`curve_fit`]
//! wrapper that builds the residuals from a model closure and data arrays.
//! The Jacobian is approximated by forward finite differences and the damped
//! normal equations are solved by Gaussian elimination with partial
//! pivoting.
//!
//! LM interpolates between Gauss–Newton and gradient descent, which makes it
//! robust on the shallow exponential-decay surfaces the depth fitter
//! produces.

use crate::error::{Error, Result};

const SINGULAR_THRESHOLD: f64 = 1e-14;
const ZERO_THRESHOLD: f64 = 1e-10;

/// Options for the Levenberg–Marquardt solver.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Tolerance for convergence (cost).
    pub f_tol: f64,
    /// Tolerance for convergence (change in parameters).
    pub x_tol: f64,
    /// Tolerance for convergence (gradient norm).
    pub g_tol: f64,
    /// Step size for the finite difference Jacobian.
    pub eps: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            f_tol: 1e-8,
            x_tol: 1e-8,
            g_tol: 1e-8,
            eps: 1e-8,
        }
    }
}

/// Result from the Levenberg–Marquardt solver.
#[derive(Debug, Clone)]
pub struct FitReport {
    /// The optimal parameters found.
    pub params: Vec<f64>,
    /// Residual vector at the solution.
    pub residuals: Vec<f64>,
    /// Sum of squared residuals.
    pub cost: f64,
    /// Number of iterations spent.
    pub iterations: usize,
    /// Whether the solver converged.
    pub converged: bool,
}

#[inline]
fn norm(v: &[f64]) -> f64 {
    norm_squared(v).sqrt()
}

#[inline]
fn norm_squared(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Levenberg–Marquardt for nonlinear least squares.
pub fn leastsq<F>(f: F, x0: &[f64], options: &FitOptions) -> Result<FitReport>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = x0.len();
    if n == 0 {
        return Err(Error::EmptyInput);
    }

    let mut x = x0.to_vec();
    let mut fx = f(&x);
    let m = fx.len();
    if m == 0 {
        return Err(Error::EmptyInput);
    }

    let mut cost = norm_squared(&fx);
    let mut lambda = 0.001;
    let lambda_up = 10.0;
    let lambda_down = 0.1;

    for iter in 0..options.max_iter {
        if cost < options.f_tol {
            return Ok(FitReport {
                params: x,
                residuals: fx,
                cost,
                iterations: iter + 1,
                converged: true,
            });
        }

        let jacobian = finite_difference_jacobian(&f, &x, &fx, options.eps);

        // J^T J with LM damping on the diagonal.
        let mut jtj = vec![vec![0.0; n]; n];
        for jac_row in &jacobian {
            for i in 0..n {
                for j in 0..n {
                    jtj[i][j] += jac_row[i] * jac_row[j];
                }
            }
        }
        for (i, row) in jtj.iter_mut().enumerate() {
            row[i] *= 1.0 + lambda;
            if row[i] < ZERO_THRESHOLD {
                row[i] = ZERO_THRESHOLD;
            }
        }

        // J^T f
        let mut jtf = vec![0.0; n];
        for (k, jac_row) in jacobian.iter().enumerate() {
            for i in 0..n {
                jtf[i] += jac_row[i] * fx[k];
            }
        }

        if norm(&jtf) < options.g_tol {
            return Ok(FitReport {
                params: x,
                residuals: fx,
                cost,
                iterations: iter + 1,
                converged: true,
            });
        }

        // Solve (J^T J + lambda * D) dx = -J^T f
        let neg_jtf: Vec<f64> = jtf.iter().map(|v| -v).collect();
        let dx = match solve_linear_system(&jtj, &neg_jtf) {
            Some(dx) => dx,
            None => {
                lambda *= lambda_up;
                continue;
            }
        };

        let x_new: Vec<f64> = x.iter().zip(dx.iter()).map(|(a, b)| a + b).collect();
        let fx_new = f(&x_new);
        let cost_new = norm_squared(&fx_new);

        if cost_new < cost {
            if norm(&dx) < options.x_tol {
                return Ok(FitReport {
                    params: x_new,
                    residuals: fx_new,
                    cost: cost_new,
                    iterations: iter + 1,
                    converged: true,
                });
            }
            x = x_new;
            fx = fx_new;
            cost = cost_new;
            lambda *= lambda_down;
        } else {
            lambda *= lambda_up;
        }

        lambda = lambda.clamp(ZERO_THRESHOLD, 1e10);
    }

    Ok(FitReport {
        params: x,
        residuals: fx,
        cost,
        iterations: options.max_iter,
        converged: false,
    })
}

/// Fit a model function to data using nonlinear least squares.
///
/// `model(x, params)` evaluates the model at one data point; residuals are
/// `model(x_i, p) - y_i`.
pub fn curve_fit<F>(
    model: F,
    x_data: &[f64],
    y_data: &[f64],
    p0: &[f64],
    options: &FitOptions,
) -> Result<FitReport>
where
    F: Fn(f64, &[f64]) -> f64,
{
    if x_data.len() != y_data.len() {
        return Err(Error::LengthMismatch {
            name: "y_data",
            expected: x_data.len(),
            found: y_data.len(),
        });
    }
    if x_data.is_empty() {
        return Err(Error::EmptyInput);
    }

    let residual_fn = |params: &[f64]| -> Vec<f64> {
        x_data
            .iter()
            .zip(y_data.iter())
            .map(|(&x, &y)| model(x, params) - y)
            .collect()
    };

    leastsq(residual_fn, p0, options)
}

/// Forward-difference Jacobian: `J[i][j] = (F_i(x + eps e_j) - F_i(x)) / eps`.
fn finite_difference_jacobian<F>(f: &F, x: &[f64], fx: &[f64], eps: f64) -> Vec<Vec<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = x.len();
    let m = fx.len();
    let mut jacobian = vec![vec![0.0; n]; m];
    let mut x_pert = x.to_vec();

    for j in 0..n {
        let x_orig = x_pert[j];
        x_pert[j] = x_orig + eps;
        let fx_pert = f(&x_pert);
        x_pert[j] = x_orig;

        for i in 0..m {
            jacobian[i][j] = (fx_pert[i] - fx[i]) / eps;
        }
    }

    jacobian
}

/// Solve `Ax = b` by Gaussian elimination with partial pivoting; `None` for
/// singular systems.
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augmented matrix [A | b]
    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.push(b[i]);
            r
        })
        .collect();

    // Forward elimination with partial pivoting
    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            if aug[row][col].abs() > max_val {
                max_val = aug[row][col].abs();
                max_row = row;
            }
        }

        if max_val < SINGULAR_THRESHOLD {
            return None;
        }

        aug.swap(col, max_row);

        for row in (col + 1)..n {
            let factor = aug[row][col] / aug[col][col];
            for j in col..=n {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum -= aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }

    Some(x)
}
