//! Gaussian mixture clustering via expectation–maximization.
//!
//! Fits `n_components` trivariate Gaussians to an event's deposit positions
//! and hard-assigns each point to the component with the largest
//! responsibility. Component means initialize k-means++-style: a seeded
//! random first pick, then greedy farthest points, so runs with equal seeds
//! are bit-identical and initial means spread across the event.

use super::traits::Clustering;
use crate::error::{Error, Result};
use crate::event::Point;
use rand::prelude::*;

const LN_2PI: f64 = 1.8378770664093453;

/// Covariance constraint applied in the M step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovarianceKind {
    /// Unconstrained symmetric 3x3 covariance per component.
    Full,
    /// Axis-aligned covariance per component.
    Diag,
    /// Isotropic covariance per component.
    Spherical,
}

impl CovarianceKind {
    /// Parse the sklearn-style covariance name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "full" => Ok(Self::Full),
            "diag" => Ok(Self::Diag),
            "spherical" => Ok(Self::Spherical),
            other => Err(Error::InvalidParameter {
                name: "covariance_type",
                message: format!("'{other}' not recognized, expected one of full, diag, spherical"),
            }),
        }
    }
}

/// Gaussian mixture clustering strategy.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    n_components: usize,
    covariance: CovarianceKind,
    tol: f64,
    reg_covar: f64,
    max_iter: usize,
    seed: u64,
}

impl GaussianMixture {
    /// Create a mixture with the given component count; full covariance,
    /// tol 1e-3, and reg_covar 1e-6 by default.
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            covariance: CovarianceKind::Full,
            tol: 1e-3,
            reg_covar: 1e-6,
            max_iter: 100,
            seed: 0,
        }
    }

    /// Set the covariance constraint.
    pub fn with_covariance(mut self, covariance: CovarianceKind) -> Self {
        self.covariance = covariance;
        self
    }

    /// Set the log-likelihood convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the covariance regularization added to each diagonal.
    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
        self
    }

    /// Set the EM iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the RNG seed used for mean initialization.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self, n_points: usize) -> Result<()> {
        if self.n_components == 0 {
            return Err(Error::InvalidParameter {
                name: "n_components",
                message: "must be at least 1".into(),
            });
        }
        if self.n_components > n_points {
            return Err(Error::InvalidClusterCount {
                requested: self.n_components,
                n_points,
            });
        }
        if self.tol <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "tol",
                message: "must be positive".into(),
            });
        }
        if self.reg_covar < 0.0 {
            return Err(Error::InvalidParameter {
                name: "reg_covar",
                message: "must be non-negative".into(),
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// k-means++-style mean selection: start from `first`, then repeatedly take
/// the point farthest from every already-chosen mean.
fn farthest_point_indices(points: &[Point], k: usize, first: usize) -> Vec<usize> {
    let mut chosen = vec![first];
    let mut min_dist_sq: Vec<f64> = points
        .iter()
        .map(|p| super::util::squared_euclidean(p, &points[first]))
        .collect();

    while chosen.len() < k {
        let mut best = 0;
        let mut best_dist = f64::NEG_INFINITY;
        for (i, &d) in min_dist_sq.iter().enumerate() {
            if d > best_dist {
                best_dist = d;
                best = i;
            }
        }
        chosen.push(best);
        for (i, d) in min_dist_sq.iter_mut().enumerate() {
            *d = d.min(super::util::squared_euclidean(&points[i], &points[best]));
        }
    }
    chosen
}

type Matrix3 = [[f64; 3]; 3];

fn det3(m: &Matrix3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Inverse of a 3x3 matrix via the adjugate; `None` when singular.
fn inv3(m: &Matrix3) -> Option<(Matrix3, f64)> {
    let det = det3(m);
    if det <= 0.0 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;
    let mut inv = [[0.0; 3]; 3];
    inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
    inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
    inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
    inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
    inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
    inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
    inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
    inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
    inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;
    Some((inv, det))
}

struct Component {
    weight: f64,
    mean: Point,
    cov: Matrix3,
}

impl Component {
    /// Log density of the trivariate normal at `x`.
    fn log_pdf(&self, x: &Point) -> Result<f64> {
        let (inv, det) = inv3(&self.cov).ok_or_else(|| Error::InvalidParameter {
            name: "reg_covar",
            message: "component covariance is singular; increase reg_covar".into(),
        })?;
        let d = [
            x[0] - self.mean[0],
            x[1] - self.mean[1],
            x[2] - self.mean[2],
        ];
        let mut quad = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                quad += d[i] * inv[i][j] * d[j];
            }
        }
        Ok(-0.5 * (3.0 * LN_2PI + det.ln() + quad))
    }
}

impl Clustering for GaussianMixture {
    fn fit_predict(&self, points: &[Point]) -> Result<Vec<i64>> {
        let n = points.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        self.validate(n)?;
        let k = self.n_components;

        // Seeded initialization: a random first mean, then greedy farthest
        // points; uniform weights, data variance on each covariance diagonal.
        let mut rng = StdRng::seed_from_u64(self.seed);
        let chosen = farthest_point_indices(points, k, rng.random_range(0..n));

        let mut axis_mean = [0.0f64; 3];
        for p in points {
            for ax in 0..3 {
                axis_mean[ax] += p[ax];
            }
        }
        for m in &mut axis_mean {
            *m /= n as f64;
        }
        let mut axis_var = [0.0f64; 3];
        for p in points {
            for ax in 0..3 {
                let d = p[ax] - axis_mean[ax];
                axis_var[ax] += d * d;
            }
        }
        for v in &mut axis_var {
            *v = *v / n as f64 + self.reg_covar;
            if *v <= 0.0 {
                *v = self.reg_covar.max(1e-12);
            }
        }

        let init_cov = {
            let mut cov = [[0.0; 3]; 3];
            for ax in 0..3 {
                cov[ax][ax] = axis_var[ax];
            }
            cov
        };

        let mut components: Vec<Component> = chosen
            .iter()
            .map(|&idx| Component {
                weight: 1.0 / k as f64,
                mean: points[idx],
                cov: init_cov,
            })
            .collect();

        let mut resp = vec![0.0f64; n * k];
        let mut prev_ll = f64::NEG_INFINITY;

        for _ in 0..self.max_iter {
            // E step: responsibilities via log-sum-exp.
            let mut ll = 0.0;
            for (i, x) in points.iter().enumerate() {
                let mut log_probs = Vec::with_capacity(k);
                for comp in &components {
                    log_probs.push(comp.weight.ln() + comp.log_pdf(x)?);
                }
                let max_lp = log_probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let sum_exp: f64 = log_probs.iter().map(|lp| (lp - max_lp).exp()).sum();
                let log_norm = max_lp + sum_exp.ln();
                ll += log_norm;
                for (c, lp) in log_probs.iter().enumerate() {
                    resp[i * k + c] = (lp - log_norm).exp();
                }
            }
            ll /= n as f64;

            // M step.
            for (c, comp) in components.iter_mut().enumerate() {
                let nk: f64 = (0..n).map(|i| resp[i * k + c]).sum::<f64>().max(1e-300);
                comp.weight = nk / n as f64;

                let mut mean = [0.0f64; 3];
                for (i, x) in points.iter().enumerate() {
                    let r = resp[i * k + c];
                    for ax in 0..3 {
                        mean[ax] += r * x[ax];
                    }
                }
                for m in &mut mean {
                    *m /= nk;
                }
                comp.mean = mean;

                let mut cov = [[0.0f64; 3]; 3];
                for (i, x) in points.iter().enumerate() {
                    let r = resp[i * k + c];
                    let d = [x[0] - mean[0], x[1] - mean[1], x[2] - mean[2]];
                    for a in 0..3 {
                        for b in 0..3 {
                            cov[a][b] += r * d[a] * d[b];
                        }
                    }
                }
                for row in &mut cov {
                    for v in row.iter_mut() {
                        *v /= nk;
                    }
                }
                match self.covariance {
                    CovarianceKind::Full => {}
                    CovarianceKind::Diag => {
                        for a in 0..3 {
                            for b in 0..3 {
                                if a != b {
                                    cov[a][b] = 0.0;
                                }
                            }
                        }
                    }
                    CovarianceKind::Spherical => {
                        let iso = (cov[0][0] + cov[1][1] + cov[2][2]) / 3.0;
                        cov = [[0.0; 3]; 3];
                        for a in 0..3 {
                            cov[a][a] = iso;
                        }
                    }
                }
                for a in 0..3 {
                    cov[a][a] += self.reg_covar;
                }
                comp.cov = cov;
            }

            if (ll - prev_ll).abs() < self.tol {
                break;
            }
            prev_ll = ll;
        }

        // Hard assignment by maximum responsibility.
        let labels = (0..n)
            .map(|i| {
                let mut best = 0usize;
                let mut best_r = f64::NEG_INFINITY;
                for c in 0..k {
                    if resp[i * k + c] > best_r {
                        best_r = resp[i * k + c];
                        best = c;
                    }
                }
                best as i64
            })
            .collect();

        Ok(labels)
    }
}
