//! Affinity propagation clustering.
//!
//! Message passing between data points: responsibilities measure how well a
//! point would serve as an exemplar for another, availabilities accumulate
//! the evidence that a point should pick a given exemplar. Damping keeps the
//! coupled updates from oscillating.
//!
//! Similarities are negated squared Euclidean distances; the shared
//! preference (self-similarity) is the median of the off-diagonal
//! similarities, which steers the algorithm toward a moderate number of
//! exemplars.
//!
//! ## References
//!
//! Frey & Dueck (2007). "Clustering by Passing Messages Between Data
//! Points." Science 315.

use super::dbscan::NOISE;
use super::traits::Clustering;
use super::util::{median, squared_euclidean};
use crate::error::{Error, Result};
use crate::event::Point;

/// Affinity propagation clustering strategy.
#[derive(Debug, Clone)]
pub struct AffinityPropagation {
    /// Update damping factor in `[0.5, 1)`.
    damping: f64,
    /// Iteration cap for the message-passing loop.
    max_iter: usize,
    /// Iterations the exemplar set must stay unchanged to declare convergence.
    convergence_iter: usize,
}

impl AffinityPropagation {
    /// Create an affinity propagation clusterer.
    pub fn new(damping: f64, max_iter: usize) -> Self {
        Self {
            damping,
            max_iter,
            convergence_iter: 15,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.5..1.0).contains(&self.damping) {
            return Err(Error::InvalidParameter {
                name: "damping",
                message: "must lie in [0.5, 1)".into(),
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

impl Default for AffinityPropagation {
    fn default() -> Self {
        Self::new(0.5, 200)
    }
}

impl Clustering for AffinityPropagation {
    fn fit_predict(&self, points: &[Point]) -> Result<Vec<i64>> {
        let n = points.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        self.validate()?;
        if n == 1 {
            return Ok(vec![0]);
        }

        // Similarity matrix with the median off-diagonal similarity on the
        // diagonal as the shared preference.
        let mut s = vec![0.0f64; n * n];
        let mut off_diag = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let sim = -squared_euclidean(&points[i], &points[j]);
                s[i * n + j] = sim;
                s[j * n + i] = sim;
                off_diag.push(sim);
            }
        }
        let preference = median(&mut off_diag);
        for i in 0..n {
            s[i * n + i] = preference;
        }

        let mut r = vec![0.0f64; n * n];
        let mut a = vec![0.0f64; n * n];
        let damp = self.damping;
        let keep = 1.0 - self.damping;

        let mut prev_exemplars: Option<Vec<bool>> = None;
        let mut stable_iters = 0;

        for _ in 0..self.max_iter {
            // Responsibilities: r(i,k) = s(i,k) - max_{k' != k}(a(i,k') + s(i,k'))
            for i in 0..n {
                let row = i * n;
                let mut max1 = f64::NEG_INFINITY;
                let mut max2 = f64::NEG_INFINITY;
                let mut argmax = 0;
                for k in 0..n {
                    let v = a[row + k] + s[row + k];
                    if v > max1 {
                        max2 = max1;
                        max1 = v;
                        argmax = k;
                    } else if v > max2 {
                        max2 = v;
                    }
                }
                for k in 0..n {
                    let competitor = if k == argmax { max2 } else { max1 };
                    r[row + k] = damp * r[row + k] + keep * (s[row + k] - competitor);
                }
            }

            // Availabilities from column sums of positive responsibilities.
            for k in 0..n {
                let mut col_pos_sum = 0.0;
                for i in 0..n {
                    if i != k {
                        col_pos_sum += r[i * n + k].max(0.0);
                    }
                }
                let r_kk = r[k * n + k];
                for i in 0..n {
                    let new = if i == k {
                        col_pos_sum
                    } else {
                        (r_kk + col_pos_sum - r[i * n + k].max(0.0)).min(0.0)
                    };
                    a[i * n + k] = damp * a[i * n + k] + keep * new;
                }
            }

            // Convergence: the exemplar set stays fixed long enough.
            let exemplars: Vec<bool> = (0..n).map(|k| a[k * n + k] + r[k * n + k] > 0.0).collect();
            if prev_exemplars.as_deref() == Some(&exemplars[..]) {
                stable_iters += 1;
                if stable_iters >= self.convergence_iter {
                    break;
                }
            } else {
                stable_iters = 0;
            }
            prev_exemplars = Some(exemplars);
        }

        let exemplars: Vec<usize> = (0..n)
            .filter(|&k| a[k * n + k] + r[k * n + k] > 0.0)
            .collect();
        if exemplars.is_empty() {
            // Message passing failed to elect any exemplar.
            return Ok(vec![NOISE; n]);
        }

        // Assign every point to its most similar exemplar; exemplars anchor
        // their own cluster.
        let mut labels = vec![0i64; n];
        for i in 0..n {
            let mut best = 0usize;
            let mut best_sim = f64::NEG_INFINITY;
            for (c, &ex) in exemplars.iter().enumerate() {
                let sim = s[i * n + ex];
                if sim > best_sim {
                    best_sim = sim;
                    best = c;
                }
            }
            labels[i] = best as i64;
        }
        for (c, &ex) in exemplars.iter().enumerate() {
            labels[ex] = c as i64;
        }

        Ok(labels)
    }
}
