//! OPTICS: Ordering Points To Identify the Clustering Structure.
//!
//! OPTICS generalizes DBSCAN to varying densities by producing a reachability
//! ordering instead of a flat partition. Clusters are then extracted from
//! steep areas of the reachability plot (the xi method).
//!
//! The ordering step is inherently sequential: each iteration extracts the
//! unprocessed point with the smallest reachability and relaxes its
//! neighbors' reachabilities through its core distance.
//!
//! ## References
//!
//! Ankerst et al. (1999). "OPTICS: Ordering Points To Identify the
//! Clustering Structure." SIGMOD '99.

use super::dbscan::NOISE;
use super::traits::Clustering;
use super::util::distance_matrix;
use crate::error::{Error, Result};
use crate::event::Point;

/// OPTICS clustering strategy with xi cluster extraction.
#[derive(Debug, Clone)]
pub struct Optics {
    /// Minimum points for core classification, counting the point itself.
    min_samples: usize,
    /// Steepness threshold for cluster extraction.
    xi: f64,
}

impl Optics {
    /// Create a new OPTICS clusterer with the conventional xi of 0.05.
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples,
            xi: 0.05,
        }
    }

    /// Override the steepness threshold.
    pub fn with_xi(mut self, xi: f64) -> Self {
        self.xi = xi;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_samples == 0 {
            return Err(Error::InvalidParameter {
                name: "min_samples",
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..1.0).contains(&self.xi) || self.xi <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "xi",
                message: "must lie in (0, 1)".into(),
            });
        }
        Ok(())
    }

    /// Distance to the `min_samples`-th nearest point, counting the point
    /// itself; infinite when the event is too small.
    fn core_distances(&self, dists: &[f64], n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                if self.min_samples > n {
                    return f64::INFINITY;
                }
                let mut row: Vec<f64> = dists[i * n..(i + 1) * n].to_vec();
                row.sort_by(|a, b| a.total_cmp(b));
                row[self.min_samples - 1]
            })
            .collect()
    }
}

impl Default for Optics {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Clustering for Optics {
    fn fit_predict(&self, points: &[Point]) -> Result<Vec<i64>> {
        let n = points.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        self.validate()?;

        let dists = distance_matrix(points);
        let core = self.core_distances(&dists, n);

        // Sequential ordering: repeatedly take the unprocessed point with the
        // smallest reachability (ties and the all-infinite start resolve to
        // the lowest index) and relax its unprocessed neighbors.
        let mut reachability = vec![f64::INFINITY; n];
        let mut processed = vec![false; n];
        let mut ordering = Vec::with_capacity(n);

        for _ in 0..n {
            let mut current = usize::MAX;
            let mut best = f64::INFINITY;
            for i in 0..n {
                if !processed[i] && (current == usize::MAX || reachability[i] < best) {
                    best = reachability[i];
                    current = i;
                }
            }
            processed[current] = true;
            ordering.push(current);

            if core[current].is_infinite() {
                continue;
            }
            for j in 0..n {
                if processed[j] {
                    continue;
                }
                let new_reach = core[current].max(dists[current * n + j]);
                if new_reach < reachability[j] {
                    reachability[j] = new_reach;
                }
            }
        }

        let reach_ordered: Vec<f64> = ordering.iter().map(|&i| reachability[i]).collect();
        Ok(extract_xi_clusters(&reach_ordered, &ordering, self.xi))
    }
}

/// Xi cluster extraction from the ordered reachability plot: a steep-down
/// area opens a candidate cluster, the matching steep-up area closes it.
fn extract_xi_clusters(reach: &[f64], ordering: &[usize], xi: f64) -> Vec<i64> {
    let n = reach.len();
    let mut labels = vec![NOISE; n];
    let mut cluster_id: i64 = 0;
    let factor = 1.0 - xi;

    let close = |start: usize, end: usize, cluster_id: &mut i64, labels: &mut Vec<i64>| {
        for &orig in &ordering[start..=end] {
            labels[orig] = *cluster_id;
        }
        *cluster_id += 1;
    };

    let mut steep_down_start: Option<usize> = None;
    for i in 0..n.saturating_sub(1) {
        let r_curr = reach[i];
        let r_next = reach[i + 1];

        if r_curr.is_infinite() || r_next.is_infinite() {
            // A reachability gap ends any open cluster.
            if let Some(start) = steep_down_start.take() {
                close(start, i, &mut cluster_id, &mut labels);
            }
            continue;
        }

        if r_curr * factor >= r_next {
            // Steep down
            if steep_down_start.is_none() {
                steep_down_start = Some(i);
            }
        } else if r_curr <= r_next * factor {
            // Steep up closes the open cluster
            if let Some(start) = steep_down_start.take() {
                close(start, i, &mut cluster_id, &mut labels);
            }
        }
    }

    if let Some(start) = steep_down_start {
        close(start, n - 1, &mut cluster_id, &mut labels);
    }

    labels
}
