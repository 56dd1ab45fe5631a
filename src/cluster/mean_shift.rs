//! Mean shift clustering.
//!
//! Every point is shifted iteratively toward the Gaussian-kernel-weighted
//! mean of the data until the shifts stall, then converged positions within
//! one bandwidth of each other are merged into a cluster. With every point
//! used as a seed the procedure is fully deterministic.
//!
//! When no bandwidth is supplied it is estimated as the median pairwise
//! distance of the event's points.

use super::traits::Clustering;
use super::util::{euclidean, median, squared_euclidean};
use crate::error::{Error, Result};
use crate::event::Point;

/// Mean shift clustering strategy.
#[derive(Debug, Clone)]
pub struct MeanShift {
    /// Kernel bandwidth (mm); `None` estimates it per event.
    bandwidth: Option<f64>,
    /// Iteration cap for the shift loop.
    max_iter: usize,
    /// Convergence threshold on the largest per-point shift (mm).
    tol: f64,
}

impl MeanShift {
    /// Create a mean shift clusterer with an explicit bandwidth.
    pub fn new(bandwidth: f64) -> Self {
        Self {
            bandwidth: Some(bandwidth),
            ..Self::default()
        }
    }

    /// Create a mean shift clusterer that estimates its bandwidth per event.
    pub fn with_estimated_bandwidth() -> Self {
        Self {
            bandwidth: None,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(b) = self.bandwidth {
            if b <= 0.0 || !b.is_finite() {
                return Err(Error::InvalidParameter {
                    name: "bandwidth",
                    message: "must be positive and finite".into(),
                });
            }
        }
        Ok(())
    }
}

impl Default for MeanShift {
    fn default() -> Self {
        Self {
            bandwidth: None,
            max_iter: 300,
            tol: 1e-3,
        }
    }
}

impl Clustering for MeanShift {
    fn fit_predict(&self, points: &[Point]) -> Result<Vec<i64>> {
        let n = points.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        self.validate()?;

        let bandwidth = match self.bandwidth {
            Some(b) => b,
            None => {
                let mut pairwise: Vec<f64> = (0..n)
                    .flat_map(|i| ((i + 1)..n).map(move |j| euclidean(&points[i], &points[j])))
                    .collect();
                median(&mut pairwise)
            }
        };
        if bandwidth <= 0.0 {
            // Degenerate geometry (single point or all duplicates): one cluster.
            return Ok(vec![0; n]);
        }

        let inv_two_bw_sq = -0.5 / (bandwidth * bandwidth);

        // Batch shift: all seeds move simultaneously against the fixed data.
        let mut shifted: Vec<Point> = points.to_vec();
        for _ in 0..self.max_iter {
            let mut max_shift_sq = 0.0f64;
            let next: Vec<Point> = shifted
                .iter()
                .map(|seed| {
                    let mut weight_sum = 0.0;
                    let mut acc = [0.0f64; 3];
                    for p in points {
                        let w = (squared_euclidean(seed, p) * inv_two_bw_sq).exp();
                        weight_sum += w;
                        acc[0] += w * p[0];
                        acc[1] += w * p[1];
                        acc[2] += w * p[2];
                    }
                    [
                        acc[0] / weight_sum,
                        acc[1] / weight_sum,
                        acc[2] / weight_sum,
                    ]
                })
                .collect();

            for (old, new) in shifted.iter().zip(next.iter()) {
                max_shift_sq = max_shift_sq.max(squared_euclidean(old, new));
            }
            shifted = next;
            if max_shift_sq.sqrt() < self.tol {
                break;
            }
        }

        // Merge converged positions: first-seen position within one bandwidth
        // wins, so labels are contiguous and deterministic.
        let mut centers: Vec<Point> = Vec::new();
        let mut labels = Vec::with_capacity(n);
        for pos in &shifted {
            let found = centers
                .iter()
                .position(|c| euclidean(c, pos) <= bandwidth);
            match found {
                Some(idx) => labels.push(idx as i64),
                None => {
                    centers.push(*pos);
                    labels.push((centers.len() - 1) as i64);
                }
            }
        }

        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_shift_two_blobs() {
        let points = vec![
            [0.0, 0.0, 0.0],
            [0.2, 0.1, 0.0],
            [0.1, 0.2, 0.0],
            [10.0, 10.0, 0.0],
            [10.2, 10.1, 0.0],
            [10.1, 10.2, 0.0],
        ];
        let labels = MeanShift::new(1.0).fit_predict(&points).unwrap();

        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_mean_shift_estimated_bandwidth() {
        let points = vec![
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [50.0, 0.0, 0.0],
            [50.1, 0.0, 0.0],
        ];
        let labels = MeanShift::with_estimated_bandwidth()
            .fit_predict(&points)
            .unwrap();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
    }

    #[test]
    fn test_mean_shift_single_point() {
        let labels = MeanShift::with_estimated_bandwidth()
            .fit_predict(&[[1.0, 2.0, 3.0]])
            .unwrap();
        assert_eq!(labels, vec![0]);
    }

    #[test]
    fn test_mean_shift_invalid_bandwidth() {
        let points = vec![[0.0, 0.0, 0.0]];
        assert!(MeanShift::new(0.0).fit_predict(&points).is_err());
        assert!(MeanShift::new(-2.0).fit_predict(&points).is_err());
    }

    #[test]
    fn test_mean_shift_deterministic() {
        let points: Vec<Point> = (0..20)
            .map(|i| {
                let f = f64::from(i);
                [f % 5.0, (f * 0.37) % 3.0, (f * 0.91) % 7.0]
            })
            .collect();
        let a = MeanShift::new(2.0).fit_predict(&points).unwrap();
        let b = MeanShift::new(2.0).fit_predict(&points).unwrap();
        assert_eq!(a, b);
    }
}
