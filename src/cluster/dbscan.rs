//! DBSCAN: Density-Based Spatial Clustering of Applications with Noise.
//!
//! # The Algorithm (Ester et al., 1996)
//!
//! DBSCAN groups points based on neighborhood density. Unlike centroid
//! methods, it:
//!
//! - Discovers clusters of arbitrary shape
//! - Automatically determines the number of clusters
//! - Identifies noise points (outliers)
//!
//! ## Core Concepts
//!
//! - **Epsilon (ε)**: Maximum distance between two points to be neighbors.
//! - **MinPts**: Minimum neighbors within ε for a point to be "core".
//! - **Core point**: Has at least MinPts neighbors within ε.
//! - **Border point**: Within ε of a core point but not core itself.
//! - **Noise point**: Neither core nor border.
//!
//! ## Complexity
//!
//! - **Time**: O(n²) naive, which is fine at per-event deposit counts.
//! - **Space**: O(n) for labels.
//!
//! ## When to Use
//!
//! Neutron-capture deposits form compact blobs of varying multiplicity with
//! genuine stray deposits between them, which is exactly the regime DBSCAN
//! was designed for; it is the default strategy of this crate.
//!
//! ## References
//!
//! Ester et al. (1996). "A Density-Based Algorithm for Discovering Clusters
//! in Large Spatial Databases with Noise." KDD-96.

use super::traits::Clustering;
use super::util::euclidean;
use crate::error::{Error, Result};
use crate::event::Point;

/// Label for points no strategy assigned to a cluster.
pub const NOISE: i64 = -1;

/// DBSCAN clustering strategy.
#[derive(Debug, Clone)]
pub struct Dbscan {
    /// Epsilon: maximum distance for neighborhood (mm).
    eps: f64,
    /// Minimum points for core point classification.
    min_samples: usize,
}

// Internal label encoding.
// - UNCLASSIFIED: never assigned yet
// - NOISE: visited, but not density-reachable from any core point (may be promoted later)
const UNCLASSIFIED: i64 = -2;

impl Dbscan {
    /// Create a new DBSCAN clusterer.
    ///
    /// # Arguments
    ///
    /// * `eps` - Maximum distance between two points to be neighbors (mm).
    /// * `min_samples` - Minimum number of points to form a dense region,
    ///   counting the point itself.
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    fn validate(&self) -> Result<()> {
        if self.eps <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "eps",
                message: "must be positive".into(),
            });
        }
        if self.min_samples == 0 {
            return Err(Error::InvalidParameter {
                name: "min_samples",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Find all neighbors within eps.
    fn region_query(&self, points: &[Point], point_idx: usize) -> Vec<usize> {
        let point = &points[point_idx];
        points
            .iter()
            .enumerate()
            .filter(|(idx, other)| *idx != point_idx && euclidean(point, other) <= self.eps)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Expand cluster from a core point.
    fn expand_cluster(
        &self,
        points: &[Point],
        point_idx: usize,
        neighbors: &[usize],
        labels: &mut [i64],
        cluster_id: i64,
        visited: &mut [bool],
    ) {
        labels[point_idx] = cluster_id;

        // Use a queue for iterative expansion (avoid deep recursion)
        let mut to_process: Vec<usize> = neighbors.to_vec();

        while let Some(neighbor_idx) = to_process.pop() {
            // DBSCAN nuance:
            // - A point previously labeled NOISE can later become a border point.
            // - We therefore assign labels *before* checking `visited` so that
            //   previously-visited noise points can still be promoted.
            if labels[neighbor_idx] == UNCLASSIFIED || labels[neighbor_idx] == NOISE {
                labels[neighbor_idx] = cluster_id;
            }

            if visited[neighbor_idx] {
                continue;
            }
            visited[neighbor_idx] = true;

            let neighbor_neighbors = self.region_query(points, neighbor_idx);

            // If this neighbor is also a core point, expand from it.
            // MinPts includes the point itself.
            if neighbor_neighbors.len() + 1 >= self.min_samples {
                for nn in neighbor_neighbors {
                    if !visited[nn] {
                        to_process.push(nn);
                    }
                }
            }
        }
    }
}

impl Default for Dbscan {
    /// Detector-scale defaults: 100 mm neighborhoods, six-deposit cores.
    fn default() -> Self {
        Self::new(100.0, 6)
    }
}

impl Clustering for Dbscan {
    fn fit_predict(&self, points: &[Point]) -> Result<Vec<i64>> {
        let n = points.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        self.validate()?;

        // Initialize: all points unclassified.
        let mut labels = vec![UNCLASSIFIED; n];
        let mut visited = vec![false; n];
        let mut cluster_id: i64 = 0;

        for point_idx in 0..n {
            if visited[point_idx] {
                continue;
            }
            visited[point_idx] = true;

            let neighbors = self.region_query(points, point_idx);

            // MinPts includes the point itself, so we need >= min_samples - 1 other neighbors
            if neighbors.len() + 1 < self.min_samples {
                // Not enough neighbors: mark as noise (might be border later)
                labels[point_idx] = NOISE;
                continue;
            }

            // Start new cluster
            self.expand_cluster(
                points,
                point_idx,
                &neighbors,
                &mut labels,
                cluster_id,
                &mut visited,
            );
            cluster_id += 1;
        }

        // Anything still unclassified is noise.
        for l in &mut labels {
            if *l == UNCLASSIFIED {
                *l = NOISE;
            }
        }

        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbscan_two_clusters() {
        // Two well-separated clusters
        let points = vec![
            // Cluster 1: around (0, 0, 0)
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [0.0, 0.1, 0.0],
            [0.1, 0.1, 0.0],
            [0.05, 0.05, 0.0],
            // Cluster 2: around (5, 5, 0)
            [5.0, 5.0, 0.0],
            [5.1, 5.0, 0.0],
            [5.0, 5.1, 0.0],
            [5.1, 5.1, 0.0],
            [5.05, 5.05, 0.0],
        ];

        let dbscan = Dbscan::new(0.3, 3);
        let labels = dbscan.fit_predict(&points).unwrap();

        assert_eq!(labels.len(), 10);

        // First 5 should be in same cluster
        let cluster1 = labels[0];
        assert!(cluster1 != NOISE);
        for label in &labels[1..5] {
            assert_eq!(*label, cluster1);
        }

        // Last 5 should be in same cluster
        let cluster2 = labels[5];
        assert!(cluster2 != NOISE);
        for label in &labels[6..10] {
            assert_eq!(*label, cluster2);
        }

        // Two clusters should be different
        assert_ne!(cluster1, cluster2);
    }

    #[test]
    fn test_dbscan_with_noise() {
        // Two clusters plus an outlier
        let points = vec![
            // Cluster 1
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [0.0, 0.1, 0.0],
            [0.1, 0.1, 0.0],
            // Outlier
            [100.0, 100.0, 100.0],
            // Cluster 2
            [5.0, 5.0, 0.0],
            [5.1, 5.0, 0.0],
            [5.0, 5.1, 0.0],
            [5.1, 5.1, 0.0],
        ];

        let dbscan = Dbscan::new(0.3, 3);
        let labels = dbscan.fit_predict(&points).unwrap();

        assert_eq!(labels.len(), 9);

        // Point 4 (outlier) should be noise
        assert_eq!(labels[4], NOISE);

        // Others should have cluster assignments
        for (i, label) in labels.iter().enumerate() {
            if i != 4 {
                assert_ne!(*label, NOISE);
            }
        }
    }

    #[test]
    fn test_dbscan_all_noise() {
        // Points too far apart
        let points = vec![
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [0.0, 10.0, 0.0],
            [10.0, 10.0, 0.0],
        ];

        let dbscan = Dbscan::new(0.5, 3);
        let labels = dbscan.fit_predict(&points).unwrap();

        for label in labels {
            assert_eq!(label, NOISE);
        }
    }

    #[test]
    fn test_dbscan_separated_pairs() {
        // Two pairs, 1 unit apart within a pair, 1000 units between pairs.
        let points = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1000.0, 0.0, 0.0],
            [1001.0, 0.0, 0.0],
        ];

        let dbscan = Dbscan::new(10.0, 1);
        let labels = dbscan.fit_predict(&points).unwrap();

        assert_ne!(labels[0], NOISE);
        assert_ne!(labels[2], NOISE);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_dbscan_empty() {
        let points: Vec<Point> = vec![];
        let dbscan = Dbscan::new(0.5, 3);
        assert!(dbscan.fit_predict(&points).is_err());
    }

    #[test]
    fn test_dbscan_invalid_params() {
        let points = vec![[0.0, 0.0, 0.0]];

        // Invalid eps
        assert!(Dbscan::new(0.0, 3).fit_predict(&points).is_err());
        assert!(Dbscan::new(-1.0, 3).fit_predict(&points).is_err());

        // Invalid min_samples
        assert!(Dbscan::new(0.5, 0).fit_predict(&points).is_err());
    }

    #[test]
    fn test_dbscan_chain() {
        // Chain of points - DBSCAN should connect them
        let points: Vec<Point> = (0..10).map(|i| [f64::from(i) * 0.3, 0.0, 0.0]).collect();

        let dbscan = Dbscan::new(0.5, 2);
        let labels = dbscan.fit_predict(&points).unwrap();

        // All should be in one cluster (chain is connected)
        let cluster = labels[0];
        for label in labels {
            assert_eq!(label, cluster);
        }
    }
}
