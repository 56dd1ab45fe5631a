//! Silhouette coefficient over point geometry and predicted labels.

use crate::cluster::util::distance_matrix;
use crate::cluster::NOISE;
use crate::event::Point;
use std::collections::BTreeMap;

/// Mean silhouette coefficient of an event's prediction.
///
/// Returns `None` when the prediction has fewer than two distinct non-noise
/// clusters, where the coefficient is undefined. When defined, every point
/// participates and the noise sentinel is treated as a group of its own;
/// singleton groups score 0.
pub(crate) fn silhouette_score(points: &[Point], labels: &[i64]) -> Option<f64> {
    debug_assert_eq!(points.len(), labels.len());
    let n = points.len();

    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(idx);
    }
    let non_noise = groups.keys().filter(|&&l| l != NOISE).count();
    if non_noise < 2 {
        return None;
    }

    let dists = distance_matrix(points);
    let mut total = 0.0;

    for (i, &label) in labels.iter().enumerate() {
        let own = &groups[&label];
        if own.len() == 1 {
            // Singleton group: coefficient defined as 0.
            continue;
        }

        let a: f64 = own
            .iter()
            .filter(|&&j| j != i)
            .map(|&j| dists[i * n + j])
            .sum::<f64>()
            / (own.len() - 1) as f64;

        let b = groups
            .iter()
            .filter(|(&other, _)| other != label)
            .map(|(_, members)| {
                members.iter().map(|&j| dists[i * n + j]).sum::<f64>() / members.len() as f64
            })
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Some(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silhouette_well_separated() {
        let points = vec![
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [100.0, 0.0, 0.0],
            [100.1, 0.0, 0.0],
        ];
        let labels = vec![0, 0, 1, 1];
        let score = silhouette_score(&points, &labels).unwrap();
        assert!(score > 0.9, "score = {score}");
        assert!(score <= 1.0);
    }

    #[test]
    fn test_silhouette_undefined_single_cluster() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        assert_eq!(silhouette_score(&points, &[0, 0]), None);
        // One real cluster plus noise is still undefined.
        assert_eq!(silhouette_score(&points, &[0, NOISE]), None);
    }

    #[test]
    fn test_silhouette_bad_partition_negative() {
        // Each "cluster" straddles both blobs.
        let points = vec![
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [100.0, 0.0, 0.0],
            [100.1, 0.0, 0.0],
        ];
        let labels = vec![0, 1, 0, 1];
        let score = silhouette_score(&points, &labels).unwrap();
        assert!(score < 0.0, "score = {score}");
        assert!(score >= -1.0);
    }

    #[test]
    fn test_silhouette_range() {
        let points: Vec<Point> = (0..9)
            .map(|i| [f64::from(i), f64::from(i % 3), 0.0])
            .collect();
        let labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let score = silhouette_score(&points, &labels).unwrap();
        assert!((-1.0..=1.0).contains(&score));
    }
}
