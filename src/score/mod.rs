//! Truth-comparison scoring of clustering runs.
//!
//! The [`ScoreEvaluator`] compares a [`ClusteringRun`]'s predicted labels
//! against simulation truth at a chosen granularity and produces six
//! clustering-validation metrics per event plus their dataset averages:
//! homogeneity, completeness, V-measure, adjusted Rand index, adjusted
//! mutual information, and the silhouette coefficient.
//!
//! The five label metrics are permutation-invariant and always defined; the
//! silhouette needs at least two non-noise clusters in an event and is
//! recorded as undefined (not an error) where that fails. The averages
//! exclude undefined silhouette entries.

mod contingency;
mod silhouette;

use crate::cluster::ClusteringRun;
use crate::error::{Error, Result};
use crate::event::{EventSet, TruthLevel};
use contingency::{adjusted_mutual_info, adjusted_rand_index, homogeneity_completeness_v_measure};
use rayon::prelude::*;
use silhouette::silhouette_score;

/// Per-event metric values for one scored clustering run.
#[derive(Debug, Clone)]
pub struct ScoreSet {
    /// Truth granularity the run was scored against.
    pub level: TruthLevel,
    /// Requested name when an unrecognized level fell back to neutron.
    pub level_fallback: Option<String>,
    /// Per-event homogeneity.
    pub homogeneity: Vec<f64>,
    /// Per-event completeness.
    pub completeness: Vec<f64>,
    /// Per-event V-measure.
    pub v_measure: Vec<f64>,
    /// Per-event adjusted Rand index.
    pub adjusted_rand_index: Vec<f64>,
    /// Per-event adjusted mutual information.
    pub adjusted_mutual_info: Vec<f64>,
    /// Per-event silhouette; `None` where undefined.
    pub silhouette: Vec<Option<f64>>,
}

/// Arithmetic means of a [`ScoreSet`] over all events.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageScoreSet {
    /// Mean homogeneity.
    pub homogeneity: f64,
    /// Mean completeness.
    pub completeness: f64,
    /// Mean V-measure.
    pub v_measure: f64,
    /// Mean adjusted Rand index.
    pub adjusted_rand_index: f64,
    /// Mean adjusted mutual information.
    pub adjusted_mutual_info: f64,
    /// Mean silhouette over the events where it is defined; `None` when no
    /// event defines it.
    pub silhouette: Option<f64>,
}

impl AverageScoreSet {
    /// Metric names in their fixed reporting order.
    pub const METRIC_NAMES: [&'static str; 6] = [
        "homogeneity",
        "completeness",
        "v-measure",
        "adjusted_rand_index",
        "adjusted_mutual_info",
        "silhouette",
    ];

    /// Metric values in reporting order; an undefined silhouette yields NaN.
    pub fn values(&self) -> [f64; 6] {
        [
            self.homogeneity,
            self.completeness,
            self.v_measure,
            self.adjusted_rand_index,
            self.adjusted_mutual_info,
            self.silhouette.unwrap_or(f64::NAN),
        ]
    }
}

struct EventScores {
    homogeneity: f64,
    completeness: f64,
    v_measure: f64,
    adjusted_rand_index: f64,
    adjusted_mutual_info: f64,
    silhouette: Option<f64>,
}

/// Scores clustering runs against simulation truth.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreEvaluator;

impl ScoreEvaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Score a run against the truth level named by `level`.
    ///
    /// An unrecognized level falls back to `neutron`; the substitution is
    /// recorded on the returned [`ScoreSet`].
    pub fn score(
        &self,
        run: &ClusteringRun,
        events: &EventSet,
        level: &str,
    ) -> Result<(ScoreSet, AverageScoreSet)> {
        let (level, fallback) = TruthLevel::parse(level);
        let (mut scores, averages) = self.score_at(run, events, level)?;
        scores.level_fallback = fallback;
        Ok((scores, averages))
    }

    /// Score a run against an already-resolved truth level.
    pub fn score_at(
        &self,
        run: &ClusteringRun,
        events: &EventSet,
        level: TruthLevel,
    ) -> Result<(ScoreSet, AverageScoreSet)> {
        if run.assignments.is_empty() {
            log::error!("no predictions have been made, need to run clustering algorithm first");
            return Err(Error::ClusteringNotRun);
        }
        if run.assignments.len() != events.len() {
            log::error!(
                "only {} predictions but {} events",
                run.assignments.len(),
                events.len()
            );
            return Err(Error::AssignmentCountMismatch {
                assignments: run.assignments.len(),
                events: events.len(),
            });
        }

        log::info!(
            "calculating scores on cluster predictions for level {}",
            level.name()
        );

        let per_event: Vec<EventScores> = events
            .events()
            .par_iter()
            .zip(run.assignments.par_iter())
            .map(|(event, assignment)| {
                if assignment.len() != event.len() {
                    return Err(Error::LengthMismatch {
                        name: "cluster_assignment",
                        expected: event.len(),
                        found: assignment.len(),
                    });
                }
                let truth = event.truth_ids(level);
                let (homogeneity, completeness, v_measure) =
                    homogeneity_completeness_v_measure(truth, assignment);
                Ok(EventScores {
                    homogeneity,
                    completeness,
                    v_measure,
                    adjusted_rand_index: adjusted_rand_index(truth, assignment),
                    adjusted_mutual_info: adjusted_mutual_info(truth, assignment),
                    silhouette: silhouette_score(event.points(), assignment),
                })
            })
            .collect::<Result<_>>()?;

        let scores = ScoreSet {
            level,
            level_fallback: None,
            homogeneity: per_event.iter().map(|s| s.homogeneity).collect(),
            completeness: per_event.iter().map(|s| s.completeness).collect(),
            v_measure: per_event.iter().map(|s| s.v_measure).collect(),
            adjusted_rand_index: per_event.iter().map(|s| s.adjusted_rand_index).collect(),
            adjusted_mutual_info: per_event.iter().map(|s| s.adjusted_mutual_info).collect(),
            silhouette: per_event.iter().map(|s| s.silhouette).collect(),
        };

        let averages = average(&scores);
        log::info!(
            "calculated average scores for level {}: {averages:?}",
            level.name()
        );
        Ok((scores, averages))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn average(scores: &ScoreSet) -> AverageScoreSet {
    let defined: Vec<f64> = scores.silhouette.iter().flatten().copied().collect();
    AverageScoreSet {
        homogeneity: mean(&scores.homogeneity),
        completeness: mean(&scores.completeness),
        v_measure: mean(&scores.v_measure),
        adjusted_rand_index: mean(&scores.adjusted_rand_index),
        adjusted_mutual_info: mean(&scores.adjusted_mutual_info),
        silhouette: if defined.is_empty() {
            None
        } else {
            Some(mean(&defined))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Algorithm, ClusteringRun, NOISE};
    use crate::event::EventPointCloud;

    fn two_group_event() -> EventPointCloud {
        EventPointCloud::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1000.0, 0.0, 0.0],
                [1001.0, 0.0, 0.0],
            ],
            vec![3.0, 3.1, 2.9, 3.2],
            vec![1, 1, 2, 2],
            vec![10, 10, 20, 20],
        )
        .unwrap()
    }

    fn run_with(assignments: Vec<Vec<i64>>) -> ClusteringRun {
        ClusteringRun {
            algorithm: Algorithm::Dbscan,
            assignments,
            fallback: None,
        }
    }

    #[test]
    fn test_perfect_prediction_scores_one() {
        let events = EventSet::new(vec![two_group_event()]);
        let run = run_with(vec![vec![0, 0, 1, 1]]);

        let (_, avg) = ScoreEvaluator::new()
            .score(&run, &events, "neutron")
            .unwrap();
        assert!((avg.homogeneity - 1.0).abs() < 1e-9);
        assert!((avg.completeness - 1.0).abs() < 1e-9);
        assert!((avg.v_measure - 1.0).abs() < 1e-9);
        assert!((avg.adjusted_rand_index - 1.0).abs() < 1e-9);
        assert!((avg.adjusted_mutual_info - 1.0).abs() < 1e-9);
        assert!(avg.silhouette.unwrap() > 0.9);
    }

    #[test]
    fn test_score_before_clustering() {
        let events = EventSet::new(vec![two_group_event()]);
        let run = run_with(vec![]);
        assert!(matches!(
            ScoreEvaluator::new().score(&run, &events, "neutron"),
            Err(Error::ClusteringNotRun)
        ));
    }

    #[test]
    fn test_assignment_count_mismatch() {
        let events = EventSet::new(vec![two_group_event(), two_group_event()]);
        let run = run_with(vec![vec![0, 0, 1, 1]]);
        assert!(matches!(
            ScoreEvaluator::new().score(&run, &events, "neutron"),
            Err(Error::AssignmentCountMismatch {
                assignments: 1,
                events: 2
            })
        ));
    }

    #[test]
    fn test_level_fallback_recorded() {
        let events = EventSet::new(vec![two_group_event()]);
        let run = run_with(vec![vec![0, 0, 1, 1]]);
        let (scores, _) = ScoreEvaluator::new()
            .score(&run, &events, "electron")
            .unwrap();
        assert_eq!(scores.level, TruthLevel::Neutron);
        assert_eq!(scores.level_fallback.as_deref(), Some("electron"));
    }

    #[test]
    fn test_undefined_silhouette_excluded_from_average() {
        let events = EventSet::new(vec![two_group_event(), two_group_event()]);
        // First event: valid two-cluster prediction. Second: everything in
        // one cluster, silhouette undefined.
        let run = run_with(vec![vec![0, 0, 1, 1], vec![0, 0, 0, 0]]);

        let (scores, avg) = ScoreEvaluator::new()
            .score(&run, &events, "neutron")
            .unwrap();
        assert!(scores.silhouette[0].is_some());
        assert!(scores.silhouette[1].is_none());
        // Average equals the single defined entry.
        assert_eq!(avg.silhouette, scores.silhouette[0]);
        // The label metrics still average over both events.
        assert!((avg.completeness - 1.0).abs() < 1e-9);
        assert!(avg.homogeneity < 1.0);
    }

    #[test]
    fn test_all_noise_prediction_in_range() {
        let events = EventSet::new(vec![two_group_event()]);
        let run = run_with(vec![vec![NOISE, NOISE, NOISE, NOISE]]);

        let (scores, avg) = ScoreEvaluator::new()
            .score(&run, &events, "neutron")
            .unwrap();
        assert_eq!(scores.silhouette[0], None);
        for value in [
            avg.homogeneity,
            avg.completeness,
            avg.v_measure,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert!((-1.0..=1.0).contains(&avg.adjusted_rand_index));
        assert!(avg.silhouette.is_none());
    }

    #[test]
    fn test_gamma_level_uses_gamma_truth() {
        let event = EventPointCloud::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            vec![1.0; 3],
            vec![1, 1, 1],
            vec![10, 20, 30],
        )
        .unwrap();
        let events = EventSet::new(vec![event]);
        let run = run_with(vec![vec![0, 1, 2]]);

        let (_, neutron_avg) = ScoreEvaluator::new()
            .score(&run, &events, "neutron")
            .unwrap();
        let (_, gamma_avg) = ScoreEvaluator::new().score(&run, &events, "gamma").unwrap();

        // Against gamma truth the split prediction is exact.
        assert!((gamma_avg.v_measure - 1.0).abs() < 1e-9);
        // Against the single neutron group it is maximally incomplete.
        assert!(neutron_avg.completeness < 1.0);
    }
}
