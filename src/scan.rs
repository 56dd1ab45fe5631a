//! Hyperparameter sweep over clustering quality.
//!
//! The [`ParameterScanner`] runs the clusterer and the score evaluator once
//! per value of a swept parameter and collects one table row per value:
//! the parameter value followed by the six average metrics. The table
//! serializes to a comma-separated artifact for downstream comparison plots.
//!
//! A failed iteration aborts the whole sweep: a partial table silently
//! missing rows is worse than no table.

use crate::cluster::{ParamMap, ParamValue, SpatialClusterer};
use crate::error::{Error, Result};
use crate::event::EventSet;
use crate::score::{AverageScoreSet, ScoreEvaluator};
use std::fs::File;
use std::path::Path;

/// Configuration of one parameter sweep.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Algorithm to drive; unrecognized names fall back to dbscan.
    pub algorithm: String,
    /// Name of the swept parameter (becomes the first table column).
    pub parameter: String,
    /// Start of the swept range (inclusive).
    pub start: f64,
    /// End of the swept range (exclusive).
    pub end: f64,
    /// Spacing between swept values.
    pub step: f64,
    /// Parameters held fixed across the sweep.
    pub base_params: ParamMap,
    /// Truth level to score against.
    pub level: String,
    /// Seed for strategies with randomized initialization.
    pub seed: u64,
}

impl Default for ScanConfig {
    /// The reference sweep: dbscan eps over [1, 100) in steps of 1, with
    /// min_samples fixed at 6.
    fn default() -> Self {
        let mut base_params = ParamMap::new();
        base_params.insert("min_samples".into(), ParamValue::Int(6));
        Self {
            algorithm: "dbscan".into(),
            parameter: "eps".into(),
            start: 1.0,
            end: 100.0,
            step: 1.0,
            base_params,
            level: "neutron".into(),
            seed: 0,
        }
    }
}

/// One swept row: the parameter value and the average metrics at that value.
#[derive(Debug, Clone)]
pub struct ScanRow {
    /// The swept parameter value.
    pub value: f64,
    /// Average metrics of the run at this value.
    pub averages: AverageScoreSet,
}

/// Sweep results, one row per swept value.
#[derive(Debug, Clone)]
pub struct ScanTable {
    /// Column names: the swept parameter, then the metrics in fixed order.
    pub header: Vec<String>,
    /// One row per swept value, in sweep order.
    pub rows: Vec<ScanRow>,
}

impl ScanTable {
    /// Write the table as a comma-separated file with a header row.
    ///
    /// An undefined average silhouette serializes as `NaN`.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(|e| Error::Csv(e.into()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(&self.header)?;
        for row in &self.rows {
            let mut record = vec![row.value.to_string()];
            record.extend(row.averages.values().iter().map(f64::to_string));
            writer.write_record(&record)?;
        }
        writer.flush().map_err(|e| Error::Csv(e.into()))?;
        Ok(())
    }
}

/// Drives cluster-then-score over an evenly spaced parameter grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterScanner;

impl ParameterScanner {
    /// Create a scanner.
    pub fn new() -> Self {
        Self
    }

    /// Run the sweep described by `config` over `events`.
    ///
    /// Values are `start + i * step` for `i` in `0..((end - start) / step)`.
    /// The first clustering or scoring failure propagates immediately.
    pub fn scan(&self, events: &EventSet, config: &ScanConfig) -> Result<ScanTable> {
        if config.step <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "step",
                message: "must be positive".into(),
            });
        }
        if config.end < config.start {
            return Err(Error::InvalidParameter {
                name: "end",
                message: format!("range end {} lies before start {}", config.end, config.start),
            });
        }

        let num_steps = ((config.end - config.start) / config.step) as usize;
        let clusterer = SpatialClusterer::new().with_seed(config.seed);
        let evaluator = ScoreEvaluator::new();

        log::info!(
            "running scanning search with {num_steps} {} values from {} by {}",
            config.parameter,
            config.start,
            config.step
        );

        let mut rows = Vec::with_capacity(num_steps);
        for i in 0..num_steps {
            let value = config.start + i as f64 * config.step;
            log::info!("running clustering for {} = {value}", config.parameter);

            let mut params = config.base_params.clone();
            params.insert(config.parameter.clone(), ParamValue::Float(value));

            let run = clusterer.cluster(events, &config.algorithm, &params)?;
            let (_, averages) = evaluator.score(&run, events, &config.level)?;
            rows.push(ScanRow { value, averages });
        }

        let mut header = vec![config.parameter.clone()];
        header.extend(
            AverageScoreSet::METRIC_NAMES
                .iter()
                .map(|name| name.to_string()),
        );

        Ok(ScanTable { header, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPointCloud;

    fn events() -> EventSet {
        let ev = EventPointCloud::new(
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
        .unwrap();
        EventSet::new(vec![ev])
    }

    fn small_config() -> ScanConfig {
        let mut base_params = ParamMap::new();
        base_params.insert("min_samples".into(), ParamValue::Int(1));
        ScanConfig {
            start: 1.0,
            end: 5.0,
            step: 1.0,
            base_params,
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_scan_row_count() {
        let table = ParameterScanner::new()
            .scan(&events(), &small_config())
            .unwrap();

        // [1, 5) by 1 gives exactly 4 rows.
        assert_eq!(table.rows.len(), 4);
        assert_eq!(
            table.header,
            vec![
                "eps",
                "homogeneity",
                "completeness",
                "v-measure",
                "adjusted_rand_index",
                "adjusted_mutual_info",
                "silhouette",
            ]
        );
        let values: Vec<f64> = table.rows.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_scan_scores_improve_with_usable_eps() {
        let table = ParameterScanner::new()
            .scan(&events(), &small_config())
            .unwrap();
        // At eps >= 1 the pairs merge correctly: perfect label metrics.
        let last = &table.rows[3].averages;
        assert!((last.v_measure - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scan_propagates_config_error() {
        // min_samples is not a mean_shift parameter, so every iteration
        // would fail; the scan must propagate instead of swallowing.
        let config = ScanConfig {
            algorithm: "mean_shift".into(),
            parameter: "bandwidth".into(),
            ..small_config()
        };
        assert!(matches!(
            ParameterScanner::new().scan(&events(), &config),
            Err(Error::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_scan_invalid_step() {
        let config = ScanConfig {
            step: 0.0,
            ..small_config()
        };
        assert!(ParameterScanner::new().scan(&events(), &config).is_err());
    }

    #[test]
    fn test_write_csv() {
        let table = ParameterScanner::new()
            .scan(&events(), &small_config())
            .unwrap();

        let dir = std::env::temp_dir().join("capclust_scan_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scan_scores.csv");
        table.write_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5); // header + 4 rows
        assert!(lines[0].starts_with("eps,homogeneity,completeness"));
        assert!(lines[1].starts_with('1'));
        std::fs::remove_file(&path).ok();
    }
}
