//! Spatial clustering of per-event energy deposits.
//!
//! This module provides the per-event clustering engine: five strategies
//! behind a common [`Clustering`] trait, a closed [`Algorithm`] enumeration
//! with per-strategy parameter validation, and the [`SpatialClusterer`]
//! dispatcher that runs one strategy independently over every event of an
//! [`EventSet`](crate::event::EventSet).
//!
//! ## Strategies
//!
//! - **dbscan** — density clustering with noise labeling; the default.
//! - **optics** — reachability ordering with xi cluster extraction, for
//!   events with varying deposit density.
//! - **mean_shift** — kernel density mode seeking; no noise label.
//! - **affinity** — exemplar election by message passing.
//! - **gaussian** — Gaussian mixture EM with hard assignment; needs a seed
//!   for reproducible initialization.
//!
//! ## Usage
//!
//! ```rust
//! use capclust::cluster::{ParamMap, ParamValue, SpatialClusterer, NOISE};
//! use capclust::event::{EventPointCloud, EventSet};
//!
//! let event = EventPointCloud::new(
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [500.0, 0.0, 0.0]],
//!     vec![0.3, 0.4, 5.1],
//!     vec![1, 1, 2],
//!     vec![10, 10, 20],
//! )
//! .unwrap();
//! let events = EventSet::new(vec![event]);
//!
//! let mut params = ParamMap::new();
//! params.insert("eps".into(), ParamValue::Float(10.0));
//! params.insert("min_samples".into(), ParamValue::Int(1));
//!
//! let run = SpatialClusterer::new()
//!     .cluster(&events, "dbscan", &params)
//!     .unwrap();
//! assert_eq!(run.assignments[0].len(), 3);
//! assert!(run.assignments[0].iter().all(|&l| l != NOISE));
//! ```

mod affinity;
mod dbscan;
mod gaussian;
mod mean_shift;
mod optics;
mod traits;
pub(crate) mod util;

pub use affinity::AffinityPropagation;
pub use dbscan::{Dbscan, NOISE};
pub use gaussian::{CovarianceKind, GaussianMixture};
pub use mean_shift::MeanShift;
pub use optics::Optics;
pub use traits::Clustering;
pub use util::max_pairwise_distance;

use crate::error::{Error, Result};
use crate::event::EventSet;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;

/// One value in a clustering parameter map.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A real-valued parameter (eps, bandwidth, damping, tol, ...).
    Float(f64),
    /// An integer parameter (min_samples, max_iter, n_components, ...).
    Int(i64),
    /// A named choice (covariance_type).
    Text(String),
}

impl ParamValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Text(_) => None,
        }
    }

    fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Int(v) => usize::try_from(*v).ok(),
            Self::Float(v) if v.fract() == 0.0 && *v >= 0.0 => Some(*v as usize),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Parameter map supplied alongside an algorithm choice.
///
/// Ordered so that logs and error messages are stable across runs.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// The closed set of clustering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Affinity propagation.
    Affinity,
    /// Mean shift.
    MeanShift,
    /// DBSCAN (the default).
    Dbscan,
    /// OPTICS with xi extraction.
    Optics,
    /// Gaussian mixture.
    Gaussian,
}

impl Algorithm {
    /// Parse an algorithm name.
    ///
    /// An unrecognized name falls back to [`Algorithm::Dbscan`]; the second
    /// element carries the rejected name so callers can assert on the
    /// substitution.
    pub fn parse(name: &str) -> (Self, Option<String>) {
        match name {
            "affinity" => (Self::Affinity, None),
            "mean_shift" => (Self::MeanShift, None),
            "dbscan" => (Self::Dbscan, None),
            "optics" => (Self::Optics, None),
            "gaussian" => (Self::Gaussian, None),
            other => {
                log::warn!("requested algorithm '{other}' not allowed, using 'dbscan'");
                (Self::Dbscan, Some(other.to_string()))
            }
        }
    }

    /// The algorithm's canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Affinity => "affinity",
            Self::MeanShift => "mean_shift",
            Self::Dbscan => "dbscan",
            Self::Optics => "optics",
            Self::Gaussian => "gaussian",
        }
    }

    /// The parameter keys this algorithm declares.
    pub fn allowed_params(&self) -> &'static [&'static str] {
        match self {
            Self::Affinity => &["damping", "max_iter"],
            Self::MeanShift => &["bandwidth"],
            Self::Dbscan => &["eps", "min_samples"],
            Self::Optics => &["min_samples"],
            Self::Gaussian => &[
                "n_components",
                "covariance_type",
                "tol",
                "reg_covar",
                "max_iter",
            ],
        }
    }

    /// Reject any parameter key outside the declared set.
    pub fn validate_params(&self, params: &ParamMap) -> Result<()> {
        let allowed = self.allowed_params();
        for key in params.keys() {
            if !allowed.contains(&key.as_str()) {
                log::error!(
                    "unrecognized parameter {key} for algorithm {self}, available parameters are {allowed:?}"
                );
                return Err(Error::UnknownParameter {
                    key: key.clone(),
                    algorithm: self.name(),
                    allowed,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-event cluster labels; index-aligned with the event's points.
pub type ClusterAssignment = Vec<i64>;

/// The immutable result of one clustering pass over a dataset.
///
/// Replaced wholesale on every re-run, never merged. `fallback` carries the
/// rejected algorithm name when the dispatcher substituted the default.
#[derive(Debug, Clone)]
pub struct ClusteringRun {
    /// The strategy that actually ran.
    pub algorithm: Algorithm,
    /// One label vector per event, index-aligned with the event set.
    pub assignments: Vec<ClusterAssignment>,
    /// Requested name when an unrecognized algorithm fell back to dbscan.
    pub fallback: Option<String>,
}

/// Dispatches clustering strategies over every event of a dataset.
#[derive(Debug, Clone, Default)]
pub struct SpatialClusterer {
    seed: u64,
}

impl SpatialClusterer {
    /// Create a clusterer with seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the RNG seed handed to strategies with randomized initialization.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cluster every event with the named algorithm.
    ///
    /// An unrecognized name falls back to dbscan with its default parameters
    /// (the supplied map is ignored in that case) and the substitution is
    /// recorded on the returned run. Unknown parameter keys are fatal.
    pub fn cluster(
        &self,
        events: &EventSet,
        algorithm: &str,
        params: &ParamMap,
    ) -> Result<ClusteringRun> {
        let (alg, fallback) = Algorithm::parse(algorithm);
        let defaults = ParamMap::new();
        let effective = if fallback.is_some() { &defaults } else { params };
        let mut run = self.cluster_with(events, alg, effective)?;
        run.fallback = fallback;
        Ok(run)
    }

    /// Cluster every event with an already-resolved algorithm.
    pub fn cluster_with(
        &self,
        events: &EventSet,
        algorithm: Algorithm,
        params: &ParamMap,
    ) -> Result<ClusteringRun> {
        algorithm.validate_params(params)?;
        let strategy = build_strategy(algorithm, params, self.seed)?;

        log::info!(
            "running clustering algorithm {algorithm} over {} events",
            events.len()
        );

        // Events are independent; the parallel map keeps output order
        // aligned with the input event order.
        let assignments = events
            .events()
            .par_iter()
            .map(|ev| {
                if ev.is_empty() {
                    Ok(Vec::new())
                } else {
                    strategy.fit_predict(ev.points())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ClusteringRun {
            algorithm,
            assignments,
            fallback: None,
        })
    }
}

fn float_param(params: &ParamMap, key: &'static str, default: f64) -> Result<f64> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| Error::InvalidParameter {
            name: key,
            message: format!("expected a number, got {v:?}"),
        }),
    }
}

fn usize_param(params: &ParamMap, key: &'static str, default: usize) -> Result<usize> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v.as_usize().ok_or_else(|| Error::InvalidParameter {
            name: key,
            message: format!("expected a non-negative integer, got {v:?}"),
        }),
    }
}

fn text_param<'a>(params: &'a ParamMap, key: &'static str, default: &'a str) -> Result<&'a str> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v.as_str().ok_or_else(|| Error::InvalidParameter {
            name: key,
            message: format!("expected a name, got {v:?}"),
        }),
    }
}

fn build_strategy(
    algorithm: Algorithm,
    params: &ParamMap,
    seed: u64,
) -> Result<Box<dyn Clustering + Send + Sync>> {
    Ok(match algorithm {
        Algorithm::Affinity => Box::new(AffinityPropagation::new(
            float_param(params, "damping", 0.5)?,
            usize_param(params, "max_iter", 200)?,
        )),
        Algorithm::MeanShift => match params.get("bandwidth") {
            None => Box::new(MeanShift::with_estimated_bandwidth()),
            Some(v) => {
                let bandwidth = v.as_f64().ok_or_else(|| Error::InvalidParameter {
                    name: "bandwidth",
                    message: format!("expected a number, got {v:?}"),
                })?;
                Box::new(MeanShift::new(bandwidth))
            }
        },
        Algorithm::Dbscan => Box::new(Dbscan::new(
            float_param(params, "eps", 100.0)?,
            usize_param(params, "min_samples", 6)?,
        )),
        Algorithm::Optics => Box::new(Optics::new(usize_param(params, "min_samples", 6)?)),
        Algorithm::Gaussian => {
            let covariance = CovarianceKind::parse(text_param(params, "covariance_type", "full")?)?;
            Box::new(
                GaussianMixture::new(usize_param(params, "n_components", 1)?)
                    .with_covariance(covariance)
                    .with_tol(float_param(params, "tol", 1e-3)?)
                    .with_reg_covar(float_param(params, "reg_covar", 1e-6)?)
                    .with_max_iter(usize_param(params, "max_iter", 100)?)
                    .with_seed(seed),
            )
        }
    })
}
