//! Event-level clustering and statistics for simulated neutron-capture data.
//!
//! `capclust` takes already-ingested detector events (3D energy-deposit
//! positions with per-deposit energies and truth ids) and provides:
//!
//! - per-event spatial clustering over five strategies ([`cluster`])
//! - truth-comparison scoring with six validation metrics ([`score`])
//! - the dataset-wide capture completeness ratio ([`capture`])
//! - an exponential fit to the depth-deposit density ([`depth`])
//! - a hyperparameter sweep emitting a CSV score table ([`scan`])
//! - per-cluster energy spectra ([`spectrum`])
//!
//! File ingestion, geometry handling, and plotting live outside this crate;
//! every operation here is pure computation over an [`event::EventSet`] and
//! returns an owned, immutable result.

#![forbid(unsafe_code)]

pub mod capture;
pub mod cluster;
pub mod depth;
pub mod error;
pub mod event;
pub mod fit;
pub mod scan;
pub mod score;
pub mod spectrum;

pub use capture::{CaptureRatioCalculator, CaptureRatioSummary, CAPTURE_GAMMA_MEV};
pub use cluster::{
    Algorithm, ClusterAssignment, ClusteringRun, ParamMap, ParamValue, SpatialClusterer, NOISE,
};
pub use depth::{DepthExponentialFitter, ExponentialFitResult};
pub use error::{Error, Result};
pub use event::{EventPointCloud, EventSet, Point, TruthLevel};
pub use scan::{ParameterScanner, ScanConfig, ScanTable};
pub use score::{AverageScoreSet, ScoreEvaluator, ScoreSet};
pub use spectrum::{cluster_spectrum, ClusterSpectrum, SpectrumMode};
