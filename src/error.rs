use thiserror::Error;

/// Errors returned by the clustering and statistics engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// A parameter key not declared by the chosen clustering algorithm.
    #[error("unrecognized parameter `{key}` for algorithm `{algorithm}`: available parameters are {allowed:?}")]
    UnknownParameter {
        /// The offending key.
        key: String,
        /// The algorithm it was supplied to.
        algorithm: &'static str,
        /// The algorithm's declared parameter set.
        allowed: &'static [&'static str],
    },

    /// Requested component count is incompatible with the event.
    #[error("invalid cluster count: requested {requested}, but event has {n_points} points")]
    InvalidClusterCount {
        /// Requested number of components.
        requested: usize,
        /// Number of points in the event.
        n_points: usize,
    },

    /// Parallel per-point sequences of an event have inconsistent lengths.
    #[error("length mismatch: expected {expected} entries for {name}, found {found}")]
    LengthMismatch {
        /// Name of the offending sequence.
        name: &'static str,
        /// Expected length (number of points).
        expected: usize,
        /// Found length.
        found: usize,
    },

    /// Scoring or spectrum extraction requested before any clustering run.
    #[error("no predictions have been made, need to run a clustering algorithm first")]
    ClusteringNotRun,

    /// Assignment collection does not line up with the event collection.
    #[error("only {assignments} cluster assignments but {events} events")]
    AssignmentCountMismatch {
        /// Number of per-event assignments present.
        assignments: usize,
        /// Number of events in the dataset.
        events: usize,
    },

    /// Aggregate ratio over a zero denominator.
    #[error("cannot compute {context}: dataset contains no truth groups")]
    ZeroDivision {
        /// What was being computed.
        context: &'static str,
    },

    /// Nonlinear fit did not converge.
    #[error("exponential fit did not converge after {iterations} iterations")]
    FitConvergence {
        /// Iterations spent before giving up.
        iterations: usize,
    },

    /// Histogram too degenerate to fit.
    #[error("degenerate histogram: {non_empty} non-empty bins, need at least 2")]
    DegenerateHistogram {
        /// Number of non-empty bins found.
        non_empty: usize,
    },

    /// Event index outside the valid range.
    #[error("tried accessing event {index} of a dataset with {len} events")]
    EventIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of events in the dataset.
        len: usize,
    },

    /// The ion-scint spectrum mode needs electron counts the event does not carry.
    #[error("event {event} carries no ionization-electron counts, required for the requested spectrum mode")]
    MissingElectronCounts {
        /// Index of the offending event.
        event: usize,
    },

    /// Failure while writing the scan table artifact.
    #[error("failed to write scan table: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
