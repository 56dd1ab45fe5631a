use crate::error::Result;
use crate::event::Point;

/// Common interface for hard clustering strategies (one label per point).
///
/// Labels are nonnegative cluster ids; [`NOISE`](super::NOISE) marks points
/// the strategy declined to assign.
pub trait Clustering {
    /// Fit the model (if needed) and return one cluster label per input point.
    fn fit_predict(&self, points: &[Point]) -> Result<Vec<i64>>;
}
