//! Exponential decay of deposit density with depth.
//!
//! Capture positions thin out exponentially with distance from the top of
//! the active volume. This module histograms the dataset-wide depth
//! projection (depth = distance below the highest observed deposit) and fits
//! `amplitude * exp(-rate * depth)` to the normalized bin densities.
//!
//! Depth is deliberately a dataset-wide aggregate, not a per-event quantity:
//! the decay constant characterizes the detector exposure as a whole.

use crate::error::{Error, Result};
use crate::fit::{curve_fit, FitOptions};

/// Fitted exponential decay plus the histogram it was fitted to.
#[derive(Debug, Clone)]
pub struct ExponentialFitResult {
    /// Fitted amplitude of `amplitude * exp(-rate * depth)`.
    pub amplitude: f64,
    /// Fitted decay rate (1/mm).
    pub rate: f64,
    /// Bin midpoints (mm).
    pub bin_midpoints: Vec<f64>,
    /// Normalized bin densities; sums to 1.
    pub densities: Vec<f64>,
    /// Cumulative density, monotone non-decreasing in [0, 1].
    pub cumulative: Vec<f64>,
}

/// Histograms a depth projection and fits its exponential decay.
#[derive(Debug, Clone)]
pub struct DepthExponentialFitter {
    num_bins: usize,
    options: FitOptions,
}

impl DepthExponentialFitter {
    /// Create a fitter with the given histogram bin count.
    pub fn new(num_bins: usize) -> Self {
        Self {
            num_bins,
            options: FitOptions::default(),
        }
    }

    /// Fit the depth distribution of a coordinate sample.
    ///
    /// `values` are raw coordinates (one per deposit, dataset-wide); depth is
    /// computed against their maximum. Fails with
    /// [`Error::DegenerateHistogram`] when fewer than two bins are occupied
    /// and with [`Error::FitConvergence`] when the optimizer stalls.
    pub fn fit(&self, values: &[f64]) -> Result<ExponentialFitResult> {
        if values.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.num_bins == 0 {
            return Err(Error::InvalidParameter {
                name: "num_bins",
                message: "must be at least 1".into(),
            });
        }

        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let depths: Vec<f64> = values.iter().map(|v| (max - v).abs()).collect();
        let depth_max = depths.iter().copied().fold(0.0f64, f64::max);

        // Fixed-width histogram over [0, depth_max]; the top edge is
        // inclusive so the deepest deposit lands in the last bin.
        let width = depth_max / self.num_bins as f64;
        let mut counts = vec![0u64; self.num_bins];
        for &d in &depths {
            let mut bin = if width > 0.0 {
                (d / width) as usize
            } else {
                0
            };
            if bin >= self.num_bins {
                bin = self.num_bins - 1;
            }
            counts[bin] += 1;
        }

        let non_empty = counts.iter().filter(|&&c| c > 0).count();
        if non_empty < 2 {
            log::error!("depth histogram has {non_empty} non-empty bins, cannot fit a decay");
            return Err(Error::DegenerateHistogram { non_empty });
        }

        let total = depths.len() as f64;
        let densities: Vec<f64> = counts.iter().map(|&c| c as f64 / total).collect();

        let mut cumulative = Vec::with_capacity(self.num_bins);
        let mut running = 0.0;
        for &d in &densities {
            running += d;
            cumulative.push(running);
        }

        let bin_midpoints: Vec<f64> = (0..self.num_bins)
            .map(|i| (i as f64 + 0.5) * width)
            .collect();

        log::info!(
            "fitting exponential to depth histogram: {} deposits, {} bins, depth range [0, {depth_max:.1}] mm",
            depths.len(),
            self.num_bins
        );

        let model = |t: f64, p: &[f64]| p[0] * (-p[1] * t).exp();
        let report = curve_fit(model, &bin_midpoints, &densities, &[1.0, 1.0], &self.options)?;
        if !report.converged {
            log::error!(
                "exponential fit did not converge after {} iterations",
                report.iterations
            );
            return Err(Error::FitConvergence {
                iterations: report.iterations,
            });
        }

        Ok(ExponentialFitResult {
            amplitude: report.params[0],
            rate: report.params[1],
            bin_midpoints,
            densities,
            cumulative,
        })
    }
}
