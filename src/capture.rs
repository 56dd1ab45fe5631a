//! Neutron-capture completeness accounting.
//!
//! A neutron capture on argon releases a 6.098 MeV gamma cascade. A truth
//! cluster whose deposits sum back to that line (6.1 MeV after two-decimal
//! rounding) was fully contained; the capture ratio is the percentage of
//! truth clusters dataset-wide that are complete in this sense.

use crate::error::{Error, Result};
use crate::event::EventSet;
use std::collections::BTreeMap;

/// Summed cluster energy of a fully contained capture (MeV), the 6.098 MeV
/// line after two-decimal rounding.
pub const CAPTURE_GAMMA_MEV: f64 = 6.1;

/// Per-event and aggregate capture counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRatioSummary {
    /// Truth clusters per event.
    pub captures_per_event: Vec<usize>,
    /// Truth clusters per event whose energy sums to the capture line.
    pub complete_per_event: Vec<usize>,
    /// Total truth clusters across the dataset.
    pub total_captures: usize,
    /// Total complete captures across the dataset.
    pub complete_captures: usize,
    /// `complete / total`, rounded to an integer percentage.
    pub ratio_percent: u32,
}

/// Computes the dataset-wide capture completeness ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureRatioCalculator;

impl CaptureRatioCalculator {
    /// Create a calculator.
    pub fn new() -> Self {
        Self
    }

    /// Count complete captures against neutron truth groups.
    ///
    /// An event with no deposits contributes (0, 0). A dataset whose events
    /// contain no truth groups at all has no denominator and fails with
    /// [`Error::ZeroDivision`].
    pub fn compute(&self, events: &EventSet) -> Result<CaptureRatioSummary> {
        log::info!("calculating capture ratio over {} events", events.len());

        let mut captures_per_event = Vec::with_capacity(events.len());
        let mut complete_per_event = Vec::with_capacity(events.len());

        for event in events.events() {
            let mut group_energy: BTreeMap<i64, f64> = BTreeMap::new();
            for (&id, &energy) in event.neutron_ids().iter().zip(event.energies()) {
                *group_energy.entry(id).or_insert(0.0) += energy;
            }

            let total = group_energy.len();
            let complete = group_energy
                .values()
                .filter(|&&energy| round2(energy) == CAPTURE_GAMMA_MEV)
                .count();
            captures_per_event.push(total);
            complete_per_event.push(complete);
        }

        let total_captures: usize = captures_per_event.iter().sum();
        let complete_captures: usize = complete_per_event.iter().sum();
        if total_captures == 0 {
            log::error!("capture ratio undefined: no truth groups in dataset");
            return Err(Error::ZeroDivision {
                context: "capture ratio",
            });
        }

        let ratio_percent =
            (complete_captures as f64 / total_captures as f64 * 100.0).round() as u32;

        Ok(CaptureRatioSummary {
            captures_per_event,
            complete_per_event,
            total_captures,
            complete_captures,
            ratio_percent,
        })
    }
}

/// Round to two decimals, half away from zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
