//! Per-cluster energy spectra from a clustering run.
//!
//! For each predicted cluster the deposit energies are summed and kept when
//! below an energy cut, yielding the flattened spectrum the capture-line
//! plots are built from. Energies come either from the simulated deposits
//! directly or from the ionization-electron counts scaled by the argon work
//! function.

use crate::cluster::ClusteringRun;
use crate::error::{Error, Result};
use crate::event::EventSet;
use std::collections::BTreeSet;

/// Energy per ionization electron in argon (MeV).
pub const ELECTRON_ENERGY_SCALE_MEV: f64 = 1.5763e-5;

/// Which energy estimate feeds the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumMode {
    /// Simulated deposit energies.
    True,
    /// Ionization-electron counts scaled to MeV.
    IonScint,
    /// Both estimates; an entry is kept only when both pass the cut.
    Compare,
}

impl SpectrumMode {
    /// Parse a mode name; unrecognized names fall back to `true` and the
    /// rejected name is returned alongside.
    pub fn parse(name: &str) -> (Self, Option<String>) {
        match name {
            "true" => (Self::True, None),
            "ion_scint" => (Self::IonScint, None),
            "compare" => (Self::Compare, None),
            other => {
                log::warn!("requested edep type '{other}' not allowed, using 'true'");
                (Self::True, Some(other.to_string()))
            }
        }
    }
}

/// Flattened per-cluster summed energies below the cut.
#[derive(Debug, Clone)]
pub struct ClusterSpectrum {
    /// Mode the spectrum was computed in.
    pub mode: SpectrumMode,
    /// Requested name when an unrecognized mode fell back to `true`.
    pub mode_fallback: Option<String>,
    /// Summed true deposit energies (empty in ion-scint mode).
    pub true_energies: Vec<f64>,
    /// Summed scaled electron energies (empty in true mode).
    pub ion_scint_energies: Vec<f64>,
}

/// Compute the per-cluster energy spectrum of a clustering run.
///
/// Shares the score evaluator's preconditions: a run must exist and line up
/// with the event collection. The ion-scint modes need electron counts on
/// every event.
pub fn cluster_spectrum(
    run: &ClusteringRun,
    events: &EventSet,
    mode: &str,
    energy_cut: f64,
) -> Result<ClusterSpectrum> {
    let (mode, mode_fallback) = SpectrumMode::parse(mode);
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

    let mut true_energies = Vec::new();
    let mut ion_scint_energies = Vec::new();

    for (index, (event, assignment)) in events.events().iter().zip(&run.assignments).enumerate() {
        let electrons = match mode {
            SpectrumMode::True => None,
            SpectrumMode::IonScint | SpectrumMode::Compare => Some(
                event
                    .electron_counts()
                    .ok_or(Error::MissingElectronCounts { event: index })?,
            ),
        };

        // The noise group participates like any predicted cluster.
        let clusters: BTreeSet<i64> = assignment.iter().copied().collect();
        for cluster in clusters {
            let members = assignment
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == cluster)
                .map(|(i, _)| i);

            let mut true_sum = 0.0;
            let mut electron_sum = 0.0;
            for i in members {
                true_sum += event.energies()[i];
                if let Some(counts) = electrons {
                    electron_sum += f64::from(counts[i]) * ELECTRON_ENERGY_SCALE_MEV;
                }
            }

            match mode {
                SpectrumMode::True => {
                    if true_sum < energy_cut {
                        true_energies.push(true_sum);
                    }
                }
                SpectrumMode::IonScint => {
                    if electron_sum < energy_cut {
                        ion_scint_energies.push(electron_sum);
                    }
                }
                SpectrumMode::Compare => {
                    if true_sum < energy_cut && electron_sum < energy_cut {
                        true_energies.push(true_sum);
                        ion_scint_energies.push(electron_sum);
                    }
                }
            }
        }
    }

    Ok(ClusterSpectrum {
        mode,
        mode_fallback,
        true_energies,
        ion_scint_energies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Algorithm, NOISE};
    use crate::event::EventPointCloud;

    fn run_with(assignments: Vec<Vec<i64>>) -> ClusteringRun {
        ClusteringRun {
            algorithm: Algorithm::Dbscan,
            assignments,
            fallback: None,
        }
    }

    fn event() -> EventPointCloud {
        EventPointCloud::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [900.0, 0.0, 0.0]],
            vec![3.0, 3.1, 2.0, 50.0],
            vec![1, 1, 2, 3],
            vec![10, 10, 20, 30],
        )
        .unwrap()
    }

    #[test]
    fn test_true_spectrum_with_cut() {
        let events = EventSet::new(vec![event()]);
        // Clusters: {0, 1} -> 6.1, {2} -> 2.0, noise {3} -> 50.0 (cut away).
        let run = run_with(vec![vec![0, 0, 1, NOISE]]);

        let spectrum = cluster_spectrum(&run, &events, "true", 10.0).unwrap();
        assert_eq!(spectrum.true_energies.len(), 2);
        assert!((spectrum.true_energies[0] - 6.1).abs() < 1e-9);
        assert!((spectrum.true_energies[1] - 2.0).abs() < 1e-9);
        assert!(spectrum.ion_scint_energies.is_empty());
    }

    #[test]
    fn test_ion_scint_requires_electron_counts() {
        let events = EventSet::new(vec![event()]);
        let run = run_with(vec![vec![0, 0, 1, 1]]);
        assert!(matches!(
            cluster_spectrum(&run, &events, "ion_scint", 10.0),
            Err(Error::MissingElectronCounts { event: 0 })
        ));
    }

    #[test]
    fn test_compare_mode() {
        let ev = event()
            .with_electron_counts(vec![100_000, 100_000, 50_000, 9_000_000])
            .unwrap();
        let events = EventSet::new(vec![ev]);
        let run = run_with(vec![vec![0, 0, 1, 2]]);

        let spectrum = cluster_spectrum(&run, &events, "compare", 10.0).unwrap();
        // Cluster {3} fails both cuts; the other two pass.
        assert_eq!(spectrum.true_energies.len(), 2);
        assert_eq!(spectrum.ion_scint_energies.len(), 2);
        assert!((spectrum.ion_scint_energies[0] - 200_000.0 * ELECTRON_ENERGY_SCALE_MEV).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_mode_falls_back() {
        let events = EventSet::new(vec![event()]);
        let run = run_with(vec![vec![0, 0, 1, 1]]);
        let spectrum = cluster_spectrum(&run, &events, "reco", 100.0).unwrap();
        assert_eq!(spectrum.mode, SpectrumMode::True);
        assert_eq!(spectrum.mode_fallback.as_deref(), Some("reco"));
    }

    #[test]
    fn test_state_errors() {
        let events = EventSet::new(vec![event()]);
        assert!(matches!(
            cluster_spectrum(&run_with(vec![]), &events, "true", 10.0),
            Err(Error::ClusteringNotRun)
        ));
        assert!(matches!(
            cluster_spectrum(&run_with(vec![vec![0], vec![0]]), &events, "true", 10.0),
            Err(Error::AssignmentCountMismatch { .. })
        ));
    }
}
