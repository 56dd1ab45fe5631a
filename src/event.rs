//! Per-event energy-deposit data.
//!
//! An [`EventPointCloud`] holds one simulated event: the 3D deposit positions,
//! the deposited energies, and the truth-group ids that tie each deposit back
//! to the neutron or gamma track that produced it. An [`EventSet`] is the
//! ordered collection of events for one analysis run.
//!
//! Point clouds are constructed once during ingestion and never mutated by
//! the engine; every analysis pass reads them and returns a fresh result.

use crate::error::{Error, Result};

/// A 3D deposit position in detector coordinates (mm).
pub type Point = [f64; 3];

/// Truth granularity used when comparing predictions against simulation truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruthLevel {
    /// Group deposits by the neutron track that produced them.
    Neutron,
    /// Group deposits by the gamma track that produced them.
    Gamma,
}

impl TruthLevel {
    /// Parse a level name.
    ///
    /// An unrecognized name falls back to [`TruthLevel::Neutron`]; the second
    /// element carries the rejected name so callers can surface the
    /// substitution instead of scraping log output.
    pub fn parse(name: &str) -> (Self, Option<String>) {
        match name {
            "neutron" => (Self::Neutron, None),
            "gamma" => (Self::Gamma, None),
            other => {
                log::warn!("requested cluster level '{other}' not allowed, using 'neutron'");
                (Self::Neutron, Some(other.to_string()))
            }
        }
    }

    /// The level's canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Neutron => "neutron",
            Self::Gamma => "gamma",
        }
    }
}

/// One simulated event: parallel per-deposit sequences.
#[derive(Debug, Clone)]
pub struct EventPointCloud {
    points: Vec<Point>,
    energies: Vec<f64>,
    neutron_ids: Vec<i64>,
    gamma_ids: Vec<i64>,
    electron_counts: Option<Vec<u32>>,
}

impl EventPointCloud {
    /// Build an event from its parallel sequences.
    ///
    /// All sequences must have the same length; truth ids need not be
    /// contiguous or sorted.
    pub fn new(
        points: Vec<Point>,
        energies: Vec<f64>,
        neutron_ids: Vec<i64>,
        gamma_ids: Vec<i64>,
    ) -> Result<Self> {
        let n = points.len();
        check_len("energies", n, energies.len())?;
        check_len("neutron_ids", n, neutron_ids.len())?;
        check_len("gamma_ids", n, gamma_ids.len())?;
        Ok(Self {
            points,
            energies,
            neutron_ids,
            gamma_ids,
            electron_counts: None,
        })
    }

    /// Attach per-deposit ionization-electron counts (IonAndScint output).
    ///
    /// Required by the ion-scint spectrum mode; optional everywhere else.
    pub fn with_electron_counts(mut self, counts: Vec<u32>) -> Result<Self> {
        check_len("electron_counts", self.points.len(), counts.len())?;
        self.electron_counts = Some(counts);
        Ok(self)
    }

    /// Number of deposits in the event.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the event has no deposits.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Deposit positions (mm).
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Deposited energies (MeV), parallel to [`points`](Self::points).
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Neutron-track truth ids, parallel to [`points`](Self::points).
    pub fn neutron_ids(&self) -> &[i64] {
        &self.neutron_ids
    }

    /// Gamma-track truth ids, parallel to [`points`](Self::points).
    pub fn gamma_ids(&self) -> &[i64] {
        &self.gamma_ids
    }

    /// Ionization-electron counts, if the ingestion supplied them.
    pub fn electron_counts(&self) -> Option<&[u32]> {
        self.electron_counts.as_deref()
    }

    /// Truth ids at the requested granularity.
    pub fn truth_ids(&self, level: TruthLevel) -> &[i64] {
        match level {
            TruthLevel::Neutron => &self.neutron_ids,
            TruthLevel::Gamma => &self.gamma_ids,
        }
    }
}

fn check_len(name: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::LengthMismatch {
            name,
            expected,
            found,
        });
    }
    Ok(())
}

/// The ordered event collection for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct EventSet {
    events: Vec<EventPointCloud>,
}

impl EventSet {
    /// Wrap a collection of already-ingested events.
    pub fn new(events: Vec<EventPointCloud>) -> Self {
        Self { events }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the collection holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events, in ingestion order.
    pub fn events(&self) -> &[EventPointCloud] {
        &self.events
    }

    /// One event by index.
    pub fn event(&self, index: usize) -> Result<&EventPointCloud> {
        self.events.get(index).ok_or(Error::EventIndexOutOfRange {
            index,
            len: self.events.len(),
        })
    }

    /// One coordinate of every deposit across the whole dataset, flattened
    /// in event order.
    ///
    /// `axis` is 0, 1, or 2 for x, y, z. This feeds the dataset-wide depth
    /// projection.
    pub fn coordinates(&self, axis: usize) -> Result<Vec<f64>> {
        if axis > 2 {
            return Err(Error::InvalidParameter {
                name: "axis",
                message: format!("must be 0, 1, or 2, got {axis}"),
            });
        }
        Ok(self
            .events
            .iter()
            .flat_map(|ev| ev.points().iter().map(move |p| p[axis]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> EventPointCloud {
        EventPointCloud::new(
            vec![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]],
            vec![0.5, 0.7],
            vec![1, 1],
            vec![10, 11],
        )
        .unwrap()
    }

    #[test]
    fn test_parallel_length_check() {
        let result = EventPointCloud::new(
            vec![[0.0, 0.0, 0.0]],
            vec![0.5, 0.7],
            vec![1],
            vec![10],
        );
        assert!(matches!(
            result,
            Err(Error::LengthMismatch {
                name: "energies",
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_truth_level_selection() {
        let ev = event();
        assert_eq!(ev.truth_ids(TruthLevel::Neutron), &[1, 1]);
        assert_eq!(ev.truth_ids(TruthLevel::Gamma), &[10, 11]);
    }

    #[test]
    fn test_level_parse_fallback() {
        assert_eq!(TruthLevel::parse("gamma"), (TruthLevel::Gamma, None));
        let (level, fallback) = TruthLevel::parse("electron");
        assert_eq!(level, TruthLevel::Neutron);
        assert_eq!(fallback.as_deref(), Some("electron"));
    }

    #[test]
    fn test_event_index_bounds() {
        let set = EventSet::new(vec![event()]);
        assert!(set.event(0).is_ok());
        assert!(matches!(
            set.event(3),
            Err(Error::EventIndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_flat_coordinates() {
        let set = EventSet::new(vec![event(), event()]);
        assert_eq!(set.coordinates(1).unwrap(), vec![1.0, 4.0, 1.0, 4.0]);
        assert!(set.coordinates(3).is_err());
    }
}
