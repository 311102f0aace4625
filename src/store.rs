//! Fixed-capacity sample storage, one retained reading per orientation cell.

use crate::binning::{BinIndex, NUM_AZIMUTH_BINS, NUM_ELEVATION_BINS, TOTAL_BINS};
use crate::types::Vector3;

#[derive(Clone, Debug)]
pub struct SampleStore {
    samples: [Vector3; TOTAL_BINS],
    count: usize,
    // Admissions per elevation row / azimuth column, for coverage displays
    elevation_counts: [u16; NUM_ELEVATION_BINS],
    azimuth_counts: [u16; NUM_AZIMUTH_BINS],
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore {
    pub const CAPACITY: usize = TOTAL_BINS;

    pub fn new() -> Self {
        Self {
            samples: [Vector3::zeros(); TOTAL_BINS],
            count: 0,
            elevation_counts: [0; NUM_ELEVATION_BINS],
            azimuth_counts: [0; NUM_AZIMUTH_BINS],
        }
    }

    /// Append a sample admitted into `bin`. Returns false when full.
    pub fn push(&mut self, sample: Vector3, bin: BinIndex) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples[self.count] = sample;
        self.count += 1;
        self.elevation_counts[bin.elevation] += 1;
        self.azimuth_counts[bin.azimuth] += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= Self::CAPACITY
    }

    /// Stored samples in arrival order
    pub fn samples(&self) -> &[Vector3] {
        &self.samples[..self.count]
    }

    pub fn elevation_counts(&self) -> &[u16] {
        &self.elevation_counts
    }

    pub fn azimuth_counts(&self) -> &[u16] {
        &self.azimuth_counts
    }

    /// Per-axis (min, max) over the stored samples, `None` when empty.
    pub fn bounds(&self) -> Option<(Vector3, Vector3)> {
        axis_bounds(self.samples())
    }

    pub fn clear(&mut self) {
        self.count = 0;
        self.samples = [Vector3::zeros(); TOTAL_BINS];
        self.elevation_counts = [0; NUM_ELEVATION_BINS];
        self.azimuth_counts = [0; NUM_AZIMUTH_BINS];
    }
}

/// Per-axis (min, max) over `samples`, `None` when empty.
pub fn axis_bounds(samples: &[Vector3]) -> Option<(Vector3, Vector3)> {
    let (first, rest) = samples.split_first()?;
    Some(
        rest.iter()
            .fold((*first, *first), |(lo, hi), s| (lo.inf(s), hi.sup(s))),
    )
}
