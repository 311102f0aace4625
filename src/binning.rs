//! Spherical orientation binning
//!
//! Field directions are normalized to the unit sphere and sorted into an
//! azimuth/elevation grid. One sample per cell keeps the stored set evenly
//! spread over the sphere and bounds memory by the cell count.
//!
//! - Azimuth: `atan2(ny, nx)`, -180° to +180°, rotation about Z
//! - Elevation: `asin(nz)`, -90° to +90°, tilt from the XY plane

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::types::Vector3;

/// Cell size in whole degrees.
pub const BIN_DEGREES: usize = 9;
pub const NUM_AZIMUTH_BINS: usize = 360 / BIN_DEGREES; // 40
pub const NUM_ELEVATION_BINS: usize = 180 / BIN_DEGREES; // 20
/// Total cells, also the sample store capacity.
pub const TOTAL_BINS: usize = NUM_AZIMUTH_BINS * NUM_ELEVATION_BINS; // 800

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinIndex {
    pub azimuth: usize,
    pub elevation: usize,
}

impl BinIndex {
    /// Row-major cell number: `elevation * NUM_AZIMUTH_BINS + azimuth`
    pub fn flat(&self) -> usize {
        self.elevation * NUM_AZIMUTH_BINS + self.azimuth
    }
}

/// Spherical direction of a field vector and the cell it falls in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Direction {
    /// Radians, (-π, π]
    pub azimuth: f64,
    /// Radians, [-π/2, π/2]
    pub elevation: f64,
    pub bin: BinIndex,
}

impl Direction {
    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth.to_degrees()
    }

    pub fn elevation_deg(&self) -> f64 {
        self.elevation.to_degrees()
    }
}

/// Locate the cell for a field vector without marking anything.
///
/// The vector must be finite and non-zero; callers filter those first.
pub fn locate(v: &Vector3) -> Direction {
    let r = v.norm();
    let (nx, ny, nz) = (v.x / r, v.y / r, v.z / r);

    let azimuth = ny.atan2(nx);
    // Rounding can push nz just past ±1, where asin is NaN
    let elevation = nz.clamp(-1.0, 1.0).asin();

    // Float-to-int casts saturate at zero, so only the upper edge needs clamping
    let az_index = ((azimuth + PI) / TAU * NUM_AZIMUTH_BINS as f64) as usize;
    let el_index = ((elevation + FRAC_PI_2) / PI * NUM_ELEVATION_BINS as f64) as usize;

    Direction {
        azimuth,
        elevation,
        bin: BinIndex {
            azimuth: az_index.min(NUM_AZIMUTH_BINS - 1),
            elevation: el_index.min(NUM_ELEVATION_BINS - 1),
        },
    }
}

/// Coverage flags for every cell of the sphere.
#[derive(Clone, Debug)]
pub struct OrientationGrid {
    bins: [bool; TOTAL_BINS],
}

impl Default for OrientationGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationGrid {
    pub fn new() -> Self {
        Self {
            bins: [false; TOTAL_BINS],
        }
    }

    /// Classify a field vector, marking its cell filled on first visit.
    ///
    /// Returns the cell and whether it was new.
    pub fn classify(&mut self, v: &Vector3) -> (BinIndex, bool) {
        let bin = locate(v).bin;
        let slot = &mut self.bins[bin.flat()];
        let is_new = !*slot;
        *slot = true;
        (bin, is_new)
    }

    /// Flat indices of visited cells, ascending.
    pub fn filled_bins(&self) -> impl Iterator<Item = usize> + '_ {
        self.bins
            .iter()
            .enumerate()
            .filter_map(|(idx, &filled)| filled.then_some(idx))
    }

    pub fn filled_count(&self) -> usize {
        self.bins.iter().filter(|&&b| b).count()
    }

    /// Percentage of cells visited, 0..=100
    pub fn coverage_percent(&self) -> f32 {
        self.filled_count() as f32 / TOTAL_BINS as f32 * 100.0
    }

    pub fn reset(&mut self) {
        self.bins = [false; TOTAL_BINS];
    }
}
