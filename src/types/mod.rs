pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// Number of floats in a persisted calibration: 3 offset + 9 matrix + 1 field.
pub const RECORD_LEN: usize = 13;

/// Typical Earth field strength reported when nothing better is known (µT).
pub const DEFAULT_FIELD_MAGNITUDE: f32 = 50.0;

/// Provisional hard-iron estimate built from min/max spread during phase 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HardIronOffsets {
    /// Center of the min/max box per axis (µT)
    pub offset: Vector3,
    /// max - min per axis (µT)
    pub range: Vector3,
    /// All three axes exceeded the spread threshold
    pub sufficient_spread: bool,
    /// Offset is frozen and subtracted from every incoming sample
    pub offsets_applied: bool,
}

impl Default for HardIronOffsets {
    fn default() -> Self {
        Self {
            offset: Vector3::zeros(),
            range: Vector3::zeros(),
            sufficient_spread: false,
            offsets_applied: false,
        }
    }
}

/// Final magnetometer correction handed to persistence and to the fusion filter.
///
/// Values are stored as `f32` and rounded to three decimals, matching the
/// record the firmware writes to its preferences store.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Hard-iron offset in raw sensor terms (µT)
    pub hard_iron: [f32; 3],
    /// Soft-iron matrix, row-major
    pub soft_iron: [f32; 9],
    /// Mean corrected field magnitude (µT)
    pub field_magnitude: f32,
}

impl Default for CalibrationResult {
    fn default() -> Self {
        Self {
            hard_iron: [0.0; 3],
            soft_iron: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            field_magnitude: DEFAULT_FIELD_MAGNITUDE,
        }
    }
}

impl CalibrationResult {
    /// Build a rounded result from full-precision parts.
    pub(crate) fn from_parts(offset: &Vector3, matrix: &Matrix3, field_magnitude: f64) -> Self {
        let mut soft_iron = [0.0f32; 9];
        for r in 0..3 {
            for c in 0..3 {
                soft_iron[r * 3 + c] = round3(matrix[(r, c)]);
            }
        }
        Self {
            hard_iron: [round3(offset.x), round3(offset.y), round3(offset.z)],
            soft_iron,
            field_magnitude: round3(field_magnitude),
        }
    }

    pub fn hard_iron_offset(&self) -> Vector3 {
        Vector3::from(self.hard_iron.map(f64::from))
    }

    pub fn soft_iron_matrix(&self) -> Matrix3 {
        Matrix3::from_row_slice(&self.soft_iron.map(f64::from))
    }

    /// Correct a raw reading: `M · (raw − offset)`.
    pub fn apply(&self, raw: &Vector3) -> Vector3 {
        self.soft_iron_matrix() * (raw - self.hard_iron_offset())
    }

    /// True when every stored value survived narrowing to f32.
    pub fn is_finite(&self) -> bool {
        self.hard_iron
            .iter()
            .chain(&self.soft_iron)
            .chain(std::iter::once(&self.field_magnitude))
            .all(|v| v.is_finite())
    }

    /// True when every off-diagonal soft-iron term is exactly zero.
    pub fn is_diagonal(&self) -> bool {
        [1, 2, 3, 5, 6, 7].iter().all(|&i| self.soft_iron[i] == 0.0)
    }

    /// Flatten to the persisted layout: offset, matrix (row-major), field.
    pub fn to_record(&self) -> [f32; RECORD_LEN] {
        let mut record = [0.0f32; RECORD_LEN];
        record[..3].copy_from_slice(&self.hard_iron);
        record[3..12].copy_from_slice(&self.soft_iron);
        record[12] = self.field_magnitude;
        record
    }

    pub fn from_record(record: &[f32; RECORD_LEN]) -> Self {
        let mut hard_iron = [0.0f32; 3];
        let mut soft_iron = [0.0f32; 9];
        hard_iron.copy_from_slice(&record[..3]);
        soft_iron.copy_from_slice(&record[3..12]);
        Self {
            hard_iron,
            soft_iron,
            field_magnitude: record[12],
        }
    }
}

/// Round to three decimal places in the persisted precision.
///
/// Rounding happens in f64; values beyond the f32 range narrow to infinity.
pub fn round3(value: f64) -> f32 {
    ((value * 1000.0).round() / 1000.0) as f32
}
