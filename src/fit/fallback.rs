use crate::store::axis_bounds;
use crate::types::{round3, CalibrationResult, Matrix3, Vector3};

/// Axis ranges below this (µT) are treated as flat and keep a unit scale.
pub const MIN_AXIS_RANGE: f64 = 1e-6;

/// Min/max calibration: box center as offset, per-axis scale to the mean radius.
///
/// `samples` are offset-corrected by `provisional`, which is added back so the
/// result is in raw sensor terms. With no samples this is the identity
/// calibration centered on `provisional`.
pub fn diagonal_fallback(samples: &[Vector3], provisional: &Vector3) -> CalibrationResult {
    let Some((lo, hi)) = axis_bounds(samples) else {
        return CalibrationResult {
            hard_iron: [round3(provisional.x), round3(provisional.y), round3(provisional.z)],
            ..CalibrationResult::default()
        };
    };

    let center = (hi + lo) / 2.0;
    let range = hi - lo;
    let avg_radius = range.sum() / 6.0;
    let scale = range.map(|r| if r < MIN_AXIS_RANGE { 1.0 } else { avg_radius / (r / 2.0) });

    let field = samples
        .iter()
        .map(|s| (s - center).component_mul(&scale).norm())
        .sum::<f64>()
        / samples.len() as f64;

    CalibrationResult::from_parts(&(center + provisional), &Matrix3::from_diagonal(&scale), field)
}
