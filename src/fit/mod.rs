//! Final calibration from the phase-2 sample set.

pub mod ellipsoid;
pub mod fallback;

pub use ellipsoid::fit_ellipsoid;
pub use fallback::diagonal_fallback;

use crate::error::FitError;
use crate::types::{CalibrationResult, Vector3};

/// Which path produced a calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FitMethod {
    Ellipsoid,
    DiagonalFallback { reason: FitError },
}

impl FitMethod {
    pub fn label(&self) -> &'static str {
        match self {
            FitMethod::Ellipsoid => "ellipsoid",
            FitMethod::DiagonalFallback { .. } => "diagonal_fallback",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationOutcome {
    pub result: CalibrationResult,
    pub method: FitMethod,
}

/// Ellipsoid fit with the diagonal fallback on any failure.
///
/// A result that does not survive narrowing to f32 is replaced by the
/// identity calibration centered on `provisional`.
pub fn calibrate(
    samples: &[Vector3],
    provisional: &Vector3,
    min_fit_samples: u16,
) -> CalibrationOutcome {
    let outcome = match fit_ellipsoid(samples, provisional, min_fit_samples) {
        Ok(result) => CalibrationOutcome {
            result,
            method: FitMethod::Ellipsoid,
        },
        Err(reason) => {
            log::warn!("Ellipsoid fit unavailable, using diagonal fallback: {reason}");
            CalibrationOutcome {
                result: diagonal_fallback(samples, provisional),
                method: FitMethod::DiagonalFallback { reason },
            }
        }
    };

    if outcome.result.is_finite() {
        return outcome;
    }
    log::warn!(
        "{} calibration is not finite after rounding, using identity",
        outcome.method.label()
    );
    CalibrationOutcome {
        result: diagonal_fallback(&[], provisional),
        method: FitMethod::DiagonalFallback {
            reason: FitError::NonFinite,
        },
    }
}
