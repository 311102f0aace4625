//! Magnetometer hard-iron / soft-iron calibration.
//!
//! [`MagCalibrator`] takes one raw reading at a time, tracks orientation
//! coverage on a spherical grid and produces a [`CalibrationResult`] from a
//! least-squares ellipsoid fit, falling back to a min/max diagonal model when
//! the fit is not possible.

pub mod binning;
pub mod calibrator;
pub mod config;
pub mod error;
pub mod fit;
pub mod hard_iron;
pub mod linalg;
pub mod replay;
pub mod status;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use calibrator::MagCalibrator;
pub use config::CalibrationConfig;
pub use error::{ConfigError, FitError, LinalgError};
pub use fit::{CalibrationOutcome, FitMethod};
pub use hard_iron::Phase;
pub use status::CalibrationStatus;
pub use types::{CalibrationResult, HardIronOffsets};
