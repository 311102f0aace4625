//! Runtime thresholds for a calibration session.
//!
//! The grid resolution sizes the fixed sample buffers and therefore lives in
//! [`crate::binning`] as a compile-time constant. Everything here can change
//! per device without touching memory layout.

use serde::{Deserialize, Serialize};

use crate::binning::TOTAL_BINS;
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Stored samples required before the first hard-iron estimate
    pub hard_iron_sample_threshold: u16,
    /// Minimum max-min spread per axis to trust the estimate (µT)
    pub hard_iron_spread_threshold: f64,
    /// Phase-2 samples below this magnitude are rejected (µT)
    pub min_field_magnitude: f64,
    /// Phase-2 samples above this magnitude are rejected (µT)
    pub max_field_magnitude: f64,
    /// Stored samples required to attempt the ellipsoid fit
    pub min_fit_samples: u16,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            hard_iron_sample_threshold: 30,
            hard_iron_spread_threshold: 40.0,
            min_field_magnitude: 10.0,
            max_field_magnitude: 100.0,
            min_fit_samples: (TOTAL_BINS / 2) as u16,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacity = TOTAL_BINS as u16;

        if self.hard_iron_sample_threshold == 0 || self.hard_iron_sample_threshold > capacity {
            return Err(ConfigError::SampleThreshold {
                value: self.hard_iron_sample_threshold,
                max: capacity,
            });
        }

        if !self.hard_iron_spread_threshold.is_finite() || self.hard_iron_spread_threshold <= 0.0 {
            return Err(ConfigError::SpreadThreshold(self.hard_iron_spread_threshold));
        }

        let (min, max) = (self.min_field_magnitude, self.max_field_magnitude);
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min >= max {
            return Err(ConfigError::MagnitudeWindow { min, max });
        }

        if self.min_fit_samples > capacity {
            return Err(ConfigError::FitSamples {
                value: self.min_fit_samples,
                max: capacity,
            });
        }

        Ok(())
    }
}
