use std::fmt;

/// Operator guidance, refreshed on every sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CalibrationStatus {
    #[default]
    Idle,
    /// Zero, NaN or infinite reading was dropped
    InvalidReading,
    CollectingHardIron { collected: u16, required: u16 },
    /// Enough samples, but at least one axis has not spread far enough
    InsufficientSpread,
    /// Phase-1 offset frozen on this sample
    HardIronApplied,
    CollectingSoftIron { covered: u16, total: u16 },
    MaximumReached,
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationStatus::Idle => Ok(()),
            CalibrationStatus::InvalidReading => {
                write!(f, "Invalid magnetometer reading ignored.")
            }
            CalibrationStatus::CollectingHardIron { collected, required } => write!(
                f,
                "Move the device in full circular motions in multiple directions. Collected {collected} of {required} samples."
            ),
            CalibrationStatus::InsufficientSpread => {
                write!(f, "Preparing for phase 1 calibration, continue moving...")
            }
            CalibrationStatus::HardIronApplied => {
                write!(f, "Phase 1 calibration complete, collecting for phase 2...")
            }
            CalibrationStatus::CollectingSoftIron { covered, total } => write!(
                f,
                "Collecting for phase 2, {covered} of {total} orientations covered."
            ),
            CalibrationStatus::MaximumReached => write!(
                f,
                "Maximum samples reached, please end the calibration process."
            ),
        }
    }
}
