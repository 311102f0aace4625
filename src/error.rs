use thiserror::Error;

/// Numerical failures from the small dense solvers
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LinalgError {
    #[error("Singular system: pivot {pivot:e} in column {column}")]
    Singular { column: usize, pivot: f64 },

    #[error("Unsupported system dimension {dim}")]
    InvalidDimension { dim: usize },

    #[error("Matrix not invertible: determinant {determinant:e}")]
    SingularMatrix { determinant: f64 },
}

/// Reasons the ellipsoid fit gave way to the diagonal fallback
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FitError {
    #[error("Insufficient samples for ellipsoid fit: {have} of {need}")]
    InsufficientSamples { have: u16, need: u16 },

    #[error("Normal equations could not be solved: {0}")]
    Solver(#[from] LinalgError),

    #[error("Quadric matrix could not be inverted: {0}")]
    SingularQuadric(LinalgError),

    #[error("Fit radius term is not positive: {radius}")]
    NonPositiveRadius { radius: f64 },

    #[error("Ellipsoid fit produced a non-finite correction")]
    NonFinite,
}

/// Rejected calibration thresholds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Hard-iron sample threshold must be within 1..={max}, got {value}")]
    SampleThreshold { value: u16, max: u16 },

    #[error("Hard-iron spread threshold must be positive and finite, got {0}")]
    SpreadThreshold(f64),

    #[error("Field magnitude window must satisfy 0 <= min < max, got {min}..{max}")]
    MagnitudeWindow { min: f64, max: f64 },

    #[error("Minimum fit samples {value} exceeds capacity {max}")]
    FitSamples { value: u16, max: u16 },
}
