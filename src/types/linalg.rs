//! Linear algebra type system for the calibration engine
//!
//! Every matrix and vector here is a statically sized nalgebra type, so the
//! whole fit runs on the stack without touching the allocator.

use nalgebra::{SMatrix, SVector};

// ===== Sample Dimensions =====
pub const AXIS_DIM: usize = 3; // (x, y, z)

// ===== Ellipsoid Fit Dimensions =====
pub const FIT_DIM: usize = 9; // [x², y², z², xy, xz, yz, x, y, z]

/// Largest system the elimination solver accepts.
pub const MAX_SYSTEM_DIM: usize = 10;

// ===== Sample Types =====
pub type Vector3 = SVector<f64, AXIS_DIM>;
pub type Matrix3 = SMatrix<f64, AXIS_DIM, AXIS_DIM>;

// ===== Fit Types =====
pub type FitVec = SVector<f64, FIT_DIM>;
pub type FitMat = SMatrix<f64, FIT_DIM, FIT_DIM>; // normal equations AᵀA
