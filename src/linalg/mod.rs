//! Small fixed-size numerical primitives for the ellipsoid fit.
//!
//! All routines operate on nalgebra static matrices, so nothing here
//! allocates and every loop is bounded by the matrix dimension or an
//! iteration cap.

pub mod elimination;
pub mod inverse;
pub mod jacobi;

pub use elimination::solve;
pub use inverse::invert3;
pub use jacobi::{symmetric_eigen3, SymmetricEigen3};
