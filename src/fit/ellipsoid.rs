//! Least-squares ellipsoid fit
//!
//! Samples are fitted to the general quadric
//! `Ax² + By² + Cz² + Dxy + Exz + Fyz + Gx + Hy + Iz = 1` through the 9x9
//! normal equations. Writing it as `xᵀQx + Lᵀx = 1` gives the center
//! `c = -½ Q⁻¹ L` and, from the eigen-decomposition of `Q`, the symmetric
//! matrix that maps the ellipsoid back onto a sphere.

use crate::error::{FitError, LinalgError};
use crate::linalg::{invert3, solve, symmetric_eigen3};
use crate::types::{CalibrationResult, FitMat, FitVec, Matrix3, Vector3};

/// Eigenvalues of `Q` are clamped to at least this before the square root.
pub const EIGENVALUE_FLOOR: f64 = 1e-12;

/// Below this mean radius the matrix is left in unit-sphere terms.
pub const MIN_MEAN_RADIUS: f64 = 1e-6;

/// Quadric `xᵀQx + Lᵀx = 1`
#[derive(Clone, Copy, Debug)]
struct Quadric {
    q: Matrix3,
    l: Vector3,
}

fn feature_row(s: &Vector3) -> FitVec {
    let (x, y, z) = (s.x, s.y, s.z);
    FitVec::from_column_slice(&[x * x, y * y, z * z, x * y, x * z, y * z, x, y, z])
}

fn fit_quadric(samples: &[Vector3]) -> Result<Quadric, LinalgError> {
    let mut ata = FitMat::zeros();
    let mut atb = FitVec::zeros();
    for s in samples {
        let row = feature_row(s);
        ata += row * row.transpose();
        atb += row;
    }

    let k = solve(&ata, &atb)?;
    log::trace!("quadric coefficients: {:?}", k.as_slice());

    Ok(Quadric {
        q: Matrix3::new(
            k[0],
            k[3] * 0.5,
            k[4] * 0.5,
            k[3] * 0.5,
            k[1],
            k[5] * 0.5,
            k[4] * 0.5,
            k[5] * 0.5,
            k[2],
        ),
        l: Vector3::new(k[6], k[7], k[8]),
    })
}

/// Fit an ellipsoid to offset-corrected `samples`.
///
/// The returned offset is the fitted center plus `provisional`; the matrix is
/// scaled so corrected samples have the mean centered radius, which is also
/// reported as the field magnitude.
pub fn fit_ellipsoid(
    samples: &[Vector3],
    provisional: &Vector3,
    min_fit_samples: u16,
) -> Result<CalibrationResult, FitError> {
    let have = samples.len() as u16;
    if samples.is_empty() || have < min_fit_samples {
        return Err(FitError::InsufficientSamples {
            have,
            need: min_fit_samples,
        });
    }

    let quadric = fit_quadric(samples)?;
    let q_inv = invert3(&quadric.q).map_err(FitError::SingularQuadric)?;
    let center = q_inv * quadric.l * -0.5;

    let radius = -(center.dot(&(quadric.q * center)) + quadric.l.dot(&center) - 1.0);
    if radius.is_nan() || radius <= 0.0 {
        return Err(FitError::NonPositiveRadius { radius });
    }

    let eigen = symmetric_eigen3(&quadric.q);
    let inv_sqrt_r = 1.0 / radius.sqrt();
    let diag = eigen
        .values
        .map(|lambda| lambda.max(EIGENVALUE_FLOOR).sqrt() * inv_sqrt_r);
    let unit = eigen.vectors * Matrix3::from_diagonal(&diag) * eigen.vectors.transpose();

    let mean_radius =
        samples.iter().map(|s| (s - center).norm()).sum::<f64>() / samples.len() as f64;
    let scale = if mean_radius > MIN_MEAN_RADIUS {
        mean_radius
    } else {
        1.0
    };
    let matrix = unit * scale;
    let offset = center + provisional;

    if !(offset.iter().all(|v| v.is_finite())
        && matrix.iter().all(|v| v.is_finite())
        && mean_radius.is_finite())
    {
        return Err(FitError::NonFinite);
    }

    log::debug!(
        "ellipsoid fit: center {:?}, radius term {:.3e}, eigenvalues {:?}, mean radius {:.3}",
        center.as_slice(),
        radius,
        eigen.values.as_slice(),
        mean_radius
    );

    Ok(CalibrationResult::from_parts(&offset, &matrix, mean_radius))
}
