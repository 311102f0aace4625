use crate::error::LinalgError;
use crate::types::Matrix3;

/// Determinants smaller than this mark the matrix singular.
pub const DETERMINANT_EPSILON: f64 = 1e-12;

/// Closed-form 3x3 inverse via cofactors.
pub fn invert3(m: &Matrix3) -> Result<Matrix3, LinalgError> {
    let (a, b, c) = (m[(0, 0)], m[(0, 1)], m[(0, 2)]);
    let (d, e, f) = (m[(1, 0)], m[(1, 1)], m[(1, 2)]);
    let (g, h, i) = (m[(2, 0)], m[(2, 1)], m[(2, 2)]);

    let det = a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g);
    if det.is_nan() || det.abs() < DETERMINANT_EPSILON {
        return Err(LinalgError::SingularMatrix { determinant: det });
    }
    let inv_det = 1.0 / det;

    Ok(Matrix3::new(
        (e * i - f * h) * inv_det,
        -(b * i - c * h) * inv_det,
        (b * f - c * e) * inv_det,
        -(d * i - f * g) * inv_det,
        (a * i - c * g) * inv_det,
        -(a * f - c * d) * inv_det,
        (d * h - e * g) * inv_det,
        -(a * h - b * g) * inv_det,
        (a * e - b * d) * inv_det,
    ))
}
