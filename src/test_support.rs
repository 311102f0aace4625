//! Deterministic synthetic magnetometer data for unit tests.

use crate::types::{Matrix3, Vector3};

/// Evenly spread unit directions along a golden-angle spiral.
pub fn fibonacci_sphere(n: usize) -> Vec<Vector3> {
    let golden = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            let theta = golden * i as f64;
            Vector3::new(r * theta.cos(), r * theta.sin(), z)
        })
        .collect()
}

/// Unit directions on an azimuth/elevation lattice, `step_deg` apart and
/// offset half a step from the cell edges. A step that divides the cell
/// size visits every cell.
pub fn direction_sweep(step_deg: f64) -> Vec<Vector3> {
    let az_steps = (360.0 / step_deg).round() as usize;
    let el_steps = (180.0 / step_deg).round() as usize;
    let mut dirs = Vec::with_capacity(az_steps * el_steps);
    for e in 0..el_steps {
        let el = (-90.0 + (e as f64 + 0.5) * step_deg).to_radians();
        for a in 0..az_steps {
            let az = (-180.0 + (a as f64 + 0.5) * step_deg).to_radians();
            dirs.push(Vector3::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin()));
        }
    }
    dirs
}

/// Map unit directions onto the ellipsoid `center + shape · (radius · u)`.
pub fn ellipsoid_points(
    dirs: &[Vector3],
    center: &Vector3,
    shape: &Matrix3,
    radius: f64,
) -> Vec<Vector3> {
    dirs.iter().map(|u| center + shape * (u * radius)).collect()
}

/// Points that span every axis symmetrically about `center`, enough to
/// satisfy the phase-1 sample threshold. The six axis extremes come first.
pub fn phase1_primers(center: &Vector3, shape: &Matrix3, radius: f64) -> Vec<Vector3> {
    let mut dirs = vec![
        Vector3::x(),
        -Vector3::x(),
        Vector3::y(),
        -Vector3::y(),
        Vector3::z(),
        -Vector3::z(),
    ];
    dirs.extend(fibonacci_sphere(60));
    ellipsoid_points(&dirs, center, shape, radius)
}

/// Symmetric soft-iron distortion within ±10% of identity.
pub fn soft_iron_shape() -> Matrix3 {
    Matrix3::new(1.08, 0.05, -0.03, 0.05, 0.93, 0.04, -0.03, 0.04, 1.02)
}
