//! Cyclic-by-largest Jacobi eigen-decomposition for symmetric 3x3 matrices.

use crate::types::{Matrix3, Vector3};

pub const MAX_SWEEPS: usize = 60;

/// Off-diagonal magnitude treated as converged.
pub const OFF_DIAGONAL_EPSILON: f64 = 1e-8;

/// Eigenvalues in descending order; column `i` of `vectors` pairs with `values[i]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SymmetricEigen3 {
    pub values: Vector3,
    pub vectors: Matrix3,
}

/// Decompose a symmetric matrix. Only the upper triangle is read.
pub fn symmetric_eigen3(m: &Matrix3) -> SymmetricEigen3 {
    let mut a = m.upper_triangle();
    a.fill_lower_triangle_with_upper_triangle();
    let mut v = Matrix3::identity();

    for _ in 0..MAX_SWEEPS {
        let (a01, a02, a12) = (a[(0, 1)].abs(), a[(0, 2)].abs(), a[(1, 2)].abs());
        if a01 < OFF_DIAGONAL_EPSILON && a02 < OFF_DIAGONAL_EPSILON && a12 < OFF_DIAGONAL_EPSILON {
            break;
        }

        // Annihilate the largest off-diagonal entry
        let (p, q) = if a02 > a01 && a02 >= a12 {
            (0, 2)
        } else if a12 > a01 && a12 > a02 {
            (1, 2)
        } else {
            (0, 1)
        };
        let k = 3 - p - q;

        let (app, aqq, apq) = (a[(p, p)], a[(q, q)], a[(p, q)]);
        let phi = 0.5 * (2.0 * apq).atan2(aqq - app);
        let (s, c) = phi.sin_cos();

        a[(p, p)] = c * c * app - 2.0 * s * c * apq + s * s * aqq;
        a[(q, q)] = s * s * app + 2.0 * s * c * apq + c * c * aqq;
        a[(p, q)] = 0.0;
        a[(q, p)] = 0.0;

        let (akp, akq) = (a[(k, p)], a[(k, q)]);
        a[(k, p)] = c * akp - s * akq;
        a[(p, k)] = a[(k, p)];
        a[(k, q)] = s * akp + c * akq;
        a[(q, k)] = a[(k, q)];

        for r in 0..3 {
            let (vrp, vrq) = (v[(r, p)], v[(r, q)]);
            v[(r, p)] = c * vrp - s * vrq;
            v[(r, q)] = s * vrp + c * vrq;
        }
    }

    let mut values = a.diagonal();

    // Selection sort, descending, keeping eigenvector columns paired
    for i in 0..2 {
        let mut idx = i;
        for j in (i + 1)..3 {
            if values[j] > values[idx] {
                idx = j;
            }
        }
        if idx != i {
            values.swap_rows(i, idx);
            v.swap_columns(i, idx);
        }
    }

    SymmetricEigen3 { values, vectors: v }
}
