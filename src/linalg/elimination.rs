use nalgebra::{SMatrix, SVector};

use crate::error::LinalgError;
use crate::types::MAX_SYSTEM_DIM;

/// Pivots smaller than this mark the system singular.
pub const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `A x = b` by Gauss-Jordan elimination with partial pivoting.
///
/// Works on stack copies of `a` and `b`; `N` must be within
/// `1..=MAX_SYSTEM_DIM`.
pub fn solve<const N: usize>(
    a: &SMatrix<f64, N, N>,
    b: &SVector<f64, N>,
) -> Result<SVector<f64, N>, LinalgError> {
    if N == 0 || N > MAX_SYSTEM_DIM {
        return Err(LinalgError::InvalidDimension { dim: N });
    }

    let mut a = *a;
    let mut b = *b;

    for col in 0..N {
        let mut pivot_row = col;
        let mut max = a[(col, col)].abs();
        for r in (col + 1)..N {
            let v = a[(r, col)].abs();
            if v > max {
                max = v;
                pivot_row = r;
            }
        }
        if max.is_nan() || max < PIVOT_EPSILON {
            return Err(LinalgError::Singular { column: col, pivot: max });
        }

        if pivot_row != col {
            a.swap_rows(col, pivot_row);
            b.swap_rows(col, pivot_row);
        }

        let pivot = a[(col, col)];
        for c in col..N {
            a[(col, c)] /= pivot;
        }
        b[col] /= pivot;

        for r in 0..N {
            if r == col {
                continue;
            }
            let factor = a[(r, col)];
            if factor == 0.0 {
                continue;
            }
            for c in col..N {
                let v = a[(col, c)];
                a[(r, c)] -= factor * v;
            }
            let v = b[col];
            b[r] -= factor * v;
        }
    }

    Ok(b)
}
