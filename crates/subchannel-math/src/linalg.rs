//! Dense linear algebra utilities.
//!
//! LU with partial pivoting for the small systems left after
//! eliminating the axial structure (single-level crossflow Jacobians,
//! per-pin coupling blocks).

use ndarray::{Array1, Array2};
use subchannel_types::error::{SubchannelError, SubchannelResult};

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
///
/// Consumes `a`; it holds the LU factors on return.
pub fn lu_solve(mut a: Array2<f64>, b: &[f64]) -> SubchannelResult<Vec<f64>> {
    let (n, m) = a.dim();
    if n != m {
        return Err(SubchannelError::DimensionMismatch {
            what: "dense LU columns".to_string(),
            expected: n,
            found: m,
        });
    }
    if b.len() != n {
        return Err(SubchannelError::DimensionMismatch {
            what: "dense LU rhs".to_string(),
            expected: n,
            found: b.len(),
        });
    }
    let mut x = Array1::from(b.to_vec());

    for k in 0..n {
        let mut p = k;
        let mut best = a[[k, k]].abs();
        for i in (k + 1)..n {
            if a[[i, k]].abs() > best {
                best = a[[i, k]].abs();
                p = i;
            }
        }
        if best < 1e-300 || !best.is_finite() {
            return Err(SubchannelError::LinAlg(format!(
                "singular matrix at column {k}"
            )));
        }
        if p != k {
            for j in 0..n {
                a.swap([k, j], [p, j]);
            }
            x.swap(k, p);
        }
        for i in (k + 1)..n {
            let l = a[[i, k]] / a[[k, k]];
            if l == 0.0 {
                continue;
            }
            a[[i, k]] = l;
            for j in (k + 1)..n {
                a[[i, j]] -= l * a[[k, j]];
            }
            x[i] -= l * x[k];
        }
    }

    for k in (0..n).rev() {
        let mut sum = x[k];
        for j in (k + 1)..n {
            sum -= a[[k, j]] * x[j];
        }
        x[k] = sum / a[[k, k]];
    }
    Ok(x.to_vec())
}
