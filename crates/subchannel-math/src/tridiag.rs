// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Tridiag
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Thomas algorithm for tridiagonal systems.
//!
//! Used by the radial pin conduction solve, where every fuel, gap and
//! clad node couples only to its two radial neighbours.

use subchannel_types::error::{SubchannelError, SubchannelResult};

/// Solve tridiagonal system Ax = d using the Thomas algorithm.
///
/// - `a`: sub-diagonal \[n\] (a\[0\] unused)
/// - `b`: main diagonal \[n\]
/// - `c`: super-diagonal \[n\] (c\[n-1\] unused)
/// - `d`: right-hand side \[n\]
///
/// Returns `LinAlg` if a pivot vanishes. No pivoting is done, so the
/// system should be diagonally dominant.
pub fn thomas_solve(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> SubchannelResult<Vec<f64>> {
    let n = d.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    for (what, len) in [("sub-diagonal", a.len()), ("diagonal", b.len()), ("super-diagonal", c.len())] {
        if len != n {
            return Err(SubchannelError::DimensionMismatch {
                what: what.to_string(),
                expected: n,
                found: len,
            });
        }
    }

    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    if b[0].abs() < 1e-300 {
        return Err(SubchannelError::LinAlg(
            "zero pivot in row 0 of tridiagonal system".to_string(),
        ));
    }
    c_prime[0] = c[0] / b[0];
    d_prime[0] = d[0] / b[0];

    for i in 1..n {
        let den = b[i] - a[i] * c_prime[i - 1];
        if den.abs() < 1e-300 || !den.is_finite() {
            return Err(SubchannelError::LinAlg(format!(
                "zero pivot in row {i} of tridiagonal system"
            )));
        }
        if i < n - 1 {
            c_prime[i] = c[i] / den;
        }
        d_prime[i] = (d[i] - a[i] * d_prime[i - 1]) / den;
    }

    // Back substitution
    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thomas_identity() {
        let n = 5;
        let a = vec![0.0; n];
        let b = vec![1.0; n];
        let c = vec![0.0; n];
        let d = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let x = thomas_solve(&a, &b, &c, &d).unwrap();
        for i in 0..n {
            assert!((x[i] - d[i]).abs() < 1e-12, "x[{i}] should equal d[{i}]");
        }
    }

    #[test]
    fn test_thomas_conduction_pattern() {
        // Cylindrical conduction with a convective last row
        let a = vec![0.0, -2.0, -3.0, -4.0];
        let b = vec![2.0, 5.0, 7.0, 4.0 + 10.0];
        let c = vec![-2.0, -3.0, -4.0, 0.0];
        let d = vec![1.0, 1.0, 1.0, 10.0 * 300.0];
        let x = thomas_solve(&a, &b, &c, &d).unwrap();

        let ax = [
            b[0] * x[0] + c[0] * x[1],
            a[1] * x[0] + b[1] * x[1] + c[1] * x[2],
            a[2] * x[1] + b[2] * x[2] + c[2] * x[3],
            a[3] * x[2] + b[3] * x[3],
        ];
        for i in 0..4 {
            assert!((ax[i] - d[i]).abs() < 1e-9, "Ax[{i}] = {}, expected {}", ax[i], d[i]);
        }
        // Heat flows outward, so temperatures decrease with radius
        assert!(x[0] > x[1] && x[1] > x[2] && x[2] > x[3] && x[3] > 300.0);
    }

    #[test]
    fn test_thomas_zero_pivot() {
        let r = thomas_solve(&[0.0, 1.0], &[0.0, 1.0], &[1.0, 0.0], &[1.0, 1.0]);
        assert!(matches!(r, Err(SubchannelError::LinAlg(_))));
    }

    #[test]
    fn test_thomas_length_mismatch() {
        let r = thomas_solve(&[0.0], &[1.0, 1.0], &[0.0, 0.0], &[1.0, 1.0]);
        assert!(matches!(r, Err(SubchannelError::DimensionMismatch { .. })));
    }
}
