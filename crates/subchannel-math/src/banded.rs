// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Banded LU
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Banded LU factorisation with partial pivoting.
//!
//! Level-interleaved subchannel systems couple an unknown only to the
//! same and neighbouring axial levels, so the bandwidth is a few times
//! the per-level unknown count regardless of the number of levels.
//!
//! Row `i` is stored as a dense window over columns
//! `[i - kl, i + kl + ku]`; the extra `kl` columns hold the fill-in
//! created by row interchanges.  The multipliers of step `k` are kept
//! in place and the interchanges are replayed during the solve, in the
//! order they were made.

use subchannel_types::error::{SubchannelError, SubchannelResult};

use crate::sparse::CsrMatrix;

/// LU factors of a banded matrix.
#[derive(Debug, Clone)]
pub struct BandedLu {
    n: usize,
    kl: usize,
    ku: usize,
    width: usize,
    data: Vec<f64>,
    pivots: Vec<usize>,
}

impl BandedLu {
    #[inline]
    fn offset(&self, i: usize, j: usize) -> usize {
        // j ∈ [i - kl, i + kl + ku]
        i * self.width + (j + self.kl - i)
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.data[self.offset(i, j)]
    }

    #[inline]
    fn at_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        let o = self.offset(i, j);
        &mut self.data[o]
    }

    /// Factorise a square CSR matrix.
    pub fn factor(a: &CsrMatrix) -> SubchannelResult<Self> {
        let n = a.n_rows();
        if a.n_cols() != n {
            return Err(SubchannelError::DimensionMismatch {
                what: "banded LU columns".to_string(),
                expected: n,
                found: a.n_cols(),
            });
        }
        let (kl, ku) = a.bandwidths();
        let width = 2 * kl + ku + 1;
        let mut lu = BandedLu {
            n,
            kl,
            ku,
            width,
            data: vec![0.0; n * width],
            pivots: vec![0; n],
        };
        for i in 0..n {
            for (j, v) in a.row(i) {
                *lu.at_mut(i, j) += v;
            }
        }
        lu.eliminate()?;
        log::debug!("banded LU: n={n}, kl={kl}, ku={ku}");
        Ok(lu)
    }

    fn eliminate(&mut self) -> SubchannelResult<()> {
        let n = self.n;
        for k in 0..n {
            let last_row = (k + self.kl).min(n - 1);
            let last_col = (k + self.kl + self.ku).min(n - 1);

            let mut p = k;
            let mut best = self.at(k, k).abs();
            for i in (k + 1)..=last_row {
                let v = self.at(i, k).abs();
                if v > best {
                    best = v;
                    p = i;
                }
            }
            if best < 1e-300 || !best.is_finite() {
                return Err(SubchannelError::LinAlg(format!(
                    "singular banded matrix at column {k}"
                )));
            }
            self.pivots[k] = p;
            if p != k {
                for j in k..=last_col {
                    let ok = self.offset(k, j);
                    let op = self.offset(p, j);
                    self.data.swap(ok, op);
                }
            }

            let pivot = self.at(k, k);
            for i in (k + 1)..=last_row {
                let l = self.at(i, k) / pivot;
                *self.at_mut(i, k) = l;
                if l == 0.0 {
                    continue;
                }
                for j in (k + 1)..=last_col {
                    let u = self.at(k, j);
                    *self.at_mut(i, j) -= l * u;
                }
            }
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Solve `A x = b` with the stored factors.
    pub fn solve(&self, b: &[f64]) -> SubchannelResult<Vec<f64>> {
        let n = self.n;
        if b.len() != n {
            return Err(SubchannelError::DimensionMismatch {
                what: "banded LU rhs".to_string(),
                expected: n,
                found: b.len(),
            });
        }
        let mut x = b.to_vec();

        // Forward: replay interchanges and multipliers step by step
        for k in 0..n {
            let p = self.pivots[k];
            if p != k {
                x.swap(k, p);
            }
            let xk = x[k];
            if xk == 0.0 {
                continue;
            }
            for i in (k + 1)..=(k + self.kl).min(n.saturating_sub(1)) {
                x[i] -= self.at(i, k) * xk;
            }
        }

        // Back substitution on U
        for k in (0..n).rev() {
            let mut sum = x[k];
            for j in (k + 1)..=(k + self.kl + self.ku).min(n - 1) {
                sum -= self.at(k, j) * x[j];
            }
            x[k] = sum / self.at(k, k);
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::TripletBuilder;

    #[test]
    fn test_banded_lu_needs_pivoting() {
        // Zero leading diagonal forces a row interchange
        let mut t = TripletBuilder::new(3, 3);
        t.add(0, 1, 1.0);
        t.add(1, 0, 2.0);
        t.add(1, 1, 1.0);
        t.add(1, 2, 1.0);
        t.add(2, 1, 1.0);
        t.add(2, 2, 3.0);
        let a = t.build().unwrap();
        let lu = BandedLu::factor(&a).unwrap();
        let x_true = [1.0, -2.0, 0.5];
        let b = a.mul_vec(&x_true);
        let x = lu.solve(&b).unwrap();
        for i in 0..3 {
            assert!((x[i] - x_true[i]).abs() < 1e-12, "x[{i}] = {}", x[i]);
        }
    }

    #[test]
    fn test_banded_lu_wide_band() {
        let n = 30;
        let mut t = TripletBuilder::new(n, n);
        for i in 0..n {
            t.add(i, i, 1e-3 * (i as f64 + 1.0));
            if i >= 4 {
                t.add(i, i - 4, 1.0);
            }
            if i + 2 < n {
                t.add(i, i + 2, -0.5);
            }
        }
        let a = t.build().unwrap();
        let x_true: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        let b = a.mul_vec(&x_true);
        let x = BandedLu::factor(&a).unwrap().solve(&b).unwrap();
        let r: f64 = a
            .mul_vec(&x)
            .iter()
            .zip(b.iter())
            .map(|(ax, bi)| (ax - bi).abs())
            .fold(0.0, f64::max);
        assert!(r < 1e-8, "residual {r}");
    }

    #[test]
    fn test_singular_is_error() {
        let mut t = TripletBuilder::new(2, 2);
        t.add(0, 0, 1.0);
        t.add(0, 1, 1.0);
        t.add(1, 0, 1.0);
        t.add(1, 1, 1.0);
        let a = t.build().unwrap();
        assert!(matches!(BandedLu::factor(&a), Err(SubchannelError::LinAlg(_))));
    }
}
