// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Sparse
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Triplet assembly and compressed sparse row storage.
//!
//! Assembly kernels push `(row, col, value)` contributions in any
//! order; [`TripletBuilder::build`] sorts them and sums duplicates.

use ndarray::Array2;
use subchannel_types::error::{SubchannelError, SubchannelResult};

use crate::gmres::LinearOperator;

/// Unordered `(row, col, value)` accumulator.
#[derive(Debug, Clone)]
pub struct TripletBuilder {
    n_rows: usize,
    n_cols: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl TripletBuilder {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        TripletBuilder {
            n_rows,
            n_cols,
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(n_rows: usize, n_cols: usize, capacity: usize) -> Self {
        TripletBuilder {
            n_rows,
            n_cols,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Add `value` to entry `(row, col)`.
    ///
    /// Panics in debug builds on an out-of-range index; assembly code
    /// computes indices from the mesh so a bad index is a logic error.
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows && col < self.n_cols, "({row}, {col}) out of range");
        self.entries.push((row, col, value));
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compress into CSR, summing duplicate entries.
    pub fn build(mut self) -> SubchannelResult<CsrMatrix> {
        if let Some(&(r, c, _)) = self
            .entries
            .iter()
            .find(|(r, c, _)| *r >= self.n_rows || *c >= self.n_cols)
        {
            return Err(SubchannelError::LinAlg(format!(
                "triplet ({r}, {c}) outside {}x{} matrix",
                self.n_rows, self.n_cols
            )));
        }
        self.entries.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_ptr = vec![0usize; self.n_rows + 1];
        let mut col_idx = Vec::with_capacity(self.entries.len());
        let mut values = Vec::with_capacity(self.entries.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in self.entries {
            if last == Some((r, c)) {
                if let Some(tail) = values.last_mut() {
                    *tail += v;
                }
                continue;
            }
            col_idx.push(c);
            values.push(v);
            row_ptr[r + 1] += 1;
            last = Some((r, c));
        }
        for i in 0..self.n_rows {
            row_ptr[i + 1] += row_ptr[i];
        }

        Ok(CsrMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
            values,
        })
    }
}

/// Compressed sparse row matrix with sorted column indices per row.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterate the stored `(col, value)` pairs of one row.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (lo, hi) = (self.row_ptr[i], self.row_ptr[i + 1]);
        self.col_idx[lo..hi]
            .iter()
            .copied()
            .zip(self.values[lo..hi].iter().copied())
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (lo, hi) = (self.row_ptr[i], self.row_ptr[i + 1]);
        match self.col_idx[lo..hi].binary_search(&j) {
            Ok(pos) => self.values[lo + pos],
            Err(_) => 0.0,
        }
    }

    /// `out = A x`.
    pub fn mul_vec_into(&self, x: &[f64], out: &mut [f64]) {
        for (i, o) in out.iter_mut().enumerate().take(self.n_rows) {
            *o = self.row(i).map(|(j, v)| v * x[j]).sum();
        }
    }

    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_rows];
        self.mul_vec_into(x, &mut out);
        out
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n_rows.min(self.n_cols))
            .map(|i| self.get(i, i))
            .collect()
    }

    /// Lower and upper bandwidths `(kl, ku)` of the stored pattern.
    pub fn bandwidths(&self) -> (usize, usize) {
        let mut kl = 0;
        let mut ku = 0;
        for i in 0..self.n_rows {
            for (j, _) in self.row(i) {
                if j < i {
                    kl = kl.max(i - j);
                } else {
                    ku = ku.max(j - i);
                }
            }
        }
        (kl, ku)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut a = Array2::zeros((self.n_rows, self.n_cols));
        for i in 0..self.n_rows {
            for (j, v) in self.row(i) {
                a[[i, j]] += v;
            }
        }
        a
    }
}

impl LinearOperator for CsrMatrix {
    fn dim(&self) -> usize {
        self.n_rows
    }

    fn apply(&mut self, x: &[f64], out: &mut [f64]) -> SubchannelResult<()> {
        self.mul_vec_into(x, out);
        Ok(())
    }

    fn diagonal(&self) -> Option<Vec<f64>> {
        Some(CsrMatrix::diagonal(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_summed() {
        let mut t = TripletBuilder::new(3, 3);
        t.add(2, 0, 1.0);
        t.add(0, 0, 2.0);
        t.add(2, 0, 0.5);
        t.add(1, 2, -1.0);
        let a = t.build().unwrap();
        assert_eq!(a.nnz(), 3);
        assert_eq!(a.get(2, 0), 1.5);
        assert_eq!(a.get(0, 0), 2.0);
        assert_eq!(a.get(1, 1), 0.0);
        assert_eq!(a.diagonal(), vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mul_vec_and_bandwidth() {
        let mut t = TripletBuilder::new(4, 4);
        for i in 0..4 {
            t.add(i, i, 2.0);
            if i >= 2 {
                t.add(i, i - 2, -1.0);
            }
            if i + 1 < 4 {
                t.add(i, i + 1, 0.5);
            }
        }
        let a = t.build().unwrap();
        let y = a.mul_vec(&[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(y, vec![2.5, 2.5, 1.5, 1.0]);
        assert_eq!(a.bandwidths(), (2, 1));
    }

    #[test]
    fn test_out_of_range_triplet_rejected() {
        let mut t = TripletBuilder::new(2, 2);
        t.entries.push((5, 0, 1.0));
        assert!(matches!(t.build(), Err(SubchannelError::LinAlg(_))));
    }
}
