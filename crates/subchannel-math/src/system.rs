// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Linear System
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Assembled `A x = b` pair with a selectable solver back end.

use subchannel_types::error::{SubchannelError, SubchannelResult};

use crate::banded::BandedLu;
use crate::gmres::{gmres_solve, GmresConfig};
use crate::sparse::{CsrMatrix, TripletBuilder};

/// Which solver handles an assembled system.
#[derive(Debug, Clone)]
pub enum LinearSolverKind {
    /// Banded LU with partial pivoting.
    Direct,
    /// Jacobi-preconditioned restarted GMRES.
    Gmres(GmresConfig),
}

/// Outcome of [`LinearSystem::solve`].
#[derive(Debug, Clone)]
pub struct LinearSolution {
    pub x: Vec<f64>,
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
}

/// Matrix triplets plus right-hand side, filled by assembly kernels.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    matrix: TripletBuilder,
    rhs: Vec<f64>,
}

impl LinearSystem {
    pub fn new(n: usize) -> Self {
        LinearSystem {
            matrix: TripletBuilder::with_capacity(n, n, 8 * n),
            rhs: vec![0.0; n],
        }
    }

    pub fn dim(&self) -> usize {
        self.rhs.len()
    }

    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.matrix.add(row, col, value);
    }

    #[inline]
    pub fn add_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    /// Compress the matrix; the system is consumed.
    pub fn into_parts(self) -> SubchannelResult<(CsrMatrix, Vec<f64>)> {
        Ok((self.matrix.build()?, self.rhs))
    }

    /// Compress and solve.  `guess` seeds the iterative back end.
    pub fn solve(
        self,
        kind: &LinearSolverKind,
        guess: Option<&[f64]>,
    ) -> SubchannelResult<LinearSolution> {
        let (a, b) = self.into_parts()?;
        solve_csr(a, &b, kind, guess)
    }
}

/// Solve an already compressed system.
pub fn solve_csr(
    mut a: CsrMatrix,
    b: &[f64],
    kind: &LinearSolverKind,
    guess: Option<&[f64]>,
) -> SubchannelResult<LinearSolution> {
    let n = b.len();
    match kind {
        LinearSolverKind::Direct => {
            let x = BandedLu::factor(&a)?.solve(b)?;
            let ax = a.mul_vec(&x);
            let residual = ax
                .iter()
                .zip(b.iter())
                .map(|(p, q)| (p - q) * (p - q))
                .sum::<f64>()
                .sqrt();
            Ok(LinearSolution {
                x,
                iterations: 1,
                residual,
                converged: residual.is_finite(),
            })
        }
        LinearSolverKind::Gmres(cfg) => {
            let mut x = match guess {
                Some(g) if g.len() == n => g.to_vec(),
                Some(g) => {
                    return Err(SubchannelError::DimensionMismatch {
                        what: "initial guess".to_string(),
                        expected: n,
                        found: g.len(),
                    })
                }
                None => vec![0.0; n],
            };
            let res = gmres_solve(&mut a, b, &mut x, cfg)?;
            Ok(LinearSolution {
                x,
                iterations: res.iterations,
                residual: res.residual,
                converged: res.converged,
            })
        }
    }
}
