// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — GMRES
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Restarted GMRES(m) Krylov subspace solver over an abstract operator.
//!
//! GMRES (Generalised Minimal RESidual) builds an orthonormal Krylov
//! basis via Arnoldi iteration with modified Gram-Schmidt, then solves
//! the projected least-squares problem using Givens rotations on the
//! upper Hessenberg matrix.  When the basis reaches size `m` without
//! convergence the solver restarts from the current approximate
//! solution.
//!
//! The operator is anything implementing [`LinearOperator`]: an
//! assembled [`crate::sparse::CsrMatrix`] or a matrix-free Jacobian
//! action (see [`crate::newton`]).  When the operator exposes its
//! diagonal, a left Jacobi preconditioner `M⁻¹ = diag(A)⁻¹` is applied
//! and the convergence test acts on the preconditioned residual.

use subchannel_types::error::{SubchannelError, SubchannelResult};

// ───────────────────────────── operator seam ─────────────────────────

/// A square linear map `x ↦ A x`.
pub trait LinearOperator {
    /// Number of unknowns.
    fn dim(&self) -> usize;

    /// Write `A x` into `out`.  Matrix-free operators may evaluate a
    /// residual here, hence the fallible signature and `&mut self`.
    fn apply(&mut self, x: &[f64], out: &mut [f64]) -> SubchannelResult<()>;

    /// Diagonal of `A`, when cheaply available, for Jacobi scaling.
    fn diagonal(&self) -> Option<Vec<f64>> {
        None
    }
}

// ───────────────────────────── configuration ─────────────────────────

/// Configuration for the GMRES(m) solver.
///
/// Convergence: `‖r‖ < max(rtol·‖b‖, atol)`.  Divergence:
/// `‖r‖ > dtol·‖b‖`.  Norms are of the preconditioned residual.
#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// Krylov subspace dimension before restart (default: 30).
    pub restart: usize,
    /// Maximum number of inner iterations summed over restarts (default: 10000).
    pub max_iter: usize,
    /// Relative tolerance (default: 1e-6).
    pub rtol: f64,
    /// Absolute tolerance (default: 1e-6).
    pub atol: f64,
    /// Divergence tolerance (default: 1e5).
    pub dtol: f64,
    /// Apply the Jacobi preconditioner when the operator has a diagonal.
    pub jacobi: bool,
}

impl Default for GmresConfig {
    fn default() -> Self {
        GmresConfig {
            restart: 30,
            max_iter: 10_000,
            rtol: 1e-6,
            atol: 1e-6,
            dtol: 1e5,
            jacobi: true,
        }
    }
}

/// Result of a GMRES solve.
#[derive(Debug, Clone)]
pub struct GmresResult {
    /// Total number of operator applications inside Arnoldi (inner
    /// iterations summed over all restarts).
    pub iterations: usize,
    /// Final L2 norm of the (preconditioned) residual.
    pub residual: f64,
    /// Whether convergence was achieved.
    pub converged: bool,
}

// ───────────────────────── BLAS-like helpers ─────────────────────────

/// Euclidean (L2) norm of a slice.
#[inline]
pub fn vec_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Dot product.
#[inline]
pub fn vec_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// `y = y + alpha * x` (axpy).
#[inline]
pub fn vec_axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// `y = alpha * x` (scale-copy).
#[inline]
fn vec_scale(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi = alpha * xi;
    }
}

/// `out = a - b`.
#[inline]
fn vec_sub(a: &[f64], b: &[f64], out: &mut [f64]) {
    for ((oi, &ai), &bi) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
        *oi = ai - bi;
    }
}

// ───────────────────── Givens rotation helpers ──────────────────────

/// A single Givens rotation storing (c, s) such that
/// ```text
/// | c  s | | a |   | r |
/// |-s  c | | b | = | 0 |
/// ```
#[derive(Clone, Copy)]
struct GivensRotation {
    c: f64,
    s: f64,
}

impl GivensRotation {
    /// Compute the rotation that zeroes `b` in (a, b).
    fn compute(a: f64, b: f64) -> Self {
        if b.abs() < 1e-300 {
            GivensRotation { c: 1.0, s: 0.0 }
        } else if b.abs() > a.abs() {
            let tau = -a / b;
            let s = 1.0 / (1.0 + tau * tau).sqrt();
            let c = s * tau;
            GivensRotation { c, s }
        } else {
            let tau = -b / a;
            let c = 1.0 / (1.0 + tau * tau).sqrt();
            let s = c * tau;
            GivensRotation { c, s }
        }
    }

    /// Apply this rotation to (a, b) in place.
    #[inline]
    fn apply(&self, a: &mut f64, b: &mut f64) {
        let ta = *a;
        let tb = *b;
        *a = self.c * ta - self.s * tb;
        *b = self.s * ta + self.c * tb;
    }
}

// ────────────────────────── Jacobi preconditioner ───────────────────

/// Inverse diagonal; zero entries fall back to identity scaling.
fn jacobi_inverse(diag: &[f64]) -> Vec<f64> {
    diag.iter()
        .map(|&d| if d.abs() > 1e-300 { 1.0 / d } else { 1.0 })
        .collect()
}

#[inline]
fn precondition(inv_diag: Option<&[f64]>, r: &[f64], out: &mut [f64]) {
    match inv_diag {
        Some(inv) => {
            for ((oi, &ri), &di) in out.iter_mut().zip(r.iter()).zip(inv.iter()) {
                *oi = ri * di;
            }
        }
        None => out.copy_from_slice(r),
    }
}

// ─────────────────────────── main solver ─────────────────────────────

/// Solve `A x = b` using restarted GMRES(m).
///
/// `x` is the initial guess on entry and the solution on exit.  Hitting
/// the iteration cap is not an error: the result carries
/// `converged = false`.  A non-finite residual is reported as
/// `SolverDiverged`.
///
/// # Algorithm
///
/// ```text
/// for each restart cycle:
///   r = M⁻¹ (b - A·x)
///   beta = ||r||₂
///   V[0] = r / beta
///   for j = 0 .. m-1:             (Arnoldi)
///     w = M⁻¹ A V[j]
///     for i = 0 .. j:             (modified Gram-Schmidt)
///       H[i,j] = <w, V[i]>
///       w -= H[i,j] V[i]
///     H[j+1,j] = ||w||₂
///     V[j+1]   = w / H[j+1,j]
///     apply previous Givens to H[:,j]
///     compute new Givens to zero H[j+1,j]
///     if |g[j+1]| below tolerance: break
///   solve upper triangular system for y
///   x += V · y
/// ```
pub fn gmres_solve<A: LinearOperator + ?Sized>(
    op: &mut A,
    b: &[f64],
    x: &mut [f64],
    config: &GmresConfig,
) -> SubchannelResult<GmresResult> {
    let n = op.dim();
    if b.len() != n || x.len() != n {
        return Err(SubchannelError::DimensionMismatch {
            what: "GMRES vector".to_string(),
            expected: n,
            found: if b.len() != n { b.len() } else { x.len() },
        });
    }
    if n == 0 {
        return Ok(GmresResult {
            iterations: 0,
            residual: 0.0,
            converged: true,
        });
    }

    let m = config.restart.max(1).min(n);
    let inv_diag = if config.jacobi {
        op.diagonal().map(|d| jacobi_inverse(&d))
    } else {
        None
    };
    let inv = inv_diag.as_deref();

    let mut av = vec![0.0; n];
    let mut r_raw = vec![0.0; n];
    let mut r = vec![0.0; n];

    let mut pb = vec![0.0; n];
    precondition(inv, b, &mut pb);
    let b_norm = vec_norm(&pb);
    let stop_tol = (config.rtol * b_norm).max(config.atol);
    let div_tol = config.dtol * b_norm.max(1e-300);

    let mut total_iters: usize = 0;
    let mut residual;

    // ───── outer restart loop ─────
    loop {
        op.apply(x, &mut av)?;
        vec_sub(b, &av, &mut r_raw);
        precondition(inv, &r_raw, &mut r);
        let beta = vec_norm(&r);
        residual = beta;

        if !beta.is_finite() {
            return Err(SubchannelError::SolverDiverged {
                iteration: total_iters,
                message: "GMRES residual is not finite".to_string(),
            });
        }
        if beta < stop_tol {
            return Ok(GmresResult {
                iterations: total_iters,
                residual,
                converged: true,
            });
        }
        if beta > div_tol && total_iters > 0 {
            log::warn!("GMRES diverged: residual {beta:.3e} > dtol·‖b‖ {div_tol:.3e}");
            return Ok(GmresResult {
                iterations: total_iters,
                residual,
                converged: false,
            });
        }
        if total_iters >= config.max_iter {
            return Ok(GmresResult {
                iterations: total_iters,
                residual,
                converged: false,
            });
        }

        // Krylov basis V[0..m+1], each of length n
        let mut v_basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        {
            let mut v0 = vec![0.0; n];
            vec_scale(1.0 / beta, &r, &mut v0);
            v_basis.push(v0);
        }

        // Upper Hessenberg matrix H[(m+1) x m] stored column-major
        // H[i][j] => h_store[j * (m+1) + i]
        let h_rows = m + 1;
        let mut h_store = vec![0.0; h_rows * m];
        let mut givens: Vec<GivensRotation> = Vec::with_capacity(m);
        let mut g = vec![0.0; m + 1];
        g[0] = beta;

        let mut inner_iters: usize = 0;
        let mut w = vec![0.0; n];

        // ───── Arnoldi iteration ─────
        for j in 0..m {
            inner_iters = j + 1;
            total_iters += 1;

            op.apply(&v_basis[j], &mut av)?;
            precondition(inv, &av, &mut w);

            // Modified Gram-Schmidt orthogonalisation
            for i in 0..=j {
                let h_ij = vec_dot(&w, &v_basis[i]);
                h_store[j * h_rows + i] = h_ij;
                vec_axpy(-h_ij, &v_basis[i], &mut w);
            }

            let h_jp1_j = vec_norm(&w);
            h_store[j * h_rows + (j + 1)] = h_jp1_j;

            if h_jp1_j > 1e-300 {
                let mut vj1 = vec![0.0; n];
                vec_scale(1.0 / h_jp1_j, &w, &mut vj1);
                v_basis.push(vj1);
            } else {
                // Happy breakdown: residual is zero in the Krylov subspace
                v_basis.push(vec![0.0; n]);
            }

            for (i, rot) in givens.iter().enumerate() {
                let a_ptr = j * h_rows + i;
                let b_ptr = j * h_rows + i + 1;
                let mut ha = h_store[a_ptr];
                let mut hb = h_store[b_ptr];
                rot.apply(&mut ha, &mut hb);
                h_store[a_ptr] = ha;
                h_store[b_ptr] = hb;
            }

            let rot =
                GivensRotation::compute(h_store[j * h_rows + j], h_store[j * h_rows + (j + 1)]);
            {
                let a_ptr = j * h_rows + j;
                let b_ptr = j * h_rows + (j + 1);
                let mut ha = h_store[a_ptr];
                let mut hb = h_store[b_ptr];
                rot.apply(&mut ha, &mut hb);
                h_store[a_ptr] = ha;
                h_store[b_ptr] = hb;
            }
            {
                let mut ga = g[j];
                let mut gb = g[j + 1];
                rot.apply(&mut ga, &mut gb);
                g[j] = ga;
                g[j + 1] = gb;
            }
            givens.push(rot);

            let res_est = g[j + 1].abs();
            log::trace!("GMRES it {total_iters}: residual estimate {res_est:.3e}");

            if res_est < stop_tol || h_jp1_j < 1e-300 || total_iters >= config.max_iter {
                break;
            }
        }

        // ───── solve the upper triangular system H y = g ─────
        let k = inner_iters;
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = g[i];
            for jj in (i + 1)..k {
                sum -= h_store[jj * h_rows + i] * y[jj];
            }
            let diag = h_store[i * h_rows + i];
            y[i] = if diag.abs() > 1e-300 { sum / diag } else { 0.0 };
        }

        // ───── update solution: x = x + V * y ─────
        for i in 0..k {
            vec_axpy(y[i], &v_basis[i], x);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dense row-major operator for tests.
    struct Dense {
        n: usize,
        a: Vec<f64>,
    }

    impl LinearOperator for Dense {
        fn dim(&self) -> usize {
            self.n
        }

        fn apply(&mut self, x: &[f64], out: &mut [f64]) -> SubchannelResult<()> {
            for i in 0..self.n {
                out[i] = (0..self.n).map(|j| self.a[i * self.n + j] * x[j]).sum();
            }
            Ok(())
        }

        fn diagonal(&self) -> Option<Vec<f64>> {
            Some((0..self.n).map(|i| self.a[i * self.n + i]).collect())
        }
    }

    fn convection_diffusion(n: usize) -> Dense {
        // Non-symmetric: upwinded advection on top of a Laplacian
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            a[i * n + i] = 3.0;
            if i > 0 {
                a[i * n + i - 1] = -1.8;
            }
            if i + 1 < n {
                a[i * n + i + 1] = -0.7;
            }
        }
        Dense { n, a }
    }

    #[test]
    fn test_gmres_solves_nonsymmetric() {
        let n = 40;
        let mut op = convection_diffusion(n);
        let x_true: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin()).collect();
        let mut b = vec![0.0; n];
        op.apply(&x_true, &mut b).unwrap();

        let mut x = vec![0.0; n];
        let cfg = GmresConfig {
            restart: 10,
            rtol: 1e-12,
            atol: 1e-14,
            ..Default::default()
        };
        let res = gmres_solve(&mut op, &b, &mut x, &cfg).unwrap();
        assert!(res.converged, "GMRES should converge, residual {}", res.residual);
        for i in 0..n {
            assert!((x[i] - x_true[i]).abs() < 1e-8, "x[{i}] = {} vs {}", x[i], x_true[i]);
        }
    }

    #[test]
    fn test_gmres_zero_rhs_is_immediate() {
        let mut op = convection_diffusion(8);
        let mut x = vec![0.0; 8];
        let res = gmres_solve(&mut op, &[0.0; 8], &mut x, &GmresConfig::default()).unwrap();
        assert!(res.converged);
        assert_eq!(res.iterations, 0);
    }

    #[test]
    fn test_gmres_iteration_cap_reports_unconverged() {
        let mut op = convection_diffusion(50);
        let b = vec![1.0; 50];
        let mut x = vec![0.0; 50];
        let cfg = GmresConfig {
            restart: 2,
            max_iter: 3,
            rtol: 1e-14,
            atol: 1e-16,
            ..Default::default()
        };
        let res = gmres_solve(&mut op, &b, &mut x, &cfg).unwrap();
        assert!(!res.converged);
        assert!(res.iterations <= 3);
    }

    #[test]
    fn test_gmres_dimension_mismatch() {
        let mut op = convection_diffusion(4);
        let mut x = vec![0.0; 3];
        let r = gmres_solve(&mut op, &[1.0; 4], &mut x, &GmresConfig::default());
        assert!(matches!(r, Err(SubchannelError::DimensionMismatch { .. })));
    }
}
