// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Newton
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Newton iteration for nonlinear residual systems `F(x) = 0`.
//!
//! Small systems use a forward-difference Jacobian and dense LU.  Larger
//! ones go Jacobian-free: the directional derivative
//!
//! ```text
//! J v ≈ (F(x + ε v) − F(x)) / ε,   ε = √ε_mach (1 + ‖x‖) / ‖v‖
//! ```
//!
//! is fed to restarted GMRES.  Each step is followed by a backtracking
//! line search on `‖F‖`.

use ndarray::Array2;
use subchannel_types::error::{SubchannelError, SubchannelResult};

use crate::gmres::{gmres_solve, vec_axpy, vec_norm, GmresConfig, LinearOperator};
use crate::linalg::lu_solve;

/// Configuration for [`newton_solve`].
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    pub max_iter: usize,
    /// Stop when `‖F‖ < rtol·‖F(x₀)‖`.
    pub rtol: f64,
    /// Stop when `‖F‖ < atol`.
    pub atol: f64,
    /// Relative column step of the dense finite-difference Jacobian.
    pub fd_step: f64,
    /// Systems up to this size use the dense Jacobian.
    pub dense_limit: usize,
    /// Maximum step halvings per iteration.
    pub line_search_max: usize,
    /// Inner solver for the matrix-free path.
    pub krylov: GmresConfig,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        NewtonConfig {
            max_iter: 50,
            rtol: 1e-8,
            atol: 1e-10,
            fd_step: 1e-7,
            dense_limit: 64,
            line_search_max: 8,
            krylov: GmresConfig {
                restart: 30,
                max_iter: 300,
                rtol: 1e-6,
                atol: 1e-14,
                dtol: 1e5,
                jacobi: false,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewtonResult {
    pub iterations: usize,
    /// Final `‖F‖`.
    pub residual: f64,
    pub converged: bool,
    /// Linear iterations summed over all Newton steps.
    pub linear_iterations: usize,
}

/// Forward-difference Jacobian, one residual evaluation per column.
pub fn fd_jacobian<F>(
    residual: &mut F,
    x: &[f64],
    f0: &[f64],
    fd_step: f64,
) -> SubchannelResult<Array2<f64>>
where
    F: FnMut(&[f64]) -> SubchannelResult<Vec<f64>>,
{
    if !fd_step.is_finite() || fd_step <= 0.0 {
        return Err(SubchannelError::ConfigError(
            "newton fd_step must be finite and > 0".to_string(),
        ));
    }
    let n = x.len();
    let mut jac = Array2::zeros((f0.len(), n));
    let mut xp = x.to_vec();
    for col in 0..n {
        let h = fd_step * (1.0 + x[col].abs());
        xp[col] = x[col] + h;
        let fp = residual(&xp)?;
        for (row, (&a, &b)) in fp.iter().zip(f0.iter()).enumerate() {
            jac[[row, col]] = (a - b) / h;
        }
        xp[col] = x[col];
    }
    Ok(jac)
}

/// Matrix-free Jacobian action around a fixed base point.
struct JacobianAction<'a, F> {
    residual: &'a mut F,
    x: &'a [f64],
    f0: &'a [f64],
    x_norm: f64,
    work: Vec<f64>,
}

impl<F> LinearOperator for JacobianAction<'_, F>
where
    F: FnMut(&[f64]) -> SubchannelResult<Vec<f64>>,
{
    fn dim(&self) -> usize {
        self.x.len()
    }

    fn apply(&mut self, v: &[f64], out: &mut [f64]) -> SubchannelResult<()> {
        let v_norm = vec_norm(v);
        if v_norm < 1e-300 {
            out.iter_mut().for_each(|o| *o = 0.0);
            return Ok(());
        }
        let eps = f64::EPSILON.sqrt() * (1.0 + self.x_norm) / v_norm;
        for ((w, &xi), &vi) in self.work.iter_mut().zip(self.x.iter()).zip(v.iter()) {
            *w = xi + eps * vi;
        }
        let fp = (self.residual)(&self.work)?;
        for ((o, &a), &b) in out.iter_mut().zip(fp.iter()).zip(self.f0.iter()) {
            *o = (a - b) / eps;
        }
        Ok(())
    }
}

/// Solve `F(x) = 0` in place.
///
/// Returns `converged = false` when `max_iter` is exhausted; residual
/// evaluation errors propagate unchanged.
pub fn newton_solve<F>(
    residual: &mut F,
    x: &mut [f64],
    config: &NewtonConfig,
) -> SubchannelResult<NewtonResult>
where
    F: FnMut(&[f64]) -> SubchannelResult<Vec<f64>>,
{
    let n = x.len();
    let mut f = residual(x)?;
    if f.len() != n {
        return Err(SubchannelError::DimensionMismatch {
            what: "newton residual".to_string(),
            expected: n,
            found: f.len(),
        });
    }
    let mut f_norm = vec_norm(&f);
    let stop = (config.rtol * f_norm).max(config.atol);
    let mut linear_iterations = 0;

    for iter in 0..config.max_iter {
        if !f_norm.is_finite() {
            return Err(SubchannelError::SolverDiverged {
                iteration: iter,
                message: "newton residual is not finite".to_string(),
            });
        }
        if f_norm < stop || n == 0 {
            return Ok(NewtonResult {
                iterations: iter,
                residual: f_norm,
                converged: true,
                linear_iterations,
            });
        }

        let neg_f: Vec<f64> = f.iter().map(|v| -v).collect();
        let delta = if n <= config.dense_limit {
            let jac = fd_jacobian(residual, x, &f, config.fd_step)?;
            linear_iterations += 1;
            lu_solve(jac, &neg_f)?
        } else {
            let base = x.to_vec();
            let mut op = JacobianAction {
                residual: &mut *residual,
                x: &base,
                f0: &f,
                x_norm: vec_norm(&base),
                work: vec![0.0; n],
            };
            let mut delta = vec![0.0; n];
            let lin = gmres_solve(&mut op, &neg_f, &mut delta, &config.krylov)?;
            linear_iterations += lin.iterations;
            if !lin.converged {
                log::debug!(
                    "newton it {iter}: inner GMRES stopped at residual {:.3e}",
                    lin.residual
                );
            }
            delta
        };

        // Backtracking line search on ‖F‖
        let base = x.to_vec();
        let mut lambda = 1.0;
        let mut accepted = false;
        for _ in 0..=config.line_search_max {
            x.copy_from_slice(&base);
            vec_axpy(lambda, &delta, x);
            match residual(x) {
                Ok(trial) => {
                    let t_norm = vec_norm(&trial);
                    if t_norm.is_finite() && t_norm <= (1.0 - 1e-4 * lambda) * f_norm {
                        f = trial;
                        f_norm = t_norm;
                        accepted = true;
                        break;
                    }
                }
                Err(SubchannelError::PhysicsViolation(msg)) => {
                    log::trace!("newton line search rejected step: {msg}");
                }
                Err(e) => return Err(e),
            }
            lambda *= 0.5;
        }
        if !accepted {
            x.copy_from_slice(&base);
            log::debug!("newton it {iter}: line search stalled at ‖F‖ = {f_norm:.3e}");
            return Ok(NewtonResult {
                iterations: iter + 1,
                residual: f_norm,
                converged: f_norm < stop,
                linear_iterations,
            });
        }
        log::trace!("newton it {}: ‖F‖ = {f_norm:.3e}, λ = {lambda}", iter + 1);
    }

    Ok(NewtonResult {
        iterations: config.max_iter,
        residual: f_norm,
        converged: f_norm < stop,
        linear_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(x: &[f64]) -> SubchannelResult<Vec<f64>> {
        // Roots at (1, 2)
        Ok(vec![x[0] * x[0] - 1.0, x[0] * x[1] - 2.0])
    }

    #[test]
    fn test_newton_dense_path() {
        let mut x = vec![2.0, 3.0];
        let mut f = quadratic;
        let res = newton_solve(&mut f, &mut x, &NewtonConfig::default()).unwrap();
        assert!(res.converged);
        assert!((x[0] - 1.0).abs() < 1e-7);
        assert!((x[1] - 2.0).abs() < 1e-7);
    }

    #[test]
    fn test_newton_matrix_free_path() {
        // Discrete 1-D Bratu-like problem: -u'' + u³ = 1
        let n = 80;
        let h2 = 1.0 / ((n + 1) as f64).powi(2);
        let mut f = |u: &[f64]| -> SubchannelResult<Vec<f64>> {
            let mut r = vec![0.0; n];
            for i in 0..n {
                let left = if i > 0 { u[i - 1] } else { 0.0 };
                let right = if i + 1 < n { u[i + 1] } else { 0.0 };
                r[i] = (2.0 * u[i] - left - right) / h2 + u[i].powi(3) - 1.0;
            }
            Ok(r)
        };
        let mut u = vec![0.0; n];
        let cfg = NewtonConfig {
            dense_limit: 0,
            krylov: GmresConfig {
                restart: 80,
                max_iter: 400,
                rtol: 1e-10,
                atol: 1e-14,
                dtol: 1e5,
                jacobi: false,
            },
            ..Default::default()
        };
        let res = newton_solve(&mut f, &mut u, &cfg).unwrap();
        assert!(res.converged, "residual {}", res.residual);
        assert!(res.linear_iterations > 0);
        let r = f(&u).unwrap();
        assert!(vec_norm(&r) < 1e-6);
    }

    #[test]
    fn test_fd_step_validated() {
        let mut f = quadratic;
        let r = fd_jacobian(&mut f, &[1.0, 1.0], &[0.0, 0.0], 0.0);
        assert!(matches!(r, Err(SubchannelError::ConfigError(_))));
    }

    #[test]
    fn test_empty_system_converges() {
        let mut f = |_: &[f64]| -> SubchannelResult<Vec<f64>> { Ok(Vec::new()) };
        let mut x: Vec<f64> = Vec::new();
        let res = newton_solve(&mut f, &mut x, &NewtonConfig::default()).unwrap();
        assert!(res.converged);
        assert_eq!(res.iterations, 0);
    }
}
