// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Fluid Properties
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coolant equation of state.
//!
//! Every property is a pure function of absolute pressure (Pa) and
//! temperature (K), or of pressure and specific enthalpy for the inverse.

use subchannel_types::config::FluidConfig;

/// Sodium critical temperature (K), Fink & Leibowitz.
const NA_T_CRIT: f64 = 2503.7;

/// Lower bound of the sodium enthalpy inversion (K).
const NA_T_MIN: f64 = 371.0;

/// Upper bound of the sodium enthalpy inversion (K).
const NA_T_MAX: f64 = 2000.0;

/// Newton iterations allowed for `T(h)`.
const T_FROM_H_MAXIT: usize = 50;

/// Equation-of-state provider used by the assembly and the driver.
pub trait FluidProperties: Send + Sync + std::fmt::Debug {
    fn rho_from_p_t(&self, p: f64, t: f64) -> f64;
    fn h_from_p_t(&self, p: f64, t: f64) -> f64;
    fn t_from_p_h(&self, p: f64, h: f64) -> f64;
    fn k_from_p_t(&self, p: f64, t: f64) -> f64;
    fn cp_from_p_t(&self, p: f64, t: f64) -> f64;
    fn mu_from_p_t(&self, p: f64, t: f64) -> f64;
}

/// Liquid sodium, saturated-liquid correlations. Pressure dependence is
/// neglected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sodium;

impl FluidProperties for Sodium {
    fn rho_from_p_t(&self, _p: f64, t: f64) -> f64 {
        let x = 1.0 - t / NA_T_CRIT;
        219.0 + 275.32 * x + 511.58 * x.sqrt()
    }

    fn h_from_p_t(&self, _p: f64, t: f64) -> f64 {
        1.0e3 * (-365.77 + 1.6582 * t - 4.2395e-4 * t * t + 1.4847e-7 * t * t * t + 2992.6 / t)
    }

    fn t_from_p_h(&self, p: f64, h: f64) -> f64 {
        // h(T) is monotone over the liquid range; Newton from a linear guess
        let mut t = (NA_T_MIN + (h - self.h_from_p_t(p, NA_T_MIN)) / 1300.0).clamp(NA_T_MIN, NA_T_MAX);
        for _ in 0..T_FROM_H_MAXIT {
            let r = self.h_from_p_t(p, t) - h;
            let dt = r / self.cp_from_p_t(p, t);
            t = (t - dt).clamp(NA_T_MIN, NA_T_MAX);
            if dt.abs() < 1e-10 * t {
                break;
            }
        }
        t
    }

    fn k_from_p_t(&self, _p: f64, t: f64) -> f64 {
        124.67 - 0.11381 * t + 5.5226e-5 * t * t - 1.1842e-8 * t * t * t
    }

    fn cp_from_p_t(&self, _p: f64, t: f64) -> f64 {
        1658.2 - 0.84790 * t + 4.4541e-4 * t * t - 2.9926e6 / (t * t)
    }

    fn mu_from_p_t(&self, _p: f64, t: f64) -> f64 {
        (-6.4406 - 0.3958 * t.ln() + 556.835 / t).exp()
    }
}

/// Constant-property fluid with `h = cp (T − t_ref)`.
#[derive(Debug, Clone, Copy)]
pub struct ConstantFluid {
    pub rho: f64,
    pub cp: f64,
    pub k: f64,
    pub mu: f64,
    pub t_ref: f64,
}

impl FluidProperties for ConstantFluid {
    fn rho_from_p_t(&self, _p: f64, _t: f64) -> f64 {
        self.rho
    }
    fn h_from_p_t(&self, _p: f64, t: f64) -> f64 {
        self.cp * (t - self.t_ref)
    }
    fn t_from_p_h(&self, _p: f64, h: f64) -> f64 {
        self.t_ref + h / self.cp
    }
    fn k_from_p_t(&self, _p: f64, _t: f64) -> f64 {
        self.k
    }
    fn cp_from_p_t(&self, _p: f64, _t: f64) -> f64 {
        self.cp
    }
    fn mu_from_p_t(&self, _p: f64, _t: f64) -> f64 {
        self.mu
    }
}

/// Instantiate the configured fluid.
pub fn from_config(config: &FluidConfig) -> Box<dyn FluidProperties> {
    match *config {
        FluidConfig::Sodium => Box::new(Sodium),
        FluidConfig::Constant {
            rho,
            cp,
            k,
            mu,
            t_ref,
        } => Box::new(ConstantFluid {
            rho,
            cp,
            k,
            mu,
            t_ref,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sodium_reference_values() {
        let na = Sodium;
        // ~856 kg/m³ and ~0.3 mPa·s near 700 K
        let rho = na.rho_from_p_t(1e5, 700.0);
        assert!((rho - 852.0).abs() < 10.0, "rho = {rho}");
        let mu = na.mu_from_p_t(1e5, 700.0);
        assert!(mu > 2.0e-4 && mu < 3.5e-4, "mu = {mu}");
        let k = na.k_from_p_t(1e5, 700.0);
        assert!(k > 60.0 && k < 75.0, "k = {k}");
    }

    #[test]
    fn test_sodium_enthalpy_inverse() {
        let na = Sodium;
        for &t in &[400.0, 628.15, 800.0, 1100.0] {
            let h = na.h_from_p_t(1e5, t);
            let back = na.t_from_p_h(1e5, h);
            assert!((back - t).abs() < 1e-6, "T = {t}, back = {back}");
        }
    }

    #[test]
    fn test_cp_is_enthalpy_slope() {
        let na = Sodium;
        let t = 700.0;
        let fd = (na.h_from_p_t(1e5, t + 0.5) - na.h_from_p_t(1e5, t - 0.5)) / 1.0;
        assert!((fd - na.cp_from_p_t(1e5, t)).abs() < 1e-3);
    }

    #[test]
    fn test_constant_fluid() {
        let f = from_config(&FluidConfig::Constant {
            rho: 1000.0,
            cp: 4000.0,
            k: 0.6,
            mu: 1e-3,
            t_ref: 273.15,
        });
        assert_eq!(f.rho_from_p_t(1e5, 350.0), 1000.0);
        let h = f.h_from_p_t(1e5, 300.0);
        assert!((f.t_from_p_h(1e5, h) - 300.0).abs() < 1e-12);
    }
}
