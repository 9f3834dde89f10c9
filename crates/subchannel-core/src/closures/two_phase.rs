// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Two-Phase Closures
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Lockhart–Martinelli void fraction and two-phase multipliers for a
//! gas slug in liquid sodium.
//!
//! ```text
//! Xtt = ((1 − x)/x)^0.9 (ρg/ρl)^0.5 (μl/μg)^0.1
//! α   = 1 − Xtt / sqrt(Xtt² + C Xtt + 1)
//! φ²  = 1 + C/Xtt + 1/Xtt²
//! ```

use subchannel_types::constants::{CHISHOLM_C, MU_GAS_LM, MU_SODIUM_LM};

/// Floor applied to Xtt so that x → 1 stays finite.
const MIN_XTT: f64 = 1e-3;

/// Floor applied to densities and quality in the ratios.
const TINY_RATIO: f64 = 1e-16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPhaseState {
    /// Void fraction, always inside \[0, 1\]
    pub void_fraction: f64,
    /// Liquid-only friction multiplier φ²
    pub friction_multiplier: f64,
    /// Gravity head multiplier `1 − α`
    pub gravity_multiplier: f64,
    /// Martinelli parameter; infinite for single-phase liquid
    pub xtt: f64,
}

impl TwoPhaseState {
    pub fn single_phase() -> Self {
        TwoPhaseState {
            void_fraction: 0.0,
            friction_multiplier: 1.0,
            gravity_multiplier: 1.0,
            xtt: f64::INFINITY,
        }
    }
}

/// Martinelli parameter for turbulent/turbulent flow.
pub fn martinelli_parameter(
    quality: f64,
    rho_gas: f64,
    rho_liquid: f64,
    mu_liquid: f64,
    mu_gas: f64,
) -> f64 {
    let x = quality.clamp(TINY_RATIO, 1.0);
    let xtt = ((1.0 - x) / x).powf(0.9)
        * (rho_gas.max(TINY_RATIO) / rho_liquid.max(TINY_RATIO)).sqrt()
        * (mu_liquid / mu_gas).powf(0.1);
    xtt.max(MIN_XTT)
}

/// Void fraction and multipliers from the flow quality `x = ṁg/(ṁg + ṁl)`.
///
/// `x ≤ 0` is single-phase liquid.
pub fn lockhart_martinelli(
    quality: f64,
    rho_gas: f64,
    rho_liquid: f64,
    mu_liquid: f64,
    mu_gas: f64,
) -> TwoPhaseState {
    if !(quality > 0.0) {
        return TwoPhaseState::single_phase();
    }
    let xtt = martinelli_parameter(quality, rho_gas, rho_liquid, mu_liquid, mu_gas);
    let alpha = void_fraction_from_xtt(xtt);
    TwoPhaseState {
        void_fraction: alpha,
        friction_multiplier: 1.0 + CHISHOLM_C / xtt + 1.0 / (xtt * xtt),
        gravity_multiplier: 1.0 - alpha,
        xtt,
    }
}

/// Sodium/fill-gas variant with the fixed reference viscosities.
pub fn sodium_gas(quality: f64, rho_gas: f64, rho_sodium: f64) -> TwoPhaseState {
    lockhart_martinelli(quality, rho_gas, rho_sodium, MU_SODIUM_LM, MU_GAS_LM)
}

pub fn void_fraction_from_xtt(xtt: f64) -> f64 {
    if !xtt.is_finite() {
        return 0.0;
    }
    (1.0 - xtt / (xtt * xtt + CHISHOLM_C * xtt + 1.0).sqrt()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_quality_is_single_phase() {
        let s = sodium_gas(0.0, 20.0, 850.0);
        assert_eq!(s, TwoPhaseState::single_phase());
        let s = sodium_gas(-0.3, 20.0, 850.0);
        assert_eq!(s.void_fraction, 0.0);
        assert_eq!(s.friction_multiplier, 1.0);
    }

    #[test]
    fn test_void_grows_with_quality() {
        let mut last = 0.0;
        for &x in &[1e-6, 1e-4, 1e-3, 1e-2, 0.1, 0.5] {
            let s = sodium_gas(x, 20.0, 850.0);
            assert!(s.void_fraction > last, "x = {x}");
            assert!((s.gravity_multiplier - (1.0 - s.void_fraction)).abs() < 1e-15);
            last = s.void_fraction;
        }
    }

    #[test]
    fn test_pure_gas_is_finite() {
        let s = sodium_gas(1.0, 20.0, 850.0);
        assert!(s.void_fraction <= 1.0 && s.void_fraction > 0.9);
        assert!(s.friction_multiplier.is_finite());
        assert_eq!(s.xtt, MIN_XTT);
    }
}
