// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Clad Damage Correlations
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! HT9 creep-rupture life, clad wastage and the failure probability
//! model. Stresses are in MPa, temperatures in K, times in s.

use subchannel_types::constants::KELVIN_OFFSET;

/// Lower bound of the hoop stress fed to the rupture correlations (Pa).
pub const MIN_HOOP_STRESS: f64 = 1.0e5;

/// Rupture life used when a correlation leaves its validity range.
const MIN_RUPTURE_TIME: f64 = 1e-12;

/// Ultimate strength of the transient model (MPa).
const TRANSIENT_SIGMA_REF: f64 = 730.0;

/// Activation temperature of the transient model (K), Q/R.
const TRANSIENT_Q_OVER_R: f64 = 70170.0 / 1.987;

/// Steady-state (thermal creep) rupture life.
pub fn rupture_time_steady(stress: f64, t_clad: f64) -> f64 {
    let log_s = stress.log10();
    let t1 = 3600.0 * 10f64.powf(-32.49 + 57781.0 / t_clad - 11800.0 / t_clad * log_s);
    let t2 = 3600.0 * 10f64.powf(-35.173 + 45858.0 / t_clad - 5563.0 / t_clad * log_s);
    t1.min(t2)
}

/// Transient rupture life for a clad heating rate `tcdot` (K/s).
pub fn rupture_time_transient(tcdot: f64, stress: f64, t_clad: f64) -> f64 {
    let dx0 = (2.0e-2 * (stress - 200.0)).tanh();
    let dx1 = ((tcdot - 58.0) / 17.0).tanh();
    let dx2 = (-0.5 * (1.0 + dx0)) * (0.75 * (1.0 + dx1));
    let ax2 = -34.8 + dx0 + dx2;
    let bx2 = 12.0 / (1.5 + 0.5 * dx0);
    let wx2 = ax2 + bx2 * (TRANSIENT_SIGMA_REF / stress).ln().ln();
    wx2.exp() * (TRANSIENT_Q_OVER_R / t_clad).exp()
}

/// Combined HT9 rupture life: steady model at low stress and
/// temperature, transient model at high, log-linear blend between.
pub fn rupture_time(tcdot: f64, stress: f64, t_clad: f64) -> f64 {
    const T_LOW: f64 = 973.15;
    const T_HIGH: f64 = 1042.15;
    let tc = t_clad - KELVIN_OFFSET;
    let blend = |w: f64| {
        let a = rupture_time_steady(stress, t_clad).log10();
        let b = rupture_time_transient(tcdot, stress, t_clad).log10();
        10f64.powf(w * (b - a) + a)
    };

    let life = if t_clad <= T_LOW {
        let sig_s = 670.0 - 0.70 * tc;
        let sig_t = 1370.0 - 1.7 * tc;
        if stress <= sig_s {
            rupture_time_steady(stress, t_clad)
        } else if stress >= sig_t {
            rupture_time_transient(tcdot, stress, t_clad)
        } else {
            blend((stress - sig_s) / (sig_t - sig_s))
        }
    } else if t_clad <= T_HIGH {
        let sig_t = 2000.0 - 2.6 * tc;
        let t_transition = (2000.0 - stress) / 2.6 + KELVIN_OFFSET;
        if stress >= sig_t || t_transition <= T_LOW {
            rupture_time_transient(tcdot, stress, t_clad)
        } else {
            blend((t_clad - T_LOW) / (t_transition - T_LOW))
        }
    } else {
        rupture_time_transient(tcdot, stress, t_clad)
    };
    // NaN (stress beyond the transient reference strength) maps to the floor
    life.max(MIN_RUPTURE_TIME)
}

/// Fuel/clad eutectic penetration rate (m/s) at the fuel surface temperature.
pub fn eutectic_penetration_rate(t: f64) -> f64 {
    const T_LOW: f64 = 1353.0;
    const T_HIGH: f64 = 1506.0;
    const T_PEAK: f64 = 1388.0;
    const T_ONSET: f64 = 988.15;
    if (T_LOW..=T_HIGH).contains(&t) {
        let d = t - T_PEAK;
        1.0e-6 * (922.0 + 2.9265 * d - 0.21522 * d * d + 0.0011338 * d * d * d)
    } else if (T_ONSET..T_LOW).contains(&t) {
        1.0e-6 * (22.847 - 27624.0 / t).exp()
    } else {
        0.0
    }
}

/// Outer clad wastage by sodium corrosion per step (m); not modelled.
pub fn sodium_corrosion() -> f64 {
    0.0
}

/// Thin-wall hoop stress (MPa) with a 0.1 MPa floor.
pub fn hoop_stress(p_gas: f64, p_coolant: f64, r_inner: f64, r_outer: f64) -> f64 {
    let stress = (p_gas - p_coolant) * 0.5 * (r_inner + r_outer) / (r_outer - r_inner);
    stress.max(MIN_HOOP_STRESS) * 1.0e-6
}

/// Error function, Abramowitz & Stegun 7.1.26 (|ε| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Failure probability: normal distribution over `log10(cdf)`.
pub fn failure_probability(cdf: f64, mean: f64, sigma: f64) -> f64 {
    if !(cdf > 0.0) {
        return 0.0;
    }
    let z = (cdf.log10() - mean) / sigma;
    (0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))).clamp(0.0, 1.0)
}
