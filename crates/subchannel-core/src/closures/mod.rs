// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Closures
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Closure laws: pure functions of the local flow state and the bundle
//! geometry. Lattice/correlation compatibility is checked once at setup
//! by `SubchannelConfig::validate`.

pub mod friction;
pub mod mixing;
pub mod two_phase;

pub use friction::{pang, FrictionArgs, FrictionCorrelation};
pub use mixing::{MixingCorrelation, MixingInputs};
pub use two_phase::{lockhart_martinelli, TwoPhaseState};

/// Dittus–Boelter Nusselt number `0.023 Re^0.8 Pr^0.4`.
pub fn dittus_boelter(reynolds: f64, prandtl: f64) -> f64 {
    0.023 * reynolds.abs().powf(0.8) * prandtl.powf(0.4)
}

/// Liquid-metal rod-bundle Nusselt number (Mikityuk).
///
/// `Nu = 4 + 0.33 (P/D)^3.8 (Pe/100)^0.86 + 0.16 (P/D)^5`
pub fn mikityuk(pitch_over_diameter: f64, peclet: f64) -> f64 {
    let x = pitch_over_diameter;
    4.0 + 0.33 * x.powf(3.8) * (peclet.abs() / 100.0).powf(0.86) + 0.16 * x.powi(5)
}
