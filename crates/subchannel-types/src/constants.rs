// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Gravitational acceleration (m/s²), acting against the axial flow direction.
pub const GRAVITY: f64 = 9.81;

/// Universal gas constant (J/mol/K)
pub const R_GAS: f64 = 8.314;

/// Offset between Kelvin and Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

/// Diagonal nudge used when a linear system row would otherwise be empty.
pub const TINY: f64 = 1e-16;

/// Relative tolerance of the radial conduction fixed point.
pub const PIN_CONDUCTION_TOL: f64 = 1e-5;

/// Iteration cap of the radial conduction fixed point. Hitting it is fatal.
pub const PIN_CONDUCTION_MAXIT: usize = 1000;

/// Martinelli–Chisholm constant for turbulent/turbulent two-phase flow.
pub const CHISHOLM_C: f64 = 20.0;

/// Sodium viscosity used in the Lockhart–Martinelli parameter (Pa·s).
pub const MU_SODIUM_LM: f64 = 2.4e-4;

/// Fission/fill gas viscosity used in the Lockhart–Martinelli parameter (Pa·s).
pub const MU_GAS_LM: f64 = 3.0e-5;

/// Laminar/turbulent blending exponent of the Cheng–Todreas transition regime.
pub const CT_TRANSITION_LAMBDA: i32 = 7;
