// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Turbulent Mixing
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Turbulent mixing coefficient β of a gap.
//!
//! The turbulent crossflow is `W'ij = β · Ḡij · Sij` with `Ḡij` the
//! average axial mass flux of the two channels.

use std::f64::consts::PI;

use subchannel_types::config::{ClosureConfig, MixingModel};

use crate::mesh::{wire_cos_theta, SubchannelMesh};

/// Kim–Chung empirical constant γ.
const KC_GAMMA: f64 = 20.0;

/// Rehme circular-tube friction law `f = a Re^(−b)`.
const KC_FRICTION_A: f64 = 0.18;
const KC_FRICTION_B: f64 = 0.2;

/// Lower bound on the gap Reynolds number.
const MIN_REYNOLDS: f64 = 1.0;

/// Averaged gap state handed to [`MixingCorrelation::beta`].
#[derive(Debug, Clone, Copy)]
pub struct MixingInputs {
    /// In/out averaged mass flux of the two channels (kg/m²/s)
    pub mass_flux: f64,
    /// `4 (Si + Sj) / (Pw_i + Pw_j)` (m)
    pub hydraulic_diameter: f64,
    /// Area-weighted viscosity (Pa·s)
    pub viscosity: f64,
    /// Area-weighted conductivity (W/m/K)
    pub conductivity: f64,
    /// Area-weighted heat capacity (J/kg/K)
    pub heat_capacity: f64,
    pub gap_width: f64,
    /// Channel centroid distance (m)
    pub centroid_distance: f64,
}

impl MixingInputs {
    pub fn reynolds(&self) -> f64 {
        (self.mass_flux.abs() * self.hydraulic_diameter / self.viscosity).max(MIN_REYNOLDS)
    }
}

/// Mixing model bound to the bundle geometry.
#[derive(Debug, Clone)]
pub enum MixingCorrelation {
    Constant { beta: f64 },
    /// Wire-sweep mixing of wire-wrapped triangular bundles.
    ChengTodreas {
        /// `sqrt(Ar1 / A1') · tan θ`
        geometric: f64,
        cm_laminar: f64,
        cm_turbulent: f64,
        re_laminar: f64,
        re_turbulent: f64,
    },
    /// Kim–Chung bare-bundle model.
    KimChung { pin_diameter: f64 },
}

impl MixingCorrelation {
    pub fn new(config: &ClosureConfig, mesh: &SubchannelMesh) -> Self {
        match config.mixing {
            MixingModel::Constant => MixingCorrelation::Constant { beta: config.beta },
            MixingModel::KimChung => MixingCorrelation::KimChung {
                pin_diameter: mesh.pin_diameter(),
            },
            MixingModel::ChengTodreas => {
                let p = mesh.pitch();
                let d = mesh.pin_diameter();
                let wd = mesh.wire_diameter();
                let cos_t = wire_cos_theta(d, wd, mesh.wire_lead_length());
                let tan_t = (1.0 - cos_t * cos_t).sqrt() / cos_t;
                let ar1 = PI * (d + wd) * wd / 6.0;
                let a1 = 3f64.sqrt() / 4.0 * p * p - PI * d * d / 8.0;
                let p_over_d = p / d;
                let tight = p_over_d < 1.1;
                let scale = ((p - d) / d).powf(-0.5);
                let (cm_t, cm_l) = if tight { (0.1, 0.055) } else { (0.14, 0.077) };
                MixingCorrelation::ChengTodreas {
                    geometric: (ar1 / a1).sqrt() * tan_t,
                    cm_laminar: cm_l * scale,
                    cm_turbulent: cm_t * scale,
                    re_laminar: 320.0 * 10f64.powf(p_over_d - 1.0),
                    re_turbulent: 1.0e4 * 10f64.powf(0.7 * (p_over_d - 1.0)),
                }
            }
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, MixingCorrelation::Constant { .. })
    }

    pub fn beta(&self, inputs: &MixingInputs) -> f64 {
        match *self {
            MixingCorrelation::Constant { beta } => beta,
            MixingCorrelation::ChengTodreas {
                geometric,
                cm_laminar,
                cm_turbulent,
                re_laminar,
                re_turbulent,
            } => {
                let re = inputs.reynolds();
                let cm = if re <= re_laminar {
                    cm_laminar
                } else if re >= re_turbulent {
                    cm_turbulent
                } else {
                    let psi = (re / re_laminar).ln() / (re_turbulent / re_laminar).ln();
                    cm_laminar + (cm_turbulent - cm_laminar) * psi.powf(2.0 / 3.0)
                };
                cm * geometric
            }
            MixingCorrelation::KimChung { pin_diameter } => kim_chung(inputs, pin_diameter),
        }
    }
}

fn kim_chung(inputs: &MixingInputs, pin_diameter: f64) -> f64 {
    let re = inputs.reynolds();
    let gap = inputs.gap_width;
    let dh = inputs.hydraulic_diameter;
    let f = KC_FRICTION_A * re.powf(-KC_FRICTION_B);
    let pr = inputs.viscosity * inputs.heat_capacity / inputs.conductivity;
    let pr_t = pr * (re / KC_GAMMA) * (f / 8.0).sqrt();
    // axial length scale equals the centroid distance (the pitch on square lattices)
    let l_x = inputs.centroid_distance;
    let lambda = gap / l_x;
    let a_x = 1.0 - 2.0 * lambda * lambda / PI;
    let z_fp_over_d = (2.0 * l_x / pin_diameter)
        * (1.0 + (-0.5 * lambda.ln() + 0.5 * 4f64.ln() - 0.25) * lambda * lambda);
    let strouhal = 1.0 / (0.822 * (gap / pin_diameter) + 0.144);
    let freq_factor = 2.0 / (KC_GAMMA * KC_GAMMA) * (KC_FRICTION_A / 8.0).sqrt() * (dh / gap);
    let rod_mixing = lambda / pr_t;
    let axial_mixing = a_x * z_fp_over_d * strouhal;
    freq_factor * (rod_mixing + axial_mixing) * re.powf(-KC_FRICTION_B / 2.0)
}
