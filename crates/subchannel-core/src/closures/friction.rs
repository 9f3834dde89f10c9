// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Friction Factor Correlations
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Darcy friction factor for rod-bundle subchannels.
//!
//! Cheng–Todreas (upgraded, triangular with or without wire wrap) and
//! Todreas–Kazimi (square, bare) share the laminar/turbulent blend
//!
//! ```text
//! f = f_L (1 − ψ)^(1/3) (1 − ψ^λ) + f_T ψ^(1/3),   ψ = ln(Re/Re_L) / ln(Re_T/Re_L)
//! ```
//!
//! with λ = 7. Pang is a smooth-tube piecewise power law.

use std::f64::consts::PI;

use subchannel_types::config::FrictionModel;
use subchannel_types::constants::CT_TRANSITION_LAMBDA;

use crate::mesh::{wire_cos_theta, ChannelType, Lattice, SubchannelMesh};

/// Reynolds numbers below this are evaluated at this value.
const MIN_REYNOLDS: f64 = 1.0;

/// P/D boundary between the tight and open coefficient sets.
const PITCH_RATIO_SPLIT: f64 = 1.1;

/// Laminar `(a, b1, b2)` and turbulent `(a, b1, b2)` bare-bundle coefficients.
type CoefficientSet = ([f64; 3], [f64; 3]);

/// Upgraded Cheng–Todreas bare-bundle constants, triangular lattice.
fn cheng_todreas_coefficients(kind: ChannelType, tight: bool) -> CoefficientSet {
    match (kind, tight) {
        (ChannelType::Center, true) => ([26.0, 888.2, -3334.0], [0.09378, 1.398, -8.664]),
        (ChannelType::Center, false) => ([62.97, 216.9, -190.2], [0.1458, 0.03632, -0.03333]),
        (ChannelType::Edge, true) => ([26.18, 554.5, -1480.0], [0.09377, 0.8732, -3.341]),
        (ChannelType::Edge, false) => ([44.4, 256.7, -267.6], [0.1430, 0.04199, -0.04428]),
        (ChannelType::Corner, true) => ([26.98, 1636.0, -10050.0], [0.1004, 1.625, -11.85]),
        (ChannelType::Corner, false) => ([87.26, 38.59, -55.12], [0.1499, 0.006706, -0.0009567]),
    }
}

/// Todreas–Kazimi bare-bundle constants, square lattice.
fn todreas_kazimi_coefficients(kind: ChannelType, tight: bool) -> CoefficientSet {
    match (kind, tight) {
        (ChannelType::Center, true) => ([26.37, 374.2, -493.9], [0.09423, 0.5806, -1.239]),
        (ChannelType::Center, false) => ([35.55, 263.7, -190.2], [0.1339, 0.09059, -0.09926]),
        (ChannelType::Edge, true) => ([26.18, 554.5, -1480.0], [0.09377, 0.8732, -3.341]),
        (ChannelType::Edge, false) => ([44.40, 256.7, -267.6], [0.1430, 0.04199, -0.04428]),
        (ChannelType::Corner, true) => ([28.62, 715.9, -2807.0], [0.09755, 1.127, -6.304]),
        (ChannelType::Corner, false) => ([58.83, 160.7, -203.5], [0.1452, 0.02681, -0.03411]),
    }
}

fn quadratic(c: [f64; 3], x: f64) -> f64 {
    c[0] + c[1] * x + c[2] * x * x
}

/// Local flow state handed to [`FrictionCorrelation::friction_factor`].
#[derive(Debug, Clone, Copy)]
pub struct FrictionArgs {
    pub reynolds: f64,
    pub channel: ChannelType,
    /// Local flow area (m²)
    pub flow_area: f64,
    /// Local wetted perimeter (m)
    pub wetted_perimeter: f64,
}

/// Friction model bound to the bundle geometry.
#[derive(Debug, Clone)]
pub struct FrictionCorrelation {
    model: FrictionModel,
    pitch: f64,
    pin_diameter: f64,
    wire_diameter: f64,
    lead_length: f64,
    /// Wall distance entering w/D
    wall_distance: f64,
    re_laminar: f64,
    re_turbulent: f64,
}

impl FrictionCorrelation {
    pub fn new(model: FrictionModel, mesh: &SubchannelMesh) -> Self {
        let pitch = mesh.pitch();
        let d = mesh.pin_diameter();
        let wall_distance = match mesh.lattice() {
            Lattice::Triangular { .. } => d + mesh.duct_to_pin_gap(),
            Lattice::Square { side_gap, .. } => 0.5 * d + 0.5 * pitch + side_gap,
        };
        let (wire_diameter, lead_length) = if mesh.has_wire() {
            (mesh.wire_diameter(), mesh.wire_lead_length())
        } else {
            (0.0, 0.0)
        };
        let p_over_d = pitch / d;
        FrictionCorrelation {
            model,
            pitch,
            pin_diameter: d,
            wire_diameter,
            lead_length,
            wall_distance,
            re_laminar: 320.0 * 10f64.powf(p_over_d - 1.0),
            re_turbulent: 1.0e4 * 10f64.powf(0.7 * (p_over_d - 1.0)),
        }
    }

    pub fn model(&self) -> FrictionModel {
        self.model
    }

    /// Laminar and turbulent regime bounds `(Re_L, Re_T)`.
    pub fn regime_bounds(&self) -> (f64, f64) {
        (self.re_laminar, self.re_turbulent)
    }

    pub fn friction_factor(&self, args: FrictionArgs) -> f64 {
        let re = args.reynolds.abs().max(MIN_REYNOLDS);
        match self.model {
            FrictionModel::Pang => pang(re),
            FrictionModel::TodreasKazimi => {
                let (cl, ct) = self.bare_coefficients(args.channel, todreas_kazimi_coefficients);
                self.blend(re, cl / re, ct / re.powf(0.18))
            }
            FrictionModel::ChengTodreas => {
                let (cl, ct) = self.bare_coefficients(args.channel, cheng_todreas_coefficients);
                let (cl, ct) = if self.wire_diameter > 0.0 {
                    self.wire_correction(args, cl, ct)
                } else {
                    (cl, ct)
                };
                self.blend(re, cl / re, ct / re.powf(0.18))
            }
        }
    }

    fn bare_coefficients(
        &self,
        kind: ChannelType,
        table: fn(ChannelType, bool) -> CoefficientSet,
    ) -> (f64, f64) {
        let p_over_d = self.pitch / self.pin_diameter;
        let (lam, turb) = table(kind, p_over_d < PITCH_RATIO_SPLIT);
        let x = match kind {
            ChannelType::Center => p_over_d - 1.0,
            _ => self.wall_distance / self.pin_diameter - 1.0,
        };
        (quadratic(lam, x), quadratic(turb, x))
    }

    fn wire_correction(&self, args: FrictionArgs, cfl_p: f64, cft_p: f64) -> (f64, f64) {
        let d = self.pin_diameter;
        let wd = self.wire_diameter;
        let h = self.lead_length;
        let cos_t = wire_cos_theta(d, wd, h);
        let theta = cos_t.acos();
        let wd_t = (19.56 + 98.71 * (wd / d) + 303.47 * (wd / d).powi(2)) * (h / d).powf(-0.541);
        let wd_l = 1.4 * wd_t;
        let ws = -11.0 * (h / d).log10() + 19.0;
        let s = args.flow_area;
        let dh = 4.0 * s / args.wetted_perimeter;
        match args.channel {
            ChannelType::Center => {
                let pw_p = PI * d / 2.0;
                let ar = PI * (d + wd) * wd / 6.0;
                let a_p = 3f64.sqrt() / 4.0 * self.pitch * self.pitch - PI * d * d / 8.0;
                let share = pw_p / args.wetted_perimeter;
                let wire = wd_t * (3.0 * ar / a_p) * (dh / h);
                let cf_t = cft_p * share + wire * (dh / wd).powf(0.18);
                let cf_l = cfl_p * share + wd_l / wd_t * wire * (dh / wd);
                (cf_l, cf_t)
            }
            ChannelType::Edge | ChannelType::Corner => {
                let (ar, a_p) = if args.channel == ChannelType::Edge {
                    (PI * (d + wd) * wd / 4.0, s + PI * wd * wd / 8.0 / cos_t)
                } else {
                    (PI * (d + wd) * wd / 6.0, s + PI * wd * wd / 24.0 / cos_t)
                };
                let factor = 1.0 + ws * (ar / a_p) * theta.tan().powi(2);
                (cfl_p * factor, cft_p * factor.powf(1.41))
            }
        }
    }

    fn blend(&self, re: f64, f_l: f64, f_t: f64) -> f64 {
        if re < self.re_laminar {
            f_l
        } else if re > self.re_turbulent {
            f_t
        } else {
            let psi = (re / self.re_laminar).ln() / (self.re_turbulent / self.re_laminar).ln();
            f_l * (1.0 - psi).powf(1.0 / 3.0) * (1.0 - psi.powi(CT_TRANSITION_LAMBDA))
                + f_t * psi.powf(1.0 / 3.0)
        }
    }
}

/// Smooth-tube piecewise power law.
pub fn pang(re: f64) -> f64 {
    let (a, b) = if re < 5000.0 {
        (64.0, -1.0)
    } else if re < 30000.0 {
        (0.316, -0.25)
    } else {
        (0.184, -0.20)
    };
    a * re.max(MIN_REYNOLDS).powf(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use subchannel_types::config::{GeometryConfig, LatticeConfig};

    fn hex_mesh(wire: bool) -> SubchannelMesh {
        SubchannelMesh::new(&GeometryConfig {
            lattice: LatticeConfig::Triangular {
                n_rings: 3,
                flat_to_flat: 0.0373,
            },
            pitch: 8.0e-3,
            pin_diameter: 6.5e-3,
            wire_diameter: if wire { 1.4e-3 } else { 0.0 },
            wire_lead_length: if wire { 0.2 } else { 0.0 },
            heated_length: 1.0,
            unheated_length_entry: 0.0,
            unheated_length_exit: 0.0,
            n_cells: 4,
            n_blocks: 1,
            blockage: None,
            k_grid: None,
        })
        .unwrap()
    }

    fn args(mesh: &SubchannelMesh, ch: usize, re: f64) -> FrictionArgs {
        FrictionArgs {
            reynolds: re,
            channel: mesh.channel_type(ch),
            flow_area: mesh.flow_area(0, ch),
            wetted_perimeter: mesh.wetted_perimeter(0, ch),
        }
    }

    #[test]
    fn test_pang_branches() {
        assert!((pang(0.5) - 64.0).abs() < 1e-12);
        assert!((pang(1000.0) - 0.064).abs() < 1e-12);
        assert!((pang(10000.0) - 0.316 * 1e4f64.powf(-0.25)).abs() < 1e-12);
    }

    #[test]
    fn test_wire_raises_turbulent_friction() {
        let bare = hex_mesh(false);
        let wired = hex_mesh(true);
        let f_bare = FrictionCorrelation::new(FrictionModel::ChengTodreas, &bare);
        let f_wire = FrictionCorrelation::new(FrictionModel::ChengTodreas, &wired);
        for re in [5000.0, 50000.0, 2.0e5] {
            let a = f_bare.friction_factor(args(&bare, 0, re));
            let b = f_wire.friction_factor(args(&wired, 0, re));
            assert!(b > a, "Re {re}: wire {b} vs bare {a}");
        }
    }

    #[test]
    fn test_laminar_scales_inverse_re() {
        let mesh = hex_mesh(true);
        let f = FrictionCorrelation::new(FrictionModel::ChengTodreas, &mesh);
        let (re_l, _) = f.regime_bounds();
        let f1 = f.friction_factor(args(&mesh, 0, 0.1 * re_l));
        let f2 = f.friction_factor(args(&mesh, 0, 0.2 * re_l));
        assert!((f1 / f2 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_reynolds_is_finite() {
        let mesh = hex_mesh(false);
        let f = FrictionCorrelation::new(FrictionModel::ChengTodreas, &mesh);
        assert!(f.friction_factor(args(&mesh, 0, 0.0)).is_finite());
    }
}
