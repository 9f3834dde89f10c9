// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Wall Temperatures
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Duct and pin surface temperatures from a Dittus–Boelter wall
//! coefficient, for runs without the pin conduction model.

use crate::closures::dittus_boelter;
use crate::problem::SubchannelProblem;

impl SubchannelProblem {
    /// Dittus–Boelter wall coefficient of channel `ch` at level `iz`.
    pub(crate) fn dittus_boelter_htc(&self, iz: usize, ch: usize) -> f64 {
        let f = &self.fields;
        let m = &self.mesh;
        let s = m.flow_area(iz, ch);
        let dh = 4.0 * s / m.wetted_perimeter(iz, ch);
        let mu = f.mu.get(iz, ch);
        let p = self.p_abs(iz, ch);
        let t = f.t.get(iz, ch);
        let k = self.fluid.k_from_p_t(p, t);
        let cp = self.fluid.cp_from_p_t(p, t);
        let re = f.mdot.get(iz, ch) / s * dh / mu;
        dittus_boelter(re, mu * cp / k) * k / dh
    }

    /// Duct inner surface temperature `q″/h + T` at every duct node.
    pub(crate) fn compute_duct_temperature(&mut self) {
        for iz in 0..=self.mesh.n_cells() {
            for node in 0..self.mesh.n_duct_nodes() {
                let ch = self.mesh.duct_channel(node);
                let hw = self.dittus_boelter_htc(iz, ch);
                let t = self.fields.duct_heat_flux[[iz, node]] / hw + self.fields.t.get(iz, ch);
                self.fields.duct_t.set(iz, node, t);
            }
        }
    }

    /// Pin surface temperature averaged over the channels around each pin,
    /// with the wall superheat of the prescribed linear power.
    pub(crate) fn compute_pin_surface_from_coolant(&mut self) {
        let perimeter = std::f64::consts::PI * self.mesh.pin_diameter();
        for pin in 0..self.mesh.n_pins() {
            let channels = self.mesh.pin_channels(pin);
            for iz in 0..=self.mesh.n_cells() {
                let q = self.power.pin_linear_power(iz, pin);
                let sum: f64 = channels
                    .iter()
                    .map(|&ch| q / (perimeter * self.dittus_boelter_htc(iz, ch)) + self.fields.t.get(iz, ch))
                    .sum();
                self.fields.pin_surface_t.set(iz, pin, sum / channels.len() as f64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subchannel_types::config::{FluidConfig, GeometryConfig, LatticeConfig, SubchannelConfig};

    fn problem(duct_flux: f64, power: f64) -> SubchannelProblem {
        let mut cfg = SubchannelConfig::with_geometry(GeometryConfig {
            lattice: LatticeConfig::Triangular {
                n_rings: 2,
                flat_to_flat: 0.0290,
            },
            pitch: 0.0089,
            pin_diameter: 0.0074,
            wire_diameter: 0.0,
            wire_lead_length: 0.0,
            heated_length: 1.0,
            unheated_length_entry: 0.0,
            unheated_length_exit: 0.0,
            n_cells: 4,
            n_blocks: 1,
            blockage: None,
            k_grid: None,
        });
        cfg.fluid = FluidConfig::Constant {
            rho: 850.0,
            cp: 1270.0,
            k: 65.0,
            mu: 2.5e-4,
            t_ref: 0.0,
        };
        cfg.boundary.duct_heat_flux = duct_flux;
        cfg.power.total_power = power;
        SubchannelProblem::new(cfg).unwrap()
    }

    #[test]
    fn test_duct_temperature_equals_coolant_without_flux() {
        let mut p = problem(0.0, 0.0);
        p.compute_duct_temperature();
        for node in 0..p.mesh().n_duct_nodes() {
            let ch = p.mesh().duct_channel(node);
            assert_eq!(p.fields().duct_t.get(2, node), p.fields().t.get(2, ch));
        }
    }

    #[test]
    fn test_duct_superheat_scales_with_flux() {
        let mut p = problem(1.0e4, 0.0);
        p.compute_duct_temperature();
        let ch = p.mesh().duct_channel(0);
        let hw = p.dittus_boelter_htc(1, ch);
        let rise = p.fields().duct_t.get(1, 0) - p.fields().t.get(1, ch);
        assert!(hw > 0.0);
        assert!((rise - 1.0e4 / hw).abs() < 1e-9);
    }

    #[test]
    fn test_pin_surface_above_coolant_when_heated() {
        let mut p = problem(0.0, 7.0e4);
        p.compute_pin_surface_from_coolant();
        let pin = 0;
        let ch = p.mesh().pin_channels(pin)[0];
        assert!(p.fields().pin_surface_t.get(2, pin) > p.fields().t.get(2, ch));
    }
}
