// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Fission Gas Jet
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Plenum gas venting through a clad breach onto a neighbouring pin.
//!
//! The plenum is an ideal gas reservoir. Above the critical pressure
//! ratio the breach is choked; below it the flow is isentropic and
//! subsonic. The expanded jet entrains sodium, which sets its
//! heat-transfer coefficient, and the coolant crossflow bends it.

use std::f64::consts::PI;

use subchannel_types::config::CdapConfig;
use subchannel_types::constants::R_GAS;

/// Coolant and plenum state seen by one jet during a step.
#[derive(Debug, Clone, Copy)]
pub struct JetInputs {
    /// Absolute coolant pressure at the breach (Pa)
    pub coolant_pressure: f64,
    pub coolant_temperature: f64,
    pub gas_temperature: f64,
    pub sodium_density: f64,
    pub axial_velocity: f64,
}

/// Why a jet stopped during a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JetOutcome {
    Active,
    /// Plenum pressure fell to the coolant pressure
    Exhausted,
    /// Coolant inertia bent the jet beyond the critical angle (deg)
    Deflected { angle: f64 },
    /// Exit velocity below the jetting threshold (m/s)
    Bubbling { exit_velocity: f64, threshold: f64 },
}

/// State of the gas jet impinging on one pin.
#[derive(Debug, Clone, PartialEq)]
pub struct GasJet {
    pub active: bool,
    /// Pin whose clad failed
    pub origin_pin: usize,
    /// Channel receiving the gas
    pub channel: usize,
    /// Axial level of the breach
    pub level: usize,
    pub start_time: f64,
    /// Gas mass left in the plenum (kg)
    pub gas_mass: f64,
    /// Ejection rate of the last step (kg/s)
    pub mass_flow: f64,
    pub plenum_pressure: f64,
    pub critical_pressure: f64,
    /// Gas density at coolant conditions (kg/m³)
    pub gas_density: f64,
    pub htc: f64,
    pub temperature: f64,
    /// Plenum to coolant pressure ratio at failure
    pub pressure_ratio: f64,
}

impl GasJet {
    /// A fresh jet charged with the failed plenum inventory.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        config: &CdapConfig,
        origin_pin: usize,
        channel: usize,
        level: usize,
        time: f64,
        plenum_pressure: f64,
        plenum_volume: f64,
        plenum_temperature: f64,
        coolant_pressure: f64,
        coolant_temperature: f64,
    ) -> Self {
        GasJet {
            active: true,
            origin_pin,
            channel,
            level,
            start_time: time,
            gas_mass: plenum_pressure * plenum_volume * config.gas_molar_mass
                / (R_GAS * plenum_temperature),
            mass_flow: 0.0,
            plenum_pressure,
            critical_pressure: coolant_pressure * 0.5f64.exp(),
            gas_density: config.gas_molar_mass * coolant_pressure / (R_GAS * coolant_temperature),
            htc: config.initial_jet_htc,
            temperature: coolant_temperature,
            pressure_ratio: plenum_pressure / coolant_pressure,
        }
    }

    /// Advance the venting by `dt` and refresh the jet heat transfer.
    ///
    /// The plenum loses the mass ejected over the previous step before
    /// the new breach flow is evaluated.
    pub fn eject(
        &mut self,
        config: &CdapConfig,
        inputs: JetInputs,
        dt: f64,
        plenum_volume: f64,
        update_gas_density: bool,
    ) -> JetOutcome {
        let m_gas = config.gas_molar_mass;
        let gamma = config.gas_gamma;
        let d = config.breach_diameter;
        let area = 0.25 * PI * d * d;
        let p_cool = inputs.coolant_pressure;
        let rho_na = inputs.sodium_density;
        let sigma_na = config.sodium_surface_tension;

        self.gas_mass -= self.mass_flow * dt;
        self.plenum_pressure = self.gas_mass / m_gas * R_GAS * inputs.gas_temperature / plenum_volume;
        if update_gas_density {
            self.gas_density = m_gas * p_cool / (R_GAS * inputs.coolant_temperature);
        }
        if self.plenum_pressure <= p_cool {
            self.active = false;
            self.mass_flow = 0.0;
            return JetOutcome::Exhausted;
        }

        let p_st = self.plenum_pressure;
        let rho_g = m_gas * p_st / (R_GAS * inputs.gas_temperature);
        let rho_cool = m_gas * p_cool / (R_GAS * inputs.coolant_temperature);
        let mut rho_e = rho_g * (2.0 / (1.0 + gamma)).powf(1.0 / (gamma - 1.0));
        let u_transition = 3.24 * (rho_na / rho_e).powf(0.25) * (sigma_na / rho_e / d).sqrt();
        self.critical_pressure = p_cool * ((1.0 + gamma) / 2.0).powf(gamma / (gamma - 1.0));

        let (rho_0, u_0, d_0, u_e) = if p_st > self.critical_pressure {
            // choked breach, then free expansion to the coolant pressure
            let p_e = p_st * (2.0 / (1.0 + gamma)).powf(gamma / (gamma - 1.0));
            let big_gamma = gamma * (2.0 / (1.0 + gamma)).powf((gamma + 1.0) / (gamma - 1.0));
            self.mass_flow = config.discharge_coefficient * area * (big_gamma * p_st * rho_g).sqrt();
            let u_e = self.mass_flow / (rho_e * area);
            let u_0 = u_e + area * (p_e - p_cool) / self.mass_flow;
            let d_0 = (2.0 * self.mass_flow / (PI * u_0 * rho_e)).sqrt();
            (rho_e, u_0, d_0, u_e)
        } else {
            rho_e = rho_cool;
            let r = p_cool / p_st;
            self.mass_flow = config.discharge_coefficient
                * area
                * (2.0 * gamma / (gamma - 1.0) * p_st * rho_g).sqrt()
                * (r.powf(2.0 / gamma) - r.powf((gamma + 1.0) / gamma)).sqrt();
            let u_0 = self.mass_flow / (rho_e * area);
            (rho_cool, u_0, d, u_0)
        };

        // sodium entrainment over the jet length
        let e0 = config.entrainment_coefficient;
        let y = 4.0 * e0 * (rho_na / rho_0).sqrt() * config.jet_length / d_0;
        let u_i = u_0 / (1.0 + y);
        let d_i = d_0 * (rho_0 / rho_na * (1.0 + y) * (y + rho_na / rho_0)).sqrt();
        let alpha_i = y / (y + rho_na / rho_0);
        let eta = 27f64.sqrt() / 2.0 * e0 * sigma_na * (1.0 + rho_0 / rho_na).powi(2)
            / rho_0
            / (u_i * u_i);
        let f_kelvin = 0.005 * (1.0 + 75.0 * eta / d_i);
        self.htc = 0.12 * f_kelvin.sqrt() * rho_na * config.sodium_cp * alpha_i * u_i;
        self.temperature = inputs.coolant_temperature;

        let bend = (rho_na * inputs.axial_velocity.powi(2) / (rho_e * u_0 * u_0)).powf(1.3)
            * (config.jet_length / d).powi(3)
            * d
            / config.jet_length;
        let angle = bend.atan().to_degrees();

        if angle > config.critical_deflection_angle {
            self.active = false;
            return JetOutcome::Deflected { angle };
        }
        if u_transition > u_e {
            self.active = false;
            return JetOutcome::Bubbling {
                exit_velocity: u_e,
                threshold: u_transition,
            };
        }
        JetOutcome::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jet(config: &CdapConfig, plenum_pressure: f64) -> GasJet {
        GasJet::open(config, 0, 3, 5, 0.0, plenum_pressure, 1.0e-5, 800.0, 2.0e5, 700.0)
    }

    fn inputs(axial_velocity: f64) -> JetInputs {
        JetInputs {
            coolant_pressure: 2.0e5,
            coolant_temperature: 700.0,
            gas_temperature: 800.0,
            sodium_density: 850.0,
            axial_velocity,
        }
    }

    #[test]
    fn test_open_inventory_is_ideal_gas() {
        let cfg = CdapConfig::default();
        let j = jet(&cfg, 5.0e6);
        let expected = 5.0e6 * 1.0e-5 * cfg.gas_molar_mass / (R_GAS * 800.0);
        assert!((j.gas_mass - expected).abs() < 1e-15);
        assert!((j.pressure_ratio - 25.0).abs() < 1e-12);
        assert_eq!(j.htc, cfg.initial_jet_htc);
    }

    #[test]
    fn test_choked_jet_stays_active_in_slow_coolant() {
        let cfg = CdapConfig::default();
        let mut j = jet(&cfg, 5.0e6);
        let outcome = j.eject(&cfg, inputs(0.5), 1e-3, 1.0e-5, true);
        assert_eq!(outcome, JetOutcome::Active);
        assert!(j.plenum_pressure > j.critical_pressure);
        assert!(j.mass_flow > 0.0 && j.htc > 0.0);
    }

    #[test]
    fn test_venting_depletes_plenum() {
        let cfg = CdapConfig::default();
        let mut j = jet(&cfg, 5.0e6);
        j.eject(&cfg, inputs(0.5), 1e-3, 1.0e-5, true);
        let m0 = j.gas_mass;
        let p0 = j.plenum_pressure;
        j.eject(&cfg, inputs(0.5), 1e-3, 1.0e-5, true);
        assert!(j.gas_mass < m0);
        assert!(j.plenum_pressure < p0);
    }

    #[test]
    fn test_fast_coolant_deflects_jet() {
        let cfg = CdapConfig::default();
        let mut j = jet(&cfg, 5.0e6);
        let outcome = j.eject(&cfg, inputs(500.0), 1e-3, 1.0e-5, true);
        assert!(matches!(outcome, JetOutcome::Deflected { .. }));
        assert!(!j.active);
    }

    #[test]
    fn test_exhausted_plenum_closes_jet() {
        let cfg = CdapConfig::default();
        let mut j = jet(&cfg, 1.5e5);
        assert_eq!(j.eject(&cfg, inputs(0.5), 1e-3, 1.0e-5, true), JetOutcome::Exhausted);
        assert!(!j.active);
    }
}
