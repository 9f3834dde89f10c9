// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Pin Materials
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! U-Pu-Zr metal fuel and HT9 cladding properties. Temperatures in K.

use subchannel_types::config::PinConfig;
use subchannel_types::constants::KELVIN_OFFSET;

/// Molar masses (g/mol) used for the fuel composition.
const M_U: f64 = 238.0;
const M_PU: f64 = 239.0;
const M_ZR: f64 = 91.22;

/// Fraction of the α+δ phase porosity assumed logged with sodium.
const SODIUM_LOGGED_FRACTION: f64 = 0.3;

/// Fuel radius fraction inside which porosity is gas filled.
const INNER_ZONE_FRACTION: f64 = 0.6;

/// HT9 density (kg/m³)
pub const HT9_DENSITY: f64 = 7800.0;

/// Atomic plutonium fraction of the alloy.
fn plutonium_atom_fraction(wpu: f64, wzr: f64) -> f64 {
    let scale = 1e-3;
    (wpu / (M_PU * scale))
        / ((1.0 - wpu - wzr) / (M_U * scale) + wpu / (M_PU * scale) + wzr / (M_ZR * scale))
}

/// α+δ → β+γ and β+γ → γ transition temperatures (K).
fn phase_transitions(wpu: f64, wzr: f64) -> (f64, f64) {
    let apu = plutonium_atom_fraction(wpu, wzr);
    (
        apu / 0.164 * (868.15 - 935.15) + 935.15,
        apu / 0.164 * (923.15 - 965.15) + 965.15,
    )
}

/// Fuel and clad correlations bound to one pin design.
#[derive(Debug, Clone)]
pub struct PinMaterials {
    pub plutonium_fraction: f64,
    pub zirconium_fraction: f64,
    pub porosity: f64,
    pub fuel_outer_radius: f64,
    pub fuel_conductivity: Option<f64>,
    pub clad_conductivity: Option<f64>,
}

impl PinMaterials {
    pub fn new(config: &PinConfig) -> Self {
        PinMaterials {
            plutonium_fraction: config.plutonium_fraction,
            zirconium_fraction: config.zirconium_fraction,
            porosity: config.porosity,
            fuel_outer_radius: config.fuel_outer_radius,
            fuel_conductivity: config.fuel_conductivity,
            clad_conductivity: config.clad_conductivity,
        }
    }

    /// Fuel conductivity (W/m/K) at radius `r`, corrected for porosity.
    ///
    /// Below the α→β transition and outside the inner zone part of the
    /// porosity is sodium logged, which restores some conductance.
    pub fn fuel_conductivity(&self, t: f64, r: f64) -> f64 {
        if let Some(k) = self.fuel_conductivity {
            return k;
        }
        let wpu = self.plutonium_fraction;
        let wzr = self.zirconium_fraction;
        let a = 17.5 * ((1.0 - 2.23 * wzr) / (1.0 + 1.61 * wzr) - 2.62 * wpu);
        let b = 1.54e-2 * ((1.0 + 0.061 * wzr) / (1.0 + 1.61 * wzr) + 0.9 * wpu);
        let c = 9.38e-6 * (1.0 - 2.7 * wpu);
        let k0 = a + b * t + c * t * t;
        let k_na = 1.00423e3 - 0.21390 * t - 1.1046e-5 * t * t;

        let (t_alpha_beta, _) = phase_transitions(wpu, wzr);
        let (p_na, p_gas) = if t > t_alpha_beta || r < INNER_ZONE_FRACTION * self.fuel_outer_radius {
            (0.0, self.porosity)
        } else {
            (
                SODIUM_LOGGED_FRACTION * self.porosity,
                (1.0 - SODIUM_LOGGED_FRACTION) * self.porosity,
            )
        };
        let gas_factor = (1.0 - p_gas).powf(1.5);
        let ratio = k_na / k0;
        let sodium_factor =
            1.0 - 3.0 * (1.0 - ratio) / (1.163 + 1.837 * ratio) * p_na / (1.0 - p_gas);
        sodium_factor * gas_factor * k0
    }

    /// Fuel specific heat (J/kg/K), linear across the two-phase band.
    pub fn fuel_heat_capacity(&self, t: f64) -> f64 {
        let wpu = self.plutonium_fraction;
        let wzr = self.zirconium_fraction;
        let m_avg = 1.0 / ((1.0 - wpu - wzr) / M_U + wpu / M_PU + wzr / M_ZR);
        let (t1, t2) = phase_transitions(wpu, wzr);
        let (t1, t2) = (t1 - KELVIN_OFFSET, t2 - KELVIN_OFFSET);
        let tc = t - KELVIN_OFFSET;
        let low = |tc: f64| 26.58 + 0.027 / m_avg * tc;
        let high = |tc: f64| 15.84 + 0.026 / m_avg * tc;
        let molar = if tc < t1 {
            low(tc)
        } else if tc > t2 {
            high(tc)
        } else {
            let (c1, c2) = (low(t1), high(t2));
            (c2 - c1) / (t2 - t1) * (tc - t1) + c1
        };
        // J/mol/K -> J/kg/K
        molar / (m_avg * 1e-3)
    }

    /// Fuel density (kg/m³); thermal expansion is not modelled.
    pub fn fuel_density(&self) -> f64 {
        let wpu = self.plutonium_fraction;
        let wzr = self.zirconium_fraction;
        let (rho_u, rho_pu, rho_zr) = (19000.0, 19000.0, 6490.0);
        (1.0 - self.porosity) * 0.988 / (wpu / rho_pu + wzr / rho_zr + (1.0 - wpu - wzr) / rho_u)
    }

    /// HT9 conductivity (W/m/K).
    pub fn clad_conductivity(&self, t: f64) -> f64 {
        if let Some(k) = self.clad_conductivity {
            return k;
        }
        if t < 1030.0 {
            17.622 + 2.42e-2 * t - 1.696e-5 * t * t
        } else {
            12.027 + 1.218e-2 * t
        }
    }

    /// HT9 specific heat (J/kg/K).
    pub fn clad_heat_capacity(&self, t: f64) -> f64 {
        let tc = t - KELVIN_OFFSET;
        if tc < 527.0 {
            (tc - 227.0) / 6.0 + 500.0
        } else {
            0.6 * (tc - 527.0) + 550.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materials() -> PinMaterials {
        PinMaterials::new(&PinConfig::default())
    }

    #[test]
    fn test_fuel_conductivity_range() {
        let m = materials();
        // U-19Pu-10Zr sits around 10-30 W/m/K between 600 and 1000 K
        for t in [600.0, 800.0, 1000.0] {
            let k = m.fuel_conductivity(t, 0.0);
            assert!(k > 5.0 && k < 40.0, "k({t}) = {k}");
        }
        assert!(m.fuel_conductivity(900.0, 0.0) > m.fuel_conductivity(600.0, 0.0));
    }

    #[test]
    fn test_porosity_lowers_conductivity() {
        let dense = materials();
        let mut porous = materials();
        porous.porosity = 0.2;
        assert!(porous.fuel_conductivity(700.0, 0.0) < dense.fuel_conductivity(700.0, 0.0));
        // sodium logging in the outer zone recovers part of the loss
        let outer = porous.fuel_conductivity(700.0, 0.9 * porous.fuel_outer_radius);
        assert!(outer > porous.fuel_conductivity(700.0, 0.0));
    }

    #[test]
    fn test_fuel_heat_capacity_continuous() {
        let m = materials();
        let (t1, t2) = phase_transitions(m.plutonium_fraction, m.zirconium_fraction);
        let below = m.fuel_heat_capacity(t1 - 1e-6);
        let above = m.fuel_heat_capacity(t1 + 1e-6);
        assert!((below - above).abs() / below < 1e-6);
        let below = m.fuel_heat_capacity(t2 - 1e-6);
        let above = m.fuel_heat_capacity(t2 + 1e-6);
        assert!((below - above).abs() / below < 1e-6);
        let cp = m.fuel_heat_capacity(700.0);
        assert!(cp > 100.0 && cp < 300.0, "cp = {cp}");
    }

    #[test]
    fn test_ht9_branches() {
        let m = materials();
        assert!((m.clad_conductivity(700.0) - (17.622 + 16.94 - 8.3104)).abs() < 1e-9);
        assert!((m.clad_heat_capacity(227.0 + KELVIN_OFFSET) - 500.0).abs() < 1e-12);
        assert!((m.clad_heat_capacity(527.0 + KELVIN_OFFSET) - 550.0).abs() < 1e-12);
    }

    #[test]
    fn test_overrides() {
        let mut m = materials();
        m.fuel_conductivity = Some(20.0);
        m.clad_conductivity = Some(15.0);
        assert_eq!(m.fuel_conductivity(1200.0, 0.0), 20.0);
        assert_eq!(m.clad_conductivity(400.0), 15.0);
    }
}
