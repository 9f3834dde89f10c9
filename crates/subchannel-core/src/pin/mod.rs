// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Pin Temperature Model
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Radial temperature of every pin at every heated level, coupled to the
//! channels through a convective boundary condition.
//!
//! The coolant side of each pin is the perimeter-weighted average of its
//! channels with a Mikityuk heat-transfer coefficient. An active gas jet
//! overrides that boundary with its own coefficient and temperature, and
//! the two-phase footprint scales it by a heat-transfer multiplier.

pub mod materials;
pub mod solver;

use ndarray::Array2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use subchannel_types::config::PinConfig;
use subchannel_types::error::{SubchannelError, SubchannelResult};

use crate::closures::mikityuk;
use crate::fluid::FluidProperties;
use crate::mesh::SubchannelMesh;
use crate::power::PowerDistribution;
use crate::problem::FlowFields;

pub use materials::PinMaterials;
pub use solver::{solve_radial, RadialLoad, RadialMesh};

/// Wall coefficient outside the heated section, where pins are not solved.
const UNHEATED_HTC: f64 = 1e-15;

/// Coolant boundary imposed by a gas jet impinging on a pin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JetBoundary {
    /// Jet heat-transfer coefficient (W/m²/K)
    pub htc: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct PinModel {
    radial: RadialMesh,
    materials: PinMaterials,
    pin_diameter: f64,
    /// Per pin, `[level][radial node]` flattened level-major
    temperature: Vec<Vec<f64>>,
    /// Wall coefficient actually applied \[level, pin\]
    htc: Array2<f64>,
    coolant_temperature: Array2<f64>,
    /// Absolute coolant pressure \[level, pin\]
    coolant_pressure: Array2<f64>,
    ht_multiplier: Array2<f64>,
    /// Channel-side wall heat-transfer multiplier \[level, channel\]
    channel_ht_multiplier: Array2<f64>,
    jets: Vec<Option<JetBoundary>>,
    /// Wall heat rate into each channel \[level, channel\] (W/m)
    convective_heat: Array2<f64>,
}

impl PinModel {
    pub fn new(config: &PinConfig, mesh: &SubchannelMesh) -> SubchannelResult<Self> {
        let rco = 0.5 * mesh.pin_diameter();
        let r0 = config.fuel_inner_radius.max(solver::MIN_INNER_RADIUS);
        if !(config.fuel_outer_radius > r0 && rco > config.clad_inner_radius) {
            return Err(SubchannelError::GeometryError(format!(
                "fuel and clad need a finite thickness: r0={}, rfu={}, rci={}, rco={}",
                config.fuel_inner_radius, config.fuel_outer_radius, config.clad_inner_radius, rco
            )));
        }
        let radial = RadialMesh::new(
            config.fuel_inner_radius,
            config.fuel_outer_radius,
            config.clad_inner_radius,
            rco,
            config.n_fuel_nodes,
            config.gap_conductance,
        );
        let n_levels = mesh.n_cells() + 1;
        let n_pins = mesh.n_pins();
        let per_pin = vec![config.initial_temperature; n_levels * radial.n_nodes()];
        Ok(PinModel {
            materials: PinMaterials::new(config),
            pin_diameter: mesh.pin_diameter(),
            temperature: vec![per_pin; n_pins],
            htc: Array2::from_elem((n_levels, n_pins), UNHEATED_HTC),
            coolant_temperature: Array2::from_elem((n_levels, n_pins), config.initial_temperature),
            coolant_pressure: Array2::zeros((n_levels, n_pins)),
            ht_multiplier: Array2::ones((n_levels, n_pins)),
            channel_ht_multiplier: Array2::ones((n_levels, mesh.n_channels())),
            jets: vec![None; n_pins],
            convective_heat: Array2::zeros((n_levels, mesh.n_channels())),
            radial,
        })
    }

    pub fn radial_mesh(&self) -> &RadialMesh {
        &self.radial
    }

    pub fn materials(&self) -> &PinMaterials {
        &self.materials
    }

    pub fn n_pins(&self) -> usize {
        self.temperature.len()
    }

    pub fn n_nodes(&self) -> usize {
        self.radial.n_nodes()
    }

    /// Radial profile of pin `pin` at level `iz`, centre first.
    pub fn profile(&self, iz: usize, pin: usize) -> &[f64] {
        let n = self.n_nodes();
        &self.temperature[pin][iz * n..(iz + 1) * n]
    }

    pub fn profile_mut(&mut self, iz: usize, pin: usize) -> &mut [f64] {
        let n = self.n_nodes();
        &mut self.temperature[pin][iz * n..(iz + 1) * n]
    }

    pub fn centerline_temperature(&self, iz: usize, pin: usize) -> f64 {
        self.profile(iz, pin)[0]
    }

    pub fn fuel_surface_temperature(&self, iz: usize, pin: usize) -> f64 {
        self.profile(iz, pin)[self.radial.n_fuel]
    }

    /// Mean of the clad inner and outer surface temperatures.
    pub fn clad_temperature(&self, iz: usize, pin: usize) -> f64 {
        let p = self.profile(iz, pin);
        let nf = self.radial.n_fuel;
        0.5 * (p[nf + 1] + p[nf + 2])
    }

    pub fn surface_temperature(&self, iz: usize, pin: usize) -> f64 {
        self.profile(iz, pin)[self.radial.surface_node()]
    }

    pub fn htc(&self, iz: usize, pin: usize) -> f64 {
        self.htc[[iz, pin]]
    }

    pub fn coolant_temperature(&self, iz: usize, pin: usize) -> f64 {
        self.coolant_temperature[[iz, pin]]
    }

    pub fn coolant_pressure(&self, iz: usize, pin: usize) -> f64 {
        self.coolant_pressure[[iz, pin]]
    }

    pub fn jet(&self, pin: usize) -> Option<JetBoundary> {
        self.jets[pin]
    }

    pub fn set_jet(&mut self, pin: usize, jet: Option<JetBoundary>) {
        self.jets[pin] = jet;
    }

    pub fn ht_multiplier(&self, iz: usize, pin: usize) -> f64 {
        self.ht_multiplier[[iz, pin]]
    }

    pub fn set_ht_multiplier(&mut self, iz: usize, pin: usize, value: f64) {
        self.ht_multiplier[[iz, pin]] = value;
    }

    pub fn channel_ht_multiplier(&self, iz: usize, ch: usize) -> f64 {
        self.channel_ht_multiplier[[iz, ch]]
    }

    pub fn set_channel_ht_multiplier(&mut self, iz: usize, ch: usize, value: f64) {
        self.channel_ht_multiplier[[iz, ch]] = value;
    }

    pub fn reset_channel_ht_multiplier(&mut self) {
        self.channel_ht_multiplier.fill(1.0);
    }

    /// Wall heat rate from the pins into channel `ch` at level `iz` (W/m).
    pub fn convective_heat(&self, iz: usize, ch: usize) -> f64 {
        self.convective_heat[[iz, ch]]
    }

    /// Rebuild the coolant boundary of every pin from the channel state
    /// and the resulting wall heat rate into each channel.
    ///
    /// A channel multiplier below 1 lowers the wall coefficient the pin
    /// sees through that channel and the share of the pin heat it takes.
    pub fn set_convective_bc(
        &mut self,
        mesh: &SubchannelMesh,
        fields: &FlowFields,
        fluid: &dyn FluidProperties,
        outlet_pressure: f64,
        inlet_temperature: f64,
    ) {
        let p_over_d = mesh.pitch() / mesh.pin_diameter();
        for iz in 0..=mesh.n_cells() {
            let heated = mesh.is_heated_level(iz);
            for pin in 0..self.n_pins() {
                let channels = mesh.pin_channels(pin);
                let fractions = mesh.pin_channel_fractions(pin);
                let weight: f64 = fractions.iter().sum();
                let mut sum_p = 0.0;
                let mut sum_h = 0.0;
                let mut sum_t = 0.0;
                for (&ch, &frac) in channels.iter().zip(fractions.iter()) {
                    let t = fields.t.get(iz, ch);
                    let p = fields.p.get(iz, ch) + outlet_pressure;
                    sum_p += frac * p;
                    if !heated {
                        continue;
                    }
                    let dh = mesh.hydraulic_diameter(iz, ch);
                    let mu = fields.mu.get(iz, ch);
                    let k = fluid.k_from_p_t(p, t);
                    let cp = fluid.cp_from_p_t(p, t);
                    let re = fields.mdot.get(iz, ch) / mesh.flow_area(iz, ch) * dh / mu;
                    let pr = mu * cp / k;
                    sum_h += frac
                        * mikityuk(p_over_d, re * pr)
                        * k
                        / dh
                        * self.channel_ht_multiplier[[iz, ch]];
                    sum_t += frac * t;
                }
                self.coolant_pressure[[iz, pin]] = sum_p / weight;
                if !heated {
                    self.htc[[iz, pin]] = UNHEATED_HTC;
                    self.coolant_temperature[[iz, pin]] = inlet_temperature;
                    continue;
                }
                let (h, t) = match self.jets[pin] {
                    Some(jet) => (jet.htc, jet.temperature),
                    None => (sum_h / weight, sum_t / weight),
                };
                self.htc[[iz, pin]] = h * self.ht_multiplier[[iz, pin]];
                self.coolant_temperature[[iz, pin]] = t;
            }
        }

        self.convective_heat.fill(0.0);
        let perimeter = std::f64::consts::PI * self.pin_diameter;
        for iz in 0..=mesh.n_cells() {
            if !mesh.is_heated_level(iz) {
                continue;
            }
            for pin in 0..self.n_pins() {
                let channels = mesh.pin_channels(pin);
                let fractions = mesh.pin_channel_fractions(pin);
                let weight: f64 = fractions.iter().sum();
                let shares: f64 = channels
                    .iter()
                    .zip(fractions.iter())
                    .map(|(&ch, &frac)| frac * self.channel_ht_multiplier[[iz, ch]])
                    .sum();
                if shares <= 0.0 {
                    continue;
                }
                let q_pin = weight
                    * perimeter
                    * self.htc[[iz, pin]]
                    * (self.surface_temperature(iz, pin) - self.coolant_temperature[[iz, pin]]);
                for (&ch, &frac) in channels.iter().zip(fractions.iter()) {
                    self.convective_heat[[iz, ch]] +=
                        q_pin * frac * self.channel_ht_multiplier[[iz, ch]] / shares;
                }
            }
        }
    }

    /// Solve the radial conduction of every pin at every heated level.
    ///
    /// `dt = None` solves the steady balance; otherwise the current
    /// profiles are the previous-step state of a backward Euler step.
    pub fn solve(
        &mut self,
        mesh: &SubchannelMesh,
        power: &PowerDistribution,
        dt: Option<f64>,
    ) -> SubchannelResult<()> {
        let radial = &self.radial;
        let materials = &self.materials;
        let htc = &self.htc;
        let coolant = &self.coolant_temperature;
        let fuel_area = radial.fuel_area();
        let n = radial.n_nodes();
        let levels: Vec<usize> = (0..=mesh.n_cells())
            .filter(|&iz| mesh.is_heated_level(iz))
            .collect();

        let solve_pin = |(pin, temps): (usize, &mut Vec<f64>)| -> SubchannelResult<()> {
            for &iz in &levels {
                let load = RadialLoad {
                    q_vol: power.pin_linear_power(iz, pin) / fuel_area,
                    htc: htc[[iz, pin]],
                    coolant_temperature: coolant[[iz, pin]],
                    dt,
                };
                solve_radial(radial, materials, &mut temps[iz * n..(iz + 1) * n], load, pin, iz)?;
            }
            Ok(())
        };

        #[cfg(feature = "parallel")]
        self.temperature.par_iter_mut().enumerate().try_for_each(solve_pin)?;
        #[cfg(not(feature = "parallel"))]
        self.temperature.iter_mut().enumerate().try_for_each(solve_pin)?;

        log::trace!(
            "pin conduction solved on {} pins x {} levels ({})",
            self.n_pins(),
            levels.len(),
            if dt.is_some() { "transient" } else { "steady" }
        );
        Ok(())
    }
}
