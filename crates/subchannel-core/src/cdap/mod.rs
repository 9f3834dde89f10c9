// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Clad Damage and Failure Propagation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-pin clad damage accumulation, probabilistic failure, gas venting
//! and the two-phase feedback on the channel solve.
//!
//! Each transient step runs, in order:
//! 1. shift the previous-step damage and rescale the plenum pressures,
//! 2. vent the active jets,
//! 3. fail pins whose damage is certain, then draw at most one more,
//! 4. accumulate wastage, stress and damage at every level,
//! 5. track the gas slug of the latest breach and build the feedback.
//!
//! A pin that failed stays failed. All draws come from one seeded
//! generator owned by [`Cdap`], so a run is reproducible from its seed.

pub mod damage;
pub mod jet;
pub mod voiding;

pub use jet::{GasJet, JetInputs, JetOutcome};
pub use voiding::{Breach, Footprint, GasTrack, IntenseVoiding};

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use subchannel_types::config::{CdapConfig, ForcedFailureConfig, PinConfig};
use subchannel_types::constants::R_GAS;
use subchannel_types::error::{SubchannelError, SubchannelResult};

use crate::mesh::SubchannelMesh;
use crate::pin::{JetBoundary, PinModel};
use crate::problem::SubchannelProblem;

use damage::{
    eutectic_penetration_rate, failure_probability, hoop_stress, rupture_time, sodium_corrosion,
};

/// Plenum pressure of a pin after its clad opened (Pa).
const FAILED_PLENUM_PRESSURE: f64 = 1.0e5;

/// Breach height above the bundle inlet and channel length above it.
pub fn fail_location(mesh: &SubchannelMesh, peak: usize) -> (f64, f64) {
    let n = mesh.n_cells();
    let length = 0.5 * mesh.dz(peak) + (peak + 1..=n).map(|j| mesh.dz(j)).sum::<f64>();
    let total = mesh.z_grid()[n] - mesh.z_grid()[0];
    (total - length, length)
}

/// Gas slug of the most recent breach.
#[derive(Debug, Clone)]
struct FailedChannel {
    origin_pin: usize,
    channel: usize,
    peak: usize,
    z_fail: f64,
    length: f64,
    gas_density: f64,
    footprint: Footprint,
    track: GasTrack,
}

/// What the damage model pushes back into the flow and pin solves.
#[derive(Debug, Clone, Default)]
pub struct CdapFeedback {
    /// Jet boundary per pin, `None` where no jet impinges
    pub jets: Vec<Option<JetBoundary>>,
    /// Wall heat-transfer multiplier \[level, pin\]; `None` restores 1
    pub pin_ht_multiplier: Option<Array2<f64>>,
    /// `1 − α` friction multiplier per level of one channel
    pub friction_multiplier: Option<(usize, Vec<f64>)>,
    /// `1 − α` wall heat-transfer multiplier per level of one channel
    pub channel_ht_multiplier: Option<(usize, Vec<f64>)>,
    pub inlet_flow_ratio: Option<(usize, f64)>,
}

#[derive(Debug)]
pub struct Cdap {
    config: CdapConfig,
    clad_inner_radius: f64,
    clad_outer_radius: f64,
    plenum_volume: f64,
    rng: StdRng,
    primed: bool,

    // [level, pin]
    cdf: Array2<f64>,
    cdf_old: Array2<f64>,
    rupture_time: Array2<f64>,
    wastage_inner: Array2<f64>,
    wastage_inner_old: Array2<f64>,
    wastage_outer: Array2<f64>,
    wastage_outer_old: Array2<f64>,
    stress: Array2<f64>,
    clad_t_old: Array2<f64>,

    // per pin
    failed: Vec<bool>,
    gas_pressure: Vec<f64>,
    fail_probability: Vec<f64>,
    peak_cdf: Vec<f64>,
    peak_level: Vec<usize>,
    fail_channel: Vec<Option<usize>>,
    jets: Vec<Option<GasJet>>,
    fail_z: Vec<f64>,
    fail_length: Vec<f64>,

    total_failures: usize,
    total_probability: f64,
    failed_channel: Option<FailedChannel>,
    mdot_ratio: f64,
    /// `1 − α` at the voided levels of the failed channel, 1 elsewhere
    channel_ht_multiplier: Vec<f64>,
    intense: Option<IntenseVoiding>,
    experiment_complete: bool,
}

impl Cdap {
    pub fn new(config: &CdapConfig, pin: &PinConfig, mesh: &SubchannelMesh) -> SubchannelResult<Self> {
        let n_pins = mesh.n_pins();
        if let Some(forced) = &config.forced {
            if forced.pin >= n_pins {
                return Err(SubchannelError::ConfigError(format!(
                    "forced failure pin {} outside the {n_pins} pins",
                    forced.pin
                )));
            }
        }
        let n_levels = mesh.n_cells() + 1;
        let r0 = pin.fuel_inner_radius;
        let fuel_volume = std::f64::consts::PI
            * (pin.fuel_outer_radius.powi(2) - r0.powi(2))
            * mesh.heated_length();
        let zeros = Array2::zeros((n_levels, n_pins));
        Ok(Cdap {
            config: config.clone(),
            clad_inner_radius: pin.clad_inner_radius,
            clad_outer_radius: 0.5 * mesh.pin_diameter(),
            plenum_volume: config.plenum_to_fuel_ratio * fuel_volume,
            rng: StdRng::seed_from_u64(config.seed),
            primed: false,
            cdf: zeros.clone(),
            cdf_old: zeros.clone(),
            rupture_time: zeros.clone(),
            wastage_inner: zeros.clone(),
            wastage_inner_old: zeros.clone(),
            wastage_outer: zeros.clone(),
            wastage_outer_old: zeros.clone(),
            stress: zeros.clone(),
            clad_t_old: zeros,
            failed: vec![false; n_pins],
            gas_pressure: vec![config.plenum_pressure; n_pins],
            fail_probability: vec![0.0; n_pins],
            peak_cdf: vec![0.0; n_pins],
            peak_level: vec![mesh.n_cells(); n_pins],
            fail_channel: vec![None; n_pins],
            jets: vec![None; n_pins],
            fail_z: vec![0.0; n_pins],
            fail_length: vec![0.0; n_pins],
            total_failures: 0,
            total_probability: 0.0,
            failed_channel: None,
            mdot_ratio: 1.0,
            channel_ht_multiplier: vec![1.0; n_levels],
            intense: None,
            experiment_complete: false,
        })
    }

    pub fn config(&self) -> &CdapConfig {
        &self.config
    }

    pub fn plenum_volume(&self) -> f64 {
        self.plenum_volume
    }

    pub fn is_failed(&self, pin: usize) -> bool {
        self.failed[pin]
    }

    pub fn n_failed(&self) -> usize {
        self.total_failures
    }

    pub fn cdf(&self, iz: usize, pin: usize) -> f64 {
        self.cdf[[iz, pin]]
    }

    pub fn peak_cdf(&self, pin: usize) -> f64 {
        self.peak_cdf[pin]
    }

    pub fn peak_level(&self, pin: usize) -> usize {
        self.peak_level[pin]
    }

    pub fn failure_probability(&self, pin: usize) -> f64 {
        self.fail_probability[pin]
    }

    /// Sum of the failure probabilities of the last step.
    pub fn total_probability(&self) -> f64 {
        self.total_probability
    }

    pub fn stress(&self, iz: usize, pin: usize) -> f64 {
        self.stress[[iz, pin]]
    }

    pub fn rupture_time(&self, iz: usize, pin: usize) -> f64 {
        self.rupture_time[[iz, pin]]
    }

    pub fn inner_wastage(&self, iz: usize, pin: usize) -> f64 {
        self.wastage_inner[[iz, pin]]
    }

    pub fn outer_wastage(&self, iz: usize, pin: usize) -> f64 {
        self.wastage_outer[[iz, pin]]
    }

    pub fn gas_pressure(&self, pin: usize) -> f64 {
        self.gas_pressure[pin]
    }

    pub fn fail_channel(&self, pin: usize) -> Option<usize> {
        self.fail_channel[pin]
    }

    /// Breach height and channel length above it for a jet-receiving pin.
    pub fn fail_location(&self, pin: usize) -> (f64, f64) {
        (self.fail_z[pin], self.fail_length[pin])
    }

    pub fn jet(&self, pin: usize) -> Option<&GasJet> {
        self.jets[pin].as_ref()
    }

    pub fn mdot_ratio(&self) -> f64 {
        self.mdot_ratio
    }

    pub fn channel_ht_multiplier(&self, iz: usize) -> f64 {
        self.channel_ht_multiplier[iz]
    }

    pub fn track(&self) -> Option<&GasTrack> {
        self.failed_channel.as_ref().map(|fc| &fc.track)
    }

    pub fn intensified_voiding(&self) -> Option<&IntenseVoiding> {
        self.intense.as_ref()
    }

    pub fn experiment_complete(&self) -> bool {
        self.experiment_complete
    }

    /// Jet coefficient of the forced experiment and the wall superheat
    /// it needs to remove the target heat flux.
    pub fn forced_heat_transfer(&self) -> Option<(f64, f64)> {
        let forced = self.config.forced.as_ref()?;
        let jet = self.jets[forced.pin].as_ref()?;
        Some((jet.htc, forced.target_heat_flux / jet.htc))
    }

    /// Run one transient step of the damage model against the converged
    /// flow and pin state of `problem`.
    pub fn step(&mut self, problem: &SubchannelProblem, dt: f64) -> SubchannelResult<CdapFeedback> {
        let pins = problem.pins().ok_or_else(|| {
            SubchannelError::ConfigError("clad damage needs the pin model".to_string())
        })?;
        let mesh = problem.mesh();
        let time = problem.time();
        self.initialize_timestep(mesh, pins);

        if let Some(forced) = self.config.forced.clone() {
            return Ok(self.forced_step(&forced, mesh, time, dt));
        }

        self.vent_jets(problem, time, dt);
        self.update_failures(problem, pins, time);
        self.accumulate_damage(mesh, pins, dt);
        self.postfail(problem, dt)
    }

    fn initialize_timestep(&mut self, mesh: &SubchannelMesh, pins: &PinModel) {
        let n = mesh.n_cells();
        self.cdf_old.assign(&self.cdf);
        self.wastage_inner_old.assign(&self.wastage_inner);
        self.wastage_outer_old.assign(&self.wastage_outer);
        if !self.primed {
            for iz in 0..=n {
                for pin in 0..mesh.n_pins() {
                    self.clad_t_old[[iz, pin]] = pins.clad_temperature(iz, pin);
                }
            }
            self.primed = true;
        }
        for pin in 0..mesh.n_pins() {
            self.gas_pressure[pin] = if self.failed[pin] {
                FAILED_PLENUM_PRESSURE
            } else {
                self.config.plenum_pressure * pins.coolant_temperature(n, pin)
                    / self.config.plenum_temperature
            };
        }
    }

    fn forced_step(
        &mut self,
        forced: &ForcedFailureConfig,
        mesh: &SubchannelMesh,
        time: f64,
        dt: f64,
    ) -> CdapFeedback {
        let pin = forced.pin;
        let n = mesh.n_cells();
        let mut feedback = CdapFeedback {
            jets: vec![None; mesh.n_pins()],
            ..CdapFeedback::default()
        };
        if self.experiment_complete {
            return feedback;
        }

        let channel = mesh.pin_channels(pin).first().copied().unwrap_or(0);
        let open = |config: &CdapConfig| {
            GasJet::open(
                config,
                pin,
                channel,
                n,
                time,
                forced.gas_pressure,
                forced.plenum_volume,
                forced.gas_temperature,
                forced.coolant_pressure,
                forced.coolant_temperature,
            )
        };
        if time < forced.time {
            let mut jet = open(&self.config);
            jet.active = false;
            self.jets[pin] = Some(jet);
            self.peak_level[pin] = n;
        } else {
            let config = &self.config;
            let jet = self.jets[pin].get_or_insert_with(|| open(config));
            jet.active = true;
            let inputs = JetInputs {
                coolant_pressure: forced.coolant_pressure,
                coolant_temperature: forced.coolant_temperature,
                gas_temperature: forced.gas_temperature,
                sodium_density: forced.sodium_density,
                axial_velocity: forced.axial_velocity,
            };
            let outcome = jet.eject(config, inputs, dt, forced.plenum_volume, false);
            if jet.active {
                feedback.jets[pin] = Some(JetBoundary {
                    htc: jet.htc,
                    temperature: jet.temperature,
                });
            } else {
                log::info!("jet experiment completed at or before t = {time:.6} s ({outcome:?})");
                self.experiment_complete = true;
            }
        }
        if let Some(jet) = &self.jets[pin] {
            log::info!(
                "t = {time:.6} s: jet active = {}, htc = {:.4e} W/m2K, temperature difference = {:.4} K",
                jet.active,
                jet.htc,
                forced.target_heat_flux / jet.htc
            );
        }
        feedback
    }

    fn vent_jets(&mut self, problem: &SubchannelProblem, time: f64, dt: f64) {
        let f = problem.fields();
        let m = problem.mesh();
        let n = m.n_cells();
        let p_out = problem.outlet_pressure();
        let config = &self.config;
        let plenum_volume = self.plenum_volume;
        for (pin, slot) in self.jets.iter_mut().enumerate() {
            let Some(jet) = slot.as_mut().filter(|j| j.active) else {
                continue;
            };
            let (iz, ch) = (jet.level, jet.channel);
            let rho = f.rho.get(iz, ch);
            let inputs = JetInputs {
                coolant_pressure: problem.p_abs(iz, ch).max(p_out),
                coolant_temperature: f.t.get(iz, ch),
                gas_temperature: f.t.get(n, ch),
                sodium_density: rho,
                axial_velocity: f.mdot.get(iz, ch) / m.flow_area(iz, ch) / rho,
            };
            match jet.eject(config, inputs, dt, plenum_volume, true) {
                JetOutcome::Active => {}
                JetOutcome::Exhausted => log::info!("jet on pin {pin} exhausted at t = {time:.6} s"),
                outcome => log::warn!("jet on pin {pin} failed at t = {time:.6} s: {outcome:?}"),
            }
        }
    }

    fn update_failures(&mut self, problem: &SubchannelProblem, pins: &PinModel, time: f64) {
        let n_pins = self.failed.len();
        let mut total = 0.0;
        let mut survivors = 0.0;
        for pin in 0..n_pins {
            if !self.failed[pin] {
                if self.peak_cdf[pin] < self.config.cdf_upper_limit {
                    self.fail_probability[pin] = failure_probability(
                        self.peak_cdf[pin],
                        self.config.cdf_mean,
                        self.config.cdf_sigma,
                    );
                } else {
                    self.fail_probability[pin] = 1.0;
                    self.fail_pin(problem, pins, pin, time);
                }
            }
            if !self.failed[pin] {
                survivors += self.fail_probability[pin];
            }
            total += self.fail_probability[pin];
        }

        if total >= self.total_failures as f64 + 1.0 && survivors > 0.0 {
            let draw = self.rng.gen::<f64>() * survivors;
            let mut cursor = 0.0;
            for pin in 0..n_pins {
                if self.failed[pin] {
                    continue;
                }
                cursor += self.fail_probability[pin];
                if draw < cursor {
                    self.fail_pin(problem, pins, pin, time);
                    break;
                }
            }
        }
        self.total_probability = total;
        log::debug!("t = {time:.6} s: total failure probability {total:.4e}");
    }

    /// Open the clad of `pin` into a channel drawn by contact fraction
    /// and start jets on every other pin facing that channel.
    fn fail_pin(&mut self, problem: &SubchannelProblem, pins: &PinModel, pin: usize, time: f64) {
        let m = problem.mesh();
        let f = problem.fields();
        let n = m.n_cells();
        self.failed[pin] = true;
        self.total_failures += 1;

        let channels = m.pin_channels(pin);
        let fractions = m.pin_channel_fractions(pin);
        let draw = self.rng.gen::<f64>() * fractions.iter().sum::<f64>();
        let mut cursor = 0.0;
        // only reached when rounding leaves `draw` at the summed fractions
        let mut chosen = channels[channels.len() - 1];
        for (&ch, &frac) in channels.iter().zip(fractions) {
            cursor += frac;
            if draw < cursor {
                chosen = ch;
                break;
            }
        }
        self.fail_channel[pin] = Some(chosen);

        let peak = self.peak_level[pin];
        let p_cool = problem.p_abs(peak, chosen).max(problem.outlet_pressure());
        let t_plenum = pins.coolant_temperature(n, pin);
        let (z_fail, length) = fail_location(m, peak);
        log::warn!(
            "pin {pin} failed at t = {time:.6} s into channel {chosen} at level {peak} (peak damage {:.4e})",
            self.peak_cdf[pin]
        );
        for &neighbour in m.channel_pins(chosen) {
            if neighbour == pin {
                continue;
            }
            self.jets[neighbour] = Some(GasJet::open(
                &self.config,
                pin,
                chosen,
                peak,
                time,
                self.gas_pressure[pin],
                self.plenum_volume,
                t_plenum,
                p_cool,
                pins.coolant_temperature(peak, neighbour),
            ));
            self.fail_z[neighbour] = z_fail;
            self.fail_length[neighbour] = length;
        }

        let pressure_ratio = self.gas_pressure[pin] / p_cool;
        let gas_density = self.config.gas_molar_mass * p_cool / (R_GAS * f.t.get(peak, chosen));
        log::debug!("breach pressure ratio {pressure_ratio:.3}");
        self.failed_channel = Some(FailedChannel {
            origin_pin: pin,
            channel: chosen,
            peak,
            z_fail,
            length,
            gas_density,
            footprint: Footprint::new(&self.config, pressure_ratio),
            track: GasTrack::new(n + 1),
        });
    }

    fn accumulate_damage(&mut self, mesh: &SubchannelMesh, pins: &PinModel, dt: f64) {
        for pin in 0..mesh.n_pins() {
            self.peak_cdf[pin] = 0.0;
            for j in 1..=mesh.n_cells() {
                let t_clad = pins.clad_temperature(j, pin);
                let tcdot = ((t_clad - self.clad_t_old[[j, pin]]) / dt).max(0.0);
                self.wastage_inner[[j, pin]] = self.wastage_inner_old[[j, pin]]
                    + eutectic_penetration_rate(pins.fuel_surface_temperature(j, pin)) * dt;
                self.wastage_outer[[j, pin]] = self.wastage_outer_old[[j, pin]] + sodium_corrosion();

                let r_inner = self.clad_inner_radius + self.wastage_inner[[j, pin]];
                let r_outer = self.clad_outer_radius - self.wastage_outer[[j, pin]];
                let stress = hoop_stress(
                    self.gas_pressure[pin],
                    pins.coolant_pressure(j, pin),
                    r_inner,
                    r_outer,
                );
                self.stress[[j, pin]] = stress;
                let life = rupture_time(tcdot, stress, t_clad);
                self.rupture_time[[j, pin]] = life;
                self.cdf[[j, pin]] = self.cdf_old[[j, pin]] + dt / life;
                self.clad_t_old[[j, pin]] = t_clad;

                if self.peak_cdf[pin] < self.cdf[[j, pin]] {
                    self.peak_cdf[pin] = self.cdf[[j, pin]];
                    self.peak_level[pin] = j;
                }
            }
        }
    }

    fn jet_boundaries(&self) -> Vec<Option<JetBoundary>> {
        self.jets
            .iter()
            .map(|slot| {
                slot.as_ref().filter(|j| j.active).map(|j| JetBoundary {
                    htc: j.htc,
                    temperature: j.temperature,
                })
            })
            .collect()
    }

    fn single_phase_feedback(&mut self) -> CdapFeedback {
        self.mdot_ratio = 1.0;
        self.channel_ht_multiplier.iter_mut().for_each(|v| *v = 1.0);
        self.intense = None;
        CdapFeedback {
            jets: self.jet_boundaries(),
            ..CdapFeedback::default()
        }
    }

    fn postfail(&mut self, problem: &SubchannelProblem, dt: f64) -> SubchannelResult<CdapFeedback> {
        let m = problem.mesh();
        let f = problem.fields();
        let n = m.n_cells();

        // gas of one breach counts once however many pins it reaches
        let mut origins = Vec::new();
        let mut total_gas = 0.0;
        let mut density = None;
        for jet in self.jets.iter().flatten().filter(|j| j.active) {
            if !origins.contains(&jet.origin_pin) {
                origins.push(jet.origin_pin);
                total_gas += jet.mass_flow;
            }
            density = Some(jet.gas_density);
        }
        let venting = !origins.is_empty();

        let Some(fc) = self.failed_channel.as_mut() else {
            return Ok(self.single_phase_feedback());
        };
        if !venting && !fc.track.is_voided() {
            log::debug!("gas slug from pin {} left the bundle", fc.origin_pin);
            self.failed_channel = None;
            return Ok(self.single_phase_feedback());
        }
        if let Some(rho) = density {
            fc.gas_density = rho;
        }

        let dz: Vec<f64> = (0..=n).map(|j| if j == 0 { 0.0 } else { m.dz(j) }).collect();
        let total_area: f64 = (0..m.n_channels()).map(|ch| m.flow_area(0, ch)).sum();
        let sodium_flow = f.mdot.level_sum(0);
        let rho_na = f.rho.get(fc.peak, fc.channel);

        fc.track.begin_step();
        for _ in 0..2 {
            fc.track.track(
                dt,
                total_gas,
                fc.gas_density,
                total_area,
                venting,
                fc.z_fail,
                fc.length,
                fc.peak,
                &dz,
            );
            fc.track.update_two_phase(fc.gas_density, rho_na, sodium_flow);
            if let Some(ratio) = problem.two_phase_inlet_ratio(fc.channel, &fc.track) {
                self.mdot_ratio = ratio;
            }
        }

        let intense = problem.intensified_voiding(
            fc.origin_pin,
            fc.channel,
            fc.peak,
            fc.z_fail,
            &fc.footprint,
            &fc.track,
            fc.gas_density,
        )?;

        let alpha = fc.track.void_fraction();
        for j in 0..=n {
            self.channel_ht_multiplier[j] = if fc.track.voided[j] { 1.0 - alpha } else { 1.0 };
        }
        log::debug!(
            "voided span [{:.4}, {:.4}] m in channel {}, void fraction {alpha:.4}, inlet ratio {:.4}",
            fc.track.low_z,
            fc.track.high_z,
            fc.channel,
            self.mdot_ratio
        );

        let channel = fc.channel;
        let feedback = CdapFeedback {
            jets: self.jet_boundaries(),
            pin_ht_multiplier: Some(intense.pin_multiplier.clone()),
            friction_multiplier: Some((channel, self.channel_ht_multiplier.clone())),
            channel_ht_multiplier: Some((channel, self.channel_ht_multiplier.clone())),
            inlet_flow_ratio: Some((channel, self.mdot_ratio)),
        };
        self.intense = Some(intense);
        Ok(feedback)
    }
}

impl SubchannelProblem {
    /// Advance the clad damage model by `dt` and apply its feedback to
    /// the pin boundary, the channel friction, the channel wall heat
    /// transfer and the inlet flow.
    pub fn cdap_step(&mut self, dt: f64) -> SubchannelResult<()> {
        let Some(mut cdap) = self.cdap.take() else {
            return Ok(());
        };
        let result = cdap.step(self, dt);
        self.cdap = Some(cdap);
        let feedback = result?;

        if let Some(pins) = self.pins.as_mut() {
            for (pin, jet) in feedback.jets.iter().enumerate() {
                pins.set_jet(pin, *jet);
            }
            pins.reset_channel_ht_multiplier();
            if let Some((ch, mult)) = &feedback.channel_ht_multiplier {
                for (iz, &value) in mult.iter().enumerate() {
                    pins.set_channel_ht_multiplier(iz, *ch, value);
                }
            }
            for iz in 0..=self.mesh.n_cells() {
                for pin in 0..pins.n_pins() {
                    let value = feedback
                        .pin_ht_multiplier
                        .as_ref()
                        .map_or(1.0, |mult| mult[[iz, pin]]);
                    pins.set_ht_multiplier(iz, pin, value);
                }
            }
        }
        self.fields.friction_multiplier.fill(1.0);
        if let Some((ch, mult)) = &feedback.friction_multiplier {
            for (iz, &value) in mult.iter().enumerate() {
                self.fields.friction_multiplier[[iz, *ch]] = value;
            }
        }
        self.inlet_flow_ratio = feedback.inlet_flow_ratio;
        Ok(())
    }
}
