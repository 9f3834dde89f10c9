// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Two-Phase Voiding
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gas slug tracking in the failed channel and its feedback on the
//! channel flow and on the wall heat transfer.
//!
//! While gas is ejected the voided span grows from the breach at the
//! slug velocity; once ejection stops the span advects downstream as a
//! finite slug. Around the breach a footprint of intensified voiding
//! is drawn from an oil-experiment correlation scaled to sodium.

use ndarray::Array2;
use subchannel_types::config::CdapConfig;
use subchannel_types::constants::GRAVITY;
use subchannel_types::error::{SubchannelError, SubchannelResult};

use crate::closures::two_phase::{sodium_gas, TwoPhaseState};
use crate::problem::SubchannelProblem;

/// Void fraction assumed for the slug velocity before one is computed.
const INITIAL_SLUG_VOID: f64 = 0.5;

/// Relative Δp mismatch accepted by the inlet flow match.
const DP_MATCH_TOL: f64 = 0.01;

/// Relative flow step of the inlet flow match.
const DP_MATCH_STEP: f64 = 0.01;

const DP_MATCH_MAXIT: usize = 100;

const FLOOR: f64 = 1e-16;

/// Breach point on the failed clad and its outward normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breach {
    pub location: [f64; 2],
    pub direction: [f64; 2],
}

impl Breach {
    /// Breach on the clad of the pin at `pin_center`, facing `channel_center`.
    pub fn new(pin_center: [f64; 2], pin_diameter: f64, channel_center: [f64; 2]) -> Self {
        let dx = channel_center[0] - pin_center[0];
        let dy = channel_center[1] - pin_center[1];
        let mag = (dx * dx + dy * dy).sqrt();
        let direction = if mag > FLOOR {
            [dx / mag, dy / mag]
        } else {
            [1.0, 0.0]
        };
        Breach {
            location: [
                pin_center[0] + 0.5 * pin_diameter * direction[0],
                pin_center[1] + 0.5 * pin_diameter * direction[1],
            ],
            direction,
        }
    }

    pub fn distance_to(&self, point: [f64; 2]) -> f64 {
        let dx = point[0] - self.location[0];
        let dy = point[1] - self.location[1];
        (dx * dx + dy * dy).sqrt()
    }

    /// Angle (deg) between the breach normal and the direction to `point`.
    pub fn angle_to(&self, point: [f64; 2]) -> f64 {
        let dx = point[0] - self.location[0];
        let dy = point[1] - self.location[1];
        let d = (dx * dx + dy * dy).sqrt();
        let cos = if d > 0.0 {
            (self.direction[0] * dx + self.direction[1] * dy) / d
        } else {
            1.0
        };
        cos.clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Two-phase footprint radius around the breach as a function of height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Radius at the breach in sodium (m)
    pub base_radius: f64,
    /// Axial growth slope in sodium
    pub slope: f64,
    radius_frac: f64,
    max_radius: f64,
}

impl Footprint {
    pub fn new(config: &CdapConfig, pressure_ratio: f64) -> Self {
        let scale = (config.oil_viscosity / config.sodium_viscosity).sqrt()
            * (config.oil_surface_tension / config.sodium_surface_tension).powf(0.3);
        let base_radius = config.r_oil * config.breach_diameter * pressure_ratio.sqrt()
            / (config.breach_diameter_ref * config.pressure_ratio_ref.sqrt())
            * scale;
        Footprint {
            base_radius,
            slope: config.m_oil * scale,
            radius_frac: config.radius_frac,
            max_radius: config.max_two_phase_radius,
        }
    }

    /// Footprint radius at height `z` for a breach at `z_fail`, seen at
    /// an angle `theta` (deg) from the breach normal.
    pub fn radius(&self, z: f64, z_fail: f64, theta: f64) -> SubchannelResult<f64> {
        let r = self.base_radius;
        let side = if theta > 150.0 {
            self.radius_frac * r
        } else if theta < 30.0 {
            r
        } else {
            r - (theta - 30.0) / 120.0 * (r - self.radius_frac * r)
        };
        let two_r = if z <= z_fail - r {
            0.0
        } else if z < z_fail {
            side
        } else {
            side + self.slope * (z - z_fail)
        };
        if two_r < 0.0 || two_r.is_nan() {
            return Err(SubchannelError::PhysicsViolation(format!(
                "negative two-phase radius {two_r:e} at z = {z}"
            )));
        }
        Ok(two_r.min(self.max_radius))
    }
}

/// Axial extent of the gas slug in the failed channel.
#[derive(Debug, Clone, Default)]
pub struct GasTrack {
    /// Slug growth of every tracked step (m)
    trail: Vec<f64>,
    /// Gas ejected at every tracked step (kg/s)
    ejected: Vec<f64>,
    /// Tracked steps completed before the current one
    base: usize,
    /// Voided flag per axial level
    pub voided: Vec<bool>,
    pub low_z: f64,
    pub high_z: f64,
    developed_high: f64,
    /// Gas flow averaged over the slug (kg/s)
    pub channel_gas_flow: f64,
    pub two_phase: Option<TwoPhaseState>,
}

impl GasTrack {
    pub fn new(n_levels: usize) -> Self {
        GasTrack {
            voided: vec![false; n_levels],
            ..GasTrack::default()
        }
    }

    /// Start a new time step; later `track` calls overwrite its entry.
    pub fn begin_step(&mut self) {
        self.base = self.trail.len();
    }

    pub fn void_fraction(&self) -> f64 {
        self.two_phase.map_or(0.0, |s| s.void_fraction)
    }

    fn slug_void(&self) -> f64 {
        let alpha = self.void_fraction();
        if alpha < 1e-8 {
            INITIAL_SLUG_VOID
        } else {
            alpha
        }
    }

    fn mark(&mut self, peak: usize, dz: &[f64]) {
        let mut z = self.low_z;
        for j in peak..dz.len() {
            z += dz[j];
            self.voided[j] = z >= self.low_z && z < self.high_z;
        }
    }

    /// Move the slug bounds over `dt`.
    ///
    /// `dz[j]` is the height of cell `j` (`dz[0] = 0`), `peak` the breach
    /// level, `z_fail` the breach height and `fail_length` the channel
    /// length above it.
    #[allow(clippy::too_many_arguments)]
    pub fn track(
        &mut self,
        dt: f64,
        ejected: f64,
        gas_density: f64,
        total_area: f64,
        venting: bool,
        z_fail: f64,
        fail_length: f64,
        peak: usize,
        dz: &[f64],
    ) {
        self.trail.truncate(self.base);
        self.ejected.truncate(self.base);
        let velocity = ejected / gas_density.max(FLOOR) / total_area / self.slug_void();
        self.trail.push(velocity * dt);
        self.ejected.push(ejected);

        if venting {
            self.low_z = z_fail;
            let total: f64 = self.trail.iter().sum();
            if total < fail_length {
                let weighted: f64 = self.trail.iter().zip(&self.ejected).map(|(l, m)| l * m).sum();
                self.channel_gas_flow = if total > 0.0 { weighted / total } else { 0.0 };
                self.high_z = z_fail + total;
                self.mark(peak, dz);
                self.voided[peak] = true;
            } else {
                // gas fills the channel above the breach; keep the newest trails
                let mut length = 0.0;
                let mut weighted = 0.0;
                for k in (0..self.trail.len()).rev() {
                    length += self.trail[k];
                    if length > fail_length {
                        self.trail[k] -= length - fail_length;
                        weighted += self.ejected[k] * self.trail[k];
                        length = fail_length;
                        break;
                    }
                    weighted += self.ejected[k] * self.trail[k];
                }
                self.channel_gas_flow = if length > 0.0 { weighted / length } else { 0.0 };
                self.high_z = z_fail + length;
                for v in self.voided.iter_mut().skip(peak) {
                    *v = true;
                }
            }
            self.developed_high = self.high_z;
        } else {
            let velocity =
                self.channel_gas_flow / gas_density.max(FLOOR) / total_area / self.slug_void();
            self.low_z = (self.low_z + velocity * dt).min(self.developed_high);
            self.high_z = (self.high_z + velocity * dt).min(self.developed_high);
            self.voided[peak] = false;
            self.mark(peak, dz);
        }
    }

    /// Lockhart–Martinelli state of the slug against the sodium flow.
    pub fn update_two_phase(&mut self, gas_density: f64, sodium_density: f64, sodium_flow: f64) {
        let x = self.channel_gas_flow / (self.channel_gas_flow + sodium_flow).max(FLOOR);
        self.two_phase = Some(sodium_gas(x, gas_density, sodium_density));
    }

    /// Whether any level still carries gas.
    pub fn is_voided(&self) -> bool {
        self.voided.iter().any(|&v| v)
    }
}

/// Intensified voiding around the breach.
#[derive(Debug, Clone)]
pub struct IntenseVoiding {
    /// Void fraction of the footprint per level
    pub void_fraction: Vec<f64>,
    /// `1 − α` inside the footprint, 1 outside \[level, channel\]
    pub channel_multiplier: Array2<f64>,
    /// Perimeter-weighted channel multiplier \[level, pin\]
    pub pin_multiplier: Array2<f64>,
}

impl SubchannelProblem {
    fn inlet_totals(&self) -> (f64, f64) {
        (0..self.mesh.n_channels()).fold((0.0, 0.0), |(s, m), ch| {
            (s + self.mesh.flow_area(0, ch), m + self.fields.mdot.get(0, ch))
        })
    }

    /// Single-phase reference Δp of `channel` at flow `mdot`, and the same
    /// with the two-phase multipliers inside the voided span.
    fn channel_pressure_drop(
        &self,
        channel: usize,
        mdot: f64,
        track: &GasTrack,
        state: TwoPhaseState,
    ) -> (f64, f64) {
        let m = &self.mesh;
        let f = &self.fields;
        let mut single = 0.0;
        let mut two_phase = 0.0;
        for j in 1..=m.n_cells() {
            let s = m.flow_area(j, channel);
            let pw = m.wetted_perimeter(j, channel);
            let dh = 4.0 * s / pw;
            let rho = f.rho.get(j, channel).max(1e-12);
            let mu = f.mu.get(j, channel).max(1e-12);
            let re = (mdot / (s * rho)).abs() * dh / mu;
            let ff = self.friction_factor(channel, re, s, pw);
            let k_eff = ff * m.dz(j) / dh + m.form_loss(j, channel);
            let fric = k_eff * mdot * mdot / rho / 2.0 / (s * s).max(1e-24);
            let grav = GRAVITY * rho * m.dz(j);
            single += fric + grav;
            if track.voided[j] {
                two_phase += state.friction_multiplier * fric + state.gravity_multiplier * grav;
            } else {
                two_phase += fric + grav;
            }
        }
        (single, two_phase)
    }

    /// Inlet flow fraction of the failed channel that reproduces the
    /// single-phase Δp with the voided span in place.
    ///
    /// Returns `None` when the match does not settle.
    pub(crate) fn two_phase_inlet_ratio(&self, channel: usize, track: &GasTrack) -> Option<f64> {
        let state = track.two_phase?;
        let (area, total) = self.inlet_totals();
        let mdot_ch = total * self.mesh.flow_area(0, channel) / area.max(FLOOR);
        let (dp_ref, _) = self.channel_pressure_drop(channel, mdot_ch, track, state);

        let mut mdot = mdot_ch;
        for it in 1..=DP_MATCH_MAXIT {
            let (_, dp) = self.channel_pressure_drop(channel, mdot, track, state);
            let error = (dp - dp_ref).abs() / dp.max(FLOOR);
            if error < DP_MATCH_TOL {
                log::debug!("two-phase Δp match: ratio {:.4} after {it} steps", mdot / mdot_ch);
                return Some((mdot / mdot_ch.max(FLOOR)).min(1.0));
            }
            if dp > dp_ref {
                mdot *= 1.0 - DP_MATCH_STEP;
            } else {
                mdot *= 1.0 + DP_MATCH_STEP;
            }
        }
        log::warn!("two-phase Δp match did not settle in {DP_MATCH_MAXIT} steps");
        None
    }

    /// Footprint mask, void fraction and heat-transfer multipliers around
    /// a breach on `failed_pin` facing `channel`.
    pub(crate) fn intensified_voiding(
        &self,
        failed_pin: usize,
        channel: usize,
        peak: usize,
        z_fail: f64,
        footprint: &Footprint,
        track: &GasTrack,
        gas_density: f64,
    ) -> SubchannelResult<IntenseVoiding> {
        let m = &self.mesh;
        let f = &self.fields;
        let n_levels = m.n_cells() + 1;
        let n_ch = m.n_channels();
        let breach = Breach::new(m.pin_position(failed_pin), m.pin_diameter(), m.channel_position(channel));
        let (area, sodium_total) = self.inlet_totals();
        let area = area.max(FLOOR);
        let next = (peak + 1).min(m.n_cells());
        let rho_na = 0.5 * (f.rho.get(peak, channel) + f.rho.get(next, channel));
        let z0 = m.z_grid()[0];

        let mut void_fraction = vec![0.0; n_levels];
        let mut channel_multiplier = Array2::ones((n_levels, n_ch));
        for j in 1..n_levels {
            let z = m.z_grid()[j] - z0;
            let mut flagged = Vec::new();
            for ch in 0..n_ch {
                let centre = m.channel_position(ch);
                let radius = footprint.radius(z, z_fail, breach.angle_to(centre))?;
                if breach.distance_to(centre) < radius && (track.voided[peak] || track.voided[j]) {
                    flagged.push(ch);
                }
            }
            let flagged_area: f64 = flagged.iter().map(|&ch| m.flow_area(j, ch)).sum();
            let sodium = sodium_total * flagged_area / area;
            let x = track.channel_gas_flow / (track.channel_gas_flow + sodium).max(FLOOR);
            let alpha = sodium_gas(x, gas_density, rho_na).void_fraction;
            void_fraction[j] = alpha;
            for ch in flagged {
                channel_multiplier[[j, ch]] = 1.0 - alpha;
            }
        }

        let mut pin_multiplier = Array2::ones((n_levels, m.n_pins()));
        for pin in 0..m.n_pins() {
            let fractions = m.pin_channel_fractions(pin);
            let weight: f64 = fractions.iter().sum();
            for j in 1..n_levels {
                let sum: f64 = m
                    .pin_channels(pin)
                    .iter()
                    .zip(fractions)
                    .map(|(&ch, &frac)| frac * channel_multiplier[[j, ch]])
                    .sum();
                pin_multiplier[[j, pin]] = sum / weight;
            }
        }
        Ok(IntenseVoiding {
            void_fraction,
            channel_multiplier,
            pin_multiplier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breach_faces_channel() {
        let b = Breach::new([0.0, 0.0], 0.01, [0.02, 0.0]);
        assert_eq!(b.location, [0.005, 0.0]);
        assert!(b.angle_to([0.03, 0.0]).abs() < 1e-9);
        assert!((b.angle_to([0.005, 0.01]) - 90.0).abs() < 1e-9);
        assert!((b.angle_to([-0.01, 0.0]) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_footprint_shape() {
        let cfg = CdapConfig::default();
        let fp = Footprint::new(&cfg, cfg.pressure_ratio_ref);
        let r = fp.base_radius;
        assert!(r > 0.0);
        assert_eq!(fp.radius(0.5 - 2.0 * r, 0.5, 0.0).unwrap(), 0.0);
        assert!((fp.radius(0.5 - 0.5 * r, 0.5, 10.0).unwrap() - r).abs() < 1e-15);
        let back = fp.radius(0.5 - 0.5 * r, 0.5, 170.0).unwrap();
        assert!((back - cfg.radius_frac * r).abs() < 1e-15);
        let above = fp.radius(0.6, 0.5, 10.0).unwrap();
        assert!(above > r && above <= cfg.max_two_phase_radius);
    }

    #[test]
    fn test_negative_radius_is_error() {
        let mut cfg = CdapConfig::default();
        cfg.m_oil = -10.0;
        let fp = Footprint::new(&cfg, cfg.pressure_ratio_ref);
        assert!(matches!(
            fp.radius(1.0, 0.5, 0.0),
            Err(SubchannelError::PhysicsViolation(_))
        ));
    }

    #[test]
    fn test_slug_grows_then_advects() {
        let dz = vec![0.0, 0.1, 0.1, 0.1, 0.1, 0.1];
        let mut track = GasTrack::new(6);
        // breach in the middle of cell 2, 0.35 m of channel above it
        let (z_fail, length, peak) = (0.15, 0.35, 2);
        track.begin_step();
        track.track(0.01, 1e-3, 1.0, 1e-3, true, z_fail, length, peak, &dz);
        assert!(track.high_z > track.low_z);
        assert!(track.voided[peak]);
        let high = track.high_z;

        for _ in 0..20 {
            track.begin_step();
            track.track(0.01, 1e-3, 1.0, 1e-3, true, z_fail, length, peak, &dz);
        }
        assert!((track.high_z - (z_fail + length)).abs() < 1e-12);
        assert!(track.high_z > high);
        assert!(track.voided[5]);

        track.begin_step();
        track.track(0.01, 0.0, 1.0, 1e-3, false, z_fail, length, peak, &dz);
        assert!(track.low_z > z_fail);
        assert!(!track.voided[peak]);
        assert!(track.high_z <= z_fail + length);
    }

    #[test]
    fn test_repeated_track_in_one_step_overwrites() {
        let dz = vec![0.0, 0.1, 0.1, 0.1];
        let mut track = GasTrack::new(4);
        track.begin_step();
        track.track(0.01, 1e-3, 1.0, 1e-3, true, 0.05, 0.25, 1, &dz);
        let once = track.high_z;
        track.track(0.01, 1e-3, 1.0, 1e-3, true, 0.05, 0.25, 1, &dz);
        assert_eq!(track.high_z, once);
    }

    #[test]
    fn test_two_phase_state_from_flows() {
        let mut track = GasTrack::new(3);
        track.update_two_phase(1.0, 850.0, 5.0);
        assert_eq!(track.void_fraction(), 0.0);
        track.channel_gas_flow = 1e-3;
        track.update_two_phase(1.0, 850.0, 5.0);
        let alpha = track.void_fraction();
        assert!(alpha > 0.0 && alpha < 1.0);
    }
}
