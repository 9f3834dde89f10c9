// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Coupled Solve Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Outer pressure iteration over the axial blocks with an inner
//! temperature iteration per block, followed by the wall temperatures
//! and the bundle summary.
//!
//! Within one inner pass the order is fixed: flow solve, enthalpy and
//! temperature, then density and viscosity, then the convergence check.

use std::time::Instant;

use subchannel_types::error::{SubchannelError, SubchannelResult};
use subchannel_types::state::{BundleSummary, SolveReport};

use crate::problem::{Block, SubchannelProblem};

/// Outer iteration cap of the monolithic path.
const IMPLICIT_P_IT_MAX: usize = 100;

/// Outer iteration cap of a single-block segregated run.
const SINGLE_BLOCK_P_IT_MAX: usize = 5;

/// Outer passes per block of a multi-block segregated run.
const SEGREGATED_P_IT_PER_BLOCK: usize = 20;

/// Power balance below which the energy equation is flagged (W).
const ENERGY_WARNING_THRESHOLD: f64 = -1.0;

const NORM_FLOOR: f64 = 1e-14;

/// Relative change of an L2 norm between two iterates.
fn relative_change(new: f64, old: f64, offset: f64) -> f64 {
    ((new - old) / (old + offset + NORM_FLOOR)).abs()
}

impl SubchannelProblem {
    /// Outer iteration cap from the configuration or the block layout.
    pub fn pressure_iteration_cap(&self) -> usize {
        let s = &self.config.solver;
        if let Some(n) = s.p_it_max {
            return n;
        }
        let n_blocks = self.n_blocks();
        match (s.segregated, n_blocks) {
            (false, _) => IMPLICIT_P_IT_MAX,
            (true, 1) => SINGLE_BLOCK_P_IT_MAX,
            (true, n) => SEGREGATED_P_IT_PER_BLOCK * n,
        }
    }

    /// Initial guess of the monolithic path: lift the inlet flow and
    /// enthalpy through the bundle and each crossflow up one level.
    pub(crate) fn initialize_solution(&mut self) {
        let f = &mut self.fields;
        for iz in 1..=self.mesh.n_cells() {
            for ch in 0..self.mesh.n_channels() {
                let m = f.mdot.get(iz - 1, ch);
                let h = f.h.get(iz - 1, ch);
                f.mdot.set(iz, ch, m);
                f.h.set(iz, ch, h);
            }
        }
        for iz in 2..=self.mesh.n_cells() {
            for g in 0..self.mesh.n_gaps() {
                let w = f.wij.get(iz - 1, g);
                f.wij.set(iz, g, w);
            }
        }
    }

    /// One inner pass over `block`: flow, energy, then properties.
    fn solve_block_pass(&mut self, block: Block) -> SubchannelResult<()> {
        let s = &self.config.solver;
        let (segregated, monolithic, power) = (s.segregated, s.monolithic_thermal, s.compute_power);
        let (density, viscosity) = (s.compute_density, s.compute_viscosity);

        if segregated {
            self.solve_crossflow(block)?;
            if power {
                self.compute_h(block)?;
                self.compute_t(block);
            }
        } else if monolithic {
            self.implicit_solve(block)?;
            self.compute_t(block);
        } else {
            self.implicit_solve(block)?;
            log::trace!("block {}: main solve done", block.index);
            if power {
                self.compute_h(block)?;
                self.compute_t(block);
            }
        }
        if density {
            self.compute_rho(block);
        }
        if viscosity {
            self.compute_mu(block);
        }
        Ok(())
    }

    /// Drive the flow and temperature fields to a converged state for the
    /// current time level.
    ///
    /// Iteration-cap exhaustion clears `converged` in the report; fatal
    /// states (negative flow in the explicit path, conduction failure,
    /// divergence) return an error.
    pub fn external_solve(&mut self) -> SubchannelResult<SolveReport> {
        let start = Instant::now();
        let p_tol = self.config.solver.p_tol;
        let t_tol = self.config.solver.t_tol;
        let t_maxit = self.config.solver.t_maxit;
        let p_out = self.outlet_pressure();
        let n_blocks = self.n_blocks();
        let p_it_max = self.pressure_iteration_cap();

        // 1. Initial guess
        if !self.config.solver.segregated {
            self.initialize_solution();
            log::debug!("solution initialized");
        }

        // 2. Outer pressure iteration
        let mut converged = true;
        let mut p_error = 1.0;
        let mut t_error = 0.0;
        let mut p_it = 0;
        let mut t_total = 0;
        while p_error > p_tol && p_it < p_it_max {
            p_it += 1;
            log::info!("outer iteration {p_it}");
            let p_norm_old = self.fields.p.l2_norm();

            for index in 0..n_blocks {
                let block = self.block(index);
                log::debug!("block {index}: levels {} to {}", block.first, block.last);
                self.set_inlet_enthalpy(block);

                // 2a. Inner temperature iteration
                let mut t_it = 0;
                t_error = 1.0;
                while t_error > t_tol && t_it < t_maxit {
                    t_it += 1;
                    let t_norm_old = self.fields.t.l2_norm();
                    self.solve_block_pass(block)?;
                    t_error = relative_change(self.fields.t.l2_norm(), t_norm_old, 0.0);
                    log::debug!("block {index}: T_block_error = {t_error:.3e}");
                    if t_error.is_nan() {
                        return Err(SubchannelError::SolverDiverged {
                            iteration: p_it,
                            message: format!("temperature norm is NaN in block {index}"),
                        });
                    }
                }
                if t_error > t_tol {
                    log::warn!("block {index}: reached the maximum of {t_maxit} temperature iterations");
                    converged = false;
                }
                t_total += t_it;
            }

            p_error = relative_change(self.fields.p.l2_norm(), p_norm_old, p_out);
            log::debug!("P_error = {p_error:.3e}");
            if p_error.is_nan() {
                return Err(SubchannelError::SolverDiverged {
                    iteration: p_it,
                    message: "pressure norm is NaN".to_string(),
                });
            }
        }
        if p_error > p_tol && n_blocks != 1 {
            log::warn!("reached the maximum of {p_it_max} outer pressure iterations");
            converged = false;
        }
        log::info!("subchannel solve finished after {p_it} outer iterations");

        // 3. Wall temperatures
        self.update_wall_temperatures()?;

        // 4. Bundle summary
        let summary = self.bundle_summary();
        if self.config.solver.verbose {
            log_summary(&summary);
        }
        let added = summary.power_added();
        if added <= ENERGY_WARNING_THRESHOLD {
            log::warn!(
                "energy conservation equation might not be solved correctly, power added to coolant: {added:.4} W"
            );
        }

        Ok(SolveReport {
            converged,
            iterations: p_it,
            temperature_iterations: t_total,
            pressure_residual: p_error,
            temperature_residual: t_error,
            summary,
            solve_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }

    /// Pin and duct surface temperatures from the converged channel state.
    fn update_wall_temperatures(&mut self) -> SubchannelResult<()> {
        let p_out = self.outlet_pressure();
        let t_in = self.config.boundary.inlet_temperature;
        let dt = (self.tr > 0.0).then_some(self.dt);

        if let Some(pins) = self.pins.as_mut() {
            pins.set_convective_bc(&self.mesh, &self.fields, self.fluid.as_ref(), p_out, t_in);
            pins.solve(&self.mesh, &self.power, dt)?;
            pins.set_convective_bc(&self.mesh, &self.fields, self.fluid.as_ref(), p_out, t_in);
            for iz in 0..=self.mesh.n_cells() {
                for pin in 0..pins.n_pins() {
                    self.fields.pin_surface_t.set(iz, pin, pins.surface_temperature(iz, pin));
                }
            }
        } else if self.mesh.n_pins() > 0 {
            self.compute_pin_surface_from_coolant();
        }

        if self.mesh.n_duct_nodes() > 0 {
            self.compute_duct_temperature();
        }
        Ok(())
    }

    /// Inlet/outlet balances and bundle-averaged quantities.
    pub fn bundle_summary(&self) -> BundleSummary {
        let m = &self.mesh;
        let f = &self.fields;
        let n = m.n_cells();
        let p_out = self.outlet_pressure();

        let mut s = BundleSummary {
            outlet_pressure: p_out,
            ..BundleSummary::default()
        };
        let mut perimeter = 0.0;
        let mut p_weighted = 0.0;
        for ch in 0..m.n_channels() {
            let area = m.flow_area(0, ch);
            s.flow_area += area;
            perimeter += m.wetted_perimeter(0, ch);
            s.power_in += f.mdot.get(0, ch) * f.h.get(0, ch);
            s.power_out += f.mdot.get(n, ch) * f.h.get(n, ch);
            s.mass_flow_in += f.mdot.get(0, ch);
            s.mass_flow_out += f.mdot.get(n, ch);
            p_weighted += f.p.get(0, ch) * area;
        }
        let h_bulk = s.power_out / s.mass_flow_out;
        s.bulk_outlet_temperature = self.fluid.t_from_p_h(p_out, h_bulk);
        s.hydraulic_diameter = 4.0 * s.flow_area / perimeter;
        s.reynolds = s.mass_flow_in * s.hydraulic_diameter / (f.mu.get(0, 0) * s.flow_area);
        s.pressure_drop = p_weighted / s.flow_area;
        s
    }
}

fn log_summary(s: &BundleSummary) {
    log::info!("=======================================");
    log::info!("======== Subchannel Print Outs ========");
    log::info!("=======================================");
    log::info!("Total flow area: {:.6e} m^2", s.flow_area);
    log::info!("Assembly hydraulic diameter: {:.6e} m", s.hydraulic_diameter);
    log::info!("Assembly Re number: {:.4} [-]", s.reynolds);
    log::info!("Bulk coolant temperature at outlet: {:.4} K", s.bulk_outlet_temperature);
    log::info!("Power added to coolant: {:.4} W", s.power_added());
    log::info!("Mass flow rate in: {:.6} kg/s", s.mass_flow_in);
    log::info!("Mass balance: {:.4e} kg/s", s.mass_balance());
    log::info!("Inlet pressure drop: {:.4} Pa", s.pressure_drop);
    log::info!("User defined outlet pressure: {:.1} Pa", s.outlet_pressure);
    log::info!("=======================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use subchannel_types::config::{FrictionModel, GeometryConfig, LatticeConfig, SubchannelConfig};

    fn config(n_blocks: usize) -> SubchannelConfig {
        let mut cfg = SubchannelConfig::with_geometry(GeometryConfig {
            lattice: LatticeConfig::Square {
                nx: 2,
                ny: 2,
                side_gap: 1.0e-3,
            },
            pitch: 0.0126,
            pin_diameter: 0.0095,
            wire_diameter: 0.0,
            wire_lead_length: 0.0,
            heated_length: 1.0,
            unheated_length_entry: 0.0,
            unheated_length_exit: 0.0,
            n_cells: 4,
            n_blocks,
            blockage: None,
            k_grid: None,
        });
        cfg.closures.friction = FrictionModel::TodreasKazimi;
        cfg
    }

    #[test]
    fn test_relative_change() {
        assert_eq!(relative_change(2.0, 2.0, 0.0), 0.0);
        assert!((relative_change(3.0, 2.0, 0.0) - 0.5).abs() < 1e-12);
        assert!(relative_change(1.0, 0.0, 0.0) > 1e13);
    }

    #[test]
    fn test_pressure_iteration_cap() {
        let single = SubchannelProblem::new(config(1)).unwrap();
        assert_eq!(single.pressure_iteration_cap(), SINGLE_BLOCK_P_IT_MAX);
        let split = SubchannelProblem::new(config(2)).unwrap();
        assert_eq!(split.pressure_iteration_cap(), 40);

        let mut cfg = config(2);
        cfg.solver.segregated = false;
        cfg.solver.implicit = true;
        assert_eq!(SubchannelProblem::new(cfg).unwrap().pressure_iteration_cap(), 100);

        let mut cfg = config(1);
        cfg.solver.p_it_max = Some(7);
        assert_eq!(SubchannelProblem::new(cfg).unwrap().pressure_iteration_cap(), 7);
    }

    fn heated(n_blocks: usize, tol: f64) -> SubchannelConfig {
        let mut cfg = config(n_blocks);
        cfg.fluid = subchannel_types::config::FluidConfig::Constant {
            rho: 850.0,
            cp: 1270.0,
            k: 65.0,
            mu: 2.5e-4,
            t_ref: 0.0,
        };
        cfg.boundary.mass_flow = Some(0.4);
        cfg.power.total_power = 1.0e4;
        cfg.solver.p_it_max = Some(1);
        cfg.solver.p_tol = tol;
        cfg.solver.t_maxit = 1;
        cfg.solver.t_tol = tol;
        cfg
    }

    #[test]
    fn test_last_allowed_iteration_can_still_converge() {
        let mut p = SubchannelProblem::new(heated(2, 1.0e30)).unwrap();
        let report = p.external_solve().unwrap();
        assert_eq!(report.iterations, 1);
        assert!(report.converged);
    }

    #[test]
    fn test_exhausted_caps_clear_converged() {
        let mut p = SubchannelProblem::new(heated(2, 1.0e-300)).unwrap();
        let report = p.external_solve().unwrap();
        assert_eq!(report.iterations, 1);
        assert!(!report.converged);
    }

    #[test]
    fn test_initial_guess_lifts_inlet_state() {
        let mut p = SubchannelProblem::new(config(1)).unwrap();
        p.fields.mdot.set(0, 1, 0.7);
        p.fields.h.set(0, 1, 1.0e5);
        p.fields.wij.set(1, 0, 0.01);
        p.initialize_solution();
        assert_eq!(p.fields().mdot.get(4, 1), 0.7);
        assert_eq!(p.fields().h.get(3, 1), 1.0e5);
        assert_eq!(p.fields().wij.get(4, 0), 0.01);
    }

    #[test]
    fn test_summary_of_inlet_state() {
        let mut cfg = config(1);
        cfg.boundary.mass_flow = Some(1.2);
        cfg.power.total_power = 0.0;
        let p = SubchannelProblem::new(cfg).unwrap();
        let s = p.bundle_summary();
        assert!((s.mass_flow_in - 1.2).abs() < 1e-12);
        assert!(s.mass_balance().abs() < 1e-12);
        assert!(s.power_added().abs() < 1e-9);
        assert!((s.bulk_outlet_temperature - p.config().boundary.inlet_temperature).abs() < 1e-4);
        assert!(s.reynolds > 0.0 && s.hydraulic_diameter > 0.0);
    }
}
