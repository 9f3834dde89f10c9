// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Subchannel Problem
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Solution state of one subchannel case.
//!
//! [`SubchannelProblem`] owns every per-node field, the mesh, the bound
//! closures and the optional pin and clad-damage models. The block
//! assembly (`crate::assembly`) and the outer driver (`crate::driver`)
//! are further `impl` blocks on this type.

use std::ops::RangeInclusive;

use ndarray::Array2;
use subchannel_math::gmres::GmresConfig;
use subchannel_math::newton::NewtonConfig;
use subchannel_math::system::LinearSolverKind;
use subchannel_types::config::{LinearSolverChoice, SubchannelConfig};
use subchannel_types::error::SubchannelResult;
use subchannel_types::state::Field;

use crate::assembly::interpolation_weight;
use crate::cdap::Cdap;
use crate::closures::{FrictionArgs, FrictionCorrelation, MixingCorrelation, MixingInputs};
use crate::fluid::{self, FluidProperties};
use crate::mesh::SubchannelMesh;
use crate::pin::PinModel;
use crate::power::PowerDistribution;

/// Time step used by steady solves, where every time term carries `TR = 0`.
pub(crate) const STEADY_DT: f64 = 1.0;

/// One axial block: cells `first..=last`, solved as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    /// First cell (its inlet is level `first - 1`)
    pub first: usize,
    pub last: usize,
}

impl Block {
    pub fn new(index: usize, size: usize) -> Self {
        Block {
            index,
            first: index * size + 1,
            last: (index + 1) * size,
        }
    }

    pub fn len(&self) -> usize {
        self.last + 1 - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }

    pub fn levels(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }

    /// Row of cell `iz` inside the block.
    #[inline]
    pub fn row(&self, iz: usize) -> usize {
        iz - self.first
    }
}

/// Every solution field of the run.
///
/// Channel fields are \[level, channel\], crossflows \[level, gap\]. The
/// crossflow of cell `iz` is stored at level `iz`; `p` is gauge
/// pressure relative to the outlet.
#[derive(Debug, Clone)]
pub struct FlowFields {
    pub mdot: Field,
    pub p: Field,
    /// Pressure drop of cell `iz`, stored at level `iz` (Pa, or N in the
    /// implicit path where it is a force)
    pub dp: Field,
    pub h: Field,
    pub t: Field,
    pub rho: Field,
    pub mu: Field,
    pub sum_wij: Field,
    pub wij: Field,
    pub wij_prime: Field,
    /// Two-phase friction multiplier \[level, channel\]
    pub friction_multiplier: Array2<f64>,
    /// Clad outer surface temperature \[level, pin\]
    pub pin_surface_t: Field,
    /// Duct inner surface temperature \[level, duct node\]
    pub duct_t: Field,
    /// Prescribed duct wall heat flux \[level, duct node\] (W/m²)
    pub duct_heat_flux: Array2<f64>,
}

impl FlowFields {
    pub(crate) fn new(mesh: &SubchannelMesh) -> Self {
        let n_levels = mesh.n_cells() + 1;
        let n_ch = mesh.n_channels();
        FlowFields {
            mdot: Field::new(n_levels, n_ch),
            p: Field::new(n_levels, n_ch),
            dp: Field::new(n_levels, n_ch),
            h: Field::new(n_levels, n_ch),
            t: Field::new(n_levels, n_ch),
            rho: Field::new(n_levels, n_ch),
            mu: Field::new(n_levels, n_ch),
            sum_wij: Field::new(n_levels, n_ch),
            wij: Field::new(n_levels, mesh.n_gaps()),
            wij_prime: Field::new(n_levels, mesh.n_gaps()),
            friction_multiplier: Array2::from_elem((n_levels, n_ch), 1.0),
            pin_surface_t: Field::new(n_levels, mesh.n_pins()),
            duct_t: Field::new(n_levels, mesh.n_duct_nodes()),
            duct_heat_flux: Array2::zeros((n_levels, mesh.n_duct_nodes())),
        }
    }

    /// Store the current values as the previous-timestep state.
    pub fn snapshot(&mut self) {
        for field in [
            &mut self.mdot,
            &mut self.p,
            &mut self.dp,
            &mut self.h,
            &mut self.t,
            &mut self.rho,
            &mut self.mu,
            &mut self.sum_wij,
            &mut self.wij,
            &mut self.wij_prime,
            &mut self.pin_surface_t,
            &mut self.duct_t,
        ] {
            field.snapshot();
        }
    }
}

/// The subchannel case: geometry, closures, fields and sub-models.
#[derive(Debug)]
pub struct SubchannelProblem {
    pub(crate) config: SubchannelConfig,
    pub(crate) mesh: SubchannelMesh,
    pub(crate) fluid: Box<dyn FluidProperties>,
    pub(crate) friction: FrictionCorrelation,
    pub(crate) mixing: MixingCorrelation,
    pub(crate) power: PowerDistribution,
    pub(crate) fields: FlowFields,
    pub(crate) pins: Option<PinModel>,
    pub(crate) cdap: Option<Cdap>,
    pub(crate) time: f64,
    pub(crate) dt: f64,
    /// 0 for steady solves, 1 for transients
    pub(crate) tr: f64,
    pub(crate) added_k: f64,
    pub(crate) added_k_old: f64,
    /// Inlet flow fraction imposed on one channel by the two-phase Δp match
    pub(crate) inlet_flow_ratio: Option<(usize, f64)>,
    pub(crate) block_size: usize,
    /// Face weight of the bottom node
    pub(crate) alpha: f64,
}

impl SubchannelProblem {
    /// Build the mesh and closures and set every field to the inlet state.
    pub fn new(config: SubchannelConfig) -> SubchannelResult<Self> {
        config.validate()?;
        let mesh = SubchannelMesh::new(&config.geometry)?;
        let fluid = fluid::from_config(&config.fluid);
        let friction = FrictionCorrelation::new(config.closures.friction, &mesh);
        let mixing = MixingCorrelation::new(&config.closures, &mesh);
        let power = PowerDistribution::new(&config.power, &mesh)?;
        let mut fields = FlowFields::new(&mesh);

        let n_ch = mesh.n_channels();
        let bc = &config.boundary;
        let total_area: f64 = (0..n_ch).map(|ch| mesh.flow_area(0, ch)).sum();
        let p_abs = bc.outlet_pressure;
        let h_in = fluid.h_from_p_t(p_abs, bc.inlet_temperature);
        let rho_in = fluid.rho_from_p_t(p_abs, bc.inlet_temperature);
        let mu_in = fluid.mu_from_p_t(p_abs, bc.inlet_temperature);
        for ch in 0..n_ch {
            let s = mesh.flow_area(0, ch);
            let m = match bc.mass_flow {
                Some(total) => total * s / total_area,
                None => bc.mass_flux * s,
            };
            for iz in 0..=mesh.n_cells() {
                fields.mdot.set(iz, ch, m);
                fields.t.set(iz, ch, bc.inlet_temperature);
                fields.h.set(iz, ch, h_in);
                fields.rho.set(iz, ch, rho_in);
                fields.mu.set(iz, ch, mu_in);
            }
        }
        fields.duct_heat_flux.fill(bc.duct_heat_flux);
        fields.pin_surface_t.fill(bc.inlet_temperature);
        fields.duct_t.fill(bc.inlet_temperature);
        fields.snapshot();

        let pins = if config.pin.enabled && mesh.n_pins() > 0 {
            Some(PinModel::new(&config.pin, &mesh)?)
        } else {
            None
        };
        let cdap = match (&pins, config.cdap.enabled) {
            (Some(_), true) => Some(Cdap::new(&config.cdap, &config.pin, &mesh)?),
            _ => None,
        };

        let block_size = config.geometry.n_cells / config.geometry.n_blocks;
        let alpha = interpolation_weight(config.solver.interpolation, config.solver.peclet);
        log::info!(
            "{}: {} channels, {} gaps, {} pins, {} cells in {} blocks",
            config.case_name,
            n_ch,
            mesh.n_gaps(),
            mesh.n_pins(),
            mesh.n_cells(),
            config.geometry.n_blocks
        );

        Ok(SubchannelProblem {
            config,
            mesh,
            fluid,
            friction,
            mixing,
            power,
            fields,
            pins,
            cdap,
            time: 0.0,
            dt: STEADY_DT,
            tr: 0.0,
            added_k: 0.0,
            added_k_old: 0.0,
            inlet_flow_ratio: None,
            block_size,
            alpha,
        })
    }

    /// Create a problem from a JSON case file.
    pub fn from_file(path: &str) -> SubchannelResult<Self> {
        let config = SubchannelConfig::from_file(path)?;
        Self::new(config)
    }

    pub fn config(&self) -> &SubchannelConfig {
        &self.config
    }

    pub fn mesh(&self) -> &SubchannelMesh {
        &self.mesh
    }

    pub fn fields(&self) -> &FlowFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FlowFields {
        &mut self.fields
    }

    pub fn fluid(&self) -> &dyn FluidProperties {
        self.fluid.as_ref()
    }

    pub fn power(&self) -> &PowerDistribution {
        &self.power
    }

    pub fn pins(&self) -> Option<&PinModel> {
        self.pins.as_ref()
    }

    pub fn pins_mut(&mut self) -> Option<&mut PinModel> {
        self.pins.as_mut()
    }

    pub fn cdap(&self) -> Option<&Cdap> {
        self.cdap.as_ref()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn n_blocks(&self) -> usize {
        self.config.geometry.n_blocks
    }

    pub fn block(&self, index: usize) -> Block {
        Block::new(index, self.block_size)
    }

    pub fn added_resistance(&self) -> f64 {
        self.added_k
    }

    /// Inlet flow fraction currently imposed by the two-phase Δp match.
    pub fn inlet_flow_ratio(&self) -> Option<(usize, f64)> {
        self.inlet_flow_ratio
    }

    pub(crate) fn outlet_pressure(&self) -> f64 {
        self.config.boundary.outlet_pressure
    }

    /// Absolute pressure at a channel node.
    #[inline]
    pub(crate) fn p_abs(&self, iz: usize, ch: usize) -> f64 {
        self.fields.p.get(iz, ch) + self.outlet_pressure()
    }

    /// Face value `α·bottom + (1 − α)·top` with the configured scheme.
    #[inline]
    pub(crate) fn interp(&self, bottom: f64, top: f64) -> f64 {
        self.alpha * bottom + (1.0 - self.alpha) * top
    }

    /// Inlet flow of cell `iz` in the explicit mass march, with the
    /// two-phase ratio applied to the bundle inlet of the affected channel.
    /// The implicit assemblies read the stored inlet flow unchanged.
    pub(crate) fn inlet_mdot(&self, iz: usize, ch: usize) -> f64 {
        let m = self.fields.mdot.get(iz - 1, ch);
        match self.inlet_flow_ratio {
            Some((fg, ratio)) if iz == 1 && fg == ch => m * ratio,
            _ => m,
        }
    }

    pub(crate) fn linear_solver(&self) -> LinearSolverKind {
        let s = &self.config.solver;
        match s.linear_solver {
            LinearSolverChoice::Direct => LinearSolverKind::Direct,
            LinearSolverChoice::Gmres => LinearSolverKind::Gmres(GmresConfig {
                restart: s.gmres_restart,
                max_iter: s.maxit,
                rtol: s.rtol,
                atol: s.atol,
                dtol: s.dtol,
                jacobi: true,
            }),
        }
    }

    pub(crate) fn newton_config(&self) -> NewtonConfig {
        let s = &self.config.solver;
        let defaults = NewtonConfig::default();
        NewtonConfig {
            max_iter: s.newton_max_iter,
            rtol: s.newton_rtol,
            atol: s.newton_atol,
            krylov: GmresConfig {
                restart: s.gmres_restart,
                dtol: s.dtol,
                ..defaults.krylov.clone()
            },
            ..defaults
        }
    }

    /// Darcy friction factor of channel `ch` for a given local state.
    pub(crate) fn friction_factor(&self, ch: usize, reynolds: f64, area: f64, perimeter: f64) -> f64 {
        self.friction.friction_factor(FrictionArgs {
            reynolds,
            channel: self.mesh.channel_type(ch),
            flow_area: area,
            wetted_perimeter: perimeter,
        })
    }

    /// Turbulent mixing coefficient of gap `i_gap` over cell `iz`.
    pub(crate) fn mixing_beta(&self, iz: usize, i_gap: usize) -> f64 {
        if let MixingCorrelation::Constant { beta } = self.mixing {
            return beta;
        }
        let (i, j) = self.mesh.gap_channels(i_gap);
        let f = &self.fields;
        let m = &self.mesh;
        let s_i = m.flow_area(iz - 1, i);
        let s_j = m.flow_area(iz - 1, j);
        let flux_in = (f.mdot.get(iz - 1, i) + f.mdot.get(iz - 1, j)) / (s_i + s_j);
        let flux_out = (f.mdot.get(iz, i) + f.mdot.get(iz, j))
            / (m.flow_area(iz, i) + m.flow_area(iz, j));
        let weighted = |prop: &dyn Fn(f64, f64) -> f64| {
            let a = prop(self.p_abs(iz - 1, i), f.t.get(iz - 1, i));
            let b = prop(self.p_abs(iz - 1, j), f.t.get(iz - 1, j));
            (a * s_i + b * s_j) / (s_i + s_j)
        };
        let gap = m.gap(i_gap);
        self.mixing.beta(&MixingInputs {
            mass_flux: 0.5 * (flux_in + flux_out),
            hydraulic_diameter: 4.0 * (s_i + s_j)
                / (m.wetted_perimeter(iz - 1, i) + m.wetted_perimeter(iz - 1, j)),
            viscosity: weighted(&|p, t| self.fluid.mu_from_p_t(p, t)),
            conductivity: weighted(&|p, t| self.fluid.k_from_p_t(p, t)),
            heat_capacity: weighted(&|p, t| self.fluid.cp_from_p_t(p, t)),
            gap_width: m.gap_width(iz, i_gap),
            centroid_distance: gap.centroid_distance,
        })
    }

    /// Heat deposited in channel `ch` over cell `iz` (W).
    ///
    /// Past t = 0 the pin model supplies the wall heat flux; otherwise
    /// the prescribed power distribution does.
    pub(crate) fn added_heat(&self, iz: usize, ch: usize) -> f64 {
        match &self.pins {
            Some(pins) if self.time > 0.0 => {
                if !self.mesh.is_heated_cell(iz) {
                    return 0.0;
                }
                0.5 * (pins.convective_heat(iz - 1, ch) + pins.convective_heat(iz, ch))
                    * self.mesh.dz(iz)
            }
            _ => self.power.added_heat(&self.mesh, iz, ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subchannel_types::config::{FluidConfig, GeometryConfig, LatticeConfig};

    fn square_config() -> SubchannelConfig {
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
            n_cells: 12,
            n_blocks: 3,
            blockage: None,
            k_grid: None,
        });
        cfg.closures.friction = subchannel_types::config::FrictionModel::Pang;
        cfg.fluid = FluidConfig::Constant {
            rho: 1000.0,
            cp: 4000.0,
            k: 0.6,
            mu: 1e-3,
            t_ref: 0.0,
        };
        cfg
    }

    #[test]
    fn test_block_partition() {
        let b = Block::new(1, 4);
        assert_eq!((b.first, b.last), (5, 8));
        assert_eq!(b.len(), 4);
        assert_eq!(b.row(7), 2);
        assert_eq!(b.levels().count(), 4);
    }

    #[test]
    fn test_inlet_state_split_by_area() {
        let mut cfg = square_config();
        cfg.boundary.mass_flow = Some(2.0);
        let problem = SubchannelProblem::new(cfg).unwrap();
        let f = problem.fields();
        let total: f64 = (0..4).map(|ch| f.mdot.get(0, ch)).sum();
        assert!((total - 2.0).abs() < 1e-12);
        assert!((f.h.get(5, 2) - 4000.0 * 628.15).abs() < 1e-6);
        assert_eq!(f.rho.get(12, 3), 1000.0);
        assert_eq!(problem.block(2).last, 12);
    }

    #[test]
    fn test_inlet_ratio_applies_to_first_cell_only() {
        let mut problem = SubchannelProblem::new(square_config()).unwrap();
        let m0 = problem.fields().mdot.get(0, 1);
        problem.inlet_flow_ratio = Some((1, 0.5));
        assert!((problem.inlet_mdot(1, 1) - 0.5 * m0).abs() < 1e-12);
        assert_eq!(problem.inlet_mdot(1, 0), problem.fields().mdot.get(0, 0));
        assert_eq!(problem.inlet_mdot(2, 1), problem.fields().mdot.get(1, 1));
    }
}
