// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — End-to-End Bundle Scenarios
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::collections::HashMap;

use subchannel_core::mesh::ChannelType;
use subchannel_core::{Simulation, SubchannelProblem};
use subchannel_types::config::{
    FluidConfig, ForcedFailureConfig, FrictionModel, GeometryConfig, LatticeConfig,
    SubchannelConfig,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn constant_sodium() -> FluidConfig {
    FluidConfig::Constant {
        rho: 850.0,
        cp: 1270.0,
        k: 65.0,
        mu: 2.5e-4,
        t_ref: 0.0,
    }
}

fn square(nx: usize, ny: usize, n_cells: usize) -> SubchannelConfig {
    let mut cfg = SubchannelConfig::with_geometry(GeometryConfig {
        lattice: LatticeConfig::Square {
            nx,
            ny,
            side_gap: 1.0e-3,
        },
        pitch: 0.0126,
        pin_diameter: 0.0095,
        wire_diameter: 0.0,
        wire_lead_length: 0.0,
        heated_length: 1.0,
        unheated_length_entry: 0.0,
        unheated_length_exit: 0.0,
        n_cells,
        n_blocks: 1,
        blockage: None,
        k_grid: None,
    });
    cfg.closures.friction = FrictionModel::TodreasKazimi;
    cfg
}

fn hex(n_rings: usize, flat_to_flat: f64, wire: bool) -> SubchannelConfig {
    SubchannelConfig::with_geometry(GeometryConfig {
        lattice: LatticeConfig::Triangular {
            n_rings,
            flat_to_flat,
        },
        pitch: 0.0089,
        pin_diameter: 0.0074,
        wire_diameter: if wire { 0.0014 } else { 0.0 },
        wire_lead_length: if wire { 0.2 } else { 0.0 },
        heated_length: 1.0,
        unheated_length_entry: 0.0,
        unheated_length_exit: 0.0,
        n_cells: 10,
        n_blocks: 1,
        blockage: None,
        k_grid: None,
    })
}

#[test]
fn test_single_channel_enthalpy_rise() {
    init_logging();
    let mut cfg = square(1, 1, 10);
    cfg.fluid = constant_sodium();
    cfg.boundary.mass_flow = Some(1.0);
    cfg.power.total_power = 1000.0;
    cfg.solver.verbose = true;

    let mut sim = Simulation::new(cfg).unwrap();
    assert_eq!(sim.problem().mesh().n_gaps(), 0);
    let report = sim.steady().unwrap();
    let f = sim.problem().fields();
    let n = sim.problem().mesh().n_cells();

    assert!(report.converged);
    assert!((f.h.get(n, 0) - f.h.get(0, 0) - 1000.0).abs() < 1e-6);
    assert!((report.summary.power_added() - 1000.0).abs() < 1e-6);
    assert!(report.summary.mass_balance().abs() < 1e-12);
    // friction and gravity both raise the inlet pressure above the outlet
    assert!(f.p.get(0, 0) > 0.0);
    assert!(report.summary.pressure_drop > 0.0);
}

#[test]
fn test_symmetric_bundle_has_no_crossflow() {
    init_logging();
    let mut cfg = square(2, 2, 8);
    cfg.fluid = constant_sodium();
    cfg.boundary.mass_flow = Some(0.4);
    cfg.power.total_power = 2.0e4;

    let mut p = SubchannelProblem::new(cfg).unwrap();
    p.external_solve().unwrap();
    let f = p.fields();
    for iz in 0..=p.mesh().n_cells() {
        for g in 0..p.mesh().n_gaps() {
            assert!(f.wij.get(iz, g).abs() < 1e-10, "level {iz} gap {g}");
        }
    }
    let n = p.mesh().n_cells();
    let rise = f.h.get(n, 0) - f.h.get(0, 0);
    for ch in 1..4 {
        assert!((f.h.get(n, ch) - f.h.get(0, ch) - rise).abs() < 1e-6);
    }
}

#[test]
fn test_monolithic_path_conserves_energy() {
    init_logging();
    let mut cfg = square(2, 2, 6);
    cfg.fluid = constant_sodium();
    cfg.boundary.mass_flow = Some(0.4);
    cfg.power.total_power = 2.0e4;
    cfg.solver.segregated = false;
    cfg.solver.implicit = true;

    let mut p = SubchannelProblem::new(cfg).unwrap();
    let report = p.external_solve().unwrap();
    assert!((report.summary.power_added() - 2.0e4).abs() < 1e-3 * 2.0e4);
    assert!(report.summary.mass_balance().abs() < 1e-8);
}

#[test]
fn test_hexagonal_bundle_keeps_rotational_symmetry() {
    init_logging();
    let mut cfg = hex(3, 0.0400, false);
    cfg.fluid = constant_sodium();
    cfg.boundary.mass_flow = Some(2.0);
    cfg.power.total_power = 1.0e5;

    let mut p = SubchannelProblem::new(cfg).unwrap();
    let report = p.external_solve().unwrap();
    let m = p.mesh();
    let n = m.n_cells();
    let corners: Vec<usize> = (0..m.n_channels())
        .filter(|&ch| m.channel_type(ch) == ChannelType::Corner)
        .collect();
    assert_eq!(corners.len(), 6);

    let f = p.fields();
    let reference = f.mdot.get(n, corners[0]);
    for &ch in &corners[1..] {
        assert!(((f.mdot.get(n, ch) - reference) / reference).abs() < 1e-6);
    }
    assert!((report.summary.power_added() - 1.0e5).abs() < 1e-3 * 1.0e5);

    // gaps related by a rotation or mirror of the hexagon carry the same |W|
    let mut orbits: HashMap<(u8, u8, i64, i64), Vec<usize>> = HashMap::new();
    for g in 0..m.n_gaps() {
        let (a, b) = m.gap_channels(g);
        let (pa, pb) = (m.channel_position(a), m.channel_position(b));
        let mid = [0.5 * (pa[0] + pb[0]), 0.5 * (pa[1] + pb[1])];
        let radius = mid[0].hypot(mid[1]);
        let sector = mid[1].atan2(mid[0]).to_degrees().rem_euclid(60.0);
        let folded = sector.min(60.0 - sector);
        let (ta, tb) = (m.channel_type(a) as u8, m.channel_type(b) as u8);
        let key = (
            ta.min(tb),
            ta.max(tb),
            (radius * 1.0e7).round() as i64,
            (folded * 1.0e3).round() as i64,
        );
        orbits.entry(key).or_default().push(g);
    }
    assert!(orbits.len() < m.n_gaps());
    for iz in 1..=n {
        let w_max = (0..m.n_gaps())
            .map(|g| f.wij.get(iz, g).abs())
            .fold(0.0, f64::max);
        let tol = 1e-6 * w_max + 1e-12;
        for gaps in orbits.values() {
            let w0 = f.wij.get(iz, gaps[0]).abs();
            for &g in &gaps[1..] {
                let w = f.wij.get(iz, g).abs();
                assert!((w - w0).abs() < tol, "level {iz}: gap {g} {w} vs gap {} {w0}", gaps[0]);
            }
        }

        for ch in 0..m.n_channels() {
            let net: f64 = m
                .channel_gaps(ch)
                .iter()
                .map(|&g| m.crossflow_sign(ch, g) * f.wij.get(iz, g))
                .sum();
            assert!((net - f.sum_wij.get(iz, ch)).abs() < 1e-12, "level {iz} channel {ch}");
        }
    }
    assert!(
        (1..=n).any(|iz| (0..m.n_gaps()).any(|g| f.wij.get(iz, g).abs() > 1e-10)),
        "channel types should drive some crossflow"
    );
}

#[test]
fn test_forced_failure_opens_jet_on_schedule() {
    init_logging();
    let mut cfg = hex(2, 0.0290, false);
    cfg.geometry.n_cells = 5;
    cfg.power.total_power = 5.0e4;
    cfg.boundary.mass_flow = Some(1.0);
    cfg.pin.enabled = true;
    cfg.pin.fuel_outer_radius = 2.8e-3;
    cfg.pin.clad_inner_radius = 3.2e-3;
    cfg.pin.initial_temperature = 800.0;
    cfg.cdap.enabled = true;
    cfg.cdap.forced = Some(ForcedFailureConfig {
        pin: 0,
        time: 0.25,
        coolant_pressure: 2.0e5,
        coolant_temperature: 700.0,
        gas_temperature: 800.0,
        sodium_density: 850.0,
        axial_velocity: 2.0,
        gas_pressure: 5.0e6,
        plenum_volume: 1.0e-5,
        target_heat_flux: 1.0e6,
    });

    let mut sim = Simulation::new(cfg).unwrap();
    sim.steady().unwrap();
    for step in 1..=4 {
        sim.advance(0.1).unwrap();
        let active = sim.problem().cdap().unwrap().jet(0).unwrap().active;
        assert_eq!(active, step >= 3, "step {step}");
    }

    let cdap = sim.problem().cdap().unwrap();
    let (htc, superheat) = cdap.forced_heat_transfer().unwrap();
    assert!(htc > 0.0);
    assert!((superheat * htc - 1.0e6).abs() < 1e-6 * 1.0e6);
    let boundary = sim.problem().pins().unwrap().jet(0).unwrap();
    assert_eq!(boundary.htc, htc);
    assert_eq!(sim.history().len(), 4);
}
