// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Conservation and Coupling Tests
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use subchannel_core::SubchannelProblem;
use subchannel_types::config::{FluidConfig, GeometryConfig, LatticeConfig, SubchannelConfig};
use subchannel_types::error::SubchannelError;

fn wire_wrapped(n_blocks: usize) -> SubchannelConfig {
    let mut cfg = SubchannelConfig::with_geometry(GeometryConfig {
        lattice: LatticeConfig::Triangular {
            n_rings: 2,
            flat_to_flat: 0.0290,
        },
        pitch: 0.0089,
        pin_diameter: 0.0074,
        wire_diameter: 0.0014,
        wire_lead_length: 0.2,
        heated_length: 0.8,
        unheated_length_entry: 0.1,
        unheated_length_exit: 0.1,
        n_cells: 12,
        n_blocks,
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
    cfg.boundary.mass_flow = Some(1.0);
    cfg.power.total_power = 5.0e4;
    cfg
}

#[test]
fn test_level_mass_flow_conserved_with_wire_sweep() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut p = SubchannelProblem::new(wire_wrapped(1)).unwrap();
    p.external_solve().unwrap();
    let f = p.fields();
    let inlet = f.mdot.level_sum(0);
    for iz in 1..=p.mesh().n_cells() {
        assert!((f.mdot.level_sum(iz) - inlet).abs() < 1e-9 * inlet, "level {iz}");
        // every gap flow leaves one channel and enters the other
        assert!(f.sum_wij.level_sum(iz).abs() < 1e-12);
    }
    let swept = (0..p.mesh().n_gaps()).any(|g| f.wij.get(6, g).abs() > 1e-8);
    assert!(swept, "wire wrap should drive a crossflow");
}

#[test]
fn test_blocks_agree_on_outlet_energy() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut single = SubchannelProblem::new(wire_wrapped(1)).unwrap();
    let mut split = SubchannelProblem::new(wire_wrapped(3)).unwrap();
    let a = single.external_solve().unwrap();
    let b = split.external_solve().unwrap();
    assert!((a.summary.power_added() - 5.0e4).abs() < 1e-3 * 5.0e4);
    assert!((b.summary.power_added() - 5.0e4).abs() < 1e-3 * 5.0e4);
    assert!((a.summary.bulk_outlet_temperature - b.summary.bulk_outlet_temperature).abs() < 0.5);
}

#[test]
fn test_heat_extraction_below_zero_enthalpy_fails() {
    let mut cfg = wire_wrapped(1);
    cfg.power.total_power = -1.0e7;
    let mut p = SubchannelProblem::new(cfg).unwrap();
    assert!(matches!(
        p.external_solve(),
        Err(SubchannelError::NegativeEnthalpy { .. })
    ));
}

#[test]
fn test_runaway_power_is_reported_as_error() {
    let mut cfg = wire_wrapped(1);
    cfg.pin.enabled = true;
    cfg.pin.fuel_outer_radius = 2.8e-3;
    cfg.pin.clad_inner_radius = 3.2e-3;
    cfg.power.total_power = f64::MAX;
    let mut p = SubchannelProblem::new(cfg).unwrap();
    assert!(p.external_solve().is_err());
}

#[test]
fn test_inlet_flow_ratio_scales_first_cell_of_explicit_march() {
    let mut cfg = wire_wrapped(1);
    cfg.pin.enabled = true;
    cfg.pin.fuel_outer_radius = 2.8e-3;
    cfg.pin.clad_inner_radius = 3.2e-3;
    cfg.pin.initial_temperature = 800.0;
    cfg.cdap.enabled = true;
    cfg.cdap.cdf_upper_limit = 1e-300;
    cfg.power.total_power = 1.0e4;
    cfg.solver.implicit = false;
    let mut p = SubchannelProblem::new(cfg).unwrap();

    // certain damage fails every pin and hands a flow correction back
    p.cdap_step(0.1).unwrap();
    p.cdap_step(0.1).unwrap();
    let Some((channel, ratio)) = p.inlet_flow_ratio() else {
        panic!("failed channel should carry an inlet flow ratio");
    };
    assert!(ratio > 0.0 && ratio.is_finite());
    assert!(channel < p.mesh().n_channels());

    // the explicit march feeds the corrected inlet flow to the first cell
    let report = p.external_solve().unwrap();
    assert!(report.pressure_residual.is_finite());
    let f = p.fields();
    let expected = ratio * f.mdot.get(0, channel) - f.sum_wij.get(1, channel);
    assert!((f.mdot.get(1, channel) - expected).abs() < 1e-9);
}
