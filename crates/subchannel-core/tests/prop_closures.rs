// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Property-Based Tests (proptest) for the closures
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for friction, two-phase and clad damage closures.

use proptest::prelude::*;
use subchannel_core::cdap::damage::{failure_probability, hoop_stress, rupture_time};
use subchannel_core::closures::two_phase::sodium_gas;
use subchannel_core::closures::{pang, FrictionArgs, FrictionCorrelation};
use subchannel_core::mesh::{ChannelType, SubchannelMesh};
use subchannel_types::config::{FrictionModel, GeometryConfig, LatticeConfig};

fn hex_mesh(p_over_d: f64, wire: bool) -> SubchannelMesh {
    let d = 0.0074;
    let pitch = p_over_d * d;
    SubchannelMesh::new(&GeometryConfig {
        lattice: LatticeConfig::Triangular {
            n_rings: 2,
            flat_to_flat: 3f64.sqrt() * pitch + d + 2.0 * (pitch - d),
        },
        pitch,
        pin_diameter: d,
        wire_diameter: if wire { pitch - d } else { 0.0 },
        wire_lead_length: if wire { 0.2 } else { 0.0 },
        heated_length: 1.0,
        unheated_length_entry: 0.0,
        unheated_length_exit: 0.0,
        n_cells: 4,
        n_blocks: 1,
        blockage: None,
        k_grid: None,
    })
    .unwrap()
}

fn factor(corr: &FrictionCorrelation, mesh: &SubchannelMesh, ch: usize, re: f64) -> f64 {
    corr.friction_factor(FrictionArgs {
        reynolds: re,
        channel: mesh.channel_type(ch),
        flow_area: mesh.flow_area(0, ch),
        wetted_perimeter: mesh.wetted_perimeter(0, ch),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The Cheng–Todreas blend meets both regime fits at their bounds.
    #[test]
    fn prop_friction_continuous_at_regime_bounds(
        p_over_d in 1.1f64..1.35,
        wire in proptest::bool::ANY,
        ch_pick in 0usize..64,
    ) {
        let mesh = hex_mesh(p_over_d, wire);
        let corr = FrictionCorrelation::new(FrictionModel::ChengTodreas, &mesh);
        let ch = ch_pick % mesh.n_channels();
        let (re_l, re_t) = corr.regime_bounds();
        prop_assert!(re_l < re_t);
        for bound in [re_l, re_t] {
            let below = factor(&corr, &mesh, ch, bound * (1.0 - 1e-9));
            let above = factor(&corr, &mesh, ch, bound * (1.0 + 1e-9));
            prop_assert!(((below - above) / below).abs() < 1e-4,
                "jump at Re = {}: {} vs {}", bound, below, above);
        }
    }

    /// Friction factors stay positive and finite over the whole range.
    #[test]
    fn prop_friction_positive(re in 1.0f64..1.0e6, p_over_d in 1.1f64..1.35) {
        let mesh = hex_mesh(p_over_d, true);
        let corr = FrictionCorrelation::new(FrictionModel::ChengTodreas, &mesh);
        for ch in 0..mesh.n_channels() {
            let f = factor(&corr, &mesh, ch, re);
            prop_assert!(f.is_finite() && f > 0.0);
        }
        prop_assert!(pang(re) > 0.0);
    }

    /// Laminar friction falls with Reynolds number.
    #[test]
    fn prop_laminar_friction_decreasing(re in 10.0f64..200.0) {
        let mesh = hex_mesh(1.2, false);
        let corr = FrictionCorrelation::new(FrictionModel::ChengTodreas, &mesh);
        let ch = (0..mesh.n_channels())
            .find(|&c| mesh.channel_type(c) == ChannelType::Center)
            .unwrap();
        prop_assert!(factor(&corr, &mesh, ch, re) > factor(&corr, &mesh, ch, 1.5 * re));
    }

    /// Void fraction stays in [0, 1] and the multipliers follow from it.
    #[test]
    fn prop_two_phase_bounds(
        quality in -0.5f64..1.5,
        rho_gas in 0.01f64..50.0,
        rho_na in 700.0f64..950.0,
    ) {
        let s = sodium_gas(quality, rho_gas, rho_na);
        prop_assert!((0.0..=1.0).contains(&s.void_fraction));
        prop_assert!((s.gravity_multiplier - (1.0 - s.void_fraction)).abs() < 1e-12);
        prop_assert!(s.friction_multiplier >= 1.0);
        if quality <= 0.0 {
            prop_assert_eq!(s.void_fraction, 0.0);
        }
    }

    /// Higher quality never lowers the void fraction.
    #[test]
    fn prop_void_monotone_in_quality(x in 0.001f64..0.5, rho_gas in 0.1f64..10.0) {
        let a = sodium_gas(x, rho_gas, 850.0).void_fraction;
        let b = sodium_gas(2.0 * x, rho_gas, 850.0).void_fraction;
        prop_assert!(b >= a - 1e-12);
    }

    /// Failure probability is a CDF in the accumulated damage.
    #[test]
    fn prop_failure_probability_monotone(
        log_cdf in -12.0f64..2.0,
        step in 0.0f64..3.0,
        sigma in 0.1f64..2.0,
    ) {
        let lo = failure_probability(10f64.powf(log_cdf), 0.0, sigma);
        let hi = failure_probability(10f64.powf(log_cdf + step), 0.0, sigma);
        prop_assert!((0.0..=1.0).contains(&lo));
        prop_assert!(hi >= lo - 1e-12);
    }

    /// Rupture life is positive and the hoop stress respects its floor.
    #[test]
    fn prop_rupture_life_positive(
        p_gas in 0.0f64..2.0e7,
        t_clad in 700.0f64..1400.0,
        tcdot in 0.0f64..200.0,
    ) {
        let stress = hoop_stress(p_gas, 2.0e5, 2.9e-3, 3.5e-3);
        prop_assert!(stress >= 0.1 - 1e-12);
        let life = rupture_time(tcdot, stress, t_clad);
        prop_assert!(life > 0.0);
    }
}
