// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Radial Conduction
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! 1-D radial finite-volume conduction through fuel, gap and clad.
//!
//! Nodes `0..=n_fuel` span the fuel, node `n_fuel + 1` is the clad inner
//! surface and node `n_fuel + 2` the clad outer surface. All balances are
//! written per radian and per metre, so volumes are `∫ r dr` and face
//! conductances carry the face radius.

use subchannel_math::tridiag::thomas_solve;
use subchannel_types::constants::{PIN_CONDUCTION_MAXIT, PIN_CONDUCTION_TOL};
use subchannel_types::error::{SubchannelError, SubchannelResult};

use super::materials::{PinMaterials, HT9_DENSITY};

/// Smallest fuel inner radius; keeps the centre node volume positive.
pub const MIN_INNER_RADIUS: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct RadialMesh {
    pub n_fuel: usize,
    /// Node radii (m)
    pub r: Vec<f64>,
    /// Control-volume widths (m)
    pub dr: Vec<f64>,
    pub gap_conductance: f64,
}

impl RadialMesh {
    pub fn new(
        inner_radius: f64,
        fuel_radius: f64,
        clad_inner_radius: f64,
        clad_outer_radius: f64,
        n_fuel: usize,
        gap_conductance: f64,
    ) -> Self {
        let r0 = inner_radius.max(MIN_INNER_RADIUS);
        let mut r = Vec::with_capacity(n_fuel + 3);
        for i in 0..=n_fuel {
            r.push(r0 + (fuel_radius - r0) * i as f64 / n_fuel as f64);
        }
        r.push(clad_inner_radius);
        r.push(clad_outer_radius);

        let clad_half = 0.5 * (clad_outer_radius - clad_inner_radius);
        let dr = (0..n_fuel + 3)
            .map(|i| match i {
                0 => 0.5 * (r[1] - r[0]),
                i if i < n_fuel => 0.5 * (r[i + 1] - r[i - 1]),
                i if i == n_fuel => 0.5 * (r[i] - r[i - 1]),
                _ => clad_half,
            })
            .collect();
        RadialMesh {
            n_fuel,
            r,
            dr,
            gap_conductance,
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.r.len()
    }

    pub fn surface_node(&self) -> usize {
        self.n_fuel + 2
    }

    pub fn is_fuel(&self, i: usize) -> bool {
        i <= self.n_fuel
    }

    /// Fuel cross-section area (m²).
    pub fn fuel_area(&self) -> f64 {
        std::f64::consts::PI * (self.r[self.n_fuel].powi(2) - self.r[0].powi(2))
    }

    /// `∫ r dr` over the control volume of node `i`.
    pub fn volume(&self, i: usize) -> f64 {
        let (r, dr) = (self.r[i], self.dr[i]);
        if i == 0 || i == self.n_fuel + 1 {
            dr * (r + 0.5 * dr)
        } else if i == self.n_fuel || i == self.n_fuel + 2 {
            dr * (r - 0.5 * dr)
        } else {
            dr * r
        }
    }
}

/// Boundary and source data of one radial solve.
#[derive(Debug, Clone, Copy)]
pub struct RadialLoad {
    /// Volumetric fuel heat source (W/m³)
    pub q_vol: f64,
    /// Wall heat-transfer coefficient (W/m²/K)
    pub htc: f64,
    pub coolant_temperature: f64,
    /// Time step of a transient solve; `None` solves the steady balance
    pub dt: Option<f64>,
}

/// Face conductance between neighbouring nodes `i` and `i + 1` of the same material.
fn face_conductance(mesh: &RadialMesh, i: usize, k_i: f64, k_j: f64) -> f64 {
    let (dr_i, dr_j) = (mesh.dr[i], mesh.dr[i + 1]);
    let k_face = (k_i * dr_i + k_j * dr_j) / (dr_i + dr_j);
    k_face * 0.5 * (mesh.r[i] + mesh.r[i + 1]) / (mesh.r[i + 1] - mesh.r[i])
}

/// Solve one pin level in place, relinearizing the properties until the
/// relative change `Σ|T² − T₁²| / ΣT²` drops below the tolerance.
///
/// Returns the number of relinearizations. `temps` holds the previous
/// step values on entry when `load.dt` is set.
pub fn solve_radial(
    mesh: &RadialMesh,
    materials: &PinMaterials,
    temps: &mut [f64],
    load: RadialLoad,
    pin: usize,
    level: usize,
) -> SubchannelResult<usize> {
    let n = mesh.n_nodes();
    if temps.len() != n {
        return Err(SubchannelError::DimensionMismatch {
            what: "pin radial temperatures".to_string(),
            expected: n,
            found: temps.len(),
        });
    }
    let nf = mesh.n_fuel;
    let t_old = temps.to_vec();
    let mut error = f64::INFINITY;

    for iteration in 1..=PIN_CONDUCTION_MAXIT {
        let k: Vec<f64> = (0..n)
            .map(|i| {
                if mesh.is_fuel(i) {
                    materials.fuel_conductivity(temps[i], mesh.r[i])
                } else {
                    materials.clad_conductivity(temps[i])
                }
            })
            .collect();

        let mut lower = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        for i in 0..n - 1 {
            let g = if i == nf {
                mesh.gap_conductance * 0.5 * (mesh.r[i] + mesh.r[i + 1])
            } else {
                face_conductance(mesh, i, k[i], k[i + 1])
            };
            diag[i] += g;
            upper[i] -= g;
            diag[i + 1] += g;
            lower[i + 1] -= g;
        }
        for i in 0..=nf {
            rhs[i] += load.q_vol * mesh.volume(i);
        }
        let s = mesh.surface_node();
        diag[s] += load.htc * mesh.r[s];
        rhs[s] += load.htc * mesh.r[s] * load.coolant_temperature;

        if let Some(dt) = load.dt {
            for i in 0..n {
                let rho_cp = if mesh.is_fuel(i) {
                    materials.fuel_density() * materials.fuel_heat_capacity(temps[i])
                } else {
                    HT9_DENSITY * materials.clad_heat_capacity(temps[i])
                };
                let c = rho_cp * mesh.volume(i) / dt;
                diag[i] += c;
                rhs[i] += c * t_old[i];
            }
        }

        let solved = thomas_solve(&lower, &diag, &upper, &rhs)?;
        let (num, den) = solved
            .iter()
            .zip(temps.iter())
            .fold((0.0, 0.0), |(num, den), (t, t1)| {
                (num + (t * t - t1 * t1).abs(), den + t * t)
            });
        error = num / den;
        temps.copy_from_slice(&solved);
        if !error.is_finite() {
            break;
        }
        if error < PIN_CONDUCTION_TOL {
            return Ok(iteration);
        }
    }

    Err(SubchannelError::ConductionNotConverged {
        pin,
        level,
        iterations: PIN_CONDUCTION_MAXIT,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use subchannel_types::config::PinConfig;

    fn constant_materials(k_fuel: f64, k_clad: f64) -> PinMaterials {
        let mut m = PinMaterials::new(&PinConfig::default());
        m.fuel_conductivity = Some(k_fuel);
        m.clad_conductivity = Some(k_clad);
        m
    }

    #[test]
    fn test_mesh_layout() {
        let mesh = RadialMesh::new(0.0, 2.8e-3, 3.2e-3, 3.7e-3, 10, 5e4);
        assert_eq!(mesh.n_nodes(), 13);
        assert_eq!(mesh.surface_node(), 12);
        assert!((mesh.r[10] - 2.8e-3).abs() < 1e-15);
        // fuel control volumes tile [r0, rfu]
        let total: f64 = (0..=10).map(|i| mesh.volume(i)).sum();
        let exact = 0.5 * (2.8e-3_f64.powi(2) - mesh.r[0].powi(2));
        assert!((total - exact).abs() / exact < 1e-12);
    }

    #[test]
    fn test_analytic_fuel_profile() {
        let (k, q, rfu) = (20.0, 3.0e8, 2.8e-3);
        let mesh = RadialMesh::new(0.0, rfu, 3.2e-3, 3.7e-3, 20, 5e4);
        let materials = constant_materials(k, 20.0);
        let mut temps = vec![700.0; mesh.n_nodes()];
        let load = RadialLoad {
            q_vol: q,
            htc: 5.0e4,
            coolant_temperature: 700.0,
            dt: None,
        };
        solve_radial(&mesh, &materials, &mut temps, load, 0, 1).unwrap();
        let t_surface = temps[mesh.n_fuel];
        for i in 0..=mesh.n_fuel {
            let r = mesh.r[i];
            let exact = t_surface + q / (4.0 * k) * (rfu * rfu - r * r);
            let rise = exact - 700.0;
            assert!(
                (temps[i] - exact).abs() < 0.01 * rise,
                "node {i}: {} vs {exact}",
                temps[i]
            );
        }
    }

    #[test]
    fn test_surface_heat_balance() {
        let mesh = RadialMesh::new(0.0, 2.8e-3, 3.2e-3, 3.7e-3, 10, 5e4);
        let materials = constant_materials(20.0, 20.0);
        let mut temps = vec![650.0; mesh.n_nodes()];
        let load = RadialLoad {
            q_vol: 2.0e8,
            htc: 8.0e4,
            coolant_temperature: 650.0,
            dt: None,
        };
        solve_radial(&mesh, &materials, &mut temps, load, 0, 1).unwrap();
        let s = mesh.surface_node();
        let q_linear = load.q_vol * mesh.fuel_area();
        let q_wall = 2.0 * std::f64::consts::PI * mesh.r[s] * load.htc * (temps[s] - 650.0);
        assert!((q_wall - q_linear).abs() / q_linear < 1e-9);
    }

    #[test]
    fn test_transient_relaxes_towards_steady() {
        let mesh = RadialMesh::new(0.0, 2.8e-3, 3.2e-3, 3.7e-3, 10, 5e4);
        let materials = PinMaterials::new(&PinConfig::default());
        let load = RadialLoad {
            q_vol: 2.0e8,
            htc: 8.0e4,
            coolant_temperature: 650.0,
            dt: None,
        };
        let mut steady = vec![650.0; mesh.n_nodes()];
        solve_radial(&mesh, &materials, &mut steady, load, 0, 1).unwrap();

        let mut temps = vec![650.0; mesh.n_nodes()];
        let transient = RadialLoad {
            dt: Some(0.05),
            ..load
        };
        solve_radial(&mesh, &materials, &mut temps, transient, 0, 1).unwrap();
        assert!(temps[0] > 650.0 && temps[0] < steady[0]);
        for _ in 0..2000 {
            solve_radial(&mesh, &materials, &mut temps, transient, 0, 1).unwrap();
        }
        assert!((temps[0] - steady[0]).abs() < 1e-3 * steady[0]);
    }

    #[test]
    fn test_non_finite_state_is_error() {
        let mesh = RadialMesh::new(0.0, 2.8e-3, 3.2e-3, 3.7e-3, 4, 5e4);
        let materials = constant_materials(20.0, 20.0);
        let mut temps = vec![650.0; mesh.n_nodes()];
        let load = RadialLoad {
            q_vol: f64::NAN,
            htc: 8.0e4,
            coolant_temperature: 650.0,
            dt: None,
        };
        let err = solve_radial(&mesh, &materials, &mut temps, load, 3, 7).unwrap_err();
        assert!(matches!(
            err,
            SubchannelError::ConductionNotConverged { pin: 3, level: 7, .. }
        ));
    }
}
