// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Power Distribution
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Nodal linear heat rate q′ of every pin, or of every channel when the
//! bundle has no pins.
//!
//! `q′ᵢ(z) = P · wᵢ · s(z) / (Σw · ∫s)`, with the integral taken with the
//! same trapezoidal rule the enthalpy balance uses, so the heat delivered
//! to the coolant equals `total_power` exactly.

use std::f64::consts::PI;

use ndarray::Array2;
use subchannel_types::config::{AxialShape, PowerConfig};
use subchannel_types::error::{SubchannelError, SubchannelResult};

use crate::mesh::SubchannelMesh;

/// Radial weights; an empty bundle profile means "uniform".
fn radial_profile(config: &PowerConfig, n: usize) -> SubchannelResult<Vec<f64>> {
    let profile = if let Some(inline) = &config.radial_profile {
        inline.clone()
    } else if let Some(path) = &config.radial_profile_file {
        let contents = std::fs::read_to_string(path)?;
        contents
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|e| {
                    SubchannelError::ConfigError(format!("radial profile entry '{tok}': {e}"))
                })
            })
            .collect::<SubchannelResult<Vec<f64>>>()?
    } else {
        vec![1.0; n]
    };
    if profile.len() != n {
        return Err(SubchannelError::DimensionMismatch {
            what: "radial power profile".to_string(),
            expected: n,
            found: profile.len(),
        });
    }
    if profile.iter().any(|&w| !(w >= 0.0)) {
        return Err(SubchannelError::ConfigError(
            "radial power profile entries must be non-negative".to_string(),
        ));
    }
    Ok(profile)
}

/// Axial shape at height `z`, zero outside the heated section.
fn axial_shape(shape: AxialShape, mesh: &SubchannelMesh, z: f64) -> f64 {
    let z0 = mesh.unheated_length_entry();
    let h = mesh.heated_length();
    let tol = 1e-12 * h;
    if z < z0 - tol || z > z0 + h + tol {
        return 0.0;
    }
    match shape {
        AxialShape::Uniform => 1.0,
        AxialShape::Cosine => (PI * ((z - z0) / h).clamp(0.0, 1.0)).sin(),
    }
}

#[derive(Debug, Clone)]
pub struct PowerDistribution {
    total_power: f64,
    /// True when `linear_power` columns are pins
    per_pin: bool,
    /// q′ \[level, pin or channel\] (W/m)
    linear_power: Array2<f64>,
}

impl PowerDistribution {
    pub fn new(config: &PowerConfig, mesh: &SubchannelMesh) -> SubchannelResult<Self> {
        let per_pin = mesh.n_pins() > 0;
        let n = if per_pin {
            mesh.n_pins()
        } else {
            mesh.n_channels()
        };
        let weights = radial_profile(config, n)?;
        let weight_sum: f64 = weights.iter().sum();

        let n_levels = mesh.n_cells() + 1;
        let shape: Vec<f64> = mesh
            .z_grid()
            .iter()
            .map(|&z| axial_shape(config.axial_shape, mesh, z))
            .collect();
        let integral: f64 = (1..n_levels)
            .filter(|&iz| mesh.is_heated_cell(iz))
            .map(|iz| 0.5 * (shape[iz - 1] + shape[iz]) * mesh.dz(iz))
            .sum();

        let mut linear_power = Array2::zeros((n_levels, n));
        if config.total_power != 0.0 {
            if !(weight_sum > 0.0 && integral > 0.0) {
                return Err(SubchannelError::ConfigError(
                    "power is requested but the radial or axial profile integrates to zero"
                        .to_string(),
                ));
            }
            let scale = config.total_power / (weight_sum * integral);
            for iz in 0..n_levels {
                for (i, w) in weights.iter().enumerate() {
                    linear_power[[iz, i]] = scale * w * shape[iz];
                }
            }
        }
        log::debug!(
            "power distribution: {:.4e} W over {} {}",
            config.total_power,
            n,
            if per_pin { "pins" } else { "channels" }
        );
        Ok(PowerDistribution {
            total_power: config.total_power,
            per_pin,
            linear_power,
        })
    }

    pub fn total_power(&self) -> f64 {
        self.total_power
    }

    pub fn per_pin(&self) -> bool {
        self.per_pin
    }

    /// Pin linear heat rate (W/m); zero for a pinless bundle.
    pub fn pin_linear_power(&self, iz: usize, i_pin: usize) -> f64 {
        if self.per_pin {
            self.linear_power[[iz, i_pin]]
        } else {
            0.0
        }
    }

    /// Linear heat rate into channel `i_ch` at level `iz` (W/m).
    pub fn channel_linear_power(&self, mesh: &SubchannelMesh, iz: usize, i_ch: usize) -> f64 {
        if self.per_pin {
            mesh.channel_pins(i_ch)
                .iter()
                .map(|&p| mesh.pin_fraction(p, i_ch) * self.linear_power[[iz, p]])
                .sum()
        } else {
            self.linear_power[[iz, i_ch]]
        }
    }

    /// Heat added to channel `i_ch` over cell `iz` (W).
    pub fn added_heat(&self, mesh: &SubchannelMesh, iz: usize, i_ch: usize) -> f64 {
        if !mesh.is_heated_cell(iz) {
            return 0.0;
        }
        let q_in = self.channel_linear_power(mesh, iz - 1, i_ch);
        let q_out = self.channel_linear_power(mesh, iz, i_ch);
        0.5 * (q_in + q_out) * mesh.dz(iz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subchannel_types::config::{GeometryConfig, LatticeConfig};

    fn hex_mesh() -> SubchannelMesh {
        SubchannelMesh::new(&GeometryConfig {
            lattice: LatticeConfig::Triangular {
                n_rings: 3,
                flat_to_flat: 0.0373,
            },
            pitch: 8.0e-3,
            pin_diameter: 6.5e-3,
            wire_diameter: 0.0,
            wire_lead_length: 0.0,
            heated_length: 0.8,
            unheated_length_entry: 0.1,
            unheated_length_exit: 0.1,
            n_cells: 20,
            n_blocks: 1,
            blockage: None,
            k_grid: None,
        })
        .unwrap()
    }

    fn bundle_heat(power: &PowerDistribution, mesh: &SubchannelMesh) -> f64 {
        (1..=mesh.n_cells())
            .flat_map(|iz| (0..mesh.n_channels()).map(move |c| (iz, c)))
            .map(|(iz, c)| power.added_heat(mesh, iz, c))
            .sum()
    }

    #[test]
    fn test_uniform_power_conserved() {
        let mesh = hex_mesh();
        let cfg = PowerConfig {
            total_power: 2.5e5,
            ..PowerConfig::default()
        };
        let power = PowerDistribution::new(&cfg, &mesh).unwrap();
        assert!(power.per_pin());
        assert!((bundle_heat(&power, &mesh) - 2.5e5).abs() < 1e-6);
        // nothing is deposited in the unheated entry
        assert_eq!(power.added_heat(&mesh, 1, 0), 0.0);
        assert_eq!(power.pin_linear_power(0, 3), 0.0);
    }

    #[test]
    fn test_cosine_power_conserved_and_peaked() {
        let mesh = hex_mesh();
        let cfg = PowerConfig {
            total_power: 1.0e5,
            axial_shape: AxialShape::Cosine,
            ..PowerConfig::default()
        };
        let power = PowerDistribution::new(&cfg, &mesh).unwrap();
        assert!((bundle_heat(&power, &mesh) - 1.0e5).abs() < 1e-6);
        let mid = power.pin_linear_power(10, 0);
        assert!(mid > power.pin_linear_power(5, 0));
        assert!(mid > power.pin_linear_power(15, 0));
    }

    #[test]
    fn test_radial_profile_size_mismatch() {
        let mesh = hex_mesh();
        let cfg = PowerConfig {
            total_power: 1.0,
            radial_profile: Some(vec![1.0; 7]),
            ..PowerConfig::default()
        };
        match PowerDistribution::new(&cfg, &mesh) {
            Err(SubchannelError::DimensionMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 19);
                assert_eq!(found, 7);
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_profile_file() {
        let mesh = hex_mesh();
        let cfg = PowerConfig {
            total_power: 1.0,
            radial_profile_file: Some("/nonexistent/profile.txt".to_string()),
            ..PowerConfig::default()
        };
        assert!(matches!(
            PowerDistribution::new(&cfg, &mesh),
            Err(SubchannelError::Io(_))
        ));
    }

    #[test]
    fn test_profile_file_weights_pins() {
        let mesh = hex_mesh();
        let path = std::env::temp_dir().join("subchannel_power_profile_test.txt");
        let mut text = String::from("2.0");
        for _ in 1..19 {
            text.push_str(" 1.0");
        }
        std::fs::write(&path, text).unwrap();
        let cfg = PowerConfig {
            total_power: 2.0e4,
            radial_profile_file: Some(path.to_string_lossy().to_string()),
            ..PowerConfig::default()
        };
        let power = PowerDistribution::new(&cfg, &mesh).unwrap();
        let ratio = power.pin_linear_power(10, 0) / power.pin_linear_power(10, 1);
        assert!((ratio - 2.0).abs() < 1e-12);
        let _ = std::fs::remove_file(&path);
    }
}
