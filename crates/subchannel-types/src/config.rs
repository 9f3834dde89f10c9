// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{SubchannelError, SubchannelResult};

/// Top-level subchannel case description.
/// Every section except `geometry` may be omitted from the JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubchannelConfig {
    #[serde(default = "default_case_name")]
    pub case_name: String,
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub closures: ClosureConfig,
    #[serde(default)]
    pub fluid: FluidConfig,
    #[serde(default)]
    pub pin: PinConfig,
    #[serde(default)]
    pub cdap: CdapConfig,
    #[serde(default)]
    pub power: PowerConfig,
}

fn default_case_name() -> String {
    "subchannel".to_string()
}

// ───────────────────────────── geometry ─────────────────────────────

/// Lattice family of the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LatticeConfig {
    /// Hexagonal bundle inside a hexagonal duct.
    Triangular {
        /// Number of pin rings, the central pin counts as ring 1.
        n_rings: usize,
        /// Inner flat-to-flat distance of the duct (m).
        flat_to_flat: f64,
    },
    /// Rectangular array of `nx` × `ny` channels.
    Square {
        nx: usize,
        ny: usize,
        /// Clearance between the half-pitch line of the outer pins and the duct wall (m).
        #[serde(default)]
        side_gap: f64,
    },
}

/// Localized flow-area reduction of selected channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockageConfig {
    /// Channels covered by the blockage.
    pub index_blockage: Vec<usize>,
    /// Area multiplier for each entry of `index_blockage` (1 = open).
    pub reduction_blockage: Vec<f64>,
    /// Axial extent \[z_start, z_end\] of the blockage (m).
    pub z_blockage: [f64; 2],
    /// Extra form loss added to the blocked cells.
    #[serde(default)]
    pub k_blockage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    pub lattice: LatticeConfig,
    /// Pin pitch (m)
    pub pitch: f64,
    /// Pin outer diameter (m)
    pub pin_diameter: f64,
    /// Wire-wrap diameter (m), zero for a bare bundle
    #[serde(default)]
    pub wire_diameter: f64,
    /// Wire-wrap axial lead length (m)
    #[serde(default)]
    pub wire_lead_length: f64,
    pub heated_length: f64,
    #[serde(default)]
    pub unheated_length_entry: f64,
    #[serde(default)]
    pub unheated_length_exit: f64,
    #[serde(default = "default_n_cells")]
    pub n_cells: usize,
    #[serde(default = "default_n_blocks")]
    pub n_blocks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockage: Option<BlockageConfig>,
    /// Axial form-loss coefficients, indexed \[channel\]\[cell\].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_grid: Option<Vec<Vec<f64>>>,
}

fn default_n_cells() -> usize {
    20
}
fn default_n_blocks() -> usize {
    1
}

impl GeometryConfig {
    pub fn total_length(&self) -> f64 {
        self.unheated_length_entry + self.heated_length + self.unheated_length_exit
    }

    pub fn has_wire(&self) -> bool {
        self.wire_diameter > 0.0 && self.wire_lead_length > 0.0
    }

    pub fn n_channels(&self) -> usize {
        match &self.lattice {
            LatticeConfig::Triangular { n_rings, .. } => {
                if *n_rings < 2 {
                    0
                } else {
                    6 * (n_rings - 1) * (n_rings - 1) + 6 * (n_rings - 1) + 6
                }
            }
            LatticeConfig::Square { nx, ny, .. } => nx * ny,
        }
    }
}

// ───────────────────────────── boundary ─────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Inlet temperature (K)
    #[serde(default = "default_inlet_temperature")]
    pub inlet_temperature: f64,
    /// Uniform inlet mass flux (kg/m²/s), used when `mass_flow` is absent
    #[serde(default = "default_mass_flux")]
    pub mass_flux: f64,
    /// Total inlet mass flow (kg/s), split over channels by flow area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_flow: Option<f64>,
    /// Outlet pressure (Pa); solution pressures are relative to it
    #[serde(default = "default_outlet_pressure")]
    pub outlet_pressure: f64,
    /// Heat flux into the coolant through the duct wall (W/m²)
    #[serde(default)]
    pub duct_heat_flux: f64,
}

fn default_inlet_temperature() -> f64 {
    628.15
}
fn default_mass_flux() -> f64 {
    3500.0
}
fn default_outlet_pressure() -> f64 {
    1.0e5
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig {
            inlet_temperature: default_inlet_temperature(),
            mass_flux: default_mass_flux(),
            mass_flow: None,
            outlet_pressure: default_outlet_pressure(),
            duct_heat_flux: 0.0,
        }
    }
}

// ───────────────────────────── solver ───────────────────────────────

/// Face-value interpolation between the bottom and top node of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationScheme {
    Upwind,
    Downwind,
    CentralDifference,
    Exponential,
}

/// Linear solver used for the implicit block systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverChoice {
    /// Banded LU with partial pivoting.
    Direct,
    /// Restarted GMRES with Jacobi preconditioning.
    Gmres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_p_tol")]
    pub p_tol: f64,
    #[serde(default = "default_t_tol")]
    pub t_tol: f64,
    #[serde(default = "default_t_maxit")]
    pub t_maxit: usize,
    /// Outer iteration cap; derived from the block count when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_it_max: Option<usize>,
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
    #[serde(default = "default_dtol")]
    pub dtol: f64,
    #[serde(default = "default_maxit")]
    pub maxit: usize,
    #[serde(default = "default_true")]
    pub segregated: bool,
    #[serde(default)]
    pub implicit: bool,
    #[serde(default)]
    pub staggered_pressure: bool,
    #[serde(default)]
    pub monolithic_thermal: bool,
    #[serde(default = "default_true")]
    pub compute_density: bool,
    #[serde(default = "default_true")]
    pub compute_viscosity: bool,
    #[serde(default = "default_true")]
    pub compute_power: bool,
    #[serde(default = "default_interpolation")]
    pub interpolation: InterpolationScheme,
    /// Cell Peclet number used by the exponential scheme
    #[serde(default = "default_peclet")]
    pub peclet: f64,
    #[serde(default = "default_linear_solver")]
    pub linear_solver: LinearSolverChoice,
    #[serde(default = "default_gmres_restart")]
    pub gmres_restart: usize,
    /// Under-relaxation of the crossflow block in the monolithic solve
    #[serde(default = "default_wij_relaxation")]
    pub wij_relaxation: f64,
    #[serde(default = "default_newton_max_iter")]
    pub newton_max_iter: usize,
    #[serde(default = "default_newton_rtol")]
    pub newton_rtol: f64,
    #[serde(default = "default_newton_atol")]
    pub newton_atol: f64,
    #[serde(default)]
    pub verbose: bool,
}

fn default_p_tol() -> f64 {
    1e-6
}
fn default_t_tol() -> f64 {
    1e-6
}
fn default_t_maxit() -> usize {
    1000
}
fn default_rtol() -> f64 {
    1e-6
}
fn default_atol() -> f64 {
    1e-6
}
fn default_dtol() -> f64 {
    1e5
}
fn default_maxit() -> usize {
    10_000
}
fn default_true() -> bool {
    true
}
fn default_interpolation() -> InterpolationScheme {
    InterpolationScheme::CentralDifference
}
fn default_peclet() -> f64 {
    0.5
}
fn default_linear_solver() -> LinearSolverChoice {
    LinearSolverChoice::Direct
}
fn default_gmres_restart() -> usize {
    30
}
fn default_wij_relaxation() -> f64 {
    0.1
}
fn default_newton_max_iter() -> usize {
    50
}
fn default_newton_rtol() -> f64 {
    1e-8
}
fn default_newton_atol() -> f64 {
    1e-10
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            p_tol: default_p_tol(),
            t_tol: default_t_tol(),
            t_maxit: default_t_maxit(),
            p_it_max: None,
            rtol: default_rtol(),
            atol: default_atol(),
            dtol: default_dtol(),
            maxit: default_maxit(),
            segregated: true,
            implicit: false,
            staggered_pressure: false,
            monolithic_thermal: false,
            compute_density: true,
            compute_viscosity: true,
            compute_power: true,
            interpolation: default_interpolation(),
            peclet: default_peclet(),
            linear_solver: default_linear_solver(),
            gmres_restart: default_gmres_restart(),
            wij_relaxation: default_wij_relaxation(),
            newton_max_iter: default_newton_max_iter(),
            newton_rtol: default_newton_rtol(),
            newton_atol: default_newton_atol(),
            verbose: false,
        }
    }
}

// ───────────────────────────── closures ─────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionModel {
    /// Upgraded Cheng–Todreas, wire-wrapped triangular bundles.
    ChengTodreas,
    /// Todreas–Kazimi bare square arrays.
    TodreasKazimi,
    /// Smooth-tube piecewise power law.
    Pang,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixingModel {
    Constant,
    ChengTodreas,
    KimChung,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureConfig {
    #[serde(default = "default_friction")]
    pub friction: FrictionModel,
    #[serde(default = "default_mixing")]
    pub mixing: MixingModel,
    /// Turbulent mixing coefficient for the constant model
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Turbulent momentum modeling parameter
    #[serde(default = "default_ct")]
    pub ct: f64,
    /// Lateral form-loss coefficient of the gaps
    #[serde(default = "default_kij")]
    pub kij: f64,
}

fn default_friction() -> FrictionModel {
    FrictionModel::ChengTodreas
}
fn default_mixing() -> MixingModel {
    MixingModel::Constant
}
fn default_beta() -> f64 {
    0.006
}
fn default_ct() -> f64 {
    2.6
}
fn default_kij() -> f64 {
    0.5
}

impl Default for ClosureConfig {
    fn default() -> Self {
        ClosureConfig {
            friction: default_friction(),
            mixing: default_mixing(),
            beta: default_beta(),
            ct: default_ct(),
            kij: default_kij(),
        }
    }
}

// ───────────────────────────── fluid ────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FluidConfig {
    /// Liquid sodium correlations.
    Sodium,
    /// Constant properties with `h = cp (T - t_ref)`.
    Constant {
        rho: f64,
        cp: f64,
        k: f64,
        mu: f64,
        #[serde(default)]
        t_ref: f64,
    },
}

impl Default for FluidConfig {
    fn default() -> Self {
        FluidConfig::Sodium
    }
}

// ───────────────────────────── pin ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    /// Solve radial conduction and feed the wall heat flux back
    #[serde(default)]
    pub enabled: bool,
    /// Inner radius of annular fuel (m), zero for solid fuel
    #[serde(default)]
    pub fuel_inner_radius: f64,
    #[serde(default = "default_fuel_outer_radius")]
    pub fuel_outer_radius: f64,
    #[serde(default = "default_clad_inner_radius")]
    pub clad_inner_radius: f64,
    /// Number of radial fuel intervals
    #[serde(default = "default_n_fuel_nodes")]
    pub n_fuel_nodes: usize,
    /// Fuel-to-clad gap conductance (W/m²/K)
    #[serde(default = "default_gap_conductance")]
    pub gap_conductance: f64,
    /// Plutonium weight fraction of the metal fuel
    #[serde(default = "default_wpu")]
    pub plutonium_fraction: f64,
    /// Zirconium weight fraction of the metal fuel
    #[serde(default = "default_wzr")]
    pub zirconium_fraction: f64,
    #[serde(default)]
    pub porosity: f64,
    /// Replaces the metal-fuel conductivity with a constant (W/m/K)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_conductivity: Option<f64>,
    /// Replaces the HT9 conductivity with a constant (W/m/K)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clad_conductivity: Option<f64>,
    /// Initial pin temperature (K)
    #[serde(default = "default_inlet_temperature")]
    pub initial_temperature: f64,
}

fn default_fuel_outer_radius() -> f64 {
    2.8e-3
}
fn default_clad_inner_radius() -> f64 {
    3.2e-3
}
fn default_n_fuel_nodes() -> usize {
    10
}
fn default_gap_conductance() -> f64 {
    5.0e4
}
fn default_wpu() -> f64 {
    0.19
}
fn default_wzr() -> f64 {
    0.10
}

impl Default for PinConfig {
    fn default() -> Self {
        PinConfig {
            enabled: false,
            fuel_inner_radius: 0.0,
            fuel_outer_radius: default_fuel_outer_radius(),
            clad_inner_radius: default_clad_inner_radius(),
            n_fuel_nodes: default_n_fuel_nodes(),
            gap_conductance: default_gap_conductance(),
            plutonium_fraction: default_wpu(),
            zirconium_fraction: default_wzr(),
            porosity: 0.0,
            fuel_conductivity: None,
            clad_conductivity: None,
            initial_temperature: default_inlet_temperature(),
        }
    }
}

// ───────────────────────────── CDAP ─────────────────────────────────

/// Parameters of a prescribed single-pin failure experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForcedFailureConfig {
    pub pin: usize,
    /// Simulation time at which the breach opens (s)
    pub time: f64,
    #[serde(default = "default_exp_pcool")]
    pub coolant_pressure: f64,
    #[serde(default = "default_exp_tcool")]
    pub coolant_temperature: f64,
    #[serde(default = "default_exp_tgas")]
    pub gas_temperature: f64,
    #[serde(default = "default_exp_rho_na")]
    pub sodium_density: f64,
    #[serde(default = "default_exp_velocity")]
    pub axial_velocity: f64,
    #[serde(default = "default_exp_pgas")]
    pub gas_pressure: f64,
    #[serde(default = "default_exp_plenum_volume")]
    pub plenum_volume: f64,
    /// Heat flux the jet is expected to remove (W/m²)
    #[serde(default = "default_exp_target_flux")]
    pub target_heat_flux: f64,
}

fn default_exp_pcool() -> f64 {
    2.0e5
}
fn default_exp_tcool() -> f64 {
    700.0
}
fn default_exp_tgas() -> f64 {
    800.0
}
fn default_exp_rho_na() -> f64 {
    850.0
}
fn default_exp_velocity() -> f64 {
    2.0
}
fn default_exp_pgas() -> f64 {
    5.0e6
}
fn default_exp_plenum_volume() -> f64 {
    1.0e-5
}
fn default_exp_target_flux() -> f64 {
    1.0e6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdapConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Footprint fraction on the far side of the breach
    #[serde(default = "default_radius_frac")]
    pub radius_frac: f64,
    /// Equivalent breach diameter (m)
    #[serde(default = "default_breach_diameter")]
    pub breach_diameter: f64,
    #[serde(default = "default_breach_diameter")]
    pub breach_diameter_ref: f64,
    #[serde(default = "default_pressure_ratio_ref")]
    pub pressure_ratio_ref: f64,
    /// Two-phase radius measured in the oil reference experiment (m)
    #[serde(default = "default_r_oil")]
    pub r_oil: f64,
    /// Axial growth slope of the reference footprint
    #[serde(default = "default_m_oil")]
    pub m_oil: f64,
    #[serde(default = "default_max_two_phase_radius")]
    pub max_two_phase_radius: f64,
    /// As-fabricated plenum pressure (Pa)
    #[serde(default = "default_plenum_pressure")]
    pub plenum_pressure: f64,
    /// Temperature at which `plenum_pressure` holds (K)
    #[serde(default = "default_plenum_temperature")]
    pub plenum_temperature: f64,
    /// Plenum-to-fuel volume ratio
    #[serde(default = "default_plenum_to_fuel")]
    pub plenum_to_fuel_ratio: f64,
    /// Damage fraction beyond which failure is certain
    #[serde(default = "default_cdf_upper_limit")]
    pub cdf_upper_limit: f64,
    /// Molar mass of the plenum gas (kg/mol)
    #[serde(default = "default_gas_molar_mass")]
    pub gas_molar_mass: f64,
    #[serde(default = "default_jet_length")]
    pub jet_length: f64,
    /// Mean of log10(damage fraction) at failure
    #[serde(default)]
    pub cdf_mean: f64,
    #[serde(default = "default_cdf_sigma")]
    pub cdf_sigma: f64,
    #[serde(default = "default_gamma")]
    pub gas_gamma: f64,
    #[serde(default = "default_discharge_coefficient")]
    pub discharge_coefficient: f64,
    /// Jet entrainment coefficient
    #[serde(default = "default_entrainment")]
    pub entrainment_coefficient: f64,
    #[serde(default = "default_sigma_na")]
    pub sodium_surface_tension: f64,
    #[serde(default = "default_cp_na")]
    pub sodium_cp: f64,
    #[serde(default = "default_mu_na")]
    pub sodium_viscosity: f64,
    #[serde(default = "default_mu_oil")]
    pub oil_viscosity: f64,
    #[serde(default = "default_sigma_oil")]
    pub oil_surface_tension: f64,
    /// Jet deflection beyond which the jet detaches (deg)
    #[serde(default = "default_crit_angle")]
    pub critical_deflection_angle: f64,
    /// Initial jet heat-transfer coefficient at breach (W/m²/K)
    #[serde(default = "default_h_jet_init")]
    pub initial_jet_htc: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced: Option<ForcedFailureConfig>,
}

fn default_seed() -> u64 {
    42
}
fn default_radius_frac() -> f64 {
    0.2
}
fn default_breach_diameter() -> f64 {
    1.0e-3
}
fn default_pressure_ratio_ref() -> f64 {
    50.0
}
fn default_r_oil() -> f64 {
    0.02
}
fn default_m_oil() -> f64 {
    0.2
}
fn default_max_two_phase_radius() -> f64 {
    1.0
}
fn default_plenum_pressure() -> f64 {
    20.0e6
}
fn default_plenum_temperature() -> f64 {
    800.0
}
fn default_plenum_to_fuel() -> f64 {
    1.6
}
fn default_cdf_upper_limit() -> f64 {
    10.0
}
fn default_gas_molar_mass() -> f64 {
    39.948e-3
}
fn default_jet_length() -> f64 {
    1.42e-3
}
fn default_cdf_sigma() -> f64 {
    1.0
}
fn default_gamma() -> f64 {
    1.67
}
fn default_discharge_coefficient() -> f64 {
    0.61
}
fn default_entrainment() -> f64 {
    0.1
}
fn default_sigma_na() -> f64 {
    0.15
}
fn default_cp_na() -> f64 {
    1270.0
}
fn default_mu_na() -> f64 {
    2.4e-4
}
fn default_mu_oil() -> f64 {
    5.0e-2
}
fn default_sigma_oil() -> f64 {
    0.03
}
fn default_crit_angle() -> f64 {
    60.0
}
fn default_h_jet_init() -> f64 {
    1.0e5
}

impl Default for CdapConfig {
    fn default() -> Self {
        CdapConfig {
            enabled: false,
            seed: default_seed(),
            radius_frac: default_radius_frac(),
            breach_diameter: default_breach_diameter(),
            breach_diameter_ref: default_breach_diameter(),
            pressure_ratio_ref: default_pressure_ratio_ref(),
            r_oil: default_r_oil(),
            m_oil: default_m_oil(),
            max_two_phase_radius: default_max_two_phase_radius(),
            plenum_pressure: default_plenum_pressure(),
            plenum_temperature: default_plenum_temperature(),
            plenum_to_fuel_ratio: default_plenum_to_fuel(),
            cdf_upper_limit: default_cdf_upper_limit(),
            gas_molar_mass: default_gas_molar_mass(),
            jet_length: default_jet_length(),
            cdf_mean: 0.0,
            cdf_sigma: default_cdf_sigma(),
            gas_gamma: default_gamma(),
            discharge_coefficient: default_discharge_coefficient(),
            entrainment_coefficient: default_entrainment(),
            sodium_surface_tension: default_sigma_na(),
            sodium_cp: default_cp_na(),
            sodium_viscosity: default_mu_na(),
            oil_viscosity: default_mu_oil(),
            oil_surface_tension: default_sigma_oil(),
            critical_deflection_angle: default_crit_angle(),
            initial_jet_htc: default_h_jet_init(),
            forced: None,
        }
    }
}

// ───────────────────────────── power ────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxialShape {
    Uniform,
    /// Chopped cosine over the heated length.
    Cosine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConfig {
    /// Bundle power (W)
    #[serde(default)]
    pub total_power: f64,
    #[serde(default = "default_axial_shape")]
    pub axial_shape: AxialShape,
    /// Relative power per pin (or per channel for a pinless bundle)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radial_profile: Option<Vec<f64>>,
    /// Whitespace separated radial profile, one value per pin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radial_profile_file: Option<String>,
}

fn default_axial_shape() -> AxialShape {
    AxialShape::Uniform
}

impl Default for PowerConfig {
    fn default() -> Self {
        PowerConfig {
            total_power: 0.0,
            axial_shape: default_axial_shape(),
            radial_profile: None,
            radial_profile_file: None,
        }
    }
}

// ───────────────────────────── loading ──────────────────────────────

impl SubchannelConfig {
    /// Build a configuration with every optional section at its default.
    pub fn with_geometry(geometry: GeometryConfig) -> Self {
        SubchannelConfig {
            case_name: default_case_name(),
            geometry,
            boundary: BoundaryConfig::default(),
            solver: SolverConfig::default(),
            closures: ClosureConfig::default(),
            fluid: FluidConfig::default(),
            pin: PinConfig::default(),
            cdap: CdapConfig::default(),
            power: PowerConfig::default(),
        }
    }

    /// Load from JSON file and run the setup checks.
    pub fn from_file(path: &str) -> SubchannelResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Setup-time checks. Everything rejected here would otherwise be a
    /// fatal error deep inside the solve.
    pub fn validate(&self) -> SubchannelResult<()> {
        let g = &self.geometry;
        if !(g.pitch > 0.0 && g.pin_diameter > 0.0 && g.heated_length > 0.0) {
            return Err(SubchannelError::GeometryError(
                "pitch, pin_diameter and heated_length must be positive".to_string(),
            ));
        }
        if g.unheated_length_entry < 0.0 || g.unheated_length_exit < 0.0 {
            return Err(SubchannelError::GeometryError(
                "unheated lengths must be non-negative".to_string(),
            ));
        }
        if g.n_cells == 0 || g.n_blocks == 0 {
            return Err(SubchannelError::ConfigError(
                "n_cells and n_blocks must be > 0".to_string(),
            ));
        }
        if g.n_cells % g.n_blocks != 0 {
            return Err(SubchannelError::ConfigError(format!(
                "n_cells ({}) must be divisible by n_blocks ({})",
                g.n_cells, g.n_blocks
            )));
        }

        let is_square = match &g.lattice {
            LatticeConfig::Triangular {
                n_rings,
                flat_to_flat,
            } => {
                if *n_rings < 2 {
                    return Err(SubchannelError::GeometryError(
                        "triangular lattice needs at least 2 rings".to_string(),
                    ));
                }
                if *flat_to_flat <= 0.0 {
                    return Err(SubchannelError::GeometryError(
                        "flat_to_flat must be positive".to_string(),
                    ));
                }
                false
            }
            LatticeConfig::Square { nx, ny, side_gap } => {
                if *nx == 0 || *ny == 0 {
                    return Err(SubchannelError::GeometryError(
                        "square lattice needs nx, ny >= 1".to_string(),
                    ));
                }
                if *side_gap < 0.0 {
                    return Err(SubchannelError::GeometryError(
                        "side_gap must be non-negative".to_string(),
                    ));
                }
                true
            }
        };
        if g.pitch < g.pin_diameter {
            return Err(SubchannelError::GeometryError(
                "pitch must not be smaller than pin_diameter".to_string(),
            ));
        }

        let wire_correlation = self.closures.friction == FrictionModel::ChengTodreas
            || self.closures.mixing == MixingModel::ChengTodreas;
        if is_square && wire_correlation {
            return Err(SubchannelError::ConfigError(
                "Cheng–Todreas correlations apply to triangular lattices only".to_string(),
            ));
        }
        if self.closures.mixing == MixingModel::ChengTodreas && !g.has_wire() {
            return Err(SubchannelError::ConfigError(
                "Cheng–Todreas mixing requires a wire-wrapped bundle".to_string(),
            ));
        }
        if !is_square && self.closures.friction == FrictionModel::TodreasKazimi {
            return Err(SubchannelError::ConfigError(
                "Todreas–Kazimi friction applies to square lattices only".to_string(),
            ));
        }

        if let Some(b) = &g.blockage {
            if b.index_blockage.len() != b.reduction_blockage.len() {
                return Err(SubchannelError::DimensionMismatch {
                    what: "reduction_blockage".to_string(),
                    expected: b.index_blockage.len(),
                    found: b.reduction_blockage.len(),
                });
            }
            if b.reduction_blockage.iter().any(|&r| !(r > 0.0 && r <= 1.0)) {
                return Err(SubchannelError::ConfigError(
                    "reduction_blockage entries must lie in (0, 1]".to_string(),
                ));
            }
            let n_ch = g.n_channels();
            if let Some(&bad) = b.index_blockage.iter().find(|&&i| i >= n_ch) {
                return Err(SubchannelError::ConfigError(format!(
                    "blocked channel {bad} does not exist ({n_ch} channels)"
                )));
            }
        }
        if let Some(k) = &g.k_grid {
            let n_ch = g.n_channels();
            if k.len() != n_ch {
                return Err(SubchannelError::DimensionMismatch {
                    what: "k_grid channels".to_string(),
                    expected: n_ch,
                    found: k.len(),
                });
            }
            if let Some(row) = k.iter().find(|row| row.len() != g.n_cells) {
                return Err(SubchannelError::DimensionMismatch {
                    what: "k_grid cells".to_string(),
                    expected: g.n_cells,
                    found: row.len(),
                });
            }
        }

        let p = &self.pin;
        if p.enabled {
            let rco = 0.5 * g.pin_diameter;
            if p.fuel_inner_radius > p.fuel_outer_radius
                || p.fuel_outer_radius > p.clad_inner_radius
                || p.clad_inner_radius > rco
            {
                return Err(SubchannelError::GeometryError(format!(
                    "pin radii out of order: r0={}, rfu={}, rci={}, rco={}",
                    p.fuel_inner_radius, p.fuel_outer_radius, p.clad_inner_radius, rco
                )));
            }
            if p.n_fuel_nodes < 2 {
                return Err(SubchannelError::ConfigError(
                    "n_fuel_nodes must be >= 2".to_string(),
                ));
            }
        }

        let s = &self.solver;
        if !(s.wij_relaxation > 0.0 && s.wij_relaxation <= 1.0) {
            return Err(SubchannelError::ConfigError(
                "wij_relaxation must lie in (0, 1]".to_string(),
            ));
        }
        if self.cdap.enabled && !p.enabled {
            return Err(SubchannelError::ConfigError(
                "clad damage tracking requires the pin conduction model".to_string(),
            ));
        }
        if self.cdap.cdf_sigma <= 0.0 {
            return Err(SubchannelError::ConfigError(
                "cdf_sigma must be positive".to_string(),
            ));
        }
        if self.power.radial_profile.is_some() && self.power.radial_profile_file.is_some() {
            return Err(SubchannelError::ConfigError(
                "give either radial_profile or radial_profile_file, not both".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/subchannel-types/ at compile time,
    /// so we go up 2 levels to reach the workspace root.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
    }

    fn config_path(relative: &str) -> String {
        project_root().join(relative).to_string_lossy().to_string()
    }

    fn hex_geometry() -> GeometryConfig {
        GeometryConfig {
            lattice: LatticeConfig::Triangular {
                n_rings: 3,
                flat_to_flat: 0.0446,
            },
            pitch: 8.0e-3,
            pin_diameter: 6.5e-3,
            wire_diameter: 1.4e-3,
            wire_lead_length: 0.2,
            heated_length: 1.0,
            unheated_length_entry: 0.0,
            unheated_length_exit: 0.0,
            n_cells: 20,
            n_blocks: 1,
            blockage: None,
            k_grid: None,
        }
    }

    #[test]
    fn test_load_demo_configs() {
        let configs = [
            "demos/single_channel.json",
            "demos/hex_19_pin.json",
            "demos/forced_failure.json",
        ];
        for relative in &configs {
            let path = config_path(relative);
            let result = SubchannelConfig::from_file(&path);
            assert!(result.is_ok(), "Failed to load config {}: {:?}", path, result.err());
        }
    }

    #[test]
    fn test_hex_demo_contents() {
        let cfg = SubchannelConfig::from_file(&config_path("demos/hex_19_pin.json")).unwrap();
        assert_eq!(cfg.geometry.n_channels(), 42);
        assert_eq!(cfg.closures.friction, FrictionModel::ChengTodreas);
        assert!(cfg.solver.segregated);
        assert!((cfg.solver.p_tol - 1e-6).abs() < 1e-18);
    }

    #[test]
    fn test_defaults_applied() {
        let json = r#"{
            "geometry": {
                "lattice": {"kind": "square", "nx": 1, "ny": 1},
                "pitch": 0.01, "pin_diameter": 0.008, "heated_length": 1.0
            }
        }"#;
        let cfg: SubchannelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.geometry.n_cells, 20);
        assert_eq!(cfg.solver.t_maxit, 1000);
        assert_eq!(cfg.solver.maxit, 10_000);
        assert!(cfg.solver.compute_density);
        assert_eq!(cfg.fluid, FluidConfig::Sodium);
        assert_eq!(cfg.solver.interpolation, InterpolationScheme::CentralDifference);
    }

    #[test]
    fn test_square_with_wire_correlation_rejected() {
        let mut cfg = SubchannelConfig::with_geometry(GeometryConfig {
            lattice: LatticeConfig::Square {
                nx: 3,
                ny: 3,
                side_gap: 1e-3,
            },
            ..hex_geometry()
        });
        cfg.closures.friction = FrictionModel::ChengTodreas;
        assert!(matches!(
            cfg.validate(),
            Err(SubchannelError::ConfigError(_))
        ));
        cfg.closures.friction = FrictionModel::TodreasKazimi;
        cfg.closures.mixing = MixingModel::KimChung;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_wire_mixing_on_bare_bundle_rejected() {
        let mut cfg = SubchannelConfig::with_geometry(GeometryConfig {
            wire_diameter: 0.0,
            ..hex_geometry()
        });
        cfg.closures.mixing = MixingModel::ChengTodreas;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_blockage_size_mismatch() {
        let mut cfg = SubchannelConfig::with_geometry(hex_geometry());
        cfg.geometry.blockage = Some(BlockageConfig {
            index_blockage: vec![0, 1, 2],
            reduction_blockage: vec![0.5, 0.5],
            z_blockage: [0.4, 0.6],
            k_blockage: 1.0,
        });
        match cfg.validate() {
            Err(SubchannelError::DimensionMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_pin_radii_order() {
        let mut cfg = SubchannelConfig::with_geometry(hex_geometry());
        cfg.pin.enabled = true;
        cfg.pin.fuel_outer_radius = 3.0e-3;
        cfg.pin.clad_inner_radius = 2.9e-3;
        assert!(matches!(
            cfg.validate(),
            Err(SubchannelError::GeometryError(_))
        ));
    }

    #[test]
    fn test_block_partition() {
        let mut cfg = SubchannelConfig::with_geometry(hex_geometry());
        cfg.geometry.n_blocks = 3;
        assert!(cfg.validate().is_err());
        cfg.geometry.n_blocks = 4;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = SubchannelConfig::from_file("/nonexistent/case.json");
        assert!(matches!(result, Err(SubchannelError::Io(_))));
    }
}
