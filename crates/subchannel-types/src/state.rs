// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::Array2;

/// Nodal scalar field over an axial grid, laid out \[axial level, entity\],
/// where the entity is a channel, gap, pin or duct node.
///
/// Keeps the previous-timestep copy returned by [`Field::old`].
#[derive(Debug, Clone)]
pub struct Field {
    current: Array2<f64>,
    previous: Array2<f64>,
}

impl Field {
    pub fn new(n_levels: usize, n_entities: usize) -> Self {
        Self::filled(n_levels, n_entities, 0.0)
    }

    pub fn filled(n_levels: usize, n_entities: usize, value: f64) -> Self {
        let current = Array2::from_elem((n_levels, n_entities), value);
        Field {
            previous: current.clone(),
            current,
        }
    }

    #[inline]
    pub fn get(&self, iz: usize, i: usize) -> f64 {
        self.current[[iz, i]]
    }

    #[inline]
    pub fn set(&mut self, iz: usize, i: usize, value: f64) {
        self.current[[iz, i]] = value;
    }

    #[inline]
    pub fn add(&mut self, iz: usize, i: usize, value: f64) {
        self.current[[iz, i]] += value;
    }

    /// Value at the end of the previous time step.
    #[inline]
    pub fn old(&self, iz: usize, i: usize) -> f64 {
        self.previous[[iz, i]]
    }

    /// Copy the current values into the previous-timestep slot.
    pub fn snapshot(&mut self) {
        self.previous.assign(&self.current);
    }

    pub fn fill(&mut self, value: f64) {
        self.current.fill(value);
    }

    /// Euclidean norm over every node.
    pub fn l2_norm(&self) -> f64 {
        self.current.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn n_levels(&self) -> usize {
        self.current.nrows()
    }

    pub fn n_entities(&self) -> usize {
        self.current.ncols()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.current
    }

    pub fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.current
    }

    /// Sum of one axial level over all entities.
    pub fn level_sum(&self, iz: usize) -> f64 {
        self.current.row(iz).sum()
    }
}

/// Bundle-level quantities reported at the end of a steady solve.
#[derive(Debug, Clone, Default)]
pub struct BundleSummary {
    /// Total inlet flow area (m²)
    pub flow_area: f64,
    /// Bundle hydraulic diameter 4A/Pw (m)
    pub hydraulic_diameter: f64,
    /// Bundle Reynolds number at the inlet
    pub reynolds: f64,
    /// Mixed-mean outlet temperature (K)
    pub bulk_outlet_temperature: f64,
    /// Inlet enthalpy flow Σ ṁh (W)
    pub power_in: f64,
    /// Outlet enthalpy flow Σ ṁh (W)
    pub power_out: f64,
    pub mass_flow_in: f64,
    pub mass_flow_out: f64,
    /// Gauge inlet pressure drop over the bundle (Pa)
    pub pressure_drop: f64,
    /// Absolute outlet pressure (Pa)
    pub outlet_pressure: f64,
}

impl BundleSummary {
    pub fn power_added(&self) -> f64 {
        self.power_out - self.power_in
    }

    pub fn mass_balance(&self) -> f64 {
        self.mass_flow_out - self.mass_flow_in
    }
}

/// Result of one coupled solve. Iteration-cap exhaustion only clears
/// `converged`; fatal states are returned as errors instead.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub converged: bool,
    /// Outer (pressure) iterations performed
    pub iterations: usize,
    /// Inner (temperature) iterations summed over blocks and outer passes
    pub temperature_iterations: usize,
    /// Last relative change of the pressure norm
    pub pressure_residual: f64,
    /// Last relative change of the temperature norm
    pub temperature_residual: f64,
    pub summary: BundleSummary,
    pub solve_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_keeps_old_values() {
        let mut f = Field::filled(3, 2, 1.0);
        f.set(1, 1, 5.0);
        assert_eq!(f.old(1, 1), 1.0);
        f.snapshot();
        f.set(1, 1, 7.0);
        assert_eq!(f.old(1, 1), 5.0);
        assert_eq!(f.get(1, 1), 7.0);
    }

    #[test]
    fn test_l2_norm() {
        let mut f = Field::new(2, 2);
        f.set(0, 0, 3.0);
        f.set(1, 1, 4.0);
        assert!((f.l2_norm() - 5.0).abs() < 1e-14);
        assert!((f.level_sum(1) - 4.0).abs() < 1e-14);
    }
}
