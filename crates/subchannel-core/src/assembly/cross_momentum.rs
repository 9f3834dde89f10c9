// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Lateral Momentum
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Crossflow momentum of every gap and the segregated crossflow solve.
//!
//! The segregated scheme treats the block crossflows as the only
//! unknowns of a nonlinear system: for a trial `W` the axial flows,
//! turbulent crossflows, cell drops and pressures are recomputed, and
//! the lateral momentum residual of each gap is returned to Newton.

use subchannel_math::newton::newton_solve;
use subchannel_math::system::LinearSystem;
use subchannel_types::error::SubchannelResult;

use super::{apply_pressure, gather, scatter, PressureTap, Slot};
use crate::problem::{Block, SubchannelProblem};

/// Pressure weight of the cell inlet node in the non-staggered cross rows.
const CROSS_PRESSURE_WEIGHT: f64 = 0.5;

impl SubchannelProblem {
    /// Upwinded gap density: the donor channel density, or the mean at W = 0.
    pub(super) fn gap_density(w: f64, rho_i: f64, rho_j: f64) -> f64 {
        if w > 0.0 {
            rho_i
        } else if w < 0.0 {
            rho_j
        } else {
            0.5 * (rho_i + rho_j)
        }
    }

    /// Explicit lateral momentum residual of the block gaps, ordered
    /// `n_gaps·k + gap`.
    fn explicit_cross_residual(&self, block: Block) -> Vec<f64> {
        let f = &self.fields;
        let m = &self.mesh;
        let n_gaps = m.n_gaps();
        let slot = Slot::dense(n_gaps);
        let kij = self.config.closures.kij;
        let mut res = vec![0.0; block.len() * n_gaps];
        for iz in block.levels() {
            let k = block.row(iz);
            let dz = m.dz(iz);
            for g in 0..n_gaps {
                let (i, j) = m.gap_channels(g);
                let s_ij = dz * m.gap_width(iz, g);
                let l_ij = m.pitch();
                let w = f.wij.get(iz, g);
                let rho_i = f.rho.get(iz - 1, i);
                let rho_j = f.rho.get(iz - 1, j);
                let rho_star = Self::gap_density(w, rho_i, rho_j);
                let s_i = m.flow_area(iz - 1, i);
                let s_j = m.flow_area(iz - 1, j);

                let friction_term = kij * w * w.abs();
                let mass_out = f.mdot.get(iz, i) / s_i / rho_i + f.mdot.get(iz, j) / s_j / rho_j;
                let mass_in =
                    f.mdot.get(iz - 1, i) / s_i / rho_i + f.mdot.get(iz - 1, j) / s_j / rho_j;
                let inertia_term = s_ij
                    * rho_star
                    * (l_ij / dz)
                    * (mass_out * w - mass_in * f.wij.get(iz - 1, g));
                let pressure_term =
                    2.0 * s_ij * s_ij * (f.p.get(iz - 1, i) - f.p.get(iz - 1, j)) * rho_star;
                let time_term =
                    self.tr * 2.0 * (w - f.wij.old(iz, g)) * l_ij * s_ij * rho_star / self.dt;

                res[slot.at(k, g)] = time_term + friction_term + inertia_term - pressure_term;
            }
        }
        res
    }

    /// Pressure taps of the lateral momentum row of gap `g` in cell `iz`.
    pub(crate) fn cross_pressure_taps(&self, iz: usize, g: usize, pf: f64) -> Vec<PressureTap> {
        let (i, j) = self.mesh.gap_channels(g);
        let tap = |level, channel, coef| PressureTap {
            level,
            channel,
            coef,
        };
        if self.config.solver.staggered_pressure {
            vec![tap(iz - 1, i, -pf), tap(iz - 1, j, pf)]
        } else {
            let a = CROSS_PRESSURE_WEIGHT;
            vec![
                tap(iz - 1, i, -a * pf),
                tap(iz - 1, j, a * pf),
                tap(iz, i, -(1.0 - a) * pf),
                tap(iz, j, (1.0 - a) * pf),
            ]
        }
    }

    /// Linearized lateral momentum rows over the crossflows.
    ///
    /// `added_k` is an extra lateral resistance on the diagonal. With
    /// `p = None` every pressure is taken from the current field.
    pub(crate) fn assemble_cross_momentum(
        &self,
        block: Block,
        sys: &mut LinearSystem,
        rows: Slot,
        w_slot: Slot,
        p: Option<Slot>,
        added_k: f64,
    ) {
        let f = &self.fields;
        let m = &self.mesh;
        let kij = self.config.closures.kij;
        for iz in block.levels() {
            let k = block.row(iz);
            let dz = m.dz(iz);
            for g in 0..m.n_gaps() {
                let row = rows.at(k, g);
                let col = w_slot.at(k, g);
                let (i, j) = m.gap_channels(g);
                let s_ij = dz * m.gap_width(iz, g);
                let l_ij = m.pitch();
                let w = f.wij.get(iz, g);
                let rho_i = 0.5 * (f.rho.get(iz - 1, i) + f.rho.get(iz, i));
                let rho_j = 0.5 * (f.rho.get(iz - 1, j) + f.rho.get(iz, j));
                let rho_star = Self::gap_density(w, rho_i, rho_j);

                // 1. time derivative
                let c_time = self.tr * l_ij * s_ij * rho_star / self.dt;
                sys.add(row, col, c_time);
                sys.add_rhs(row, c_time * f.wij.old(iz, g));

                // 2. axial transport of lateral momentum, upwind
                let nodal_mass = |lvl: usize| {
                    f.mdot.get(lvl, i) / (m.flow_area(lvl, i) * f.rho.get(lvl, i))
                        + f.mdot.get(lvl, j) / (m.flow_area(lvl, j) * f.rho.get(lvl, j))
                };
                let advect = s_ij * rho_star * (l_ij / dz) * 0.5;
                let term_out = advect * nodal_mass(iz);
                let term_in = advect * nodal_mass(iz - 1);
                sys.add(row, col, term_out);
                if k > 0 {
                    sys.add(row, w_slot.at(k - 1, g), -term_in);
                } else {
                    sys.add_rhs(row, term_in * f.wij.get(iz - 1, g));
                }

                // 3. gap friction and the stabilizing resistance
                sys.add(row, col, kij * w.abs() * 0.5 + added_k);

                // 4. pressure difference across the gap
                let pf = s_ij * s_ij * rho_star;
                let taps = self.cross_pressure_taps(iz, g, pf);
                apply_pressure(sys, row, &taps, block, p, &f.p);
            }
        }
    }

    /// Lateral momentum residual after propagating trial crossflows `w`
    /// through the block mass and axial momentum balances.
    pub(crate) fn wij_residual(&mut self, block: Block, w: &[f64]) -> SubchannelResult<Vec<f64>> {
        let slot = Slot::dense(self.mesh.n_gaps());
        scatter(&mut self.fields.wij, block, slot, w);
        self.compute_sum_wij(block);
        self.compute_mdot(block)?;
        self.compute_wij_prime(block);
        self.compute_dp(block)?;
        self.compute_p(block)?;

        if !self.config.solver.implicit {
            return Ok(self.explicit_cross_residual(block));
        }
        let mut sys = LinearSystem::new(w.len());
        self.assemble_cross_momentum(block, &mut sys, slot, slot, None, 0.0);
        let (a, b) = sys.into_parts()?;
        let mut res = a.mul_vec(w);
        for (r, rhs) in res.iter_mut().zip(b.iter()) {
            *r -= rhs;
        }
        Ok(res)
    }

    /// Segregated block solve: Newton on the crossflows.
    pub(crate) fn solve_crossflow(&mut self, block: Block) -> SubchannelResult<()> {
        let n_gaps = self.mesh.n_gaps();
        let slot = Slot::dense(n_gaps);
        let mut x = vec![0.0; block.len() * n_gaps];
        gather(&self.fields.wij, block, slot, &mut x);
        let cfg = self.newton_config();
        let result = newton_solve(&mut |w: &[f64]| self.wij_residual(block, w), &mut x, &cfg)?;
        if result.converged {
            log::debug!(
                "block {}: crossflow Newton converged in {} iterations (|F| = {:.3e})",
                block.index,
                result.iterations,
                result.residual
            );
        } else {
            log::warn!(
                "block {}: crossflow Newton stopped after {} iterations (|F| = {:.3e})",
                block.index,
                result.iterations,
                result.residual
            );
        }
        // leave the fields consistent with the accepted crossflows
        self.wij_residual(block, &x)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_density_upwinds() {
        assert_eq!(SubchannelProblem::gap_density(1.0, 800.0, 900.0), 800.0);
        assert_eq!(SubchannelProblem::gap_density(-1.0, 800.0, 900.0), 900.0);
        assert_eq!(SubchannelProblem::gap_density(0.0, 800.0, 900.0), 850.0);
    }
}
