// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Mass Conservation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Axial mass balance of a channel cell:
//!
//! ```text
//! ṁ_out = ṁ_in − Σ_g s(ch, g) W_g − TR (ρ_out − ρ_out^old) dz S_in / dt
//! ```

use subchannel_math::system::LinearSystem;
use subchannel_types::error::{SubchannelError, SubchannelResult};

use super::{scatter, solve_system, Slot};
use crate::problem::{Block, SubchannelProblem};

impl SubchannelProblem {
    /// Net crossflow leaving each channel of the block cells.
    pub(crate) fn compute_sum_wij(&mut self, block: Block) {
        for iz in block.levels() {
            for ch in 0..self.mesh.n_channels() {
                let sum: f64 = self
                    .mesh
                    .channel_gaps(ch)
                    .iter()
                    .map(|&g| self.mesh.crossflow_sign(ch, g) * self.fields.wij.get(iz, g))
                    .sum();
                self.fields.sum_wij.set(iz, ch, sum);
            }
        }
    }

    /// Density storage term of cell `iz` (kg/s).
    fn mass_storage(&self, iz: usize, ch: usize) -> f64 {
        let volume = self.mesh.dz(iz) * self.mesh.flow_area(iz - 1, ch);
        let f = &self.fields;
        self.tr * (f.rho.get(iz, ch) - f.rho.old(iz, ch)) * volume / self.dt
    }

    /// Axial flows of the block from the crossflows in `sum_wij`.
    ///
    /// The explicit march rejects negative flow: recirculation needs the
    /// implicit path.
    pub(crate) fn compute_mdot(&mut self, block: Block) -> SubchannelResult<()> {
        let n_ch = self.mesh.n_channels();
        if !self.config.solver.implicit {
            for iz in block.levels() {
                for ch in 0..n_ch {
                    let m_out = self.inlet_mdot(iz, ch)
                        - self.fields.sum_wij.get(iz, ch)
                        - self.mass_storage(iz, ch);
                    if m_out < 0.0 {
                        return Err(SubchannelError::NegativeMassFlow {
                            level: iz,
                            channel: ch,
                            value: m_out,
                        });
                    }
                    self.fields.mdot.set(iz, ch, m_out);
                }
            }
            return Ok(());
        }

        let slot = Slot::dense(n_ch);
        let mut sys = LinearSystem::new(block.len() * n_ch);
        self.assemble_mass(block, &mut sys, slot, slot, None);
        let x = solve_system(sys, &self.linear_solver(), None, "mass")?;
        scatter(&mut self.fields.mdot, block, slot, &x);
        Ok(())
    }

    /// Mass rows `ṁ_k − ṁ_{k−1} + ΣW = −storage`.
    ///
    /// With `w = None` the crossflow sum is taken from `sum_wij`;
    /// otherwise the crossflows are unknowns at slot `w`.
    pub(crate) fn assemble_mass(
        &self,
        block: Block,
        sys: &mut LinearSystem,
        rows: Slot,
        mdot: Slot,
        w: Option<Slot>,
    ) {
        for iz in block.levels() {
            let k = block.row(iz);
            for ch in 0..self.mesh.n_channels() {
                let row = rows.at(k, ch);
                sys.add(row, mdot.at(k, ch), 1.0);
                if k > 0 {
                    sys.add(row, mdot.at(k - 1, ch), -1.0);
                } else {
                    sys.add_rhs(row, self.fields.mdot.get(iz - 1, ch));
                }
                sys.add_rhs(row, -self.mass_storage(iz, ch));
                match w {
                    Some(w) => {
                        for &g in self.mesh.channel_gaps(ch) {
                            sys.add(row, w.at(k, g), self.mesh.crossflow_sign(ch, g));
                        }
                    }
                    None => sys.add_rhs(row, -self.fields.sum_wij.get(iz, ch)),
                }
            }
        }
    }
}
