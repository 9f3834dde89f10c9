// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Energy Conservation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Enthalpy balance and the state updates that follow it.

use subchannel_math::system::LinearSystem;
use subchannel_types::error::{SubchannelError, SubchannelResult};

use super::{solve_system, Slot};
use crate::problem::{Block, SubchannelProblem};

impl SubchannelProblem {
    /// Inlet enthalpy from the bundle inlet temperature at the local pressure.
    pub(crate) fn set_inlet_enthalpy(&mut self, block: Block) {
        if block.index != 0 {
            return;
        }
        let t_in = self.config.boundary.inlet_temperature;
        for ch in 0..self.mesh.n_channels() {
            let h = self.fluid.h_from_p_t(self.p_abs(0, ch), t_in);
            self.fields.h.set(0, ch, h);
        }
    }

    /// Enthalpy of every block node above the block inlet.
    pub(crate) fn compute_h(&mut self, block: Block) -> SubchannelResult<()> {
        if !self.config.solver.implicit {
            for iz in block.levels() {
                for ch in 0..self.mesh.n_channels() {
                    let h = self.explicit_h(iz, ch);
                    if h < 0.0 {
                        return Err(SubchannelError::NegativeEnthalpy {
                            level: iz,
                            channel: ch,
                            value: h,
                        });
                    }
                    self.fields.h.set(iz, ch, h);
                }
            }
            return Ok(());
        }

        let n_ch = self.mesh.n_channels();
        let slot = Slot::dense(n_ch);
        let mut sys = LinearSystem::new(block.len() * n_ch);
        self.assemble_enthalpy(block, &mut sys, slot, slot);
        let x = solve_system(sys, &self.linear_solver(), None, "enthalpy")?;
        self.store_enthalpy(block, slot, &x)
    }

    /// Write solved enthalpies back, rejecting negative values.
    pub(crate) fn store_enthalpy(&mut self, block: Block, slot: Slot, x: &[f64]) -> SubchannelResult<()> {
        for iz in block.levels() {
            let k = block.row(iz);
            for ch in 0..self.mesh.n_channels() {
                let h = x[slot.at(k, ch)];
                if h < 0.0 {
                    return Err(SubchannelError::NegativeEnthalpy {
                        level: iz,
                        channel: ch,
                        value: h,
                    });
                }
                self.fields.h.set(iz, ch, h);
            }
        }
        Ok(())
    }

    fn explicit_h(&self, iz: usize, ch: usize) -> f64 {
        let f = &self.fields;
        let m = &self.mesh;
        let volume = m.dz(iz) * m.flow_area(iz - 1, ch);
        let h_in = f.h.get(iz - 1, ch);

        let mut sum_wh = 0.0;
        let mut sum_mix = 0.0;
        for &g in m.channel_gaps(ch) {
            let (ii, jj) = m.gap_channels(g);
            let w = f.wij.get(iz, g);
            let d = self.donor(g, w);
            sum_wh += m.crossflow_sign(ch, g) * w * f.h.get(iz - 1, d);
            sum_mix += f.wij_prime.get(iz, g)
                * (2.0 * h_in - f.h.get(iz - 1, jj) - f.h.get(iz - 1, ii));
        }
        let storage_old = self.tr * f.rho.old(iz, ch) * f.h.old(iz, ch) * volume / self.dt;
        let numerator =
            f.mdot.get(iz - 1, ch) * h_in - sum_wh - sum_mix + self.added_heat(iz, ch) + storage_old;
        numerator / (f.mdot.get(iz, ch) + self.tr * f.rho.get(iz, ch) * volume / self.dt)
    }

    /// Implicit enthalpy rows, upwinded across the gaps.
    pub(crate) fn assemble_enthalpy(&self, block: Block, sys: &mut LinearSystem, rows: Slot, h: Slot) {
        let f = &self.fields;
        let m = &self.mesh;
        let alpha = self.alpha;
        for iz in block.levels() {
            let k = block.row(iz);
            let dz = m.dz(iz);
            for ch in 0..m.n_channels() {
                let row = rows.at(k, ch);
                // coefficient split between the cell inlet and outlet nodes
                let split = |sys: &mut LinearSystem, c: usize, coef: f64| {
                    if k > 0 {
                        sys.add(row, h.at(k - 1, c), alpha * coef);
                    } else {
                        sys.add_rhs(row, -alpha * coef * f.h.get(iz - 1, c));
                    }
                    sys.add(row, h.at(k, c), (1.0 - alpha) * coef);
                };

                let s_interp = self.interp(m.flow_area(iz - 1, ch), m.flow_area(iz, ch));
                let volume = dz * s_interp;
                let rho_interp = self.interp(f.rho.get(iz - 1, ch), f.rho.get(iz, ch));
                let c_time = self.tr * rho_interp * volume / self.dt;
                split(sys, ch, c_time);
                let rho_old = self.interp(f.rho.old(iz - 1, ch), f.rho.old(iz, ch));
                let h_old = self.interp(f.h.old(iz - 1, ch), f.h.old(iz, ch));
                sys.add_rhs(row, self.tr * rho_old * h_old * volume / self.dt);

                sys.add(row, h.at(k, ch), f.mdot.get(iz, ch));
                if k > 0 {
                    sys.add(row, h.at(k - 1, ch), -f.mdot.get(iz - 1, ch));
                } else {
                    sys.add_rhs(row, f.mdot.get(iz - 1, ch) * f.h.get(iz - 1, ch));
                }

                for &g in m.channel_gaps(ch) {
                    let w = f.wij.get(iz, g);
                    if w != 0.0 {
                        let d = self.donor(g, w);
                        split(sys, d, m.crossflow_sign(ch, g) * w);
                    }
                    let w_prime = f.wij_prime.get(iz, g);
                    if w_prime != 0.0 {
                        let (ii, jj) = m.gap_channels(g);
                        split(sys, ch, 2.0 * w_prime);
                        split(sys, jj, -w_prime);
                        split(sys, ii, -w_prime);
                    }
                }

                sys.add_rhs(row, self.added_heat(iz, ch));
            }
        }
    }

    /// Temperature from the local pressure and enthalpy.
    pub(crate) fn compute_t(&mut self, block: Block) {
        for iz in block.levels() {
            for ch in 0..self.mesh.n_channels() {
                let t = self.fluid.t_from_p_h(self.p_abs(iz, ch), self.fields.h.get(iz, ch));
                self.fields.t.set(iz, ch, t);
            }
        }
    }

    /// Levels whose properties follow the block state; block 0 includes the inlet.
    fn property_levels(block: Block) -> std::ops::RangeInclusive<usize> {
        if block.index == 0 {
            0..=block.last
        } else {
            block.levels()
        }
    }

    pub(crate) fn compute_rho(&mut self, block: Block) {
        for iz in Self::property_levels(block) {
            for ch in 0..self.mesh.n_channels() {
                let rho = self.fluid.rho_from_p_t(self.p_abs(iz, ch), self.fields.t.get(iz, ch));
                self.fields.rho.set(iz, ch, rho);
            }
        }
    }

    pub(crate) fn compute_mu(&mut self, block: Block) {
        for iz in Self::property_levels(block) {
            for ch in 0..self.mesh.n_channels() {
                let mu = self.fluid.mu_from_p_t(self.p_abs(iz, ch), self.fields.t.get(iz, ch));
                self.fields.mu.set(iz, ch, mu);
            }
        }
    }
}
