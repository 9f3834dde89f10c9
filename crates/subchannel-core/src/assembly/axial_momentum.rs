// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Axial Momentum
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Turbulent crossflow W′, cell pressure drop and the pressure march.
//!
//! The explicit path stores the cell pressure drop in Pa. The implicit
//! path keeps the momentum balance in force units (N): the pressure
//! rows `−S P_in + S P_out = −DP` recover the same pressures.

use subchannel_math::system::LinearSystem;
use subchannel_types::constants::GRAVITY;
use subchannel_types::error::SubchannelResult;

use super::{apply_pressure, gather, scatter, solve_system, PressureTap, Slot};
use crate::problem::{Block, SubchannelProblem};

/// Weight of each neighbouring cell drop in the staggered pressure march.
const STAGGERED_WEIGHT: f64 = 0.5;

impl SubchannelProblem {
    /// `W′ = β Ḡ Δz w_gap` over the block cells, with `Ḡ` the in/out
    /// average mass flux of the two channels.
    pub(crate) fn compute_wij_prime(&mut self, block: Block) {
        for iz in block.levels() {
            let dz = self.mesh.dz(iz);
            for g in 0..self.mesh.n_gaps() {
                let (i, j) = self.mesh.gap_channels(g);
                let f = &self.fields;
                let m = &self.mesh;
                let flux_in = (f.mdot.get(iz - 1, i) + f.mdot.get(iz - 1, j))
                    / (m.flow_area(iz - 1, i) + m.flow_area(iz - 1, j));
                let flux_out = (f.mdot.get(iz, i) + f.mdot.get(iz, j))
                    / (m.flow_area(iz, i) + m.flow_area(iz, j));
                let beta = self.mixing_beta(iz, g);
                let w_prime = beta * 0.5 * (flux_in + flux_out) * dz * m.gap_width(iz, g);
                self.fields.wij_prime.set(iz, g, w_prime);
            }
        }
    }

    /// Pressure drop of every block cell.
    pub(crate) fn compute_dp(&mut self, block: Block) -> SubchannelResult<()> {
        if !self.config.solver.implicit {
            for iz in block.levels() {
                for ch in 0..self.mesh.n_channels() {
                    let dp = self.explicit_dp(iz, ch);
                    self.fields.dp.set(iz, ch, dp);
                }
            }
            return Ok(());
        }

        // DP = A ṁ − b, in force units
        let n_ch = self.mesh.n_channels();
        let slot = Slot::dense(n_ch);
        let n = block.len() * n_ch;
        let mut sys = LinearSystem::new(n);
        self.assemble_axial_momentum(block, &mut sys, slot, slot, None);
        let (a, b) = sys.into_parts()?;
        let mut mdot = vec![0.0; n];
        gather(&self.fields.mdot, block, slot, &mut mdot);
        let mut dp = a.mul_vec(&mdot);
        for (d, rhs) in dp.iter_mut().zip(b.iter()) {
            *d -= rhs;
        }
        scatter(&mut self.fields.dp, block, slot, &dp);
        Ok(())
    }

    /// Explicit cell momentum balance divided by the inlet area (Pa).
    fn explicit_dp(&self, iz: usize, ch: usize) -> f64 {
        let f = &self.fields;
        let m = &self.mesh;
        let dz = m.dz(iz);
        let rho_in = f.rho.get(iz - 1, ch);
        let rho_out = f.rho.get(iz, ch);
        let mu_in = f.mu.get(iz - 1, ch);
        let s = m.flow_area(iz - 1, ch);
        let w_perim = m.wetted_perimeter(iz - 1, ch);
        let dh = 4.0 * s / w_perim;
        let m_in = f.mdot.get(iz - 1, ch);
        let m_out = f.mdot.get(iz, ch);

        let time_term = self.tr
            * ((m_out - f.mdot.old(iz, ch)) * dz / self.dt
                - dz * 2.0 * m_out * (rho_out - f.rho.old(iz, ch)) / rho_in / self.dt);
        let mass_term1 = m_out * m_out * (1.0 / (s * rho_out) - 1.0 / (s * rho_in));
        let mass_term2 = -2.0 * m_out * f.sum_wij.get(iz, ch) / (s * rho_in);

        let mut crossflow_term = 0.0;
        let mut turbulent_term = 0.0;
        for &g in m.channel_gaps(ch) {
            let (ii, jj) = m.gap_channels(g);
            let w = f.wij.get(iz, g);
            let d = self.donor(g, w);
            let u_star = f.mdot.get(iz, d) / m.flow_area(iz - 1, d) / f.rho.get(iz - 1, d);
            crossflow_term += m.crossflow_sign(ch, g) * w * u_star;
            turbulent_term += f.wij_prime.get(iz, g)
                * (2.0 * m_out / (rho_in * s)
                    - f.mdot.get(iz, jj) / (m.flow_area(iz - 1, jj) * f.rho.get(iz - 1, jj))
                    - f.mdot.get(iz, ii) / (m.flow_area(iz - 1, ii) * f.rho.get(iz - 1, ii)));
        }
        turbulent_term *= self.config.closures.ct;

        let re = (m_in / s) * dh / mu_in;
        let fi = self.friction_factor(ch, re, s, w_perim);
        let friction_term = (fi * dz / dh + m.form_loss(iz, ch)) * 0.5 * m_out * m_out
            / (s * rho_out)
            * f.friction_multiplier[[iz, ch]];
        let gravity_term = GRAVITY * rho_out * dz * s;

        (time_term
            + mass_term1
            + mass_term2
            + crossflow_term
            + turbulent_term
            + friction_term
            + gravity_term)
            / s
    }

    /// Implicit axial momentum rows over the axial flows (force units).
    ///
    /// With `p = Some(slot)` the pressure force `−S P_in + S P_out` is
    /// added as unknowns; with `None` the rows hold `A ṁ = b` only.
    pub(crate) fn assemble_axial_momentum(
        &self,
        block: Block,
        sys: &mut LinearSystem,
        rows: Slot,
        mdot: Slot,
        p: Option<Slot>,
    ) {
        let f = &self.fields;
        let m = &self.mesh;
        let alpha = self.alpha;
        let ct = self.config.closures.ct;
        for iz in block.levels() {
            let k = block.row(iz);
            let dz = m.dz(iz);
            for ch in 0..m.n_channels() {
                let row = rows.at(k, ch);
                let s_in = m.flow_area(iz - 1, ch);
                let s_out = m.flow_area(iz, ch);
                let s_interp = self.interp(s_in, s_out);
                let rho_in = f.rho.get(iz - 1, ch);
                let rho_out = f.rho.get(iz, ch);
                let rho_interp = self.interp(rho_in, rho_out);
                let m_in = f.mdot.get(iz - 1, ch);
                let m_out = f.mdot.get(iz, ch);

                // 1. time derivative
                let c_time = self.tr * dz / self.dt;
                sys.add(row, mdot.at(k, ch), c_time * (1.0 - alpha));
                if k > 0 {
                    sys.add(row, mdot.at(k - 1, ch), c_time * alpha);
                } else {
                    sys.add_rhs(row, -c_time * alpha * m_in);
                }
                let m_old = self.interp(f.mdot.old(iz - 1, ch), f.mdot.old(iz, ch));
                sys.add_rhs(row, c_time * m_old);

                // 2. axial advection
                sys.add(row, mdot.at(k, ch), m_out / (s_out * rho_out));
                if k > 0 {
                    sys.add(row, mdot.at(k - 1, ch), -m_in / (s_in * rho_in));
                } else {
                    sys.add_rhs(row, m_in * m_in / (s_in * rho_in));
                }

                // 3. lateral momentum carried by the crossflow, donor velocity
                for &g in m.channel_gaps(ch) {
                    let w = f.wij.get(iz, g);
                    if w == 0.0 {
                        continue;
                    }
                    let d = self.donor(g, w);
                    let s_d = self.interp(m.flow_area(iz - 1, d), m.flow_area(iz, d));
                    let rho_d = self.interp(f.rho.get(iz - 1, d), f.rho.get(iz, d));
                    let coef = m.crossflow_sign(ch, g) * w / (s_d * rho_d);
                    if k > 0 {
                        sys.add(row, mdot.at(k - 1, d), alpha * coef);
                    } else {
                        sys.add_rhs(row, -alpha * coef * self.fields.mdot.get(iz - 1, d));
                    }
                    sys.add(row, mdot.at(k, d), (1.0 - alpha) * coef);
                }

                // 4. turbulent momentum exchange
                for &g in m.channel_gaps(ch) {
                    let w_prime = ct * f.wij_prime.get(iz, g);
                    if w_prime == 0.0 {
                        continue;
                    }
                    let (ii, jj) = m.gap_channels(g);
                    let velocity_coef = |c: usize| {
                        let s_c = self.interp(m.flow_area(iz - 1, c), m.flow_area(iz, c));
                        let rho_c = self.interp(f.rho.get(iz - 1, c), f.rho.get(iz, c));
                        1.0 / (s_c * rho_c)
                    };
                    let taps = [
                        (ch, 2.0 * w_prime / (rho_interp * s_interp)),
                        (jj, -w_prime * velocity_coef(jj)),
                        (ii, -w_prime * velocity_coef(ii)),
                    ];
                    for (c, coef) in taps {
                        if k > 0 {
                            sys.add(row, mdot.at(k - 1, c), alpha * coef);
                        } else {
                            sys.add_rhs(row, -alpha * coef * self.fields.mdot.get(iz - 1, c));
                        }
                        sys.add(row, mdot.at(k, c), (1.0 - alpha) * coef);
                    }
                }

                // 5. wall friction and form loss
                let w_perim = self.interp(m.wetted_perimeter(iz - 1, ch), m.wetted_perimeter(iz, ch));
                let dh = 4.0 * s_interp / w_perim;
                let mu_interp = self.interp(f.mu.get(iz - 1, ch), f.mu.get(iz, ch));
                let m_interp = self.interp(m_in, m_out);
                let re = (m_interp / s_interp) * dh / mu_interp;
                let fi = self.friction_factor(ch, re, s_interp, w_perim);
                let coef = (fi * dz / dh + m.form_loss(iz, ch)) * 0.5 * m_out.abs()
                    / (s_interp * rho_interp)
                    * f.friction_multiplier[[iz, ch]];
                if k > 0 {
                    sys.add(row, mdot.at(k - 1, ch), alpha * coef);
                } else {
                    sys.add_rhs(row, -alpha * coef * m_in);
                }
                sys.add(row, mdot.at(k, ch), (1.0 - alpha) * coef);

                // 6. gravity
                sys.add_rhs(row, -GRAVITY * rho_interp * dz * s_interp);

                // 7. pressure force
                if p.is_some() {
                    let taps = self.axial_pressure_taps(iz, ch);
                    apply_pressure(sys, row, &taps, block, p, &f.p);
                }
            }
        }
    }

    /// `−S P_in + S P_out` of cell `iz`.
    pub(crate) fn axial_pressure_taps(&self, iz: usize, ch: usize) -> [PressureTap; 2] {
        let s = self.interp(self.mesh.flow_area(iz - 1, ch), self.mesh.flow_area(iz, ch));
        [
            PressureTap {
                level: iz - 1,
                channel: ch,
                coef: -s,
            },
            PressureTap {
                level: iz,
                channel: ch,
                coef: s,
            },
        ]
    }

    /// Staggered cell drop: half the last cell, the neighbour average elsewhere.
    fn staggered_dp(&self, block: Block, iz: usize, ch: usize) -> f64 {
        let dp = &self.fields.dp;
        if iz == block.last {
            STAGGERED_WEIGHT * dp.get(iz, ch)
        } else {
            (1.0 - STAGGERED_WEIGHT) * dp.get(iz + 1, ch) + STAGGERED_WEIGHT * dp.get(iz, ch)
        }
    }

    /// Pressures of the block, marching down from the block outlet.
    pub(crate) fn compute_p(&mut self, block: Block) -> SubchannelResult<()> {
        let staggered = self.config.solver.staggered_pressure;
        let n_ch = self.mesh.n_channels();
        if !self.config.solver.implicit {
            for iz in block.levels().rev() {
                for ch in 0..n_ch {
                    let dp = if staggered {
                        self.staggered_dp(block, iz, ch)
                    } else {
                        self.fields.dp.get(iz, ch)
                    };
                    let p_in = self.fields.p.get(iz, ch) + dp;
                    self.fields.p.set(iz - 1, ch, p_in);
                }
            }
            return Ok(());
        }

        let slot = Slot::dense(n_ch);
        let mut sys = LinearSystem::new(block.len() * n_ch);
        for iz in block.levels() {
            let k = block.row(iz);
            for ch in 0..n_ch {
                let row = slot.at(k, ch);
                let taps = self.axial_pressure_taps(iz, ch);
                apply_pressure(&mut sys, row, &taps, block, Some(slot), &self.fields.p);
                let dp = if staggered {
                    self.staggered_dp(block, iz, ch)
                } else {
                    self.fields.dp.get(iz, ch)
                };
                sys.add_rhs(row, -dp);
            }
        }
        let x = solve_system(sys, &self.linear_solver(), None, "pressure")?;
        for iz in block.levels() {
            let k = block.row(iz);
            for ch in 0..n_ch {
                self.fields.p.set(iz - 1, ch, x[slot.at(k, ch)]);
            }
        }
        Ok(())
    }
}
