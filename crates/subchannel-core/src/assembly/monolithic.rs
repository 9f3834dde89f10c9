// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Monolithic Block Solve
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coupled mass, axial momentum, lateral momentum (and optionally
//! energy) solve of one block.
//!
//! Unknowns of block row `k` are interleaved as
//! `[ṁ (n_ch) | P (n_ch) | W (n_gaps) | h (n_ch)]`. Before the solve an
//! extra lateral resistance is estimated from the current state and
//! the crossflow rows are under-relaxed.

use subchannel_math::system::LinearSystem;
use subchannel_types::error::SubchannelResult;

use super::{gather, scatter, solve_system, Slot};
use crate::problem::{Block, SubchannelProblem};

/// Keeps the estimate divisions finite.
const ESTIMATE_EPS: f64 = 1e-10;

/// Weight of the new resistance estimate against the previous one.
const RESISTANCE_RELAXATION: f64 = 0.9;

/// Unknown layout of one monolithic block row.
#[derive(Debug, Clone, Copy)]
struct Layout {
    mdot: Slot,
    p: Slot,
    w: Slot,
    h: Option<Slot>,
    stride: usize,
}

impl Layout {
    fn new(n_ch: usize, n_gaps: usize, thermal: bool) -> Self {
        let stride = 2 * n_ch + n_gaps + if thermal { n_ch } else { 0 };
        let slot = |offset| Slot { stride, offset };
        Layout {
            mdot: slot(0),
            p: slot(n_ch),
            w: slot(2 * n_ch),
            h: thermal.then(|| slot(2 * n_ch + n_gaps)),
            stride,
        }
    }
}

/// Snap an estimated lateral resistance onto the coarse levels used by
/// the solve; values below 1e-3 and above 10 pass through.
pub(crate) fn quantize_resistance(k: f64) -> f64 {
    if (1.0..10.0).contains(&k) {
        1.0
    } else if (0.1..1.0).contains(&k) {
        0.5
    } else if (0.01..0.1).contains(&k) {
        1.0 / 3.0
    } else if (1e-3..0.01).contains(&k) {
        0.1
    } else {
        k
    }
}

impl SubchannelProblem {
    /// Lateral resistance that keeps the coupled block solve realizable.
    fn estimate_added_resistance(&self, block: Block) -> SubchannelResult<f64> {
        let m = &self.mesh;
        let f = &self.fields;
        let n_ch = m.n_channels();
        let n_gaps = m.n_gaps();
        let ch_slot = Slot::dense(n_ch);
        let gap_slot = Slot::dense(n_gaps);

        // pressure estimate from the axial momentum force of the current flows
        let mut amc = LinearSystem::new(block.len() * n_ch);
        self.assemble_axial_momentum(block, &mut amc, ch_slot, ch_slot, None);
        let (a_amc, _) = amc.into_parts()?;
        let mut mdot = vec![0.0; block.len() * n_ch];
        gather(&f.mdot, block, ch_slot, &mut mdot);
        let force = a_amc.mul_vec(&mdot);
        let mut p_est = vec![0.0; force.len()];
        for iz in block.levels() {
            let k = block.row(iz);
            for ch in 0..n_ch {
                let s = self.interp(m.flow_area(iz - 1, ch), m.flow_area(iz, ch));
                p_est[ch_slot.at(k, ch)] = force[ch_slot.at(k, ch)] / (-s + ESTIMATE_EPS);
            }
        }

        // crossflow estimate from the lateral pressure force
        let mut cmc = LinearSystem::new(block.len() * n_gaps);
        self.assemble_cross_momentum(block, &mut cmc, gap_slot, gap_slot, None, 0.0);
        let (a_cmc, _) = cmc.into_parts()?;
        let diag = a_cmc.diagonal();
        let mut w_est = vec![0.0; block.len() * n_gaps];
        for iz in block.levels() {
            let k = block.row(iz);
            for g in 0..n_gaps {
                let (i, j) = m.gap_channels(g);
                let rho_i = 0.5 * (f.rho.get(iz - 1, i) + f.rho.get(iz, i));
                let rho_j = 0.5 * (f.rho.get(iz - 1, j) + f.rho.get(iz, j));
                let w = f.wij.get(iz, g);
                let rho_star = Self::gap_density(w, rho_i, rho_j);
                let s_ij = m.dz(iz) * m.gap_width(iz, g);
                let force: f64 = self
                    .cross_pressure_taps(iz, g, s_ij * s_ij * rho_star)
                    .iter()
                    .map(|tap| {
                        let p = if tap.level < block.last {
                            p_est[ch_slot.at(tap.level + 1 - block.first, tap.channel)]
                        } else {
                            f.p.get(tap.level, tap.channel)
                        };
                        tap.coef * p
                    })
                    .sum();
                let row = gap_slot.at(k, g);
                w_est[row] = force / (diag[row] + ESTIMATE_EPS);
            }
        }

        let mut max_sum_wij = ESTIMATE_EPS;
        for iz in block.levels() {
            let k = block.row(iz);
            for ch in 0..n_ch {
                let sum: f64 = m
                    .channel_gaps(ch)
                    .iter()
                    .map(|&g| m.crossflow_sign(ch, g) * w_est[gap_slot.at(k, g)])
                    .sum();
                max_sum_wij = max_sum_wij.max(sum.abs());
            }
        }
        let min_mdot = mdot
            .iter()
            .fold(f64::INFINITY, |acc, v| acc.min(v.abs()))
            .max(ESTIMATE_EPS);

        let mut change = 0.0;
        for iz in block.levels() {
            for g in 0..n_gaps {
                change += (f.wij.get(iz, g).abs() - f.wij.old(iz, g).abs()).abs();
            }
        }
        let mean_change = if n_gaps == 0 {
            0.0
        } else {
            change / (block.len() * n_gaps) as f64
        };
        let relax = mean_change / max_sum_wij + 0.5;

        let k_new = max_sum_wij / min_mdot;
        let k = (RESISTANCE_RELAXATION * k_new + (1.0 - RESISTANCE_RELAXATION) * self.added_k_old)
            * relax;
        log::trace!(
            "block {}: max estimated ΣW {:.3e}, min ṁ {:.3e}, resistance {:.3e}",
            block.index,
            max_sum_wij,
            min_mdot,
            k
        );
        Ok(quantize_resistance(k))
    }

    /// Coupled block solve; updates ṁ, P, W, ΣW, W′ (and h).
    pub(crate) fn implicit_solve(&mut self, block: Block) -> SubchannelResult<()> {
        let n_ch = self.mesh.n_channels();
        let n_gaps = self.mesh.n_gaps();
        let thermal = self.config.solver.monolithic_thermal;
        let layout = Layout::new(n_ch, n_gaps, thermal);

        self.added_k = self.estimate_added_resistance(block)?;
        self.added_k_old = self.added_k;
        let added_k = self.added_k;

        let relaxation = self.config.solver.wij_relaxation;
        let gap_slot = Slot::dense(n_gaps);
        let mut cross = LinearSystem::new(block.len() * n_gaps);
        self.assemble_cross_momentum(block, &mut cross, gap_slot, gap_slot, None, added_k);
        let cross_diag = cross.into_parts()?.0.diagonal();

        let mut sys = LinearSystem::new(block.len() * layout.stride);
        self.assemble_mass(block, &mut sys, layout.mdot, layout.mdot, Some(layout.w));
        self.assemble_axial_momentum(block, &mut sys, layout.p, layout.mdot, Some(layout.p));
        self.assemble_cross_momentum(block, &mut sys, layout.w, layout.w, Some(layout.p), added_k);
        for iz in block.levels() {
            let k = block.row(iz);
            for g in 0..n_gaps {
                let d = cross_diag[gap_slot.at(k, g)];
                let idx = layout.w.at(k, g);
                sys.add(idx, idx, d * (1.0 / relaxation - 1.0));
                sys.add_rhs(idx, (1.0 - relaxation) / relaxation * d * self.fields.wij.get(iz, g));
            }
        }
        if let Some(h) = layout.h {
            self.assemble_enthalpy(block, &mut sys, h, h);
        }

        let mut guess = vec![0.0; block.len() * layout.stride];
        gather(&self.fields.mdot, block, layout.mdot, &mut guess);
        gather(&self.fields.wij, block, layout.w, &mut guess);
        for iz in block.levels() {
            let k = block.row(iz);
            for ch in 0..n_ch {
                guess[layout.p.at(k, ch)] = self.fields.p.get(iz - 1, ch);
            }
        }
        if let Some(h) = layout.h {
            gather(&self.fields.h, block, h, &mut guess);
        }

        let x = solve_system(sys, &self.linear_solver(), Some(&guess), "monolithic")?;
        scatter(&mut self.fields.mdot, block, layout.mdot, &x);
        scatter(&mut self.fields.wij, block, layout.w, &x);
        for iz in block.levels() {
            let k = block.row(iz);
            for ch in 0..n_ch {
                self.fields.p.set(iz - 1, ch, x[layout.p.at(k, ch)]);
            }
        }
        if let Some(h) = layout.h {
            self.store_enthalpy(block, h, &x)?;
        }
        self.compute_sum_wij(block);
        self.compute_wij_prime(block);
        log::debug!(
            "block {}: monolithic solve of {} unknowns, lateral resistance {:.3e}",
            block.index,
            x.len(),
            added_k
        );
        Ok(())
    }
}
