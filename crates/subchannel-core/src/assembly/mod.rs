// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Block Assembly
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Conservation equations of one axial block.
//!
//! Every equation set can be evaluated explicitly (marching up the
//! block) or assembled into a [`LinearSystem`]. Assembly kernels never
//! compute indices themselves: a [`Slot`] maps `(block row, entity)` to
//! a row or column, so the same kernel fills a standalone system or its
//! part of the monolithic one.
//!
//! Unknown ordering inside a block is level-major: all entities of row
//! `k` come before those of row `k + 1`, which keeps the systems banded.

mod axial_momentum;
mod cross_momentum;
mod enthalpy;
mod mass;
mod monolithic;

use subchannel_math::system::{LinearSolverKind, LinearSystem};
use subchannel_types::config::InterpolationScheme;
use subchannel_types::error::{SubchannelError, SubchannelResult};
use subchannel_types::state::Field;

use crate::problem::{Block, SubchannelProblem};

/// Keeps the exponential weight finite at Pe = 0.
const EXPONENTIAL_EPS: f64 = 1e-10;

/// Weight `α` of the bottom node in `α·bottom + (1 − α)·top`.
pub fn interpolation_weight(scheme: InterpolationScheme, peclet: f64) -> f64 {
    match scheme {
        InterpolationScheme::Upwind => 1.0,
        InterpolationScheme::Downwind => 0.0,
        InterpolationScheme::CentralDifference => 0.5,
        InterpolationScheme::Exponential => {
            let e = peclet.exp();
            ((peclet - 1.0) * e + 1.0) / (peclet * (e - 1.0) + EXPONENTIAL_EPS)
        }
    }
}

/// Position of one field inside a level-major vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    /// Entries per block row
    pub stride: usize,
    pub offset: usize,
}

impl Slot {
    /// A field stored alone: `n` entities per row.
    pub(crate) fn dense(n: usize) -> Self {
        Slot { stride: n, offset: 0 }
    }

    #[inline]
    pub(crate) fn at(&self, k: usize, entity: usize) -> usize {
        k * self.stride + self.offset + entity
    }
}

/// Coefficient multiplying the nodal pressure `P(level, channel)`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PressureTap {
    pub level: usize,
    pub channel: usize,
    pub coef: f64,
}

/// Pressure unknown `k` of a block is the node at level `first - 1 + k`;
/// the node at `last` is the boundary value handed down from the block above.
pub(crate) fn apply_pressure(
    sys: &mut LinearSystem,
    row: usize,
    taps: &[PressureTap],
    block: Block,
    p: Option<Slot>,
    pressure: &Field,
) {
    for tap in taps {
        match p {
            Some(slot) if tap.level < block.last => {
                sys.add(row, slot.at(tap.level + 1 - block.first, tap.channel), tap.coef)
            }
            _ => sys.add_rhs(row, -tap.coef * pressure.get(tap.level, tap.channel)),
        }
    }
}

/// Copy the block cells of `field` into a level-major vector.
pub(crate) fn gather(field: &Field, block: Block, slot: Slot, out: &mut [f64]) {
    let n = field.n_entities();
    for iz in block.levels() {
        let k = block.row(iz);
        for e in 0..n {
            out[slot.at(k, e)] = field.get(iz, e);
        }
    }
}

/// Inverse of [`gather`].
pub(crate) fn scatter(field: &mut Field, block: Block, slot: Slot, x: &[f64]) {
    let n = field.n_entities();
    for iz in block.levels() {
        let k = block.row(iz);
        for e in 0..n {
            field.set(iz, e, x[slot.at(k, e)]);
        }
    }
}

/// Solve an assembled block system; an empty one is a no-op.
pub(crate) fn solve_system(
    sys: LinearSystem,
    kind: &LinearSolverKind,
    guess: Option<&[f64]>,
    what: &str,
) -> SubchannelResult<Vec<f64>> {
    if sys.dim() == 0 {
        return Ok(Vec::new());
    }
    let solution = sys.solve(kind, guess)?;
    log::trace!(
        "{what}: {} linear iterations, residual {:.3e}",
        solution.iterations,
        solution.residual
    );
    if solution.x.iter().any(|v| !v.is_finite()) {
        return Err(SubchannelError::SolverDiverged {
            iteration: solution.iterations,
            message: format!("{what} solution is not finite"),
        });
    }
    if !solution.converged {
        log::warn!(
            "{what}: linear solver stopped at residual {:.3e}",
            solution.residual
        );
    }
    Ok(solution.x)
}

impl SubchannelProblem {
    /// Donor channel of gap `i_gap` for crossflow `w`: the first channel
    /// for positive flow, the second otherwise.
    #[inline]
    pub(crate) fn donor(&self, i_gap: usize, w: f64) -> usize {
        let (i, j) = self.mesh.gap_channels(i_gap);
        if w > 0.0 {
            i
        } else {
            j
        }
    }
}
