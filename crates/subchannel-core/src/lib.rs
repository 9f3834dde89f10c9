// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Subchannel Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Subchannel thermal-hydraulics for wire-wrapped and bare rod bundles.
//!
//! Mesh and closures, block-wise segregated or monolithic flow solves,
//! pin conduction, and clad damage with fission-gas release.

pub mod assembly;
pub mod cdap;
pub mod closures;
pub mod driver;
pub mod duct;
pub mod fluid;
pub mod mesh;
pub mod pin;
pub mod power;
pub mod problem;
pub mod simulation;

pub use problem::{Block, FlowFields, SubchannelProblem};
pub use simulation::{Simulation, StepRecord};
