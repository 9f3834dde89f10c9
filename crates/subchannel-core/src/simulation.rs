// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Subchannel Simulation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Steady and transient time stepping around [`SubchannelProblem`].

use std::time::Instant;

use subchannel_types::config::SubchannelConfig;
use subchannel_types::error::{SubchannelError, SubchannelResult};
use subchannel_types::state::SolveReport;

use crate::problem::{SubchannelProblem, STEADY_DT};

/// Outcome of one transient step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Time at the end of the step (s)
    pub time: f64,
    pub report: SolveReport,
    /// Pins with a failed clad after the step
    pub failed_pins: usize,
    pub failure_probability: f64,
}

/// A subchannel case with its time history.
pub struct Simulation {
    problem: SubchannelProblem,
    history: Vec<StepRecord>,
}

impl Simulation {
    pub fn new(config: SubchannelConfig) -> SubchannelResult<Self> {
        Ok(Simulation {
            problem: SubchannelProblem::new(config)?,
            history: Vec::new(),
        })
    }

    pub fn from_file(path: &str) -> SubchannelResult<Self> {
        Ok(Simulation {
            problem: SubchannelProblem::from_file(path)?,
            history: Vec::new(),
        })
    }

    pub fn problem(&self) -> &SubchannelProblem {
        &self.problem
    }

    pub fn problem_mut(&mut self) -> &mut SubchannelProblem {
        &mut self.problem
    }

    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    pub fn into_problem(self) -> SubchannelProblem {
        self.problem
    }

    /// Solve the steady state: no time derivative, steady pin conduction.
    pub fn steady(&mut self) -> SubchannelResult<SolveReport> {
        let p = &mut self.problem;
        p.tr = 0.0;
        p.dt = STEADY_DT;
        let report = p.external_solve()?;
        if !report.converged {
            log::warn!("steady solve stopped on an iteration limit");
        }
        Ok(report)
    }

    /// Advance the coupled state by `dt`.
    ///
    /// The previous level is frozen first, then the flow and the pins are
    /// solved with the time derivative on, then the clad damage model
    /// takes the step and stages its feedback for the next one.
    pub fn advance(&mut self, dt: f64) -> SubchannelResult<&StepRecord> {
        if dt <= 0.0 || !dt.is_finite() {
            return Err(SubchannelError::ConfigError(format!(
                "time step must be positive and finite, got {dt}"
            )));
        }
        let p = &mut self.problem;
        p.fields.snapshot();
        p.time += dt;
        p.tr = 1.0;
        p.dt = dt;
        log::info!("time step to t = {:.6} s (dt = {dt:.3e} s)", p.time);

        let report = p.external_solve()?;
        p.cdap_step(dt)?;

        let (failed_pins, failure_probability) = p
            .cdap()
            .map_or((0, 0.0), |c| (c.n_failed(), c.total_probability()));
        self.history.push(StepRecord {
            time: p.time,
            report,
            failed_pins,
            failure_probability,
        });
        // history is non-empty after the push
        Ok(&self.history[self.history.len() - 1])
    }

    /// Take `n_steps` steps of size `dt`, stopping early once a forced
    /// failure experiment has run to completion.
    pub fn run_transient(&mut self, dt: f64, n_steps: usize) -> SubchannelResult<usize> {
        let start = Instant::now();
        let mut taken = 0;
        for _ in 0..n_steps {
            self.advance(dt)?;
            taken += 1;
            if self.problem.cdap().is_some_and(|c| c.experiment_complete()) {
                log::info!("forced failure experiment complete at t = {:.6} s", self.problem.time());
                break;
            }
        }
        log::info!(
            "transient: {taken} steps in {:.1} ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(taken)
    }
}
