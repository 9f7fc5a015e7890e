// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! MPE inference over hinge-loss potentials.
//!
//! Minimizes `Σ potential(ground rule)` over the variable atoms of a
//! [`Database`], each constrained to `[0, 1]`. The solver is a deterministic
//! projected gradient method with a per-variable step scaled by that
//! variable's curvature bound, started from all zeros, updating every variable
//! from the same iterate (Jacobi order) so the result does not depend on
//! ground rule order beyond floating-point summation.
use thiserror::Error;
use tracing::{debug, instrument};

use crate::database::{AtomIdx, Database};
use crate::grounding::{ground_model, GroundRule};
use crate::model::Model;
use crate::rule::LossKind;
use crate::store::StoreError;

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceConfig {
    /// Upper bound on gradient iterations.
    pub max_iterations: u32,
    /// Fraction of the curvature-scaled step taken per iteration, in `(0, 1]`.
    pub step_size: f64,
    /// Convergence threshold on the largest per-variable change.
    pub tolerance: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            step_size: 0.5,
            tolerance: 1e-6,
        }
    }
}

/// Errors emitted by inference.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Inference handle or its database was closed.
    #[error("inference handle is closed")]
    Closed,
    /// Settings outside their valid ranges.
    #[error("invalid inference config: {0}")]
    InvalidConfig(&'static str),
    /// Store failure while preparing inference.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Objective diverged.
    #[error("objective became non-finite after {iterations} iterations")]
    NonFinite {
        /// Iterations completed before divergence was detected.
        iterations: u32,
    },
}

/// Outcome of one inference run.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceReport {
    /// Ground rules produced, per rule template in registration order.
    pub ground_rules_per_rule: Vec<u64>,
    /// Inference variables solved for.
    pub variables: usize,
    /// Gradient iterations performed.
    pub iterations: u32,
    /// Whether the tolerance was reached before the iteration cap.
    pub converged: bool,
    /// Final objective value.
    pub objective: f64,
}

impl InferenceReport {
    /// Total ground rules across all templates.
    pub fn ground_rules(&self) -> u64 {
        self.ground_rules_per_rule.iter().sum()
    }
}

/// Inference handle bound to a model and a database.
///
/// Ground rules are retained from [`Self::run`] until [`Self::close`] (or
/// drop), so memory sampled between the two includes them.
#[derive(Debug)]
pub struct MpeInference<'a> {
    model: &'a Model,
    db: &'a mut Database,
    config: InferenceConfig,
    ground: Vec<GroundRule>,
    closed: bool,
}

impl<'a> MpeInference<'a> {
    /// Creates a handle.
    ///
    /// # Errors
    /// [`InferenceError::Closed`] if `db` is closed,
    /// [`InferenceError::InvalidConfig`] for out-of-range settings.
    pub fn new(
        model: &'a Model,
        db: &'a mut Database,
        config: InferenceConfig,
    ) -> Result<Self, InferenceError> {
        if db.is_closed() {
            return Err(InferenceError::Closed);
        }
        if !(config.step_size > 0.0 && config.step_size <= 1.0) {
            return Err(InferenceError::InvalidConfig("step_size must be in (0, 1]"));
        }
        if !(config.tolerance >= 0.0 && config.tolerance.is_finite()) {
            return Err(InferenceError::InvalidConfig(
                "tolerance must be finite and non-negative",
            ));
        }
        Ok(Self {
            model,
            db,
            config,
            ground: Vec::new(),
            closed: false,
        })
    }

    /// Grounds the model, solves, and writes inferred values into the database.
    ///
    /// # Errors
    /// [`InferenceError::Closed`] after close, [`InferenceError::NonFinite`] if
    /// the objective diverges.
    #[instrument(level = "debug", skip_all)]
    pub fn run(&mut self) -> Result<InferenceReport, InferenceError> {
        if self.closed || self.db.is_closed() {
            return Err(InferenceError::Closed);
        }
        self.ground = ground_model(self.model, self.db);

        let mut per_rule = vec![0u64; self.model.rules().len()];
        for g in &self.ground {
            per_rule[g.rule.index()] += 1;
        }
        debug!(ground_rules = self.ground.len(), ?per_rule, "grounding complete");

        let outcome = solve(&self.ground, self.db.values(), self.variable_slots(), &self.config)?;
        for (slot, value) in outcome.variable_values {
            self.db.set_value(slot, value);
        }
        debug!(
            iterations = outcome.iterations,
            converged = outcome.converged,
            objective = outcome.objective,
            "solve complete"
        );

        Ok(InferenceReport {
            ground_rules_per_rule: per_rule,
            variables: self.db.variable_count(),
            iterations: outcome.iterations,
            converged: outcome.converged,
            objective: outcome.objective,
        })
    }

    /// Ground rules from the last run.
    pub fn ground_rules(&self) -> &[GroundRule] {
        &self.ground
    }

    fn variable_slots(&self) -> Vec<AtomIdx> {
        (0..self.db.atom_count())
            .filter_map(|i| u32::try_from(i).ok().map(AtomIdx))
            .filter(|&idx| self.db.is_variable(idx))
            .collect()
    }

    /// Releases ground rules. Repeated calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.ground = Vec::new();
    }

    /// Whether [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MpeInference<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

struct SolveOutcome {
    variable_values: Vec<(AtomIdx, f64)>,
    iterations: u32,
    converged: bool,
    objective: f64,
}

fn solve(
    ground: &[GroundRule],
    initial: &[f64],
    variables: Vec<AtomIdx>,
    config: &InferenceConfig,
) -> Result<SolveOutcome, InferenceError> {
    let mut x = initial.to_vec();

    // Per-variable curvature bound: Σ 2w·c² (squared) or Σ w·|c| (linear).
    let mut curvature = vec![0.0f64; x.len()];
    for g in ground {
        for t in &g.terms {
            curvature[t.atom.slot()] += match g.loss {
                LossKind::Squared => 2.0 * g.weight * t.coefficient * t.coefficient,
                LossKind::Linear => g.weight * t.coefficient.abs(),
            };
        }
    }

    let mut grad = vec![0.0f64; x.len()];
    let mut iterations = 0;
    let mut converged = variables.is_empty();
    while !converged && iterations < config.max_iterations {
        grad.iter_mut().for_each(|g| *g = 0.0);
        for g in ground {
            let d = g.linear(&x);
            if d <= 0.0 {
                continue;
            }
            let scale = match g.loss {
                LossKind::Squared => 2.0 * g.weight * d,
                LossKind::Linear => g.weight,
            };
            for t in &g.terms {
                grad[t.atom.slot()] += scale * t.coefficient;
            }
        }

        let mut max_delta = 0.0f64;
        for &v in &variables {
            let i = v.slot();
            if curvature[i] <= 0.0 {
                continue;
            }
            let next = (x[i] - config.step_size * grad[i] / curvature[i]).clamp(0.0, 1.0);
            max_delta = max_delta.max((next - x[i]).abs());
            x[i] = next;
        }
        iterations += 1;
        if !max_delta.is_finite() {
            return Err(InferenceError::NonFinite { iterations });
        }
        converged = max_delta < config.tolerance;
    }

    let objective: f64 = ground.iter().map(|g| g.potential(&x)).sum();
    if !objective.is_finite() {
        return Err(InferenceError::NonFinite { iterations });
    }
    let variable_values = variables.iter().map(|&v| (v, x[v.slot()])).collect();
    Ok(SolveOutcome {
        variable_values,
        iterations,
        converged,
        objective,
    })
}
