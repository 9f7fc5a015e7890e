// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Model definer: the two predicates and three rule templates of the
//! transitive-closure workload.
//!
//! ```text
//! direct:      Similar(A,B)                       -> Same(A,B)   w=1     squared
//! transitive:  Same(A,B) & Same(B,C) & (A != C)   -> Same(A,C)   w=1     squared
//! prior:       !Same(A,B)                                        w=0.01  squared
//! ```
use wlogic_core::{
    ArgType, Atom, LossKind, Model, ModelError, PredicateId, RuleId, RuleTemplate, Var,
};

/// Observed similarity predicate name.
pub const SIMILAR: &str = "Similar";
/// Target identity predicate name.
pub const SAME: &str = "Same";
/// Weight of the negative prior.
pub const PRIOR_WEIGHT: f64 = 0.01;

/// Handles to everything [`define_model`] declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureModel {
    /// `Similar(A, B)`, fully observed.
    pub similar: PredicateId,
    /// `Same(A, B)`, inferred.
    pub same: PredicateId,
    /// Direct implication rule.
    pub direct: RuleId,
    /// Transitivity rule.
    pub transitive: RuleId,
    /// Negative prior rule.
    pub prior: RuleId,
}

/// Declares the closure model on `model`.
///
/// Declaring twice on the same handle is rejected with
/// [`ModelError::DuplicatePredicate`] and leaves the first declaration intact.
///
/// # Errors
/// Any [`ModelError`] raised by the model handle.
pub fn define_model(model: &mut Model) -> Result<ClosureModel, ModelError> {
    let ids = [ArgType::UniqueId, ArgType::UniqueId];
    let similar = model.add_predicate(SIMILAR, &ids)?;
    let same = model.add_predicate(SAME, &ids)?;
    let (a, b, c) = (Var(0), Var(1), Var(2));

    let direct = model.add_rule(
        RuleTemplate::implication(
            "direct",
            vec![Atom::new(similar, [a, b])],
            Atom::new(same, [a, b]),
        )
        .weighted(1.0, LossKind::Squared),
    )?;
    let transitive = model.add_rule(
        RuleTemplate::implication(
            "transitive",
            vec![Atom::new(same, [a, b]), Atom::new(same, [b, c])],
            Atom::new(same, [a, c]),
        )
        .with_distinct(a, c)
        .weighted(1.0, LossKind::Squared),
    )?;
    let prior = model.add_rule(
        RuleTemplate::negative_prior("prior", Atom::new(same, [a, b]))
            .weighted(PRIOR_WEIGHT, LossKind::Squared),
    )?;

    Ok(ClosureModel {
        similar,
        same,
        direct,
        transitive,
        prior,
    })
}

/// Ground rule counts of the closure model over `n` entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundRuleCounts {
    /// One per ordered pair: `n·(n−1)`.
    pub direct: u64,
    /// One per ordered triple with distinct endpoints: `n·(n−1)·(n−2)`.
    pub transitivity: u64,
    /// One per ordered pair: `n·(n−1)`.
    pub prior: u64,
}

impl GroundRuleCounts {
    /// Sum over all three templates; equals `n²·(n−1)`.
    pub fn total(&self) -> u64 {
        self.direct
            .saturating_add(self.transitivity)
            .saturating_add(self.prior)
    }
}

/// Closed-form ground rule counts, computed without an engine.
///
/// Saturates at `u64::MAX` instead of overflowing.
pub fn ground_rule_counts(n: u64) -> GroundRuleCounts {
    let pairs = n.saturating_mul(n.saturating_sub(1));
    GroundRuleCounts {
        direct: pairs,
        transitivity: pairs.saturating_mul(n.saturating_sub(2)),
        prior: pairs,
    }
}
