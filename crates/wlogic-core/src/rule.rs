// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Weighted rule templates.
use crate::ident::PredicateId;

/// Rule-local logical variable.
///
/// Variables are numbered densely from zero within one template; the grounder
/// binds each one to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(pub u8);

impl Var {
    pub(crate) fn slot(self) -> usize {
        usize::from(self.0)
    }
}

/// Predicate applied to rule variables, e.g. `Same(A, B)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// Predicate this atom refers to.
    pub predicate: PredicateId,
    /// Argument variables, one per predicate argument.
    pub args: Vec<Var>,
}

impl Atom {
    /// Builds an atom over the given variables.
    pub fn new(predicate: PredicateId, args: impl Into<Vec<Var>>) -> Self {
        Self {
            predicate,
            args: args.into(),
        }
    }
}

/// Penalty applied to a ground rule's distance to satisfaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    /// `weight * distance`.
    Linear,
    /// `weight * distance^2`.
    Squared,
}

impl LossKind {
    /// Potential value for a (non-negative) distance to satisfaction.
    pub fn potential(self, weight: f64, distance: f64) -> f64 {
        match self {
            Self::Linear => weight * distance,
            Self::Squared => weight * distance * distance,
        }
    }
}

/// Weighted logical statement `body ∧ guards → head`.
///
/// A template without a head is a negative prior: it penalizes the truth of
/// its body (`¬(b1 ∧ … ∧ bk)`).
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTemplate {
    /// Unique rule name used for logs and duplicate detection.
    pub name: String,
    /// Conjunctive body; grounding enumerates stored atoms matching it.
    pub body: Vec<Atom>,
    /// Pairs of variables that must bind to different entities.
    pub distinct: Vec<(Var, Var)>,
    /// Implied atom, or `None` for a negative prior.
    pub head: Option<Atom>,
    /// Non-negative rule weight.
    pub weight: f64,
    /// Potential shape.
    pub loss: LossKind,
}

impl RuleTemplate {
    /// `body → head` with weight 1 and squared loss.
    pub fn implication(name: impl Into<String>, body: Vec<Atom>, head: Atom) -> Self {
        Self {
            name: name.into(),
            body,
            distinct: Vec::new(),
            head: Some(head),
            weight: 1.0,
            loss: LossKind::Squared,
        }
    }

    /// `¬atom` with weight 1 and squared loss.
    pub fn negative_prior(name: impl Into<String>, atom: Atom) -> Self {
        Self {
            name: name.into(),
            body: vec![atom],
            distinct: Vec::new(),
            head: None,
            weight: 1.0,
            loss: LossKind::Squared,
        }
    }

    /// Adds an `a ≠ b` guard.
    pub fn with_distinct(mut self, a: Var, b: Var) -> Self {
        self.distinct.push((a, b));
        self
    }

    /// Sets weight and loss.
    pub fn weighted(mut self, weight: f64, loss: LossKind) -> Self {
        self.weight = weight;
        self.loss = loss;
        self
    }

    /// Number of distinct variable slots the template uses (max index + 1).
    pub fn variable_count(&self) -> usize {
        self.body
            .iter()
            .chain(self.head.iter())
            .flat_map(|atom| atom.args.iter())
            .chain(self.distinct.iter().flat_map(|(a, b)| [a, b]))
            .map(|v| v.slot() + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_count_covers_guards_and_head() {
        let p = PredicateId(0);
        let rule = RuleTemplate::implication(
            "t",
            vec![Atom::new(p, [Var(0), Var(1)]), Atom::new(p, [Var(1), Var(2)])],
            Atom::new(p, [Var(0), Var(2)]),
        )
        .with_distinct(Var(0), Var(2));
        assert_eq!(rule.variable_count(), 3);
    }

    #[test]
    fn squared_potential_squares_distance() {
        assert!((LossKind::Squared.potential(2.0, 0.5) - 0.5).abs() < f64::EPSILON);
        assert!((LossKind::Linear.potential(2.0, 0.5) - 1.0).abs() < f64::EPSILON);
    }
}
