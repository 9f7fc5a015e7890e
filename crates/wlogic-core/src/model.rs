// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Model handle: predicate and rule registration.
use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::ident::{PredicateId, RuleId, MAX_ARITY};
use crate::rule::{Atom, RuleTemplate, Var};

/// Argument type of a predicate position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// Opaque unique identifier (an entity).
    UniqueId,
}

/// Declared predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Predicate name, unique within a model.
    pub name: String,
    /// Argument types; the arity is their count.
    pub arg_types: Vec<ArgType>,
}

impl Predicate {
    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }
}

/// Errors emitted while building a model.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// A predicate with this name is already declared.
    #[error("duplicate predicate: {0}")]
    DuplicatePredicate(String),
    /// A rule with this name is already declared.
    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),
    /// Predicate declared without arguments.
    #[error("predicate {0} must take at least one argument")]
    EmptyPredicate(String),
    /// Predicate declared with more than [`MAX_ARITY`] arguments.
    #[error("predicate {name} has arity {arity}, limit is {MAX_ARITY}")]
    ArityTooLarge {
        /// Predicate name.
        name: String,
        /// Requested arity.
        arity: usize,
    },
    /// Predicate id does not belong to this model.
    #[error("unknown predicate id {0:?}")]
    UnknownPredicate(PredicateId),
    /// Atom argument count differs from the predicate arity.
    #[error("atom over {predicate} has {found} arguments, expected {expected}")]
    ArityMismatch {
        /// Predicate name.
        predicate: String,
        /// Declared arity.
        expected: usize,
        /// Arguments supplied.
        found: usize,
    },
    /// Rule has no body atoms.
    #[error("rule {0} has an empty body")]
    EmptyBody(String),
    /// Head or guard mentions a variable the body never binds.
    #[error("rule {rule}: variable {var:?} is not bound by the body")]
    UnboundVariable {
        /// Rule name.
        rule: String,
        /// Offending variable.
        var: Var,
    },
    /// Weight is negative or not finite.
    #[error("rule {rule}: invalid weight {weight}")]
    InvalidWeight {
        /// Rule name.
        rule: String,
        /// Rejected weight.
        weight: f64,
    },
    /// Too many predicates or rules for the dense id space.
    #[error("model capacity exhausted")]
    CapacityExhausted,
}

/// Registry of predicates and weighted rule templates.
///
/// Registration is append-only; redeclaring a name is rejected rather than
/// merged, so a model is defined exactly once.
#[derive(Debug, Default)]
pub struct Model {
    predicates: Vec<Predicate>,
    predicates_by_name: HashMap<String, PredicateId>,
    rules: Vec<RuleTemplate>,
    rule_names: HashSet<String>,
}

impl Model {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a predicate.
    ///
    /// # Errors
    /// [`ModelError::DuplicatePredicate`] if the name is taken,
    /// [`ModelError::EmptyPredicate`] for zero arguments,
    /// [`ModelError::ArityTooLarge`] above [`MAX_ARITY`].
    pub fn add_predicate(
        &mut self,
        name: &str,
        arg_types: &[ArgType],
    ) -> Result<PredicateId, ModelError> {
        if self.predicates_by_name.contains_key(name) {
            return Err(ModelError::DuplicatePredicate(name.to_owned()));
        }
        if arg_types.is_empty() {
            return Err(ModelError::EmptyPredicate(name.to_owned()));
        }
        if arg_types.len() > MAX_ARITY {
            return Err(ModelError::ArityTooLarge {
                name: name.to_owned(),
                arity: arg_types.len(),
            });
        }
        let raw = u16::try_from(self.predicates.len()).map_err(|_| ModelError::CapacityExhausted)?;
        let id = PredicateId(raw);
        self.predicates.push(Predicate {
            name: name.to_owned(),
            arg_types: arg_types.to_vec(),
        });
        self.predicates_by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Declares a weighted rule template after validating it against the
    /// declared predicates.
    ///
    /// # Errors
    /// Any [`ModelError`] describing why the template is malformed.
    pub fn add_rule(&mut self, rule: RuleTemplate) -> Result<RuleId, ModelError> {
        if self.rule_names.contains(&rule.name) {
            return Err(ModelError::DuplicateRule(rule.name));
        }
        if !rule.weight.is_finite() || rule.weight < 0.0 {
            return Err(ModelError::InvalidWeight {
                rule: rule.name,
                weight: rule.weight,
            });
        }
        if rule.body.is_empty() {
            return Err(ModelError::EmptyBody(rule.name));
        }
        for atom in rule.body.iter().chain(rule.head.iter()) {
            self.check_atom(atom)?;
        }

        let bound: HashSet<Var> = rule
            .body
            .iter()
            .flat_map(|a| a.args.iter().copied())
            .collect();
        let referenced = rule
            .head
            .iter()
            .flat_map(|a| a.args.iter().copied())
            .chain(rule.distinct.iter().flat_map(|&(a, b)| [a, b]));
        for var in referenced {
            if !bound.contains(&var) {
                return Err(ModelError::UnboundVariable {
                    rule: rule.name,
                    var,
                });
            }
        }

        let raw = u32::try_from(self.rules.len()).map_err(|_| ModelError::CapacityExhausted)?;
        self.rule_names.insert(rule.name.clone());
        self.rules.push(rule);
        Ok(RuleId(raw))
    }

    fn check_atom(&self, atom: &Atom) -> Result<(), ModelError> {
        let predicate = self.predicate(atom.predicate)?;
        if predicate.arity() != atom.args.len() {
            return Err(ModelError::ArityMismatch {
                predicate: predicate.name.clone(),
                expected: predicate.arity(),
                found: atom.args.len(),
            });
        }
        Ok(())
    }

    /// Looks up a declared predicate.
    ///
    /// # Errors
    /// [`ModelError::UnknownPredicate`] if the id was not issued by this model.
    pub fn predicate(&self, id: PredicateId) -> Result<&Predicate, ModelError> {
        self.predicates
            .get(id.index())
            .ok_or(ModelError::UnknownPredicate(id))
    }

    /// Finds a predicate id by name.
    pub fn predicate_by_name(&self, name: &str) -> Option<PredicateId> {
        self.predicates_by_name.get(name).copied()
    }

    /// All declared predicates in registration order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// All declared rules in registration order.
    pub fn rules(&self) -> &[RuleTemplate] {
        &self.rules
    }

    /// Looks up a rule by id.
    pub fn rule(&self, id: RuleId) -> Option<&RuleTemplate> {
        self.rules.get(id.index())
    }
}
