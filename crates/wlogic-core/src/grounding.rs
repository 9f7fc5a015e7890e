// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Grounding: instantiate rule templates over the atoms of a database.
//!
//! Each template is grounded by a left-to-right nested-loop join over its body
//! atoms. When an atom's first argument is already bound the join probes the
//! `(predicate, first argument)` index instead of scanning the predicate.
//! Inequality guards prune as soon as both sides are bound.
//!
//! A ground rule is stored in linear form: its Łukasiewicz distance to
//! satisfaction is `max(0, constant + Σ coefficient · x[atom])` over the
//! variable atoms it mentions; evidence is folded into `constant`.
use crate::database::{AtomIdx, Database};
use crate::ident::{EntityId, RuleId, MAX_ARITY};
use crate::model::Model;
use crate::rule::{Atom, LossKind, RuleTemplate};

/// One variable atom in a ground rule's linear form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTerm {
    /// Variable atom.
    pub atom: AtomIdx,
    /// Coefficient applied to its truth value.
    pub coefficient: f64,
}

/// Fully instantiated copy of a rule template.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundRule {
    /// Template this rule was produced from.
    pub rule: RuleId,
    /// Template weight.
    pub weight: f64,
    /// Template loss.
    pub loss: LossKind,
    /// Constant part of the distance to satisfaction.
    pub constant: f64,
    /// Variable part of the distance to satisfaction.
    pub terms: Vec<GroundTerm>,
}

impl GroundRule {
    /// Signed linear form, before the `max(0, ·)` hinge.
    pub fn linear(&self, values: &[f64]) -> f64 {
        self.terms.iter().fold(self.constant, |acc, t| {
            acc + t.coefficient * values[t.atom.slot()]
        })
    }

    /// Distance to satisfaction for the given atom values.
    pub fn distance(&self, values: &[f64]) -> f64 {
        self.linear(values).max(0.0)
    }

    /// Weighted potential for the given atom values.
    pub fn potential(&self, values: &[f64]) -> f64 {
        self.loss.potential(self.weight, self.distance(values))
    }
}

/// Grounds every rule of `model` over `db`, in rule registration order.
pub fn ground_model(model: &Model, db: &Database) -> Vec<GroundRule> {
    let mut out = Vec::new();
    for (i, template) in model.rules().iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let rule = RuleId(i as u32);
        Grounder::new(db, rule, template, &mut out).run();
    }
    out
}

struct Grounder<'a> {
    db: &'a Database,
    rule: RuleId,
    template: &'a RuleTemplate,
    bindings: Vec<Option<EntityId>>,
    chosen: Vec<AtomIdx>,
    out: &'a mut Vec<GroundRule>,
}

impl<'a> Grounder<'a> {
    fn new(
        db: &'a Database,
        rule: RuleId,
        template: &'a RuleTemplate,
        out: &'a mut Vec<GroundRule>,
    ) -> Self {
        Self {
            db,
            rule,
            template,
            bindings: vec![None; template.variable_count()],
            chosen: Vec::with_capacity(template.body.len()),
            out,
        }
    }

    fn run(&mut self) {
        self.join(0);
    }

    fn join(&mut self, depth: usize) {
        let template = self.template;
        let Some(atom) = template.body.get(depth) else {
            self.emit();
            return;
        };
        let db = self.db;
        let candidates = match atom.args.first().and_then(|v| self.bindings[v.slot()]) {
            Some(first) => db.atoms_with_first(atom.predicate, first),
            None => db.atoms_of(atom.predicate),
        };
        for &idx in candidates {
            let mut bound_here = [0usize; MAX_ARITY];
            let mut bound_count = 0;
            let mut unified = true;
            for (var, &entity) in atom.args.iter().zip(db.args_of(idx)) {
                match self.bindings[var.slot()] {
                    Some(existing) if existing != entity => {
                        unified = false;
                        break;
                    }
                    Some(_) => {}
                    None => {
                        self.bindings[var.slot()] = Some(entity);
                        bound_here[bound_count] = var.slot();
                        bound_count += 1;
                    }
                }
            }
            if unified && self.guards_hold() {
                self.chosen.push(idx);
                self.join(depth + 1);
                self.chosen.pop();
            }
            for &slot in &bound_here[..bound_count] {
                self.bindings[slot] = None;
            }
        }
    }

    fn guards_hold(&self) -> bool {
        self.template.distinct.iter().all(|&(a, b)| {
            match (self.bindings[a.slot()], self.bindings[b.slot()]) {
                (Some(x), Some(y)) => x != y,
                _ => true,
            }
        })
    }

    fn emit(&mut self) {
        let db = self.db;
        let template = self.template;
        let body_len = self.chosen.len();
        #[allow(clippy::cast_precision_loss)]
        let mut constant = -(body_len.saturating_sub(1) as f64);
        let mut terms: Vec<GroundTerm> = Vec::with_capacity(body_len + 1);

        for &idx in &self.chosen {
            if db.is_variable(idx) {
                push_term(&mut terms, idx, 1.0);
            } else {
                constant += db.value(idx);
            }
        }
        if let Some(head) = &template.head {
            match self.lookup_bound(head) {
                Some(idx) if db.is_variable(idx) => push_term(&mut terms, idx, -1.0),
                Some(idx) => constant -= db.value(idx),
                None => {}
            }
        }

        self.out.push(GroundRule {
            rule: self.rule,
            weight: template.weight,
            loss: template.loss,
            constant,
            terms,
        });
    }

    fn lookup_bound(&self, atom: &Atom) -> Option<AtomIdx> {
        let mut args = [EntityId(0); MAX_ARITY];
        for (slot, var) in args.iter_mut().zip(&atom.args) {
            *slot = self.bindings[var.slot()]?;
        }
        self.db.lookup(atom.predicate, &args[..atom.args.len()])
    }
}

fn push_term(terms: &mut Vec<GroundTerm>, atom: AtomIdx, coefficient: f64) {
    if let Some(existing) = terms.iter_mut().find(|t| t.atom == atom) {
        existing.coefficient += coefficient;
    } else {
        terms.push(GroundTerm { atom, coefficient });
    }
}
