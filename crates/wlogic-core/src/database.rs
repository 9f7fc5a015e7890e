// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query database: the ground atoms visible to one inference run.
use rustc_hash::FxHashMap;

use crate::ident::{AtomKey, EntityId, PredicateId};
use crate::store::StoredFact;

/// Dense index of a ground atom inside one [`Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomIdx(pub u32);

impl AtomIdx {
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Ground atoms split into fixed evidence and inference variables.
///
/// Built by [`crate::DataStore::open_database`]. Values of variables start at
/// zero and are overwritten by [`crate::MpeInference::run`].
#[derive(Debug)]
pub struct Database {
    keys: Vec<AtomKey>,
    values: Vec<f64>,
    variable: Vec<bool>,
    index: FxHashMap<AtomKey, AtomIdx>,
    by_predicate: FxHashMap<PredicateId, Vec<AtomIdx>>,
    by_first_arg: FxHashMap<(PredicateId, EntityId), Vec<AtomIdx>>,
    variables: usize,
    closed: bool,
}

impl Database {
    pub(crate) fn empty() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            variable: Vec::new(),
            index: FxHashMap::default(),
            by_predicate: FxHashMap::default(),
            by_first_arg: FxHashMap::default(),
            variables: 0,
            closed: false,
        }
    }

    /// Evidence: fixed at the stored value, or 1.0 when stored without one.
    pub(crate) fn add_observed(&mut self, fact: &StoredFact) {
        self.push(fact, fact.value.unwrap_or(1.0), false);
    }

    /// Target: free variable starting at 0.
    pub(crate) fn add_variable(&mut self, fact: &StoredFact) {
        self.push(fact, 0.0, true);
    }

    // First insertion wins; observed partitions are loaded before the target.
    fn push(&mut self, fact: &StoredFact, value: f64, is_variable: bool) {
        let Some(key) = AtomKey::new(fact.predicate, &fact.args) else {
            return;
        };
        if self.index.contains_key(&key) {
            return;
        }
        #[allow(clippy::cast_possible_truncation)]
        let idx = AtomIdx(self.keys.len() as u32);
        self.keys.push(key);
        self.values.push(value);
        self.variable.push(is_variable);
        self.index.insert(key, idx);
        self.by_predicate.entry(fact.predicate).or_default().push(idx);
        self.by_first_arg
            .entry((fact.predicate, key.args[0]))
            .or_default()
            .push(idx);
        if is_variable {
            self.variables += 1;
        }
    }

    /// Total number of ground atoms.
    pub fn atom_count(&self) -> usize {
        self.keys.len()
    }

    /// Number of inference variables.
    pub fn variable_count(&self) -> usize {
        self.variables
    }

    /// Finds the atom for `predicate(args…)`.
    pub fn lookup(&self, predicate: PredicateId, args: &[EntityId]) -> Option<AtomIdx> {
        let key = AtomKey::new(predicate, args)?;
        self.index.get(&key).copied()
    }

    /// Current truth value of `predicate(args…)`, if the atom exists.
    pub fn value_of(&self, predicate: PredicateId, args: &[EntityId]) -> Option<f64> {
        self.lookup(predicate, args).map(|idx| self.value(idx))
    }

    /// Current truth value of an atom.
    ///
    /// # Panics
    /// If `idx` was not issued by this database.
    pub fn value(&self, idx: AtomIdx) -> f64 {
        self.values[idx.slot()]
    }

    /// Whether the atom is an inference variable.
    pub fn is_variable(&self, idx: AtomIdx) -> bool {
        self.variable.get(idx.slot()).copied().unwrap_or(false)
    }

    /// Predicate of an atom.
    pub fn predicate_of(&self, idx: AtomIdx) -> PredicateId {
        self.keys[idx.slot()].predicate
    }

    /// Arguments of an atom.
    pub fn args_of(&self, idx: AtomIdx) -> &[EntityId] {
        self.keys[idx.slot()].args()
    }

    /// All atoms of a predicate, in load order.
    pub fn atoms_of(&self, predicate: PredicateId) -> &[AtomIdx] {
        self.by_predicate.get(&predicate).map_or(&[][..], Vec::as_slice)
    }

    /// Atoms of a predicate whose first argument is `first`.
    pub fn atoms_with_first(&self, predicate: PredicateId, first: EntityId) -> &[AtomIdx] {
        self.by_first_arg
            .get(&(predicate, first))
            .map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn set_value(&mut self, idx: AtomIdx, value: f64) {
        self.values[idx.slot()] = value;
    }

    /// Releases all atoms. Repeated calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        *self = Self {
            closed: true,
            ..Self::empty()
        };
    }

    /// Whether [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
