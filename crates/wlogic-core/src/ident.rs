// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types shared by the model, store and grounder.
use core::fmt;

/// Opaque entity identifier (a unique-id argument value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Dense predicate identifier assigned by [`crate::Model::add_predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicateId(pub(crate) u16);

impl PredicateId {
    /// Raw index of this predicate in registration order.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Dense rule identifier assigned by [`crate::Model::add_rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    /// Raw index of this rule in registration order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a named store partition.
///
/// Handles are only meaningful for the [`crate::DataStore`] that issued them;
/// asking the same store for the same name always yields the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition(pub(crate) u16);

impl Partition {
    /// Raw partition number.
    pub fn id(self) -> u16 {
        self.0
    }
}

/// Largest predicate arity supported by the store and grounder.
pub const MAX_ARITY: usize = 4;

/// Fixed-size, copyable key for one ground atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct AtomKey {
    pub(crate) predicate: PredicateId,
    pub(crate) arity: u8,
    pub(crate) args: [EntityId; MAX_ARITY],
}

impl AtomKey {
    /// Returns `None` when `args` exceeds [`MAX_ARITY`].
    pub(crate) fn new(predicate: PredicateId, args: &[EntityId]) -> Option<Self> {
        if args.len() > MAX_ARITY {
            return None;
        }
        let mut packed = [EntityId(0); MAX_ARITY];
        packed[..args.len()].copy_from_slice(args);
        #[allow(clippy::cast_possible_truncation)]
        let arity = args.len() as u8;
        Some(Self {
            predicate,
            arity,
            args: packed,
        })
    }

    pub(crate) fn args(&self) -> &[EntityId] {
        &self.args[..usize::from(self.arity)]
    }
}
