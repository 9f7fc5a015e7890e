// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! wlogic-core: weighted-logic inference collaborator.
//!
//! Provides the handles a benchmark harness needs to drive one inference run:
//! a [`Model`] of predicates and weighted rule templates, a partitioned
//! [`DataStore`] with volatile and persistent backends, a query [`Database`]
//! over one target partition, and [`MpeInference`] which grounds the model and
//! solves for the most probable explanation under hinge-loss potentials.
//!
//! Every handle has an idempotent `close` and releases on drop.
#![forbid(unsafe_code)]

mod database;
mod grounding;
mod ident;
mod inference;
mod model;
pub mod prng;
mod rule;
mod store;

/// Query view over a target partition plus observed partitions.
pub use database::{AtomIdx, Database};
/// Ground rule representation produced by the grounder.
pub use grounding::{ground_model, GroundRule, GroundTerm};
/// Identifier types for entities, predicates, rules and partitions.
pub use ident::{EntityId, Partition, PredicateId, RuleId, MAX_ARITY};
/// MPE inference handle, configuration and outcome.
pub use inference::{InferenceConfig, InferenceError, InferenceReport, MpeInference};
/// Model handle: predicate and rule registration.
pub use model::{ArgType, Model, ModelError, Predicate};
/// Deterministic PRNG used for reproducible workloads.
pub use prng::Prng;
/// Rule template primitives.
pub use rule::{Atom, LossKind, RuleTemplate, Var};
/// Partitioned fact store.
pub use store::{Backend, DataStore, StoreError, StoredFact};
