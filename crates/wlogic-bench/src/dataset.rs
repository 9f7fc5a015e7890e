// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dataset generator: one observed and one target fact per ordered entity pair.
//!
//! Facts are streamed to a [`FactSink`] one at a time in row-major order
//! (outer loop over the first entity, inner over the second, self-pairs
//! skipped). The PRNG is reseeded on every call, so the same `(users, seed)`
//! always yields the same insertion sequence.
use tracing::debug;
use wlogic_core::{DataStore, EntityId, Partition, PredicateId, Prng, StoreError};

use crate::error::BenchError;
use crate::model::ClosureModel;

/// Seed used when no override is configured.
pub const DEFAULT_SEED: u64 = 42;
/// Partition receiving `Similar` evidence.
pub const OBSERVATION_PARTITION: &str = "observations";
/// Partition receiving `Same` targets.
pub const TARGET_PARTITION: &str = "targets";

/// Observed `Similar(a, b)` with a strength in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityFact {
    /// First entity.
    pub a: EntityId,
    /// Second entity, never equal to `a`.
    pub b: EntityId,
    /// Evidence strength.
    pub strength: f64,
}

/// Target `Same(a, b)`, valueless until inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityFact {
    /// First entity.
    pub a: EntityId,
    /// Second entity, never equal to `a`.
    pub b: EntityId,
}

/// Destination for generated facts.
pub trait FactSink {
    /// Accepts one observed fact.
    ///
    /// # Errors
    /// Whatever the destination reports; generation stops at the first error.
    fn observe(&mut self, fact: SimilarityFact) -> Result<(), BenchError>;

    /// Accepts one target fact.
    ///
    /// # Errors
    /// Whatever the destination reports; generation stops at the first error.
    fn target(&mut self, fact: IdentityFact) -> Result<(), BenchError>;
}

/// Sink writing into a store's observation and target partitions.
#[derive(Debug)]
pub struct StoreSink<'a> {
    store: &'a mut DataStore,
    observations: Partition,
    targets: Partition,
    similar: PredicateId,
    same: PredicateId,
}

impl<'a> StoreSink<'a> {
    /// Resolves the two partitions on `store`.
    ///
    /// # Errors
    /// [`StoreError`] if the store is closed.
    pub fn new(store: &'a mut DataStore, model: &ClosureModel) -> Result<Self, StoreError> {
        let observations = store.partition(OBSERVATION_PARTITION)?;
        let targets = store.partition(TARGET_PARTITION)?;
        Ok(Self {
            store,
            observations,
            targets,
            similar: model.similar,
            same: model.same,
        })
    }
}

impl FactSink for StoreSink<'_> {
    fn observe(&mut self, fact: SimilarityFact) -> Result<(), BenchError> {
        self.store
            .insert_valued(self.observations, self.similar, fact.strength, &[fact.a, fact.b])?;
        Ok(())
    }

    fn target(&mut self, fact: IdentityFact) -> Result<(), BenchError> {
        self.store.insert(self.targets, self.same, &[fact.a, fact.b])?;
        Ok(())
    }
}

/// Sink that keeps every fact in memory, in arrival order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingSink {
    /// Observed facts.
    pub observed: Vec<SimilarityFact>,
    /// Target facts.
    pub targets: Vec<IdentityFact>,
}

impl FactSink for RecordingSink {
    fn observe(&mut self, fact: SimilarityFact) -> Result<(), BenchError> {
        self.observed.push(fact);
        Ok(())
    }

    fn target(&mut self, fact: IdentityFact) -> Result<(), BenchError> {
        self.targets.push(fact);
        Ok(())
    }
}

/// Counts of facts handed to the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetStats {
    /// Observed facts inserted.
    pub observed: u64,
    /// Target facts inserted.
    pub targets: u64,
}

/// Number of facts of each kind for `users` entities: `users·(users−1)`.
pub fn expected_fact_count(users: u32) -> u64 {
    let n = u64::from(users);
    n * n.saturating_sub(1)
}

/// Generates the workload for `users` entities into `sink`.
///
/// # Errors
/// [`BenchError::GenerationPrecondition`] when `users == 0`, before anything is
/// inserted; otherwise the first sink error.
pub fn generate(users: u32, seed: u64, sink: &mut impl FactSink) -> Result<DatasetStats, BenchError> {
    if users < 1 {
        return Err(BenchError::GenerationPrecondition(users));
    }
    let mut prng = Prng::from_seed_u64(seed);
    let mut stats = DatasetStats::default();
    for a in 0..users {
        for b in 0..users {
            if a == b {
                continue;
            }
            let (a, b) = (EntityId(a), EntityId(b));
            sink.observe(SimilarityFact {
                a,
                b,
                strength: prng.next_f64(),
            })?;
            stats.observed += 1;
            sink.target(IdentityFact { a, b })?;
            stats.targets += 1;
        }
    }
    debug!(users, seed, observed = stats.observed, targets = stats.targets, "dataset generated");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_users_inserts_nothing() {
        let mut sink = RecordingSink::default();
        let err = generate(0, DEFAULT_SEED, &mut sink).unwrap_err();
        assert!(matches!(err, BenchError::GenerationPrecondition(0)));
        assert_eq!(sink, RecordingSink::default());
    }

    #[test]
    fn single_user_has_no_pairs() {
        let mut sink = RecordingSink::default();
        let stats = generate(1, DEFAULT_SEED, &mut sink).unwrap();
        assert_eq!(stats, DatasetStats::default());
        assert!(sink.observed.is_empty());
    }

    #[test]
    fn pairs_follow_row_major_order() {
        let mut sink = RecordingSink::default();
        generate(3, DEFAULT_SEED, &mut sink).unwrap();
        let order: Vec<(u32, u32)> = sink.targets.iter().map(|f| (f.a.0, f.b.0)).collect();
        assert_eq!(order, vec![(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)]);
        let observed: Vec<(u32, u32)> = sink.observed.iter().map(|f| (f.a.0, f.b.0)).collect();
        assert_eq!(observed, order);
    }

    #[test]
    fn strengths_come_from_the_seeded_sequence() {
        let mut sink = RecordingSink::default();
        generate(2, DEFAULT_SEED, &mut sink).unwrap();
        let mut prng = Prng::from_seed_u64(DEFAULT_SEED);
        for fact in &sink.observed {
            assert_eq!(fact.strength.to_bits(), prng.next_f64().to_bits());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let mut a = RecordingSink::default();
        let mut b = RecordingSink::default();
        generate(4, 1, &mut a).unwrap();
        generate(4, 2, &mut b).unwrap();
        assert_eq!(a.targets, b.targets);
        assert_ne!(a.observed, b.observed);
    }

    #[test]
    fn expected_count_matches_pairs() {
        assert_eq!(expected_fact_count(0), 0);
        assert_eq!(expected_fact_count(1), 0);
        assert_eq!(expected_fact_count(5), 20);
    }
}
