// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transitive-closure inference benchmark.
//!
//! Measures how long weighted-logic MPE inference takes as the number of
//! entities grows, on either store backend. One invocation runs a sweep: a
//! cold-start trial reported on its own, followed by `runs` warm trials folded
//! into total/min/max/mean statistics and printed as a single report line.
//!
//! Every trial is isolated: fresh model, fresh store, freshly generated dataset
//! from the same seed, all released before the next trial starts.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod heap;
pub mod model;
pub mod sweep;
pub mod trial;

pub use cli::{entrypoint, validate, Cli, Invocation, UsageError};
pub use config::{BenchConfig, ConfigError, InferenceSettings};
pub use dataset::{
    expected_fact_count, generate, DatasetStats, FactSink, IdentityFact, RecordingSink,
    SimilarityFact, StoreSink, DEFAULT_SEED,
};
pub use error::BenchError;
pub use heap::{TrackingAllocator, TrackingHeapProbe};
pub use model::{define_model, ground_rule_counts, ClosureModel, GroundRuleCounts};
pub use sweep::{run_sweep, Accumulator, RunSummary, Stats, SweepPhase, SweepPlan, TrialExecutor};
pub use trial::{
    elapsed_millis, measure_inference, Clock, HeapProbe, HeapSample, InferenceTrial,
    MonotonicClock, NoHeapProbe, TrialResult, TrialSettings,
};
