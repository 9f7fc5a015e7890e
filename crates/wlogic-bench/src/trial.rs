// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Trial runner: one define → generate → infer cycle, timed.
//!
//! Every handle a trial opens (store, query database, inference) is closed on
//! every exit path before the trial returns, including when inference fails.
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, instrument};
use wlogic_core::{Backend, DataStore, InferenceConfig, Model, MpeInference};

use crate::dataset::{generate, StoreSink, OBSERVATION_PARTITION, TARGET_PARTITION};
use crate::error::BenchError;
use crate::model::{define_model, ClosureModel};
use crate::sweep::TrialExecutor;

/// Millisecond clock. Readings need not be monotonic.
pub trait Clock {
    /// Current reading in milliseconds.
    fn now_millis(&mut self) -> i64;
}

/// [`Clock`] backed by [`Instant`], counting from construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Starts a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&mut self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

/// `end − start`, or zero if the clock went backwards.
pub fn elapsed_millis(start: i64, end: i64) -> u64 {
    u64::try_from(i128::from(end) - i128::from(start)).unwrap_or(0)
}

/// Heap counters at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapSample {
    /// Bytes ever obtained from the allocator.
    pub total: u64,
    /// Bytes ever returned to the allocator.
    pub free: u64,
}

impl HeapSample {
    /// Live heap bytes (`total − free`), clamped to zero.
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }
}

/// Source of heap usage samples.
pub trait HeapProbe {
    /// Samples the process heap.
    fn sample(&self) -> HeapSample;
}

/// Probe for builds without heap tracking; always reads zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHeapProbe;

impl HeapProbe for NoHeapProbe {
    fn sample(&self) -> HeapSample {
        HeapSample::default()
    }
}

/// Measurement of one trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialResult {
    /// Wall-clock inference time.
    pub elapsed_millis: u64,
    /// Heap in use right after inference, when tracked.
    pub memory_bytes: Option<u64>,
}

impl TrialResult {
    /// Time-only result.
    pub fn timed(elapsed_millis: u64) -> Self {
        Self {
            elapsed_millis,
            memory_bytes: None,
        }
    }
}

/// Runs inference over an already populated store and measures it.
///
/// Opens the query database over the target partition with `Similar` closed
/// and the observation partition as evidence, solves, samples the heap (when
/// `heap` is given) before anything is released, then closes the inference
/// handle and the database.
///
/// # Errors
/// Store or inference failures; handles are closed either way.
pub fn measure_inference(
    store: &mut DataStore,
    model: &Model,
    closure: &ClosureModel,
    config: InferenceConfig,
    clock: &mut impl Clock,
    heap: Option<&dyn HeapProbe>,
) -> Result<TrialResult, BenchError> {
    let observations = store.partition(OBSERVATION_PARTITION)?;
    let targets = store.partition(TARGET_PARTITION)?;
    let mut db = store.open_database(targets, &[closure.similar], &[observations])?;

    let outcome = (|| -> Result<TrialResult, BenchError> {
        let start = clock.now_millis();
        let mut inference = MpeInference::new(model, &mut db, config)?;
        let solved = inference.run();
        let end = clock.now_millis();
        let memory_bytes = heap.map(|probe| probe.sample().used());
        inference.close();
        let report = solved?;
        debug!(
            ground_rules = report.ground_rules(),
            iterations = report.iterations,
            converged = report.converged,
            "inference finished"
        );
        Ok(TrialResult {
            elapsed_millis: elapsed_millis(start, end),
            memory_bytes,
        })
    })();

    db.close();
    outcome
}

/// Fixed parameters of every trial in a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSettings {
    /// Store backend.
    pub backend: Backend,
    /// Entity count.
    pub users: u32,
    /// Dataset seed, reapplied at the start of every trial.
    pub seed: u64,
    /// Directory for the disk backend.
    pub store_dir: PathBuf,
    /// Solver settings.
    pub inference: InferenceConfig,
}

/// Full trial executor: fresh model, fresh truncated store, generated dataset,
/// measured inference.
#[derive(Debug)]
pub struct InferenceTrial<C, H> {
    settings: TrialSettings,
    clock: C,
    heap: Option<H>,
}

impl<C: Clock, H: HeapProbe> InferenceTrial<C, H> {
    /// Builds an executor. Memory is sampled only when `heap` is `Some`.
    pub fn new(settings: TrialSettings, clock: C, heap: Option<H>) -> Self {
        Self {
            settings,
            clock,
            heap,
        }
    }

    /// Settings shared by every trial.
    pub fn settings(&self) -> &TrialSettings {
        &self.settings
    }
}

impl<C: Clock, H: HeapProbe> TrialExecutor for InferenceTrial<C, H> {
    #[instrument(level = "debug", skip(self), fields(backend = %self.settings.backend, users = self.settings.users))]
    fn run_trial(&mut self, index: u32) -> Result<TrialResult, BenchError> {
        let settings = &self.settings;
        let mut model = Model::new();
        let closure = define_model(&mut model)?;
        let mut store = DataStore::open(settings.backend, &settings.store_dir, true)?;

        let outcome = (|| -> Result<TrialResult, BenchError> {
            let mut sink = StoreSink::new(&mut store, &closure)?;
            generate(settings.users, settings.seed, &mut sink)?;
            let heap = self.heap.as_ref().map(|h| h as &dyn HeapProbe);
            measure_inference(
                &mut store,
                &model,
                &closure,
                settings.inference,
                &mut self.clock,
                heap,
            )
        })();

        let closed = store.close();
        let result = outcome?;
        closed?;
        debug!(
            index,
            elapsed_millis = result.elapsed_millis,
            memory_bytes = result.memory_bytes,
            "trial complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct ScriptedClock(Vec<i64>);

    impl Clock for ScriptedClock {
        fn now_millis(&mut self) -> i64 {
            self.0.remove(0)
        }
    }

    struct FixedHeap(HeapSample);

    impl HeapProbe for FixedHeap {
        fn sample(&self) -> HeapSample {
            self.0
        }
    }

    struct CountingHeap(Cell<u32>);

    impl HeapProbe for CountingHeap {
        fn sample(&self) -> HeapSample {
            self.0.set(self.0.get() + 1);
            HeapSample {
                total: 10,
                free: 4,
            }
        }
    }

    fn settings(users: u32) -> TrialSettings {
        TrialSettings {
            backend: Backend::Memory,
            users,
            seed: crate::DEFAULT_SEED,
            store_dir: PathBuf::from("."),
            inference: InferenceConfig::default(),
        }
    }

    #[test]
    fn backwards_clock_clamps_to_zero() {
        assert_eq!(elapsed_millis(100, 40), 0);
        assert_eq!(elapsed_millis(40, 100), 60);
        assert_eq!(elapsed_millis(i64::MAX, i64::MIN), 0);
        assert_eq!(elapsed_millis(i64::MIN, i64::MAX), u64::MAX);
    }

    #[test]
    fn heap_usage_clamps_to_zero() {
        assert_eq!(HeapSample { total: 5, free: 9 }.used(), 0);
        assert_eq!(HeapSample { total: 9, free: 5 }.used(), 4);
    }

    #[test]
    fn trial_reports_clamped_elapsed_time() {
        let mut trial = InferenceTrial::new(settings(3), ScriptedClock(vec![50, 20]), None::<NoHeapProbe>);
        assert_eq!(trial.settings(), &settings(3));
        let result = trial.run_trial(0).unwrap();
        assert_eq!(result, TrialResult::timed(0));
    }

    #[test]
    fn trial_samples_heap_once_when_tracking() {
        let probe = CountingHeap(Cell::new(0));
        let mut trial = InferenceTrial::new(settings(3), ScriptedClock(vec![1, 8]), Some(probe));
        let result = trial.run_trial(0).unwrap();
        assert_eq!(result.elapsed_millis, 7);
        assert_eq!(result.memory_bytes, Some(6));
        assert_eq!(trial.heap.as_ref().map(|h| h.0.get()), Some(1));
    }

    #[test]
    fn negative_heap_delta_reports_zero() {
        let probe = FixedHeap(HeapSample { total: 1, free: 2 });
        let mut trial = InferenceTrial::new(settings(2), ScriptedClock(vec![0, 0]), Some(probe));
        assert_eq!(trial.run_trial(0).unwrap().memory_bytes, Some(0));
    }

    #[test]
    fn zero_users_fails_before_inference() {
        let mut trial = InferenceTrial::new(settings(0), ScriptedClock(vec![]), None::<NoHeapProbe>);
        let err = trial.run_trial(0).unwrap_err();
        assert!(matches!(err, BenchError::GenerationPrecondition(0)));
    }
}
