// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sweep controller: cold-start isolation and single-pass statistics.
//!
//! Trial 0 is the cold start; it is reported on its own and never enters the
//! aggregates. Trials `1..=runs` are warm and are folded into a value-type
//! [`Accumulator`] threaded through the loop. Trials run strictly one after
//! another.
use std::fmt;

use tracing::info;
use wlogic_core::Backend;

use crate::error::BenchError;
use crate::trial::TrialResult;

const BYTES_PER_MEGABYTE: u64 = 1_048_576;

/// Runs one complete, isolated trial.
pub trait TrialExecutor {
    /// Runs trial `index` (0 = cold start).
    ///
    /// # Errors
    /// Any failure aborts the sweep.
    fn run_trial(&mut self, index: u32) -> Result<TrialResult, BenchError>;
}

impl<F> TrialExecutor for F
where
    F: FnMut(u32) -> Result<TrialResult, BenchError>,
{
    fn run_trial(&mut self, index: u32) -> Result<TrialResult, BenchError> {
        self(index)
    }
}

/// Which part of the sweep a trial belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    /// Trial 0: reported separately, excluded from statistics.
    ColdStart,
    /// Trials `1..=runs`.
    Warm,
}

impl SweepPhase {
    /// Phase of trial `index`.
    pub fn of(index: u32) -> Self {
        if index == 0 {
            Self::ColdStart
        } else {
            Self::Warm
        }
    }
}

/// Running total/min/max of one quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Running {
    total: u64,
    min: u64,
    max: u64,
}

impl Running {
    fn first(sample: u64) -> Self {
        Self {
            total: sample,
            min: sample,
            max: sample,
        }
    }

    fn fold(self, sample: u64) -> Self {
        Self {
            total: self.total.saturating_add(sample),
            min: if sample < self.min { sample } else { self.min },
            max: if sample > self.max { sample } else { self.max },
        }
    }
}

/// Aggregate statistics for one quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Sum over warm trials.
    pub total: u64,
    /// Cold-start value.
    pub cold_start: u64,
    /// Smallest warm value.
    pub min: u64,
    /// Largest warm value.
    pub max: u64,
    /// `total / runs`, truncated.
    pub mean: u64,
}

impl Stats {
    /// Every statistic divided by 1,048,576, truncated.
    pub fn to_megabytes(self) -> Self {
        Self {
            total: self.total / BYTES_PER_MEGABYTE,
            cold_start: self.cold_start / BYTES_PER_MEGABYTE,
            min: self.min / BYTES_PER_MEGABYTE,
            max: self.max / BYTES_PER_MEGABYTE,
            mean: self.mean / BYTES_PER_MEGABYTE,
        }
    }

    fn from_running(running: Running, cold_start: u64, runs: u32) -> Self {
        Self {
            total: running.total,
            cold_start,
            min: running.min,
            max: running.max,
            mean: running.total / u64::from(runs),
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={},cold_start={},min={},max={},mean={}",
            self.total, self.cold_start, self.min, self.max, self.mean
        )
    }
}

/// Fold state carried across trials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accumulator {
    cold_start: Option<TrialResult>,
    time: Option<Running>,
    memory: Option<Running>,
    warm: u32,
}

impl Accumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one trial result in. Missing memory readings count as zero.
    pub fn record(self, phase: SweepPhase, result: TrialResult) -> Self {
        match phase {
            SweepPhase::ColdStart => Self {
                cold_start: Some(result),
                ..self
            },
            SweepPhase::Warm => {
                let memory = result.memory_bytes.unwrap_or(0);
                Self {
                    time: Some(self.time.map_or_else(
                        || Running::first(result.elapsed_millis),
                        |r| r.fold(result.elapsed_millis),
                    )),
                    memory: Some(
                        self.memory
                            .map_or_else(|| Running::first(memory), |r| r.fold(memory)),
                    ),
                    warm: self.warm + 1,
                    ..self
                }
            }
        }
    }

    /// Warm trials folded so far.
    pub fn warm_trials(&self) -> u32 {
        self.warm
    }

    /// Final statistics.
    ///
    /// # Errors
    /// [`BenchError::ArithmeticPrecondition`] if no warm trial was recorded.
    pub fn finish(self, plan: &SweepPlan) -> Result<RunSummary, BenchError> {
        let Some(time) = self.time.filter(|_| self.warm > 0) else {
            return Err(BenchError::ArithmeticPrecondition(self.warm));
        };
        let cold = self.cold_start.unwrap_or_default();
        let memory = if plan.track_memory {
            let running = self.memory.unwrap_or_default();
            Some(Stats::from_running(
                running,
                cold.memory_bytes.unwrap_or(0),
                self.warm,
            ))
        } else {
            None
        };
        Ok(RunSummary {
            users: plan.users,
            backend: plan.backend,
            runs: self.warm,
            time: Stats::from_running(time, cold.elapsed_millis, self.warm),
            memory,
        })
    }
}

/// One sweep configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPlan {
    /// Entity count (reported, not interpreted here).
    pub users: u32,
    /// Store backend (reported, not interpreted here).
    pub backend: Backend,
    /// Warm trial count.
    pub runs: u32,
    /// Whether memory statistics are reported.
    pub track_memory: bool,
}

/// Final report of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Entity count.
    pub users: u32,
    /// Store backend.
    pub backend: Backend,
    /// Warm trial count.
    pub runs: u32,
    /// Elapsed milliseconds.
    pub time: Stats,
    /// Heap bytes, when tracked.
    pub memory: Option<Stats>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "users:{},backend:{},runs:{};time_ms:{}",
            self.users, self.backend, self.runs, self.time
        )?;
        if let Some(memory) = self.memory {
            write!(f, ";memory_mb:{}", memory.to_megabytes())?;
        }
        Ok(())
    }
}

/// Runs the cold start plus `plan.runs` warm trials and summarizes them.
///
/// # Errors
/// [`BenchError::ArithmeticPrecondition`] if `plan.runs < 1` (no trial is run);
/// otherwise the first trial failure, wrapped with its index.
pub fn run_sweep(
    plan: &SweepPlan,
    executor: &mut impl TrialExecutor,
) -> Result<RunSummary, BenchError> {
    if plan.runs < 1 {
        return Err(BenchError::ArithmeticPrecondition(plan.runs));
    }
    info!(users = plan.users, backend = %plan.backend, runs = plan.runs, "sweep starting");

    let acc = (0..=plan.runs).try_fold(Accumulator::new(), |acc, index| {
        let result = executor
            .run_trial(index)
            .map_err(|source| BenchError::Trial {
                trial: index,
                source: Box::new(source),
            })?;
        let phase = SweepPhase::of(index);
        info!(index, ?phase, elapsed_millis = result.elapsed_millis, "trial measured");
        Ok::<_, BenchError>(acc.record(phase, result))
    })?;

    let summary = acc.finish(plan)?;
    info!(
        total = summary.time.total,
        cold_start = summary.time.cold_start,
        mean = summary.time.mean,
        "sweep finished"
    );
    Ok(summary)
}
