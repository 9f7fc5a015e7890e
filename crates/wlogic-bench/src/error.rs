// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Benchmark error type.
use thiserror::Error;
use wlogic_core::{InferenceError, ModelError, StoreError};

/// Errors that abort a sweep.
///
/// Collaborator failures are never retried: a trial is a single measurement.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Dataset generation requested for fewer than one entity.
    #[error("entity count must be at least 1 (got {0})")]
    GenerationPrecondition(u32),
    /// Sweep requested with fewer than one warm trial; the mean is undefined.
    #[error("trial count must be at least 1 (got {0})")]
    ArithmeticPrecondition(u32),
    /// Model definition was rejected by the collaborator.
    #[error("model definition failed: {0}")]
    Model(#[from] ModelError),
    /// Store operation failed.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
    /// Inference failed.
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
    /// A trial failed; carries the trial index (0 is the cold start).
    #[error("trial {trial} failed")]
    Trial {
        /// Failing trial index.
        trial: u32,
        /// Underlying failure.
        #[source]
        source: Box<BenchError>,
    },
}
