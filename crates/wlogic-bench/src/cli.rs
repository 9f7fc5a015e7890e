// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command-line surface.
//!
//! `wlogic-bench [OPTIONS] <backend> <numUsers> <numRuns>`
//!
//! clap handles the flags; the three positionals are taken verbatim and
//! validated here so each failure maps to its own exit code:
//!
//! | code | condition |
//! |---|---|
//! | 1 | wrong argument count |
//! | 2 | backend not `disk` or `memory` |
//! | 3 | numUsers not an integer |
//! | 4 | numUsers < 1 |
//! | 5 | numRuns not an integer |
//! | 6 | numRuns < 1 |
//! | 7 | benchmark failed after validation |

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wlogic_core::Backend;

use crate::config::BenchConfig;
use crate::heap::TrackingHeapProbe;
use crate::sweep::{run_sweep, RunSummary, SweepPlan};
use crate::trial::{InferenceTrial, MonotonicClock, TrialSettings};

/// Exit code for a benchmark that failed after its arguments validated.
pub const EXIT_BENCH_FAILURE: u8 = 7;

/// Parsed command line.
#[derive(Debug, Parser)]
#[command(
    name = "wlogic-bench",
    version,
    about = "Times weighted-logic MPE inference on a transitive-closure workload",
    allow_negative_numbers = true
)]
pub struct Cli {
    /// Sample heap usage after each inference and report memory statistics.
    #[arg(long)]
    pub track_memory: bool,
    /// JSON config file (seed, store_dir, inference settings).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory for the disk backend's log file.
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,
    /// Dataset seed.
    #[arg(long, value_name = "U64")]
    pub seed: Option<u64>,
    /// `<disk|memory> <numUsers> <numRuns>`
    #[arg(value_name = "ARGS", allow_hyphen_values = true)]
    pub positional: Vec<String>,
}

/// Validated positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    /// Store backend.
    pub backend: Backend,
    /// Entity count, at least 1.
    pub users: u32,
    /// Warm trial count, at least 1.
    pub runs: u32,
}

/// Positional argument validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// Not exactly three positionals.
    #[error("expected 3 arguments <disk|memory> <numUsers> <numRuns>, got {0}")]
    ArgumentCount(usize),
    /// Unrecognized backend literal.
    #[error("backend must be `disk` or `memory`, got `{0}`")]
    Backend(String),
    /// numUsers is not an integer.
    #[error("numUsers must be an integer, got `{0}`")]
    UsersNotInteger(String),
    /// numUsers < 1.
    #[error("numUsers must be at least 1, got {0}")]
    UsersTooSmall(i32),
    /// numRuns is not an integer.
    #[error("numRuns must be an integer, got `{0}`")]
    RunsNotInteger(String),
    /// numRuns < 1.
    #[error("numRuns must be at least 1, got {0}")]
    RunsTooSmall(i32),
}

impl UsageError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ArgumentCount(_) => 1,
            Self::Backend(_) => 2,
            Self::UsersNotInteger(_) => 3,
            Self::UsersTooSmall(_) => 4,
            Self::RunsNotInteger(_) => 5,
            Self::RunsTooSmall(_) => 6,
        }
    }
}

fn positive(
    raw: &str,
    not_integer: fn(String) -> UsageError,
    too_small: fn(i32) -> UsageError,
) -> Result<u32, UsageError> {
    let value: i32 = raw.parse().map_err(|_| not_integer(raw.to_owned()))?;
    if value < 1 {
        return Err(too_small(value));
    }
    Ok(value.unsigned_abs())
}

/// Validates `<backend> <numUsers> <numRuns>`, checking in that order.
pub fn validate(args: &[String]) -> Result<Invocation, UsageError> {
    let [backend, users, runs] = args else {
        return Err(UsageError::ArgumentCount(args.len()));
    };
    let backend =
        Backend::from_name(backend).ok_or_else(|| UsageError::Backend(backend.clone()))?;
    let users = positive(users, UsageError::UsersNotInteger, UsageError::UsersTooSmall)?;
    let runs = positive(runs, UsageError::RunsNotInteger, UsageError::RunsTooSmall)?;
    Ok(Invocation {
        backend,
        users,
        runs,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report_error(message: &dyn std::fmt::Display) {
    let _ = writeln!(std::io::stderr().lock(), "wlogic-bench: {message}");
}

fn run(cli: &Cli, invocation: Invocation) -> Result<RunSummary> {
    let config = match &cli.config {
        Some(path) => BenchConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BenchConfig::default(),
    }
    .with_overrides(cli.seed, cli.store_dir.clone());

    info!(
        backend = %invocation.backend,
        users = invocation.users,
        runs = invocation.runs,
        seed = config.seed,
        track_memory = cli.track_memory,
        "benchmark configured"
    );

    let settings = TrialSettings {
        backend: invocation.backend,
        users: invocation.users,
        seed: config.seed,
        store_dir: config.store_dir,
        inference: config.inference.into(),
    };
    let probe = cli.track_memory.then_some(TrackingHeapProbe);
    let mut trial = InferenceTrial::new(settings, MonotonicClock::new(), probe);
    let plan = SweepPlan {
        users: invocation.users,
        backend: invocation.backend,
        runs: invocation.runs,
        track_memory: cli.track_memory,
    };
    run_sweep(&plan, &mut trial).with_context(|| {
        format!(
            "benchmark failed for backend={} users={} runs={}",
            invocation.backend, invocation.users, invocation.runs
        )
    })
}

/// Process entry point: parse, validate, run one sweep, print the report line.
pub fn entrypoint() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };
    init_tracing();

    let invocation = match validate(&cli.positional) {
        Ok(invocation) => invocation,
        Err(err) => {
            report_error(&err);
            return ExitCode::from(err.exit_code());
        }
    };

    match run(&cli, invocation) {
        Ok(summary) => {
            if writeln!(std::io::stdout().lock(), "{summary}").is_err() {
                return ExitCode::from(EXIT_BENCH_FAILURE);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&format_args!("{err:#}"));
            ExitCode::from(EXIT_BENCH_FAILURE)
        }
    }
}
