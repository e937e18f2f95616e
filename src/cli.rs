//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use opprof::workloads::{
    DEFAULT_BYTES, DEFAULT_HOLD_MS, DEFAULT_M_COST, DEFAULT_PARALLELISM, DEFAULT_ROUNDS,
    DEFAULT_T_COST, Workload, WorkloadParams,
};
use opprof_profiler::DEFAULT_TRIALS;

/// opprof - parameterized operation profiler
#[derive(Parser, Debug)]
#[command(name = "opprof")]
#[command(version)]
#[command(about = "Time operations, sample their resident memory, and sweep parameter categories")]
#[command(
    long_about = "opprof runs built-in workloads under a trial timer or a background resident-memory sampler, and sweeps categories of parameter tuples from a plan file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep the categories of a plan file
    Sweep {
        /// Plan file (TOML, or JSON with a .json extension)
        #[arg(short, long)]
        plan: PathBuf,

        /// Append results to this JSON-lines file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Time repeated trials of a workload
    Trials {
        /// Workload to run
        #[arg(short, long, value_enum)]
        workload: Workload,

        #[command(flatten)]
        params: ParamArgs,

        /// Number of trials
        #[arg(short = 'n', long, default_value_t = DEFAULT_TRIALS)]
        trials: usize,
    },

    /// Run a workload once under the memory sampler
    Sample {
        /// Workload to run
        #[arg(short, long, value_enum)]
        workload: Workload,

        #[command(flatten)]
        params: ParamArgs,

        /// Sampling interval in milliseconds
        #[arg(short, long, default_value_t = 10)]
        interval_ms: u64,
    },
}

/// Workload parameters
#[derive(Args, Debug, Clone, Copy)]
pub struct ParamArgs {
    /// Buffer size in bytes
    #[arg(long, default_value_t = DEFAULT_BYTES)]
    pub bytes: usize,

    /// Rounds per invocation
    #[arg(long, default_value_t = DEFAULT_ROUNDS)]
    pub rounds: u32,

    /// Hold time in milliseconds (alloc)
    #[arg(long, default_value_t = DEFAULT_HOLD_MS)]
    pub hold_ms: u64,

    /// Passes over memory (argon2)
    #[arg(long, default_value_t = DEFAULT_T_COST)]
    pub t_cost: u32,

    /// Memory in KiB (argon2)
    #[arg(long, default_value_t = DEFAULT_M_COST)]
    pub m_cost: u32,

    /// Lanes (argon2)
    #[arg(long, default_value_t = DEFAULT_PARALLELISM)]
    pub parallelism: u32,
}

impl From<ParamArgs> for WorkloadParams {
    fn from(args: ParamArgs) -> Self {
        Self {
            bytes: args.bytes,
            rounds: args.rounds,
            hold_ms: args.hold_ms,
            t_cost: args.t_cost,
            m_cost: args.m_cost,
            parallelism: args.parallelism,
        }
    }
}
