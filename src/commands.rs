//! CLI command handlers.
//!
//! Each handler builds a profiler, runs it, and prints a short report to
//! stdout. Errors carry context through `anyhow`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use opprof::plan::SweepPlanFile;
use opprof::report::{ResultRecord, ResultsLog};
use opprof::workloads::{Workload, WorkloadParams};
use opprof_profiler::{CategoryResult, Profiler, ProfilerConfig};

use crate::cli::Commands;

const MIB: f64 = 1024.0 * 1024.0;

/// Execute a CLI command.
///
/// This is the main command dispatcher that routes to the appropriate handler.
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Sweep { plan, output } => cmd_sweep(&plan, output),
        Commands::Trials {
            workload,
            params,
            trials,
        } => cmd_trials(workload, &params.into(), trials),
        Commands::Sample {
            workload,
            params,
            interval_ms,
        } => cmd_sample(workload, &params.into(), Duration::from_millis(interval_ms)),
    }
}

fn cmd_sweep(plan_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let plan_file = SweepPlanFile::from_file(plan_path)
        .with_context(|| format!("Failed to load plan {}", plan_path.display()))?;
    let plan = plan_file.to_plan().context("Invalid sweep plan")?;
    let profiler = Profiler::new(plan_file.config().context("Invalid sampling interval")?);
    let workload = plan_file.workload;

    info!(
        %workload,
        categories = plan.categories().len(),
        samples = plan.total_samples(),
        "starting sweep"
    );

    let results = profiler
        .run_sweep(&plan, |params| workload.build(params))
        .context("Sweep failed")?;

    println!("{:<12} {:>14} {:>14} {:>8}", "category", "avg wall (s)", "avg peak (MiB)", "samples");
    results.iter().for_each(print_category);

    if let Some(path) = output {
        let log = ResultsLog::new(path);
        let records: Vec<ResultRecord> = results
            .into_iter()
            .map(|result| ResultRecord::new(workload, result))
            .collect();
        log.append_all(&records)
            .with_context(|| format!("Failed to write results to {}", log.path().display()))?;
        info!(path = %log.path().display(), records = records.len(), "results appended");
    }

    Ok(())
}

fn cmd_trials(workload: Workload, params: &WorkloadParams, trials: usize) -> Result<()> {
    let mut op = workload
        .build(params)
        .with_context(|| format!("Invalid parameters for {workload}"))?;
    let stats = Profiler::new(ProfilerConfig::default())
        .run_trials(&mut op, trials)
        .with_context(|| format!("{workload} trials failed"))?;

    println!("{workload} x {} trials", stats.trials);
    println!(
        "  wall: {:.6}s ± {:.6}s",
        stats.wall.mean, stats.wall.std_dev
    );
    println!("  cpu:  {:.6}s ± {:.6}s", stats.cpu.mean, stats.cpu.std_dev);

    if let Some(throughput) = workload
        .bytes_processed(params)
        .and_then(|bytes| stats.throughput_mib_per_sec(bytes))
    {
        println!("  throughput: {throughput:.2} MiB/s");
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn cmd_sample(workload: Workload, params: &WorkloadParams, interval: Duration) -> Result<()> {
    let config = ProfilerConfig::default()
        .with_sampling_interval(interval)
        .context("Invalid sampling interval")?;
    let mut op = workload
        .build(params)
        .with_context(|| format!("Invalid parameters for {workload}"))?;
    let run = Profiler::new(config)
        .sample_resource_usage(&mut op)
        .with_context(|| format!("{workload} run failed"))?;

    println!("{workload}");
    println!("  duration: {:.6}s", run.duration.as_secs_f64());
    println!(
        "  peak resident: {:.2} MiB ({} probes)",
        run.peak_resident_bytes as f64 / MIB,
        run.probes
    );

    Ok(())
}

fn print_category(result: &CategoryResult) {
    println!(
        "{:<12} {:>14.6} {:>14.2} {:>8}",
        result.category.as_str(),
        result.avg_wall_seconds,
        result.avg_peak_resident_bytes / MIB,
        result.samples
    );
}
