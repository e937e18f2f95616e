//! Integration tests for plan-driven sweeps.
//!
//! These tests verify that:
//! - A plan file drives a sweep of a built-in workload end to end
//! - Results land in the JSON-lines log in plan order

#![cfg(target_os = "linux")]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

use std::fs;

use opprof::plan::SweepPlanFile;
use opprof::report::{ResultRecord, ResultsLog};
use opprof::workloads::Workload;
use opprof_profiler::Profiler;
use tempfile::TempDir;

const PLAN: &str = r#"
workload = "alloc"
interval_ms = 2

[[category]]
id = "small"
repetitions = 2
params = [{ bytes = 65536, hold_ms = 5 }]

[[category]]
id = "large"
repetitions = 1
params = [{ bytes = 8388608, hold_ms = 20 }, { bytes = 4194304, hold_ms = 20 }]
"#;

/// # GIVEN
/// A TOML plan for the alloc workload with two categories
///
/// # WHEN
/// The plan is swept and the results are logged
///
/// # THEN
/// One record per category is read back, in plan order, with the expected sample counts
#[test]
fn test_plan_file_sweep_to_log() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let plan_path = dir.path().join("plan.toml");
    fs::write(&plan_path, PLAN)?;

    let plan_file = SweepPlanFile::from_file(&plan_path)?;
    let plan = plan_file.to_plan()?;
    let workload = plan_file.workload;

    let results = Profiler::new(plan_file.config()?)
        .run_sweep(&plan, |params| workload.build(params))?;

    let log = ResultsLog::new(dir.path().join("results.jsonl"));
    let records: Vec<ResultRecord> = results
        .into_iter()
        .map(|result| ResultRecord::new(workload, result))
        .collect();
    log.append_all(&records)?;

    let read_back = log.read_records()?;
    assert_eq!(read_back.len(), records.len());

    let summary: Vec<(&str, usize)> = read_back
        .iter()
        .map(|r| (r.result().category.as_str(), r.result().samples))
        .collect();
    assert_eq!(summary, [("small", 2), ("large", 2)]);
    assert!(read_back.iter().all(|r| r.workload() == Workload::Alloc));

    // 8 MiB held for 20ms at a 2ms interval is always observed
    let large = read_back.get(1).map(ResultRecord::result);
    assert!(large.is_some_and(|r| r.avg_peak_resident_bytes >= 4_194_304.0));
    assert!(large.is_some_and(|r| r.avg_wall_seconds >= 0.02));
    Ok(())
}

/// # GIVEN
/// A plan whose only category has no parameter tuples
///
/// # WHEN
/// It is converted to a runnable plan
///
/// # THEN
/// Conversion fails with a configuration error before anything runs
#[test]
fn test_empty_category_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let plan_file = SweepPlanFile::from_toml_str(
        "workload = \"sha256\"\n[[category]]\nid = 1\nparams = []\n",
    )?;

    let err = plan_file.to_plan().err().ok_or("expected an invalid plan")?;
    assert!(err.is_config_error());
    Ok(())
}
