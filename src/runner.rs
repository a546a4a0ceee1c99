//! Run directories: writing a comparison to disk and finding it again.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::error::SimError;
use crate::io::export::{export_summary, export_timeseries, timeseries_rows};
use crate::sim::compare::{ComparisonReport, compare};
use crate::sim::policy::PolicyKind;

/// Default root for run directories.
pub const DEFAULT_OUTPUT_ROOT: &str = "outputs";
/// Pointer file, inside the output root, naming the most recent run.
pub const LATEST_FILE: &str = "latest";
pub const SUMMARY_FILE: &str = "summary.json";

/// Time-series file name for `policy`.
pub fn timeseries_file(policy: PolicyKind) -> String {
    format!("timeseries_{}.csv", policy.as_str())
}

/// A comparison together with the directory it was written to.
#[derive(Debug)]
pub struct RunOutput {
    pub report: ComparisonReport,
    pub dir: PathBuf,
}

/// Picks a fresh `<root>/<YYYYmmdd_HHMMSS>_<scenario>` directory name,
/// adding a counter if that name is already taken.
pub fn timestamped_run_dir(root: &Path, scenario: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let base = root.join(format!("{stamp}_{scenario}"));
    let mut dir = base.clone();
    let mut n = 2;
    while dir.exists() {
        dir = PathBuf::from(format!("{}_{n}", base.display()));
        n += 1;
    }
    dir
}

/// Writes time series for every completed policy and `summary.json` into `dir`.
///
/// # Errors
///
/// Returns a [`SimError`] if the directory or any file cannot be written.
pub fn write_run(report: &ComparisonReport, dir: &Path) -> Result<(), SimError> {
    fs::create_dir_all(dir)?;
    for run in report.completed() {
        let rows = timeseries_rows(run, &report.profiles);
        export_timeseries(&rows, &dir.join(timeseries_file(run.policy)))?;
    }
    export_summary(&report.summary_record(), &dir.join(SUMMARY_FILE))?;
    Ok(())
}

/// Records `run_dir` as the latest run under `root`.
///
/// # Errors
///
/// Returns a [`SimError`] if the pointer file cannot be written.
pub fn record_latest(root: &Path, run_dir: &Path) -> Result<(), SimError> {
    fs::create_dir_all(root)?;
    fs::write(root.join(LATEST_FILE), format!("{}\n", run_dir.display()))?;
    Ok(())
}

/// Finds the run `report` should use by default: the one named in
/// `<root>/latest`, else the newest run directory under `root`.
///
/// # Errors
///
/// Returns [`SimError::Io`] with `NotFound` if there is no run to use.
pub fn resolve_latest(root: &Path) -> Result<PathBuf, SimError> {
    if let Ok(content) = fs::read_to_string(root.join(LATEST_FILE)) {
        let dir = PathBuf::from(content.trim());
        if dir.join(SUMMARY_FILE).is_file() {
            return Ok(dir);
        }
    }

    let mut runs: Vec<PathBuf> = match fs::read_dir(root) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.join(SUMMARY_FILE).is_file())
            .collect(),
        Err(_) => Vec::new(),
    };
    runs.sort();
    runs.pop().ok_or_else(|| {
        SimError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no runs found under \"{}\"", root.display()),
        ))
    })
}

/// Compares both policies on `scenario` and writes a new run directory under `root`.
///
/// # Errors
///
/// Returns [`SimError::Configuration`] for an invalid scenario, or an I/O
/// error if the run cannot be written. Infeasible schedules produce a
/// partial run, not an error.
pub fn simulate(scenario: &ScenarioConfig, root: &Path) -> Result<RunOutput, SimError> {
    let report = compare(scenario)?;
    let dir = timestamped_run_dir(root, &report.scenario.simulation.name);
    write_run(&report, &dir)?;
    record_latest(root, &dir)?;
    info!(dir = %dir.display(), partial = report.is_partial(), "run saved");
    Ok(RunOutput { report, dir })
}
