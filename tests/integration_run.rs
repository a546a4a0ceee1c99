//! End-to-end: simulate into a run directory, then build the report.

mod common;

use std::fs;

use earp::config::ScenarioConfig;
use earp::io::export::{load_summary, load_timeseries};
use earp::io::plot::PLOT_FILES;
use earp::report::{REPORT_FILE, make_report};
use earp::runner::{LATEST_FILE, SUMMARY_FILE, resolve_latest, simulate, timeseries_file};
use earp::sim::policy::PolicyKind;

#[test]
fn simulate_then_report() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let output = simulate(&ScenarioConfig::peak_mission(), tmp.path()).expect("simulate");

    assert!(output.dir.starts_with(tmp.path()));
    assert!(tmp.path().join(LATEST_FILE).is_file());
    assert_eq!(resolve_latest(tmp.path()).expect("latest"), output.dir);

    for kind in PolicyKind::ALL {
        let rows = load_timeseries(&output.dir.join(timeseries_file(kind))).expect("timeseries");
        assert_eq!(rows.len(), 96);
    }
    let summary = load_summary(&output.dir.join(SUMMARY_FILE)).expect("summary");
    assert_eq!(summary.scenario, "peak_mission");
    assert!(!summary.partial);
    assert!(summary.cost_saved.is_some_and(|c| c > 0.0));

    let report = make_report(&output.dir).expect("report");
    assert!(report.ends_with(REPORT_FILE));
    let markdown = fs::read_to_string(&report).expect("read report");
    assert!(markdown.contains("peak_mission"));
    for plot in PLOT_FILES {
        assert!(output.dir.join(plot).is_file(), "{plot} missing");
        assert!(markdown.contains(plot));
    }
}

#[test]
fn partial_run_still_reports() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let output = simulate(&common::infeasible_scenario(), tmp.path()).expect("simulate");

    for kind in PolicyKind::ALL {
        assert!(!output.dir.join(timeseries_file(kind)).exists());
    }
    let report = make_report(&output.dir).expect("report");
    let markdown = fs::read_to_string(report).expect("read report");
    assert!(markdown.contains("Partial comparison"));
    assert!(markdown.contains("rush_job"));
}

#[test]
fn repeated_runs_get_distinct_directories() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let first = simulate(&ScenarioConfig::demo(), tmp.path()).expect("simulate");
    let second = simulate(&ScenarioConfig::demo(), tmp.path()).expect("simulate");
    assert_ne!(first.dir, second.dir);
    assert_eq!(resolve_latest(tmp.path()).expect("latest"), second.dir);
}

#[test]
fn path_like_scenario_name_is_rejected_before_writing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().join("runs");
    let mut scenario = ScenarioConfig::demo();
    scenario.simulation.name = "../escaped".to_string();

    let err = simulate(&scenario, &root).expect_err("path-like name");
    assert!(err.to_string().contains("simulation.name"), "{err}");
    assert!(!root.exists());
    assert_eq!(fs::read_dir(tmp.path()).expect("read tempdir").count(), 0);
}
