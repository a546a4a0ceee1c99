//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use earp::config::{ScenarioConfig, TaskConfig};
use earp::sim::compare::{ComparisonReport, PolicyRun, compare};

/// Tolerance for floating-point energy accounting.
pub const TOL: f64 = 1e-9;

/// A task with an explicit energy requirement.
pub fn energy_task(id: &str, release_h: f64, deadline_h: f64, duration_h: f64, kwh: f64) -> TaskConfig {
    TaskConfig {
        id: id.to_string(),
        release_h,
        deadline_h,
        duration_h,
        distance_m: None,
        energy_kwh: Some(kwh),
    }
}

/// Peak-mission preset with one extra task whose window is shorter than its duration.
pub fn infeasible_scenario() -> ScenarioConfig {
    let mut scenario = ScenarioConfig::peak_mission();
    scenario.simulation.name = "infeasible".to_string();
    scenario
        .tasks
        .push(energy_task("rush_job", 10.0, 10.2, 0.5, 0.1));
    scenario
}

/// Runs the comparison and panics if the scenario is invalid.
pub fn compare_ok(scenario: &ScenarioConfig) -> ComparisonReport {
    compare(scenario).expect("scenario should be valid")
}

/// Both policy runs, panicking if either failed.
pub fn both_runs(report: &ComparisonReport) -> [&PolicyRun; 2] {
    let baseline = report.baseline.as_ref().expect("baseline should complete");
    let energy_aware = report.energy_aware.as_ref().expect("energy-aware should complete");
    [baseline, energy_aware]
}
