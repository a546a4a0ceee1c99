//! Scenario comparator: runs every policy on the same profiles and tasks.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ScenarioConfig;
use crate::devices::{Battery, Robot};
use crate::error::SimError;

use super::dispatch::{ConstraintViolation, DispatchResult, dispatch};
use super::kpi::SummaryMetrics;
use super::planner::{MissionPlanner, RobotPlan, TaskExecution};
use super::policy::PolicyKind;
use super::profile::{Profiles, generate};
use super::types::{Task, TimeGrid};

/// One policy's plan, dispatch and metrics.
#[derive(Debug, Clone)]
pub struct PolicyRun {
    pub policy: PolicyKind,
    pub plan: RobotPlan,
    /// Site + robot load handed to the dispatcher (kW).
    pub total_load_kw: Vec<f64>,
    pub results: Vec<DispatchResult>,
    pub violations: Vec<ConstraintViolation>,
    pub summary: SummaryMetrics,
}

/// Outcome of [`compare`]. A policy run that hit an infeasible schedule is
/// kept as its error and the report is partial.
#[derive(Debug)]
pub struct ComparisonReport {
    pub scenario: ScenarioConfig,
    pub grid: TimeGrid,
    pub profiles: Profiles,
    pub baseline: Result<PolicyRun, SimError>,
    pub energy_aware: Result<PolicyRun, SimError>,
}

impl ComparisonReport {
    /// The run for `kind`.
    pub fn run(&self, kind: PolicyKind) -> &Result<PolicyRun, SimError> {
        match kind {
            PolicyKind::Baseline => &self.baseline,
            PolicyKind::EnergyAware => &self.energy_aware,
        }
    }

    /// Runs that completed, baseline first.
    pub fn completed(&self) -> impl Iterator<Item = &PolicyRun> {
        PolicyKind::ALL
            .into_iter()
            .filter_map(|kind| self.run(kind).as_ref().ok())
    }

    /// `true` if any policy run failed.
    pub fn is_partial(&self) -> bool {
        self.baseline.is_err() || self.energy_aware.is_err()
    }

    fn delta(&self, metric: impl Fn(&SummaryMetrics) -> f64) -> Option<f64> {
        match (&self.baseline, &self.energy_aware) {
            (Ok(b), Ok(e)) => Some(metric(&b.summary) - metric(&e.summary)),
            _ => None,
        }
    }

    /// Baseline cost minus energy-aware cost; `None` when partial.
    pub fn cost_saved(&self) -> Option<f64> {
        self.delta(|m| m.total_cost)
    }

    /// Baseline grid energy minus energy-aware grid energy; `None` when partial.
    pub fn grid_energy_saved_kwh(&self) -> Option<f64> {
        self.delta(|m| m.total_grid_energy_kwh)
    }

    /// Serializable digest written as `summary.json`.
    pub fn summary_record(&self) -> SummaryRecord {
        let record = |kind: PolicyKind| match self.run(kind) {
            Ok(run) => PolicyRecord {
                metrics: Some(run.summary.clone()),
                error: None,
                executions: run.plan.executions.clone(),
            },
            Err(e) => PolicyRecord {
                metrics: None,
                error: Some(e.to_string()),
                executions: Vec::new(),
            },
        };
        SummaryRecord {
            scenario: self.scenario.simulation.name.clone(),
            seed: self.profiles.seed,
            horizon_h: self.grid.horizon_h(),
            dt_h: self.grid.dt_h(),
            partial: self.is_partial(),
            baseline: record(PolicyKind::Baseline),
            energy_aware: record(PolicyKind::EnergyAware),
            cost_saved: self.cost_saved(),
            grid_energy_saved_kwh: self.grid_energy_saved_kwh(),
            config: self.scenario.clone(),
        }
    }
}

/// Per-policy section of [`SummaryRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub metrics: Option<SummaryMetrics>,
    pub error: Option<String>,
    #[serde(default)]
    pub executions: Vec<TaskExecution>,
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub scenario: String,
    pub seed: u64,
    pub horizon_h: f64,
    pub dt_h: f64,
    pub partial: bool,
    pub baseline: PolicyRecord,
    pub energy_aware: PolicyRecord,
    pub cost_saved: Option<f64>,
    pub grid_energy_saved_kwh: Option<f64>,
    pub config: ScenarioConfig,
}

impl SummaryRecord {
    pub fn policy(&self, kind: PolicyKind) -> &PolicyRecord {
        match kind {
            PolicyKind::Baseline => &self.baseline,
            PolicyKind::EnergyAware => &self.energy_aware,
        }
    }
}

fn run_policy(
    kind: PolicyKind,
    scenario: &ScenarioConfig,
    planner: &MissionPlanner,
    tasks: &[Task],
    profiles: &Profiles,
    battery: &Battery,
) -> Result<PolicyRun, SimError> {
    let grid = planner.grid();
    let policy = kind.build(&scenario.policy);
    let plan = planner.plan(tasks, profiles, policy.as_ref())?;

    let total_load_kw: Vec<f64> = profiles
        .site_load_kw
        .iter()
        .zip(&plan.grid_load_kw)
        .map(|(site, robot)| site + robot)
        .collect();
    let outcome = dispatch(&total_load_kw, grid, profiles, battery.clone())?;
    let summary = outcome
        .summary
        .with_robot_charge(plan.charge_energy_kwh(grid.dt_h()));

    info!(
        policy = kind.as_str(),
        cost = summary.total_cost,
        grid_kwh = summary.total_grid_energy_kwh,
        peak_kw = summary.peak_grid_import_kw,
        violations = summary.constraint_violations,
        "policy run complete"
    );

    Ok(PolicyRun {
        policy: kind,
        plan,
        total_load_kw,
        results: outcome.results,
        violations: outcome.violations,
        summary,
    })
}

/// Runs the baseline and energy-aware policies on identical profiles and
/// tasks.
///
/// # Errors
///
/// Returns [`SimError::Configuration`] if the scenario is invalid. An
/// infeasible schedule does not fail the comparison; it is stored in the
/// affected policy's slot of the report.
pub fn compare(scenario: &ScenarioConfig) -> Result<ComparisonReport, SimError> {
    let scenario = scenario.clone().validated()?;
    let sim = &scenario.simulation;
    let grid = TimeGrid::new(sim.horizon_h, sim.dt_h)?;
    let profiles = generate(&scenario, &grid, sim.seed)?;
    let robot = Robot::from_config(&scenario.robot)?;
    let battery = Battery::from_config(&scenario.battery)?;
    let tasks: Vec<Task> = scenario.tasks.iter().map(|t| robot.resolve_task(t)).collect();
    let planner = MissionPlanner::new(grid, robot);

    info!(
        scenario = %sim.name,
        seed = sim.seed,
        steps = grid.len(),
        tasks = tasks.len(),
        "comparing policies"
    );

    let run = |kind: PolicyKind| {
        match run_policy(kind, &scenario, &planner, &tasks, &profiles, &battery) {
            Err(e) if e.is_infeasible() => {
                warn!(policy = kind.as_str(), error = %e, "policy run failed");
                Ok(Err(e))
            }
            Err(e) => Err(e),
            Ok(run) => Ok(Ok(run)),
        }
    };
    let baseline = run(PolicyKind::Baseline)?;
    let energy_aware = run(PolicyKind::EnergyAware)?;

    let report = ComparisonReport {
        scenario,
        grid,
        profiles,
        baseline,
        energy_aware,
    };
    match (report.cost_saved(), report.grid_energy_saved_kwh()) {
        (Some(cost), Some(grid_kwh)) => info!(cost_saved = cost, grid_energy_saved_kwh = grid_kwh, "comparison complete"),
        _ => warn!("comparison is partial; deltas are not available"),
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;

    #[test]
    fn demo_runs_both_policies() {
        let report = compare(&ScenarioConfig::demo()).expect("demo is valid");
        assert!(!report.is_partial());
        assert_eq!(report.completed().count(), 2);
        assert!(report.cost_saved().is_some());
        let record = report.summary_record();
        assert_eq!(record.scenario, "demo");
        assert_eq!(record.baseline.executions.len(), 4);
    }

    #[test]
    fn both_runs_share_profiles_and_site_load() {
        let report = compare(&ScenarioConfig::peak_mission()).expect("valid");
        let runs: Vec<&PolicyRun> = report.completed().collect();
        assert_eq!(runs.len(), 2);
        for run in runs {
            for (i, r) in run.results.iter().enumerate() {
                assert_eq!(r.pv_kw, report.profiles.pv_kw[i]);
                assert_eq!(r.price, report.profiles.price[i]);
                assert!(r.total_load_kw >= report.profiles.site_load_kw[i]);
            }
        }
    }

    #[test]
    fn invalid_configuration_aborts() {
        let mut scenario = ScenarioConfig::demo();
        scenario.simulation.dt_h = -1.0;
        let err = compare(&scenario).expect_err("must abort");
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn infeasible_task_gives_partial_report() {
        let mut scenario = ScenarioConfig::demo();
        scenario.tasks.push(TaskConfig {
            id: "impossible".into(),
            release_h: 5.0,
            deadline_h: 5.5,
            duration_h: 1.0,
            distance_m: None,
            energy_kwh: Some(0.1),
        });
        let report = compare(&scenario).expect("config itself is valid");
        assert!(report.is_partial());
        assert!(report.cost_saved().is_none());
        let record = report.summary_record();
        assert!(record.partial);
        assert!(record.baseline.error.as_deref().is_some_and(|e| e.contains("impossible")));
    }
}
