//! Robot mission planner: turns a task list and a charging policy into
//! per-step robot states and power draw.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::devices::Robot;
use crate::error::SimError;

use super::policy::{ChargeDecision, ChargePolicy, PendingTask, PolicyContext, committed_kwh};
use super::profile::Profiles;
use super::types::{EPS, RobotState, Task, TimeGrid};

/// When a task actually ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecution {
    pub task_id: String,
    pub start_h: f64,
    pub end_h: f64,
    /// First step spent on the task.
    pub start_step: usize,
    /// First step after the task (exclusive).
    pub end_step: usize,
}

/// Per-step robot schedule produced by [`MissionPlanner::plan`].
#[derive(Debug, Clone)]
pub struct RobotPlan {
    /// Name of the policy that produced the plan.
    pub policy: &'static str,
    pub states: Vec<RobotState>,
    /// Electrical draw of the robot (kW): charger input or task consumption.
    pub load_kw: Vec<f64>,
    /// Part of `load_kw` served by the microgrid.
    pub grid_load_kw: Vec<f64>,
    /// Robot state of charge at the end of each step (fraction).
    pub soc: Vec<f64>,
    pub executions: Vec<TaskExecution>,
}

impl RobotPlan {
    /// Energy drawn from the microgrid by the dock charger (kWh).
    pub fn charge_energy_kwh(&self, dt_h: f64) -> f64 {
        self.states
            .iter()
            .zip(&self.load_kw)
            .filter(|(s, _)| s.is_charging())
            .map(|(_, kw)| kw * dt_h)
            .sum()
    }

    /// Number of steps spent charging.
    pub fn charging_steps(&self) -> usize {
        self.states.iter().filter(|s| s.is_charging()).count()
    }
}

/// Schedules tasks one at a time in release order and lets a
/// [`ChargePolicy`] fill the gaps.
///
/// A task starts at the first free step at or after its release once the
/// robot holds its energy plus the reserve. Tasks preempt charging; the
/// policy sees every remaining task so that charge needed by tasks packed
/// too closely together is taken on in time.
#[derive(Debug, Clone)]
pub struct MissionPlanner {
    grid: TimeGrid,
    robot: Robot,
}

impl MissionPlanner {
    pub fn new(grid: TimeGrid, robot: Robot) -> Self {
        Self { grid, robot }
    }

    pub fn grid(&self) -> TimeGrid {
        self.grid
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    /// Checks a task on its own and works out its start window in steps.
    fn pending(&self, task: &Task) -> Result<PendingTask, SimError> {
        if !(task.release_h < task.deadline_h) {
            return Err(SimError::infeasible(
                &task.id,
                format!(
                    "release {:.2} h is not before deadline {:.2} h",
                    task.release_h, task.deadline_h
                ),
            ));
        }
        if task.duration_h > task.deadline_h - task.release_h + EPS {
            return Err(SimError::infeasible(
                &task.id,
                format!(
                    "duration {:.2} h does not fit the window [{:.2}, {:.2}] h",
                    task.duration_h, task.release_h, task.deadline_h
                ),
            ));
        }
        let usable = self.robot.usable_kwh();
        if task.energy_kwh > usable + EPS {
            return Err(SimError::infeasible(
                &task.id,
                format!(
                    "needs {:.3} kWh but only {usable:.3} kWh is usable above the reserve",
                    task.energy_kwh
                ),
            ));
        }

        let release_step = self.grid.step_at_or_after(task.release_h);
        let latest_start_h = (task.deadline_h - task.duration_h)
            .min(self.grid.horizon_h() - task.duration_h);
        match self.grid.step_at_or_before(latest_start_h) {
            Some(latest_start_step) if latest_start_step >= release_step => Ok(PendingTask {
                id: task.id.clone(),
                energy_kwh: task.energy_kwh,
                release_step,
                latest_start_step,
                latest_end_step: self
                    .grid
                    .step_at_or_after(self.grid.time_h(latest_start_step) + task.duration_h)
                    .min(self.grid.len()),
            }),
            _ => Err(SimError::infeasible(
                &task.id,
                format!(
                    "no step boundary in [{:.2}, {latest_start_h:.2}] h to start on",
                    task.release_h
                ),
            )),
        }
    }

    /// Plans the whole horizon under `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InfeasibleSchedule`] if any task is infeasible on
    /// its own, or if the robot cannot start a task by its latest start step.
    pub fn plan(
        &self,
        tasks: &[Task],
        profiles: &Profiles,
        policy: &dyn ChargePolicy,
    ) -> Result<RobotPlan, SimError> {
        let n = self.grid.len();
        let dt = self.grid.dt_h();
        let reserve = self.robot.reserve_kwh();

        let mut ordered: Vec<&Task> = tasks.iter().collect();
        ordered.sort_by(|a, b| a.release_h.total_cmp(&b.release_h));
        let pending = ordered
            .iter()
            .map(|t| self.pending(t))
            .collect::<Result<Vec<_>, _>>()?;
        let mut next = 0;

        let mut battery = self.robot.battery();
        let charge_step_kwh = battery.charge_step_kwh(dt);
        let mut plan = RobotPlan {
            policy: policy.name(),
            states: Vec::with_capacity(n),
            load_kw: Vec::with_capacity(n),
            grid_load_kw: Vec::with_capacity(n),
            soc: Vec::with_capacity(n),
            executions: Vec::with_capacity(pending.len()),
        };

        let mut step = 0;
        let mut was_charging = false;
        while step < n {
            if let Some(&task) = ordered.get(next) {
                let window = &pending[next];
                if step > window.latest_start_step {
                    let committed = committed_kwh(
                        &pending[next..],
                        reserve,
                        charge_step_kwh,
                        battery.capacity_kwh(),
                    )
                    .unwrap_or(reserve);
                    return Err(SimError::infeasible(
                        &task.id,
                        format!(
                            "{} could not hold {:.3} kWh by the latest start at {:.2} h",
                            policy.name(),
                            committed,
                            self.grid.time_h(window.latest_start_step)
                        ),
                    ));
                }
                if step >= window.release_step && battery.soc_kwh - task.energy_kwh >= reserve - EPS {
                    let start_h = self.grid.time_h(step);
                    let end_h = start_h + task.duration_h;
                    let end_step = self.grid.step_at_or_after(end_h).min(n);
                    let power = task.power_kw();
                    for s in step..end_step {
                        let overlap = end_h.min(self.grid.time_h(s + 1)) - start_h.max(self.grid.time_h(s));
                        let kwh = power * overlap.max(0.0);
                        battery.drain(kwh);
                        let kw = kwh / dt;
                        plan.states.push(RobotState::TaskExecuting(task.id.clone()));
                        plan.load_kw.push(kw);
                        plan.grid_load_kw
                            .push(if self.robot.site_powers_tasks { kw } else { 0.0 });
                        plan.soc.push(battery.soc());
                    }
                    debug!(
                        policy = policy.name(),
                        task = %task.id,
                        start_h,
                        end_h,
                        soc = battery.soc(),
                        "task executed"
                    );
                    plan.executions.push(TaskExecution {
                        task_id: task.id.clone(),
                        start_h,
                        end_h,
                        start_step: step,
                        end_step,
                    });
                    next += 1;
                    step = end_step;
                    was_charging = false;
                    continue;
                }
            }

            let ctx = PolicyContext {
                step,
                dt_h: dt,
                profiles,
                soc_kwh: battery.soc_kwh,
                capacity_kwh: battery.capacity_kwh(),
                reserve_kwh: reserve,
                charge_step_kwh,
                was_charging,
                upcoming: &pending[next..],
            };
            let draw = match policy.decide(&ctx) {
                ChargeDecision::Charge { target_kwh } => battery.charge(target_kwh, dt),
                ChargeDecision::Idle => 0.0,
            };
            let charging = draw > 0.0;
            if charging && !was_charging {
                debug!(
                    policy = policy.name(),
                    t_h = self.grid.time_h(step),
                    soc = ctx.soc_kwh / ctx.capacity_kwh,
                    price = profiles.price[step],
                    "charging started"
                );
            }
            plan.states.push(if charging {
                RobotState::Charging
            } else {
                RobotState::Idle
            });
            plan.load_kw.push(draw);
            plan.grid_load_kw.push(draw);
            plan.soc.push(battery.soc());
            was_charging = charging;
            step += 1;
        }

        if let Some(task) = ordered.get(next) {
            return Err(SimError::infeasible(
                &task.id,
                "horizon ended before the task could start",
            ));
        }
        Ok(plan)
    }
}
