//! Core simulation types: time grid, tasks and robot states.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Tolerance used when snapping hours onto step boundaries and comparing energies.
pub const EPS: f64 = 1e-9;

/// Uniform time grid covering the simulated horizon.
///
/// Step `i` covers `[i * dt_h, (i + 1) * dt_h)`. Timestamps are strictly
/// increasing and evenly spaced by construction.
///
/// # Examples
///
/// ```
/// use earp::sim::types::TimeGrid;
///
/// let grid = TimeGrid::new(24.0, 0.25).unwrap();
/// assert_eq!(grid.len(), 96);
/// assert_eq!(grid.time_h(4), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    horizon_h: f64,
    dt_h: f64,
    len: usize,
}

impl TimeGrid {
    /// Creates a grid of `horizon_h / dt_h` steps.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if either value is non-positive or not finite,
    /// or if the horizon is not a whole number of steps.
    pub fn new(horizon_h: f64, dt_h: f64) -> Result<Self, ConfigError> {
        if !(dt_h.is_finite() && dt_h > 0.0) {
            return Err(ConfigError::new("simulation.dt_h", "must be > 0"));
        }
        if !(horizon_h.is_finite() && horizon_h > 0.0) {
            return Err(ConfigError::new("simulation.horizon_h", "must be > 0"));
        }
        let steps = (horizon_h / dt_h).round();
        if steps < 1.0 || (steps * dt_h - horizon_h).abs() > EPS * horizon_h.max(1.0) {
            return Err(ConfigError::new(
                "simulation.horizon_h",
                format!("must be a whole multiple of simulation.dt_h ({dt_h} h)"),
            ));
        }
        Ok(Self {
            horizon_h,
            dt_h,
            len: steps as usize,
        })
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Step size in hours.
    pub fn dt_h(&self) -> f64 {
        self.dt_h
    }

    pub fn horizon_h(&self) -> f64 {
        self.horizon_h
    }

    /// Start time of step `i` in hours.
    pub fn time_h(&self, i: usize) -> f64 {
        i as f64 * self.dt_h
    }

    /// First step whose start is at or after `hours`.
    pub fn step_at_or_after(&self, hours: f64) -> usize {
        (hours / self.dt_h - EPS).ceil().max(0.0) as usize
    }

    /// Last step whose start is at or before `hours`, if any.
    pub fn step_at_or_before(&self, hours: f64) -> Option<usize> {
        let s = (hours / self.dt_h + EPS).floor();
        (s >= 0.0).then_some(s as usize)
    }

    /// Iterates over the step start times.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(|i| self.time_h(i))
    }
}

/// A mission task with its energy requirement resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    /// Earliest start (hours).
    pub release_h: f64,
    /// Latest completion (hours).
    pub deadline_h: f64,
    /// Time on task (hours).
    pub duration_h: f64,
    /// Energy drawn from the robot battery over the task (kWh).
    pub energy_kwh: f64,
}

impl Task {
    /// Average electrical draw while executing (kW).
    pub fn power_kw(&self) -> f64 {
        self.energy_kwh / self.duration_h
    }
}

/// What the robot is doing during one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotState {
    Idle,
    Charging,
    TaskExecuting(String),
}

impl RobotState {
    pub fn is_charging(&self) -> bool {
        matches!(self, Self::Charging)
    }

    /// Task id when executing.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskExecuting(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for RobotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Charging => write!(f, "charge"),
            Self::TaskExecuting(id) => write!(f, "task:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_basic() {
        let grid = TimeGrid::new(24.0, 0.25).expect("valid grid");
        assert_eq!(grid.len(), 96);
        assert_eq!(grid.dt_h(), 0.25);
        assert_eq!(grid.time_h(95), 23.75);
        let times: Vec<f64> = grid.times().collect();
        assert!(times.windows(2).all(|w| (w[1] - w[0] - 0.25).abs() < EPS));
    }

    #[test]
    fn grid_rejects_bad_step() {
        assert!(TimeGrid::new(24.0, 0.0).is_err());
        assert!(TimeGrid::new(24.0, -1.0).is_err());
        assert!(TimeGrid::new(24.0, f64::NAN).is_err());
        assert!(TimeGrid::new(0.0, 1.0).is_err());
    }

    #[test]
    fn grid_rejects_uneven_horizon() {
        let err = TimeGrid::new(24.0, 0.7).expect_err("24 / 0.7 is not whole");
        assert_eq!(err.field, "simulation.horizon_h");
    }

    #[test]
    fn step_snapping() {
        let grid = TimeGrid::new(24.0, 0.25).expect("valid grid");
        assert_eq!(grid.step_at_or_after(16.1), 65);
        assert_eq!(grid.step_at_or_after(16.0), 64);
        assert_eq!(grid.step_at_or_before(18.05), Some(72));
        assert_eq!(grid.step_at_or_before(18.0), Some(72));
        assert_eq!(grid.step_at_or_before(-0.1), None);
    }

    #[test]
    fn robot_state_display() {
        assert_eq!(RobotState::Idle.to_string(), "idle");
        assert_eq!(RobotState::Charging.to_string(), "charge");
        let s = RobotState::TaskExecuting("inspect_A".into());
        assert_eq!(s.to_string(), "task:inspect_A");
        assert_eq!(s.task_id(), Some("inspect_A"));
    }
}
