//! Microgrid dispatcher: allocates PV, battery and grid to the combined
//! site + robot load, step by step.

use serde::Serialize;
use tracing::warn;

use crate::config::ConfigError;
use crate::devices::Battery;
use crate::devices::battery::{Clamp, LimitKind};
use crate::error::SimError;

use super::kpi::SummaryMetrics;
use super::power_balance::balance_error_kw;
use super::profile::Profiles;
use super::types::{EPS, TimeGrid};

/// Allocation and accounting for one dispatched step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub step: usize,
    /// Step start time in hours.
    pub t_h: f64,
    /// Site + robot load served this step (kW).
    pub total_load_kw: f64,
    /// PV available (kW).
    pub pv_kw: f64,
    /// PV consumed by the load (kW).
    pub pv_used_kw: f64,
    /// Battery power (kW): positive = discharge, negative = charge.
    pub battery_kw: f64,
    /// Grid import (kW, non-negative; there is no export).
    pub grid_import_kw: f64,
    /// PV neither used nor stored (kW).
    pub curtailed_kw: f64,
    /// Microgrid battery SOC at the end of the step.
    pub soc: f64,
    /// Grid price this step ($/kWh).
    pub price: f64,
    /// Cost of this step's grid import ($).
    pub cost_increment: f64,
    /// Running cost up to and including this step ($).
    pub cumulative_cost: f64,
}

impl DispatchResult {
    /// Battery output delivered to the load (kW, non-negative).
    pub fn battery_discharge_kw(&self) -> f64 {
        self.battery_kw.max(0.0)
    }

    /// Battery input absorbed from PV surplus (kW, non-negative).
    pub fn battery_charge_kw(&self) -> f64 {
        (-self.battery_kw).max(0.0)
    }
}

/// A battery limit the dispatcher had to enforce. Non-fatal; counted in the
/// run summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConstraintViolation {
    pub step: usize,
    pub t_h: f64,
    pub kind: LimitKind,
    pub requested: f64,
    pub applied: f64,
}

/// Everything a finished dispatch run produced.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub results: Vec<DispatchResult>,
    pub violations: Vec<ConstraintViolation>,
    pub summary: SummaryMetrics,
}

/// Lazy, restartable dispatch over the time grid.
///
/// Each call to [`Iterator::next`] dispatches one step and advances the
/// battery. [`Dispatcher::rewind`] restores the initial battery so the same
/// load can be replayed.
///
/// Per step:
/// 1. PV serves the load first.
/// 2. Remaining load is met by battery discharge, then grid import.
/// 3. PV surplus charges the battery; the rest is curtailed.
/// 4. Grid import is billed at the step price.
#[derive(Debug, Clone)]
pub struct Dispatcher<'a> {
    grid: TimeGrid,
    profiles: &'a Profiles,
    load_kw: &'a [f64],
    initial: Battery,
    battery: Battery,
    step: usize,
    cumulative_cost: f64,
    violations: Vec<ConstraintViolation>,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher for `load_kw` against `profiles`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if the load or profile series do
    /// not cover the grid, or if a load value is negative or not finite.
    pub fn new(
        grid: TimeGrid,
        profiles: &'a Profiles,
        load_kw: &'a [f64],
        battery: Battery,
    ) -> Result<Self, SimError> {
        if load_kw.len() != grid.len() || profiles.len() != grid.len() {
            return Err(ConfigError::new(
                "load",
                format!(
                    "expected {} steps, got {} load and {} profile values",
                    grid.len(),
                    load_kw.len(),
                    profiles.len()
                ),
            )
            .into());
        }
        if let Some(i) = load_kw.iter().position(|kw| !(kw.is_finite() && *kw >= 0.0)) {
            return Err(ConfigError::new(
                "load",
                format!("step {i}: load must be finite and >= 0, got {}", load_kw[i]),
            )
            .into());
        }

        Ok(Self {
            grid,
            profiles,
            load_kw,
            initial: battery.clone(),
            battery,
            step: 0,
            cumulative_cost: 0.0,
            violations: Vec::new(),
        })
    }

    /// Restarts from the first step with the initial battery state.
    pub fn rewind(&mut self) {
        self.battery = self.initial.clone();
        self.step = 0;
        self.cumulative_cost = 0.0;
        self.violations.clear();
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    /// Violations recorded since the last rewind.
    pub fn violations(&self) -> &[ConstraintViolation] {
        &self.violations
    }

    fn record(&mut self, i: usize, clamp: Clamp) {
        let t_h = self.grid.time_h(i);
        warn!(
            step = i,
            t_h,
            kind = ?clamp.kind,
            requested = clamp.requested,
            applied = clamp.applied,
            "battery constraint enforced"
        );
        self.violations.push(ConstraintViolation {
            step: i,
            t_h,
            kind: clamp.kind,
            requested: clamp.requested,
            applied: clamp.applied,
        });
    }

    fn dispatch_step(&mut self, i: usize) -> DispatchResult {
        let dt = self.grid.dt_h();
        let load = self.load_kw[i];
        let pv = self.profiles.pv_kw[i];
        let price = self.profiles.price[i];

        let pv_used = pv.min(load);
        let residual = load - pv_used;
        let surplus = pv - pv_used;

        let requested = if residual > EPS {
            residual.min(self.battery.deliverable_kw(dt))
        } else if surplus > EPS {
            -surplus.min(self.battery.absorbable_kw(dt))
        } else {
            0.0
        };
        let (battery_kw, power_clamp) = self.battery.limit_power(requested);
        if let Some(c) = power_clamp {
            self.record(i, c);
        }
        if let Some(c) = self.battery.integrate(battery_kw, dt) {
            self.record(i, c);
        }

        let grid_import_kw = (residual - battery_kw.max(0.0)).max(0.0);
        let curtailed_kw = (surplus - (-battery_kw).max(0.0)).max(0.0);
        let cost_increment = grid_import_kw * dt * price;
        self.cumulative_cost += cost_increment;

        let result = DispatchResult {
            step: i,
            t_h: self.grid.time_h(i),
            total_load_kw: load,
            pv_kw: pv,
            pv_used_kw: pv_used,
            battery_kw,
            grid_import_kw,
            curtailed_kw,
            soc: self.battery.soc,
            price,
            cost_increment,
            cumulative_cost: self.cumulative_cost,
        };
        debug_assert!(balance_error_kw(&result).abs() <= EPS);
        result
    }

    /// Dispatches every remaining step and summarises the run.
    pub fn run(mut self) -> DispatchOutcome {
        let results: Vec<DispatchResult> = self.by_ref().collect();
        let summary = SummaryMetrics::from_results(&results, self.grid.dt_h(), self.violations.len());
        DispatchOutcome {
            results,
            violations: self.violations,
            summary,
        }
    }
}

impl Iterator for Dispatcher<'_> {
    type Item = DispatchResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.step >= self.grid.len() {
            return None;
        }
        let result = self.dispatch_step(self.step);
        self.step += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.grid.len().saturating_sub(self.step);
        (left, Some(left))
    }
}

/// Dispatches `total_load_kw` over the whole grid.
///
/// # Errors
///
/// See [`Dispatcher::new`].
pub fn dispatch(
    total_load_kw: &[f64],
    grid: TimeGrid,
    profiles: &Profiles,
    battery: Battery,
) -> Result<DispatchOutcome, SimError> {
    Ok(Dispatcher::new(grid, profiles, total_load_kw, battery)?.run())
}
