//! Post-hoc summary metrics for a dispatched policy run.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::dispatch::DispatchResult;

/// Aggregate metrics for one policy run.
///
/// Computed post-hoc from `Vec<DispatchResult>` so the summary always agrees
/// with the exported time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    /// Total grid import cost ($).
    pub total_cost: f64,
    /// Total grid import energy (kWh).
    pub total_grid_energy_kwh: f64,
    /// Battery energy throughput (kWh, sum of |power| * dt).
    pub battery_throughput_kwh: f64,
    /// Highest grid import (kW).
    pub peak_grid_import_kw: f64,
    /// PV energy curtailed (kWh).
    pub curtailed_energy_kwh: f64,
    /// Energy drawn by the robot charger (kWh).
    pub robot_charge_energy_kwh: f64,
    /// Number of battery limits the dispatcher had to enforce.
    pub constraint_violations: usize,
}

impl SummaryMetrics {
    /// Computes the dispatch-side metrics.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete dispatch results
    /// * `dt_h` - Step duration in hours
    /// * `constraint_violations` - Number of recorded violations
    ///
    /// `robot_charge_energy_kwh` is left at zero; the dispatcher only sees
    /// the combined load. Use [`SummaryMetrics::with_robot_charge`] to fill it.
    pub fn from_results(results: &[DispatchResult], dt_h: f64, constraint_violations: usize) -> Self {
        let mut grid_kwh = 0.0;
        let mut throughput = 0.0;
        let mut peak = 0.0_f64;
        let mut curtailed = 0.0;

        for r in results {
            grid_kwh += r.grid_import_kw * dt_h;
            throughput += r.battery_kw.abs() * dt_h;
            peak = peak.max(r.grid_import_kw);
            curtailed += r.curtailed_kw * dt_h;
        }

        Self {
            total_cost: results.last().map_or(0.0, |r| r.cumulative_cost),
            total_grid_energy_kwh: grid_kwh,
            battery_throughput_kwh: throughput,
            peak_grid_import_kw: peak,
            curtailed_energy_kwh: curtailed,
            robot_charge_energy_kwh: 0.0,
            constraint_violations,
        }
    }

    /// Sets the robot charging energy.
    pub fn with_robot_charge(mut self, kwh: f64) -> Self {
        self.robot_charge_energy_kwh = kwh;
        self
    }
}

impl fmt::Display for SummaryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total cost:            ${:.3}", self.total_cost)?;
        writeln!(f, "Grid energy:           {:.3} kWh", self.total_grid_energy_kwh)?;
        writeln!(f, "Peak grid import:      {:.2} kW", self.peak_grid_import_kw)?;
        writeln!(f, "Battery throughput:    {:.2} kWh", self.battery_throughput_kwh)?;
        writeln!(f, "Curtailed PV:          {:.2} kWh", self.curtailed_energy_kwh)?;
        writeln!(f, "Robot charge energy:   {:.3} kWh", self.robot_charge_energy_kwh)?;
        write!(f, "Constraint violations: {}", self.constraint_violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(battery_kw: f64, grid_import_kw: f64, curtailed_kw: f64, cumulative_cost: f64) -> DispatchResult {
        DispatchResult {
            step: 0,
            t_h: 0.0,
            total_load_kw: 0.0,
            pv_kw: 0.0,
            pv_used_kw: 0.0,
            battery_kw,
            grid_import_kw,
            curtailed_kw,
            soc: 0.5,
            price: 0.2,
            cost_increment: 0.0,
            cumulative_cost,
        }
    }

    #[test]
    fn battery_throughput() {
        // battery powers: [2.0, -3.0, 1.0, -1.0], dt=0.5
        // throughput = (2 + 3 + 1 + 1) * 0.5 = 3.5 kWh
        let results: Vec<DispatchResult> = [2.0, -3.0, 1.0, -1.0]
            .iter()
            .map(|&b| make_result(b, 0.0, 0.0, 0.0))
            .collect();
        let m = SummaryMetrics::from_results(&results, 0.5, 0);
        assert!((m.battery_throughput_kwh - 3.5).abs() < 1e-12);
    }

    #[test]
    fn grid_energy_peak_and_cost() {
        let results = vec![
            make_result(0.0, 1.0, 0.0, 0.2),
            make_result(0.0, 3.0, 0.0, 0.8),
            make_result(0.0, 0.0, 2.0, 0.8),
        ];
        let m = SummaryMetrics::from_results(&results, 1.0, 2);
        assert_eq!(m.total_grid_energy_kwh, 4.0);
        assert_eq!(m.peak_grid_import_kw, 3.0);
        assert_eq!(m.curtailed_energy_kwh, 2.0);
        assert_eq!(m.total_cost, 0.8);
        assert_eq!(m.constraint_violations, 2);
    }

    #[test]
    fn robot_charge_is_attached() {
        let m = SummaryMetrics::from_results(&[], 1.0, 0).with_robot_charge(1.25);
        assert_eq!(m.robot_charge_energy_kwh, 1.25);
        assert_eq!(m.total_cost, 0.0);
    }

    #[test]
    fn display_mentions_cost() {
        let m = SummaryMetrics::from_results(&[make_result(0.0, 1.0, 0.0, 0.2)], 1.0, 0);
        assert!(m.to_string().contains("$0.200"));
    }
}
