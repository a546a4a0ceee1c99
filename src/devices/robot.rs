use crate::config::{ConfigError, RobotConfig, TaskConfig};
use crate::sim::types::{EPS, Task};

/// Static description of the mobile robot: onboard battery size, dock
/// charger and travel energy model.
///
/// # Power Flow Convention (Microgrid)
/// Charging draw is a **positive** load on the microgrid bus.
#[derive(Debug, Clone)]
pub struct Robot {
    /// Onboard battery capacity in kWh.
    pub capacity_kwh: f64,

    /// Initial state of charge (fraction).
    pub initial_soc: f64,

    /// Reserve fraction the robot never drains below.
    pub soc_min: f64,

    /// Rated dock charging power drawn from the bus (kW).
    pub charge_power_kw: f64,

    /// Fraction of drawn energy that ends up stored.
    pub charge_eff: f64,

    /// Travel energy coefficient (Wh per metre).
    pub wh_per_meter: f64,

    /// Fixed energy added to every distance-based task (kWh).
    pub task_overhead_kwh: f64,

    /// Whether task execution draw also lands on the microgrid.
    pub site_powers_tasks: bool,
}

impl Robot {
    /// Builds the robot from its scenario section.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if capacity or charge power is non-positive,
    /// an SOC fraction is outside `[0, 1]`, or the efficiency is outside
    /// `(0, 1]`.
    pub fn from_config(cfg: &RobotConfig) -> Result<Self, ConfigError> {
        if !(cfg.capacity_kwh > 0.0) {
            return Err(ConfigError::new("robot.capacity_kwh", "must be > 0"));
        }
        if !(0.0..1.0).contains(&cfg.soc_min) {
            return Err(ConfigError::new("robot.soc_min", "must be in [0.0, 1.0)"));
        }
        if !(0.0..=1.0).contains(&cfg.initial_soc) {
            return Err(ConfigError::new("robot.initial_soc", "must be in [0.0, 1.0]"));
        }
        if !(cfg.charge_power_kw > 0.0) {
            return Err(ConfigError::new("robot.charge_power_kw", "must be > 0"));
        }
        if !(cfg.charge_eff > 0.0 && cfg.charge_eff <= 1.0) {
            return Err(ConfigError::new("robot.charge_eff", "must be in (0.0, 1.0]"));
        }

        Ok(Self {
            capacity_kwh: cfg.capacity_kwh,
            initial_soc: cfg.initial_soc,
            soc_min: cfg.soc_min,
            charge_power_kw: cfg.charge_power_kw,
            charge_eff: cfg.charge_eff,
            wh_per_meter: cfg.wh_per_meter,
            task_overhead_kwh: cfg.task_overhead_kwh,
            site_powers_tasks: cfg.site_powers_tasks,
        })
    }

    /// Energy needed to travel `distance_m`, including the fixed overhead.
    pub fn travel_energy_kwh(&self, distance_m: f64) -> f64 {
        distance_m * self.wh_per_meter / 1000.0 + self.task_overhead_kwh
    }

    /// Reserve energy the robot must keep (kWh).
    pub fn reserve_kwh(&self) -> f64 {
        self.soc_min * self.capacity_kwh
    }

    /// Energy available for tasks on a full battery (kWh).
    pub fn usable_kwh(&self) -> f64 {
        self.capacity_kwh - self.reserve_kwh()
    }

    /// Resolves a configured task into a [`Task`] with a concrete energy
    /// requirement. Explicit energy wins over distance.
    pub fn resolve_task(&self, cfg: &TaskConfig) -> Task {
        let energy_kwh = match (cfg.energy_kwh, cfg.distance_m) {
            (Some(e), _) => e,
            (None, Some(d)) => self.travel_energy_kwh(d),
            (None, None) => 0.0,
        };
        Task {
            id: cfg.id.clone(),
            release_h: cfg.release_h,
            deadline_h: cfg.deadline_h,
            duration_h: cfg.duration_h,
            energy_kwh,
        }
    }

    /// A fresh onboard battery at the initial SOC.
    pub fn battery(&self) -> OnboardBattery {
        OnboardBattery {
            soc_kwh: self.initial_soc * self.capacity_kwh,
            capacity_kwh: self.capacity_kwh,
            charge_power_kw: self.charge_power_kw,
            charge_eff: self.charge_eff,
        }
    }
}

/// Mutable onboard battery state tracked by the mission planner.
#[derive(Debug, Clone)]
pub struct OnboardBattery {
    /// Stored energy (kWh).
    pub soc_kwh: f64,
    capacity_kwh: f64,
    charge_power_kw: f64,
    charge_eff: f64,
}

impl OnboardBattery {
    /// State of charge as a fraction of capacity.
    pub fn soc(&self) -> f64 {
        self.soc_kwh / self.capacity_kwh
    }

    pub fn capacity_kwh(&self) -> f64 {
        self.capacity_kwh
    }

    /// Energy one full step of charging stores (kWh).
    pub fn charge_step_kwh(&self, dt_h: f64) -> f64 {
        self.charge_power_kw * self.charge_eff * dt_h
    }

    /// Charges towards `target_kwh` for one step and returns the grid-side
    /// draw in kW.
    ///
    /// The stored energy is capped by the rated power, the target and the
    /// capacity; the draw is scaled up by the charge efficiency. Returns
    /// `0.0` when the target is already met.
    pub fn charge(&mut self, target_kwh: f64, dt_h: f64) -> f64 {
        let target_kwh = target_kwh.min(self.capacity_kwh);
        let stored = self
            .charge_step_kwh(dt_h)
            .min(target_kwh - self.soc_kwh)
            .max(0.0);
        if stored <= EPS {
            return 0.0;
        }
        self.soc_kwh += stored;
        stored / (self.charge_eff * dt_h)
    }

    /// Removes `kwh` from the battery.
    pub fn drain(&mut self, kwh: f64) {
        self.soc_kwh = (self.soc_kwh - kwh).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot() -> Robot {
        Robot::from_config(&RobotConfig {
            capacity_kwh: 2.0,
            initial_soc: 0.5,
            soc_min: 0.15,
            charge_power_kw: 1.0,
            charge_eff: 0.9,
            wh_per_meter: 0.5,
            task_overhead_kwh: 0.02,
            site_powers_tasks: false,
        })
        .expect("valid robot")
    }

    #[test]
    fn test_travel_energy() {
        let r = robot();
        assert!((r.travel_energy_kwh(1000.0) - 0.52).abs() < 1e-12);
        assert!((r.travel_energy_kwh(0.0) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_reserve_and_usable() {
        let r = robot();
        assert!((r.reserve_kwh() - 0.3).abs() < 1e-12);
        assert!((r.usable_kwh() - 1.7).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_task_prefers_explicit_energy() {
        let r = robot();
        let mut cfg = TaskConfig {
            id: "t".into(),
            release_h: 1.0,
            deadline_h: 3.0,
            duration_h: 0.5,
            distance_m: Some(400.0),
            energy_kwh: None,
        };
        assert!((r.resolve_task(&cfg).energy_kwh - 0.22).abs() < 1e-12);
        cfg.energy_kwh = Some(0.7);
        assert_eq!(r.resolve_task(&cfg).energy_kwh, 0.7);
    }

    #[test]
    fn test_charge_full_step() {
        let r = robot();
        let mut b = r.battery();
        let draw = b.charge(2.0, 0.25);
        assert!((draw - 1.0).abs() < 1e-12);
        assert!((b.soc_kwh - 1.225).abs() < 1e-12);
    }

    #[test]
    fn test_charge_partial_step_to_target() {
        let r = robot();
        let mut b = r.battery();
        // 0.09 kWh short of target: draw = 0.09 / (0.9 * 0.25) = 0.4 kW
        let draw = b.charge(1.09, 0.25);
        assert!((draw - 0.4).abs() < 1e-9);
        assert!((b.soc_kwh - 1.09).abs() < 1e-12);
    }

    #[test]
    fn test_charge_never_exceeds_capacity() {
        let r = robot();
        let mut b = r.battery();
        for _ in 0..20 {
            b.charge(10.0, 0.25);
        }
        assert!((b.soc_kwh - 2.0).abs() < 1e-12);
        assert_eq!(b.charge(10.0, 0.25), 0.0);
    }

    #[test]
    fn test_drain() {
        let mut b = robot().battery();
        b.drain(0.4);
        assert!((b.soc() - 0.3).abs() < 1e-12);
    }
}
