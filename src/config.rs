//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SimError;
use crate::sim::types::TimeGrid;

/// Top-level scenario configuration parsed from TOML.
///
/// Every section has defaults matching the `demo` scenario except `tasks`,
/// which must be given explicitly. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use one of the built-in presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario name, seed and time grid.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Photovoltaic array parameters.
    #[serde(default)]
    pub pv: PvConfig,
    /// Time-of-use tariff.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Site baseline load (everything on the microgrid except the robot).
    #[serde(default)]
    pub site: SiteConfig,
    /// Microgrid battery.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Robot onboard battery, charger and energy model.
    #[serde(default)]
    pub robot: RobotConfig,
    /// Thresholds for the charging policies.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Mission task list, executed in release-time order.
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// Scenario identity and time grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Scenario name, used in reports.
    pub name: String,
    /// Seed recorded with the generated profiles.
    pub seed: u64,
    /// Simulated horizon in hours.
    pub horizon_h: f64,
    /// Step size in hours; the horizon must be a whole number of steps.
    pub dt_h: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "demo".to_string(),
            seed: 7,
            horizon_h: 24.0,
            dt_h: 0.25,
        }
    }
}

/// Photovoltaic array parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvConfig {
    /// Nameplate rating (kW).
    pub rated_kw: f64,
    /// Derate factor applied to the nameplate (0.0–1.0).
    pub derate: f64,
    /// Hour of day generation starts.
    pub sunrise_h: f64,
    /// Hour of day generation ends.
    pub sunset_h: f64,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            rated_kw: 30.0,
            derate: 0.95,
            sunrise_h: 7.0,
            sunset_h: 18.5,
        }
    }
}

/// Three-tier time-of-use tariff. Windows are hours of day, `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Price outside the mid and peak windows ($/kWh).
    pub off_peak: f64,
    /// Shoulder price ($/kWh).
    pub mid: f64,
    /// Peak price ($/kWh).
    pub peak: f64,
    pub mid_start_h: f64,
    pub mid_end_h: f64,
    pub peak_start_h: f64,
    pub peak_end_h: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            off_peak: 0.14,
            mid: 0.20,
            peak: 0.30,
            mid_start_h: 7.0,
            mid_end_h: 16.0,
            peak_start_h: 16.0,
            peak_end_h: 21.0,
        }
    }
}

/// Sinusoidal site baseline load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Mean consumption (kW).
    pub base_kw: f64,
    /// Daily swing amplitude (kW).
    pub amp_kw: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_kw: 0.0,
            amp_kw: 0.0,
            phase_rad: 0.0,
        }
    }
}

/// Microgrid battery parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Total energy capacity (kWh).
    pub capacity_kwh: f64,
    /// Initial state of charge (fraction of capacity).
    pub initial_soc: f64,
    /// Lowest allowed state of charge.
    pub soc_min: f64,
    /// Highest allowed state of charge.
    pub soc_max: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
    /// Charge efficiency (0.0–1.0).
    pub eta_charge: f64,
    /// Discharge efficiency (0.0–1.0).
    pub eta_discharge: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 60.0,
            initial_soc: 0.5,
            soc_min: 0.1,
            soc_max: 0.95,
            max_charge_kw: 25.0,
            max_discharge_kw: 25.0,
            eta_charge: 0.95,
            eta_discharge: 0.95,
        }
    }
}

/// Robot onboard battery, dock charger and travel energy model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotConfig {
    /// Onboard battery capacity (kWh).
    pub capacity_kwh: f64,
    /// Initial state of charge (fraction).
    pub initial_soc: f64,
    /// Reserve the robot never drains below (fraction).
    pub soc_min: f64,
    /// Rated dock charging power drawn from the microgrid (kW).
    pub charge_power_kw: f64,
    /// Fraction of drawn energy that ends up stored.
    pub charge_eff: f64,
    /// Travel energy (Wh per metre) for tasks given by distance.
    pub wh_per_meter: f64,
    /// Fixed energy added to every distance-based task (kWh).
    pub task_overhead_kwh: f64,
    /// When `true`, task execution draw is also served by the microgrid.
    pub site_powers_tasks: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 2.0,
            initial_soc: 0.8,
            soc_min: 0.15,
            charge_power_kw: 0.6,
            charge_eff: 0.9,
            wh_per_meter: 0.5,
            task_overhead_kwh: 0.02,
            site_powers_tasks: false,
        }
    }
}

/// Charging policy thresholds (fractions of robot capacity unless noted).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Baseline starts charging below this SOC; energy-aware restores it after the last task.
    pub soc_low: f64,
    /// Baseline stops charging at this SOC.
    pub soc_high: f64,
    /// Energy-aware opportunistic top-up target.
    pub soc_target: f64,
    /// Weight of PV availability against price in the energy-aware score.
    pub pv_weight: f64,
    /// Normalised PV level above which energy-aware tops up opportunistically.
    pub pv_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            soc_low: 0.3,
            soc_high: 0.8,
            soc_target: 0.85,
            pv_weight: 0.7,
            pv_threshold: 0.5,
        }
    }
}

/// One mission task. Exactly one of `distance_m` or `energy_kwh` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub id: String,
    /// Earliest start, hours from the start of the horizon.
    #[serde(default)]
    pub release_h: f64,
    /// Latest completion, hours from the start of the horizon.
    pub deadline_h: f64,
    /// Time on task (hours).
    #[serde(default = "default_task_duration_h")]
    pub duration_h: f64,
    /// Travel distance, converted with the robot energy model.
    #[serde(default)]
    pub distance_m: Option<f64>,
    /// Explicit energy requirement (kWh).
    #[serde(default)]
    pub energy_kwh: Option<f64>,
}

fn default_task_duration_h() -> f64 {
    0.1
}

impl TaskConfig {
    fn by_distance(id: &str, distance_m: f64, release_h: f64, deadline_h: f64, duration_h: f64) -> Self {
        Self {
            id: id.to_string(),
            release_h,
            deadline_h,
            duration_h,
            distance_m: Some(distance_m),
            energy_kwh: None,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.dt_h"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "peak_mission"];

    /// Returns the demo scenario: a large microgrid with a light morning mission.
    pub fn demo() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            pv: PvConfig::default(),
            tariff: TariffConfig::default(),
            site: SiteConfig {
                base_kw: 4.0,
                amp_kw: 2.0,
                phase_rad: -3.4,
            },
            battery: BatteryConfig::default(),
            robot: RobotConfig::default(),
            policy: PolicyConfig::default(),
            tasks: vec![
                TaskConfig::by_distance("inspect_A", 220.0, 0.0, 6.0, 0.25),
                TaskConfig::by_distance("inspect_B", 480.0, 0.0, 10.0, 0.35),
                TaskConfig::by_distance("thermal_scan_C", 650.0, 0.0, 14.0, 0.40),
                TaskConfig::by_distance("return_base", 500.0, 0.0, 20.0, 0.20),
            ],
        }
    }

    /// Returns the peak-mission preset.
    ///
    /// A small microgrid and a depleted robot, with tasks released late in
    /// the afternoon so that naive charging lands in the peak price window.
    pub fn peak_mission() -> Self {
        let distance_scale = 2.0;
        Self {
            simulation: SimulationConfig {
                name: "peak_mission".to_string(),
                ..SimulationConfig::default()
            },
            pv: PvConfig {
                rated_kw: 2.5,
                ..PvConfig::default()
            },
            tariff: TariffConfig::default(),
            site: SiteConfig::default(),
            battery: BatteryConfig {
                capacity_kwh: 3.5,
                initial_soc: 0.25,
                soc_min: 0.10,
                soc_max: 0.95,
                max_charge_kw: 1.2,
                max_discharge_kw: 1.2,
                ..BatteryConfig::default()
            },
            robot: RobotConfig {
                capacity_kwh: 3.0,
                initial_soc: 0.20,
                soc_min: 0.15,
                charge_power_kw: 1.5,
                ..RobotConfig::default()
            },
            policy: PolicyConfig::default(),
            tasks: vec![
                TaskConfig::by_distance("inspect_A", 1200.0 * distance_scale, 14.5, 16.5, 0.40),
                TaskConfig::by_distance("inspect_B", 1600.0 * distance_scale, 16.1, 18.6, 0.55),
                TaskConfig::by_distance("return_base", 900.0 * distance_scale, 18.2, 20.0, 0.25),
            ],
        }
    }

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "peak_mission" => Ok(Self::peak_mission()),
            _ => Err(ConfigError::new(
                "scenario",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Resolves a `--scenario` argument: a `.toml` path or a preset name.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be loaded or the preset is unknown.
    pub fn load(name_or_path: &str) -> Result<Self, ConfigError> {
        let path = Path::new(name_or_path);
        if path.extension().is_some_and(|ext| ext == "toml") || path.is_file() {
            Self::from_toml_file(path)
        } else {
            Self::from_preset(name_or_path)
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates the scenario, turning any field errors into a [`SimError`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] listing every invalid field.
    pub fn validated(self) -> Result<Self, SimError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(SimError::Configuration(errors))
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. Task windows that
    /// are too short are not configuration errors; the planner reports them
    /// as infeasible schedules.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError::new(field, message));
            }
        };

        let s = &self.simulation;
        check(
            is_plain_name(&s.name),
            "simulation.name",
            "must be a non-empty name without path separators or `..`",
        );
        check(s.dt_h.is_finite() && s.dt_h > 0.0, "simulation.dt_h", "must be > 0");
        check(
            s.horizon_h.is_finite() && s.horizon_h > 0.0,
            "simulation.horizon_h",
            "must be > 0",
        );

        let pv = &self.pv;
        check(pv.rated_kw >= 0.0, "pv.rated_kw", "must be >= 0");
        check(pv.derate > 0.0 && pv.derate <= 1.0, "pv.derate", "must be in (0.0, 1.0]");
        check(
            (0.0..=24.0).contains(&pv.sunrise_h) && (0.0..=24.0).contains(&pv.sunset_h),
            "pv.sunrise_h",
            "sunrise and sunset must be hours of day in [0, 24]",
        );
        check(pv.sunrise_h < pv.sunset_h, "pv.sunrise_h", "must be < pv.sunset_h");

        let t = &self.tariff;
        check(
            t.off_peak >= 0.0 && t.mid >= 0.0 && t.peak >= 0.0,
            "tariff",
            "prices must be >= 0",
        );
        check(t.mid_start_h < t.mid_end_h, "tariff.mid_start_h", "must be < tariff.mid_end_h");
        check(
            t.peak_start_h < t.peak_end_h,
            "tariff.peak_start_h",
            "must be < tariff.peak_end_h",
        );

        let site = &self.site;
        check(site.base_kw >= 0.0, "site.base_kw", "must be >= 0");
        check(site.amp_kw >= 0.0, "site.amp_kw", "must be >= 0");

        let bat = &self.battery;
        check(bat.capacity_kwh > 0.0, "battery.capacity_kwh", "must be > 0");
        check(
            0.0 <= bat.soc_min && bat.soc_min < bat.soc_max && bat.soc_max <= 1.0,
            "battery.soc_min",
            "must satisfy 0.0 <= soc_min < soc_max <= 1.0",
        );
        check(
            (bat.soc_min..=bat.soc_max).contains(&bat.initial_soc),
            "battery.initial_soc",
            "must be within [battery.soc_min, battery.soc_max]",
        );
        check(
            bat.max_charge_kw >= 0.0 && bat.max_discharge_kw >= 0.0,
            "battery.max_charge_kw",
            "power limits must be >= 0",
        );
        check(
            bat.eta_charge > 0.0 && bat.eta_charge <= 1.0,
            "battery.eta_charge",
            "must be in (0.0, 1.0]",
        );
        check(
            bat.eta_discharge > 0.0 && bat.eta_discharge <= 1.0,
            "battery.eta_discharge",
            "must be in (0.0, 1.0]",
        );

        let robot = &self.robot;
        check(robot.capacity_kwh > 0.0, "robot.capacity_kwh", "must be > 0");
        check(
            (0.0..1.0).contains(&robot.soc_min),
            "robot.soc_min",
            "must be in [0.0, 1.0)",
        );
        check(
            (0.0..=1.0).contains(&robot.initial_soc),
            "robot.initial_soc",
            "must be in [0.0, 1.0]",
        );
        check(robot.charge_power_kw > 0.0, "robot.charge_power_kw", "must be > 0");
        check(
            robot.charge_eff > 0.0 && robot.charge_eff <= 1.0,
            "robot.charge_eff",
            "must be in (0.0, 1.0]",
        );
        check(
            robot.wh_per_meter >= 0.0 && robot.task_overhead_kwh >= 0.0,
            "robot.wh_per_meter",
            "energy model coefficients must be >= 0",
        );

        let p = &self.policy;
        check(
            0.0 <= p.soc_low && p.soc_low <= p.soc_high && p.soc_high <= 1.0,
            "policy.soc_low",
            "must satisfy 0.0 <= soc_low <= soc_high <= 1.0",
        );
        check(
            p.soc_target > 0.0 && p.soc_target <= 1.0,
            "policy.soc_target",
            "must be in (0.0, 1.0]",
        );
        check(p.pv_weight >= 0.0, "policy.pv_weight", "must be >= 0");
        check(
            (0.0..=1.0).contains(&p.pv_threshold),
            "policy.pv_threshold",
            "must be in [0.0, 1.0]",
        );

        if let Err(e) = TimeGrid::new(s.horizon_h, s.dt_h) {
            if s.dt_h > 0.0 && s.horizon_h > 0.0 {
                errors.push(e);
            }
        }

        self.validate_tasks(&mut errors);
        errors
    }

    fn validate_tasks(&self, errors: &mut Vec<ConfigError>) {
        if self.tasks.is_empty() {
            errors.push(ConfigError::new("tasks", "at least one task is required"));
            return;
        }

        let mut seen = HashSet::new();
        for (i, task) in self.tasks.iter().enumerate() {
            let field = |name: &str| format!("tasks[{i}].{name}");
            if task.id.is_empty() {
                errors.push(ConfigError::new(field("id"), "must not be empty"));
            } else if !seen.insert(task.id.as_str()) {
                errors.push(ConfigError::new(
                    field("id"),
                    format!("duplicate task id \"{}\"", task.id),
                ));
            }
            if !(task.duration_h.is_finite() && task.duration_h > 0.0) {
                errors.push(ConfigError::new(field("duration_h"), "must be > 0"));
            }
            if !(task.release_h.is_finite() && task.release_h >= 0.0) {
                errors.push(ConfigError::new(field("release_h"), "must be >= 0"));
            }
            if !task.deadline_h.is_finite() {
                errors.push(ConfigError::new(field("deadline_h"), "must be finite"));
            }
            match (task.distance_m, task.energy_kwh) {
                (Some(d), None) if d < 0.0 => {
                    errors.push(ConfigError::new(field("distance_m"), "must be >= 0"));
                }
                (None, Some(e)) if e < 0.0 => {
                    errors.push(ConfigError::new(field("energy_kwh"), "must be >= 0"));
                }
                (Some(_), None) | (None, Some(_)) => {}
                _ => errors.push(ConfigError::new(
                    field("energy_kwh"),
                    "exactly one of distance_m or energy_kwh must be set",
                )),
            }
        }
    }
}

/// A name that stays a single path component when joined onto a directory.
fn is_plain_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\'])
}
