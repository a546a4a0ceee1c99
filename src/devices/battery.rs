use crate::config::{BatteryConfig, ConfigError};
use crate::sim::types::EPS;

/// A stationary microgrid battery.
///
/// `Battery` models a battery with capacity, SOC window, charge/discharge
/// power ratings and efficiencies. It answers how much power it can deliver
/// or absorb in one step and integrates the chosen power into its SOC.
///
/// # Power Convention (Dispatch)
/// - Positive power: discharging (supplying the load)
/// - Negative power: charging (absorbing PV surplus)
#[derive(Debug, Clone)]
pub struct Battery {
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f64,

    /// State of charge as a fraction of capacity.
    pub soc: f64,

    /// Lowest allowed state of charge.
    pub soc_min: f64,

    /// Highest allowed state of charge.
    pub soc_max: f64,

    /// Maximum charge power in kilowatts (positive value).
    pub max_charge_kw: f64,

    /// Maximum discharge power in kilowatts (positive value).
    pub max_discharge_kw: f64,

    /// Charging efficiency (0..1.0).
    pub eta_charge: f64,

    /// Discharging efficiency (0..1.0).
    pub eta_discharge: f64,
}

/// Which physical limit a requested battery operation ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum LimitKind {
    ChargePower,
    DischargePower,
    SocMax,
    SocMin,
}

/// A value the battery had to clamp to stay within its limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamp {
    pub kind: LimitKind,
    /// Value before clamping (kW for power limits, SOC fraction otherwise).
    pub requested: f64,
    /// Value actually applied.
    pub applied: f64,
}

impl Battery {
    /// Builds the battery from its scenario section.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if capacity is non-positive, the SOC window
    /// is empty or does not contain the initial SOC, a power rating is
    /// negative, or an efficiency is outside `(0, 1]`.
    pub fn from_config(cfg: &BatteryConfig) -> Result<Self, ConfigError> {
        if !(cfg.capacity_kwh > 0.0) {
            return Err(ConfigError::new("battery.capacity_kwh", "must be > 0"));
        }
        if !(0.0 <= cfg.soc_min && cfg.soc_min < cfg.soc_max && cfg.soc_max <= 1.0) {
            return Err(ConfigError::new(
                "battery.soc_min",
                "must satisfy 0.0 <= soc_min < soc_max <= 1.0",
            ));
        }
        if !(cfg.soc_min..=cfg.soc_max).contains(&cfg.initial_soc) {
            return Err(ConfigError::new(
                "battery.initial_soc",
                "must be within [battery.soc_min, battery.soc_max]",
            ));
        }
        if !(cfg.max_charge_kw >= 0.0 && cfg.max_discharge_kw >= 0.0) {
            return Err(ConfigError::new("battery.max_charge_kw", "power limits must be >= 0"));
        }
        for (field, eta) in [
            ("battery.eta_charge", cfg.eta_charge),
            ("battery.eta_discharge", cfg.eta_discharge),
        ] {
            if !(eta > 0.0 && eta <= 1.0) {
                return Err(ConfigError::new(field, "must be in (0.0, 1.0]"));
            }
        }

        Ok(Self {
            capacity_kwh: cfg.capacity_kwh,
            soc: cfg.initial_soc,
            soc_min: cfg.soc_min,
            soc_max: cfg.soc_max,
            max_charge_kw: cfg.max_charge_kw,
            max_discharge_kw: cfg.max_discharge_kw,
            eta_charge: cfg.eta_charge,
            eta_discharge: cfg.eta_discharge,
        })
    }

    /// Stored energy in kWh.
    pub fn soc_kwh(&self) -> f64 {
        self.soc * self.capacity_kwh
    }

    /// Largest discharge (kW, delivered to the load) possible over `dt_h`.
    pub fn deliverable_kw(&self, dt_h: f64) -> f64 {
        let above_floor_kwh = ((self.soc - self.soc_min) * self.capacity_kwh).max(0.0);
        self.max_discharge_kw
            .min(above_floor_kwh * self.eta_discharge / dt_h)
    }

    /// Largest charge (kW, drawn from the bus) possible over `dt_h`.
    pub fn absorbable_kw(&self, dt_h: f64) -> f64 {
        let headroom_kwh = ((self.soc_max - self.soc) * self.capacity_kwh).max(0.0);
        self.max_charge_kw
            .min(headroom_kwh / (self.eta_charge * dt_h))
    }

    /// Clips `battery_kw` to the power ratings.
    pub fn limit_power(&self, battery_kw: f64) -> (f64, Option<Clamp>) {
        let (applied, kind) = if battery_kw > self.max_discharge_kw + EPS {
            (self.max_discharge_kw, LimitKind::DischargePower)
        } else if battery_kw < -self.max_charge_kw - EPS {
            (-self.max_charge_kw, LimitKind::ChargePower)
        } else {
            return (battery_kw, None);
        };
        (
            applied,
            Some(Clamp {
                kind,
                requested: battery_kw,
                applied,
            }),
        )
    }

    /// Integrates `battery_kw` over `dt_h` into the SOC.
    ///
    /// The SOC is clamped to `[soc_min, soc_max]`; a clamp larger than
    /// floating-point noise is returned so the caller can record it.
    pub fn integrate(&mut self, battery_kw: f64, dt_h: f64) -> Option<Clamp> {
        let delta_kwh = if battery_kw >= 0.0 {
            -battery_kw * dt_h / self.eta_discharge
        } else {
            -battery_kw * dt_h * self.eta_charge
        };
        let unclamped = self.soc + delta_kwh / self.capacity_kwh;
        self.soc = unclamped.clamp(self.soc_min, self.soc_max);

        if unclamped > self.soc_max + EPS {
            Some(Clamp {
                kind: LimitKind::SocMax,
                requested: unclamped,
                applied: self.soc,
            })
        } else if unclamped < self.soc_min - EPS {
            Some(Clamp {
                kind: LimitKind::SocMin,
                requested: unclamped,
                applied: self.soc,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery(soc: f64, eta: f64) -> Battery {
        Battery::from_config(&BatteryConfig {
            capacity_kwh: 10.0,
            initial_soc: soc,
            soc_min: 0.1,
            soc_max: 0.9,
            max_charge_kw: 5.0,
            max_discharge_kw: 5.0,
            eta_charge: eta,
            eta_discharge: eta,
        })
        .expect("valid battery")
    }

    #[test]
    fn test_new_battery() {
        let b = battery(0.5, 0.95);
        assert_eq!(b.capacity_kwh, 10.0);
        assert_eq!(b.soc, 0.5);
        assert_eq!(b.soc_kwh(), 5.0);
    }

    #[test]
    fn test_invalid_config() {
        let mut cfg = BatteryConfig::default();
        cfg.capacity_kwh = 0.0;
        assert!(Battery::from_config(&cfg).is_err());

        let mut cfg = BatteryConfig::default();
        cfg.initial_soc = 0.99;
        assert!(Battery::from_config(&cfg).is_err());

        let mut cfg = BatteryConfig::default();
        cfg.eta_discharge = 1.5;
        assert!(Battery::from_config(&cfg).is_err());
    }

    #[test]
    fn test_deliverable_limited_by_rating() {
        let b = battery(0.5, 1.0);
        assert_eq!(b.deliverable_kw(0.25), 5.0);
    }

    #[test]
    fn test_deliverable_limited_by_floor() {
        // 0.5 kWh above the 10% floor, 0.25 h step, perfect efficiency -> 2 kW
        let b = battery(0.15, 1.0);
        assert!((b.deliverable_kw(0.25) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_absorbable_limited_by_ceiling() {
        // 0.5 kWh below the 90% ceiling -> 2 kW over 0.25 h
        let b = battery(0.85, 1.0);
        assert!((b.absorbable_kw(0.25) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_discharge_to_floor_lands_exactly() {
        let mut b = battery(0.15, 0.9);
        let kw = b.deliverable_kw(0.25);
        assert!(b.integrate(kw, 0.25).is_none());
        assert!((b.soc - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_charge_efficiency() {
        // 4 kW for 0.5 h at 90% -> 1.8 kWh stored
        let mut b = battery(0.5, 0.9);
        b.integrate(-4.0, 0.5);
        assert!((b.soc - 0.68).abs() < 1e-12);
    }

    #[test]
    fn test_discharge_efficiency() {
        // 1.8 kW delivered for 0.5 h at 90% -> 1.0 kWh drawn from cells
        let mut b = battery(0.5, 0.9);
        b.integrate(1.8, 0.5);
        assert!((b.soc - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_overcharge_is_reported() {
        let mut b = battery(0.85, 1.0);
        let clamp = b.integrate(-5.0, 1.0).expect("must clamp at soc_max");
        assert_eq!(clamp.kind, LimitKind::SocMax);
        assert_eq!(b.soc, 0.9);
        assert!(clamp.requested > 0.9);
    }

    #[test]
    fn test_power_limit_is_reported() {
        let b = battery(0.5, 1.0);
        let (kw, clamp) = b.limit_power(7.0);
        assert_eq!(kw, 5.0);
        assert_eq!(clamp.map(|c| c.kind), Some(LimitKind::DischargePower));
        let (kw, clamp) = b.limit_power(-2.0);
        assert_eq!(kw, -2.0);
        assert!(clamp.is_none());
    }
}
