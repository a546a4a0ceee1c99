use std::f64::consts::PI;

use crate::config::{ConfigError, SiteConfig};
use crate::devices::types::{Device, HOURS_PER_DAY};

/// The site's own consumption, independent of the robot.
///
/// `SiteLoad` follows a sinusoidal daily pattern with configurable baseline,
/// amplitude and phase. Unlike a metered load it has no noise term, so the
/// series is reproducible across policy runs.
///
/// # Examples
///
/// ```
/// use earp::devices::baseload::SiteLoad;
/// use earp::devices::Device;
///
/// let load = SiteLoad::new(1.0, 0.5, 0.0).unwrap();
/// // sin(0) = 0 at midnight
/// assert!((load.power_kw(0.0) - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SiteLoad {
    /// Mean consumption in kilowatts.
    pub base_kw: f64,

    /// Amplitude of the daily swing in kilowatts.
    pub amp_kw: f64,

    /// Phase offset in radians.
    pub phase_rad: f64,
}

impl SiteLoad {
    /// Creates a new site load.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `base_kw` or `amp_kw` is negative.
    pub fn new(base_kw: f64, amp_kw: f64, phase_rad: f64) -> Result<Self, ConfigError> {
        if !(base_kw >= 0.0) {
            return Err(ConfigError::new("site.base_kw", "must be >= 0"));
        }
        if !(amp_kw >= 0.0) {
            return Err(ConfigError::new("site.amp_kw", "must be >= 0"));
        }
        Ok(Self {
            base_kw,
            amp_kw,
            phase_rad,
        })
    }

    /// Builds the load from its scenario section.
    ///
    /// # Errors
    ///
    /// See [`SiteLoad::new`].
    pub fn from_config(cfg: &SiteConfig) -> Result<Self, ConfigError> {
        Self::new(cfg.base_kw, cfg.amp_kw, cfg.phase_rad)
    }
}

impl Device for SiteLoad {
    /// Demand at `t_h`, clamped at zero when the swing exceeds the baseline.
    fn power_kw(&self, t_h: f64) -> f64 {
        let angle = 2.0 * PI * t_h / HOURS_PER_DAY + self.phase_rad;
        (self.base_kw + self.amp_kw * angle.sin()).max(0.0)
    }

    fn device_type(&self) -> &'static str {
        "SiteLoad"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_load_when_amplitude_is_zero() {
        let load = SiteLoad::new(2.0, 0.0, 1.2).expect("valid load");
        for i in 0..24 {
            assert_eq!(load.power_kw(i as f64), 2.0);
        }
    }

    #[test]
    fn never_negative() {
        let load = SiteLoad::new(0.5, 2.0, 0.0).expect("valid load");
        for i in 0..96 {
            assert!(load.power_kw(i as f64 * 0.25) >= 0.0);
        }
    }

    #[test]
    fn peaks_a_quarter_day_after_zero_phase() {
        let load = SiteLoad::new(1.0, 0.5, 0.0).expect("valid load");
        assert!((load.power_kw(6.0) - 1.5).abs() < 1e-12);
        assert!((load.power_kw(18.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_parameters() {
        assert!(SiteLoad::new(-1.0, 0.0, 0.0).is_err());
        assert!(SiteLoad::new(1.0, -0.5, 0.0).is_err());
    }
}
