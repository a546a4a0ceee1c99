use crate::config::{ConfigError, PvConfig};
use crate::devices::types::{Device, daylight_frac, hour_of_day};

/// A solar PV array with a smooth bell-shaped daily profile.
///
/// Generation is zero outside `[sunrise_h, sunset_h]` and follows
/// [`daylight_frac`] inside it, scaled by `rated_kw * derate`. There is no
/// weather model: the same array always produces the same series.
#[derive(Debug, Clone)]
pub struct SolarPv {
    /// Nameplate rating in kilowatts.
    pub rated_kw: f64,

    /// Derate applied to the nameplate (inverter, soiling, temperature).
    pub derate: f64,

    /// Hour of day generation starts.
    pub sunrise_h: f64,

    /// Hour of day generation ends.
    pub sunset_h: f64,
}

impl SolarPv {
    /// Creates a new PV array.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the rating is negative, the derate is
    /// outside `(0, 1]`, or `sunrise_h >= sunset_h`.
    pub fn new(rated_kw: f64, derate: f64, sunrise_h: f64, sunset_h: f64) -> Result<Self, ConfigError> {
        if !(rated_kw >= 0.0) {
            return Err(ConfigError::new("pv.rated_kw", "must be >= 0"));
        }
        if !(derate > 0.0 && derate <= 1.0) {
            return Err(ConfigError::new("pv.derate", "must be in (0.0, 1.0]"));
        }
        if !(sunrise_h < sunset_h) {
            return Err(ConfigError::new("pv.sunrise_h", "must be < pv.sunset_h"));
        }
        Ok(Self {
            rated_kw,
            derate,
            sunrise_h,
            sunset_h,
        })
    }

    /// Builds the array from its scenario section.
    ///
    /// # Errors
    ///
    /// See [`SolarPv::new`].
    pub fn from_config(cfg: &PvConfig) -> Result<Self, ConfigError> {
        Self::new(cfg.rated_kw, cfg.derate, cfg.sunrise_h, cfg.sunset_h)
    }

    /// Peak output in kW.
    pub fn peak_kw(&self) -> f64 {
        self.rated_kw * self.derate
    }
}

impl Device for SolarPv {
    fn power_kw(&self, t_h: f64) -> f64 {
        self.peak_kw() * daylight_frac(hour_of_day(t_h), self.sunrise_h, self.sunset_h)
    }

    fn device_type(&self) -> &'static str {
        "SolarPV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pv() -> SolarPv {
        SolarPv::new(30.0, 0.95, 7.0, 18.5).expect("valid array")
    }

    #[test]
    fn test_new_solar_pv() {
        let pv = pv();
        assert_eq!(pv.rated_kw, 30.0);
        assert_eq!(pv.derate, 0.95);
        assert!((pv.peak_kw() - 28.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(SolarPv::new(-1.0, 0.95, 7.0, 18.5).is_err());
        assert!(SolarPv::new(5.0, 0.0, 7.0, 18.5).is_err());
        assert!(SolarPv::new(5.0, 0.95, 18.0, 6.0).is_err());
    }

    #[test]
    fn test_no_generation_at_night() {
        let pv = pv();
        for t in [0.0, 3.0, 6.9, 18.6, 23.75] {
            assert_eq!(pv.power_kw(t), 0.0, "t={t}");
        }
    }

    #[test]
    fn test_peak_generation_at_solar_noon() {
        let pv = pv();
        assert!((pv.power_kw(12.75) - 28.5).abs() < 1e-9);
    }

    #[test]
    fn test_second_day_repeats_first() {
        let pv = pv();
        for t in [8.0, 12.0, 15.25] {
            assert_eq!(pv.power_kw(t), pv.power_kw(t + 24.0));
        }
    }

    #[test]
    fn test_solar_never_negative() {
        let pv = pv();
        for i in 0..192 {
            assert!(pv.power_kw(i as f64 * 0.25) >= 0.0);
        }
    }
}
