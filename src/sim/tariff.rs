//! Time-of-use tariff and its price windows.

use crate::config::{ConfigError, TariffConfig};
use crate::devices::types::hour_of_day;

/// A daily price window spanning `[start_h, end_h)` in hours of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceWindow {
    /// Start hour of day (inclusive).
    pub start_h: f64,
    /// End hour of day (exclusive).
    pub end_h: f64,
}

impl PriceWindow {
    /// Creates a new window.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `start_h >= end_h`.
    pub fn new(start_h: f64, end_h: f64) -> Result<Self, ConfigError> {
        if !(start_h < end_h) {
            return Err(ConfigError::new(
                "tariff",
                format!("window start {start_h} must be before end {end_h}"),
            ));
        }
        Ok(Self { start_h, end_h })
    }

    /// Returns `true` when `t_h` falls within the window on any day.
    pub fn is_active(&self, t_h: f64) -> bool {
        let h = hour_of_day(t_h);
        h >= self.start_h && h < self.end_h
    }
}

/// Three-tier time-of-use tariff. The peak window takes precedence over
/// the mid window where they overlap.
#[derive(Debug, Clone)]
pub struct TouTariff {
    pub off_peak: f64,
    pub mid: f64,
    pub peak: f64,
    pub mid_window: PriceWindow,
    pub peak_window: PriceWindow,
}

impl TouTariff {
    /// Builds the tariff from its scenario section.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a price is negative or a window is empty.
    pub fn from_config(cfg: &TariffConfig) -> Result<Self, ConfigError> {
        if !(cfg.off_peak >= 0.0 && cfg.mid >= 0.0 && cfg.peak >= 0.0) {
            return Err(ConfigError::new("tariff", "prices must be >= 0"));
        }
        Ok(Self {
            off_peak: cfg.off_peak,
            mid: cfg.mid,
            peak: cfg.peak,
            mid_window: PriceWindow::new(cfg.mid_start_h, cfg.mid_end_h)?,
            peak_window: PriceWindow::new(cfg.peak_start_h, cfg.peak_end_h)?,
        })
    }

    /// Returns `true` when `t_h` is inside the peak window.
    pub fn is_peak(&self, t_h: f64) -> bool {
        self.peak_window.is_active(t_h)
    }

    /// Energy price ($/kWh) at `t_h`.
    pub fn price_at(&self, t_h: f64) -> f64 {
        if self.is_peak(t_h) {
            self.peak
        } else if self.mid_window.is_active(t_h) {
            self.mid
        } else {
            self.off_peak
        }
    }
}
