//! Common types and traits for site devices.

use std::f64::consts::PI;

/// Hours in one day; device profiles repeat with this period.
pub const HOURS_PER_DAY: f64 = 24.0;

/// A site device with a deterministic power profile.
///
/// Implementations are pure functions of time so that sampling the same
/// device twice yields bit-identical series.
pub trait Device {
    /// Returns the device power at `t_h` hours from the start of the horizon.
    ///
    /// Values are non-negative magnitudes; whether the device generates or
    /// consumes is implied by the device type.
    fn power_kw(&self, t_h: f64) -> f64;

    /// Returns a human-readable type name for the device.
    fn device_type(&self) -> &'static str;
}

/// Normalised daylight shape in `[0, 1]` for hour-of-day `hour`.
///
/// The window `[sunrise_h, sunset_h]` is mapped onto `[0, π]` and shaped
/// as `sin(x)^1.5`, which is zero at both ends and peaks at solar noon.
pub fn daylight_frac(hour: f64, sunrise_h: f64, sunset_h: f64) -> f64 {
    if hour < sunrise_h || hour > sunset_h {
        return 0.0;
    }
    let span = (sunset_h - sunrise_h).max(1e-6);
    let x = (hour - sunrise_h) / span * PI;
    x.sin().max(0.0).powf(1.5)
}

/// Hour of day for an absolute horizon time.
pub fn hour_of_day(t_h: f64) -> f64 {
    t_h.rem_euclid(HOURS_PER_DAY)
}
