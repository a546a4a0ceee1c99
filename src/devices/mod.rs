//! Site devices: PV, site load, microgrid battery and the robot.

/// Sinusoidal site load profile.
pub mod baseload;
/// Stationary microgrid battery model.
pub mod battery;
/// Mobile robot energy model and onboard battery.
pub mod robot;
/// Solar photovoltaic generation model.
pub mod solar;
pub mod types;

pub use baseload::SiteLoad;
pub use battery::Battery;
pub use robot::{OnboardBattery, Robot};
pub use solar::SolarPv;
pub use types::Device;
