//! Energy-aware robot + microgrid planner.
//!
//! Generates PV, price and site-load profiles, schedules robot missions under
//! a baseline and an energy-aware charging policy, dispatches the combined
//! load through a PV + battery + grid microgrid and compares the two runs.

pub mod config;
pub mod devices;
pub mod error;
/// CSV/JSON export and SVG charts.
pub mod io;
pub mod report;
pub mod runner;
/// Profiles, planning, dispatch and comparison.
pub mod sim;
