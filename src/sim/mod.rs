/// Scenario comparator across charging policies.
pub mod compare;
/// Microgrid dispatcher (PV, battery, grid).
pub mod dispatch;
pub mod kpi;
/// Robot mission planner.
pub mod planner;
/// Robot charging policies.
pub mod policy;
pub mod power_balance;
/// Deterministic PV, price and site-load profiles.
pub mod profile;
/// Time-of-use tariff.
pub mod tariff;
pub mod types;
