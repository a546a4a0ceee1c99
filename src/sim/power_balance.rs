//! Microgrid bus power balance.

use super::dispatch::DispatchResult;

/// Total supply on the bus from the three sources in dispatch convention.
///
/// All inputs are non-negative magnitudes:
/// - `pv_used_kw`: PV consumed on site
/// - `discharge_kw`: battery output
/// - `grid_kw`: grid import
///
/// This function performs pure summation with **no sign flipping**.
pub fn supply_kw(pv_used_kw: f64, discharge_kw: f64, grid_kw: f64) -> f64 {
    pv_used_kw + discharge_kw + grid_kw
}

/// Supply minus demand for one dispatched step; zero when balanced.
pub fn balance_error_kw(r: &DispatchResult) -> f64 {
    supply_kw(r.pv_used_kw, r.battery_discharge_kw(), r.grid_import_kw) - r.total_load_kw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sources_add() {
        assert_eq!(supply_kw(1.0, 2.0, 0.5), 3.5);
    }

    #[test]
    fn pv_only() {
        assert_eq!(supply_kw(2.5, 0.0, 0.0), 2.5);
    }

    #[test]
    fn mixed_scenario() {
        // pv=0.8, battery=1.2, grid=0.3 -> 2.3
        let supply = supply_kw(0.8, 1.2, 0.3);
        assert!((supply - 2.3).abs() < 1e-12);
    }
}
