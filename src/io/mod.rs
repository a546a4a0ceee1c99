/// CSV time series and JSON summary export.
pub mod export;
/// SVG charts.
pub mod plot;
