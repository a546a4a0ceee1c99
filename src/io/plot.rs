//! SVG charts comparing policy runs.

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::SimError;

use super::export::TimeseriesRow;

const WIDTH: u32 = 1100;
const HEIGHT: u32 = 500;

/// File names of the charts written by [`render_all`], in report order.
pub const PLOT_FILES: [&str; 4] = [
    "price_vs_robot_charging.svg",
    "cumulative_cost.svg",
    "grid_import.svg",
    "soc.svg",
];

/// One policy's time series, labelled for the legend.
#[derive(Debug, Clone, Copy)]
pub struct RunSeries<'a> {
    pub policy: &'a str,
    pub rows: &'a [TimeseriesRow],
}

struct Line {
    label: String,
    color: RGBColor,
    points: Vec<(f64, f64)>,
}

fn policy_color(policy: &str, dimmed: bool) -> RGBColor {
    match (policy, dimmed) {
        ("baseline", false) => RGBColor(214, 39, 40),
        ("baseline", true) => RGBColor(240, 150, 150),
        (_, false) => RGBColor(31, 119, 180),
        (_, true) => RGBColor(140, 190, 230),
    }
}

fn line(run: &RunSeries<'_>, suffix: &str, dimmed: bool, value: impl Fn(&TimeseriesRow) -> f64) -> Line {
    Line {
        label: format!("{}{suffix}", run.policy),
        color: policy_color(run.policy, dimmed),
        points: run.rows.iter().map(|r| (r.t_h, value(r))).collect(),
    }
}

fn x_max(runs: &[RunSeries<'_>]) -> f64 {
    let last = runs
        .iter()
        .filter_map(|r| r.rows.last().map(|row| row.t_h))
        .fold(0.0, f64::max);
    if last > 0.0 { last } else { 1.0 }
}

/// Y range with 10% headroom; never empty.
fn y_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) * 0.1).max(1e-3);
    (if lo < 0.0 { lo - pad } else { 0.0 }, hi + pad)
}

fn draw_lines(path: &Path, caption: &str, y_desc: &str, x_max: f64, lines: &[Line]) -> Result<(), Box<dyn Error>> {
    let (y_min, y_max) = y_range(lines.iter().flat_map(|l| l.points.iter().map(|(_, y)| y)));

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Hour")
        .y_desc(y_desc)
        .x_labels(13)
        .draw()?;

    for l in lines {
        let color = l.color;
        chart
            .draw_series(LineSeries::new(l.points.iter().copied(), color.stroke_width(2)))?
            .label(l.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if !lines.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    root.present()?;
    Ok(())
}

fn draw_price_vs_charging(path: &Path, x_max: f64, runs: &[RunSeries<'_>]) -> Result<(), Box<dyn Error>> {
    // Price is identical across runs.
    let price: Vec<(f64, f64)> = runs
        .first()
        .map(|r| r.rows.iter().map(|row| (row.t_h, row.price_per_kwh)).collect())
        .unwrap_or_default();
    let charging: Vec<Line> = runs
        .iter()
        .map(|r| {
            line(r, " charging", false, |row| {
                if row.is_charging() { row.robot_kw } else { 0.0 }
            })
        })
        .collect();
    let (_, price_max) = y_range(price.iter().map(|(_, p)| p));
    let (_, kw_max) = y_range(charging.iter().flat_map(|l| l.points.iter().map(|(_, y)| y)));

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Grid price vs robot charging", ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..price_max)?
        .set_secondary_coord(0.0..x_max, 0.0..kw_max);

    chart
        .configure_mesh()
        .x_desc("Hour")
        .y_desc("Price ($/kWh)")
        .x_labels(13)
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc("Robot charging (kW)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(price, BLACK.stroke_width(2)))?
        .label("price")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));
    for l in charging {
        let color = l.color;
        chart
            .draw_secondary_series(LineSeries::new(l.points, color.stroke_width(2)))?
            .label(l.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

fn render(dir: &Path, runs: &[RunSeries<'_>]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let x_max = x_max(runs);
    let paths: Vec<PathBuf> = PLOT_FILES.iter().map(|f| dir.join(f)).collect();

    draw_price_vs_charging(&paths[0], x_max, runs)?;

    let cost: Vec<Line> = runs
        .iter()
        .map(|r| line(r, "", false, |row| row.cumulative_cost))
        .collect();
    draw_lines(&paths[1], "Cumulative grid cost", "Cost ($)", x_max, &cost)?;

    let grid: Vec<Line> = runs.iter().map(|r| line(r, "", false, |row| row.grid_kw)).collect();
    draw_lines(&paths[2], "Grid import", "Import (kW)", x_max, &grid)?;

    let soc: Vec<Line> = runs
        .iter()
        .flat_map(|r| {
            [
                line(r, " microgrid", false, |row| row.soc_microgrid),
                line(r, " robot", true, |row| row.robot_soc),
            ]
        })
        .collect();
    draw_lines(&paths[3], "State of charge", "SOC (fraction)", x_max, &soc)?;

    Ok(paths)
}

/// Renders the four comparison charts into `dir`.
///
/// Runs that are missing (a failed policy) are simply left out.
///
/// # Errors
///
/// Returns [`SimError::Plot`] if any chart cannot be drawn or written.
pub fn render_all(dir: &Path, runs: &[RunSeries<'_>]) -> Result<Vec<PathBuf>, SimError> {
    render(dir, runs).map_err(|e| SimError::Plot(e.to_string()))
}
