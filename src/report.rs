//! Markdown report and charts for a saved run directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::SimError;
use crate::io::export::{TimeseriesRow, load_summary, load_timeseries};
use crate::io::plot::{RunSeries, render_all};
use crate::runner::{SUMMARY_FILE, timeseries_file};
use crate::sim::compare::{PolicyRecord, SummaryRecord};
use crate::sim::kpi::SummaryMetrics;
use crate::sim::policy::PolicyKind;

pub const REPORT_FILE: &str = "REPORT.md";

/// Markdown rendering of a run summary plus its figure list.
pub struct MarkdownReport<'a> {
    pub summary: &'a SummaryRecord,
    /// Figure file names relative to the run directory.
    pub figures: Vec<String>,
}

fn metric_row(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    records: [&PolicyRecord; 2],
    value: impl Fn(&SummaryMetrics) -> String,
) -> fmt::Result {
    let cell = |r: &PolicyRecord| r.metrics.as_ref().map_or_else(|| "n/a".to_string(), &value);
    writeln!(f, "| {name} | {} | {} |", cell(records[0]), cell(records[1]))
}

impl fmt::Display for MarkdownReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "# Robot + microgrid policy comparison: {}", s.scenario)?;
        writeln!(f)?;
        writeln!(
            f,
            "Seed {} | horizon {} h | step {} h | {} tasks",
            s.seed,
            s.horizon_h,
            s.dt_h,
            s.config.tasks.len()
        )?;
        writeln!(f)?;

        writeln!(f, "## Key results")?;
        writeln!(f)?;
        match (s.cost_saved, s.grid_energy_saved_kwh) {
            (Some(cost), Some(grid)) => {
                writeln!(f, "- Cost saved by the energy-aware policy: **${cost:.3}**")?;
                writeln!(f, "- Grid energy saved: **{grid:.3} kWh**")?;
            }
            _ => writeln!(f, "- Partial comparison: deltas are not available.")?,
        }
        for kind in PolicyKind::ALL {
            if let Some(err) = &s.policy(kind).error {
                writeln!(f, "- `{kind}` run failed: {err}")?;
            }
        }
        writeln!(f)?;

        let records = [&s.baseline, &s.energy_aware];
        writeln!(f, "| Metric | baseline | energy_aware |")?;
        writeln!(f, "|---|---:|---:|")?;
        metric_row(f, "Total cost ($)", records, |m| format!("{:.3}", m.total_cost))?;
        metric_row(f, "Grid energy (kWh)", records, |m| {
            format!("{:.3}", m.total_grid_energy_kwh)
        })?;
        metric_row(f, "Peak grid import (kW)", records, |m| {
            format!("{:.2}", m.peak_grid_import_kw)
        })?;
        metric_row(f, "Battery throughput (kWh)", records, |m| {
            format!("{:.2}", m.battery_throughput_kwh)
        })?;
        metric_row(f, "Curtailed PV (kWh)", records, |m| {
            format!("{:.2}", m.curtailed_energy_kwh)
        })?;
        metric_row(f, "Robot charge energy (kWh)", records, |m| {
            format!("{:.3}", m.robot_charge_energy_kwh)
        })?;
        metric_row(f, "Constraint violations", records, |m| {
            m.constraint_violations.to_string()
        })?;
        writeln!(f)?;

        writeln!(f, "## Task executions")?;
        writeln!(f)?;
        for kind in PolicyKind::ALL {
            let record = s.policy(kind);
            if record.executions.is_empty() {
                continue;
            }
            writeln!(f, "**{kind}**")?;
            writeln!(f)?;
            for e in &record.executions {
                writeln!(f, "- `{}`: {:.2} h to {:.2} h", e.task_id, e.start_h, e.end_h)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "## Figures")?;
        writeln!(f)?;
        for fig in &self.figures {
            let title = fig.trim_end_matches(".svg");
            writeln!(f, "![{title}]({fig})")?;
        }
        Ok(())
    }
}

/// Renders charts and `REPORT.md` for the run in `run_dir`.
///
/// Time series for a failed policy are absent and simply left out of the
/// charts.
///
/// # Errors
///
/// Returns a [`SimError`] if `summary.json` or a time series cannot be
/// read, or if a chart or the report cannot be written.
pub fn make_report(run_dir: &Path) -> Result<PathBuf, SimError> {
    let summary = load_summary(&run_dir.join(SUMMARY_FILE))?;

    let mut loaded: Vec<(PolicyKind, Vec<TimeseriesRow>)> = Vec::new();
    for kind in PolicyKind::ALL {
        let path = run_dir.join(timeseries_file(kind));
        if path.is_file() {
            loaded.push((kind, load_timeseries(&path)?));
        }
    }
    let series: Vec<RunSeries<'_>> = loaded
        .iter()
        .map(|(kind, rows)| RunSeries {
            policy: kind.as_str(),
            rows,
        })
        .collect();

    let plots = render_all(run_dir, &series)?;
    let figures = plots
        .iter()
        .filter_map(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();

    let path = run_dir.join(REPORT_FILE);
    let report = MarkdownReport {
        summary: &summary,
        figures,
    };
    fs::write(&path, report.to_string())?;
    info!(path = %path.display(), "report written");
    Ok(path)
}
