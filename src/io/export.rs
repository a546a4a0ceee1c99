//! CSV and JSON export of policy runs, and the readers the report uses.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::sim::compare::{PolicyRun, SummaryRecord};
use crate::sim::profile::Profiles;

/// Column header for the per-policy time series.
const HEADER: &str = "t_h,pv_kw,price_per_kwh,site_load_kw,robot_state,robot_kw,robot_soc,\
                      total_load_kw,pv_used_kw,battery_kw,grid_kw,curtailed_kw,\
                      soc_microgrid,cumulative_cost";

/// One row of a time-series CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesRow {
    pub t_h: f64,
    pub pv_kw: f64,
    pub price_per_kwh: f64,
    pub site_load_kw: f64,
    /// `idle`, `charge` or `task:<id>`.
    pub robot_state: String,
    pub robot_kw: f64,
    pub robot_soc: f64,
    pub total_load_kw: f64,
    pub pv_used_kw: f64,
    /// Positive = discharge, negative = charge.
    pub battery_kw: f64,
    pub grid_kw: f64,
    pub curtailed_kw: f64,
    pub soc_microgrid: f64,
    pub cumulative_cost: f64,
}

impl TimeseriesRow {
    pub fn is_charging(&self) -> bool {
        self.robot_state == "charge"
    }
}

/// Joins a policy run with the shared profiles into CSV rows.
pub fn timeseries_rows(run: &PolicyRun, profiles: &Profiles) -> Vec<TimeseriesRow> {
    run.results
        .iter()
        .map(|r| {
            let i = r.step;
            TimeseriesRow {
                t_h: r.t_h,
                pv_kw: r.pv_kw,
                price_per_kwh: r.price,
                site_load_kw: profiles.site_load_kw[i],
                robot_state: run.plan.states[i].to_string(),
                robot_kw: run.plan.load_kw[i],
                robot_soc: run.plan.soc[i],
                total_load_kw: r.total_load_kw,
                pv_used_kw: r.pv_used_kw,
                battery_kw: r.battery_kw,
                grid_kw: r.grid_import_kw,
                curtailed_kw: r.curtailed_kw,
                soc_microgrid: r.soc,
                cumulative_cost: r.cumulative_cost,
            }
        })
        .collect()
}

/// Exports a time series to a CSV file at `path`.
///
/// # Errors
///
/// Returns a [`SimError`] if file creation or writing fails.
pub fn export_timeseries(rows: &[TimeseriesRow], path: &Path) -> Result<(), SimError> {
    let file = File::create(path)?;
    write_timeseries(rows, io::BufWriter::new(file))
}

/// Writes a time series as CSV to any writer.
///
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns a [`SimError`] if writing fails.
pub fn write_timeseries(rows: &[TimeseriesRow], writer: impl Write) -> Result<(), SimError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in rows {
        wtr.write_record(&[
            format!("{:.2}", r.t_h),
            format!("{:.4}", r.pv_kw),
            format!("{:.4}", r.price_per_kwh),
            format!("{:.4}", r.site_load_kw),
            r.robot_state.clone(),
            format!("{:.4}", r.robot_kw),
            format!("{:.4}", r.robot_soc),
            format!("{:.4}", r.total_load_kw),
            format!("{:.4}", r.pv_used_kw),
            format!("{:.4}", r.battery_kw),
            format!("{:.4}", r.grid_kw),
            format!("{:.4}", r.curtailed_kw),
            format!("{:.4}", r.soc_microgrid),
            format!("{:.4}", r.cumulative_cost),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Reads a time series written by [`write_timeseries`].
///
/// # Errors
///
/// Returns a [`SimError`] if the input is unreadable or a row does not parse.
pub fn read_timeseries(reader: impl Read) -> Result<Vec<TimeseriesRow>, SimError> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
    let rows = rdr.deserialize().collect::<Result<Vec<TimeseriesRow>, _>>()?;
    Ok(rows)
}

/// Loads a time-series CSV file.
///
/// # Errors
///
/// See [`read_timeseries`].
pub fn load_timeseries(path: &Path) -> Result<Vec<TimeseriesRow>, SimError> {
    read_timeseries(BufReader::new(File::open(path)?))
}

/// Writes `summary.json` contents.
///
/// # Errors
///
/// Returns a [`SimError`] if serialization or writing fails.
pub fn write_summary(record: &SummaryRecord, mut writer: impl Write) -> Result<(), SimError> {
    serde_json::to_writer_pretty(&mut writer, record)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Exports the summary to a JSON file at `path`.
///
/// # Errors
///
/// See [`write_summary`].
pub fn export_summary(record: &SummaryRecord, path: &Path) -> Result<(), SimError> {
    write_summary(record, io::BufWriter::new(File::create(path)?))
}

/// Loads a `summary.json` file.
///
/// # Errors
///
/// Returns a [`SimError`] if the file is unreadable or not a summary.
pub fn load_summary(path: &Path) -> Result<SummaryRecord, SimError> {
    let record = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(record)
}
