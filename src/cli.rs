use std::env;
use std::path::PathBuf;

use earp::runner::DEFAULT_OUTPUT_ROOT;

#[derive(Debug, PartialEq)]
pub enum Command {
    Simulate(SimulateArgs),
    Report(ReportArgs),
    Help,
}

#[derive(Debug, PartialEq)]
pub struct SimulateArgs {
    /// Preset name or path to a TOML file.
    pub scenario: String,
    pub seed: Option<u64>,
    pub out: PathBuf,
}

#[derive(Debug, PartialEq)]
pub struct ReportArgs {
    /// Run directory; the latest run under `out` when absent.
    pub run: Option<PathBuf>,
    pub out: PathBuf,
}

pub fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

pub fn parse_args_from(args: Vec<String>) -> Result<Command, String> {
    let Some((sub, rest)) = args.split_first() else {
        return Err("missing subcommand (expected `simulate` or `report`)".to_string());
    };
    match sub.as_str() {
        "simulate" => parse_simulate(rest).map(Command::Simulate),
        "report" => parse_report(rest).map(Command::Report),
        "--help" | "-h" | "help" => Ok(Command::Help),
        other => Err(format!("unknown subcommand: {other}")),
    }
}

fn parse_simulate(args: &[String]) -> Result<SimulateArgs, String> {
    let mut i = 0usize;
    let mut scenario = None;
    let mut seed = None;
    let mut out = None;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let name = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a preset name or TOML path)",
                )?;
                if scenario.replace(name.to_string()).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let value = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                if seed.replace(value).is_some() {
                    return Err("--seed provided more than once".to_string());
                }
            }
            "--out" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --out (expected a directory)")?;
                if out.replace(PathBuf::from(path)).is_some() {
                    return Err("--out provided more than once".to_string());
                }
            }
            other => return Err(format!("unknown argument for simulate: {other}")),
        }
        i += 1;
    }

    Ok(SimulateArgs {
        scenario: scenario.unwrap_or_else(|| "demo".to_string()),
        seed,
        out: out.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT)),
    })
}

fn parse_report(args: &[String]) -> Result<ReportArgs, String> {
    let mut i = 0usize;
    let mut run = None;
    let mut out = None;

    while i < args.len() {
        match args[i].as_str() {
            "--run" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --run (expected a run directory)")?;
                if run.replace(PathBuf::from(path)).is_some() {
                    return Err("--run provided more than once".to_string());
                }
            }
            "--out" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --out (expected a directory)")?;
                if out.replace(PathBuf::from(path)).is_some() {
                    return Err("--out provided more than once".to_string());
                }
            }
            other => return Err(format!("unknown argument for report: {other}")),
        }
        i += 1;
    }

    Ok(ReportArgs {
        run,
        out: out.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT)),
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("earp: energy-aware robot + microgrid planner");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  earp simulate [--scenario <preset|path.toml>] [--seed <u64>] [--out <dir>]");
    eprintln!("  earp report [--run <dir>] [--out <dir>]");
    eprintln!();
    eprintln!("Presets: demo (default), peak_mission");
    eprintln!("`report` uses the latest run under --out (default: outputs) unless --run is given.");
}
