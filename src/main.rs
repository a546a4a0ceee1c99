//! earp entry point: CLI wiring for `simulate` and `report`.

mod cli;

use std::process;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use earp::config::ScenarioConfig;
use earp::report::make_report;
use earp::runner::{resolve_latest, simulate};
use earp::sim::policy::PolicyKind;

use cli::{Command, ReportArgs, SimulateArgs};

fn init_tracing() {
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer());
    subscriber.init();
}

fn run_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let mut scenario = ScenarioConfig::load(&args.scenario)
        .with_context(|| format!("loading scenario \"{}\"", args.scenario))?;
    if let Some(seed) = args.seed {
        scenario.simulation.seed = seed;
    }

    let output = simulate(&scenario, &args.out).context("simulation failed")?;
    let report = &output.report;

    println!("Run saved to {}", output.dir.display());
    for kind in PolicyKind::ALL {
        match report.run(kind) {
            Ok(run) => println!("\n[{kind}]\n{}", run.summary),
            Err(e) => println!("\n[{kind}]\nfailed: {e}"),
        }
    }
    match (report.cost_saved(), report.grid_energy_saved_kwh()) {
        (Some(cost), Some(grid)) => {
            println!("\nCost saved:        ${cost:.3}");
            println!("Grid energy saved: {grid:.3} kWh");
        }
        _ => println!("\nPartial run: one policy could not be scheduled."),
    }
    Ok(())
}

fn run_report(args: ReportArgs) -> anyhow::Result<()> {
    let dir = match args.run {
        Some(dir) => dir,
        None => resolve_latest(&args.out)
            .with_context(|| format!("no run to report under \"{}\"", args.out.display()))?,
    };
    let path = make_report(&dir)
        .with_context(|| format!("building report for \"{}\"", dir.display()))?;
    println!("Report written to {}", path.display());
    Ok(())
}

fn main() {
    let command = match cli::parse_args() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };

    init_tracing();

    let result = match command {
        Command::Simulate(args) => run_simulate(args),
        Command::Report(args) => run_report(args),
        Command::Help => {
            cli::print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
