//! Relay Simulation CLI
//!
//! Runs a scenario headless and writes a JSON report.
//!
//! Usage:
//!   relay-sim --scenario scenarios/mun-relay.json \
//!             --steps 600 --dt 0.1 \
//!             --report out/mun-relay-report.json

use anyhow::{Context, Result};
use clap::Parser;
use relay_sim::{Runner, Scenario};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "relay_sim=info,relay_network=info,flight_computer=info";
const VERBOSE_FILTER: &str = "relay_sim=debug,relay_network=debug,flight_computer=debug";

#[derive(Parser, Debug)]
#[command(
    name = "relay-sim",
    about = "Run a relay network scenario with signal-delayed commands"
)]
struct Args {
    /// Scenario JSON file
    #[arg(short, long, env = "RELAY_SIM_SCENARIO")]
    scenario: PathBuf,

    /// Number of simulation steps
    #[arg(long, default_value_t = 600)]
    steps: usize,

    /// Step length in seconds
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Write the run report to this file (stdout when omitted)
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    anyhow::ensure!(args.dt > 0.0, "--dt must be positive, got {}", args.dt);

    let scenario = Scenario::from_file(&args.scenario)
        .with_context(|| format!("loading scenario {:?}", args.scenario))?;
    let built = scenario.build().context("building scenario")?;

    info!("{}", "=".repeat(60));
    info!("Relay simulation: {}", scenario.name);
    info!("{} steps of {}s", args.steps, args.dt);
    info!("{}", "=".repeat(60));

    let mut runner = Runner::new(scenario.name.clone(), built);
    let report = runner.run(args.steps, args.dt)?;

    match &args.report {
        Some(path) => {
            info!("Writing report to {:?}", path);
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &report)?;
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &report)?;
            println!();
        }
    }

    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Simulated {:.1}s", report.final_time);
    info!("Links added/removed: {}/{}", report.events.links_added, report.events.links_removed);
    info!(
        "Commands queued {}, activated {}, dropped {}, denied {}",
        report.events.commands_queued,
        report.events.commands_activated,
        report.events.commands_dropped,
        report.events.commands_denied
    );
    for craft in &report.crafts {
        match craft.delay_s {
            Some(delay) => info!("  {}: {:.3}s delay", craft.name, delay),
            None => info!("  {}: no connection", craft.name),
        }
    }

    Ok(())
}
