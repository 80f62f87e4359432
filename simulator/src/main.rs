//! Multisig Simulator
//!
//! Runs scripted scenarios or seeded random activity against a wallet and
//! reports whether it behaved as expected.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod accounts;
mod controller;
mod scenario;

use controller::{SimulationController, SimulationReport};
use scenario::Scenario;

/// Multisig Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Scenario runner for the multisig authorization engine")]
struct Args {
    /// Scenario to run: a built-in name or a path to a JSON file
    #[arg(short, long)]
    scenario: Option<String>,

    /// Number of owners for a random run
    #[arg(short, long, default_value = "3")]
    owners: usize,

    /// Confirmations required for a random run
    #[arg(short, long, default_value = "2")]
    threshold: usize,

    /// Number of random actions to perform when no scenario is given
    #[arg(long, default_value = "500")]
    random_steps: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the final report as JSON
    #[arg(long)]
    dump_state: bool,

    /// List built-in scenarios and exit
    #[arg(long)]
    list: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    if args.list {
        for name in Scenario::BUILT_IN {
            let scenario = Scenario::load(name)?;
            println!("{:<14} {}", scenario.name, scenario.description);
        }
        return Ok(());
    }

    info!("Starting Multisig Simulator");

    let report = match &args.scenario {
        Some(name) => {
            let scenario = Scenario::load(name)?;
            let mut controller = SimulationController::for_scenario(&scenario)?;
            controller.run_scenario(&scenario)
        }
        None => {
            let owners = (0..args.owners).map(|i| format!("owner-{}", i)).collect();
            let seed = args.seed.unwrap_or_else(rand::random);
            info!(owners = args.owners, threshold = args.threshold, seed, "Random run");

            let mut controller = SimulationController::new(owners, args.threshold)?;
            controller.run_random(args.random_steps, seed)
        }
    };

    summarize(&report);

    if args.dump_state {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.passed() {
        anyhow::bail!("{} check(s) failed in {}", report.failures.len(), report.name);
    }

    Ok(())
}

fn summarize(report: &SimulationReport) {
    info!("Simulation complete: {}", report.name);
    info!("Steps: {}", report.steps);
    info!("Wallet balance: {}", report.wallet.balance);
    info!(
        "Executions: {} succeeded, {} failed",
        report.metrics.executions_succeeded, report.metrics.executions_failed
    );
    info!("Rejected calls: {}", report.metrics.rejected_calls);

    for failure in &report.failures {
        error!("{}", failure);
    }
}
