use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    plan::{self, PlanArgs},
    stats::{self, StatsArgs},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "clipcat",
    version,
    about = "Constrained concatenation planner for video clips"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan concatenation units from clip metadata.
    Plan(PlanArgs),
    /// Print the distribution report of an existing plan.
    Stats(StatsArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout carries JSON output.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Plan(args) => plan::run(&args),
        Command::Stats(args) => stats::run(&args),
    }
}
