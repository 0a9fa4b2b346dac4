mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::monte_carlo::MonteCarloArgs;
use commands::scenarios::ScenariosArgs;
use commands::stamp_duty::StampDutyArgs;
use commands::underwrite::UnderwriteArgs;

/// Leveraged real-estate underwriting
#[derive(Parser)]
#[command(
    name = "uw",
    version,
    about = "Leveraged real-estate underwriting",
    long_about = "Monthly levered cash flows, debt schedules and return metrics for a \
                  buy-to-let acquisition, with deterministic stress scenarios and a \
                  seeded Monte Carlo. Reads JSON or YAML from --input or stdin. \
                  Set RUST_LOG=debug for solver diagnostics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single underwriting (cash flows, debt schedule, metrics)
    Underwrite(UnderwriteArgs),
    /// Run the nine standard stress scenarios against the base case
    Scenarios(ScenariosArgs),
    /// Run a seeded Monte Carlo over rent growth, vacancy, exit cap and rate
    MonteCarlo(MonteCarloArgs),
    /// Residential stamp duty for a purchase price
    StampDuty(StampDutyArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Underwrite(args) => commands::underwrite::run_underwrite(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::StampDuty(args) => commands::stamp_duty::run_stamp_duty(args),
        Commands::Version => {
            println!("uw {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            log::debug!("command finished, formatting as {:?}", cli.output);
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
