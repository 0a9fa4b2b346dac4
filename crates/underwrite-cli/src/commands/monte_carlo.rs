use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use underwrite_core::monte_carlo::simulation::{self, MonteCarloRequest};

use crate::input;

/// Arguments for a Monte Carlo run
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// First day of the projection (YYYY-MM-DD); overrides the input file
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// RNG seed; overrides `config.seed`
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of simulations; overrides `config.num_simulations`
    #[arg(long)]
    pub simulations: Option<u32>,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: MonteCarloRequest =
        input::read_request(args.input.as_deref(), "monte-carlo")?;
    if args.start_date.is_some() {
        request.start_date = args.start_date;
    }
    if let Some(seed) = args.seed {
        request.config.seed = seed;
    }
    if let Some(n) = args.simulations {
        request.config.num_simulations = n;
    }
    let result = simulation::simulate(&request)?;
    Ok(serde_json::to_value(result)?)
}
