use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use underwrite_core::scenarios::scenario::{self, ScenarioRequest};

use crate::input;

/// Arguments for the standard stress scenarios
#[derive(Args)]
pub struct ScenariosArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// First day of the projection (YYYY-MM-DD); overrides the input file
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

pub fn run_scenarios(args: ScenariosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ScenarioRequest = input::read_request(args.input.as_deref(), "scenarios")?;
    if args.start_date.is_some() {
        request.start_date = args.start_date;
    }
    let result = scenario::analyze_scenarios(&request)?;
    Ok(serde_json::to_value(result)?)
}
