use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use underwrite_core::underwriting::engine::{self, UnderwriteRequest};

use crate::input;

/// Arguments for a single underwriting run
#[derive(Args)]
pub struct UnderwriteArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// First day of the projection (YYYY-MM-DD); overrides the input file
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

pub fn run_underwrite(args: UnderwriteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: UnderwriteRequest = input::read_request(args.input.as_deref(), "underwrite")?;
    if args.start_date.is_some() {
        request.start_date = args.start_date;
    }
    let result = engine::underwrite(&request)?;
    Ok(serde_json::to_value(result)?)
}
