use clap::Args;
use serde_json::{json, Value};

use underwrite_core::underwriting::stamp_duty::residential_stamp_duty;

/// Arguments for the stamp duty calculator
#[derive(Args)]
pub struct StampDutyArgs {
    /// Purchase price
    #[arg(long)]
    pub price: f64,
}

pub fn run_stamp_duty(args: StampDutyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let duty = residential_stamp_duty(args.price)?;
    let effective_rate = if args.price > 0.0 { duty / args.price } else { 0.0 };
    Ok(json!({
        "result": {
            "purchase_price": args.price,
            "stamp_duty": duty,
            "effective_rate": effective_rate,
        },
        "methodology": "Progressive residential bands: 0% to 250k, 5% to 925k, 10% to 1.5m, 12% above",
        "warnings": [],
    }))
}
