use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::*;
use crate::underwriting::assumptions::UnderwritingInputs;
use crate::underwriting::engine::{default_start_date, UnderwritingEngine};
use crate::underwriting::metrics::UnderwritingMetrics;
use crate::UnderwriteResult;

pub const RATE_SHOCK_BPS: [u32; 3] = [50, 100, 200];
pub const RENT_COMPRESSION_PCT: [u32; 3] = [5, 10, 15];
pub const EXIT_YIELD_EXPANSION_BPS: [u32; 3] = [25, 50, 100];

/// One deterministic perturbation of the base case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stress {
    /// Add basis points to the loan interest rate
    RateShock { bps: u32 },
    /// Cut market rent by a whole percentage
    RentCompression { pct: u32 },
    /// Add basis points to the exit cap rate
    ExitYieldExpansion { bps: u32 },
}

impl Stress {
    pub fn label(&self) -> String {
        match self {
            Stress::RateShock { bps } => format!("Rate shock +{bps}bp"),
            Stress::RentCompression { pct } => format!("Rent compression -{pct}%"),
            Stress::ExitYieldExpansion { bps } => format!("Exit yield expansion +{bps}bp"),
        }
    }

    /// Stressed copy of `base`. The base snapshot is left untouched.
    pub fn apply(&self, base: &UnderwritingInputs) -> UnderwritingInputs {
        match *self {
            Stress::RateShock { bps } => {
                let rate = base.financing().annual_interest_rate() + bps_to_rate(bps);
                base.with_interest_rate(rate)
            }
            Stress::RentCompression { pct } => {
                let rent = base.rental().market_rent_monthly() * (1.0 - pct as f64 / 100.0);
                base.with_market_rent(rent)
            }
            Stress::ExitYieldExpansion { bps } => {
                base.with_exit_cap_rate(base.exit().exit_cap_rate() + bps_to_rate(bps))
            }
        }
    }
}

fn bps_to_rate(bps: u32) -> Rate {
    bps as f64 / 10_000.0
}

/// The fixed stress set, in reporting order.
pub fn standard_stresses() -> Vec<Stress> {
    RATE_SHOCK_BPS
        .iter()
        .map(|&bps| Stress::RateShock { bps })
        .chain(
            RENT_COMPRESSION_PCT
                .iter()
                .map(|&pct| Stress::RentCompression { pct }),
        )
        .chain(
            EXIT_YIELD_EXPANSION_BPS
                .iter()
                .map(|&bps| Stress::ExitYieldExpansion { bps }),
        )
        .collect()
}

/// Result for a single stressed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub label: String,
    pub irr: Option<Rate>,
    pub npv: Option<Money>,
    pub equity_multiple: Option<Multiple>,
    pub irr_delta: Option<Rate>,
    pub npv_delta: Option<Money>,
}

impl ScenarioRow {
    fn from_metrics(
        label: String,
        metrics: &UnderwritingMetrics,
        base: &UnderwritingMetrics,
    ) -> Self {
        Self {
            label,
            irr: metrics.irr,
            npv: metrics.npv,
            equity_multiple: metrics.equity_multiple,
            irr_delta: metrics.irr.zip(base.irr).map(|(s, b)| s - b),
            npv_delta: metrics.npv.zip(base.npv).map(|(s, b)| s - b),
        }
    }
}

/// Input for the standard stress run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub inputs: UnderwritingInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

/// Output of the standard stress run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub base: UnderwritingMetrics,
    pub scenarios: Vec<ScenarioRow>,
}

/// Base-case metrics plus the nine stressed rows, in fixed order.
fn run_against_base(
    base_inputs: &UnderwritingInputs,
    engine: &UnderwritingEngine,
    start_date: Option<NaiveDate>,
) -> UnderwriteResult<ScenarioOutput> {
    // Every run shares one start date so deltas isolate the stress
    let start_date = start_date.unwrap_or_else(default_start_date);
    let base = engine.run(base_inputs, Some(start_date))?.metrics;

    let scenarios = standard_stresses()
        .into_iter()
        .map(|stress| {
            let result = engine.run(&stress.apply(base_inputs), Some(start_date))?;
            Ok(ScenarioRow::from_metrics(stress.label(), &result.metrics, &base))
        })
        .collect::<UnderwriteResult<Vec<_>>>()?;

    Ok(ScenarioOutput { base, scenarios })
}

/// Rerun the engine under each standard stress and report deltas against a
/// separately computed base case.
pub fn run_standard_scenarios(
    base_inputs: &UnderwritingInputs,
    engine: &UnderwritingEngine,
    start_date: Option<NaiveDate>,
) -> UnderwriteResult<Vec<ScenarioRow>> {
    Ok(run_against_base(base_inputs, engine, start_date)?.scenarios)
}

/// Standard stress run wrapped with warnings and metadata.
pub fn analyze_scenarios(
    request: &ScenarioRequest,
) -> UnderwriteResult<ComputationOutput<ScenarioOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let engine = UnderwritingEngine::new();
    let output = run_against_base(&request.inputs, &engine, request.start_date)?;

    if output.base.irr.is_none() {
        warnings.push("Base case IRR is indeterminate; IRR deltas are unavailable".into());
    }
    for row in &output.scenarios {
        if row.irr.is_none() {
            warnings.push(format!("{}: IRR is indeterminate", row.label));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic Stress Scenarios (rate shock, rent compression, exit yield expansion)",
        &serde_json::json!({
            "rate_shock_bps": RATE_SHOCK_BPS,
            "rent_compression_pct": RENT_COMPRESSION_PCT,
            "exit_yield_expansion_bps": EXIT_YIELD_EXPANSION_BPS,
            "start_date": request.start_date,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::underwriting::assumptions::{
        AcquisitionCosts, ExitAssumptions, FinancingAssumptions, RentalAssumptions,
    };
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn base_inputs() -> UnderwritingInputs {
        UnderwritingInputs::new(
            250_000.0,
            AcquisitionCosts {
                stamp_duty: Some(2_500.0),
                legal_fees: 1_000.0,
                broker_fees: 500.0,
                other_costs: 0.0,
            },
            RentalAssumptions::new(1_450.0, 0.02, 0.05, 0.30).unwrap(),
            FinancingAssumptions::new(0.70, 0.05, false, 25, 0.01).unwrap(),
            ExitAssumptions::new(5, 0.06, None, 0.02).unwrap(),
            0.08,
            0.12,
        )
        .unwrap()
    }

    fn start() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 1, 1)
    }

    #[test]
    fn test_standard_stress_order() {
        let labels: Vec<String> = standard_stresses().iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Rate shock +50bp",
                "Rate shock +100bp",
                "Rate shock +200bp",
                "Rent compression -5%",
                "Rent compression -10%",
                "Rent compression -15%",
                "Exit yield expansion +25bp",
                "Exit yield expansion +50bp",
                "Exit yield expansion +100bp",
            ]
        );
    }

    #[test]
    fn test_stress_apply_does_not_touch_base() {
        let base = base_inputs();
        let shocked = Stress::RateShock { bps: 200 }.apply(&base);
        assert_relative_eq!(
            shocked.financing().annual_interest_rate(),
            0.07,
            max_relative = 1e-12
        );
        assert_eq!(base.financing().annual_interest_rate(), 0.05);

        let compressed = Stress::RentCompression { pct: 10 }.apply(&base);
        assert_relative_eq!(
            compressed.rental().market_rent_monthly(),
            1_305.0,
            max_relative = 1e-12
        );
        assert_eq!(base.rental().market_rent_monthly(), 1_450.0);

        let expanded = Stress::ExitYieldExpansion { bps: 25 }.apply(&base);
        assert_relative_eq!(
            expanded.exit().exit_cap_rate(),
            0.0625,
            max_relative = 1e-12
        );
        assert_eq!(base.exit().exit_cap_rate(), 0.06);
    }

    #[test]
    fn test_nine_rows_with_deltas() {
        let base = base_inputs();
        let rows = run_standard_scenarios(&base, &UnderwritingEngine::new(), start()).unwrap();
        assert_eq!(rows.len(), 9);
        for row in &rows {
            assert!(row.irr_delta.is_some(), "{}", row.label);
            assert!(row.npv_delta.unwrap() < 0.0, "{}", row.label);
        }
        // Base inputs are not mutated by the runner
        assert_eq!(base, base_inputs());
    }

    #[test]
    fn test_deeper_stress_hurts_more() {
        let rows =
            run_standard_scenarios(&base_inputs(), &UnderwritingEngine::new(), start()).unwrap();
        for group in rows.chunks(3) {
            let npv: Vec<f64> = group.iter().map(|r| r.npv.unwrap()).collect();
            assert!(npv[0] > npv[1] && npv[1] > npv[2], "{:?}", group);
        }
    }

    #[test]
    fn test_rate_shock_beyond_documented_bound_still_runs() {
        let base = base_inputs();
        let high_rate = UnderwritingInputs::new(
            base.purchase_price(),
            base.acquisition_costs().clone(),
            base.rental().clone(),
            FinancingAssumptions::new(0.70, 0.24, false, 25, 0.01).unwrap(),
            base.exit().clone(),
            0.08,
            0.12,
        )
        .unwrap();
        let rows =
            run_standard_scenarios(&high_rate, &UnderwritingEngine::new(), start()).unwrap();
        assert_eq!(rows.len(), 9);
    }

    #[test]
    fn test_analyze_scenarios_envelope() {
        let request = ScenarioRequest {
            inputs: base_inputs(),
            start_date: start(),
        };
        let out = analyze_scenarios(&request).unwrap();
        assert_eq!(out.result.scenarios.len(), 9);
        assert!(out.result.base.npv.is_some());
        assert_eq!(out.assumptions["rate_shock_bps"][2], 200);
    }

    #[test]
    fn test_delta_is_none_when_either_side_missing() {
        let base = UnderwritingMetrics {
            irr: None,
            npv: Some(10.0),
            ..Default::default()
        };
        let stressed = UnderwritingMetrics {
            irr: Some(0.05),
            npv: Some(4.0),
            ..Default::default()
        };
        let row = ScenarioRow::from_metrics("x".into(), &stressed, &base);
        assert_eq!(row.irr_delta, None);
        assert_eq!(row.npv_delta, Some(-6.0));
    }
}
