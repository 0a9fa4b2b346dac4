use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::assumptions::UnderwritingInputs;
use super::cashflows::{project_cash_flows, AnnualCashflowRow, MonthlyCashflowRow};
use super::debt_schedule::DebtScheduleRow;
use super::metrics::{summarize_metrics, UnderwritingMetrics};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::UnderwriteResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Full output of one underwriting run. Owned by the caller; nothing in it is
/// shared with the engine or with other runs.
///
/// Export only: stress runs record their perturbed inputs in `assumptions`,
/// which may sit outside the bounds the input constructors accept, so the
/// result is serialized but never read back.
#[derive(Debug, Clone, Serialize)]
pub struct UnderwritingResult {
    pub monthly_cash_flows: Vec<MonthlyCashflowRow>,
    pub annual_cash_flows: Vec<AnnualCashflowRow>,
    pub debt_schedule: Vec<DebtScheduleRow>,
    pub metrics: UnderwritingMetrics,
    pub initial_equity: Money,
    /// The exact inputs this result was computed from
    pub assumptions: UnderwritingInputs,
}

impl UnderwritingResult {
    /// JSON export: dates as ISO-8601 strings, missing or NaN numbers as null.
    pub fn to_json(&self) -> UnderwriteResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Input envelope for [`underwrite`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwriteRequest {
    pub inputs: UnderwritingInputs,
    /// First day of the projection; defaults to the first of the current month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// First day of the current month (local clock).
pub fn default_start_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today.with_day(1).unwrap_or(today)
}

/// Debt schedule -> cash-flow projection -> return metrics.
///
/// Stateless: a run is a pure function of its inputs and start date.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnderwritingEngine;

impl UnderwritingEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn run(
        &self,
        inputs: &UnderwritingInputs,
        start_date: Option<NaiveDate>,
    ) -> UnderwriteResult<UnderwritingResult> {
        inputs.check_computable()?;
        let start_date = start_date.unwrap_or_else(default_start_date);

        let projection = project_cash_flows(inputs, start_date)?;
        let metrics = summarize_metrics(
            &projection.monthly,
            &projection.annual,
            inputs.discount_rate(),
        );

        log::trace!(
            "underwriting run: {} months from {start_date}, irr={:?} npv={:?}",
            projection.monthly.len().saturating_sub(1),
            metrics.irr,
            metrics.npv
        );

        Ok(UnderwritingResult {
            monthly_cash_flows: projection.monthly,
            annual_cash_flows: projection.annual,
            debt_schedule: projection.debt_schedule,
            metrics,
            initial_equity: projection.initial_equity,
            assumptions: inputs.snapshot(),
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a single underwriting and wrap it with warnings and metadata.
pub fn underwrite(
    request: &UnderwriteRequest,
) -> UnderwriteResult<ComputationOutput<UnderwritingResult>> {
    let start = Instant::now();
    let engine = UnderwritingEngine::new();
    let result = engine.run(&request.inputs, request.start_date)?;
    let warnings = collect_warnings(&result);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Levered Real Estate Underwriting (Monthly DCF)",
        &request.inputs,
        warnings,
        elapsed,
        result,
    ))
}

fn collect_warnings(result: &UnderwritingResult) -> Vec<String> {
    let mut warnings = Vec::new();
    let inputs = &result.assumptions;

    if inputs.rental().vacancy_rate() > 0.15 {
        warnings.push(format!(
            "Vacancy rate {:.1}% exceeds 15% — above typical market norms",
            inputs.rental().vacancy_rate() * 100.0
        ));
    }

    if let Some(multiple) = inputs.exit().exit_multiple() {
        warnings.push(format!(
            "Exit priced at {multiple}x annualised NOI; cap rate only drives the running value estimate"
        ));
    }

    if let Some(dscr) = result.metrics.min_dscr {
        if dscr < 1.0 {
            warnings.push(format!(
                "Minimum DSCR {dscr:.2}x is below 1.00x — NOI does not cover debt service"
            ));
        }
    }

    match result.metrics.irr {
        None => warnings.push(
            "IRR is indeterminate: cash flows do not bracket a root or the solver did not converge"
                .into(),
        ),
        Some(irr) if irr < inputs.target_hurdle_irr() => warnings.push(format!(
            "IRR {:.2}% is below the {:.2}% hurdle",
            irr * 100.0,
            inputs.target_hurdle_irr() * 100.0
        )),
        Some(_) => {}
    }

    warnings
}
