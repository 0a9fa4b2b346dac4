use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::UnderwriteError;
use crate::types::*;
use crate::underwriting::assumptions::UnderwritingInputs;
use crate::underwriting::engine::{default_start_date, UnderwritingEngine};
use crate::UnderwriteResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Clip bounds applied to every sampled value
pub const RENT_GROWTH_BOUNDS: (Rate, Rate) = (-0.20, 0.20);
pub const VACANCY_BOUNDS: (Rate, Rate) = (0.01, 0.35);
pub const EXIT_CAP_BOUNDS: (Rate, Rate) = (0.03, 0.20);
pub const INTEREST_RATE_BOUNDS: (Rate, Rate) = (0.0, 0.20);

fn default_num_simulations() -> u32 {
    2_000
}
fn default_seed() -> u64 {
    42
}
fn default_rent_growth_std() -> f64 {
    0.01
}
fn default_vacancy_std() -> f64 {
    0.015
}
fn default_exit_cap_std() -> f64 {
    0.005
}
fn default_interest_rate_std() -> f64 {
    0.0075
}

/// Sampling configuration. Each std is the standard deviation of a Normal
/// centred on the corresponding base-case value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_rent_growth_std")]
    pub rent_growth_std: f64,
    #[serde(default = "default_vacancy_std")]
    pub vacancy_std: f64,
    #[serde(default = "default_exit_cap_std")]
    pub exit_cap_std: f64,
    #[serde(default = "default_interest_rate_std")]
    pub interest_rate_std: f64,
    /// Falls back to the inputs' target hurdle IRR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hurdle_irr: Option<Rate>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_simulations: default_num_simulations(),
            seed: default_seed(),
            rent_growth_std: default_rent_growth_std(),
            vacancy_std: default_vacancy_std(),
            exit_cap_std: default_exit_cap_std(),
            interest_rate_std: default_interest_rate_std(),
            hurdle_irr: None,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> UnderwriteResult<()> {
        if self.num_simulations < 1 {
            return Err(UnderwriteError::InvalidInput {
                field: "num_simulations".into(),
                reason: "Must be at least 1".into(),
            });
        }
        for (field, std) in [
            ("rent_growth_std", self.rent_growth_std),
            ("vacancy_std", self.vacancy_std),
            ("exit_cap_std", self.exit_cap_std),
            ("interest_rate_std", self.interest_rate_std),
        ] {
            if !std.is_finite() || std < 0.0 {
                return Err(UnderwriteError::InvalidInput {
                    field: field.into(),
                    reason: format!("must be a finite number >= 0, got {std}"),
                });
            }
        }
        if let Some(hurdle) = self.hurdle_irr {
            if !hurdle.is_finite() || !(-0.5..=1.0).contains(&hurdle) {
                return Err(UnderwriteError::out_of_range("hurdle_irr", hurdle, -0.5, 1.0));
            }
        }
        Ok(())
    }
}

/// One simulated path: the sampled drivers and the resulting metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloRecord {
    /// 1-based
    pub simulation: u32,
    pub rent_growth: Rate,
    pub vacancy: Rate,
    pub exit_cap_rate: Rate,
    pub interest_rate: Rate,
    pub irr: Option<Rate>,
    pub npv: Option<Money>,
}

/// Distribution summary over the non-null metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub irr_p5: Option<Rate>,
    pub irr_p50: Option<Rate>,
    pub irr_p95: Option<Rate>,
    pub npv_p5: Option<Money>,
    pub npv_p50: Option<Money>,
    pub npv_p95: Option<Money>,
    pub prob_irr_below_zero: Option<f64>,
    pub prob_irr_below_hurdle: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloOutput {
    pub summary: MonteCarloSummary,
    pub simulations: Vec<MonteCarloRecord>,
}

/// Input for [`simulate`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloRequest {
    pub inputs: UnderwritingInputs,
    #[serde(default)]
    pub config: MonteCarloConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Generator for one iteration. Keyed by index so a path never depends on
/// which thread ran it or in what order.
fn iteration_rng(seed: u64, simulation: u32) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(simulation as u64);
    rng
}

/// Normal(mean, std) clipped to `bounds`. A zero std returns the clipped mean.
fn sample_clipped(
    rng: &mut ChaCha8Rng,
    field: &str,
    mean: f64,
    std: f64,
    bounds: (f64, f64),
) -> UnderwriteResult<f64> {
    let value = if std > 0.0 {
        let normal = Normal::new(mean, std).map_err(|e| UnderwriteError::InvalidInput {
            field: field.into(),
            reason: format!("Invalid Normal parameters: {e}"),
        })?;
        rng.sample(normal)
    } else {
        mean
    };
    Ok(value.clamp(bounds.0, bounds.1))
}

fn run_iteration(
    base: &UnderwritingInputs,
    config: &MonteCarloConfig,
    engine: &UnderwritingEngine,
    start_date: NaiveDate,
    simulation: u32,
) -> UnderwriteResult<MonteCarloRecord> {
    let mut rng = iteration_rng(config.seed, simulation);

    let rent_growth = sample_clipped(
        &mut rng,
        "rent_growth_std",
        base.rental().annual_rent_growth(),
        config.rent_growth_std,
        RENT_GROWTH_BOUNDS,
    )?;
    let vacancy = sample_clipped(
        &mut rng,
        "vacancy_std",
        base.rental().vacancy_rate(),
        config.vacancy_std,
        VACANCY_BOUNDS,
    )?;
    let exit_cap_rate = sample_clipped(
        &mut rng,
        "exit_cap_std",
        base.exit().exit_cap_rate(),
        config.exit_cap_std,
        EXIT_CAP_BOUNDS,
    )?;
    let interest_rate = sample_clipped(
        &mut rng,
        "interest_rate_std",
        base.financing().annual_interest_rate(),
        config.interest_rate_std,
        INTEREST_RATE_BOUNDS,
    )?;

    let inputs = base.with_sampled(rent_growth, vacancy, exit_cap_rate, interest_rate);
    let metrics = engine.run(&inputs, Some(start_date))?.metrics;

    Ok(MonteCarloRecord {
        simulation,
        rent_growth,
        vacancy,
        exit_cap_rate,
        interest_rate,
        irr: metrics.irr,
        npv: metrics.npv,
    })
}

fn run_iterations(
    base: &UnderwritingInputs,
    config: &MonteCarloConfig,
    engine: &UnderwritingEngine,
    start_date: NaiveDate,
) -> UnderwriteResult<Vec<MonteCarloRecord>> {
    #[cfg(feature = "parallel")]
    {
        (1..=config.num_simulations)
            .into_par_iter()
            .map(|i| run_iteration(base, config, engine, start_date, i))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (1..=config.num_simulations)
            .map(|i| run_iteration(base, config, engine, start_date, i))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Percentile of a **sorted** slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        len => {
            let rank = p / 100.0 * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            Some(sorted[lower] * (1.0 - frac) + sorted[upper] * frac)
        }
    }
}

fn sorted_finite(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    let mut out: Vec<f64> = values.flatten().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

fn share_below(sorted: &[f64], threshold: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let below = sorted.iter().filter(|v| **v < threshold).count();
    Some(below as f64 / sorted.len() as f64)
}

/// Summary statistics over the non-null IRRs and NPVs of `records`.
pub fn summarize_simulations(records: &[MonteCarloRecord], hurdle_irr: Rate) -> MonteCarloSummary {
    let irrs = sorted_finite(records.iter().map(|r| r.irr));
    let npvs = sorted_finite(records.iter().map(|r| r.npv));

    MonteCarloSummary {
        irr_p5: percentile_sorted(&irrs, 5.0),
        irr_p50: percentile_sorted(&irrs, 50.0),
        irr_p95: percentile_sorted(&irrs, 95.0),
        npv_p5: percentile_sorted(&npvs, 5.0),
        npv_p50: percentile_sorted(&npvs, 50.0),
        npv_p95: percentile_sorted(&npvs, 95.0),
        prob_irr_below_zero: share_below(&irrs, 0.0),
        prob_irr_below_hurdle: share_below(&irrs, hurdle_irr),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Rerun the engine `num_simulations` times on sampled copies of `base`.
///
/// Rent growth, vacancy, exit cap rate and interest rate are drawn from
/// Normals centred on the base values and clipped to fixed bounds. Every
/// iteration owns a ChaCha stream keyed by its index, so the output depends
/// only on the seed.
pub fn run_monte_carlo(
    base: &UnderwritingInputs,
    config: &MonteCarloConfig,
    engine: &UnderwritingEngine,
    start_date: Option<NaiveDate>,
) -> UnderwriteResult<MonteCarloOutput> {
    config.validate()?;
    base.check_computable()?;
    let start_date = start_date.unwrap_or_else(default_start_date);

    log::debug!(
        "monte carlo: {} simulations, seed {}, start {start_date}",
        config.num_simulations,
        config.seed
    );

    let simulations = run_iterations(base, config, engine, start_date)?;
    let hurdle = config.hurdle_irr.unwrap_or(base.target_hurdle_irr());
    let summary = summarize_simulations(&simulations, hurdle);

    log::debug!(
        "monte carlo: done, irr p50 {:?}, npv p50 {:?}",
        summary.irr_p50,
        summary.npv_p50
    );

    Ok(MonteCarloOutput {
        summary,
        simulations,
    })
}

/// Monte Carlo run wrapped with warnings and metadata.
pub fn simulate(request: &MonteCarloRequest) -> UnderwriteResult<ComputationOutput<MonteCarloOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = run_monte_carlo(
        &request.inputs,
        &request.config,
        &UnderwritingEngine::new(),
        request.start_date,
    )?;

    let n = output.simulations.len();
    let missing_irr = output.simulations.iter().filter(|r| r.irr.is_none()).count();
    let missing_npv = output.simulations.iter().filter(|r| r.npv.is_none()).count();
    if missing_irr > 0 {
        warnings.push(format!(
            "{missing_irr} of {n} simulations have an indeterminate IRR and are excluded from IRR statistics"
        ));
    }
    if missing_npv > 0 {
        warnings.push(format!(
            "{missing_npv} of {n} simulations have no NPV and are excluded from NPV statistics"
        ));
    }

    let hurdle = request
        .config
        .hurdle_irr
        .unwrap_or(request.inputs.target_hurdle_irr());
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo Underwriting (clipped Normal drivers, ChaCha8 per-path streams)",
        &serde_json::json!({
            "num_simulations": request.config.num_simulations,
            "seed": request.config.seed,
            "rent_growth_std": request.config.rent_growth_std,
            "vacancy_std": request.config.vacancy_std,
            "exit_cap_std": request.config.exit_cap_std,
            "interest_rate_std": request.config.interest_rate_std,
            "hurdle_irr": hurdle,
            "start_date": request.start_date,
        }),
        warnings,
        elapsed,
        output,
    ))
}
