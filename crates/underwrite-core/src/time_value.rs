use crate::error::UnderwriteError;
use crate::types::{Money, Rate};
use crate::UnderwriteResult;

const CONVERGENCE_THRESHOLD: f64 = 1e-7;
const MAX_IRR_ITERATIONS: u32 = 200;

const IRR_LOWER_BOUND: Rate = -0.9999;
const IRR_INITIAL_UPPER_BOUND: Rate = 1.0;
const MAX_BRACKET_EXPANSIONS: u32 = 25;
const BRACKET_UPPER_CAP: Rate = 100.0;

/// Periodic rate equivalent to `annual_rate` when compounded
/// `periods_per_year` times.
pub fn periodic_rate(annual_rate: Rate, periods_per_year: u32) -> Rate {
    (1.0 + annual_rate).powf(1.0 / periods_per_year as f64) - 1.0
}

/// Present value of `cash_flows` (t = 0, 1, ...) at a periodic rate.
fn npv_at_rate(cash_flows: &[Money], rate: Rate) -> Money {
    let one_plus_r = 1.0 + rate;
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / one_plus_r.powi(t as i32))
        .sum()
}

/// NPV for root finding. Below 0% the plain sum can overflow on long series
/// ((1+r)^t underflows to zero), so it falls back to NPV * (1+r)^N, which has
/// the same sign and stays finite.
fn npv_for_bracket(cash_flows: &[Money], rate: Rate) -> Money {
    let plain = npv_at_rate(cash_flows, rate);
    if plain.is_finite() || rate >= 0.0 {
        return plain;
    }
    let one_plus_r = 1.0 + rate;
    let last = cash_flows.len().saturating_sub(1);
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf * one_plus_r.powi((last - t) as i32))
        .sum()
}

/// Net Present Value with an annual discount rate converted to the
/// periodicity of the cash flows.
pub fn compute_npv(
    cash_flows: &[Money],
    annual_discount_rate: Rate,
    periods_per_year: u32,
) -> UnderwriteResult<Money> {
    if periods_per_year == 0 {
        return Err(UnderwriteError::InvalidInput {
            field: "periods_per_year".into(),
            reason: "Periods per year must be > 0".into(),
        });
    }
    let rate = periodic_rate(annual_discount_rate, periods_per_year);
    Ok(npv_at_rate(cash_flows, rate))
}

/// Internal Rate of Return by bounded bisection, annualised.
///
/// The bracket starts at [-0.9999, 1.0]; the upper bound doubles (at most 25
/// times, and only while below 100) until the NPV changes sign. Returns
/// `None` when the flows are single-signed, no bracket is found, or the
/// iteration budget runs out.
pub fn compute_irr(cash_flows: &[Money], periods_per_year: u32) -> Option<Rate> {
    if cash_flows.is_empty() || periods_per_year == 0 {
        return None;
    }
    if cash_flows.iter().all(|cf| *cf >= 0.0) || cash_flows.iter().all(|cf| *cf <= 0.0) {
        return None;
    }

    let mut low = IRR_LOWER_BOUND;
    let mut high = IRR_INITIAL_UPPER_BOUND;
    let mut f_low = npv_for_bracket(cash_flows, low);
    let mut f_high = npv_for_bracket(cash_flows, high);

    let mut expansions = 0;
    while f_low * f_high > 0.0 && high < BRACKET_UPPER_CAP && expansions < MAX_BRACKET_EXPANSIONS {
        high *= 2.0;
        f_high = npv_for_bracket(cash_flows, high);
        expansions += 1;
    }

    let product = f_low * f_high;
    if product > 0.0 || product.is_nan() {
        log::debug!("IRR: no sign change in [{low}, {high}] after {expansions} expansions");
        return None;
    }

    for _ in 0..MAX_IRR_ITERATIONS {
        let mid = (low + high) / 2.0;
        let f_mid = npv_for_bracket(cash_flows, mid);
        if f_mid.abs() < CONVERGENCE_THRESHOLD {
            return Some((1.0 + mid).powi(periods_per_year as i32) - 1.0);
        }
        if f_low * f_mid <= 0.0 {
            high = mid;
            f_high = f_mid;
        } else {
            low = mid;
            f_low = f_mid;
        }
    }

    log::debug!(
        "IRR: bisection did not converge after {MAX_IRR_ITERATIONS} iterations \
         (bracket [{low}, {high}], npv {f_low}..{f_high})"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_npv_basic() {
        let cfs = [-100.0, 60.0, 60.0];
        let result = compute_npv(&cfs, 0.10, 1).unwrap();
        // -100 + 60/1.1 + 60/1.21
        assert_relative_eq!(result, 4.1322314, max_relative = 1e-6);
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = [-100.0, 50.0, 50.0, 50.0];
        assert_relative_eq!(compute_npv(&cfs, 0.0, 12).unwrap(), 50.0);
    }

    #[test]
    fn test_npv_monthly_matches_annual_compounding() {
        // 12 months at the monthly equivalent of 10% == one year at 10%
        let mut cfs = vec![0.0; 13];
        cfs[12] = 110.0;
        assert_relative_eq!(compute_npv(&cfs, 0.10, 12).unwrap(), 100.0, max_relative = 1e-12);
    }

    #[test]
    fn test_npv_zero_periods_rejected() {
        assert!(compute_npv(&[-1.0, 2.0], 0.1, 0).is_err());
    }

    #[test]
    fn test_npv_empty_is_zero() {
        assert_eq!(compute_npv(&[], 0.1, 12).unwrap(), 0.0);
    }

    #[test]
    fn test_irr_basic() {
        let cfs = [-100.0, 60.0, 60.0];
        let result = compute_irr(&cfs, 1).unwrap();
        assert_relative_eq!(result, 0.130662, max_relative = 1e-4);
    }

    #[test]
    fn test_irr_annualises_monthly_root() {
        // 1% per month for one month -> 12.68% annualised
        let cfs = [-100.0, 101.0];
        let result = compute_irr(&cfs, 12).unwrap();
        assert_relative_eq!(result, 1.01_f64.powi(12) - 1.0, max_relative = 1e-6);
    }

    #[test]
    fn test_irr_negative_return() {
        let cfs = [-100.0, 50.0];
        let result = compute_irr(&cfs, 1).unwrap();
        assert_relative_eq!(result, -0.5, max_relative = 1e-6);
    }

    #[test]
    fn test_irr_requires_bracket_expansion() {
        // 300% periodic return sits above the initial upper bound of 1.0
        let cfs = [-100.0, 400.0];
        let result = compute_irr(&cfs, 1).unwrap();
        assert_relative_eq!(result, 3.0, max_relative = 1e-6);
    }

    #[test]
    fn test_irr_single_signed_is_none() {
        assert!(compute_irr(&[100.0, 50.0], 12).is_none());
        assert!(compute_irr(&[-100.0, -50.0], 12).is_none());
        assert!(compute_irr(&[0.0, 0.0], 12).is_none());
        assert!(compute_irr(&[], 12).is_none());
    }

    #[test]
    fn test_irr_ten_year_negative_carry() {
        // 119 months of small negative carry, exit in month 120
        let mut cfs = vec![-60_000.0];
        cfs.extend(std::iter::repeat(-50.0).take(119));
        cfs.push(150_000.0);
        assert!(npv_at_rate(&cfs, IRR_LOWER_BOUND).is_nan());

        let irr = compute_irr(&cfs, 12).unwrap();
        assert!(irr > 0.0);
        let residual = compute_npv(&cfs, irr, 12).unwrap();
        assert!(residual.abs() < 1e-4, "npv at irr = {residual}");
    }

    #[test]
    fn test_bracket_npv_keeps_sign_below_zero() {
        let mut cfs = vec![-1.0; 200];
        cfs.push(10.0);
        assert!(npv_for_bracket(&cfs, IRR_LOWER_BOUND) > 0.0);
        let short = [-100.0, 60.0, 60.0];
        assert_eq!(npv_for_bracket(&short, 0.1), npv_at_rate(&short, 0.1));
    }

    #[test]
    fn test_irr_zero_periods_is_none() {
        assert!(compute_irr(&[-100.0, 110.0], 0).is_none());
    }
}
