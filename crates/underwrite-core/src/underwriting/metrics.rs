use serde::{Deserialize, Serialize};

use super::cashflows::{AnnualCashflowRow, MonthlyCashflowRow};
use crate::time_value::{compute_irr, compute_npv};
use crate::types::{Money, Multiple, Rate};

/// Headline return metrics. `None` means the metric is indeterminate for
/// this cash-flow shape, not that the run failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnderwritingMetrics {
    /// Annualised levered IRR
    pub irr: Option<Rate>,
    /// Levered NPV at the configured annual discount rate
    pub npv: Option<Money>,
    pub equity_multiple: Option<Multiple>,
    pub cash_on_cash: Option<Rate>,
    pub min_dscr: Option<f64>,
    pub max_ltv: Option<f64>,
}

/// Total distributions over total invested capital.
pub fn equity_multiple(cash_flows: &[Money]) -> Option<Multiple> {
    let invested: Money = -cash_flows.iter().filter(|cf| **cf < 0.0).sum::<Money>();
    let returned: Money = cash_flows.iter().filter(|cf| **cf > 0.0).sum();
    if invested <= 0.0 {
        return None;
    }
    Some(returned / invested)
}

/// First-year levered cash flow over initial equity.
pub fn cash_on_cash(year_one_cash_flow: Money, initial_equity: Money) -> Option<Rate> {
    if initial_equity <= 0.0 {
        return None;
    }
    Some(year_one_cash_flow / initial_equity)
}

/// Derive every headline metric from a projected series.
pub fn summarize_metrics(
    monthly: &[MonthlyCashflowRow],
    annual: &[AnnualCashflowRow],
    annual_discount_rate: Rate,
) -> UnderwritingMetrics {
    if monthly.is_empty() {
        return UnderwritingMetrics::default();
    }

    let cfs: Vec<Money> = monthly.iter().map(|m| m.levered_cf).collect();
    let irr = compute_irr(&cfs, 12);
    let npv = compute_npv(&cfs, annual_discount_rate, 12)
        .ok()
        .filter(|v| v.is_finite());
    let em = equity_multiple(&cfs);

    let initial_equity: Money = monthly
        .iter()
        .filter(|m| m.month == 0)
        .map(|m| m.levered_cf)
        .sum::<Money>()
        .abs();
    let year_one_cf: Money = annual
        .iter()
        .filter(|a| a.year == 1)
        .map(|a| a.levered_cf)
        .sum();
    let coc = cash_on_cash(year_one_cf, initial_equity);

    let min_dscr = monthly
        .iter()
        .filter_map(|m| m.dscr)
        .filter(|v| !v.is_nan())
        .reduce(f64::min);
    let max_ltv = monthly
        .iter()
        .filter_map(|m| m.ltv)
        .filter(|v| !v.is_nan())
        .reduce(f64::max);

    UnderwritingMetrics {
        irr,
        npv,
        equity_multiple: em,
        cash_on_cash: coc,
        min_dscr,
        max_ltv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn month_row(month: u32, levered_cf: f64, dscr: Option<f64>, ltv: Option<f64>) -> MonthlyCashflowRow {
        MonthlyCashflowRow {
            month,
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            gross_rent: 0.0,
            vacancy_loss: 0.0,
            effective_gross_income: 0.0,
            operating_expenses: 0.0,
            noi: 0.0,
            debt_service: 0.0,
            interest: 0.0,
            principal: 0.0,
            levered_cf,
            exit_proceeds: 0.0,
            estimated_value: 0.0,
            loan_balance: 0.0,
            dscr,
            ltv,
        }
    }

    #[test]
    fn test_equity_multiple_basic() {
        // 140 returned on 100 invested
        assert_relative_eq!(equity_multiple(&[-100.0, 20.0, 120.0]).unwrap(), 1.4);
    }

    #[test]
    fn test_equity_multiple_no_investment() {
        assert!(equity_multiple(&[10.0, 20.0]).is_none());
        assert!(equity_multiple(&[]).is_none());
    }

    #[test]
    fn test_cash_on_cash() {
        assert_relative_eq!(cash_on_cash(8_000.0, 100_000.0).unwrap(), 0.08);
        assert!(cash_on_cash(8_000.0, 0.0).is_none());
        assert!(cash_on_cash(8_000.0, -1.0).is_none());
    }

    #[test]
    fn test_summarize_empty_series_is_all_none() {
        let metrics = summarize_metrics(&[], &[], 0.08);
        assert_eq!(metrics, UnderwritingMetrics::default());
    }

    #[test]
    fn test_summarize_min_dscr_max_ltv_skip_none() {
        let monthly = vec![
            month_row(0, -100.0, None, Some(0.7)),
            month_row(1, 5.0, Some(1.4), Some(0.68)),
            month_row(2, 5.0, None, None),
            month_row(3, 120.0, Some(1.2), Some(0.72)),
        ];
        let annual = vec![
            AnnualCashflowRow {
                year: 0,
                levered_cf: -100.0,
                ..Default::default()
            },
            AnnualCashflowRow {
                year: 1,
                levered_cf: 130.0,
                ..Default::default()
            },
        ];
        let metrics = summarize_metrics(&monthly, &annual, 0.08);
        assert_eq!(metrics.min_dscr, Some(1.2));
        assert_eq!(metrics.max_ltv, Some(0.72));
        assert_relative_eq!(metrics.cash_on_cash.unwrap(), 1.3);
        assert_relative_eq!(metrics.equity_multiple.unwrap(), 1.3);
        assert!(metrics.irr.unwrap() > 0.0);
        assert!(metrics.npv.unwrap() > 0.0);
    }

    #[test]
    fn test_summarize_without_debt_has_no_dscr() {
        let monthly = vec![month_row(0, -100.0, None, None), month_row(1, 50.0, None, None)];
        let metrics = summarize_metrics(&monthly, &[], 0.0);
        assert_eq!(metrics.min_dscr, None);
        assert_eq!(metrics.max_ltv, None);
        // No year-1 row: treated as zero year-one cash flow
        assert_eq!(metrics.cash_on_cash, Some(0.0));
        // Loses money: IRR is negative, NPV is the plain sum at 0%
        assert!(metrics.irr.unwrap() < 0.0);
        assert_relative_eq!(metrics.npv.unwrap(), -50.0);
    }
}
