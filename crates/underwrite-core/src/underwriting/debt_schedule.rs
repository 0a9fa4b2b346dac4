use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::assumptions::FinancingAssumptions;
use crate::error::UnderwriteError;
use crate::types::Money;
use crate::UnderwriteResult;

/// A single month in the debt schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtScheduleRow {
    pub month: u32,
    pub date: NaiveDate,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub payment: Money,
    pub closing_balance: Money,
}

/// `start` shifted forward by `months` calendar months, clamped to month end.
pub(crate) fn add_months(start: NaiveDate, months: u32) -> UnderwriteResult<NaiveDate> {
    start
        .checked_add_months(Months::new(months))
        .ok_or_else(|| UnderwriteError::DateError(format!("{start} + {months} months overflows")))
}

/// Level monthly payment that retires `balance` over `term_months`.
fn level_payment(balance: Money, monthly_rate: f64, term_months: u32) -> Money {
    if monthly_rate == 0.0 {
        balance / term_months as f64
    } else {
        balance * monthly_rate / (1.0 - (1.0 + monthly_rate).powf(-(term_months as f64)))
    }
}

/// Build a month-by-month debt schedule.
///
/// Amortizing loans pay a level payment over the contractual term.
/// Interest-only loans pay coupon until term, then a balloon for the full
/// opening balance. Months past the term (or after the balance is retired)
/// accrue nothing, so `months` may run shorter or longer than the loan.
pub fn build_debt_schedule(
    loan_amount: Money,
    financing: &FinancingAssumptions,
    months: u32,
    start_date: NaiveDate,
) -> UnderwriteResult<Vec<DebtScheduleRow>> {
    if !loan_amount.is_finite() || loan_amount < 0.0 {
        return Err(UnderwriteError::InvalidInput {
            field: "loan_amount".into(),
            reason: format!("Loan amount must be non-negative, got {loan_amount}"),
        });
    }
    if months == 0 {
        return Err(UnderwriteError::InvalidInput {
            field: "months".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    let term_months = financing.term_months();
    let monthly_rate = financing.annual_interest_rate() / 12.0;
    let amortizing = financing.amortizing();

    let scheduled_payment = if amortizing && term_months > 0 {
        level_payment(loan_amount, monthly_rate, term_months)
    } else {
        0.0
    };

    let mut rows = Vec::with_capacity(months as usize);
    let mut balance = loan_amount;

    for month in 1..=months {
        let opening_balance = balance;
        let mut interest = 0.0;
        let mut principal = 0.0;

        if month <= term_months && opening_balance > 0.0 {
            interest = opening_balance * monthly_rate;
            principal = if amortizing {
                (scheduled_payment - interest).min(opening_balance)
            } else if month == term_months {
                // Balloon at contractual maturity
                opening_balance
            } else {
                0.0
            };
        }

        let closing_balance = (opening_balance - principal).max(0.0);
        balance = closing_balance;

        rows.push(DebtScheduleRow {
            month,
            date: add_months(start_date, month)?,
            opening_balance,
            interest,
            principal,
            payment: interest + principal,
            closing_balance,
        });
    }

    Ok(rows)
}
