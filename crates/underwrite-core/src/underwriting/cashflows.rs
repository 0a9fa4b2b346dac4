use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::assumptions::UnderwritingInputs;
use super::debt_schedule::{add_months, build_debt_schedule, DebtScheduleRow};
use crate::types::{Money, Rate};
use crate::UnderwriteResult;

/// Stand-in cap rate when the configured one is not positive (only possible
/// when an exit multiple drives the sale price).
const VALUATION_CAP_FLOOR: Rate = 1e-6;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One month of the levered projection. Month 0 is the acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashflowRow {
    pub month: u32,
    pub date: NaiveDate,
    pub gross_rent: Money,
    pub vacancy_loss: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    pub interest: Money,
    pub principal: Money,
    pub levered_cf: Money,
    pub exit_proceeds: Money,
    pub estimated_value: Money,
    pub loan_balance: Money,
    /// NOI / debt service; `None` when no debt service is due.
    pub dscr: Option<f64>,
    /// Loan balance / estimated value; `None` when value is not positive.
    pub ltv: Option<f64>,
}

/// Sum of the monthly flow fields for one hold year. Year 0 carries only the
/// initial equity outlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualCashflowRow {
    pub year: u32,
    pub gross_rent: Money,
    pub vacancy_loss: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    pub interest: Money,
    pub principal: Money,
    pub levered_cf: Money,
    pub exit_proceeds: Money,
}

impl AnnualCashflowRow {
    fn accumulate(&mut self, m: &MonthlyCashflowRow) {
        self.gross_rent += m.gross_rent;
        self.vacancy_loss += m.vacancy_loss;
        self.effective_gross_income += m.effective_gross_income;
        self.operating_expenses += m.operating_expenses;
        self.noi += m.noi;
        self.debt_service += m.debt_service;
        self.interest += m.interest;
        self.principal += m.principal;
        self.levered_cf += m.levered_cf;
        self.exit_proceeds += m.exit_proceeds;
    }
}

/// Everything the projector produces for one set of inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowProjection {
    pub monthly: Vec<MonthlyCashflowRow>,
    pub annual: Vec<AnnualCashflowRow>,
    pub debt_schedule: Vec<DebtScheduleRow>,
    pub initial_equity: Money,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Monthly rate that compounds to `annual_growth` over twelve months.
pub fn monthly_growth_rate(annual_growth: Rate) -> Rate {
    (1.0 + annual_growth).powf(1.0 / 12.0) - 1.0
}

/// Hold year (1-based) a projection month falls into.
fn hold_year(month: u32) -> u32 {
    (month - 1) / 12 + 1
}

/// Project monthly and annual levered cash flows over the hold period.
///
/// Rent compounds monthly from the base market rent. Debt flows come from the
/// schedule row of the same month. The final month adds net exit equity:
/// sale price less sales costs less the outstanding loan.
pub fn project_cash_flows(
    inputs: &UnderwritingInputs,
    start_date: NaiveDate,
) -> UnderwriteResult<CashflowProjection> {
    let rental = inputs.rental();
    let financing = inputs.financing();
    let exit = inputs.exit();

    let hold_months = exit.hold_months();
    let purchase_price = inputs.purchase_price();

    let loan_amount = inputs.loan_amount();
    let financing_fee = loan_amount * financing.financing_fee_pct();
    let acquisition_cost_total = inputs.acquisition_costs().total(purchase_price)?;

    let initial_equity = (purchase_price - loan_amount) + acquisition_cost_total + financing_fee;

    let debt_schedule = build_debt_schedule(loan_amount, financing, hold_months, start_date)?;

    let growth_m = monthly_growth_rate(rental.annual_rent_growth());
    let valuation_cap = if exit.exit_cap_rate() > 0.0 {
        exit.exit_cap_rate()
    } else {
        VALUATION_CAP_FLOOR
    };

    let mut monthly = Vec::with_capacity(hold_months as usize + 1);
    monthly.push(MonthlyCashflowRow {
        month: 0,
        date: start_date,
        gross_rent: 0.0,
        vacancy_loss: 0.0,
        effective_gross_income: 0.0,
        operating_expenses: 0.0,
        noi: 0.0,
        debt_service: 0.0,
        interest: 0.0,
        principal: 0.0,
        levered_cf: -initial_equity,
        exit_proceeds: 0.0,
        estimated_value: purchase_price,
        loan_balance: loan_amount,
        dscr: None,
        ltv: Some(loan_amount / purchase_price),
    });

    for debt_row in &debt_schedule {
        let month = debt_row.month;
        let gross_rent = rental.market_rent_monthly() * (1.0 + growth_m).powi(month as i32 - 1);
        let vacancy_loss = gross_rent * rental.vacancy_rate();
        let egi = gross_rent - vacancy_loss;
        let opex = egi * rental.operating_expense_ratio();
        let noi = egi - opex;

        let debt_service = debt_row.payment;
        let loan_balance = debt_row.closing_balance;

        let annualized_noi = noi * 12.0;
        let estimated_value = annualized_noi / valuation_cap;

        let dscr = (debt_service > 0.0).then(|| noi / debt_service);
        let ltv = (estimated_value > 0.0).then(|| loan_balance / estimated_value);

        let mut levered_cf = noi - debt_service;
        let mut exit_proceeds = 0.0;

        if month == hold_months {
            let sale_price = match exit.exit_multiple() {
                Some(multiple) => annualized_noi * multiple,
                None => estimated_value,
            };
            let net_sale_before_debt = sale_price * (1.0 - exit.sales_cost_pct());
            exit_proceeds = net_sale_before_debt - loan_balance;
            levered_cf += exit_proceeds;
        }

        monthly.push(MonthlyCashflowRow {
            month,
            date: add_months(start_date, month)?,
            gross_rent,
            vacancy_loss,
            effective_gross_income: egi,
            operating_expenses: opex,
            noi,
            debt_service,
            interest: debt_row.interest,
            principal: debt_row.principal,
            levered_cf,
            exit_proceeds,
            estimated_value,
            loan_balance,
            dscr,
            ltv,
        });
    }

    let annual = aggregate_annual(&monthly, initial_equity);

    Ok(CashflowProjection {
        monthly,
        annual,
        debt_schedule,
        initial_equity,
    })
}

/// Group months 1..N by hold year and sum the flow fields, behind a synthetic
/// year-0 row holding the equity outlay.
pub fn aggregate_annual(monthly: &[MonthlyCashflowRow], initial_equity: Money) -> Vec<AnnualCashflowRow> {
    let mut annual = vec![AnnualCashflowRow {
        year: 0,
        levered_cf: -initial_equity,
        ..AnnualCashflowRow::default()
    }];

    for row in monthly.iter().filter(|m| m.month > 0) {
        let year = hold_year(row.month);
        match annual.last_mut() {
            Some(last) if last.year == year => last.accumulate(row),
            _ => {
                let mut bucket = AnnualCashflowRow {
                    year,
                    ..AnnualCashflowRow::default()
                };
                bucket.accumulate(row);
                annual.push(bucket);
            }
        }
    }

    annual
}
