use serde::{Deserialize, Serialize};

use super::stamp_duty::residential_stamp_duty;
use crate::error::UnderwriteError;
use crate::types::{Money, Multiple, Rate};
use crate::UnderwriteResult;

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_finite(field: &str, value: f64) -> UnderwriteResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(UnderwriteError::InvalidInput {
            field: field.into(),
            reason: format!("must be a finite number, got {value}"),
        })
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> UnderwriteResult<()> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(UnderwriteError::out_of_range(field, value, min, max));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> UnderwriteResult<()> {
    check_finite(field, value)?;
    if value <= 0.0 {
        return Err(UnderwriteError::InvalidInput {
            field: field.into(),
            reason: format!("must be > 0, got {value}"),
        });
    }
    Ok(())
}

fn check_positive_count(field: &str, value: u32) -> UnderwriteResult<()> {
    if value == 0 {
        return Err(UnderwriteError::InvalidInput {
            field: field.into(),
            reason: "must be > 0, got 0".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Acquisition costs
// ---------------------------------------------------------------------------

fn default_legal_fees() -> Money {
    1_500.0
}

/// One-off costs paid on completion, on top of the purchase price.
///
/// When `stamp_duty` is omitted it is derived from the purchase price using
/// the residential band schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionCosts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp_duty: Option<Money>,
    #[serde(default = "default_legal_fees")]
    pub legal_fees: Money,
    #[serde(default)]
    pub broker_fees: Money,
    #[serde(default)]
    pub other_costs: Money,
}

impl Default for AcquisitionCosts {
    fn default() -> Self {
        Self {
            stamp_duty: None,
            legal_fees: default_legal_fees(),
            broker_fees: 0.0,
            other_costs: 0.0,
        }
    }
}

impl AcquisitionCosts {
    /// Sum of stamp duty, legal, broker and other costs.
    pub fn total(&self, purchase_price: Money) -> UnderwriteResult<Money> {
        let stamp = match self.stamp_duty {
            Some(s) => s,
            None => residential_stamp_duty(purchase_price)?,
        };
        let components = [
            ("stamp_duty", stamp),
            ("legal_fees", self.legal_fees),
            ("broker_fees", self.broker_fees),
            ("other_costs", self.other_costs),
        ];
        for (field, value) in components {
            check_finite(field, value)?;
            if value < 0.0 {
                return Err(UnderwriteError::InvalidInput {
                    field: field.into(),
                    reason: format!("Acquisition cost components must be non-negative, got {value}"),
                });
            }
        }
        Ok(components.iter().map(|(_, v)| v).sum())
    }
}

// ---------------------------------------------------------------------------
// Rental assumptions
// ---------------------------------------------------------------------------

fn default_rent_growth() -> Rate {
    0.02
}
fn default_vacancy() -> Rate {
    0.05
}
fn default_opex_ratio() -> Rate {
    0.30
}

/// Unvalidated rental fields as they arrive from JSON or a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalParams {
    pub market_rent_monthly: Money,
    #[serde(default = "default_rent_growth")]
    pub annual_rent_growth: Rate,
    #[serde(default = "default_vacancy")]
    pub vacancy_rate: Rate,
    #[serde(default = "default_opex_ratio")]
    pub operating_expense_ratio: Rate,
}

/// Validated rental assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RentalParams")]
pub struct RentalAssumptions {
    market_rent_monthly: Money,
    annual_rent_growth: Rate,
    vacancy_rate: Rate,
    operating_expense_ratio: Rate,
}

impl RentalAssumptions {
    pub fn new(
        market_rent_monthly: Money,
        annual_rent_growth: Rate,
        vacancy_rate: Rate,
        operating_expense_ratio: Rate,
    ) -> UnderwriteResult<Self> {
        check_positive("market_rent_monthly", market_rent_monthly)?;
        check_range("annual_rent_growth", annual_rent_growth, -0.25, 0.25)?;
        check_range("vacancy_rate", vacancy_rate, 0.0, 0.95)?;
        check_range("operating_expense_ratio", operating_expense_ratio, 0.0, 0.95)?;
        Ok(Self {
            market_rent_monthly,
            annual_rent_growth,
            vacancy_rate,
            operating_expense_ratio,
        })
    }

    pub fn market_rent_monthly(&self) -> Money {
        self.market_rent_monthly
    }

    pub fn annual_rent_growth(&self) -> Rate {
        self.annual_rent_growth
    }

    pub fn vacancy_rate(&self) -> Rate {
        self.vacancy_rate
    }

    pub fn operating_expense_ratio(&self) -> Rate {
        self.operating_expense_ratio
    }
}

impl TryFrom<RentalParams> for RentalAssumptions {
    type Error = UnderwriteError;

    fn try_from(p: RentalParams) -> UnderwriteResult<Self> {
        Self::new(
            p.market_rent_monthly,
            p.annual_rent_growth,
            p.vacancy_rate,
            p.operating_expense_ratio,
        )
    }
}

// ---------------------------------------------------------------------------
// Financing assumptions
// ---------------------------------------------------------------------------

/// Unvalidated financing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancingParams {
    pub ltv: Rate,
    pub annual_interest_rate: Rate,
    pub amortizing: bool,
    pub term_years: u32,
    pub financing_fee_pct: Rate,
}

impl Default for FinancingParams {
    fn default() -> Self {
        Self {
            ltv: 0.75,
            annual_interest_rate: 0.05,
            amortizing: false,
            term_years: 25,
            financing_fee_pct: 0.01,
        }
    }
}

/// Validated loan terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FinancingParams")]
pub struct FinancingAssumptions {
    ltv: Rate,
    annual_interest_rate: Rate,
    amortizing: bool,
    term_years: u32,
    financing_fee_pct: Rate,
}

impl FinancingAssumptions {
    pub fn new(
        ltv: Rate,
        annual_interest_rate: Rate,
        amortizing: bool,
        term_years: u32,
        financing_fee_pct: Rate,
    ) -> UnderwriteResult<Self> {
        check_range("ltv", ltv, 0.0, 0.95)?;
        check_range("annual_interest_rate", annual_interest_rate, 0.0, 0.25)?;
        check_positive_count("term_years", term_years)?;
        check_range("financing_fee_pct", financing_fee_pct, 0.0, 0.10)?;
        Ok(Self {
            ltv,
            annual_interest_rate,
            amortizing,
            term_years,
            financing_fee_pct,
        })
    }

    pub fn ltv(&self) -> Rate {
        self.ltv
    }

    pub fn annual_interest_rate(&self) -> Rate {
        self.annual_interest_rate
    }

    pub fn amortizing(&self) -> bool {
        self.amortizing
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn term_months(&self) -> u32 {
        self.term_years.saturating_mul(12)
    }

    pub fn financing_fee_pct(&self) -> Rate {
        self.financing_fee_pct
    }
}

impl Default for FinancingAssumptions {
    fn default() -> Self {
        let p = FinancingParams::default();
        Self {
            ltv: p.ltv,
            annual_interest_rate: p.annual_interest_rate,
            amortizing: p.amortizing,
            term_years: p.term_years,
            financing_fee_pct: p.financing_fee_pct,
        }
    }
}

impl TryFrom<FinancingParams> for FinancingAssumptions {
    type Error = UnderwriteError;

    fn try_from(p: FinancingParams) -> UnderwriteResult<Self> {
        Self::new(
            p.ltv,
            p.annual_interest_rate,
            p.amortizing,
            p.term_years,
            p.financing_fee_pct,
        )
    }
}

// ---------------------------------------------------------------------------
// Exit assumptions
// ---------------------------------------------------------------------------

/// Unvalidated exit fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitParams {
    pub hold_years: u32,
    pub exit_cap_rate: Rate,
    pub exit_multiple: Option<Multiple>,
    pub sales_cost_pct: Rate,
}

impl Default for ExitParams {
    fn default() -> Self {
        Self {
            hold_years: 5,
            exit_cap_rate: 0.06,
            exit_multiple: None,
            sales_cost_pct: 0.02,
        }
    }
}

/// Validated exit terms.
///
/// A configured `exit_multiple` (x annualised NOI) takes precedence over
/// cap-rate valuation when pricing the sale. The cap rate is still used for
/// the running estimate of property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExitParams")]
pub struct ExitAssumptions {
    hold_years: u32,
    exit_cap_rate: Rate,
    exit_multiple: Option<Multiple>,
    sales_cost_pct: Rate,
}

impl ExitAssumptions {
    pub fn new(
        hold_years: u32,
        exit_cap_rate: Rate,
        exit_multiple: Option<Multiple>,
        sales_cost_pct: Rate,
    ) -> UnderwriteResult<Self> {
        check_positive_count("hold_years", hold_years)?;
        match exit_multiple {
            Some(m) => {
                check_positive("exit_multiple", m)?;
                check_finite("exit_cap_rate", exit_cap_rate)?;
            }
            None => {
                if !exit_cap_rate.is_finite() || exit_cap_rate <= 0.0 {
                    return Err(UnderwriteError::InvalidInput {
                        field: "exit_cap_rate".into(),
                        reason: format!(
                            "must be > 0 when exit_multiple is unset, got {exit_cap_rate}"
                        ),
                    });
                }
            }
        }
        check_range("sales_cost_pct", sales_cost_pct, 0.0, 0.20)?;
        Ok(Self {
            hold_years,
            exit_cap_rate,
            exit_multiple,
            sales_cost_pct,
        })
    }

    pub fn hold_years(&self) -> u32 {
        self.hold_years
    }

    pub fn hold_months(&self) -> u32 {
        self.hold_years.saturating_mul(12)
    }

    pub fn exit_cap_rate(&self) -> Rate {
        self.exit_cap_rate
    }

    pub fn exit_multiple(&self) -> Option<Multiple> {
        self.exit_multiple
    }

    pub fn sales_cost_pct(&self) -> Rate {
        self.sales_cost_pct
    }
}

impl Default for ExitAssumptions {
    fn default() -> Self {
        let p = ExitParams::default();
        Self {
            hold_years: p.hold_years,
            exit_cap_rate: p.exit_cap_rate,
            exit_multiple: p.exit_multiple,
            sales_cost_pct: p.sales_cost_pct,
        }
    }
}

impl TryFrom<ExitParams> for ExitAssumptions {
    type Error = UnderwriteError;

    fn try_from(p: ExitParams) -> UnderwriteResult<Self> {
        Self::new(p.hold_years, p.exit_cap_rate, p.exit_multiple, p.sales_cost_pct)
    }
}

// ---------------------------------------------------------------------------
// Aggregate bundle
// ---------------------------------------------------------------------------

fn default_discount_rate() -> Rate {
    0.08
}
fn default_hurdle() -> Rate {
    0.12
}

/// Unvalidated top-level bundle. Nested groups are validated as they are
/// deserialized; the cross-field checks run in `UnderwritingInputs::new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingParams {
    pub purchase_price: Money,
    #[serde(default)]
    pub acquisition_costs: AcquisitionCosts,
    pub rental: RentalAssumptions,
    #[serde(default)]
    pub financing: FinancingAssumptions,
    #[serde(default)]
    pub exit: ExitAssumptions,
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Rate,
    #[serde(default = "default_hurdle")]
    pub target_hurdle_irr: Rate,
}

/// Immutable, fully validated snapshot of every assumption a run needs.
///
/// Runs never mutate a snapshot. Stress and simulation drivers derive
/// independent copies through [`UnderwritingInputs::snapshot`] and the
/// crate-private `with_*` overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UnderwritingParams")]
pub struct UnderwritingInputs {
    purchase_price: Money,
    acquisition_costs: AcquisitionCosts,
    rental: RentalAssumptions,
    financing: FinancingAssumptions,
    exit: ExitAssumptions,
    discount_rate: Rate,
    target_hurdle_irr: Rate,
}

impl UnderwritingInputs {
    pub fn new(
        purchase_price: Money,
        acquisition_costs: AcquisitionCosts,
        rental: RentalAssumptions,
        financing: FinancingAssumptions,
        exit: ExitAssumptions,
        discount_rate: Rate,
        target_hurdle_irr: Rate,
    ) -> UnderwriteResult<Self> {
        check_positive("purchase_price", purchase_price)?;
        check_range("discount_rate", discount_rate, -0.50, 0.50)?;
        check_range("target_hurdle_irr", target_hurdle_irr, -0.50, 1.0)?;
        acquisition_costs.total(purchase_price)?;
        Ok(Self {
            purchase_price,
            acquisition_costs,
            rental,
            financing,
            exit,
            discount_rate,
            target_hurdle_irr,
        })
    }

    pub fn purchase_price(&self) -> Money {
        self.purchase_price
    }

    pub fn acquisition_costs(&self) -> &AcquisitionCosts {
        &self.acquisition_costs
    }

    pub fn rental(&self) -> &RentalAssumptions {
        &self.rental
    }

    pub fn financing(&self) -> &FinancingAssumptions {
        &self.financing
    }

    pub fn exit(&self) -> &ExitAssumptions {
        &self.exit
    }

    pub fn discount_rate(&self) -> Rate {
        self.discount_rate
    }

    pub fn target_hurdle_irr(&self) -> Rate {
        self.target_hurdle_irr
    }

    pub fn loan_amount(&self) -> Money {
        self.purchase_price * self.financing.ltv
    }

    /// Independent deep copy. Every field is an owned value, so the copy
    /// shares nothing with `self`.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Preconditions the projection itself depends on.
    ///
    /// Stress overrides may legitimately push a rate past its documented
    /// bound (a +200bp shock on a 24% loan), so this only re-checks what would
    /// make the arithmetic meaningless.
    pub(crate) fn check_computable(&self) -> UnderwriteResult<()> {
        check_positive("purchase_price", self.purchase_price)?;
        check_positive("market_rent_monthly", self.rental.market_rent_monthly)?;
        check_finite("annual_rent_growth", self.rental.annual_rent_growth)?;
        check_finite("vacancy_rate", self.rental.vacancy_rate)?;
        check_finite("operating_expense_ratio", self.rental.operating_expense_ratio)?;
        check_range("ltv", self.financing.ltv, 0.0, 0.95)?;
        check_finite("annual_interest_rate", self.financing.annual_interest_rate)?;
        check_positive_count("term_years", self.financing.term_years)?;
        check_positive_count("hold_years", self.exit.hold_years)?;
        check_finite("exit_cap_rate", self.exit.exit_cap_rate)?;
        check_finite("discount_rate", self.discount_rate)?;
        self.acquisition_costs.total(self.purchase_price)?;
        Ok(())
    }

    #[cfg_attr(not(feature = "scenarios"), allow(dead_code))]
    pub(crate) fn with_interest_rate(&self, annual_interest_rate: Rate) -> Self {
        let mut copy = self.snapshot();
        copy.financing.annual_interest_rate = annual_interest_rate;
        copy
    }

    #[cfg_attr(not(feature = "scenarios"), allow(dead_code))]
    pub(crate) fn with_market_rent(&self, market_rent_monthly: Money) -> Self {
        let mut copy = self.snapshot();
        copy.rental.market_rent_monthly = market_rent_monthly;
        copy
    }

    #[cfg_attr(not(feature = "scenarios"), allow(dead_code))]
    pub(crate) fn with_exit_cap_rate(&self, exit_cap_rate: Rate) -> Self {
        let mut copy = self.snapshot();
        copy.exit.exit_cap_rate = exit_cap_rate;
        copy
    }

    #[cfg(feature = "monte_carlo")]
    pub(crate) fn with_sampled(
        &self,
        annual_rent_growth: Rate,
        vacancy_rate: Rate,
        exit_cap_rate: Rate,
        annual_interest_rate: Rate,
    ) -> Self {
        let mut copy = self.snapshot();
        copy.rental.annual_rent_growth = annual_rent_growth;
        copy.rental.vacancy_rate = vacancy_rate;
        copy.exit.exit_cap_rate = exit_cap_rate;
        copy.financing.annual_interest_rate = annual_interest_rate;
        copy
    }
}

impl TryFrom<UnderwritingParams> for UnderwritingInputs {
    type Error = UnderwriteError;

    fn try_from(p: UnderwritingParams) -> UnderwriteResult<Self> {
        Self::new(
            p.purchase_price,
            p.acquisition_costs,
            p.rental,
            p.financing,
            p.exit,
            p.discount_rate,
            p.target_hurdle_irr,
        )
    }
}
