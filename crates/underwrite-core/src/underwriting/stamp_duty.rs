use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::UnderwriteError;
use crate::types::Money;
use crate::UnderwriteResult;

/// Residential bands: (upper bound of the band, marginal rate).
/// `None` marks the open-ended top band.
const RESIDENTIAL_BANDS: [(Option<Decimal>, Decimal); 4] = [
    (Some(dec!(250000)), dec!(0.00)),
    (Some(dec!(925000)), dec!(0.05)),
    (Some(dec!(1500000)), dec!(0.10)),
    (None, dec!(0.12)),
];

/// Simplified progressive residential stamp duty.
///
/// Standard residential banding only: no first-time buyer relief and no
/// additional-dwelling surcharge. Band arithmetic is done in `Decimal` so
/// prices sitting exactly on a threshold are taxed without drift.
pub fn residential_stamp_duty(purchase_price: Money) -> UnderwriteResult<Money> {
    if !purchase_price.is_finite() || purchase_price < 0.0 {
        return Err(UnderwriteError::InvalidInput {
            field: "purchase_price".into(),
            reason: format!("Purchase price must be non-negative, got {purchase_price}"),
        });
    }

    let price = Decimal::from_f64(purchase_price).ok_or_else(|| UnderwriteError::InvalidInput {
        field: "purchase_price".into(),
        reason: format!("{purchase_price} cannot be represented for band arithmetic"),
    })?;

    let mut remaining = price;
    let mut lower = Decimal::ZERO;
    let mut duty = Decimal::ZERO;

    for (upper, rate) in RESIDENTIAL_BANDS {
        let taxable = match upper {
            Some(u) => remaining.min(u - lower).max(Decimal::ZERO),
            None => remaining.max(Decimal::ZERO),
        };
        duty += taxable * rate;
        remaining -= taxable;
        if let Some(u) = upper {
            lower = u;
        }
        if remaining <= Decimal::ZERO {
            break;
        }
    }

    duty.to_f64().ok_or_else(|| UnderwriteError::InvalidInput {
        field: "purchase_price".into(),
        reason: "stamp duty overflowed".into(),
    })
}
