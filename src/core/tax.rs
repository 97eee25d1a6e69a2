use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::ZatcaError;

/// Saudi standard VAT rate (15%).
pub const STANDARD_VAT_RATE: Decimal = dec!(0.15);

/// Share of the tax attributed to the seller.
pub const DEFAULT_SELLER_SHARE: Decimal = dec!(0.15);

/// Result of [`calculate_tax`]. Every amount carries exactly 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub tax: Decimal,
    pub seller_tax: Decimal,
    pub net_total: Decimal,
}

/// Compute tax, seller tax and net total.
///
/// `tax = total × tax_rate`, `seller_tax = tax × seller_share`,
/// `net_total = total − seller_tax − tax`. All three are computed at full
/// precision and rounded independently, half-up, to 2 places.
///
/// The net total subtracts both the tax and the seller's share of it. This
/// is the convention the persisted data follows and is kept as-is.
///
/// ```
/// use fatura::core::calculate_tax;
/// use rust_decimal_macros::dec;
///
/// let t = calculate_tax(dec!(100.00), dec!(0.15), dec!(0.15)).unwrap();
/// assert_eq!(t.tax, dec!(15.00));
/// assert_eq!(t.seller_tax, dec!(2.25));
/// assert_eq!(t.net_total, dec!(82.75));
/// ```
pub fn calculate_tax(
    total: Decimal,
    tax_rate: Decimal,
    seller_share: Decimal,
) -> Result<TaxBreakdown, ZatcaError> {
    if total.is_sign_negative() && !total.is_zero() {
        return Err(ZatcaError::Arithmetic(format!(
            "total must not be negative, got {total}"
        )));
    }
    if tax_rate.is_sign_negative() && !tax_rate.is_zero() {
        return Err(ZatcaError::Arithmetic(format!(
            "tax rate must not be negative, got {tax_rate}"
        )));
    }
    if seller_share.is_sign_negative() && !seller_share.is_zero() {
        return Err(ZatcaError::Arithmetic(format!(
            "seller share must not be negative, got {seller_share}"
        )));
    }

    let tax = total
        .checked_mul(tax_rate)
        .ok_or_else(|| ZatcaError::Arithmetic("tax overflow".into()))?;
    let seller_tax = tax
        .checked_mul(seller_share)
        .ok_or_else(|| ZatcaError::Arithmetic("seller tax overflow".into()))?;
    let net_total = total
        .checked_sub(seller_tax)
        .and_then(|rest| rest.checked_sub(tax))
        .ok_or_else(|| ZatcaError::Arithmetic("net total overflow".into()))?;

    let breakdown = TaxBreakdown {
        tax: round_money(tax),
        seller_tax: round_money(seller_tax),
        net_total: round_money(net_total),
    };

    if breakdown.net_total.is_sign_negative() && !breakdown.net_total.is_zero() {
        return Err(ZatcaError::Arithmetic(format!(
            "net total would be negative ({}) for rate {tax_rate} and share {seller_share}",
            breakdown.net_total
        )));
    }

    Ok(breakdown)
}

/// Round half-up to 2 places and fix the scale at 2 (`15` → `15.00`).
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
