use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::ZatcaError;
use super::tax::{DEFAULT_SELLER_SHARE, STANDARD_VAT_RATE, calculate_tax, round_money};
use super::types::*;

/// Builder for new invoices. The result is always `Pending`.
///
/// ```
/// use fatura::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::{TimeZone, Utc};
///
/// let invoice = InvoiceBuilder::new("INV-2024-0001", Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
///     .seller(Seller {
///         name: "متجر الرياض".into(),
///         address: "طريق الملك فهد".into(),
///         vat_number: "300000000000003".into(),
///     })
///     .buyer(Buyer { id: "ACC-17".into(), name: "Walk-in".into() })
///     .add_item(ItemBuilder::new("Coffee beans", 2, dec!(50.00)).tax(dec!(15.00)).build().unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(invoice.status, InvoiceStatus::Pending);
/// assert_eq!(invoice.total, dec!(100.00));
/// assert_eq!(invoice.taxes, dec!(15.00));
/// assert_eq!(invoice.net_total, dec!(82.75));
/// ```
pub struct InvoiceBuilder {
    id: Option<Uuid>,
    invoice_number: String,
    issued_at: DateTime<Utc>,
    currency_code: String,
    seller: Option<Seller>,
    buyer: Option<Buyer>,
    items: Vec<InvoiceItem>,
    total: Option<Decimal>,
    tax_rate: Decimal,
    seller_share: Decimal,
    created_at: Option<DateTime<Utc>>,
}

impl InvoiceBuilder {
    pub fn new(invoice_number: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            invoice_number: invoice_number.into(),
            issued_at,
            currency_code: "SAR".to_string(),
            seller: None,
            buyer: None,
            items: Vec::new(),
            total: None,
            tax_rate: STANDARD_VAT_RATE,
            seller_share: DEFAULT_SELLER_SHARE,
            created_at: None,
        }
    }

    /// Use a fixed id instead of a random one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    pub fn seller(mut self, seller: Seller) -> Self {
        self.seller = Some(seller);
        self
    }

    pub fn buyer(mut self, buyer: Buyer) -> Self {
        self.buyer = Some(buyer);
        self
    }

    pub fn add_item(mut self, item: InvoiceItem) -> Self {
        self.items.push(item);
        self
    }

    /// Explicit taxable total. Defaults to the sum of line amounts.
    pub fn total(mut self, total: Decimal) -> Self {
        self.total = Some(total);
        self
    }

    pub fn tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = rate;
        self
    }

    pub fn seller_share(mut self, share: Decimal) -> Self {
        self.seller_share = share;
        self
    }

    /// Override the creation timestamp (selection order is oldest first).
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Build the invoice, computing taxes from the total.
    pub fn build(self) -> Result<Invoice, ZatcaError> {
        let seller = self
            .seller
            .ok_or_else(|| ZatcaError::Builder("seller is required".into()))?;
        let buyer = self
            .buyer
            .ok_or_else(|| ZatcaError::Builder("buyer is required".into()))?;

        if self.invoice_number.len() > 255 {
            return Err(ZatcaError::Builder(
                "invoice number cannot exceed 255 characters".into(),
            ));
        }
        if self.items.len() > 10_000 {
            return Err(ZatcaError::Builder(
                "invoice cannot have more than 10,000 items".into(),
            ));
        }

        let total = match self.total {
            Some(total) => round_money(total),
            None => round_money(sum_line_amounts(&self.items)?),
        };
        let breakdown = calculate_tax(total, self.tax_rate, self.seller_share)?;
        if total.checked_add(breakdown.tax).is_none() {
            return Err(ZatcaError::Arithmetic(format!(
                "total with VAT overflows for total {total}"
            )));
        }

        let now = Utc::now();
        Ok(Invoice {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            invoice_number: self.invoice_number,
            seller,
            buyer,
            issued_at: self.issued_at,
            currency_code: self.currency_code,
            total,
            taxes: breakdown.tax,
            seller_taxes: breakdown.seller_tax,
            net_total: breakdown.net_total,
            tax_rate: self.tax_rate,
            status: InvoiceStatus::Pending,
            zatca_uuid: None,
            document: None,
            submitted_at: None,
            last_error: None,
            items: self.items,
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        })
    }
}

/// Builder for a line item.
pub struct ItemBuilder {
    name: String,
    quantity: u32,
    price: Decimal,
    tax: Option<Decimal>,
    tax_rate: Decimal,
}

impl ItemBuilder {
    pub fn new(name: impl Into<String>, quantity: u32, price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
            tax: None,
            tax_rate: STANDARD_VAT_RATE,
        }
    }

    /// Explicit line tax amount.
    pub fn tax(mut self, tax: Decimal) -> Self {
        self.tax = Some(tax);
        self
    }

    /// Rate used when no explicit tax amount is given.
    pub fn tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = rate;
        self
    }

    pub fn build(self) -> Result<InvoiceItem, ZatcaError> {
        if self.quantity == 0 {
            return Err(ZatcaError::Builder(format!(
                "item {:?}: quantity must be positive",
                self.name
            )));
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ZatcaError::Builder(format!(
                "item {:?}: price must not be negative",
                self.name
            )));
        }
        let price = round_money(self.price);
        let tax = match self.tax {
            Some(t) if t.is_sign_negative() && !t.is_zero() => {
                return Err(ZatcaError::Builder(format!(
                    "item {:?}: tax must not be negative",
                    self.name
                )));
            }
            Some(t) => round_money(t),
            None => price
                .checked_mul(Decimal::from(self.quantity))
                .and_then(|amount| amount.checked_mul(self.tax_rate))
                .map(round_money)
                .ok_or_else(|| {
                    ZatcaError::Arithmetic(format!("item {:?}: tax overflow", self.name))
                })?,
        };
        Ok(InvoiceItem {
            id: Uuid::new_v4(),
            name: self.name,
            quantity: self.quantity,
            price,
            tax,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn seller() -> Seller {
        Seller {
            name: "ACME".into(),
            address: "Riyadh".into(),
            vat_number: "300000000000003".into(),
        }
    }

    fn buyer() -> Buyer {
        Buyer {
            id: "C-1".into(),
            name: "Customer".into(),
        }
    }

    #[test]
    fn total_defaults_to_line_sum() {
        let inv = InvoiceBuilder::new("1", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .seller(seller())
            .buyer(buyer())
            .add_item(ItemBuilder::new("a", 3, dec!(10)).build().unwrap())
            .add_item(ItemBuilder::new("b", 1, dec!(5.5)).build().unwrap())
            .build()
            .unwrap();
        assert_eq!(inv.total, dec!(35.50));
        assert_eq!(inv.taxes, dec!(5.33));
        assert_eq!(inv.items[0].tax, dec!(4.50));
    }

    #[test]
    fn explicit_total_wins() {
        let inv = InvoiceBuilder::new("2", Utc::now())
            .seller(seller())
            .buyer(buyer())
            .total(dec!(100))
            .build()
            .unwrap();
        assert_eq!(inv.total.to_string(), "100.00");
        assert_eq!(inv.seller_taxes, dec!(2.25));
    }

    #[test]
    fn zero_quantity_rejected() {
        assert!(ItemBuilder::new("x", 0, dec!(1)).build().is_err());
    }

    #[test]
    fn missing_seller_rejected() {
        let err = InvoiceBuilder::new("3", Utc::now())
            .buyer(buyer())
            .build()
            .unwrap_err();
        assert!(matches!(err, ZatcaError::Builder(_)));
    }
}
