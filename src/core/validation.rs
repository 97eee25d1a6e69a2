use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::{ValidationError, ZatcaError};
use super::types::*;

/// Validate an invoice before document generation.
/// Returns all validation errors found (not just the first).
pub fn validate_invoice(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // BR-02: An Invoice shall have an Invoice number
    if invoice.invoice_number.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            "invoice_number",
            "invoice number must not be empty",
            "BR-02",
        ));
    }

    // BR-05: An Invoice shall have an Invoice currency code
    if invoice.currency_code.len() != 3 || !invoice.currency_code.is_ascii() {
        errors.push(ValidationError::with_rule(
            "currency_code",
            format!(
                "currency code '{}' must be 3 characters (ISO 4217)",
                invoice.currency_code
            ),
            "BR-05",
        ));
    }

    // BR-06: Seller name
    if invoice.seller.name.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            "seller.name",
            "seller name must not be empty",
            "BR-06",
        ));
    }

    // BR-08: Seller postal address
    if invoice.seller.address.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            "seller.address",
            "seller address must not be empty",
            "BR-08",
        ));
    }

    // BR-KSA-39: 15 digits, first and last digit 3
    let vat = invoice.seller.vat_number.trim();
    if vat.is_empty() {
        errors.push(ValidationError::with_rule(
            "seller.vat_number",
            "seller VAT number must not be empty",
            "BR-KSA-39",
        ));
    } else if !is_valid_vat_number(vat) {
        errors.push(ValidationError::with_rule(
            "seller.vat_number",
            format!("VAT number '{vat}' must be 15 digits starting and ending with 3"),
            "BR-KSA-39",
        ));
    }

    for (name, amount) in [
        ("total", invoice.total),
        ("taxes", invoice.taxes),
        ("seller_taxes", invoice.seller_taxes),
        ("net_total", invoice.net_total),
    ] {
        if amount < Decimal::ZERO {
            errors.push(ValidationError::new(name, "amount must not be negative"));
        }
        if amount.scale() > 2 {
            errors.push(ValidationError::new(
                name,
                format!("amount {amount} has more than 2 decimal places"),
            ));
        }
    }

    // The persisted breakdown must add back up to the total (one cent tolerance)
    let sum = invoice
        .taxes
        .checked_add(invoice.seller_taxes)
        .and_then(|s| s.checked_add(invoice.net_total));
    match sum {
        Some(sum) if sum.checked_sub(invoice.total).is_some_and(|d| d.abs() <= dec!(0.01)) => {}
        Some(sum) => errors.push(ValidationError::new(
            "net_total",
            format!(
                "taxes + seller_taxes + net_total = {sum}, expected {}",
                invoice.total
            ),
        )),
        None => errors.push(ValidationError::new(
            "net_total",
            "taxes + seller_taxes + net_total overflows",
        )),
    }

    for (i, item) in invoice.items.iter().enumerate() {
        let path = format!("items[{i}]");
        // BR-25: Each line shall have an Item name
        if item.name.trim().is_empty() {
            errors.push(ValidationError::with_rule(
                format!("{path}.name"),
                "item name must not be empty",
                "BR-25",
            ));
        }
        // BR-22: Each line shall have an Invoiced quantity
        if item.quantity == 0 {
            errors.push(ValidationError::with_rule(
                format!("{path}.quantity"),
                "quantity must be positive",
                "BR-22",
            ));
        }
        if item.price < Decimal::ZERO {
            errors.push(ValidationError::with_rule(
                format!("{path}.price"),
                "price must not be negative",
                "BR-27",
            ));
        }
        if item.tax < Decimal::ZERO {
            errors.push(ValidationError::new(
                format!("{path}.tax"),
                "tax must not be negative",
            ));
        }
    }

    errors
}

/// Fail on the first field the document cannot be generated without.
pub fn ensure_required_fields(invoice: &Invoice) -> Result<(), ZatcaError> {
    let required = [
        ("invoice_number", invoice.invoice_number.as_str()),
        ("seller.name", invoice.seller.name.as_str()),
        ("seller.vat_number", invoice.seller.vat_number.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ZatcaError::MissingRequiredField(field.to_string()));
        }
    }
    Ok(())
}

/// Saudi VAT registration number: 15 digits, starting and ending with `3`.
pub fn is_valid_vat_number(vat: &str) -> bool {
    vat.len() == 15
        && vat.bytes().all(|b| b.is_ascii_digit())
        && vat.starts_with('3')
        && vat.ends_with('3')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vat_number_format() {
        assert!(is_valid_vat_number("300000000000003"));
        assert!(is_valid_vat_number("310122393500003"));
        assert!(!is_valid_vat_number("300000000000004"));
        assert!(!is_valid_vat_number("30000000000003"));
        assert!(!is_valid_vat_number("3000000000000a3"));
        assert!(!is_valid_vat_number("٣٠٠٠٠٠٠٠٠٠٠٠٠٠٣"));
    }
}
