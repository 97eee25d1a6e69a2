#![cfg(feature = "core")]

use chrono::{DateTime, TimeZone, Utc};
use fatura::core::*;
use rust_decimal_macros::dec;

fn issued() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
}

fn seller() -> Seller {
    Seller {
        name: "مؤسسة النخيل".into(),
        address: "شارع التحلية، جدة".into(),
        vat_number: "310122393500003".into(),
    }
}

fn buyer() -> Buyer {
    Buyer {
        id: "ACC-42".into(),
        name: "Walk-in".into(),
    }
}

fn simple_invoice() -> Invoice {
    InvoiceBuilder::new("INV-2024-001", issued())
        .seller(seller())
        .buyer(buyer())
        .add_item(ItemBuilder::new("Arabic coffee", 2, dec!(40)).build().unwrap())
        .add_item(ItemBuilder::new("Dates", 1, dec!(20)).build().unwrap())
        .build()
        .unwrap()
}

// --- tax ---

#[test]
fn tax_reference_example() {
    let t = calculate_tax(dec!(100.00), dec!(0.15), dec!(0.15)).unwrap();
    assert_eq!(
        (t.tax, t.seller_tax, t.net_total),
        (dec!(15.00), dec!(2.25), dec!(82.75))
    );
}

#[test]
fn tax_components_round_independently() {
    // 0.10 × 0.15 = 0.015 → 0.02; 0.015 × 0.15 = 0.00225 → 0.00; 0.08275 → 0.08
    let t = calculate_tax(dec!(0.10), dec!(0.15), dec!(0.15)).unwrap();
    assert_eq!(t.tax, dec!(0.02));
    assert_eq!(t.seller_tax, dec!(0.00));
    assert_eq!(t.net_total, dec!(0.08));
    assert_eq!(t.tax + t.seller_tax + t.net_total, dec!(0.10));
}

#[test]
fn tax_outputs_always_two_places() {
    let t = calculate_tax(dec!(7), dec!(0.05), dec!(0)).unwrap();
    assert_eq!(t.tax.to_string(), "0.35");
    assert_eq!(t.seller_tax.to_string(), "0.00");
    assert_eq!(t.net_total.to_string(), "6.65");
}

// --- builder ---

#[test]
fn builder_computes_breakdown() {
    let inv = simple_invoice();
    assert_eq!(inv.status, InvoiceStatus::Pending);
    assert_eq!(inv.total, dec!(100.00));
    assert_eq!(inv.taxes, dec!(15.00));
    assert_eq!(inv.seller_taxes, dec!(2.25));
    assert_eq!(inv.net_total, dec!(82.75));
    assert_eq!(inv.total_with_vat(), dec!(115.00));
    assert_eq!(inv.line_total().unwrap(), dec!(100.00));
    assert_eq!(inv.currency_code, "SAR");
    assert!(inv.document.is_none());
    inv.check_invariants().unwrap();
}

#[test]
fn builder_respects_custom_rate() {
    let inv = InvoiceBuilder::new("INV-5", issued())
        .seller(seller())
        .buyer(buyer())
        .total(dec!(200))
        .tax_rate(dec!(0.05))
        .seller_share(dec!(0))
        .build()
        .unwrap();
    assert_eq!(inv.taxes, dec!(10.00));
    assert_eq!(inv.seller_taxes, dec!(0.00));
    assert_eq!(inv.net_total, dec!(190.00));
    assert_eq!(inv.tax_rate, dec!(0.05));
}

#[test]
fn builder_rejects_overlong_number() {
    let result = InvoiceBuilder::new("x".repeat(256), issued())
        .seller(seller())
        .buyer(buyer())
        .build();
    assert!(matches!(result, Err(ZatcaError::Builder(_))));
}

#[test]
fn item_negative_price_rejected() {
    assert!(ItemBuilder::new("x", 1, dec!(-1)).build().is_err());
    assert!(ItemBuilder::new("x", 1, dec!(1)).tax(dec!(-0.01)).build().is_err());
}

#[test]
fn overflowing_amounts_are_arithmetic_errors() {
    let err = ItemBuilder::new("bulk", u32::MAX, rust_decimal::Decimal::MAX)
        .build()
        .unwrap_err();
    assert!(matches!(err, ZatcaError::Arithmetic(_)));

    let huge = ItemBuilder::new("bulk", 2, rust_decimal::Decimal::MAX)
        .tax(dec!(0))
        .build()
        .unwrap();
    let err = InvoiceBuilder::new("INV-OVF-1", issued())
        .seller(seller())
        .buyer(buyer())
        .add_item(huge)
        .build()
        .unwrap_err();
    assert!(matches!(err, ZatcaError::Arithmetic(_)));

    let err = InvoiceBuilder::new("INV-OVF-2", issued())
        .seller(seller())
        .buyer(buyer())
        .total(rust_decimal::Decimal::MAX)
        .build()
        .unwrap_err();
    assert!(matches!(err, ZatcaError::Arithmetic(_)));

    let mut inv = simple_invoice();
    inv.items[0].price = rust_decimal::Decimal::MAX;
    assert!(matches!(inv.line_total(), Err(ZatcaError::Arithmetic(_))));
    assert!(matches!(inv.items[0].line_amount(), Err(ZatcaError::Arithmetic(_))));
}

#[test]
fn extreme_rate_overflows_net_total() {
    let rate: rust_decimal::Decimal = "70000000000000000000000000000".parse().unwrap();
    let err = calculate_tax(dec!(1), rate, dec!(1)).unwrap_err();
    assert!(matches!(err, ZatcaError::Arithmetic(_)));
    assert_eq!(err.class(), ErrorClass::Internal);
}

// --- lifecycle ---

#[test]
fn lifecycle_done_sets_outcome_fields() {
    let mut inv = simple_invoice();
    inv.mark_in_progress().unwrap();
    assert!(inv.mark_in_progress().is_err());
    inv.mark_done("remote-1", Utc::now());
    assert_eq!(inv.status, InvoiceStatus::Done);
    assert_eq!(inv.zatca_uuid.as_deref(), Some("remote-1"));
    assert!(inv.submitted_at.is_some());
    assert!(inv.last_error.is_none());
    inv.check_invariants().unwrap();
}

#[test]
fn lifecycle_failed_truncates_and_requeues() {
    let mut inv = simple_invoice();
    inv.mark_in_progress().unwrap();
    inv.mark_failed(&"e".repeat(5000), 1000);
    assert_eq!(inv.status, InvoiceStatus::Failed);
    assert_eq!(inv.last_error.as_ref().unwrap().chars().count(), 1000);
    assert!(inv.zatca_uuid.is_none() && inv.submitted_at.is_none());
    inv.check_invariants().unwrap();

    inv.reset_to_pending().unwrap();
    assert_eq!(inv.status, InvoiceStatus::Pending);
    assert!(inv.reset_to_pending().is_err());
}

#[test]
fn invariant_violation_detected() {
    let mut inv = simple_invoice();
    inv.last_error = Some("stale".into());
    assert!(inv.check_invariants().is_err());
}

#[test]
fn status_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&InvoiceStatus::InProgress).unwrap(),
        "\"in_progress\""
    );
    assert!("IN_PROGRESS".parse::<InvoiceStatus>().is_err());
}

// --- validation ---

#[test]
fn valid_invoice_has_no_findings() {
    assert!(validate_invoice(&simple_invoice()).is_empty());
}

#[test]
fn validation_collects_all_findings() {
    let mut inv = simple_invoice();
    inv.invoice_number = " ".into();
    inv.seller.name = String::new();
    inv.seller.vat_number = "12345".into();
    inv.items[0].name = String::new();

    let errors = validate_invoice(&inv);
    let rules: Vec<&str> = errors.iter().filter_map(|e| e.rule.as_deref()).collect();
    assert!(rules.contains(&"BR-02"));
    assert!(rules.contains(&"BR-06"));
    assert!(rules.contains(&"BR-KSA-39"));
    assert!(rules.contains(&"BR-25"));
}

#[test]
fn validation_flags_inconsistent_breakdown() {
    let mut inv = simple_invoice();
    inv.net_total = dec!(80.00);
    let errors = validate_invoice(&inv);
    assert!(errors.iter().any(|e| e.field == "net_total"));
}

#[test]
fn validation_reports_overflowing_breakdown() {
    let mut inv = simple_invoice();
    inv.taxes = rust_decimal::Decimal::MAX;
    inv.net_total = rust_decimal::Decimal::MAX;
    let errors = validate_invoice(&inv);
    assert!(errors
        .iter()
        .any(|e| e.field == "net_total" && e.message.contains("overflows")));
}

#[test]
fn required_fields_checked_in_order() {
    let mut inv = simple_invoice();
    inv.seller.name = "  ".into();
    inv.seller.vat_number = String::new();
    let err = ensure_required_fields(&inv).unwrap_err();
    assert!(matches!(err, ZatcaError::MissingRequiredField(f) if f == "seller.name"));
}
