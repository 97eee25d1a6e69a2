use chrono::{TimeZone, Utc};
use fatura::core::*;
use fatura::qr::QrPayload;
use fatura::ubl::{self, FingerprintExt};
use rust_decimal_macros::dec;

fn main() {
    // Simplified tax invoice for a walk-in customer
    let invoice = InvoiceBuilder::new(
        "INV-2024-0042",
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap(),
    )
    .seller(Seller {
        name: "مؤسسة النخيل للتجارة".into(),
        address: "شارع التحلية، جدة".into(),
        vat_number: "310122393500003".into(),
    })
    .buyer(Buyer {
        id: String::new(),
        name: "Walk-in".into(),
    })
    .add_item(
        ItemBuilder::new("Arabic coffee 500g", 2, dec!(40))
            .build()
            .unwrap(),
    )
    .add_item(ItemBuilder::new("Sukkari dates 1kg", 1, dec!(20)).build().unwrap())
    .build()
    .expect("invoice should be valid");

    for finding in validate_invoice(&invoice) {
        eprintln!("warning: {finding}");
    }

    println!(
        "Invoice {}: net {} SAR, VAT {} SAR, gross {} SAR",
        invoice.invoice_number,
        invoice.total,
        invoice.taxes,
        invoice.total_with_vat()
    );

    let qr = QrPayload::for_invoice(&invoice).encode().unwrap();
    println!("QR payload: {qr}");

    let xml = ubl::to_ubl_xml(&invoice).unwrap();
    println!("{xml}");

    let fp = ubl::fingerprint(&xml);
    println!("SHA-256: {}", fp.xml_hash);
    println!("Fingerprint verifies: {}", fp.verify());

    let report = ubl::check_structure(&xml);
    println!("Structure checks: {}/{}", report.passed(), report.total());
    for check in &report.checks {
        let mark = if check.passed { "ok" } else { "FAIL" };
        println!("  [{mark}] {}", check.name);
    }
}
