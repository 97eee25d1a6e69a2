#![no_main]

use chrono::{TimeZone, Utc};
use fatura::core::*;
use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;

fuzz_target!(|input: (String, String, String, Vec<(String, u16, u32)>)| {
    let (number, name, address, items) = input;
    let mut builder = InvoiceBuilder::new(number, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .seller(Seller {
            name,
            address,
            vat_number: "300000000000003".into(),
        })
        .buyer(Buyer {
            id: String::new(),
            name: "buyer".into(),
        });
    for (item_name, qty, cents) in items.into_iter().take(50) {
        if let Ok(item) = ItemBuilder::new(item_name, u32::from(qty), Decimal::new(i64::from(cents), 2)).build() {
            builder = builder.add_item(item);
        }
    }
    let Ok(invoice) = builder.build() else { return };
    // Generated documents must always parse, whatever the text content.
    if let Ok(xml) = fatura::ubl::to_ubl_xml(&invoice) {
        assert_eq!(fatura::ubl::check_structure(&xml).check("well_formed"), Some(true));
    }
});
