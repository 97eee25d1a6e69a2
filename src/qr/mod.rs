//! ZATCA QR payloads (Tag-Length-Value, base64).
//!
//! Simplified tax invoices carry a QR code whose content is five TLV fields
//! in fixed order, base64-encoded:
//!
//! | Tag | Field |
//! |-----|-------|
//! | 1 | Seller name |
//! | 2 | VAT registration number |
//! | 3 | Invoice timestamp (`YYYY-MM-DDTHH:MM:SSZ`) |
//! | 4 | Invoice total with VAT |
//! | 5 | VAT total |
//!
//! The length is a single byte, so a value longer than 255 UTF-8 bytes is
//! rejected with [`ZatcaError::Encoding`](crate::core::ZatcaError::Encoding)
//! instead of being truncated.
//!
//! # Example
//!
//! ```
//! use fatura::qr::{build_qr_payload, QrPayload};
//!
//! let b64 = build_qr_payload("Bobs Records", "310122393500003", "2022-04-25T15:30:00Z", "1000.00", "150.00").unwrap();
//! let decoded = QrPayload::decode(&b64).unwrap();
//! assert_eq!(decoded.seller_name, "Bobs Records");
//! ```

mod tlv;

pub use tlv::*;
