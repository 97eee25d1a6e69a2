//! # fatura
//!
//! ZATCA (Saudi Arabia) e-invoicing pipeline: tax breakdown, UBL 2.1
//! document generation with an embedded TLV/QR payload, fingerprinting,
//! submission to the reporting API, and batch processing of pending invoices.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Amounts are rounded half-up to two decimal places.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use fatura::core::*;
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new("INV-0001", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
//!     .seller(Seller {
//!         name: "Al Noor Trading".into(),
//!         address: "King Abdulaziz Rd, Riyadh".into(),
//!         vat_number: "310122393500003".into(),
//!     })
//!     .buyer(Buyer { id: "ACC-9".into(), name: "Walk-in customer".into() })
//!     .add_item(ItemBuilder::new("Dates 1kg", 4, dec!(25)).build().unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert!(validate_invoice(&invoice).is_empty());
//! assert_eq!(invoice.total_with_vat(), dec!(115.00));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` | Invoice types, tax calculation, validation |
//! | `qr` | TLV encoding and QR payloads |
//! | `ubl` | UBL 2.1 XML generation, fingerprinting, structure checks |
//! | `submit` | HTTP submission client (OAuth2 or mutual TLS) |
//! | `process` | Invoice store and batch orchestrator |
//! | `config` | Settings from file, `.env` and `ZATCA_*` variables |
//! | `all` (default) | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "qr")]
pub mod qr;

#[cfg(feature = "ubl")]
pub mod ubl;

#[cfg(feature = "submit")]
pub mod submit;

#[cfg(feature = "process")]
pub mod process;

#[cfg(feature = "config")]
pub mod config;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
