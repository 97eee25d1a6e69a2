//! ZATCA UBL 2.1 invoice generation, fingerprinting, and structure checks.
//!
//! # Example
//!
//! ```no_run
//! use fatura::core::*;
//! use fatura::ubl;
//!
//! let invoice: Invoice = todo!(); // build via InvoiceBuilder
//! let xml = ubl::to_ubl_xml(&invoice).unwrap();
//! let fp = ubl::fingerprint(&xml);
//! assert_eq!(fp.xml_hash.len(), 64);
//! ```

mod fingerprint;
mod invoice;
mod validate;
pub(crate) mod xml_utils;

pub use fingerprint::{FingerprintExt, fingerprint};
pub use invoice::to_ubl_xml;
pub use validate::{StructureCheck, StructureReport, check_structure};

/// KSA customization identifier (BT-24).
pub const ZATCA_CUSTOMIZATION_ID: &str = "BR-KSA-CB";

/// Reporting profile identifier (BT-23).
pub const ZATCA_PROFILE_ID: &str = "reporting:1.0";

/// Tax invoice (UNTDID 1001).
pub const INVOICE_TYPE_CODE: &str = "388";

/// KSA invoice transaction code: simplified tax invoice.
pub const SIMPLIFIED_TRANSACTION_CODE: &str = "0200000";

/// Unit code used for item quantities.
pub const UNIT_CODE: &str = "PCE";

/// UBL 2.1 namespace URIs.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
}
