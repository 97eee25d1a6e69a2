use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::ZatcaError;

/// Maximum stored length (in characters) of `Invoice::last_error`.
pub const DEFAULT_ERROR_CAP: usize = 1000;

/// Lifecycle status of an invoice.
///
/// `InProgress` is written before any remote call, so a crash mid-call
/// leaves "attempted, outcome unknown" distinguishable from "never attempted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Pending,
        InvoiceStatus::InProgress,
        InvoiceStatus::Done,
        InvoiceStatus::Failed,
    ];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// `Done` and `Failed` end an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ZatcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            other => Err(ZatcaError::UnknownStatus(other.to_string())),
        }
    }
}

/// The issuing store (seller party).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    /// Registered name; may be in Arabic script.
    pub name: String,
    /// Street address.
    pub address: String,
    /// 15-digit VAT registration number.
    pub vat_number: String,
}

/// The customer (buyer party).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    /// Account identifier in the source accounting system.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Invoice line item. Owned by its [`Invoice`] and deleted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub name: String,
    /// Positive number of units.
    pub quantity: u32,
    /// Unit price.
    pub price: Decimal,
    /// Tax amount for the whole line.
    pub tax: Decimal,
}

impl InvoiceItem {
    /// `price × quantity`.
    pub fn line_amount(&self) -> Result<Decimal, ZatcaError> {
        self.price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| {
                ZatcaError::Arithmetic(format!("line amount overflow for item {:?}", self.name))
            })
    }
}

/// Sum of `line_amount` over all items.
pub(crate) fn sum_line_amounts(items: &[InvoiceItem]) -> Result<Decimal, ZatcaError> {
    items.iter().try_fold(Decimal::ZERO, |acc, item| {
        acc.checked_add(item.line_amount()?)
            .ok_or_else(|| ZatcaError::Arithmetic("line total overflow".into()))
    })
}

/// The generated document in transport form plus its hash.
///
/// Keeping both in one value means they are either both present on an
/// invoice or both absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Base64 of the UTF-8 XML bytes.
    pub xml_base64: String,
    /// Lowercase hex SHA-256 of the raw UTF-8 XML bytes.
    pub xml_hash: String,
}

/// An e-invoice and its compliance state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    /// Human-facing number, unique per store.
    pub invoice_number: String,
    pub seller: Seller,
    pub buyer: Buyer,
    /// Issue timestamp rendered into the document and the QR payload.
    pub issued_at: DateTime<Utc>,
    /// ISO 4217 currency code.
    pub currency_code: String,

    pub total: Decimal,
    pub taxes: Decimal,
    pub seller_taxes: Decimal,
    pub net_total: Decimal,
    /// VAT rate `taxes` was computed with (0.15 = 15%).
    pub tax_rate: Decimal,

    pub status: InvoiceStatus,
    /// Identifier assigned by the authority. Only set on success.
    pub zatca_uuid: Option<String>,
    /// Generated document and hash, retained on failure for diagnostics.
    pub document: Option<Fingerprint>,
    /// Only set on success.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Bounded diagnostic. Only set on failure.
    pub last_error: Option<String>,

    pub items: Vec<InvoiceItem>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// `total + taxes`, the amount the buyer pays. Saturates at `Decimal::MAX`;
    /// the builder refuses invoices where the sum would overflow.
    pub fn total_with_vat(&self) -> Decimal {
        self.total.saturating_add(self.taxes)
    }

    /// Sum of all line amounts.
    pub fn line_total(&self) -> Result<Decimal, ZatcaError> {
        sum_line_amounts(&self.items)
    }

    /// Base64 document, if one was generated.
    pub fn zatca_xml(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.xml_base64.as_str())
    }

    /// Hex hash of the document, if one was generated.
    pub fn zatca_xml_hash(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.xml_hash.as_str())
    }

    /// Pending → InProgress.
    pub fn mark_in_progress(&mut self) -> Result<(), ZatcaError> {
        if self.status != InvoiceStatus::Pending {
            return Err(ZatcaError::Validation(format!(
                "invoice {} cannot move to in_progress from {}",
                self.invoice_number, self.status
            )));
        }
        self.status = InvoiceStatus::InProgress;
        self.touch();
        Ok(())
    }

    /// Attach the generated document while the attempt is running.
    pub fn record_document(&mut self, document: Fingerprint) {
        self.document = Some(document);
        self.touch();
    }

    /// InProgress → Done.
    pub fn mark_done(&mut self, remote_id: impl Into<String>, at: DateTime<Utc>) {
        self.status = InvoiceStatus::Done;
        self.zatca_uuid = Some(remote_id.into());
        self.submitted_at = Some(at);
        self.last_error = None;
        self.touch();
    }

    /// InProgress → Failed, keeping at most `cap` characters of `error`.
    pub fn mark_failed(&mut self, error: &str, cap: usize) {
        self.status = InvoiceStatus::Failed;
        self.zatca_uuid = None;
        self.submitted_at = None;
        self.last_error = Some(truncate_chars(error, cap));
        self.touch();
    }

    /// Failed → Pending. Operator action only; the pipeline never retries.
    pub fn reset_to_pending(&mut self) -> Result<(), ZatcaError> {
        if self.status != InvoiceStatus::Failed {
            return Err(ZatcaError::Validation(format!(
                "only failed invoices can be requeued, {} is {}",
                self.invoice_number, self.status
            )));
        }
        self.status = InvoiceStatus::Pending;
        self.last_error = None;
        self.touch();
        Ok(())
    }

    /// Check the outcome-field invariants. Returns the first violation.
    pub fn check_invariants(&self) -> Result<(), ZatcaError> {
        let violation = |msg: &str| {
            Err(ZatcaError::Validation(format!(
                "invoice {}: {msg}",
                self.invoice_number
            )))
        };
        if self.submitted_at.is_some() && self.status != InvoiceStatus::Done {
            return violation("submitted_at set but status is not done");
        }
        if self.last_error.is_some() && self.status != InvoiceStatus::Failed {
            return violation("last_error set but status is not failed");
        }
        match self.status {
            InvoiceStatus::Done if self.zatca_uuid.is_none() || self.submitted_at.is_none() => {
                violation("done without remote id and submission time")
            }
            InvoiceStatus::Failed if self.zatca_uuid.is_some() => {
                violation("failed invoice carries a remote id")
            }
            InvoiceStatus::Failed if self.last_error.is_none() => {
                violation("failed without an error message")
            }
            _ => Ok(()),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Truncate to at most `cap` characters on a char boundary.
pub fn truncate_chars(s: &str, cap: usize) -> String {
    match s.char_indices().nth(cap) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
