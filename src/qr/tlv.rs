use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::core::{Invoice, ZatcaError, round_money};

/// Largest value a single length byte can describe.
pub const MAX_TLV_VALUE_LEN: usize = u8::MAX as usize;

pub const TAG_SELLER_NAME: u8 = 1;
pub const TAG_VAT_NUMBER: u8 = 2;
pub const TAG_TIMESTAMP: u8 = 3;
pub const TAG_TOTAL_WITH_VAT: u8 = 4;
pub const TAG_VAT_AMOUNT: u8 = 5;

/// QR timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One decoded TLV field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvField {
    pub tag: u8,
    pub value: String,
}

/// Encode `[tag][len][utf8 bytes]`.
///
/// Fails if the UTF-8 encoding of `value` is longer than 255 bytes. Arabic
/// text takes two bytes per letter, so this triggers well before 255 characters.
pub fn encode_field(tag: u8, value: &str) -> Result<Vec<u8>, ZatcaError> {
    let bytes = value.as_bytes();
    let len = u8::try_from(bytes.len()).map_err(|_| ZatcaError::Encoding {
        tag,
        len: bytes.len(),
    })?;
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(tag);
    out.push(len);
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Decode a concatenation of TLV fields.
pub fn decode_fields(mut bytes: &[u8]) -> Result<Vec<TlvField>, ZatcaError> {
    let mut fields = Vec::new();
    while !bytes.is_empty() {
        let [tag, len, rest @ ..] = bytes else {
            return Err(ZatcaError::MalformedTlv(format!(
                "dangling byte after {} field(s)",
                fields.len()
            )));
        };
        let len = usize::from(*len);
        if rest.len() < len {
            return Err(ZatcaError::MalformedTlv(format!(
                "tag {tag} declares {len} bytes, only {} remain",
                rest.len()
            )));
        }
        let value = std::str::from_utf8(&rest[..len])
            .map_err(|e| ZatcaError::MalformedTlv(format!("tag {tag}: {e}")))?;
        fields.push(TlvField {
            tag: *tag,
            value: value.to_string(),
        });
        bytes = &rest[len..];
    }
    Ok(fields)
}

/// Build the base64 QR payload from its five fields (tags 1..5, in order).
pub fn build_qr_payload(
    seller_name: &str,
    vat_number: &str,
    timestamp: &str,
    total_with_vat: &str,
    vat_amount: &str,
) -> Result<String, ZatcaError> {
    let mut buf = Vec::new();
    for (tag, value) in [
        (TAG_SELLER_NAME, seller_name),
        (TAG_VAT_NUMBER, vat_number),
        (TAG_TIMESTAMP, timestamp),
        (TAG_TOTAL_WITH_VAT, total_with_vat),
        (TAG_VAT_AMOUNT, vat_amount),
    ] {
        buf.extend(encode_field(tag, value)?);
    }
    Ok(STANDARD.encode(buf))
}

/// The five QR fields in typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    pub seller_name: String,
    pub vat_number: String,
    pub timestamp: String,
    pub total_with_vat: String,
    pub vat_amount: String,
}

impl QrPayload {
    /// Fields for an invoice. The timestamp is the issue time, so the payload
    /// is stable across regenerations.
    pub fn for_invoice(invoice: &Invoice) -> Self {
        Self {
            seller_name: invoice.seller.name.clone(),
            vat_number: invoice.seller.vat_number.clone(),
            timestamp: invoice.issued_at.format(TIMESTAMP_FORMAT).to_string(),
            total_with_vat: round_money(invoice.total_with_vat()).to_string(),
            vat_amount: round_money(invoice.taxes).to_string(),
        }
    }

    /// Encode as base64 TLV.
    pub fn encode(&self) -> Result<String, ZatcaError> {
        build_qr_payload(
            &self.seller_name,
            &self.vat_number,
            &self.timestamp,
            &self.total_with_vat,
            &self.vat_amount,
        )
    }

    /// Parse a base64 QR payload. Tags must be exactly 1..5 in order.
    pub fn decode(payload: &str) -> Result<Self, ZatcaError> {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| ZatcaError::MalformedTlv(format!("invalid base64: {e}")))?;
        let fields = decode_fields(&bytes)?;
        let tags: Vec<u8> = fields.iter().map(|f| f.tag).collect();
        if tags != [1, 2, 3, 4, 5] {
            return Err(ZatcaError::MalformedTlv(format!(
                "expected tags [1, 2, 3, 4, 5], found {tags:?}"
            )));
        }
        let mut values = fields.into_iter().map(|f| f.value);
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            seller_name: next(),
            vat_number: next(),
            timestamp: next(),
            total_with_vat: next(),
            vat_amount: next(),
        })
    }
}
