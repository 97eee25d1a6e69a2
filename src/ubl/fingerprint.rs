use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::core::{Fingerprint, ZatcaError};

/// Hash and transport-encode a generated document.
///
/// Both values are computed over the exact UTF-8 bytes of `xml`; any change
/// to the document, whitespace included, changes the hash.
pub fn fingerprint(xml: &str) -> Fingerprint {
    let bytes = xml.as_bytes();
    Fingerprint {
        xml_base64: STANDARD.encode(bytes),
        xml_hash: hex::encode(Sha256::digest(bytes)),
    }
}

/// Operations on a stored [`Fingerprint`].
pub trait FingerprintExt {
    /// Decode the base64 document back to XML text.
    fn decode_xml(&self) -> Result<String, ZatcaError>;

    /// Whether the hash matches the stored document.
    fn verify(&self) -> bool;
}

impl FingerprintExt for Fingerprint {
    fn decode_xml(&self) -> Result<String, ZatcaError> {
        let bytes = STANDARD
            .decode(&self.xml_base64)
            .map_err(|e| ZatcaError::Xml(format!("stored document is not base64: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| ZatcaError::Xml(format!("stored document is not UTF-8: {e}")))
    }

    fn verify(&self) -> bool {
        match STANDARD.decode(&self.xml_base64) {
            Ok(bytes) => hex::encode(Sha256::digest(&bytes)) == self.xml_hash,
            Err(_) => false,
        }
    }
}
