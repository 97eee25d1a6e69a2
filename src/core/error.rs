use thiserror::Error;

/// Errors that can occur while building, encoding, submitting or storing invoices.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ZatcaError {
    /// A field the document cannot be built without is null or empty.
    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    /// One or more validation rules failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// Tax arithmetic produced or received an out-of-range value.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// A TLV value does not fit the single-byte length field.
    #[error("TLV tag {tag}: value is {len} bytes, maximum is 255")]
    Encoding { tag: u8, len: usize },

    /// A TLV byte stream could not be decoded.
    #[error("malformed TLV stream: {0}")]
    MalformedTlv(String),

    /// XML generation or parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Timeout, refused connection, TLS handshake failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The authority answered with a non-success status.
    #[error("{}", rejection_message(.status, .errors, .body))]
    RemoteRejection {
        /// HTTP status code.
        status: u16,
        /// Structured errors parsed from the body, if any.
        errors: Vec<RemoteError>,
        /// Full response body, kept for diagnostics.
        body: String,
    },

    /// Token exchange or client certificate failure.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An invoice with this number already exists.
    #[error("duplicate invoice number: {0}")]
    DuplicateInvoiceNumber(String),

    /// A status string outside the closed set was read at the storage boundary.
    #[error("unknown invoice status: {0:?}")]
    UnknownStatus(String),

    /// Settings are missing or contradictory.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse grouping of [`ZatcaError`] variants, used for diagnostics and
/// for deciding whether manual resubmission makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Validation,
    Encoding,
    Transport,
    RemoteRejection,
    Authentication,
    Storage,
    Internal,
}

impl ZatcaError {
    /// Which class of the error taxonomy this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingRequiredField(_) | Self::Validation(_) | Self::Builder(_) => {
                ErrorClass::Validation
            }
            Self::Encoding { .. } | Self::MalformedTlv(_) => ErrorClass::Encoding,
            Self::Transport(_) => ErrorClass::Transport,
            Self::RemoteRejection { .. } => ErrorClass::RemoteRejection,
            Self::Authentication(_) => ErrorClass::Authentication,
            Self::Storage(_) | Self::DuplicateInvoiceNumber(_) | Self::UnknownStatus(_) => {
                ErrorClass::Storage
            }
            Self::Arithmetic(_) | Self::Xml(_) | Self::Config(_) => ErrorClass::Internal,
        }
    }
}

/// A single error entry reported by the authority.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RemoteError {
    /// Machine-readable code (e.g. "BR-KSA-F-06"), if provided.
    #[serde(default)]
    pub code: Option<String>,
    /// Error category, if provided.
    #[serde(default)]
    pub category: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

fn rejection_message(status: &u16, errors: &[RemoteError], body: &str) -> String {
    if errors.is_empty() {
        format!("remote rejection: HTTP {status}: {body}")
    } else {
        let list: Vec<String> = errors.iter().map(ToString::to_string).collect();
        format!(
            "remote rejection: HTTP {status}: {} | body: {body}",
            list.join("; ")
        )
    }
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "seller.vat_number").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// ZATCA business rule ID if applicable (e.g. "BR-KSA-39").
    pub rule: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] {}: {}", rule, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create a validation error without a rule ID.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Create a validation error with a business rule ID.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}
