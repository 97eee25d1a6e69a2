use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::RemoteError;

/// Remote statuses that mean the document was not accepted even though the
/// HTTP exchange itself succeeded.
pub const REJECTION_STATUSES: [&str; 3] = ["REJECTED", "NOT_REPORTED", "NOT_CLEARED"];

/// Outcome of a submission attempt (live or simulated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    /// Identifier assigned (or echoed) by the authority.
    pub remote_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
    pub errors: Vec<RemoteError>,
    pub warnings: Vec<RemoteError>,
    /// No network call was made.
    pub simulated: bool,
}

impl SubmissionResult {
    /// Successful result with no network involvement.
    pub fn simulated(remote_id: impl Into<String>) -> Self {
        Self {
            success: true,
            remote_id: Some(remote_id.into()),
            status: Some("ACCEPTED".into()),
            message: Some("simulated submission".into()),
            errors: Vec::new(),
            warnings: Vec::new(),
            simulated: true,
        }
    }

    /// Diagnostic for an unsuccessful result, including the authority's error list.
    pub fn failure_message(&self) -> String {
        let mut msg = format!(
            "submission not accepted: status {}",
            self.status.as_deref().unwrap_or("unknown")
        );
        if let Some(m) = &self.message {
            msg.push_str(": ");
            msg.push_str(m);
        }
        if !self.errors.is_empty() {
            let list: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
            msg.push_str(" | errors: ");
            msg.push_str(&list.join("; "));
        }
        msg
    }
}

/// Outcome of [`ZatcaClient::invoice_status`](super::ZatcaClient::invoice_status).
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStatus {
    pub status: Option<String>,
    pub message: Option<String>,
    /// The full response document.
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// No endpoint configured; submissions can only be simulated.
    Simulation,
}

/// Connectivity and authentication probe result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    pub endpoint: Option<String>,
    pub authenticated: bool,
    pub checked_at: DateTime<Utc>,
}

// --- wire formats ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionRequest<'a> {
    pub invoice_xml: &'a str,
    pub invoice_hash: &'a str,
    pub invoice_uuid: &'a str,
    pub submission_type: &'static str,
}

/// Fields read from a response body. Each field is read on its own, so one
/// malformed entry never hides the status or the rest of the error list.
#[derive(Debug, Default)]
pub(crate) struct SubmissionResponse {
    pub invoice_uuid: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
    pub errors: Vec<RemoteError>,
    pub warnings: Vec<RemoteError>,
}

impl SubmissionResponse {
    /// `None` when the body is not a JSON object.
    pub fn parse(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        let fields = value.as_object()?;
        Some(Self {
            invoice_uuid: text_field(fields.get("invoiceUuid")),
            status: text_field(fields.get("status")),
            message: text_field(fields.get("message")),
            errors: remote_entries(fields.get("errors")),
            warnings: remote_entries(fields.get("warnings")),
        })
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn remote_entries(value: Option<&Value>) -> Vec<RemoteError> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(remote_entry).collect(),
        Some(single) => vec![remote_entry(single)],
    }
}

/// Error entries arrive as bare strings or as objects; anything else is kept
/// as its raw JSON text.
fn remote_entry(value: &Value) -> RemoteError {
    let raw = |message: String| RemoteError {
        code: None,
        category: None,
        message,
    };
    match value {
        Value::String(s) => raw(s.clone()),
        Value::Object(_) => match DetailedMessage::deserialize(value) {
            Ok(detail) => RemoteError {
                code: detail.code,
                category: detail.category,
                message: detail.message.unwrap_or_else(|| value.to_string()),
            },
            Err(_) => raw(value.to_string()),
        },
        other => raw(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct DetailedMessage {
    #[serde(default, alias = "errorCode")]
    code: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "errorMessage")]
    message: Option<String>,
}

/// Parse the `errors` array out of an error body, if the body is JSON.
pub(crate) fn errors_from_body(body: &str) -> Vec<RemoteError> {
    SubmissionResponse::parse(body)
        .map(|r| r.errors)
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}
