//! Submission of generated documents to the ZATCA reporting API.
//!
//! [`ZatcaClient`] is the live client (OAuth2 bearer token or mutual TLS).
//! The orchestrator only sees the [`Submitter`] trait, so tests and
//! credential-less deployments can plug in something else.
//!
//! Each client carries its own timeout; no call is retried here.

mod auth;
mod client;
mod types;

pub use auth::{
    ClientConfig, Credentials, DEFAULT_SCOPE, DEFAULT_TIMEOUT, DEFAULT_TOKEN_LIFETIME_SECS,
    MAX_TOKEN_LIFETIME_SECS, TOKEN_REFRESH_MARGIN_SECS,
};
pub use client::{INVOICE_UUID_HEADER, ZatcaClient};
pub use types::{HealthReport, HealthStatus, REJECTION_STATUSES, RemoteStatus, SubmissionResult};

use uuid::Uuid;

use crate::core::ZatcaError;

/// Sends a fingerprinted document to the authority.
#[allow(async_fn_in_trait)]
pub trait Submitter: Send + Sync {
    /// Submit the base64 document with its hex hash.
    ///
    /// # Errors
    /// `Transport` on timeouts and connection failures, `RemoteRejection` on
    /// a non-2xx answer, `Authentication` when credentials are refused.
    async fn submit(
        &self,
        xml_base64: &str,
        xml_hash: &str,
        invoice_id: &str,
    ) -> Result<SubmissionResult, ZatcaError>;

    /// Produce a successful result with a fresh remote id and no network call.
    async fn simulate(&self, _invoice_id: &str) -> Result<SubmissionResult, ZatcaError> {
        Ok(SubmissionResult::simulated(Uuid::new_v4().to_string()))
    }
}

/// Submitter for deployments without an endpoint or credentials.
///
/// Simulation works; live submission fails with a configuration error.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSubmitter;

impl OfflineSubmitter {
    pub fn health_check(&self) -> HealthReport {
        HealthReport {
            status: HealthStatus::Simulation,
            message: "no endpoint configured; running in simulation mode".into(),
            endpoint: None,
            authenticated: false,
            checked_at: chrono::Utc::now(),
        }
    }
}

impl Submitter for OfflineSubmitter {
    async fn submit(
        &self,
        _xml_base64: &str,
        _xml_hash: &str,
        invoice_id: &str,
    ) -> Result<SubmissionResult, ZatcaError> {
        Err(ZatcaError::Config(format!(
            "cannot submit invoice {invoice_id}: no endpoint configured"
        )))
    }
}
