use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::Submitter;
use super::auth::{CachedToken, ClientConfig, Credentials, TokenCache};
use super::types::*;
use crate::core::ZatcaError;

/// Header carrying the invoice id on submissions.
pub const INVOICE_UUID_HEADER: &str = "X-Invoice-UUID";

const SUBMISSION_TYPE: &str = "production";

/// Live HTTP client for the authority's reporting API.
///
/// One instance per process; it is `Send + Sync` and holds the shared token
/// cache, so share it via `Arc` rather than constructing per call.
/// Retries are not built in.
pub struct ZatcaClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    scope: String,
    timeout: Duration,
    token: TokenCache,
}

impl fmt::Debug for ZatcaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZatcaClient")
            .field("endpoint", &self.endpoint)
            .field("mode", &self.credentials.mode())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ZatcaClient {
    /// Build the client. In certificate mode the identity is loaded here,
    /// so unusable PEM material fails immediately.
    pub fn new(config: ClientConfig) -> Result<Self, ZatcaError> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);

        if let Credentials::MutualTls {
            certificate_pem,
            private_key_pem,
        } = &config.credentials
        {
            let pem = format!("{}\n{}", certificate_pem.trim_end(), private_key_pem.trim_end());
            let identity = reqwest::Identity::from_pem(pem.as_bytes()).map_err(|e| {
                ZatcaError::Authentication(format!("unusable client certificate: {e}"))
            })?;
            builder = builder.identity(identity);
        }

        let mtls = matches!(config.credentials, Credentials::MutualTls { .. });
        let http = builder.build().map_err(|e| {
            if mtls {
                ZatcaError::Authentication(format!("TLS client setup failed: {e}"))
            } else {
                ZatcaError::Config(format!("failed to build HTTP client: {e}"))
            }
        })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            credentials: config.credentials,
            scope: config.scope,
            timeout: config.timeout,
            token: TokenCache::default(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Per-request timeout the client was built with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the authority for the status of a previously submitted invoice.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn invoice_status(&self, remote_id: &str) -> Result<RemoteStatus, ZatcaError> {
        let url = format!("{}/invoices/{remote_id}/status", self.endpoint);
        let request = self
            .authorize(self.http.get(&url))
            .await?
            .header(ACCEPT, "application/json");
        let resp = self.send(request, "invoice_status").await?;
        let (status, body) = read_body(resp).await?;

        if !status.is_success() {
            return Err(self.rejection(status, body).await);
        }

        let data: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ZatcaError::Transport(format!("invoice_status: invalid JSON: {e}")))?;
        Ok(RemoteStatus {
            status: data.get("status").and_then(|v| v.as_str()).map(String::from),
            message: data
                .get("message")
                .and_then(|v| v.as_str())
                .map(String::from),
            data,
        })
    }

    /// Probe connectivity and credentials. Never fails; problems are
    /// reported as [`HealthStatus::Unhealthy`].
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn health_check(&self) -> HealthReport {
        let probe = match &self.credentials {
            Credentials::OAuth { .. } => self.bearer_token().await.map(|_| ()),
            // A completed handshake proves the certificate was accepted.
            Credentials::MutualTls { .. } => self
                .send(self.http.get(&self.endpoint), "health_check")
                .await
                .map(|_| ()),
        };

        let (status, message, authenticated) = match probe {
            Ok(()) => (
                HealthStatus::Healthy,
                "API reachable and authentication succeeded".to_string(),
                true,
            ),
            Err(e) => {
                warn!(error = %e, "health check failed");
                (
                    HealthStatus::Unhealthy,
                    format!("health check failed: {e}"),
                    false,
                )
            }
        };

        HealthReport {
            status,
            message,
            endpoint: Some(self.endpoint.clone()),
            authenticated,
            checked_at: Utc::now(),
        }
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ZatcaError> {
        match &self.credentials {
            Credentials::OAuth { .. } => {
                let token = self.bearer_token().await?;
                Ok(request.bearer_auth(token))
            }
            Credentials::MutualTls { .. } => Ok(request),
        }
    }

    async fn bearer_token(&self) -> Result<String, ZatcaError> {
        let Credentials::OAuth {
            client_id,
            client_secret,
        } = &self.credentials
        else {
            return Err(ZatcaError::Config(
                "bearer token requested in client certificate mode".into(),
            ));
        };
        self.token
            .get_or_refresh(|| self.fetch_token(client_id, client_secret))
            .await
    }

    async fn fetch_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<CachedToken, ZatcaError> {
        let url = format!("{}/oauth2/token", self.endpoint);
        info!(endpoint = %url, "requesting access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", self.scope.as_str()),
        ];
        let resp = self
            .send(self.http.post(&url).form(&form), "oauth2_token")
            .await?;
        let (status, body) = read_body(resp).await?;

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "token request rejected");
            return Err(ZatcaError::Authentication(format!(
                "token endpoint returned HTTP {status}: {body}"
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ZatcaError::Authentication(format!("unexpected token response: {e}"))
        })?;
        let token = CachedToken::new(parsed.access_token, parsed.expires_in, Utc::now());
        info!(expires_at = %token.expires_at, "access token obtained");
        Ok(token)
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response, ZatcaError> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ZatcaError::Transport(format!(
                    "{operation}: timed out after {}s",
                    self.timeout.as_secs_f64()
                ))
            } else {
                ZatcaError::Transport(format!("{operation}: {e}"))
            }
        })
    }

    /// Map a non-success response. A 401 also drops the cached token so the
    /// next call authenticates again.
    async fn rejection(&self, status: StatusCode, body: String) -> ZatcaError {
        if status == StatusCode::UNAUTHORIZED {
            self.token.clear().await;
        }
        ZatcaError::RemoteRejection {
            status: status.as_u16(),
            errors: errors_from_body(&body),
            body,
        }
    }
}

async fn read_body(resp: Response) -> Result<(StatusCode, String), ZatcaError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| ZatcaError::Transport(format!("reading response body: {e}")))?;
    Ok((status, body))
}

fn parse_success(body: &str, invoice_id: &str) -> SubmissionResult {
    let parsed = SubmissionResponse::parse(body).unwrap_or_else(|| SubmissionResponse {
        message: (!body.trim().is_empty()).then(|| body.to_string()),
        ..Default::default()
    });

    let status = parsed.status.unwrap_or_else(|| "ACCEPTED".to_string());
    let success = !REJECTION_STATUSES.contains(&status.trim().to_ascii_uppercase().as_str());

    SubmissionResult {
        success,
        remote_id: success.then(|| parsed.invoice_uuid.unwrap_or_else(|| invoice_id.to_string())),
        status: Some(status),
        message: Some(
            parsed
                .message
                .unwrap_or_else(|| "Invoice submitted successfully".to_string()),
        ),
        errors: parsed.errors,
        warnings: parsed.warnings,
        simulated: false,
    }
}

impl Submitter for ZatcaClient {
    #[instrument(skip(self, xml_base64, xml_hash), fields(endpoint = %self.endpoint))]
    async fn submit(
        &self,
        xml_base64: &str,
        xml_hash: &str,
        invoice_id: &str,
    ) -> Result<SubmissionResult, ZatcaError> {
        let url = format!("{}/invoices", self.endpoint);
        let payload = SubmissionRequest {
            invoice_xml: xml_base64,
            invoice_hash: xml_hash,
            invoice_uuid: invoice_id,
            submission_type: SUBMISSION_TYPE,
        };

        info!(xml_length = xml_base64.len(), "submitting invoice");
        let request = self
            .authorize(self.http.post(&url))
            .await?
            .header(INVOICE_UUID_HEADER, invoice_id)
            .header(ACCEPT, "application/json")
            .json(&payload);
        let resp = self.send(request, "submit").await?;
        let (status, body) = read_body(resp).await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "submission rejected");
            return Err(self.rejection(status, body).await);
        }

        let result = parse_success(&body, invoice_id);
        if result.success {
            info!(
                remote_id = result.remote_id.as_deref().unwrap_or_default(),
                status = result.status.as_deref().unwrap_or_default(),
                "invoice accepted"
            );
        } else {
            warn!(
                status = result.status.as_deref().unwrap_or_default(),
                errors = result.errors.len(),
                "invoice not accepted"
            );
        }
        Ok(result)
    }
}
