use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::ZatcaError;

/// Default OAuth scope requested for submissions.
pub const DEFAULT_SCOPE: &str = "InvoiceSubmission";

/// Per-request timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Token lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Upper bound applied to a server-supplied `expires_in`.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 86400;

/// A cached token is reused only while more than this many seconds of validity remain.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// How the client authenticates. Exactly one mode per client.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// OAuth2 client-credentials grant; a bearer token on every request.
    OAuth {
        client_id: String,
        client_secret: String,
    },
    /// Client certificate presented during the TLS handshake.
    MutualTls {
        certificate_pem: String,
        private_key_pem: String,
    },
}

impl Credentials {
    /// Select the auth mode from optional configuration values.
    ///
    /// Fails when both modes, neither mode, or only half of a mode is configured.
    pub fn select(
        client_id: Option<String>,
        client_secret: Option<String>,
        certificate_pem: Option<String>,
        private_key_pem: Option<String>,
    ) -> Result<Self, ZatcaError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        let oauth = (present(&client_id), present(&client_secret));
        let mtls = (present(&certificate_pem), present(&private_key_pem));

        match (oauth, mtls) {
            ((true, true), (false, false)) => Ok(Self::OAuth {
                client_id: client_id.unwrap_or_default(),
                client_secret: client_secret.unwrap_or_default(),
            }),
            ((false, false), (true, true)) => Ok(Self::MutualTls {
                certificate_pem: certificate_pem.unwrap_or_default(),
                private_key_pem: private_key_pem.unwrap_or_default(),
            }),
            ((false, false), (false, false)) => Err(ZatcaError::Config(
                "no credentials configured: set client id/secret or certificate/private key".into(),
            )),
            ((true, true), (true, true)) => Err(ZatcaError::Config(
                "both OAuth and client certificate credentials configured; choose one".into(),
            )),
            ((id, _), (false, false)) => Err(ZatcaError::Config(format!(
                "incomplete OAuth credentials: missing {}",
                if id { "client secret" } else { "client id" }
            ))),
            ((false, false), (cert, _)) => Err(ZatcaError::Config(format!(
                "incomplete client certificate credentials: missing {}",
                if cert { "private key" } else { "certificate" }
            ))),
            _ => Err(ZatcaError::Config(
                "conflicting partial credentials for OAuth and client certificate".into(),
            )),
        }
    }

    /// Short name of the mode, safe to log.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::OAuth { .. } => "oauth",
            Self::MutualTls { .. } => "mtls",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuth { client_id, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Self::MutualTls { .. } => f
                .debug_struct("MutualTls")
                .field("certificate_pem", &"<pem>")
                .field("private_key_pem", &"<redacted>")
                .finish(),
        }
    }
}

/// Configuration for [`ZatcaClient`](super::ZatcaClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the authority API, without trailing slash.
    pub endpoint: String,
    pub credentials: Credentials,
    /// Per-request timeout (default: 30s).
    pub timeout: Duration,
    /// OAuth scope (default: `InvoiceSubmission`).
    pub scope: String,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

#[derive(Clone)]
pub(crate) struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// `expires_in` is clamped to `0..=MAX_TOKEN_LIFETIME_SECS`.
    pub fn new(access_token: String, expires_in: Option<i64>, now: DateTime<Utc>) -> Self {
        let lifetime = expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
            .clamp(0, MAX_TOKEN_LIFETIME_SECS);
        let expires_at = TimeDelta::try_seconds(lifetime)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        Self {
            access_token,
            expires_at,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        TimeDelta::try_seconds(TOKEN_REFRESH_MARGIN_SECS)
            .and_then(|margin| self.expires_at.checked_sub_signed(margin))
            .is_some_and(|refresh_at| now < refresh_at)
    }
}

/// Single-slot token cache. The lock is held across a refresh so only one
/// exchange is in flight; concurrent callers wait for its result.
#[derive(Default)]
pub(crate) struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, ZatcaError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken, ZatcaError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.access_token.clone());
        }
        let token = refresh().await?;
        let access = token.access_token.clone();
        *slot = Some(token);
        Ok(access)
    }

    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn exactly_one_mode() {
        assert_eq!(
            Credentials::select(s("id"), s("secret"), None, None).unwrap().mode(),
            "oauth"
        );
        assert_eq!(
            Credentials::select(None, None, s("cert"), s("key")).unwrap().mode(),
            "mtls"
        );
        for (a, b, c, d) in [
            (None, None, None, None),
            (s("id"), s("secret"), s("cert"), s("key")),
            (s("id"), None, None, None),
            (None, None, None, s("key")),
            (s("id"), None, s("cert"), None),
            (s(""), s("  "), None, None),
        ] {
            let err = Credentials::select(a, b, c, d).unwrap_err();
            assert!(matches!(err, ZatcaError::Config(_)));
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::select(s("id"), s("hunter2"), None, None).unwrap();
        let out = format!("{creds:?}");
        assert!(out.contains("id"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn token_freshness_margin() {
        let now = Utc::now();
        let token = CachedToken::new("t".into(), Some(3600), now);
        assert!(token.is_fresh(now));
        assert!(token.is_fresh(now + TimeDelta::minutes(54)));
        assert!(!token.is_fresh(now + TimeDelta::minutes(55)));

        let short = CachedToken::new("t".into(), Some(240), now);
        assert!(!short.is_fresh(now));

        let default = CachedToken::new("t".into(), None, now);
        assert_eq!(default.expires_at, now + TimeDelta::seconds(3600));
    }

    #[test]
    fn out_of_range_lifetime_is_clamped() {
        let now = Utc::now();
        let huge = CachedToken::new("t".into(), Some(9_000_000_000_000_000_000), now);
        assert_eq!(huge.expires_at, now + TimeDelta::seconds(MAX_TOKEN_LIFETIME_SECS));
        assert!(huge.is_fresh(now));

        let negative = CachedToken::new("t".into(), Some(i64::MIN), now);
        assert_eq!(negative.expires_at, now);
        assert!(!negative.is_fresh(now));

        let at_limit = CachedToken::new("t".into(), Some(i64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(at_limit.expires_at, DateTime::<Utc>::MAX_UTC);

        let floor = CachedToken::new("t".into(), Some(0), DateTime::<Utc>::MIN_UTC);
        assert!(!floor.is_fresh(DateTime::<Utc>::MIN_UTC));
    }

    #[tokio::test]
    async fn cache_refreshes_only_when_stale() {
        let cache = TokenCache::default();
        let first = cache
            .get_or_refresh(|| async { Ok(CachedToken::new("a".into(), None, Utc::now())) })
            .await
            .unwrap();
        let second = cache
            .get_or_refresh(|| async { Ok(CachedToken::new("b".into(), None, Utc::now())) })
            .await
            .unwrap();
        assert_eq!((first.as_str(), second.as_str()), ("a", "a"));

        cache.clear().await;
        let third = cache
            .get_or_refresh(|| async { Ok(CachedToken::new("c".into(), None, Utc::now())) })
            .await
            .unwrap();
        assert_eq!(third, "c");
    }
}
