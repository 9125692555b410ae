//! OTP Providers
//!
//! The login bootstrap asks an [`OtpProvider`] for the code the storefront
//! sent to the test phone after `Get OTP` was clicked. Providers:
//!
//! - [`StaticOtp`] - a fixed code (environments with a known test OTP)
//! - [`EnvOtp`] - read from an environment variable at fetch time
//! - [`HttpOtpProvider`] - poll an SMS gateway / test inbox endpoint

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default environment variable for [`EnvOtp`]
pub const DEFAULT_OTP_ENV: &str = "STOREPROBE_OTP";

/// Default gateway poll interval (1 second)
pub const DEFAULT_OTP_POLL_INTERVAL_MS: u64 = 1_000;

/// Default gateway timeout (60 seconds)
pub const DEFAULT_OTP_TIMEOUT_MS: u64 = 60_000;

/// Errors obtaining an OTP
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    /// No fresh code arrived in time
    #[error("No OTP for {phone} within {waited_ms}ms")]
    Timeout {
        /// Phone number the code was requested for
        phone: String,
        /// Time waited
        waited_ms: u64,
    },

    /// Code is not 4-8 digits
    #[error("Malformed OTP {code:?}: expected 4-8 digits")]
    Malformed {
        /// Raw code received
        code: String,
    },

    /// Transport failure talking to the gateway
    #[error("OTP gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with an unexpected status
    #[error("OTP gateway returned {status}: {body}")]
    Gateway {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Environment variable not set
    #[error("OTP environment variable {var} is not set")]
    EnvMissing {
        /// Variable name
        var: String,
    },
}

/// A validated one-time password
#[derive(Clone, PartialEq, Eq)]
pub struct Otp(String);

impl Otp {
    /// Validate a raw code: 4-8 ASCII digits after trimming
    pub fn parse(raw: &str) -> Result<Self, OtpError> {
        let code = raw.trim();
        if (4..=8).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(OtpError::Malformed {
                code: raw.to_string(),
            })
        }
    }

    /// The digits
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep codes out of logs and panic messages.
impl std::fmt::Debug for Otp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Otp({})", "*".repeat(self.0.len()))
    }
}

/// Source of login OTPs
#[async_trait]
pub trait OtpProvider: std::fmt::Debug + Send + Sync {
    /// Return the code sent to `phone` no earlier than `requested_after`
    async fn fetch_otp(&self, phone: &str, requested_after: DateTime<Utc>)
        -> Result<Otp, OtpError>;
}

/// Fixed OTP
#[derive(Debug, Clone)]
pub struct StaticOtp {
    otp: Otp,
}

impl StaticOtp {
    /// Create from a code, validating it up front
    pub fn new(code: &str) -> Result<Self, OtpError> {
        Ok(Self {
            otp: Otp::parse(code)?,
        })
    }
}

#[async_trait]
impl OtpProvider for StaticOtp {
    async fn fetch_otp(&self, _phone: &str, _after: DateTime<Utc>) -> Result<Otp, OtpError> {
        Ok(self.otp.clone())
    }
}

/// OTP read from an environment variable when requested
#[derive(Debug, Clone)]
pub struct EnvOtp {
    var: String,
}

impl EnvOtp {
    /// Read from `var`
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvOtp {
    fn default() -> Self {
        Self::new(DEFAULT_OTP_ENV)
    }
}

#[async_trait]
impl OtpProvider for EnvOtp {
    async fn fetch_otp(&self, _phone: &str, _after: DateTime<Utc>) -> Result<Otp, OtpError> {
        let raw = std::env::var(&self.var).map_err(|_| OtpError::EnvMissing {
            var: self.var.clone(),
        })?;
        Otp::parse(&raw)
    }
}

#[derive(Debug, Deserialize)]
struct GatewayMessage {
    otp: String,
    issued_at: DateTime<Utc>,
}

/// Polls `GET {endpoint}?phone={phone}` for `{"otp": "...", "issued_at": "<rfc3339>"}`.
///
/// `404` and codes issued before the request are treated as not yet
/// delivered; any other non-success status fails immediately.
#[derive(Debug, Clone)]
pub struct HttpOtpProvider {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
    poll_interval: Duration,
    timeout: Duration,
}

impl HttpOtpProvider {
    /// Create a provider for `endpoint`
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            bearer_token: None,
            poll_interval: Duration::from_millis(DEFAULT_OTP_POLL_INTERVAL_MS),
            timeout: Duration::from_millis(DEFAULT_OTP_TIMEOUT_MS),
        }
    }

    /// Send `Authorization: Bearer <token>`
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the overall timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One gateway request: `Ok(None)` when no fresh code is available yet
    async fn poll_once(
        &self,
        phone: &str,
        requested_after: DateTime<Utc>,
    ) -> Result<Option<Otp>, OtpError> {
        let mut request = self.client.get(&self.endpoint).query(&[("phone", phone)]);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(OtpError::Gateway {
                status: status.as_u16(),
                body,
            });
        }
        let message: GatewayMessage = response.json().await?;
        if message.issued_at < requested_after {
            tracing::debug!(issued_at = %message.issued_at, "ignoring stale OTP");
            return Ok(None);
        }
        Otp::parse(&message.otp).map(Some)
    }
}

#[async_trait]
impl OtpProvider for HttpOtpProvider {
    async fn fetch_otp(
        &self,
        phone: &str,
        requested_after: DateTime<Utc>,
    ) -> Result<Otp, OtpError> {
        let started = Instant::now();
        loop {
            if let Some(otp) = self.poll_once(phone, requested_after).await? {
                tracing::info!(endpoint = %self.endpoint, "OTP received from gateway");
                return Ok(otp);
            }
            if started.elapsed() >= self.timeout {
                return Err(OtpError::Timeout {
                    phone: phone.to_string(),
                    waited_ms: self.timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Where the bootstrap gets its OTP from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum OtpSettings {
    /// Fixed code
    Static {
        /// The code
        code: String,
    },
    /// Environment variable
    Env {
        /// Variable name
        #[serde(default = "default_otp_env")]
        var: String,
    },
    /// HTTP gateway
    Http {
        /// Endpoint URL
        endpoint: String,
        /// Optional bearer token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bearer_token: Option<String>,
        /// Poll interval in milliseconds
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
        /// Timeout in milliseconds
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_otp_env() -> String {
    DEFAULT_OTP_ENV.to_string()
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_OTP_POLL_INTERVAL_MS
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_OTP_TIMEOUT_MS
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self::Env {
            var: default_otp_env(),
        }
    }
}

impl OtpSettings {
    /// Build the configured provider
    pub fn provider(&self) -> Result<Arc<dyn OtpProvider>, OtpError> {
        Ok(match self {
            Self::Static { code } => Arc::new(StaticOtp::new(code)?),
            Self::Env { var } => Arc::new(EnvOtp::new(var.clone())),
            Self::Http {
                endpoint,
                bearer_token,
                poll_interval_ms,
                timeout_ms,
            } => {
                let mut provider = HttpOtpProvider::new(endpoint.clone())
                    .with_poll_interval(Duration::from_millis(*poll_interval_ms))
                    .with_timeout(Duration::from_millis(*timeout_ms));
                if let Some(token) = bearer_token {
                    provider = provider.with_bearer_token(token.clone());
                }
                Arc::new(provider)
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod otp_tests {
        use super::*;

        #[test]
        fn test_parse_trims_and_validates() {
            assert_eq!(Otp::parse(" 123456\n").unwrap().as_str(), "123456");
            assert!(Otp::parse("1234").is_ok());
            assert!(Otp::parse("12345678").is_ok());
            assert!(matches!(Otp::parse("123"), Err(OtpError::Malformed { .. })));
            assert!(Otp::parse("123456789").is_err());
            assert!(Otp::parse("12a456").is_err());
            assert!(Otp::parse("").is_err());
        }

        #[test]
        fn test_debug_is_masked() {
            let otp = Otp::parse("482913").unwrap();
            assert_eq!(format!("{otp:?}"), "Otp(******)");
        }
    }

    mod provider_tests {
        use super::*;

        #[tokio::test]
        async fn test_static_provider() {
            let p = StaticOtp::new("4321").unwrap();
            let otp = p.fetch_otp("9000000001", Utc::now()).await.unwrap();
            assert_eq!(otp.as_str(), "4321");
            assert!(StaticOtp::new("x").is_err());
        }

        #[tokio::test]
        async fn test_env_provider() {
            let var = "STOREFRONT_PROBE_TEST_OTP_ENV_PROVIDER";
            let p = EnvOtp::new(var);
            assert!(matches!(
                p.fetch_otp("9000000001", Utc::now()).await,
                Err(OtpError::EnvMissing { .. })
            ));
            std::env::set_var(var, "987654");
            assert_eq!(
                p.fetch_otp("9000000001", Utc::now()).await.unwrap().as_str(),
                "987654"
            );
            std::env::remove_var(var);
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_default_is_env() {
            assert_eq!(
                OtpSettings::default(),
                OtpSettings::Env {
                    var: "STOREPROBE_OTP".into()
                }
            );
        }

        #[test]
        fn test_yaml_tagged_by_source() {
            let http: OtpSettings =
                serde_yaml_ng::from_str("source: http\nendpoint: http://sms.local/otp\n").unwrap();
            assert_eq!(
                http,
                OtpSettings::Http {
                    endpoint: "http://sms.local/otp".into(),
                    bearer_token: None,
                    poll_interval_ms: 1_000,
                    timeout_ms: 60_000,
                }
            );
            let fixed: OtpSettings = serde_yaml_ng::from_str("source: static\ncode: '1234'\n").unwrap();
            assert!(fixed.provider().is_ok());
            let bad: OtpSettings = serde_yaml_ng::from_str("source: static\ncode: abc\n").unwrap();
            assert!(bad.provider().is_err());
        }
    }

    mod gateway_tests {
        use super::*;
        use axum::extract::{Query, State};
        use axum::http::{HeaderMap, StatusCode};
        use axum::response::{IntoResponse, Response};
        use axum::routing::get;
        use axum::{Json, Router};
        use std::collections::HashMap;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Clone)]
        struct Gateway {
            hits: Arc<AtomicUsize>,
            requested_at: DateTime<Utc>,
        }

        /// 404, then a code issued before the request, then a fresh code.
        async fn inbox(
            State(gw): State<Gateway>,
            headers: HeaderMap,
            Query(query): Query<HashMap<String, String>>,
        ) -> Response {
            if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer sekret") {
                return (StatusCode::UNAUTHORIZED, "bad token").into_response();
            }
            if query.get("phone").map(String::as_str) != Some("9000000001") {
                return StatusCode::NOT_FOUND.into_response();
            }
            match gw.hits.fetch_add(1, Ordering::SeqCst) {
                0 => StatusCode::NOT_FOUND.into_response(),
                1 => Json(serde_json::json!({
                    "otp": "111111",
                    "issued_at": (gw.requested_at - chrono::Duration::minutes(5)).to_rfc3339(),
                }))
                .into_response(),
                _ => Json(serde_json::json!({
                    "otp": "246810",
                    "issued_at": (gw.requested_at + chrono::Duration::seconds(1)).to_rfc3339(),
                }))
                .into_response(),
            }
        }

        async fn spawn_gateway(requested_at: DateTime<Utc>) -> (String, Arc<AtomicUsize>) {
            let hits = Arc::new(AtomicUsize::new(0));
            let app = Router::new().route("/otp", get(inbox)).with_state(Gateway {
                hits: hits.clone(),
                requested_at,
            });
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            (format!("http://{addr}/otp"), hits)
        }

        #[tokio::test]
        async fn test_skips_missing_and_stale_codes() {
            let requested_at = Utc::now();
            let (endpoint, hits) = spawn_gateway(requested_at).await;
            let provider = HttpOtpProvider::new(endpoint)
                .with_bearer_token("sekret")
                .with_poll_interval(Duration::from_millis(10))
                .with_timeout(Duration::from_secs(5));
            let otp = provider.fetch_otp("9000000001", requested_at).await.unwrap();
            assert_eq!(otp.as_str(), "246810");
            assert_eq!(hits.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn test_times_out_when_nothing_arrives() {
            let (endpoint, _) = spawn_gateway(Utc::now()).await;
            let provider = HttpOtpProvider::new(endpoint)
                .with_bearer_token("sekret")
                .with_poll_interval(Duration::from_millis(10))
                .with_timeout(Duration::from_millis(100));
            let err = provider.fetch_otp("9999999999", Utc::now()).await.unwrap_err();
            assert!(matches!(err, OtpError::Timeout { .. }));
        }

        #[tokio::test]
        async fn test_unauthorized_fails_immediately() {
            let (endpoint, hits) = spawn_gateway(Utc::now()).await;
            let provider = HttpOtpProvider::new(endpoint)
                .with_poll_interval(Duration::from_millis(10))
                .with_timeout(Duration::from_secs(5));
            let err = provider.fetch_otp("9000000001", Utc::now()).await.unwrap_err();
            assert!(matches!(err, OtpError::Gateway { status: 401, .. }));
            assert_eq!(hits.load(Ordering::SeqCst), 0);
        }
    }
}
