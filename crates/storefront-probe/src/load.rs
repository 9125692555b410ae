//! API load runs.
//!
//! Virtual users replay authenticated storefront API calls (add to cart,
//! open checkout) with the bearer token a login produced. Each user cycles
//! through the configured requests and pauses a random time between calls,
//! until the run duration is over. Latencies are aggregated per endpoint.
//!
//! ```ignore
//! let report = LoadTest::new(&config.base_url, token, config.load.clone())?
//!     .run()
//!     .await;
//! println!("{} requests, {:.1}% failed", report.total_requests, report.error_rate());
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::{ProbeError, ProbeResult};

/// Per-request timeout
pub const LOAD_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// HTTP method of a replayed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// One API call a virtual user makes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadRequest {
    /// Name used in the report
    pub name: String,
    /// HTTP method
    #[serde(default)]
    pub method: HttpMethod,
    /// Path relative to the API base URL
    pub path: String,
    /// JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl LoadRequest {
    /// A GET request
    #[must_use]
    pub fn get(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            method: HttpMethod::Get,
            path: path.to_string(),
            body: None,
        }
    }

    /// A POST request with a JSON body
    #[must_use]
    pub fn post(name: &str, path: &str, body: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            method: HttpMethod::Post,
            path: path.to_string(),
            body: Some(body),
        }
    }
}

/// Load run settings (the `load` section of the suite config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadSettings {
    /// API base URL; the storefront base URL when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Concurrent virtual users
    pub users: usize,
    /// Run duration
    pub duration_ms: u64,
    /// Shortest pause between a user's requests
    pub min_wait_ms: u64,
    /// Longest pause between a user's requests
    pub max_wait_ms: u64,
    /// Requests each user cycles through
    pub requests: Vec<LoadRequest>,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            users: 1,
            duration_ms: 60_000,
            min_wait_ms: 1_000,
            max_wait_ms: 5_000,
            requests: vec![
                LoadRequest::post(
                    "/api/cart/add",
                    "/api/v1/cart/add",
                    serde_json::json!({ "product_id": "EXAMPLE_PRODUCT_123", "quantity": 1 }),
                ),
                LoadRequest::get("/api/checkout", "/api/v1/checkout"),
            ],
        }
    }
}

impl LoadSettings {
    /// Check the settings describe a runnable load
    pub fn validate(&self) -> ProbeResult<()> {
        if self.users == 0 {
            return Err(ProbeError::config("load.users must be at least 1"));
        }
        if self.duration_ms == 0 {
            return Err(ProbeError::config("load.duration_ms must be positive"));
        }
        if self.min_wait_ms > self.max_wait_ms {
            return Err(ProbeError::config(format!(
                "load.min_wait_ms ({}) exceeds load.max_wait_ms ({})",
                self.min_wait_ms, self.max_wait_ms
            )));
        }
        if self.requests.is_empty() {
            return Err(ProbeError::config("load.requests is empty"));
        }
        if let Some(bad) = self.requests.iter().find(|r| !r.path.starts_with('/')) {
            return Err(ProbeError::config(format!(
                "load request {} path must start with '/': {:?}",
                bad.name, bad.path
            )));
        }
        Ok(())
    }

    /// Random pause in `[min_wait_ms, max_wait_ms]`
    #[must_use]
    pub fn wait_between(&self) -> Duration {
        let ms = if self.max_wait_ms > self.min_wait_ms {
            rand::thread_rng().gen_range(self.min_wait_ms..=self.max_wait_ms)
        } else {
            self.min_wait_ms
        };
        Duration::from_millis(ms)
    }
}

/// Latency statistics for one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStats {
    /// Request name
    pub name: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Requests sent
    pub count: u64,
    /// Requests that failed (transport error or non-2xx)
    pub errors: u64,
    /// Fastest response
    pub min_ms: u64,
    /// Mean response time
    pub avg_ms: u64,
    /// Median response time
    pub p50_ms: u64,
    /// 95th percentile
    pub p95_ms: u64,
    /// 99th percentile
    pub p99_ms: u64,
    /// Slowest response
    pub max_ms: u64,
}

impl EndpointStats {
    fn from_samples(request: &LoadRequest, samples: &[u64], errors: u64) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let count = sorted.len() as u64;
        let sum: u64 = sorted.iter().sum();
        Self {
            name: request.name.clone(),
            method: request.method,
            count,
            errors,
            min_ms: sorted.first().copied().unwrap_or(0),
            avg_ms: if count == 0 { 0 } else { sum / count },
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
            max_ms: sorted.last().copied().unwrap_or(0),
        }
    }
}

/// Nearest-rank percentile of sorted samples; 0 when empty
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// A distinct failure and how often it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCount {
    /// Request name
    pub endpoint: String,
    /// Failure description
    pub message: String,
    /// Occurrences
    pub count: u64,
}

/// Outcome of a load run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Virtual users
    pub users: usize,
    /// Requests sent
    pub total_requests: u64,
    /// Requests that failed
    pub failed_requests: u64,
    /// Completed requests per second
    pub throughput_rps: f64,
    /// Per-endpoint statistics, in request order
    pub endpoints: Vec<EndpointStats>,
    /// Failures grouped by endpoint and message, most frequent first
    pub errors: Vec<ErrorCount>,
}

impl LoadReport {
    /// Requests that got a 2xx answer
    #[must_use]
    pub const fn successful_requests(&self) -> u64 {
        self.total_requests - self.failed_requests
    }

    /// Failed requests as a percentage of all requests
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failed_requests as f64 / self.total_requests as f64 * 100.0
        }
    }

    /// Write `load-report.json` into `dir`
    pub fn write_json(&self, dir: &Path) -> ProbeResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("load-report.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

#[derive(Debug, Clone)]
struct RequestRecord {
    endpoint: usize,
    latency: Duration,
    error: Option<String>,
}

/// Runs virtual users against an API
#[derive(Debug, Clone)]
pub struct LoadTest {
    client: reqwest::Client,
    base_url: String,
    token: String,
    settings: LoadSettings,
}

impl LoadTest {
    /// Create a run against `base_url` authenticated with `token`
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        settings: LoadSettings,
    ) -> ProbeResult<Self> {
        settings.validate()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ProbeError::config(format!(
                "API base URL must be http(s), got {base_url:?}"
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            token: token.into(),
            settings,
        })
    }

    /// Settings of this run
    #[must_use]
    pub const fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// Run every virtual user until the duration is over
    pub async fn run(&self) -> LoadReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.settings.duration_ms);
        tracing::info!(
            users = self.settings.users,
            duration_ms = self.settings.duration_ms,
            base_url = %self.base_url,
            "load run started"
        );

        let handles: Vec<_> = (0..self.settings.users)
            .map(|user| {
                let this = self.clone();
                tokio::spawn(async move { this.virtual_user(user, deadline).await })
            })
            .collect();
        let mut records = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(user_records) => records.extend(user_records),
                Err(e) => tracing::warn!(error = %e, "virtual user task failed"),
            }
        }

        let report = aggregate(&self.settings, &records, started_at, started.elapsed());
        tracing::info!(
            requests = report.total_requests,
            failed = report.failed_requests,
            rps = report.throughput_rps,
            "load run finished"
        );
        report
    }

    async fn virtual_user(&self, user: usize, deadline: Instant) -> Vec<RequestRecord> {
        let requests = &self.settings.requests;
        let mut records = Vec::new();
        let mut next = user;
        while Instant::now() < deadline {
            let endpoint = next % requests.len();
            next += 1;
            records.push(self.send(endpoint, &requests[endpoint]).await);
            let pause = self
                .settings
                .wait_between()
                .min(deadline.saturating_duration_since(Instant::now()));
            tokio::time::sleep(pause).await;
        }
        tracing::debug!(user, requests = records.len(), "virtual user done");
        records
    }

    async fn send(&self, endpoint: usize, request: &LoadRequest) -> RequestRecord {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .bearer_auth(&self.token)
            .timeout(Duration::from_millis(LOAD_REQUEST_TIMEOUT_MS));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let started = Instant::now();
        let error = match builder.send().await {
            Ok(response) if response.status().is_success() => None,
            Ok(response) => Some(format!("HTTP {}", response.status())),
            Err(e) => Some(if e.is_timeout() {
                "request timed out".to_string()
            } else if e.is_connect() {
                "connection failed".to_string()
            } else {
                e.to_string()
            }),
        };
        let latency = started.elapsed();
        if let Some(ref error) = error {
            tracing::trace!(endpoint = %request.name, %error, "request failed");
        }
        RequestRecord {
            endpoint,
            latency,
            error,
        }
    }
}

fn aggregate(
    settings: &LoadSettings,
    records: &[RequestRecord],
    started_at: DateTime<Utc>,
    elapsed: Duration,
) -> LoadReport {
    let endpoints = settings
        .requests
        .iter()
        .enumerate()
        .map(|(index, request)| {
            let mine = records.iter().filter(|r| r.endpoint == index);
            let samples: Vec<u64> = mine.clone().map(|r| r.latency.as_millis() as u64).collect();
            let errors = mine.filter(|r| r.error.is_some()).count() as u64;
            EndpointStats::from_samples(request, &samples, errors)
        })
        .collect();

    let mut grouped: BTreeMap<(usize, &str), u64> = BTreeMap::new();
    for record in records {
        if let Some(ref message) = record.error {
            *grouped.entry((record.endpoint, message.as_str())).or_default() += 1;
        }
    }
    let mut errors: Vec<ErrorCount> = grouped
        .into_iter()
        .map(|((endpoint, message), count)| ErrorCount {
            endpoint: settings
                .requests
                .get(endpoint)
                .map_or_else(String::new, |r| r.name.clone()),
            message: message.to_string(),
            count,
        })
        .collect();
    errors.sort_by(|a, b| b.count.cmp(&a.count));

    let total_requests = records.len() as u64;
    let failed_requests = records.iter().filter(|r| r.error.is_some()).count() as u64;
    let secs = elapsed.as_secs_f64();
    LoadReport {
        run_id: Uuid::new_v4(),
        started_at,
        duration_ms: elapsed.as_millis() as u64,
        users: settings.users,
        total_requests,
        failed_requests,
        throughput_rps: if secs > 0.0 {
            (total_requests - failed_requests) as f64 / secs
        } else {
            0.0
        },
        endpoints,
        errors,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fast(users: usize) -> LoadSettings {
        LoadSettings {
            users,
            duration_ms: 300,
            min_wait_ms: 5,
            max_wait_ms: 15,
            ..LoadSettings::default()
        }
    }

    fn record(endpoint: usize, ms: u64, error: Option<&str>) -> RequestRecord {
        RequestRecord {
            endpoint,
            latency: Duration::from_millis(ms),
            error: error.map(str::to_string),
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_defaults_replay_cart_and_checkout() {
            let settings = LoadSettings::default();
            assert!(settings.validate().is_ok());
            assert_eq!(settings.requests.len(), 2);
            assert_eq!(settings.requests[0].method, HttpMethod::Post);
            assert_eq!(settings.requests[0].path, "/api/v1/cart/add");
            assert_eq!(settings.requests[1].path, "/api/v1/checkout");
            assert_eq!((settings.min_wait_ms, settings.max_wait_ms), (1_000, 5_000));
        }

        #[test]
        fn test_validate_rejects_bad_settings() {
            let mut settings = LoadSettings::default();
            settings.users = 0;
            assert!(settings.validate().is_err());

            let mut settings = LoadSettings::default();
            settings.min_wait_ms = 10;
            settings.max_wait_ms = 5;
            assert!(settings.validate().unwrap_err().to_string().contains("min_wait_ms"));

            let mut settings = LoadSettings::default();
            settings.requests.push(LoadRequest::get("bad", "api/v1/x"));
            assert!(settings.validate().is_err());

            let mut settings = LoadSettings::default();
            settings.requests.clear();
            assert!(settings.validate().is_err());
        }

        #[test]
        fn test_wait_stays_in_range() {
            let settings = fast(1);
            for _ in 0..100 {
                let wait = settings.wait_between();
                assert!(wait >= Duration::from_millis(5) && wait <= Duration::from_millis(15));
            }
            let fixed = LoadSettings {
                min_wait_ms: 7,
                max_wait_ms: 7,
                ..LoadSettings::default()
            };
            assert_eq!(fixed.wait_between(), Duration::from_millis(7));
        }

        #[test]
        fn test_yaml_section() {
            let settings: LoadSettings = serde_yaml_ng::from_str(
                "users: 3\nrequests:\n  - name: profile\n    path: /api/v1/user/profile\n",
            )
            .unwrap();
            assert_eq!(settings.users, 3);
            assert_eq!(settings.requests[0].method, HttpMethod::Get);
            assert_eq!(settings.duration_ms, 60_000);
        }

        #[test]
        fn test_non_http_base_url_rejected() {
            assert!(LoadTest::new("shop.test", "t", LoadSettings::default()).is_err());
        }
    }

    mod aggregate_tests {
        use super::*;

        #[test]
        fn test_percentile() {
            assert_eq!(percentile(&[], 0.5), 0);
            assert_eq!(percentile(&[42], 0.99), 42);
            let data: Vec<u64> = (1..=100).collect();
            assert_eq!(percentile(&data, 0.50), 51);
            assert_eq!(percentile(&data, 0.95), 95);
        }

        #[test]
        fn test_aggregate_per_endpoint() {
            let settings = LoadSettings::default();
            let records = vec![
                record(0, 100, None),
                record(0, 300, Some("HTTP 500 Internal Server Error")),
                record(1, 50, None),
                record(0, 200, Some("HTTP 500 Internal Server Error")),
            ];
            let report = aggregate(&settings, &records, Utc::now(), Duration::from_secs(2));
            assert_eq!(report.total_requests, 4);
            assert_eq!(report.failed_requests, 2);
            assert_eq!(report.successful_requests(), 2);
            assert!((report.error_rate() - 50.0).abs() < f64::EPSILON);
            assert!((report.throughput_rps - 1.0).abs() < f64::EPSILON);

            let cart = &report.endpoints[0];
            assert_eq!((cart.count, cart.errors), (3, 2));
            assert_eq!((cart.min_ms, cart.avg_ms, cart.max_ms), (100, 200, 300));
            assert_eq!(report.endpoints[1].count, 1);

            assert_eq!(report.errors.len(), 1);
            assert_eq!(report.errors[0].endpoint, "/api/cart/add");
            assert_eq!(report.errors[0].count, 2);
        }

        #[test]
        fn test_empty_run() {
            let report = aggregate(&LoadSettings::default(), &[], Utc::now(), Duration::ZERO);
            assert_eq!(report.total_requests, 0);
            assert_eq!(report.error_rate(), 0.0);
            assert_eq!(report.throughput_rps, 0.0);
            assert_eq!(report.endpoints[0].count, 0);
        }

        #[test]
        fn test_write_json() {
            let dir = tempfile::tempdir().unwrap();
            let report = aggregate(&LoadSettings::default(), &[record(1, 10, None)], Utc::now(), Duration::from_secs(1));
            let path = report.write_json(dir.path()).unwrap();
            let json: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(json["total_requests"], 1);
            assert_eq!(json["endpoints"][1]["method"], "GET");
        }
    }

    mod api_tests {
        use super::*;
        use axum::extract::State;
        use axum::http::{HeaderMap, StatusCode};
        use axum::routing::{get, post};
        use axum::{Json, Router};
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::sync::Arc;

        #[derive(Clone, Default)]
        struct Api {
            cart_adds: Arc<AtomicU64>,
            checkouts: Arc<AtomicU64>,
        }

        fn authorized(headers: &HeaderMap) -> bool {
            headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer eyJ-test")
        }

        async fn cart_add(
            State(api): State<Api>,
            headers: HeaderMap,
            Json(body): Json<serde_json::Value>,
        ) -> StatusCode {
            if !authorized(&headers) {
                return StatusCode::UNAUTHORIZED;
            }
            if body["quantity"] != 1 {
                return StatusCode::BAD_REQUEST;
            }
            api.cart_adds.fetch_add(1, Ordering::SeqCst);
            StatusCode::OK
        }

        async fn checkout(State(api): State<Api>, headers: HeaderMap) -> StatusCode {
            if !authorized(&headers) {
                return StatusCode::UNAUTHORIZED;
            }
            api.checkouts.fetch_add(1, Ordering::SeqCst);
            StatusCode::OK
        }

        async fn spawn_api() -> (String, Api) {
            let api = Api::default();
            let app = Router::new()
                .route("/api/v1/cart/add", post(cart_add))
                .route("/api/v1/checkout", get(checkout))
                .with_state(api.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            (format!("http://{addr}/"), api)
        }

        #[tokio::test]
        async fn test_users_replay_both_endpoints() {
            let (base_url, api) = spawn_api().await;
            let report = LoadTest::new(base_url, "eyJ-test", fast(2))
                .unwrap()
                .run()
                .await;
            assert_eq!(report.users, 2);
            assert_eq!(report.failed_requests, 0, "{:?}", report.errors);
            let cart = &report.endpoints[0];
            let checkout = &report.endpoints[1];
            assert!(cart.count > 0 && checkout.count > 0);
            assert_eq!(cart.count, api.cart_adds.load(Ordering::SeqCst));
            assert_eq!(checkout.count, api.checkouts.load(Ordering::SeqCst));
            assert_eq!(report.total_requests, cart.count + checkout.count);
            assert!(report.duration_ms >= 300);
        }

        #[tokio::test]
        async fn test_rejected_token_counts_as_failures() {
            let (base_url, api) = spawn_api().await;
            let report = LoadTest::new(base_url, "expired", fast(1))
                .unwrap()
                .run()
                .await;
            assert!(report.total_requests > 0);
            assert_eq!(report.failed_requests, report.total_requests);
            assert!((report.error_rate() - 100.0).abs() < f64::EPSILON);
            assert!(report.errors[0].message.contains("401"));
            assert_eq!(api.cart_adds.load(Ordering::SeqCst), 0);
        }
    }
}
