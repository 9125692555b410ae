//! Test harness for running journey suites.
//!
//! Every case gets its own driver (one browser context per test). Cases
//! that need the saved session have it loaded into their context before the
//! before-each hook runs. Failures capture a screenshot when the driver can
//! produce one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::SuiteConfig;
use crate::context::StorageState;
use crate::driver::DriverFactory;
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};

/// A journey or hook: a flat async script over a page and the suite config
pub type JourneyFn = for<'a> fn(&'a Page, &'a SuiteConfig) -> BoxFuture<'a, ProbeResult<()>>;

/// A test suite containing multiple cases
#[derive(Debug, Clone)]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    /// Cases in this suite
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    /// Create a new test suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
        }
    }

    /// Add a test case
    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Add a test case (builder form)
    #[must_use]
    pub fn with_test(mut self, test: TestCase) -> Self {
        self.add_test(test);
        self
    }

    /// Get the number of tests
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Cases whose name contains `filter`
    #[must_use]
    pub fn matching(&self, filter: Option<&str>) -> Vec<&TestCase> {
        self.tests
            .iter()
            .filter(|t| filter.map_or(true, |f| t.name.contains(f)))
            .collect()
    }
}

/// A single test case
#[derive(Clone)]
pub struct TestCase {
    /// Test name, e.g. `checkout::payment_mode_updates_total`
    pub name: String,
    /// Whether the saved session is loaded first
    pub needs_session: bool,
    /// Timeout override in milliseconds (suite default otherwise)
    pub timeout_ms: Option<u64>,
    before_each: Option<JourneyFn>,
    journey: JourneyFn,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("needs_session", &self.needs_session)
            .field("timeout_ms", &self.timeout_ms)
            .field("before_each", &self.before_each.is_some())
            .finish_non_exhaustive()
    }
}

impl TestCase {
    /// Create a new test case
    #[must_use]
    pub fn new(name: impl Into<String>, journey: JourneyFn) -> Self {
        Self {
            name: name.into(),
            needs_session: false,
            timeout_ms: None,
            before_each: None,
            journey,
        }
    }

    /// Load the saved session before running
    #[must_use]
    pub const fn with_session(mut self) -> Self {
        self.needs_session = true;
        self
    }

    /// Run `hook` before the journey
    #[must_use]
    pub fn with_before_each(mut self, hook: JourneyFn) -> Self {
        self.before_each = Some(hook);
        self
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// Outcome of one case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Passed
    Passed,
    /// Failed
    Failed,
    /// Not run (fail-fast)
    Skipped,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Outcome
    pub status: TestStatus,
    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Screenshot taken on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    /// Test duration in milliseconds
    pub duration_ms: u64,
}

impl TestResult {
    /// Create a passing test result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            error: None,
            screenshot: None,
            duration_ms: 0,
        }
    }

    /// Create a failing test result
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Failed,
            error: Some(error.into()),
            ..Self::pass(name)
        }
    }

    /// Create a skipped test result
    #[must_use]
    pub fn skip(name: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Skipped,
            ..Self::pass(name)
        }
    }

    /// Set duration
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Whether the case passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Results from running a test suite
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Suite name
    pub suite: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Individual test results, in suite order
    pub results: Vec<TestResult>,
}

impl SuiteReport {
    /// Check if every case that ran passed and at least one ran
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.failed_count() == 0 && self.skipped_count() == 0
    }

    fn count(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Count passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    /// Count failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// Count skipped tests
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(TestStatus::Skipped)
    }

    /// Get total test count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results
            .iter()
            .filter(|r| r.status == TestStatus::Failed)
            .collect()
    }

    /// Write `report.json` into `dir`
    pub fn write_json(&self, dir: &Path) -> ProbeResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("report.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// Load the session file into a fresh page.
///
/// A missing file is reported with a hint to run the setup step.
pub async fn load_session(page: &Page, path: &Path) -> ProbeResult<()> {
    let state = StorageState::load(path)?;
    page.add_storage_state(&state).await
}

/// File-system safe name for per-case artifacts
fn artifact_name(case: &str) -> String {
    case.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Runs suites against drivers from a factory
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    config: SuiteConfig,
    factory: Arc<dyn DriverFactory>,
    filter: Option<String>,
}

impl SuiteRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: SuiteConfig, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            config,
            factory,
            filter: None,
        }
    }

    /// Only run cases whose name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Run a suite
    pub async fn run(&self, suite: &TestSuite) -> ProbeResult<SuiteReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        let cases = suite.matching(self.filter.as_deref());
        let workers = self.config.workers.max(1);
        tracing::info!(%run_id, suite = %suite.name, cases = cases.len(), workers, "starting run");

        let stop = AtomicBool::new(false);
        let stop = &stop;
        let mut results: Vec<(usize, TestResult)> = stream::iter(cases.into_iter().enumerate())
            .map(|(idx, case)| async move { (idx, self.run_case(case, stop).await) })
            .buffer_unordered(workers)
            .collect()
            .await;
        results.sort_by_key(|(idx, _)| *idx);

        if let Err(e) = self.factory.shutdown().await {
            tracing::warn!(error = %e, "driver shutdown failed");
        }

        let report = SuiteReport {
            run_id,
            suite: suite.name.clone(),
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            results: results.into_iter().map(|(_, r)| r).collect(),
        };
        tracing::info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            "run finished"
        );
        Ok(report)
    }

    async fn run_case(&self, case: &TestCase, stop: &AtomicBool) -> TestResult {
        if stop.load(Ordering::SeqCst) {
            return TestResult::skip(&case.name);
        }
        let span = tracing::info_span!("case", name = %case.name);
        async {
            let started = Instant::now();
            let driver = match self.factory.new_driver().await {
                Ok(driver) => driver,
                Err(e) => {
                    if self.config.fail_fast {
                        stop.store(true, Ordering::SeqCst);
                    }
                    return TestResult::fail(&case.name, e.to_string())
                        .with_duration(started.elapsed());
                }
            };
            let page = self.config.page(driver);
            let timeout_ms = case.timeout_ms.unwrap_or(self.config.timeouts.test_ms);

            let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
                if case.needs_session {
                    load_session(&page, &self.config.storage_state).await?;
                }
                if let Some(hook) = case.before_each {
                    hook(&page, &self.config).await?;
                }
                (case.journey)(&page, &self.config).await
            })
            .await
            .unwrap_or_else(|_| {
                Err(ProbeError::Timeout {
                    ms: timeout_ms,
                    waited_for: format!("test case {}", case.name),
                })
            });

            let result = match outcome {
                Ok(()) => {
                    tracing::info!("passed");
                    TestResult::pass(&case.name)
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed");
                    if self.config.fail_fast {
                        stop.store(true, Ordering::SeqCst);
                    }
                    let mut result = TestResult::fail(&case.name, e.to_string());
                    result.screenshot = self.capture_failure(&page, &case.name).await;
                    result
                }
            };
            if let Err(e) = page.close().await {
                tracing::warn!(error = %e, "closing page failed");
            }
            result.with_duration(started.elapsed())
        }
        .instrument(span)
        .await
    }

    /// Best-effort failure screenshot
    async fn capture_failure(&self, page: &Page, case: &str) -> Option<PathBuf> {
        let png = match page.screenshot().await {
            Ok(png) if !png.is_empty() => png,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "screenshot failed");
                return None;
            }
        };
        let path = self.config.output_dir.join(format!("{}.png", artifact_name(case)));
        let written = async {
            tokio::fs::create_dir_all(&self.config.output_dir).await?;
            tokio::fs::write(&path, png).await
        }
        .await;
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "writing screenshot failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::Cookie;
    use crate::mock::{MockDriver, MockDriverFactory, MOCK_SCREENSHOT};
    use futures::FutureExt;

    fn ok_journey<'a>(_: &'a Page, _: &'a SuiteConfig) -> BoxFuture<'a, ProbeResult<()>> {
        async { Ok(()) }.boxed()
    }

    fn failing_journey<'a>(_: &'a Page, _: &'a SuiteConfig) -> BoxFuture<'a, ProbeResult<()>> {
        async { Err(ProbeError::assertion("total mismatch")) }.boxed()
    }

    fn slow_journey<'a>(page: &'a Page, _: &'a SuiteConfig) -> BoxFuture<'a, ProbeResult<()>> {
        async move {
            page.wait_for_timeout(500).await;
            Ok(())
        }
        .boxed()
    }

    fn cookie_journey<'a>(page: &'a Page, _: &'a SuiteConfig) -> BoxFuture<'a, ProbeResult<()>> {
        async move {
            let state = page.storage_state().await?;
            if state.cookies.iter().any(|c| c.name == "PHPSESSID") {
                Ok(())
            } else {
                Err(ProbeError::assertion("session cookie missing"))
            }
        }
        .boxed()
    }

    fn config(dir: &Path) -> SuiteConfig {
        SuiteConfig::default()
            .with_base_url("https://shop.test")
            .with_output_dir(dir.join("out"))
            .with_storage_state(dir.join("state.json"))
    }

    fn runner(config: SuiteConfig) -> (SuiteRunner, MockDriverFactory) {
        let factory = MockDriverFactory::new(MockDriver::new);
        (SuiteRunner::new(config, Arc::new(factory.clone())), factory)
    }

    mod suite_tests {
        use super::*;

        #[test]
        fn test_matching_filter() {
            let suite = TestSuite::new("storefront")
                .with_test(TestCase::new("product::pincode_availability", ok_journey))
                .with_test(TestCase::new("checkout::fill_shipping_address", ok_journey));
            assert_eq!(suite.test_count(), 2);
            assert_eq!(suite.matching(None).len(), 2);
            assert_eq!(suite.matching(Some("checkout")).len(), 1);
            assert_eq!(suite.matching(Some("nope")).len(), 0);
        }

        #[test]
        fn test_artifact_name() {
            assert_eq!(
                artifact_name("checkout::payment_mode_updates_total"),
                "checkout__payment_mode_updates_total"
            );
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test]
        async fn test_pass_fail_and_screenshot() {
            let dir = tempfile::tempdir().unwrap();
            let (runner, factory) = runner(config(dir.path()));
            let suite = TestSuite::new("s")
                .with_test(TestCase::new("a::ok", ok_journey))
                .with_test(TestCase::new("a::bad", failing_journey));
            let report = runner.run(&suite).await.unwrap();
            assert_eq!(report.passed_count(), 1);
            assert_eq!(report.failed_count(), 1);
            assert!(!report.all_passed());
            assert_eq!(report.results[0].name, "a::ok");

            let failed = &report.results[1];
            assert!(failed.error.as_deref().unwrap().contains("total mismatch"));
            let shot = failed.screenshot.clone().unwrap();
            assert_eq!(std::fs::read(shot).unwrap(), MOCK_SCREENSHOT);

            // One fresh driver per case, each closed afterwards.
            let opened = factory.opened();
            assert_eq!(opened.len(), 2);
            assert!(opened.iter().all(MockDriver::is_closed));
        }

        #[tokio::test]
        async fn test_empty_run_is_not_a_pass() {
            let dir = tempfile::tempdir().unwrap();
            let (runner, _) = runner(config(dir.path()));
            let runner = runner.with_filter("no-such-journey");
            let suite = TestSuite::new("s").with_test(TestCase::new("a::ok", ok_journey));
            let report = runner.run(&suite).await.unwrap();
            assert_eq!(report.total(), 0);
            assert!(!report.all_passed());
        }

        #[tokio::test]
        async fn test_fail_fast_skips_the_rest() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = config(dir.path());
            config.fail_fast = true;
            let (runner, _) = runner(config);
            let suite = TestSuite::new("s")
                .with_test(TestCase::new("first", failing_journey))
                .with_test(TestCase::new("second", ok_journey))
                .with_test(TestCase::new("third", ok_journey));
            let report = runner.run(&suite).await.unwrap();
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.skipped_count(), 2);
        }

        #[tokio::test]
        async fn test_case_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let (runner, _) = runner(config(dir.path()));
            let suite = TestSuite::new("s").with_test(TestCase::new("slow", slow_journey).with_timeout(20));
            let report = runner.run(&suite).await.unwrap();
            assert!(report.results[0].error.as_deref().unwrap().contains("20ms"));
        }

        #[tokio::test]
        async fn test_missing_session_hint() {
            let dir = tempfile::tempdir().unwrap();
            let (runner, _) = runner(config(dir.path()));
            let suite = TestSuite::new("s").with_test(TestCase::new("needs", ok_journey).with_session());
            let report = runner.run(&suite).await.unwrap();
            assert!(report.results[0]
                .error
                .as_deref()
                .unwrap()
                .contains("storeprobe setup"));
        }

        #[tokio::test]
        async fn test_session_loaded_into_each_case() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path()).with_workers(2);
            StorageState::new()
                .with_cookie(Cookie::new("PHPSESSID", "abc", "shop.test"))
                .save(&config.storage_state)
                .unwrap();
            let (runner, _) = runner(config);
            let suite = TestSuite::new("s")
                .with_test(TestCase::new("one", cookie_journey).with_session())
                .with_test(TestCase::new("two", cookie_journey).with_session())
                .with_test(TestCase::new("anon", cookie_journey));
            let report = runner.with_filter("o").run(&suite).await.unwrap();
            // "one", "two" and "anon" all contain an "o".
            assert_eq!(report.total(), 3);
            assert_eq!(report.passed_count(), 2);
            assert_eq!(report.results[2].status, TestStatus::Failed);
        }

        #[tokio::test]
        async fn test_report_json() {
            let dir = tempfile::tempdir().unwrap();
            let (runner, _) = runner(config(dir.path()));
            let suite = TestSuite::new("s").with_test(TestCase::new("ok", ok_journey));
            let report = runner.run(&suite).await.unwrap();
            let path = report.write_json(dir.path()).unwrap();
            let json: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(json["suite"], "s");
            assert_eq!(json["results"][0]["status"], "passed");
            assert!(json["run_id"].is_string());
        }
    }
}
