//! Console output: spinners, per-case lines and the run summary

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use storefront_probe::{LoadReport, SessionSummary, SuiteReport, TestResult, TestStatus};

/// Progress reporter for setup and test runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner until [`Self::finish`]
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Clear the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn mark(&self, colored: console::StyledObject<&'static str>, plain: &str) -> String {
        if self.use_color {
            colored.bold().to_string()
        } else {
            plain.to_string()
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.mark(style("✓").green(), "PASS");
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message (even in quiet mode)
    pub fn failure(&self, message: &str) {
        let prefix = self.mark(style("✗").red(), "FAIL");
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.mark(style("⚠").yellow(), "WARN");
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.mark(style("ℹ").blue(), "INFO");
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print one case result
    pub fn case(&self, result: &TestResult) {
        let line = format!("{} ({}ms)", result.name, result.duration_ms);
        match result.status {
            TestStatus::Passed => self.success(&line),
            TestStatus::Skipped => self.warning(&format!("{line} skipped")),
            TestStatus::Failed => {
                self.failure(&line);
                if let Some(ref error) = result.error {
                    let _ = self.term.write_line(&format!("    {error}"));
                }
                if let Some(ref shot) = result.screenshot {
                    let _ = self.term.write_line(&format!("    screenshot: {}", shot.display()));
                }
            }
        }
    }

    /// Print every case and the summary line
    pub fn report(&self, report: &SuiteReport) {
        for result in &report.results {
            self.case(result);
        }
        self.summary(
            report.passed_count(),
            report.failed_count(),
            report.skipped_count(),
            Duration::from_millis(report.duration_ms),
        );
    }

    /// Print test summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }
        let _ = self.term.write_line("");
        let _ = self
            .term
            .write_line(&summary_line(passed, failed, skipped, duration, self.use_color));
    }

    /// Print a session file summary
    pub fn session(&self, path: &str, summary: &SessionSummary) {
        let _ = self.term.write_line(&format!("Session file: {path}"));
        let _ = self.term.write_line(&format!(
            "  Cookies: {} ({} session-only)",
            summary.cookies, summary.session_cookies
        ));
        if let Some(expiry) = summary.earliest_expiry {
            let _ = self
                .term
                .write_line(&format!("  Earliest expiry: {}", expiry.to_rfc3339()));
        }
        if summary.is_stale() {
            self.warning(&format!(
                "expired cookies: {}",
                summary.expired_cookies.join(", ")
            ));
        }
        for (origin, keys) in &summary.origins {
            let _ = self
                .term
                .write_line(&format!("  {origin}: {}", keys.join(", ")));
        }
    }
}

impl ProgressReporter {
    /// Print a load run report
    pub fn load_report(&self, report: &LoadReport) {
        for line in render_load_report(report).lines() {
            let _ = self.term.write_line(line);
        }
        if report.failed_requests > 0 {
            self.warning(&format!(
                "{} of {} requests failed",
                report.failed_requests, report.total_requests
            ));
        }
    }
}

/// Per-endpoint table of a load run
#[must_use]
pub fn render_load_report(report: &LoadReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("LOAD RUN RESULTS: {} users\n", report.users));
    output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    output.push_str(&format!(
        "Duration: {:.1}s │ Total Requests: {} │ Failed: {} ({:.2}%)\n\n",
        report.duration_ms as f64 / 1000.0,
        report.total_requests,
        report.failed_requests,
        report.error_rate()
    ));

    output.push_str("Request Statistics:\n");
    output.push_str("┌─────────────────┬─────────┬─────────┬─────────┬─────────┬─────────┬─────────┐\n");
    output.push_str("│ Endpoint        │ Count   │ avg     │ p50     │ p95     │ max     │ Errors  │\n");
    output.push_str("├─────────────────┼─────────┼─────────┼─────────┼─────────┼─────────┼─────────┤\n");
    for stat in &report.endpoints {
        output.push_str(&format!(
            "│ {:<15} │ {:>7} │ {:>5}ms │ {:>5}ms │ {:>5}ms │ {:>5}ms │ {:>7} │\n",
            truncate(&stat.name, 15),
            stat.count,
            stat.avg_ms,
            stat.p50_ms,
            stat.p95_ms,
            stat.max_ms,
            stat.errors
        ));
    }
    output.push_str("└─────────────────┴─────────┴─────────┴─────────┴─────────┴─────────┴─────────┘\n\n");

    output.push_str(&format!("Throughput: {:.1} req/s\n", report.throughput_rps));
    if !report.errors.is_empty() {
        output.push_str("\nErrors:\n");
        for error in &report.errors {
            output.push_str(&format!(
                "  {:>5} × {} {}\n",
                error.count, error.endpoint, error.message
            ));
        }
    }
    output
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 1).collect();
        format!("{kept}…")
    }
}

/// `PASSED 6 tests in 1.20s (6 passed, 0 failed, 0 skipped)`
#[must_use]
pub fn summary_line(
    passed: usize,
    failed: usize,
    skipped: usize,
    duration: Duration,
    use_color: bool,
) -> String {
    let total = passed + failed + skipped;
    let secs = duration.as_secs_f64();
    let status = if failed > 0 { "FAILED" } else { "PASSED" };
    if !use_color {
        return format!(
            "{status} {total} tests in {secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
        );
    }
    let passed_style = Style::new().green().bold();
    let failed_style = Style::new().red().bold();
    let status = if failed > 0 {
        failed_style.apply_to(status)
    } else {
        passed_style.apply_to(status)
    };
    format!(
        "{status} {total} tests in {secs:.2}s ({} passed, {} failed, {} skipped)",
        passed_style.apply_to(passed),
        if failed > 0 {
            failed_style.apply_to(failed).to_string()
        } else {
            failed.to_string()
        },
        Style::new().yellow().apply_to(skipped)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(false, true);
            assert!(!reporter.use_color);
            assert!(reporter.quiet);
        }

        #[test]
        fn test_quiet_spinner_is_noop() {
            let mut reporter = ProgressReporter::new(false, true);
            reporter.start_spinner("logging in");
            assert!(reporter.spinner.is_none());
            reporter.finish();
        }
    }

    mod load_report_tests {
        use super::*;

        fn report() -> LoadReport {
            serde_json::from_value(serde_json::json!({
                "run_id": "00000000-0000-0000-0000-000000000000",
                "started_at": "2026-01-01T00:00:00Z",
                "duration_ms": 2500,
                "users": 2,
                "total_requests": 40,
                "failed_requests": 4,
                "throughput_rps": 14.4,
                "endpoints": [{
                    "name": "/api/cart/add", "method": "POST", "count": 20, "errors": 4,
                    "min_ms": 3, "avg_ms": 12, "p50_ms": 10, "p95_ms": 30, "p99_ms": 40, "max_ms": 41
                }],
                "errors": [{ "endpoint": "/api/cart/add", "message": "HTTP 503 Service Unavailable", "count": 4 }]
            }))
            .unwrap()
        }

        #[test]
        fn test_render_load_report() {
            let text = render_load_report(&report());
            assert!(text.starts_with("LOAD RUN RESULTS: 2 users"));
            assert!(text.contains("Duration: 2.5s │ Total Requests: 40 │ Failed: 4 (10.00%)"));
            assert!(text.contains("│ /api/cart/add   │      20 │    12ms │    10ms │    30ms │    41ms │       4 │"));
            assert!(text.contains("Throughput: 14.4 req/s"));
            assert!(text.contains("4 × /api/cart/add HTTP 503"));
        }

        #[test]
        fn test_truncate_long_names() {
            assert_eq!(truncate("/api/v1/user/profile/addresses", 15).chars().count(), 15);
            assert_eq!(truncate("/api/checkout", 15), "/api/checkout");
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_plain_summary() {
            let line = summary_line(5, 1, 0, Duration::from_millis(1500), false);
            assert_eq!(line, "FAILED 6 tests in 1.50s (5 passed, 1 failed, 0 skipped)");
        }

        #[test]
        fn test_all_passed() {
            let line = summary_line(6, 0, 0, Duration::from_secs(2), false);
            assert!(line.starts_with("PASSED 6 tests"));
        }
    }
}
