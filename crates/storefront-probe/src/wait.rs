//! Wait Mechanisms
//!
//! Playwright-compatible polling used by locator auto-waiting, `expect()`
//! assertions and URL waits.

use crate::result::{ProbeError, ProbeResult};
use std::future::Future;
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for expectations and locator auto-waits (5 seconds)
pub const DEFAULT_EXPECT_TIMEOUT_MS: u64 = 5_000;

/// Default navigation timeout (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_EXPECT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Outcome of a single poll attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Condition satisfied
    Ready(T),
    /// Not yet; carries a description of what was observed
    Pending(String),
}

/// Poll `attempt` until it reports [`Probe::Ready`] or the timeout elapses.
///
/// The attempt always runs at least once. Errors returned by the attempt
/// abort the wait immediately. On timeout the error names `waiting_for`
/// together with the last pending observation.
pub async fn poll_until<T, F, Fut>(
    options: WaitOptions,
    waiting_for: &str,
    mut attempt: F,
) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Probe<T>>>,
{
    let started = Instant::now();
    loop {
        let last = match attempt().await? {
            Probe::Ready(value) => return Ok(value),
            Probe::Pending(observed) => observed,
        };
        if started.elapsed() >= options.timeout() {
            let waited_for = if last.is_empty() {
                waiting_for.to_string()
            } else {
                format!("{waiting_for} (last seen: {last})")
            };
            return Err(ProbeError::Timeout {
                ms: options.timeout_ms,
                waited_for,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

// =============================================================================
// URL PATTERNS
// =============================================================================

/// URL pattern for `wait_for_url` (Playwright glob semantics)
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Glob: `**` matches anything, `*` matches within one path segment
    Glob(regex::Regex),
    /// Regex match
    Regex(regex::Regex),
}

impl UrlPattern {
    /// Compile a glob such as `**/checkout`
    pub fn glob(pattern: &str) -> ProbeResult<Self> {
        let mut re = String::from("^");
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' if chars.peek() == Some(&'*') => {
                    let _ = chars.next();
                    re.push_str(".*");
                }
                '*' => re.push_str("[^/]*"),
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');
        regex::Regex::new(&re)
            .map(Self::Glob)
            .map_err(|e| ProbeError::config(format!("invalid URL glob {pattern:?}: {e}")))
    }

    /// Compile a regular expression
    pub fn regex(pattern: &str) -> ProbeResult<Self> {
        regex::Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| ProbeError::config(format!("invalid URL regex {pattern:?}: {e}")))
    }

    /// Parse a pattern the way Playwright does: strings containing `*` are
    /// globs, everything else must match exactly.
    pub fn parse(pattern: &str) -> ProbeResult<Self> {
        if pattern.contains('*') {
            Self::glob(pattern)
        } else {
            Ok(Self::Exact(pattern.to_string()))
        }
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(expected) => url == expected,
            Self::Glob(re) | Self::Regex(re) => re.is_match(url),
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(url) => write!(f, "{url}"),
            Self::Glob(re) | Self::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_EXPECT_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_chained() {
            let opts = WaitOptions::new().with_timeout(10_000).with_poll_interval(5);
            assert_eq!(opts.timeout(), Duration::from_secs(10));
            assert_eq!(opts.poll_interval(), Duration::from_millis(5));
        }
    }

    mod poll_tests {
        use super::*;

        #[tokio::test]
        async fn test_ready_on_third_attempt() {
            let attempts = AtomicUsize::new(0);
            let opts = WaitOptions::new().with_timeout(1_000).with_poll_interval(1);
            let value = poll_until(opts, "counter", || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                Ok(if n >= 2 {
                    Probe::Ready(n)
                } else {
                    Probe::Pending(format!("n={n}"))
                })
            })
            .await
            .unwrap();
            assert_eq!(value, 2);
        }

        #[tokio::test]
        async fn test_timeout_reports_last_observation() {
            let opts = WaitOptions::new().with_timeout(20).with_poll_interval(5);
            let err = poll_until::<(), _, _>(opts, "total to update", || async {
                Ok(Probe::Pending("₹67472".to_string()))
            })
            .await
            .unwrap_err();
            match err {
                ProbeError::Timeout { ms, waited_for } => {
                    assert_eq!(ms, 20);
                    assert!(waited_for.contains("total to update"));
                    assert!(waited_for.contains("₹67472"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_attempt_error_aborts() {
            let attempts = AtomicUsize::new(0);
            let opts = WaitOptions::new().with_timeout(1_000).with_poll_interval(1);
            let err = poll_until::<(), _, _>(opts, "anything", || async {
                let _ = attempts.fetch_add(1, Ordering::SeqCst);
                Err(ProbeError::page("detached"))
            })
            .await
            .unwrap_err();
            assert!(matches!(err, ProbeError::PageError { .. }));
            assert_eq!(attempts.load(Ordering::SeqCst), 1);
        }
    }

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_double_star_glob() {
            let p = UrlPattern::glob("**/checkout").unwrap();
            assert!(p.matches("https://testingenv-2021.toolsvilla.in/checkout"));
            assert!(p.matches("http://localhost/checkout"));
            assert!(!p.matches("https://shop.test/checkout/success"));
            assert!(!p.matches("https://shop.test/checkoutx"));
        }

        #[test]
        fn test_single_star_stays_in_segment() {
            let p = UrlPattern::glob("https://shop.test/*/cart").unwrap();
            assert!(p.matches("https://shop.test/checkout/cart"));
            assert!(!p.matches("https://shop.test/a/b/cart"));
        }

        #[test]
        fn test_glob_escapes_regex_metacharacters() {
            let p = UrlPattern::glob("**/search?q=*").unwrap();
            assert!(p.matches("https://shop.test/search?q=drill"));
            assert!(!p.matches("https://shop.test/searchXq=drill"));
        }

        #[test]
        fn test_parse_exact_and_glob() {
            assert!(matches!(
                UrlPattern::parse("https://shop.test/").unwrap(),
                UrlPattern::Exact(_)
            ));
            assert!(matches!(
                UrlPattern::parse("**/checkout").unwrap(),
                UrlPattern::Glob(_)
            ));
        }

        #[test]
        fn test_regex() {
            let p = UrlPattern::regex(r"/checkout(/cart)?$").unwrap();
            assert!(p.matches("https://shop.test/checkout/cart"));
            assert!(UrlPattern::regex("(").is_err());
        }
    }
}
