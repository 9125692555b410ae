//! Page handle used by journeys, page objects and the login bootstrap.
//!
//! A [`Page`] wraps one [`PageDriver`] with the storefront base URL so
//! journeys can navigate with relative paths (`/checkout`) the way a
//! configured `baseURL` works in Playwright.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::context::StorageState;
use crate::driver::{origin_of, PageDriver};
use crate::locator::{AriaRole, Locator, LocatorOptions, Selector};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, Probe, UrlPattern, WaitOptions, DEFAULT_NAVIGATION_TIMEOUT_MS};

/// A browser page bound to a storefront
#[derive(Debug, Clone)]
pub struct Page {
    driver: Arc<dyn PageDriver>,
    base_url: String,
    locator_options: LocatorOptions,
    navigation_timeout: Duration,
}

impl Page {
    /// Create a page for `base_url`
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, base_url: impl Into<String>) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            locator_options: LocatorOptions::default(),
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }

    /// Default options for locators created from this page
    #[must_use]
    pub const fn with_locator_options(mut self, options: LocatorOptions) -> Self {
        self.locator_options = options;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    /// Storefront base URL (no trailing slash)
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    #[must_use]
    pub fn resolve_url(&self, target: &str) -> String {
        if target.contains("://") || target.starts_with("about:") {
            target.to_string()
        } else if target.is_empty() {
            format!("{}/", self.base_url)
        } else if target.starts_with('/') {
            format!("{}{target}", self.base_url)
        } else {
            format!("{}/{target}", self.base_url)
        }
    }

    /// Navigate to a path or URL
    pub async fn goto(&self, target: &str) -> ProbeResult<()> {
        let url = self.resolve_url(target);
        tracing::debug!(%url, "goto");
        match tokio::time::timeout(self.navigation_timeout, self.driver.goto(&url)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::NavigationError {
                url,
                message: format!("timed out after {}ms", self.navigation_timeout.as_millis()),
            }),
        }
    }

    /// Current URL
    pub async fn url(&self) -> ProbeResult<String> {
        self.driver.current_url().await
    }

    /// Locator from a selector
    #[must_use]
    pub fn locate(&self, selector: Selector) -> Locator {
        Locator::new(self.driver.clone(), selector, self.locator_options)
    }

    /// Locator from a raw CSS / XPath string (`page.locator(...)`)
    #[must_use]
    pub fn locator(&self, raw: &str) -> Locator {
        self.locate(Selector::parse(raw))
    }

    /// Locator by ARIA role and accessible name
    #[must_use]
    pub fn get_by_role(&self, role: AriaRole, name: &str) -> Locator {
        self.locate(Selector::role(role, name))
    }

    /// Locator by placeholder text
    #[must_use]
    pub fn get_by_placeholder(&self, placeholder: &str) -> Locator {
        self.locate(Selector::placeholder(placeholder))
    }

    /// Locator by visible text (substring, case-insensitive)
    #[must_use]
    pub fn get_by_text(&self, text: &str) -> Locator {
        self.locate(Selector::text(text))
    }

    /// Wait until the URL matches `pattern` (`**/checkout`, or an exact URL)
    pub async fn wait_for_url(&self, pattern: &str, timeout_ms: u64) -> ProbeResult<()> {
        let pattern = UrlPattern::parse(pattern)?;
        let options = WaitOptions::new().with_timeout(timeout_ms);
        let waiting_for = format!("URL to match {pattern}");
        let pattern = &pattern;
        poll_until(options, &waiting_for, || async move {
            let url = self.driver.current_url().await?;
            Ok(if pattern.matches(&url) {
                Probe::Ready(())
            } else {
                Probe::Pending(url)
            })
        })
        .await
    }

    /// Fixed delay
    pub async fn wait_for_timeout(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Evaluate a script and deserialize its result
    pub async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> ProbeResult<T> {
        let value = self.driver.evaluate(script).await?;
        serde_json::from_value(value).map_err(|e| ProbeError::EvaluationError {
            message: format!("unexpected result shape: {e}"),
        })
    }

    /// Capture cookies and local storage
    pub async fn storage_state(&self) -> ProbeResult<StorageState> {
        self.driver.storage_state().await
    }

    /// Load a saved session: cookies first, then local storage per origin.
    ///
    /// Local storage can only be written on a document of its origin, so this
    /// navigates to each origin that has entries.
    pub async fn add_storage_state(&self, state: &StorageState) -> ProbeResult<()> {
        if !state.cookies.is_empty() {
            self.driver.add_cookies(&state.cookies).await?;
        }
        for origin in state.origins.iter().filter(|o| !o.local_storage.is_empty()) {
            if origin_of(&origin.origin).is_none() {
                tracing::warn!(origin = %origin.origin, "skipping local storage for invalid origin");
                continue;
            }
            self.goto(&origin.origin).await?;
            let entries: Vec<(String, String)> = origin
                .local_storage
                .iter()
                .map(|nv| (nv.name.clone(), nv.value.clone()))
                .collect();
            self.driver.set_local_storage(&entries).await?;
        }
        tracing::debug!(
            cookies = state.cookies.len(),
            local_storage = state.local_storage_len(),
            "session state applied"
        );
        Ok(())
    }

    /// Write local storage entries on the current origin
    pub async fn set_local_storage(&self, key: &str, value: &str) -> ProbeResult<()> {
        self.driver
            .set_local_storage(&[(key.to_string(), value.to_string())])
            .await
    }

    /// PNG screenshot
    pub async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        self.driver.screenshot().await
    }

    /// Close the page
    pub async fn close(&self) -> ProbeResult<()> {
        self.driver.close().await
    }
}
