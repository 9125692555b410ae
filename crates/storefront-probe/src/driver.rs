//! PageDriver - Abstract Browser Automation Trait
//!
//! Everything above this trait (locators, expectations, page objects,
//! journeys, the bootstrap) talks to a page only through [`PageDriver`].
//!
//! # Implementations
//!
//! - `ChromiumDriver` - real browser over CDP (feature `browser`)
//! - `MockDriver` - scripted in-memory storefront for unit and integration tests

use crate::context::{Cookie, StorageState};
use crate::locator::Selector;
use crate::result::ProbeResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Abstract driver trait for browser automation.
///
/// Element operations address the `index`-th match of `selector`; callers
/// are expected to have resolved the index through a [`crate::Locator`].
#[async_trait]
pub trait PageDriver: std::fmt::Debug + Send + Sync {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Get current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Count elements matching the selector
    async fn count(&self, selector: &Selector) -> ProbeResult<usize>;

    /// Whether the `index`-th match exists and is visible
    async fn is_visible(&self, selector: &Selector, index: usize) -> ProbeResult<bool>;

    /// Text content of the `index`-th match (`None` if it does not exist)
    async fn text_content(&self, selector: &Selector, index: usize)
        -> ProbeResult<Option<String>>;

    /// Value of the `index`-th input match
    async fn input_value(&self, selector: &Selector, index: usize) -> ProbeResult<String>;

    /// Click the `index`-th match
    async fn click(&self, selector: &Selector, index: usize) -> ProbeResult<()>;

    /// Replace the value of the `index`-th input match
    async fn fill(&self, selector: &Selector, index: usize, value: &str) -> ProbeResult<()>;

    /// Execute JavaScript in page context
    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value>;

    /// Capture cookies and local storage of the current origin
    async fn storage_state(&self) -> ProbeResult<StorageState>;

    /// Add cookies to the browsing context
    async fn add_cookies(&self, cookies: &[Cookie]) -> ProbeResult<()>;

    /// Write local storage entries for the current origin
    async fn set_local_storage(&self, entries: &[(String, String)]) -> ProbeResult<()>;

    /// Take a PNG screenshot (empty when the driver cannot render)
    async fn screenshot(&self) -> ProbeResult<Vec<u8>>;

    /// Close the page
    async fn close(&self) -> ProbeResult<()>;
}

/// Produces a fresh, isolated driver for every test case
/// (one browser context per test).
#[async_trait]
pub trait DriverFactory: std::fmt::Debug + Send + Sync {
    /// Open a new isolated page
    async fn new_driver(&self) -> ProbeResult<Arc<dyn PageDriver>>;

    /// Release shared resources (browser process) after the run
    async fn shutdown(&self) -> ProbeResult<()> {
        Ok(())
    }
}

/// Origin (`scheme://host[:port]`) of an absolute URL
#[must_use]
pub fn origin_of(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let host = rest.split(['/', '?', '#']).next()?;
    if host.is_empty() {
        return None;
    }
    Some(format!("{scheme}://{host}"))
}

/// Path component of an absolute URL, without query or fragment
#[must_use]
pub fn path_of(url: &str) -> String {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = after_scheme
        .find('/')
        .map_or("/", |idx| &after_scheme[idx..]);
    let path = path.split(['?', '#']).next().unwrap_or("/");
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
