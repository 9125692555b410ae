//! Locator abstraction for element selection and interaction.
//!
//! # Design Philosophy
//!
//! - **Auto-Waiting**: actions wait for the element to be attached and visible
//! - **Strict Selection**: fails if multiple elements match (prevents flaky tests)
//!   unless narrowed with [`Locator::first`] or [`Locator::nth`]
//! - **User-facing selectors**: role + accessible name, placeholder and text,
//!   alongside CSS and XPath

use std::sync::Arc;
use std::time::Duration;

use crate::driver::PageDriver;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, Probe, WaitOptions, DEFAULT_EXPECT_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};

/// ARIA roles understood by [`Selector::Role`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaRole {
    /// `button`, `input[type=button|submit]`, `[role=button]`
    Button,
    /// `a[href]`, `[role=link]`
    Link,
    /// `h1`-`h6`, `[role=heading]`
    Heading,
    /// `input[type=checkbox]`, `[role=checkbox]`
    Checkbox,
    /// `input[type=radio]`, `[role=radio]`
    Radio,
    /// text inputs and textareas
    Textbox,
}

impl AriaRole {
    /// Role name as written in selectors
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Link => "link",
            Self::Heading => "heading",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Textbox => "textbox",
        }
    }

    /// CSS matching elements with this implicit or explicit role
    #[must_use]
    pub const fn css(&self) -> &'static str {
        match self {
            Self::Button => {
                "button, [role=button], input[type=button], input[type=submit], input[type=reset]"
            }
            Self::Link => "a[href], [role=link]",
            Self::Heading => "h1, h2, h3, h4, h5, h6, [role=heading]",
            Self::Checkbox => "input[type=checkbox], [role=checkbox]",
            Self::Radio => "input[type=radio], [role=radio]",
            Self::Textbox => {
                "input:not([type]), input[type=text], input[type=tel], input[type=email], \
                 input[type=search], textarea, [role=textbox]"
            }
        }
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "#mini-cart-count")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Text content selector; case-insensitive substring unless `exact`
    Text {
        /// Text to find
        text: String,
        /// Require the full normalized text to match
        exact: bool,
    },
    /// Role selector with accessible name filter
    Role {
        /// ARIA role
        role: AriaRole,
        /// Accessible name (case-insensitive substring)
        name: Option<String>,
    },
    /// Placeholder attribute selector
    Placeholder(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::XPath(selector.into())
    }

    /// Create a text selector (substring, case-insensitive)
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: false,
        }
    }

    /// Create an exact text selector
    #[must_use]
    pub fn exact_text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: true,
        }
    }

    /// Create a role selector with an accessible name
    #[must_use]
    pub fn role(role: AriaRole, name: impl Into<String>) -> Self {
        Self::Role {
            role,
            name: Some(name.into()),
        }
    }

    /// Create a placeholder selector
    #[must_use]
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder(text.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Parse a raw locator string: `//…` and `xpath=…` are XPath,
    /// `text=…` is text, everything else is CSS.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Some(xpath) = raw.strip_prefix("xpath=") {
            Self::xpath(xpath)
        } else if raw.starts_with("//") || raw.starts_with("(//") {
            Self::xpath(raw)
        } else if let Some(text) = raw.strip_prefix("text=") {
            Self::text(text)
        } else {
            Self::css(raw.strip_prefix("css=").unwrap_or(raw))
        }
    }

    /// JavaScript expression evaluating to an array of all matching elements
    #[must_use]
    pub fn to_query_all(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_str(s)),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()",
                js_str(s)
            ),
            Self::Text { text, exact } => format!(
                "(() => {{ const norm = s => (s || '').replace(/\\s+/g, ' ').trim().toLowerCase(); \
                 const want = norm({}); const hit = el => {} ; \
                 return Array.from(document.body.querySelectorAll('*')).filter(el => \
                 hit(el) && !Array.from(el.children).some(hit)); }})()",
                js_str(text),
                if *exact {
                    "norm(el.textContent) === want"
                } else {
                    "norm(el.textContent).includes(want)"
                }
            ),
            Self::Role { role, name } => {
                let base = format!("Array.from(document.querySelectorAll({}))", js_str(role.css()));
                match name {
                    Some(name) => format!(
                        "{base}.filter(el => {{ const n = (el.getAttribute('aria-label') || \
                         el.textContent || el.value || el.getAttribute('alt') || '') \
                         .replace(/\\s+/g, ' ').trim().toLowerCase(); \
                         return n.includes({}.toLowerCase()); }})",
                        js_str(name)
                    ),
                    None => base,
                }
            }
            Self::Placeholder(text) => format!(
                "Array.from(document.querySelectorAll('[placeholder]')).filter(el => \
                 el.getAttribute('placeholder').toLowerCase().includes({}.toLowerCase()))",
                js_str(text)
            ),
            Self::TestId(id) => format!(
                "Array.from(document.querySelectorAll({}))",
                js_str(&format!("[data-testid=\"{id}\"]"))
            ),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Text { text, exact: false } => write!(f, "text={text}"),
            Self::Text { text, exact: true } => write!(f, "text=\"{text}\""),
            Self::Role { role, name: Some(name) } => {
                write!(f, "role={}[name=\"{name}\"]", role.as_str())
            }
            Self::Role { role, name: None } => write!(f, "role={}", role.as_str()),
            Self::Placeholder(p) => write!(f, "placeholder={p}"),
            Self::TestId(id) => write!(f, "testid={id}"),
        }
    }
}

/// Quote a string as a JavaScript literal
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Locator options for customizing behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout for auto-waiting
    pub timeout: Duration,
    /// Polling interval for auto-waiting
    pub poll_interval: Duration,
    /// Whether to require strict single-element match
    pub strict: bool,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_EXPECT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            strict: true,
        }
    }
}

impl LocatorOptions {
    pub(crate) fn wait_options(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(self.timeout.as_millis() as u64)
            .with_poll_interval(self.poll_interval.as_millis() as u64)
    }
}

/// A live locator bound to a page.
///
/// Locators are cheap to clone and resolve lazily: nothing touches the page
/// until an action or query runs.
#[derive(Debug, Clone)]
pub struct Locator {
    driver: Arc<dyn PageDriver>,
    selector: Selector,
    index: Option<usize>,
    options: LocatorOptions,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, selector: Selector, options: LocatorOptions) -> Self {
        Self {
            driver,
            selector,
            index: None,
            options,
        }
    }

    /// Narrow to the first match
    #[must_use]
    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Narrow to the `index`-th match
    #[must_use]
    pub fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Set a custom auto-wait timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Disable strict mode (allow multiple matches, act on the first)
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Explicit index, if narrowed
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    pub(crate) fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    /// Human-readable description, e.g. `role=button[name="Get OTP"] >> nth=0`
    #[must_use]
    pub fn describe(&self) -> String {
        match self.index {
            Some(i) => format!("{} >> nth={i}", self.selector),
            None => self.selector.to_string(),
        }
    }

    /// Resolve the element index without waiting.
    ///
    /// Returns `Ok(None)` when nothing matches yet and
    /// [`ProbeError::StrictModeViolation`] when a strict locator matches
    /// more than one element.
    pub async fn try_resolve(&self) -> ProbeResult<Option<usize>> {
        let count = self.driver.count(&self.selector).await?;
        match self.index {
            Some(i) if i < count => Ok(Some(i)),
            Some(_) => Ok(None),
            None if count == 0 => Ok(None),
            None if count > 1 && self.options.strict => Err(ProbeError::StrictModeViolation {
                selector: self.describe(),
                count,
            }),
            None => Ok(Some(0)),
        }
    }

    /// Wait until the element is attached and visible, returning its index
    async fn resolve_visible(&self) -> ProbeResult<usize> {
        let waiting_for = format!("{} to be visible", self.describe());
        poll_until(self.options.wait_options(), &waiting_for, || async move {
            let Some(index) = self.try_resolve().await? else {
                return Ok(Probe::Pending("not attached".to_string()));
            };
            if self.driver.is_visible(&self.selector, index).await? {
                Ok(Probe::Ready(index))
            } else {
                Ok(Probe::Pending("hidden".to_string()))
            }
        })
        .await
    }

    /// Click the element once it is visible
    pub async fn click(&self) -> ProbeResult<()> {
        let index = self.resolve_visible().await?;
        tracing::debug!(locator = %self.describe(), "click");
        self.driver.click(&self.selector, index).await
    }

    /// Fill the element with text once it is visible
    pub async fn fill(&self, value: &str) -> ProbeResult<()> {
        let index = self.resolve_visible().await?;
        tracing::debug!(locator = %self.describe(), "fill");
        self.driver.fill(&self.selector, index, value).await
    }

    /// Wait for the element to be visible
    pub async fn wait_for_visible(&self) -> ProbeResult<()> {
        self.resolve_visible().await.map(|_| ())
    }

    /// Text content of the element (auto-waits for attachment)
    pub async fn text_content(&self) -> ProbeResult<String> {
        let waiting_for = format!("{} to be attached", self.describe());
        poll_until(self.options.wait_options(), &waiting_for, || async move {
            match self.try_resolve().await? {
                Some(index) => Ok(self
                    .driver
                    .text_content(&self.selector, index)
                    .await?
                    .map_or_else(|| Probe::Pending("detached".to_string()), Probe::Ready)),
                None => Ok(Probe::Pending("not attached".to_string())),
            }
        })
        .await
    }

    /// Current value of an input element (auto-waits for attachment)
    pub async fn input_value(&self) -> ProbeResult<String> {
        let waiting_for = format!("{} to be attached", self.describe());
        poll_until(self.options.wait_options(), &waiting_for, || async move {
            match self.try_resolve().await? {
                Some(index) => Ok(Probe::Ready(
                    self.driver.input_value(&self.selector, index).await?,
                )),
                None => Ok(Probe::Pending("not attached".to_string())),
            }
        })
        .await
    }

    /// Whether the element is currently visible (no waiting)
    pub async fn is_visible(&self) -> ProbeResult<bool> {
        match self.try_resolve().await? {
            Some(index) => self.driver.is_visible(&self.selector, index).await,
            None => Ok(false),
        }
    }

    /// Number of matching elements (no waiting)
    pub async fn count(&self) -> ProbeResult<usize> {
        self.driver.count(&self.selector).await
    }
}
