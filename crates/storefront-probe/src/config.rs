//! Suite configuration
//!
//! Everything the journeys and the login bootstrap need to know about the
//! storefront under test: where it lives, which account to log in with, how
//! the OTP reaches us and which fixture values the assertions expect.
//! Loaded from YAML; every field has a default, environment variables
//! override the file, and CLI flags override both.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::PageDriver;
use crate::load::LoadSettings;
use crate::locator::LocatorOptions;
use crate::otp::OtpSettings;
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{DEFAULT_EXPECT_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};

/// Default storefront under test
pub const DEFAULT_BASE_URL: &str = "https://testingenv-2021.toolsvilla.in";

/// Default session file
pub const DEFAULT_STORAGE_STATE: &str = ".auth/storage-state.json";

/// Environment variable overriding [`SuiteConfig::base_url`]
pub const ENV_BASE_URL: &str = "STOREPROBE_BASE_URL";
/// Environment variable overriding [`LoginSettings::phone`]
pub const ENV_PHONE: &str = "STOREPROBE_PHONE";
/// Environment variable overriding [`SuiteConfig::storage_state`]
pub const ENV_STORAGE_STATE: &str = "STOREPROBE_STORAGE_STATE";
/// Environment variable overriding [`BrowserSettings::chromium_path`]
pub const ENV_CHROMIUM_PATH: &str = "STOREPROBE_CHROMIUM_PATH";

/// Timeouts in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Expectation and locator auto-wait timeout
    pub expect_ms: u64,
    /// Navigation timeout
    pub navigation_ms: u64,
    /// Whole test case timeout
    pub test_ms: u64,
    /// Polling interval for waits
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            expect_ms: DEFAULT_EXPECT_TIMEOUT_MS,
            navigation_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            test_ms: 30_000,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSettings {
    /// Run without a visible window
    pub headless: bool,
    /// Chromium executable (auto-detected when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromium_path: Option<PathBuf>,
    /// Disable the chromium sandbox (containers)
    pub no_sandbox: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            no_sandbox: false,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Test account and login flow settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginSettings {
    /// 10-digit mobile number of the test account
    pub phone: String,
    /// Pause after typing the number, before ticking consent
    pub consent_delay_ms: u64,
    /// How long the success toast may take
    pub success_timeout_ms: u64,
    /// Local storage key for token seeding
    pub token_storage_key: String,
    /// OTP source
    pub otp: OtpSettings,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            phone: "9000000001".to_string(),
            consent_delay_ms: 2_000,
            success_timeout_ms: 10_000,
            token_storage_key: "auth_token".to_string(),
            otp: OtpSettings::default(),
        }
    }
}

/// Product journey fixtures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductFixture {
    /// Product page path
    pub path: String,
    /// Product name as shown in the heading
    pub name: String,
    /// Pincode for the delivery check
    pub pincode: String,
}

impl Default for ProductFixture {
    fn default() -> Self {
        Self {
            path: "/ac-induction-motor-copper-winding".to_string(),
            name: "AC Induction Motor Copper Winding".to_string(),
            pincode: "110001".to_string(),
        }
    }
}

/// Checkout journey fixtures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckoutFixture {
    /// Product added to the cart before checkout
    pub product_path: String,
    /// Expected pre-filled contact name
    pub contact_name: String,
    /// Expected pre-filled contact phone
    pub contact_phone: String,
    /// Expected subtotal text
    pub subtotal: String,
    /// Total with the prepaid discount
    pub discounted_total: String,
    /// Total without the discount (partial payment)
    pub full_total: String,
    /// Address line 1
    pub flat_house: String,
    /// Address line 2
    pub street_name: String,
}

impl Default for CheckoutFixture {
    fn default() -> Self {
        Self {
            product_path: "/petrol-brush-cutter-4stroke".to_string(),
            contact_name: "Testing purposes".to_string(),
            contact_phone: "+91 9000000001".to_string(),
            subtotal: "₹68,500.00".to_string(),
            discounted_total: "₹67472".to_string(),
            full_total: "₹68500".to_string(),
            flat_house: "A-123, Test Apartments".to_string(),
            street_name: "Automation Road".to_string(),
        }
    }
}

/// Fixture values the journeys assert against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fixtures {
    /// Product page journey
    pub product: ProductFixture,
    /// Checkout journey
    pub checkout: CheckoutFixture,
}

/// Full suite configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Storefront base URL
    pub base_url: String,
    /// Session file written by setup and read by tests
    pub storage_state: PathBuf,
    /// Screenshots and reports
    pub output_dir: PathBuf,
    /// Concurrent test cases
    pub workers: usize,
    /// Stop scheduling after the first failure
    pub fail_fast: bool,
    /// Timeouts
    pub timeouts: Timeouts,
    /// Browser
    pub browser: BrowserSettings,
    /// Login
    pub login: LoginSettings,
    /// Fixtures
    pub fixtures: Fixtures,
    /// API load run
    pub load: LoadSettings,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            storage_state: PathBuf::from(DEFAULT_STORAGE_STATE),
            output_dir: PathBuf::from("target/storeprobe"),
            workers: 1,
            fail_fast: false,
            timeouts: Timeouts::default(),
            browser: BrowserSettings::default(),
            login: LoginSettings::default(),
            fixtures: Fixtures::default(),
            load: LoadSettings::default(),
        }
    }
}

impl SuiteConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the session file
    #[must_use]
    pub fn with_storage_state(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_state = path.into();
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Set the worker count
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Parse YAML
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> ProbeResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply `STOREPROBE_*` overrides from `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(phone) = lookup(ENV_PHONE) {
            self.login.phone = phone;
        }
        if let Some(path) = lookup(ENV_STORAGE_STATE) {
            self.storage_state = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH) {
            self.browser.chromium_path = Some(PathBuf::from(path));
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_process_env(&mut self) {
        self.apply_env_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> ProbeResult<()> {
        let url = self.base_url.trim();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| {
                ProbeError::config(format!("base_url must be an http(s) URL, got {url:?}"))
            })?;
        if rest.is_empty() || rest.starts_with('/') {
            return Err(ProbeError::config(format!("base_url has no host: {url:?}")));
        }
        let phone = &self.login.phone;
        if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProbeError::config(format!(
                "login.phone must be 10 digits, got {phone:?}"
            )));
        }
        if self.workers == 0 {
            return Err(ProbeError::config("workers must be at least 1"));
        }
        if self.timeouts.expect_ms == 0 || self.timeouts.test_ms == 0 {
            return Err(ProbeError::config("timeouts must be positive"));
        }
        if self.storage_state.as_os_str().is_empty() {
            return Err(ProbeError::config("storage_state path is empty"));
        }
        self.load.validate()
    }

    /// Base URL of the storefront API used by load runs
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        self.load
            .api_base_url
            .as_deref()
            .unwrap_or(&self.base_url)
            .trim()
    }

    /// Locator defaults derived from the timeouts
    #[must_use]
    pub fn locator_options(&self) -> LocatorOptions {
        LocatorOptions {
            timeout: Duration::from_millis(self.timeouts.expect_ms),
            poll_interval: Duration::from_millis(self.timeouts.poll_interval_ms.max(1)),
            strict: true,
        }
    }

    /// Wrap a driver in a page configured for this storefront
    #[must_use]
    pub fn page(&self, driver: Arc<dyn PageDriver>) -> Page {
        Page::new(driver, self.base_url.trim())
            .with_locator_options(self.locator_options())
            .with_navigation_timeout(Duration::from_millis(self.timeouts.navigation_ms))
    }
}
