//! Storefront Probe: end-to-end journeys for an e-commerce storefront
//!
//! Logs a test customer in once (phone number + OTP), persists the session
//! state, and runs product and checkout journeys against authenticated
//! browser contexts loaded from that state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 STOREFRONT PROBE Architecture                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Bootstrap  │    │ Session    │    │ Journeys   │            │
//! │   │ (OTP login)│───►│ file       │───►│ (per-case  │            │
//! │   │            │    │ (JSON)     │    │  context)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │          │                                   │                   │
//! │          ▼                                   ▼                   │
//! │   ┌─────────────────────────────────────────────────┐           │
//! │   │ Page objects ─► Locator / expect ─► PageDriver  │           │
//! │   │                          (chromium CDP | mock)  │           │
//! │   └─────────────────────────────────────────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_probe::mock::storefront::{MockStorefront, MOCK_OTP};
//! use storefront_probe::{bootstrap_session, SessionSeed, StaticOtp, SuiteConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let dir = tempfile::tempdir().unwrap();
//! let mut config = SuiteConfig::default()
//!     .with_base_url("https://shop.test")
//!     .with_storage_state(dir.path().join("state.json"));
//! config.login.consent_delay_ms = 1;
//!
//! let storefront = MockStorefront::new(&config);
//! let page = config.page(Arc::new(storefront.driver()));
//! let seed = SessionSeed::Otp(Arc::new(StaticOtp::new(MOCK_OTP).unwrap()));
//! let outcome = bootstrap_session(&page, &config, &seed).await.unwrap();
//! assert!(outcome.cookies > 0);
//! # }
//! ```

#![warn(missing_docs)]

mod assertion;
#[cfg(feature = "browser")]
mod browser;
mod driver;
mod locator;
mod money;
mod page;
mod page_object;
mod result;

/// Login bootstrap: OTP or token login, then session persistence
pub mod auth;

/// Suite configuration (YAML, environment overrides, fixtures)
pub mod config;

/// Session state: cookies and local storage in Playwright's JSON layout
pub mod context;

/// Suite harness: test cases, runner and reports
pub mod harness;

/// Built-in login, product and checkout journeys
pub mod journeys;

/// API load runs with the session token
pub mod load;

/// Scripted in-memory driver and storefront
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod mock;

/// OTP providers (static, environment, HTTP gateway)
pub mod otp;

/// Storefront page objects
pub mod pages;

/// Polling waits and URL patterns
pub mod wait;

pub use assertion::{expect, normalize_whitespace, Expect};
pub use auth::{bootstrap_session, login_with_otp, BootstrapError, BootstrapOutcome, BootstrapStep, SessionSeed};
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumFactory};
pub use config::SuiteConfig;
pub use context::{Cookie, SameSite, SessionError, SessionSummary, StorageState};
pub use driver::{DriverFactory, PageDriver};
pub use harness::{SuiteReport, SuiteRunner, TestCase, TestResult, TestStatus, TestSuite};
pub use journeys::builtin_suite;
pub use load::{EndpointStats, LoadReport, LoadSettings, LoadTest};
pub use locator::{AriaRole, Locator, LocatorOptions, Selector};
pub use money::Money;
pub use otp::{EnvOtp, HttpOtpProvider, Otp, OtpError, OtpProvider, OtpSettings, StaticOtp};
pub use page::Page;
pub use page_object::PageObject;
pub use result::{ProbeError, ProbeResult};
pub use wait::UrlPattern;

/// Prelude for writing journeys
pub mod prelude {
    pub use super::assertion::expect;
    pub use super::config::SuiteConfig;
    pub use super::locator::{AriaRole, Locator, Selector};
    pub use super::page::Page;
    pub use super::page_object::PageObject;
    pub use super::pages::{CartPage, CheckoutPage, LoginPage, PaymentMode, ProductPage};
    pub use super::result::{ProbeError, ProbeResult};
}
