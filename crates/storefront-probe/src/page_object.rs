//! Page Object Model Support
//!
//! A page object groups the locators and composite actions of one storefront
//! page. Implementors name the URL they live at and an element whose
//! visibility marks the page as ready; loading checks come for free.
//!
//! # Example
//!
//! ```ignore
//! struct CartPage { page: Page }
//!
//! impl PageObject for CartPage {
//!     fn page(&self) -> &Page { &self.page }
//!     fn url_pattern(&self) -> &str { "**/checkout/cart" }
//!     fn ready_marker(&self) -> Locator { self.first_item_name() }
//! }
//! ```

use async_trait::async_trait;

use crate::assertion::expect;
use crate::locator::Locator;
use crate::page::Page;
use crate::result::ProbeResult;
use crate::wait::UrlPattern;

/// Default page load timeout (30 seconds)
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 30_000;

/// Trait for page objects representing a storefront page.
#[async_trait]
pub trait PageObject: Send + Sync {
    /// The page this object drives
    fn page(&self) -> &Page;

    /// URL pattern that matches this page (e.g. `**/checkout`)
    fn url_pattern(&self) -> &str;

    /// Element that is visible once the page is usable
    fn ready_marker(&self) -> Locator;

    /// Wait time for page load (in milliseconds)
    fn load_timeout_ms(&self) -> u64 {
        DEFAULT_LOAD_TIMEOUT_MS
    }

    /// Page name for logging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("page")
    }

    /// Wait for the URL and the ready marker
    async fn wait_until_loaded(&self) -> ProbeResult<()> {
        let timeout = self.load_timeout_ms();
        self.page().wait_for_url(self.url_pattern(), timeout).await?;
        expect(&self.ready_marker())
            .with_timeout(timeout)
            .to_be_visible()
            .await?;
        tracing::debug!(page = self.page_name(), "page loaded");
        Ok(())
    }

    /// Check, without waiting, whether this page is showing
    async fn is_loaded(&self) -> ProbeResult<bool> {
        let url = self.page().url().await?;
        if !UrlPattern::parse(self.url_pattern())?.matches(&url) {
            return Ok(false);
        }
        self.ready_marker().is_visible().await
    }
}
