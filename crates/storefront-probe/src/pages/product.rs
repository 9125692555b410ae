//! Product detail page: price, add to cart, minicart and pincode check.

use crate::assertion::expect;
use crate::locator::{Locator, Selector};
use crate::page::Page;
use crate::page_object::PageObject;
use crate::result::ProbeResult;

/// Wait for add-to-cart and delivery feedback (10 seconds)
pub const PRODUCT_FEEDBACK_TIMEOUT_MS: u64 = 10_000;

/// Selectors shared with the mock storefront
pub mod selectors {
    use crate::locator::{AriaRole, Selector};

    /// Product name heading
    pub fn product_heading(name: &str) -> Selector {
        Selector::role(AriaRole::Heading, name)
    }

    /// Final price
    pub fn final_price() -> Selector {
        Selector::css(".price-final_price .price")
    }

    /// `Add to Cart` button
    pub fn add_to_cart_button() -> Selector {
        Selector::role(AriaRole::Button, "Add to Cart")
    }

    /// Flash message after adding to cart
    pub fn success_message() -> Selector {
        Selector::css(".message-success")
    }

    /// Header minicart toggle
    pub fn minicart() -> Selector {
        Selector::css("[data-block=\"minicart\"]")
    }

    /// Item count badge on the minicart
    pub fn mini_cart_count() -> Selector {
        Selector::css("#mini-cart-count")
    }

    /// `View and Edit Cart` link inside the minicart
    pub fn view_and_edit_cart_link() -> Selector {
        Selector::role(AriaRole::Link, "View and Edit Cart")
    }

    /// Pincode input
    pub fn pincode_input() -> Selector {
        Selector::placeholder("Enter Pincode")
    }

    /// Pincode `Check` button
    pub fn check_button() -> Selector {
        Selector::role(AriaRole::Button, "Check")
    }

    /// Delivery estimate shown after a pincode check
    pub fn delivery_details() -> Selector {
        Selector::css(".delivery-details-text")
    }
}

/// Message shown after adding `product` to the cart
#[must_use]
pub fn added_to_cart_message(product: &str) -> String {
    format!("You added {product} to your shopping cart.")
}

/// Product page object
#[derive(Debug, Clone)]
pub struct ProductPage {
    page: Page,
    path: String,
    url_pattern: String,
    name: Option<String>,
}

impl ProductPage {
    /// Product at `path` (e.g. `/ac-induction-motor-copper-winding`)
    #[must_use]
    pub fn new(page: &Page, path: &str) -> Self {
        let path = if path.starts_with('/') || path.contains("://") {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let tail = path.rsplit('/').next().unwrap_or_default();
        Self {
            page: page.clone(),
            url_pattern: format!("**/{tail}"),
            path,
            name: None,
        }
    }

    /// Product name, used for the heading locator
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Navigate to the product
    pub async fn open(&self) -> ProbeResult<()> {
        self.page.goto(&self.path).await?;
        tracing::info!(path = %self.path, "navigated to the product page");
        Ok(())
    }

    /// Product heading (any heading when no name is set)
    #[must_use]
    pub fn heading(&self) -> Locator {
        match &self.name {
            Some(name) => self.page.locate(selectors::product_heading(name)),
            None => self.page.locate(Selector::css("h1")).first(),
        }
    }

    /// Final price
    #[must_use]
    pub fn price(&self) -> Locator {
        self.page.locate(selectors::final_price())
    }

    /// Add to cart button
    #[must_use]
    pub fn add_to_cart_button(&self) -> Locator {
        self.page.locate(selectors::add_to_cart_button())
    }

    /// Added-to-cart message
    #[must_use]
    pub fn success_message(&self) -> Locator {
        self.page.locate(selectors::success_message())
    }

    /// Minicart toggle
    #[must_use]
    pub fn minicart(&self) -> Locator {
        self.page.locate(selectors::minicart())
    }

    /// Minicart item count
    #[must_use]
    pub fn mini_cart_count(&self) -> Locator {
        self.page.locate(selectors::mini_cart_count())
    }

    /// View and edit cart link
    #[must_use]
    pub fn view_and_edit_cart_link(&self) -> Locator {
        self.page.locate(selectors::view_and_edit_cart_link())
    }

    /// Pincode input
    #[must_use]
    pub fn pincode_input(&self) -> Locator {
        self.page.locate(selectors::pincode_input())
    }

    /// Pincode check button
    #[must_use]
    pub fn check_button(&self) -> Locator {
        self.page.locate(selectors::check_button())
    }

    /// Delivery details
    #[must_use]
    pub fn delivery_details(&self) -> Locator {
        self.page.locate(selectors::delivery_details())
    }

    /// Click `Add to Cart`
    pub async fn add_to_cart(&self) -> ProbeResult<()> {
        let button = self.add_to_cart_button();
        expect(&button).to_be_visible().await?;
        button.click().await?;
        tracing::info!("clicked Add to Cart");
        Ok(())
    }

    /// Open the minicart and follow `View and Edit Cart`
    pub async fn open_cart(&self) -> ProbeResult<()> {
        self.minicart().click().await?;
        self.view_and_edit_cart_link().click().await?;
        tracing::info!("navigated to the cart page");
        Ok(())
    }

    /// Enter a pincode and request the delivery estimate
    pub async fn check_pincode(&self, pincode: &str) -> ProbeResult<()> {
        let input = self.pincode_input();
        expect(&input).to_be_visible().await?;
        input.fill(pincode).await?;
        self.check_button().click().await?;
        tracing::info!(pincode, "requested delivery estimate");
        Ok(())
    }
}

impl PageObject for ProductPage {
    fn page(&self) -> &Page {
        &self.page
    }

    fn url_pattern(&self) -> &str {
        &self.url_pattern
    }

    fn ready_marker(&self) -> Locator {
        self.add_to_cart_button()
    }
}
