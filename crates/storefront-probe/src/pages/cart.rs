//! Cart page reached through the minicart.

use crate::locator::Locator;
use crate::page::Page;
use crate::page_object::PageObject;

/// Selectors shared with the mock storefront
pub mod selectors {
    use crate::locator::Selector;

    /// Product name links of the cart line items
    pub fn item_names() -> Selector {
        Selector::css(".cart.item .product-item-name a")
    }
}

/// Cart page object
#[derive(Debug, Clone)]
pub struct CartPage {
    page: Page,
}

impl CartPage {
    /// Bind to a page
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    /// Name of the first line item
    #[must_use]
    pub fn first_item_name(&self) -> Locator {
        self.page.locate(selectors::item_names()).first()
    }

    /// All line item names
    #[must_use]
    pub fn item_names(&self) -> Locator {
        self.page.locate(selectors::item_names())
    }
}

impl PageObject for CartPage {
    fn page(&self) -> &Page {
        &self.page
    }

    fn url_pattern(&self) -> &str {
        "**/checkout/cart**"
    }

    fn ready_marker(&self) -> Locator {
        self.first_item_name()
    }
}
