//! Checkout page: shipping form, pre-filled contact data and order totals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assertion::expect;
use crate::locator::Locator;
use crate::money::Money;
use crate::page::Page;
use crate::page_object::PageObject;
use crate::result::{ProbeError, ProbeResult};

/// Checkout page load timeout (15 seconds)
pub const CHECKOUT_LOAD_TIMEOUT_MS: u64 = 15_000;

/// Selectors shared with the mock storefront
pub mod selectors {
    use crate::locator::{AriaRole, Selector};

    /// "Shipping Information" section heading
    pub fn shipping_information_header() -> Selector {
        Selector::role(AriaRole::Heading, "Shipping Information")
    }

    /// Order subtotal amount
    pub fn subtotal_amount() -> Selector {
        Selector::css(".order-summary .sub-total .amount")
    }

    /// Grand total shown in the summary header
    pub fn total_amount_header() -> Selector {
        Selector::css(".order-summary .total-amount-header")
    }

    /// Cash-on-delivery unavailability notice
    pub fn cod_not_available_text() -> Selector {
        Selector::text("COD not available")
    }

    /// Contact name input
    pub fn contact_name_input() -> Selector {
        Selector::placeholder("Full Name")
    }

    /// Contact phone input
    pub fn contact_phone_input() -> Selector {
        Selector::placeholder("Phone Number")
    }

    /// Flat / house number input
    pub fn flat_house_input() -> Selector {
        Selector::placeholder("Flat / House No.")
    }

    /// Street name input
    pub fn street_name_input() -> Selector {
        Selector::placeholder("Street Name")
    }

    /// Full (prepaid) payment option
    pub fn full_payment_radio() -> Selector {
        Selector::css("label[for=\"full-payment\"]")
    }

    /// Partial payment option
    pub fn partial_payment_radio() -> Selector {
        Selector::css("label[for=\"partial-payment\"]")
    }
}

/// How the order is paid at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Pay everything up front (prepaid discount applies)
    Full,
    /// Pay part now, rest on delivery (no discount)
    Partial,
}

impl PaymentMode {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "partial" => Ok(Self::Partial),
            other => Err(ProbeError::config(format!(
                "unknown payment mode {other:?} (expected full or partial)"
            ))),
        }
    }
}

/// Checkout page object
#[derive(Debug, Clone)]
pub struct CheckoutPage {
    page: Page,
}

impl CheckoutPage {
    /// Bind to a page
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    /// "Shipping Information" header
    #[must_use]
    pub fn shipping_information_header(&self) -> Locator {
        self.page.locate(selectors::shipping_information_header())
    }

    /// Subtotal amount
    #[must_use]
    pub fn subtotal_amount(&self) -> Locator {
        self.page.locate(selectors::subtotal_amount())
    }

    /// Total amount header
    #[must_use]
    pub fn total_amount_header(&self) -> Locator {
        self.page.locate(selectors::total_amount_header())
    }

    /// COD not available notice
    #[must_use]
    pub fn cod_not_available_text(&self) -> Locator {
        self.page.locate(selectors::cod_not_available_text())
    }

    /// Contact name input
    #[must_use]
    pub fn contact_name_input(&self) -> Locator {
        self.page.locate(selectors::contact_name_input())
    }

    /// Contact phone input
    #[must_use]
    pub fn contact_phone_input(&self) -> Locator {
        self.page.locate(selectors::contact_phone_input())
    }

    /// Flat / house input
    #[must_use]
    pub fn flat_house_input(&self) -> Locator {
        self.page.locate(selectors::flat_house_input())
    }

    /// Street name input
    #[must_use]
    pub fn street_name_input(&self) -> Locator {
        self.page.locate(selectors::street_name_input())
    }

    /// Full payment radio
    #[must_use]
    pub fn full_payment_radio(&self) -> Locator {
        self.page.locate(selectors::full_payment_radio())
    }

    /// Partial payment radio
    #[must_use]
    pub fn partial_payment_radio(&self) -> Locator {
        self.page.locate(selectors::partial_payment_radio())
    }

    /// Fill the address fields
    pub async fn fill_shipping_details(&self, flat_house: &str, street_name: &str) -> ProbeResult<()> {
        self.flat_house_input().fill(flat_house).await?;
        self.street_name_input().fill(street_name).await?;
        tracing::debug!("shipping details filled");
        Ok(())
    }

    /// Choose how to pay
    pub async fn select_payment_mode(&self, mode: PaymentMode) -> ProbeResult<()> {
        let radio = match mode {
            PaymentMode::Full => self.full_payment_radio(),
            PaymentMode::Partial => self.partial_payment_radio(),
        };
        radio.click().await?;
        tracing::debug!(%mode, "payment mode selected");
        Ok(())
    }

    /// Assert the contact fields carry the account's name and phone
    pub async fn verify_prefilled_data(&self, name: &str, phone: &str) -> ProbeResult<()> {
        expect(&self.contact_name_input()).to_have_value(name).await?;
        expect(&self.contact_phone_input()).to_have_value(phone).await
    }

    /// Parse the current total
    pub async fn read_total(&self) -> ProbeResult<Money> {
        Money::find_in(&self.total_amount_header().text_content().await?)
    }
}

impl PageObject for CheckoutPage {
    fn page(&self) -> &Page {
        &self.page
    }

    fn url_pattern(&self) -> &str {
        "**/checkout"
    }

    fn ready_marker(&self) -> Locator {
        self.shipping_information_header()
    }

    fn load_timeout_ms(&self) -> u64 {
        CHECKOUT_LOAD_TIMEOUT_MS
    }
}
