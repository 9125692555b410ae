//! Login modal opened from the account menu on the home page.

use crate::assertion::expect;
use crate::locator::Locator;
use crate::otp::Otp;
use crate::page::Page;
use crate::page_object::PageObject;
use crate::result::ProbeResult;

/// How long the success toast may take to appear (10 seconds)
pub const LOGIN_SUCCESS_TIMEOUT_MS: u64 = 10_000;

/// Selectors shared with the mock storefront
pub mod selectors {
    use crate::locator::{AriaRole, Selector};

    /// Account icon in the header menu
    pub fn account_icon() -> Selector {
        Selector::xpath("//div[@class='account-menu dis-flex pl-27']//img[@alt='Account Icon']")
    }

    /// `LOG IN` entry of the account menu
    pub fn log_in_button() -> Selector {
        Selector::xpath("//div[normalize-space()='LOG IN']")
    }

    /// Phone number input
    pub fn mobile_number_input() -> Selector {
        Selector::placeholder("Mobile Number")
    }

    /// Consent checkbox image
    pub fn consent_checkbox() -> Selector {
        Selector::css("img[alt=\"checkbox\"]")
    }

    /// `Get OTP` button
    pub fn get_otp_button() -> Selector {
        Selector::role(AriaRole::Button, "Get OTP")
    }

    /// OTP input
    pub fn otp_input() -> Selector {
        Selector::placeholder("Enter OTP")
    }

    /// `Submit OTP` button
    pub fn submit_otp_button() -> Selector {
        Selector::role(AriaRole::Button, "Submit OTP")
    }

    /// Toast shown after a successful login
    pub fn login_success_toast() -> Selector {
        Selector::text("Login Successfully")
    }
}

/// Login modal page object
#[derive(Debug, Clone)]
pub struct LoginPage {
    page: Page,
}

impl LoginPage {
    /// Bind to a page
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    /// Account menu icon
    #[must_use]
    pub fn account_icon(&self) -> Locator {
        self.page.locate(selectors::account_icon())
    }

    /// `LOG IN` menu entry
    #[must_use]
    pub fn log_in_button(&self) -> Locator {
        self.page.locate(selectors::log_in_button())
    }

    /// Phone number input
    #[must_use]
    pub fn mobile_number_input(&self) -> Locator {
        self.page.locate(selectors::mobile_number_input())
    }

    /// Consent checkbox
    #[must_use]
    pub fn consent_checkbox(&self) -> Locator {
        self.page.locate(selectors::consent_checkbox())
    }

    /// `Get OTP` button
    #[must_use]
    pub fn get_otp_button(&self) -> Locator {
        self.page.locate(selectors::get_otp_button())
    }

    /// OTP input
    #[must_use]
    pub fn otp_input(&self) -> Locator {
        self.page.locate(selectors::otp_input())
    }

    /// `Submit OTP` button
    #[must_use]
    pub fn submit_otp_button(&self) -> Locator {
        self.page.locate(selectors::submit_otp_button())
    }

    /// Success toast
    #[must_use]
    pub fn login_success_toast(&self) -> Locator {
        self.page.locate(selectors::login_success_toast())
    }

    /// Open the account menu and the login modal
    pub async fn open(&self) -> ProbeResult<()> {
        self.account_icon().click().await?;
        self.log_in_button().click().await
    }

    /// Enter the OTP and submit it
    pub async fn submit_otp(&self, otp: &Otp) -> ProbeResult<()> {
        self.otp_input().fill(otp.as_str()).await?;
        self.submit_otp_button().click().await
    }

    /// Wait for the success toast
    pub async fn expect_logged_in(&self, timeout_ms: u64) -> ProbeResult<()> {
        expect(&self.login_success_toast())
            .with_timeout(timeout_ms)
            .to_be_visible()
            .await
    }
}

impl PageObject for LoginPage {
    fn page(&self) -> &Page {
        &self.page
    }

    fn url_pattern(&self) -> &str {
        "**"
    }

    fn ready_marker(&self) -> Locator {
        self.account_icon()
    }
}
