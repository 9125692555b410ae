//! A scripted storefront for running the built-in journeys without a browser.
//!
//! Renders the home page login modal, the product pages, the cart and an
//! authenticated checkout using the same selectors as the page objects, with
//! fixture values taken from a [`SuiteConfig`]. `/checkout` redirects home
//! unless the session cookie (or token) set by a successful login is present.

use std::time::Duration;

use chrono::Utc;

use super::{MockDriver, MockDriverFactory, MockEffect, MockElement, MockRoute};
use crate::config::{CheckoutFixture, ProductFixture, SuiteConfig};
use crate::context::Cookie;
use crate::locator::Selector;
use crate::pages::product::added_to_cart_message;
use crate::pages::{cart, checkout, login, product};

/// OTP accepted by the scripted login
pub const MOCK_OTP: &str = "123456";

/// Session cookie set after login
pub const MOCK_SESSION_COOKIE: &str = "PHPSESSID";

/// Delay before scripted feedback appears, so auto-waiting is exercised
const FEEDBACK_DELAY: Duration = Duration::from_millis(25);

/// Shown when the submitted OTP is wrong
#[must_use]
pub fn invalid_otp_message() -> Selector {
    Selector::text("Invalid OTP")
}

fn key(selector: &Selector) -> String {
    selector.to_string()
}

fn show_later(selector: &Selector) -> MockEffect {
    MockEffect::After(FEEDBACK_DELAY, Box::new(MockEffect::Show(key(selector))))
}

/// Scripted storefront built from suite fixtures
#[derive(Debug, Clone)]
pub struct MockStorefront {
    host: String,
    token_storage_key: String,
    product: ProductFixture,
    checkout: CheckoutFixture,
}

impl MockStorefront {
    /// Storefront serving the configured fixtures
    #[must_use]
    pub fn new(config: &SuiteConfig) -> Self {
        let host = config
            .base_url
            .split_once("://")
            .map_or(config.base_url.as_str(), |(_, rest)| rest)
            .split(['/', ':'])
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            host,
            token_storage_key: config.login.token_storage_key.clone(),
            product: config.fixtures.product.clone(),
            checkout: config.fixtures.checkout.clone(),
        }
    }

    /// Factory handing out a fresh storefront driver per test case
    #[must_use]
    pub fn factory(&self) -> MockDriverFactory {
        let storefront = self.clone();
        MockDriverFactory::new(move || storefront.driver())
    }

    /// A fresh driver with every route and reaction installed
    #[must_use]
    pub fn driver(&self) -> MockDriver {
        let driver = MockDriver::new();
        self.install_login(&driver);
        self.install_products(&driver);
        self.install_checkout(&driver);
        driver
    }

    fn session_cookie(&self) -> Cookie {
        Cookie::new(MOCK_SESSION_COOKIE, "mock-session", &self.host)
            .with_expires((Utc::now() + chrono::Duration::days(1)).timestamp())
            .http_only()
            .secure()
    }

    fn install_login(&self, driver: &MockDriver) {
        let otp = login::selectors::otp_input();
        let submit = login::selectors::submit_otp_button();
        let toast = login::selectors::login_success_toast();
        driver.route(
            "/",
            MockRoute::new()
                .element(&login::selectors::account_icon(), MockElement::visible(""))
                .element(&login::selectors::log_in_button(), MockElement::hidden("LOG IN"))
                .element(&login::selectors::mobile_number_input(), MockElement { visible: false, ..MockElement::input("") })
                .element(&login::selectors::consent_checkbox(), MockElement::hidden(""))
                .element(&login::selectors::get_otp_button(), MockElement::hidden("Get OTP"))
                .element(&otp, MockElement { visible: false, ..MockElement::input("") })
                .element(&submit, MockElement::hidden("Submit OTP"))
                .element(&toast, MockElement::hidden("Login Successfully"))
                .element(&invalid_otp_message(), MockElement::hidden("Invalid OTP")),
        );
        driver.on_click(
            &login::selectors::account_icon(),
            vec![MockEffect::Show(key(&login::selectors::log_in_button()))],
        );
        driver.on_click(
            &login::selectors::log_in_button(),
            vec![
                MockEffect::Show(key(&login::selectors::mobile_number_input())),
                MockEffect::Show(key(&login::selectors::consent_checkbox())),
                MockEffect::Show(key(&login::selectors::get_otp_button())),
            ],
        );
        driver.on_click(
            &login::selectors::get_otp_button(),
            vec![show_later(&otp), show_later(&submit)],
        );
        driver.on_click(
            &submit,
            vec![MockEffect::WhenValue {
                key: key(&otp),
                equals: MOCK_OTP.to_string(),
                then: vec![
                    MockEffect::SetCookie(self.session_cookie()),
                    MockEffect::SetLocalStorage(self.token_storage_key.clone(), "mock-jwt".into()),
                    show_later(&toast),
                ],
                otherwise: vec![MockEffect::Show(key(&invalid_otp_message()))],
            }],
        );
    }

    fn product_route(&self, name: &str) -> MockRoute {
        MockRoute::new()
            .element(&product::selectors::product_heading(name), MockElement::visible(name))
            .element(&product::selectors::final_price(), MockElement::visible("₹12,999.00"))
            .element(&product::selectors::add_to_cart_button(), MockElement::visible("Add to Cart"))
            .element(
                &product::selectors::success_message(),
                MockElement::hidden(added_to_cart_message(name)),
            )
            .element(&product::selectors::minicart(), MockElement::visible(""))
            .element(&product::selectors::mini_cart_count(), MockElement::visible("0"))
            .element(
                &product::selectors::view_and_edit_cart_link(),
                MockElement::hidden("View and Edit Cart"),
            )
            .element(&product::selectors::pincode_input(), MockElement::input(""))
            .element(&product::selectors::check_button(), MockElement::visible("Check"))
            .element(&product::selectors::delivery_details(), MockElement::hidden(""))
    }

    fn install_products(&self, driver: &MockDriver) {
        let checkout_product = product_name_from_path(&self.checkout.product_path);
        driver.route(self.product.path.clone(), self.product_route(&self.product.name));
        driver.route(self.checkout.product_path.clone(), self.product_route(&checkout_product));
        driver.route(
            "/checkout/cart",
            MockRoute::new().element(&cart::selectors::item_names(), MockElement::visible(&self.product.name)),
        );

        driver.on_click(
            &product::selectors::add_to_cart_button(),
            vec![
                show_later(&product::selectors::success_message()),
                MockEffect::After(
                    FEEDBACK_DELAY,
                    Box::new(MockEffect::SetText(key(&product::selectors::mini_cart_count()), "1".into())),
                ),
            ],
        );
        driver.on_click(
            &product::selectors::minicart(),
            vec![MockEffect::Show(key(&product::selectors::view_and_edit_cart_link()))],
        );
        driver.on_click(
            &product::selectors::view_and_edit_cart_link(),
            vec![MockEffect::Navigate("/checkout/cart".into())],
        );
        let delivery = product::selectors::delivery_details();
        driver.on_click(
            &product::selectors::check_button(),
            vec![
                MockEffect::SetText(key(&delivery), "Delivery by Friday, free shipping".into()),
                show_later(&delivery),
            ],
        );
    }

    fn install_checkout(&self, driver: &MockDriver) {
        let fixture = &self.checkout;
        let total = checkout::selectors::total_amount_header();
        driver.route(
            "/checkout",
            MockRoute::new()
                .requires_cookie(MOCK_SESSION_COOKIE, "/")
                .or_local_storage(self.token_storage_key.clone())
                .element(
                    &checkout::selectors::shipping_information_header(),
                    MockElement::visible("Shipping Information"),
                )
                .element(&checkout::selectors::subtotal_amount(), MockElement::visible(&fixture.subtotal))
                .element(&total, MockElement::visible(format!("Total Amount {}", fixture.discounted_total)))
                .element(&checkout::selectors::cod_not_available_text(), MockElement::visible("COD not available"))
                .element(&checkout::selectors::contact_name_input(), MockElement::input(&fixture.contact_name))
                .element(&checkout::selectors::contact_phone_input(), MockElement::input(&fixture.contact_phone))
                .element(&checkout::selectors::flat_house_input(), MockElement::input(""))
                .element(&checkout::selectors::street_name_input(), MockElement::input(""))
                .element(&checkout::selectors::full_payment_radio(), MockElement::visible("Full Payment"))
                .element(&checkout::selectors::partial_payment_radio(), MockElement::visible("Partial Payment")),
        );
        driver.on_click(
            &checkout::selectors::partial_payment_radio(),
            vec![MockEffect::After(
                FEEDBACK_DELAY,
                Box::new(MockEffect::SetText(key(&total), format!("Total Amount {}", fixture.full_total))),
            )],
        );
        driver.on_click(
            &checkout::selectors::full_payment_radio(),
            vec![MockEffect::SetText(
                key(&total),
                format!("Total Amount {}", fixture.discounted_total),
            )],
        );
    }
}

/// `/petrol-brush-cutter-4stroke` -> `Petrol Brush Cutter 4stroke`
fn product_name_from_path(path: &str) -> String {
    path.trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |c| {
                c.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
