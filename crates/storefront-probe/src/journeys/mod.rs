//! Built-in storefront journeys.
//!
//! Each journey is a flat script over a [`Page`](crate::page::Page) and the
//! suite fixtures: navigate, interact, assert. [`builtin_suite`] wires them
//! into the suite the CLI runs.

pub mod checkout;
pub mod login;
pub mod product;

use futures::FutureExt;

use crate::harness::{TestCase, TestSuite};

/// Name of the built-in suite
pub const BUILTIN_SUITE: &str = "storefront";

/// Login, product and checkout journeys.
///
/// Checkout cases need the saved session and share the cart preparation
/// hook; the login case always starts from a fresh context.
#[must_use]
pub fn builtin_suite() -> TestSuite {
    TestSuite::new(BUILTIN_SUITE)
        .with_test(TestCase::new("login::otp_login_reaches_success", |page, config| {
            login::otp_login_reaches_success(page, config).boxed()
        }))
        .with_test(
            TestCase::new("product::display_and_add_to_cart", |page, config| {
                product::display_and_add_to_cart(page, config).boxed()
            })
            .with_session(),
        )
        .with_test(
            TestCase::new("product::pincode_availability", |page, config| {
                product::pincode_availability(page, config).boxed()
            })
            .with_session(),
        )
        .with_test(checkout_case("checkout::prefilled_data_and_totals", |page, config| {
            checkout::prefilled_data_and_totals(page, config).boxed()
        }))
        .with_test(checkout_case("checkout::payment_mode_updates_total", |page, config| {
            checkout::payment_mode_updates_total(page, config).boxed()
        }))
        .with_test(checkout_case("checkout::fill_shipping_address", |page, config| {
            checkout::fill_shipping_address(page, config).boxed()
        }))
}

fn checkout_case(name: &str, journey: crate::harness::JourneyFn) -> TestCase {
    TestCase::new(name, journey)
        .with_session()
        .with_before_each(|page, config| checkout::prepare_checkout(page, config).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_suite_layout() {
        let suite = builtin_suite();
        assert_eq!(suite.name, BUILTIN_SUITE);
        assert_eq!(suite.test_count(), 6);
        assert_eq!(suite.matching(Some("checkout::")).len(), 3);

        let login = &suite.tests[0];
        assert!(!login.needs_session);
        assert!(suite.tests[1..].iter().all(|t| t.needs_session));
    }
}
