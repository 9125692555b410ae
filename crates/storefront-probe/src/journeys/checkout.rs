//! Checkout journeys.
//!
//! All of them start from [`prepare_checkout`]: an authenticated context
//! with one item in the cart, sitting on `/checkout`.

use crate::assertion::expect;
use crate::config::SuiteConfig;
use crate::page::Page;
use crate::page_object::PageObject;
use crate::pages::product::PRODUCT_FEEDBACK_TIMEOUT_MS;
use crate::pages::{CheckoutPage, PaymentMode, ProductPage};
use crate::result::ProbeResult;

/// Before-each: add the fixture product to the cart and open checkout
pub async fn prepare_checkout(page: &Page, config: &SuiteConfig) -> ProbeResult<()> {
    let product = ProductPage::new(page, &config.fixtures.checkout.product_path);
    product.open().await?;
    product.add_to_cart().await?;
    expect(&product.mini_cart_count())
        .with_timeout(PRODUCT_FEEDBACK_TIMEOUT_MS)
        .to_contain_text("1")
        .await?;
    tracing::info!("cart holds the checkout product");

    page.goto("/checkout").await?;
    CheckoutPage::new(page).wait_until_loaded().await?;
    tracing::info!("on the checkout page");
    Ok(())
}

/// Contact data is pre-filled and the totals show the prepaid discount
pub async fn prefilled_data_and_totals(page: &Page, config: &SuiteConfig) -> ProbeResult<()> {
    let fixture = &config.fixtures.checkout;
    let checkout = CheckoutPage::new(page);

    checkout
        .verify_prefilled_data(&fixture.contact_name, &fixture.contact_phone)
        .await?;
    expect(&checkout.subtotal_amount())
        .to_have_text(&fixture.subtotal)
        .await?;
    expect(&checkout.total_amount_header())
        .to_contain_text(&fixture.discounted_total)
        .await?;
    expect(&checkout.cod_not_available_text())
        .to_be_visible()
        .await?;
    let total = checkout.read_total().await?;
    tracing::info!(%total, "checkout totals verified");
    Ok(())
}

/// Switching to partial payment drops the prepaid discount
pub async fn payment_mode_updates_total(page: &Page, config: &SuiteConfig) -> ProbeResult<()> {
    let fixture = &config.fixtures.checkout;
    let checkout = CheckoutPage::new(page);

    expect(&checkout.total_amount_header())
        .to_contain_text(&fixture.discounted_total)
        .await?;
    checkout.select_payment_mode(PaymentMode::Partial).await?;
    expect(&checkout.total_amount_header())
        .to_contain_text(&fixture.full_total)
        .await?;
    let total = checkout.read_total().await?;
    tracing::info!(%total, "partial payment total shown");
    Ok(())
}

/// The address fields accept input
pub async fn fill_shipping_address(page: &Page, config: &SuiteConfig) -> ProbeResult<()> {
    let fixture = &config.fixtures.checkout;
    let checkout = CheckoutPage::new(page);

    checkout
        .fill_shipping_details(&fixture.flat_house, &fixture.street_name)
        .await?;
    expect(&checkout.flat_house_input())
        .to_have_value(&fixture.flat_house)
        .await?;
    expect(&checkout.street_name_input())
        .to_have_value(&fixture.street_name)
        .await?;
    Ok(())
}
