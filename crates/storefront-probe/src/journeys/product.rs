//! Product page journeys.

use crate::assertion::expect;
use crate::config::SuiteConfig;
use crate::page::Page;
use crate::page_object::PageObject;
use crate::pages::product::{added_to_cart_message, PRODUCT_FEEDBACK_TIMEOUT_MS};
use crate::pages::{CartPage, ProductPage};
use crate::result::ProbeResult;

fn product_page(page: &Page, config: &SuiteConfig) -> ProductPage {
    let fixture = &config.fixtures.product;
    ProductPage::new(page, &fixture.path).with_name(&fixture.name)
}

/// Heading and price render, the product lands in the cart
pub async fn display_and_add_to_cart(page: &Page, config: &SuiteConfig) -> ProbeResult<()> {
    let name = &config.fixtures.product.name;
    let product = product_page(page, config);
    product.open().await?;

    expect(&product.heading()).to_be_visible().await?;
    expect(&product.price()).to_be_visible().await?;

    product.add_to_cart().await?;
    expect(&product.success_message())
        .with_timeout(PRODUCT_FEEDBACK_TIMEOUT_MS)
        .to_contain_text(&added_to_cart_message(name))
        .await?;
    tracing::info!(product = %name, "product added to cart");

    product.open_cart().await?;
    let cart = CartPage::new(page);
    cart.wait_until_loaded().await?;
    expect(&cart.first_item_name()).to_contain_text(name).await?;
    tracing::info!("cart shows the product");
    Ok(())
}

/// A pincode check produces a delivery estimate
pub async fn pincode_availability(page: &Page, config: &SuiteConfig) -> ProbeResult<()> {
    let product = product_page(page, config);
    product.open().await?;
    product.check_pincode(&config.fixtures.product.pincode).await?;

    let details = product.delivery_details();
    expect(&details)
        .with_timeout(PRODUCT_FEEDBACK_TIMEOUT_MS)
        .to_be_visible()
        .await?;
    expect(&details).not().to_be_empty().await?;
    let text = details.text_content().await?;
    tracing::info!(details = %text.trim(), "delivery details shown");
    Ok(())
}
