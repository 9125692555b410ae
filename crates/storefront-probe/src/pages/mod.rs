//! Storefront page objects.
//!
//! Each page keeps its selectors in a `selectors` submodule so the scripted
//! mock storefront renders exactly the elements the page objects look for.

pub mod cart;
pub mod checkout;
pub mod login;
pub mod product;

pub use cart::CartPage;
pub use checkout::{CheckoutPage, PaymentMode};
pub use login::LoginPage;
pub use product::ProductPage;
