//! Command handlers - one module per subcommand
//!
//! Handlers take the resolved [`SuiteConfig`] plus their parsed arguments
//! and return a [`CliResult`]; `main` only parses and dispatches.

pub mod config;
pub mod list;
pub mod load;
pub mod setup;
pub mod state;
pub mod test;

use std::sync::Arc;

use storefront_probe::mock::storefront::MockStorefront;
use storefront_probe::{DriverFactory, SuiteConfig};

use crate::commands::DriverArg;
use crate::error::CliResult;

pub use config::execute_config;
pub use list::execute_list;
pub use load::execute_load;
pub use setup::execute_setup;
pub use state::execute_state;
pub use test::execute_test;

/// Open the driver factory the run asked for
pub async fn driver_factory(
    driver: DriverArg,
    config: &SuiteConfig,
) -> CliResult<Arc<dyn DriverFactory>> {
    match driver {
        DriverArg::Mock => {
            tracing::info!("using the scripted mock storefront");
            Ok(Arc::new(MockStorefront::new(config).factory()))
        }
        #[cfg(feature = "browser")]
        DriverArg::Chromium => Ok(Arc::new(
            storefront_probe::ChromiumFactory::launch(&config.browser).await?,
        )),
        #[cfg(not(feature = "browser"))]
        DriverArg::Chromium => Err(crate::error::CliError::config(
            "chromium support not compiled in; rebuild with --features browser or pass --driver mock",
        )),
    }
}
