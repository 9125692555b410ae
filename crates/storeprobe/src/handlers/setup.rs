//! Setup command handler: log in once and save the session file

use std::sync::Arc;

use storefront_probe::{
    bootstrap_session, OtpProvider, ProbeResult, SessionSeed, StaticOtp, SuiteConfig,
};

use crate::commands::{DriverArg, SetupArgs};
use crate::error::{CliError, CliResult};
use crate::handlers::driver_factory;
use crate::output::ProgressReporter;

/// How the bootstrap authenticates, from flags then config
pub fn session_seed(args: &SetupArgs, config: &SuiteConfig) -> CliResult<SessionSeed> {
    if let Some(ref token) = args.token {
        return Ok(SessionSeed::Token(token.clone()));
    }
    let provider: Arc<dyn OtpProvider> = match args.otp {
        Some(ref code) => Arc::new(StaticOtp::new(code)?),
        None => config.login.otp.provider()?,
    };
    Ok(SessionSeed::Otp(provider))
}

/// The bootstrap error wins over a failed browser shutdown, which is only logged
fn settle<T, E: Into<CliError>>(outcome: Result<T, E>, shutdown: ProbeResult<()>) -> CliResult<T> {
    match (outcome, shutdown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), shutdown) => {
            if let Err(closing) = shutdown {
                tracing::warn!(error = %closing, "browser shutdown failed after a failed login");
            }
            Err(e.into())
        }
    }
}

/// Run the login bootstrap and persist the session
pub async fn execute_setup(
    mut config: SuiteConfig,
    driver: DriverArg,
    args: &SetupArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<()> {
    if args.headed {
        config.browser.headless = false;
    }
    config.validate()?;
    let seed = session_seed(args, &config)?;

    let factory = driver_factory(driver, &config).await?;
    let page = config.page(factory.new_driver().await?);

    reporter.start_spinner("logging in");
    let outcome = bootstrap_session(&page, &config, &seed).await;
    reporter.finish();

    if let Err(e) = page.close().await {
        tracing::warn!(error = %e, "closing the setup page failed");
    }
    let outcome = settle(outcome, factory.shutdown().await)?;
    reporter.success(&format!(
        "session saved to {} ({} cookies, {} local storage entries, {:.1}s)",
        outcome.path.display(),
        outcome.cookies,
        outcome.local_storage,
        outcome.elapsed.as_secs_f64()
    ));
    Ok(())
}
