//! Authentication bootstrap.
//!
//! Logs in once (phone + OTP, or a pre-issued token) and persists the
//! resulting cookies and local storage so every later test case starts
//! authenticated. The flow is forward-only: the first failing step aborts
//! with a [`BootstrapError`] naming it.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::config::{LoginSettings, SuiteConfig};
use crate::context::SessionError;
use crate::otp::OtpProvider;
use crate::page::Page;
use crate::pages::LoginPage;
use crate::result::{ProbeError, ProbeResult};

/// Accept OTPs issued this many seconds before `Get OTP` was clicked
const OTP_CLOCK_SKEW_SECS: i64 = 5;

/// Steps of the login bootstrap, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapStep {
    /// Navigate to the storefront
    OpenHome,
    /// Click the account icon
    OpenAccountMenu,
    /// Click `LOG IN`
    OpenLogin,
    /// Type the phone number
    EnterPhone,
    /// Wait, then tick the consent checkbox
    AcceptConsent,
    /// Click `Get OTP`
    RequestOtp,
    /// Ask the OTP provider for the code
    FetchOtp,
    /// Type the code and click `Submit OTP`
    SubmitOtp,
    /// Wait for the success toast
    ConfirmLogin,
    /// Write the token into local storage
    SeedToken,
    /// Capture and persist the session
    SaveState,
}

impl BootstrapStep {
    /// Short name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenHome => "open home page",
            Self::OpenAccountMenu => "open account menu",
            Self::OpenLogin => "open login",
            Self::EnterPhone => "enter phone number",
            Self::AcceptConsent => "accept consent",
            Self::RequestOtp => "request OTP",
            Self::FetchOtp => "fetch OTP",
            Self::SubmitOtp => "submit OTP",
            Self::ConfirmLogin => "confirm login",
            Self::SeedToken => "seed token",
            Self::SaveState => "save session state",
        }
    }
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bootstrap failure at a specific step
#[derive(Debug, thiserror::Error)]
#[error("Login bootstrap failed at step '{step}': {source}")]
pub struct BootstrapError {
    /// Step that failed
    pub step: BootstrapStep,
    /// Cause
    #[source]
    pub source: ProbeError,
}

impl From<BootstrapError> for ProbeError {
    fn from(err: BootstrapError) -> Self {
        Self::StepFailed {
            step: err.step.to_string(),
            source: Box::new(err.source),
        }
    }
}

/// How the session gets authenticated
#[derive(Debug, Clone)]
pub enum SessionSeed {
    /// Interactive phone + OTP login
    Otp(Arc<dyn OtpProvider>),
    /// Write a pre-issued token into local storage
    Token(String),
}

/// What the bootstrap persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// Session file
    pub path: PathBuf,
    /// Cookies saved
    pub cookies: usize,
    /// Local storage entries saved
    pub local_storage: usize,
    /// Wall time
    pub elapsed: Duration,
}

async fn run_step<T>(
    step: BootstrapStep,
    fut: impl Future<Output = ProbeResult<T>>,
) -> Result<T, BootstrapError> {
    tracing::debug!(%step, "bootstrap step");
    fut.await.map_err(|source| {
        tracing::warn!(%step, error = %source, "bootstrap step failed");
        BootstrapError { step, source }
    })
}

/// Phone + OTP login up to the success toast
pub async fn login_with_otp(
    page: &Page,
    login: &LoginSettings,
    otp: &dyn OtpProvider,
) -> Result<(), BootstrapError> {
    let modal = LoginPage::new(page);

    run_step(BootstrapStep::OpenHome, page.goto("/")).await?;
    tracing::info!(url = page.base_url(), "navigated to the homepage");

    run_step(BootstrapStep::OpenAccountMenu, modal.account_icon().click()).await?;
    run_step(BootstrapStep::OpenLogin, modal.log_in_button().click()).await?;
    tracing::info!("opened the login form");

    run_step(
        BootstrapStep::EnterPhone,
        modal.mobile_number_input().fill(&login.phone),
    )
    .await?;
    tracing::info!(phone = %login.phone, "entered phone number");

    run_step(BootstrapStep::AcceptConsent, async {
        page.wait_for_timeout(login.consent_delay_ms).await;
        modal.consent_checkbox().click().await
    })
    .await?;

    let requested_after = Utc::now() - chrono::Duration::seconds(OTP_CLOCK_SKEW_SECS);
    run_step(BootstrapStep::RequestOtp, modal.get_otp_button().click()).await?;
    tracing::info!("clicked Get OTP");

    let code = run_step(BootstrapStep::FetchOtp, async {
        Ok(otp.fetch_otp(&login.phone, requested_after).await?)
    })
    .await?;

    run_step(BootstrapStep::SubmitOtp, modal.submit_otp(&code)).await?;
    tracing::info!("submitted OTP");

    run_step(
        BootstrapStep::ConfirmLogin,
        modal.expect_logged_in(login.success_timeout_ms),
    )
    .await?;
    tracing::info!("login successful");
    Ok(())
}

/// Token login: store the token on the storefront origin
pub async fn seed_token(page: &Page, storage_key: &str, token: &str) -> Result<(), BootstrapError> {
    run_step(BootstrapStep::OpenHome, page.goto("/")).await?;
    run_step(
        BootstrapStep::SeedToken,
        page.set_local_storage(storage_key, token),
    )
    .await?;
    tracing::info!(key = storage_key, "token written to local storage");
    Ok(())
}

/// Authenticate and persist the session to `config.storage_state`.
///
/// An empty captured state is refused: it would make every later test run
/// unauthenticated without saying why.
pub async fn bootstrap_session(
    page: &Page,
    config: &SuiteConfig,
    seed: &SessionSeed,
) -> Result<BootstrapOutcome, BootstrapError> {
    let started = Instant::now();
    match seed {
        SessionSeed::Otp(provider) => login_with_otp(page, &config.login, provider.as_ref()).await?,
        SessionSeed::Token(token) => {
            seed_token(page, &config.login.token_storage_key, token).await?;
        }
    }

    let path = config.storage_state.clone();
    let state = run_step(BootstrapStep::SaveState, async {
        let state = page.storage_state().await?;
        state.save(&path)?;
        Ok(state)
    })
    .await?;

    let outcome = BootstrapOutcome {
        path,
        cookies: state.cookies.len(),
        local_storage: state.local_storage_len(),
        elapsed: started.elapsed(),
    };
    tracing::info!(
        path = %outcome.path.display(),
        cookies = outcome.cookies,
        local_storage = outcome.local_storage,
        "authentication state saved"
    );
    Ok(outcome)
}

/// Whether a bootstrap failure was caused by an empty session
#[must_use]
pub fn is_empty_state(err: &BootstrapError) -> bool {
    matches!(err.source, ProbeError::Session(SessionError::EmptyState))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::StorageState;
    use crate::mock::storefront::{MockStorefront, MOCK_OTP};
    use crate::mock::{MockDriver, MockElement, MockRoute};
    use crate::otp::StaticOtp;
    use crate::pages::login::selectors;

    fn config(dir: &tempfile::TempDir) -> SuiteConfig {
        let mut config = SuiteConfig::default()
            .with_base_url("https://shop.test")
            .with_storage_state(dir.path().join(".auth/state.json"));
        config.login.consent_delay_ms = 1;
        config.login.success_timeout_ms = 200;
        config.timeouts.expect_ms = 200;
        config.timeouts.poll_interval_ms = 5;
        config
    }

    #[test]
    fn test_step_names() {
        assert_eq!(BootstrapStep::FetchOtp.to_string(), "fetch OTP");
        let err = BootstrapError {
            step: BootstrapStep::ConfirmLogin,
            source: ProbeError::assertion("toast hidden"),
        };
        assert!(err.to_string().contains("'confirm login'"));
        let probe: ProbeError = err.into();
        assert!(probe.to_string().starts_with("confirm login failed"));
    }

    #[tokio::test]
    async fn test_otp_bootstrap_persists_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let storefront = MockStorefront::new(&config);
        let driver = storefront.driver();
        let page = config.page(Arc::new(driver.clone()));
        let seed = SessionSeed::Otp(Arc::new(StaticOtp::new(MOCK_OTP).unwrap()));

        let outcome = bootstrap_session(&page, &config, &seed).await.unwrap();
        assert_eq!(outcome.path, config.storage_state);
        assert!(outcome.cookies >= 1);

        let saved = StorageState::load(&config.storage_state).unwrap();
        assert!(!saved.is_empty());
        assert!(driver
            .fills()
            .iter()
            .any(|(_, value)| value == &config.login.phone));
    }

    #[tokio::test]
    async fn test_wrong_otp_fails_at_confirm_login() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let storefront = MockStorefront::new(&config);
        let page = config.page(Arc::new(storefront.driver()));
        let seed = SessionSeed::Otp(Arc::new(StaticOtp::new("000000").unwrap()));

        let err = bootstrap_session(&page, &config, &seed).await.unwrap_err();
        assert_eq!(err.step, BootstrapStep::ConfirmLogin);
        assert!(!config.storage_state.exists());
    }

    #[tokio::test]
    async fn test_missing_element_names_step() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        // A bare page: no account menu to click.
        let page = config.page(Arc::new(MockDriver::new()));
        let seed = SessionSeed::Otp(Arc::new(StaticOtp::new(MOCK_OTP).unwrap()));
        let err = bootstrap_session(&page, &config, &seed).await.unwrap_err();
        assert_eq!(err.step, BootstrapStep::OpenAccountMenu);
    }

    #[tokio::test]
    async fn test_empty_state_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        // Every login element is present, but nothing sets a session.
        let mut home = MockRoute::new()
            .element(&selectors::mobile_number_input(), MockElement::input(""))
            .element(&selectors::otp_input(), MockElement::input(""));
        for selector in [
            selectors::account_icon(),
            selectors::log_in_button(),
            selectors::consent_checkbox(),
            selectors::get_otp_button(),
            selectors::submit_otp_button(),
            selectors::login_success_toast(),
        ] {
            home = home.element(&selector, MockElement::visible(""));
        }
        let driver = MockDriver::new();
        driver.route("/", home);
        let page = config.page(Arc::new(driver));
        let seed = SessionSeed::Otp(Arc::new(StaticOtp::new(MOCK_OTP).unwrap()));

        let err = bootstrap_session(&page, &config, &seed).await.unwrap_err();
        assert_eq!(err.step, BootstrapStep::SaveState);
        assert!(is_empty_state(&err));
        assert!(!config.storage_state.exists());
    }

    #[tokio::test]
    async fn test_token_seed_writes_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let storefront = MockStorefront::new(&config);
        let driver = storefront.driver();
        let page = config.page(Arc::new(driver.clone()));

        let outcome = bootstrap_session(&page, &config, &SessionSeed::Token("jwt-abc".into()))
            .await
            .unwrap();
        assert_eq!(outcome.local_storage, 1);
        let saved = StorageState::load(&config.storage_state).unwrap();
        assert_eq!(
            saved.local_storage_value("https://shop.test", "auth_token"),
            Some("jwt-abc")
        );
    }
}
