//! Login journey.

use crate::auth::login_with_otp;
use crate::config::SuiteConfig;
use crate::page::Page;
use crate::result::ProbeResult;

/// Full phone + OTP login from a fresh context, ending at the success toast
pub async fn otp_login_reaches_success(page: &Page, config: &SuiteConfig) -> ProbeResult<()> {
    let provider = config.login.otp.provider()?;
    login_with_otp(page, &config.login, provider.as_ref()).await?;
    Ok(())
}
