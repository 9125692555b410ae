//! Load command handler: replay storefront API calls with the session token

use storefront_probe::{LoadReport, LoadTest, StorageState, SuiteConfig};

use crate::commands::LoadArgs;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;

/// Fold the load flags into the suite configuration
pub fn apply_load_args(config: &mut SuiteConfig, args: &LoadArgs) {
    let load = &mut config.load;
    if let Some(users) = args.users {
        load.users = users;
    }
    if let Some(secs) = args.duration {
        load.duration_ms = secs.saturating_mul(1_000);
    }
    if let Some(ms) = args.min_wait {
        load.min_wait_ms = ms;
    }
    if let Some(ms) = args.max_wait {
        load.max_wait_ms = ms;
    }
    if let Some(ref url) = args.api_url {
        load.api_base_url = Some(url.clone());
    }
    if let Some(ref output) = args.output {
        config.output_dir.clone_from(output);
    }
}

/// Bearer token from the flag, else from the saved session's local storage
pub fn resolve_token(config: &SuiteConfig, args: &LoadArgs) -> CliResult<String> {
    if let Some(token) = args.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }
    let key = &config.login.token_storage_key;
    let state = StorageState::load(&config.storage_state)?;
    let origin = config.base_url.trim().trim_end_matches('/');
    state
        .find_local_storage(Some(origin), key)
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::config(format!(
                "no {key:?} token in {}; pass --token or run `storeprobe setup --token <token>`",
                config.storage_state.display()
            ))
        })
}

/// Run the load; fails when nothing was sent or too many requests failed
pub async fn execute_load(
    mut config: SuiteConfig,
    args: &LoadArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<LoadReport> {
    apply_load_args(&mut config, args);
    config.validate()?;
    if let Some(max) = args.max_error_rate {
        if !(0.0..=100.0).contains(&max) {
            return Err(CliError::config(format!(
                "--max-error-rate must be a percentage, got {max}"
            )));
        }
    }

    let token = resolve_token(&config, args)?;
    let load = LoadTest::new(config.api_base_url(), token, config.load.clone())?;

    reporter.start_spinner(&format!(
        "{} users for {}s",
        config.load.users,
        config.load.duration_ms / 1_000
    ));
    let report = load.run().await;
    reporter.finish();

    let path = report.write_json(&config.output_dir)?;
    tracing::info!(path = %path.display(), "load report written");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        reporter.load_report(&report);
    }

    if report.total_requests == 0 {
        return Err(CliError::test_execution("no requests completed"));
    }
    if let Some(max) = args.max_error_rate {
        if report.error_rate() > max {
            return Err(CliError::test_execution(format!(
                "error rate {:.2}% exceeds {max}%",
                report.error_rate()
            )));
        }
    }
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(dir: &std::path::Path) -> SuiteConfig {
        SuiteConfig::default()
            .with_base_url("https://shop.test")
            .with_storage_state(dir.join("state.json"))
            .with_output_dir(dir.join("out"))
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = SuiteConfig::default();
        let args = LoadArgs {
            users: Some(8),
            duration: Some(90),
            min_wait: Some(10),
            max_wait: Some(20),
            api_url: Some("https://api.shop.test".into()),
            output: Some(PathBuf::from("out")),
            ..LoadArgs::default()
        };
        apply_load_args(&mut config, &args);
        assert_eq!(config.load.users, 8);
        assert_eq!(config.load.duration_ms, 90_000);
        assert_eq!((config.load.min_wait_ms, config.load.max_wait_ms), (10, 20));
        assert_eq!(config.api_base_url(), "https://api.shop.test");
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_token_from_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        StorageState::new()
            .with_local_storage("https://shop.test", "auth_token", "eyJ-saved")
            .save(&config.storage_state)
            .unwrap();
        let token = resolve_token(&config, &LoadArgs::default()).unwrap();
        assert_eq!(token, "eyJ-saved");

        let args = LoadArgs {
            token: Some("eyJ-flag".into()),
            ..LoadArgs::default()
        };
        assert_eq!(resolve_token(&config, &args).unwrap(), "eyJ-flag");
    }

    #[test]
    fn test_missing_token_explains_setup() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        StorageState::new()
            .with_local_storage("https://shop.test", "theme", "dark")
            .save(&config.storage_state)
            .unwrap();
        let err = resolve_token(&config, &LoadArgs::default()).unwrap_err();
        assert!(err.to_string().contains("setup --token"));

        std::fs::remove_file(&config.storage_state).unwrap();
        let err = resolve_token(&config, &LoadArgs::default()).unwrap_err();
        assert!(matches!(err, CliError::Session(_)));
    }

    #[tokio::test]
    async fn test_unreachable_api_breaks_error_budget() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.load.duration_ms = 200;
        config.load.min_wait_ms = 10;
        config.load.max_wait_ms = 20;
        let args = LoadArgs {
            token: Some("t".into()),
            api_url: Some("http://127.0.0.1:1".into()),
            max_error_rate: Some(0.0),
            ..LoadArgs::default()
        };
        let mut reporter = ProgressReporter::new(false, true);
        let err = execute_load(config, &args, &mut reporter).await.unwrap_err();
        assert!(err.to_string().contains("error rate 100.00%"));
        assert!(dir.path().join("out/load-report.json").exists());
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_error_budget() {
        let dir = tempfile::tempdir().unwrap();
        let args = LoadArgs {
            token: Some("t".into()),
            max_error_rate: Some(150.0),
            ..LoadArgs::default()
        };
        let mut reporter = ProgressReporter::new(false, true);
        let err = execute_load(config(dir.path()), &args, &mut reporter)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }
}
