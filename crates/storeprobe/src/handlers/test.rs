//! Test command handler: run the built-in journeys

use storefront_probe::{builtin_suite, SuiteConfig, SuiteReport, SuiteRunner};

use crate::commands::{DriverArg, TestArgs};
use crate::error::{CliError, CliResult};
use crate::handlers::driver_factory;
use crate::output::ProgressReporter;

/// Fold the test flags into the suite configuration
pub fn apply_test_args(config: &mut SuiteConfig, args: &TestArgs) {
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.fail_fast {
        config.fail_fast = true;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(ref output) = args.output {
        config.output_dir.clone_from(output);
    }
}

/// Run the suite; fails when any journey failed
pub async fn execute_test(
    mut config: SuiteConfig,
    driver: DriverArg,
    args: &TestArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<SuiteReport> {
    apply_test_args(&mut config, args);
    config.validate()?;

    let factory = driver_factory(driver, &config).await?;
    let mut runner = SuiteRunner::new(config.clone(), factory);
    if let Some(ref filter) = args.filter {
        runner = runner.with_filter(filter);
    }

    reporter.start_spinner("running journeys");
    let report = runner.run(&builtin_suite()).await;
    reporter.finish();
    let report = report?;

    let path = report.write_json(&config.output_dir)?;
    tracing::info!(path = %path.display(), "report written");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        reporter.report(&report);
    }

    if report.total() == 0 {
        return Err(CliError::test_execution("no journeys matched the filter"));
    }
    if !report.all_passed() {
        return Err(CliError::test_execution(format!(
            "{} of {} journeys failed",
            report.failed_count(),
            report.total()
        )));
    }
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_flags_override_config() {
        let mut config = SuiteConfig::default();
        let args = TestArgs {
            workers: Some(4),
            fail_fast: true,
            headed: true,
            output: Some(PathBuf::from("out")),
            ..TestArgs::default()
        };
        apply_test_args(&mut config, &args);
        assert_eq!(config.workers, 4);
        assert!(config.fail_fast);
        assert!(!config.browser.headless);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[tokio::test]
    async fn test_unmatched_filter_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = SuiteConfig::default()
            .with_base_url("https://shop.test")
            .with_output_dir(dir.path());
        let args = TestArgs {
            filter: Some("nothing-matches".into()),
            ..TestArgs::default()
        };
        let mut reporter = ProgressReporter::new(false, true);
        let err = execute_test(config, DriverArg::Mock, &args, &mut reporter)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no journeys matched"));
    }
}
