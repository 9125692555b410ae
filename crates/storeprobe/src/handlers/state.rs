//! State command handler

use chrono::Utc;
use storefront_probe::{StorageState, SuiteConfig};

use crate::commands::StateArgs;
use crate::error::CliResult;
use crate::output::ProgressReporter;

/// Summarize the session file
pub fn execute_state(
    config: &SuiteConfig,
    args: &StateArgs,
    reporter: &ProgressReporter,
) -> CliResult<()> {
    let path = args.path.as_ref().unwrap_or(&config.storage_state);
    let summary = StorageState::load(path)?.summarize(Utc::now());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        reporter.session(&path.display().to_string(), &summary);
    }
    Ok(())
}
