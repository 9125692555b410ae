//! Storeprobe CLI Library
//!
//! Command-line interface for the storefront-probe journeys: `setup` logs
//! in once and saves the session file, `test` runs the journeys against it,
//! `load` replays the storefront API calls with the saved token.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, DriverArg, ListArgs, LoadArgs, SetupArgs, StateArgs, TestArgs,
};
pub use config::{init_logging, resolve_suite_config, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_load_report, summary_line, ProgressReporter};

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> CliResult<()> {
    let cli_config = CliConfig::from_cli(&cli);
    let suite_config = resolve_suite_config(&cli)?;
    let mut reporter = ProgressReporter::new(
        cli_config.color.should_color(),
        cli_config.verbosity.is_quiet(),
    );

    match cli.command {
        Commands::Setup(ref args) => {
            handlers::execute_setup(suite_config, cli.driver, args, &mut reporter).await
        }
        Commands::Test(ref args) => {
            handlers::execute_test(suite_config, cli.driver, args, &mut reporter)
                .await
                .map(|_| ())
        }
        Commands::List(ref args) => {
            handlers::execute_list(args);
            Ok(())
        }
        Commands::State(ref args) => handlers::execute_state(&suite_config, args, &reporter),
        Commands::Load(ref args) => handlers::execute_load(suite_config, args, &mut reporter)
            .await
            .map(|_| ()),
        Commands::Config => handlers::execute_config(&suite_config),
    }
}
