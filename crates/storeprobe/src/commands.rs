//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Storeprobe: log a test customer in once, then run storefront journeys
#[derive(Parser, Debug)]
#[command(name = "storeprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Suite configuration file (optional)
    #[arg(long, default_value = "storeprobe.yaml", global = true)]
    pub config: PathBuf,

    /// Override the storefront base URL
    #[arg(long, global = true, env = "STOREPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Page driver
    #[arg(long, default_value_t = DriverArg::default(), global = true)]
    pub driver: DriverArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and save the session file
    Setup(SetupArgs),

    /// Run the storefront journeys
    Test(TestArgs),

    /// List the built-in journeys
    List(ListArgs),

    /// Summarize a saved session file
    State(StateArgs),

    /// Replay cart and checkout API calls with the session token
    Load(LoadArgs),

    /// Print the resolved configuration as YAML
    Config,
}

/// Arguments for the setup command
#[derive(Parser, Debug, Default)]
pub struct SetupArgs {
    /// Seed a pre-issued token instead of logging in
    #[arg(long, conflicts_with = "otp")]
    pub token: Option<String>,

    /// Use this OTP instead of the configured provider
    #[arg(long)]
    pub otp: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

/// Arguments for the test command
#[derive(Parser, Debug, Default)]
pub struct TestArgs {
    /// Only run journeys whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Number of journeys run concurrently
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Stop scheduling after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Output directory for screenshots and report.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Only list journeys whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the state command
#[derive(Parser, Debug, Default)]
pub struct StateArgs {
    /// Session file (defaults to the configured one)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the load command
#[derive(Parser, Debug, Default)]
pub struct LoadArgs {
    /// Concurrent virtual users
    #[arg(short, long)]
    pub users: Option<usize>,

    /// Run duration in seconds
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Shortest pause between a user's requests, in milliseconds
    #[arg(long)]
    pub min_wait: Option<u64>,

    /// Longest pause between a user's requests, in milliseconds
    #[arg(long)]
    pub max_wait: Option<u64>,

    /// Bearer token (defaults to the token in the session file)
    #[arg(long, env = "STOREPROBE_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API base URL (defaults to load.api_base_url, then base_url)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Fail when more than this percentage of requests failed
    #[arg(long)]
    pub max_error_rate: Option<f64>,

    /// Output directory for load-report.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Which backend drives the pages
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverArg {
    /// Chromium over CDP
    Chromium,
    /// Scripted in-memory storefront
    Mock,
}

impl Default for DriverArg {
    fn default() -> Self {
        if cfg!(feature = "browser") {
            Self::Chromium
        } else {
            Self::Mock
        }
    }
}

impl std::fmt::Display for DriverArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Chromium => "chromium",
            Self::Mock => "mock",
        })
    }
}

/// Color output argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Color when writing to a terminal
    #[default]
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("storeprobe").chain(args.iter().copied())).unwrap()
    }

    mod cli_tests {
        use super::*;

        #[test]
        fn test_setup_with_otp() {
            let cli = parse(&["--driver", "mock", "setup", "--otp", "123456"]);
            assert_eq!(cli.driver, DriverArg::Mock);
            let Commands::Setup(args) = cli.command else {
                panic!("expected setup");
            };
            assert_eq!(args.otp.as_deref(), Some("123456"));
            assert!(args.token.is_none());
        }

        #[test]
        fn test_token_conflicts_with_otp() {
            let result =
                Cli::try_parse_from(["storeprobe", "setup", "--token", "t", "--otp", "123456"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_test_args() {
            let cli = parse(&["-vv", "test", "--filter", "checkout::", "-j", "3", "--fail-fast"]);
            assert_eq!(cli.verbose, 2);
            let Commands::Test(args) = cli.command else {
                panic!("expected test");
            };
            assert_eq!(args.filter.as_deref(), Some("checkout::"));
            assert_eq!(args.workers, Some(3));
            assert!(args.fail_fast);
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = parse(&["config", "--config", "ci.yaml", "--base-url", "https://shop.test"]);
            assert_eq!(cli.config, PathBuf::from("ci.yaml"));
            assert_eq!(cli.base_url.as_deref(), Some("https://shop.test"));
            assert!(matches!(cli.command, Commands::Config));
        }

        #[test]
        fn test_load_args() {
            let cli = parse(&[
                "load", "-u", "5", "-d", "30", "--min-wait", "100", "--max-wait", "900",
                "--max-error-rate", "2.5",
            ]);
            let Commands::Load(args) = cli.command else {
                panic!("expected load");
            };
            assert_eq!(args.users, Some(5));
            assert_eq!(args.duration, Some(30));
            assert_eq!((args.min_wait, args.max_wait), (Some(100), Some(900)));
            assert_eq!(args.max_error_rate, Some(2.5));
            assert!(!args.json);
        }

        #[test]
        fn test_quiet_conflicts_with_verbose() {
            assert!(Cli::try_parse_from(["storeprobe", "-q", "-v", "list"]).is_err());
        }
    }
}
