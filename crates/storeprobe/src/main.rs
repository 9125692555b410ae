//! Storeprobe CLI: storefront end-to-end journeys
//!
//! ## Usage
//!
//! ```bash
//! storeprobe setup                      # Log in (OTP) and save the session
//! storeprobe setup --token <jwt>        # Seed a pre-issued token instead
//! storeprobe test                       # Run every journey
//! storeprobe test --filter checkout::   # Only the checkout journeys
//! storeprobe state                      # Inspect the saved session
//! storeprobe load -u 10 -d 60           # Replay cart/checkout API calls
//! ```

use clap::Parser;
use std::process::ExitCode;
use storeprobe::{init_logging, Cli, CliConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(CliConfig::from_cli(&cli));

    match storeprobe::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
