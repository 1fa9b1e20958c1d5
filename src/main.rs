//! adhan - Show the next Islamic prayer and the time remaining until it
//!
//! Reads today's prayer times from a local cache, fetching them from the
//! configured upstream when the cache has no entry for today, and prints the
//! next prayer followed by the day's schedule.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use adhan::app;
use adhan::cli::Cli;

/// Logs go to stderr so stdout carries only the report
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    // A missing .env file is fine
    dotenv::dotenv().ok();

    match app::run(&cli).await {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("adhan: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
