//! medialog - personal media catalog
//!
//! Usage:
//!   medialog <command> [options]   Run a command against the library
//!   medialog --help                Show help

use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        cli::print_help();
        return Ok(());
    }

    init_logging();

    match cli::parse_args(&args) {
        Ok((command, options)) => cli::run(command, options).await,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            cli::print_help();
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    // stdout carries command output (possibly JSON), so logs go to stderr
    let filter = EnvFilter::try_from_env("MEDIALOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
