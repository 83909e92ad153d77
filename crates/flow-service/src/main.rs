//! Main entry point for the flow service.
//!
//! Loads a configuration file, builds the configured stage pipeline, feeds
//! it the configured items, runs every order script against its own order,
//! and processes the optional record stream. Every stage effect is written
//! to the log.

use clap::Parser;
use flow_config::Config;
use flow_pipeline::TracingSink;
use std::path::PathBuf;
use std::sync::Arc;

mod runner;

use runner::FlowRunner;

/// Command-line arguments for the flow service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the flow service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Runs the pipeline, order scripts and record stream
/// 5. Logs a summary of the run
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	// RUST_LOG takes precedence over the command-line level
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started flow");

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let runner = FlowRunner::new(config, Arc::new(TracingSink::new()));
	let summary = runner.run().await?;

	tracing::info!(
		items = summary.items,
		orders = summary.orders.len(),
		records = summary.records.len(),
		"Run summary: {}",
		serde_json::to_string(&summary)?
	);

	tracing::info!("Stopped flow");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_args_defaults() {
		let args = Args::parse_from(["flow"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_overrides() {
		let args = Args::parse_from(["flow", "--config", "demo.toml", "-l", "debug"]);
		assert_eq!(args.config, PathBuf::from("demo.toml"));
		assert_eq!(args.log_level, "debug");
	}
}
