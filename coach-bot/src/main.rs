//! coach-bot entry point.

use anyhow::Result;
use clap::Parser;
use coach_bot::{run_bot, CoachConfig, Cli, Commands};
use dbot_core::init_tracing_with_default;

/// Log filter when `RUST_LOG` is unset and `DEBUG` is on: shows streamed fragments.
const DEBUG_FILTER: &str = "info,relay=debug";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = CoachConfig::load(token)?;
            let default_filter = if config.debug { DEBUG_FILTER } else { "info" };
            init_tracing_with_default(&config.log_file, default_filter)?;
            run_bot(config).await
        }
    }
}
