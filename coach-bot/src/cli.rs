//! CLI parser.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "coach-bot")]
#[command(about = "Business-coach Telegram bot", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_token() {
        let cli = Cli::parse_from(["coach-bot", "run", "--token", "abc"]);
        match cli.command {
            Commands::Run { token } => assert_eq!(token.as_deref(), Some("abc")),
        }
    }

    #[test]
    fn test_parse_run_without_token() {
        let cli = Cli::parse_from(["coach-bot", "run"]);
        match cli.command {
            Commands::Run { token } => assert!(token.is_none()),
        }
    }
}
