//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for stockchart.

use clap::{Parser, Subcommand};

use crate::market_data::Timeframe;

#[derive(Parser, Debug, Clone)]
#[command(name = "stockchart")]
#[command(about = "Streaming stock chart for the terminal")]
#[command(long_about = "Live candlestick and volume charts fed by a STOMP push channel and a chart REST API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch a live chart (default)
    Watch {
        /// Stock code to open, defaults to the first configured symbol
        #[arg(long)]
        symbol: Option<String>,

        /// Timeframe: minute, daily, weekly, monthly, yearly
        #[arg(long)]
        timeframe: Option<Timeframe>,

        /// Use simple line-based output instead of the full TUI
        #[arg(long)]
        simple: bool,
    },

    /// Fetch one chart page and print it
    Snapshot {
        /// Stock code
        #[arg(long)]
        symbol: String,

        /// Timeframe: minute, daily, weekly, monthly, yearly
        #[arg(long, default_value = "daily")]
        timeframe: Timeframe,

        /// Number of most recent records to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Watch {
            symbol: None,
            timeframe: None,
            simple: false,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration to the config file
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the actual command, using default if none provided
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Check if the TUI will own the terminal
    pub fn is_tui_mode(&self) -> bool {
        matches!(self.command(), Commands::Watch { simple: false, .. })
    }

    /// Log level from the flags, falling back to `configured`
    pub fn effective_log_level(&self, configured: &str) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level
                .clone()
                .unwrap_or_else(|| configured.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_watch() {
        let cli = Cli::try_parse_from(["stockchart"]).unwrap();
        assert!(cli.is_tui_mode());
        assert_eq!(cli.effective_log_level("warn"), "warn");
    }

    #[test]
    fn test_watch_arguments() {
        let cli = Cli::try_parse_from([
            "stockchart", "-v", "watch", "--symbol", "000660", "--timeframe", "weekly", "--simple",
        ])
        .unwrap();
        match cli.command() {
            Commands::Watch { symbol, timeframe, simple } => {
                assert_eq!(symbol.as_deref(), Some("000660"));
                assert_eq!(timeframe, Some(Timeframe::Weekly));
                assert!(simple);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!cli.is_tui_mode());
        assert_eq!(cli.effective_log_level("info"), "debug");
    }

    #[test]
    fn test_snapshot_defaults() {
        let cli = Cli::try_parse_from(["stockchart", "snapshot", "--symbol", "005930"]).unwrap();
        match cli.command() {
            Commands::Snapshot { timeframe, limit, .. } => {
                assert_eq!(timeframe, Timeframe::Daily);
                assert_eq!(limit, 20);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_timeframe() {
        assert!(Cli::try_parse_from(["stockchart", "watch", "--timeframe", "hourly"]).is_err());
    }
}
