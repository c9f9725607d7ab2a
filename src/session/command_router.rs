//! Command Router for interactive command processing

use anyhow::{Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::action_channel::SessionEvent;
use crate::config::Config;
use crate::market_data::{PanDirection, TIC_SCOPES, Timeframe};

const ZOOM_IN: f64 = 0.8;
const ZOOM_OUT: f64 = 1.25;

/// Interactive commands for the chart session
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveCommand {
    /// Switch the selected symbol
    Symbol { symbol: String },
    /// Switch the timeframe, optionally with a minute bucket size
    Timeframe {
        timeframe: Timeframe,
        tic_scope: Option<u32>,
    },
    /// Move the visible range by a number of bars (negative is toward the past)
    Pan { bars: f64 },
    /// Slide the window to the next page in a direction
    Edge { direction: PanDirection },
    /// Scale the visible span
    Zoom { factor: f64 },
    /// Hover the bar at an index of the visible slice
    Hover { index: Option<usize> },
    /// Move the hovered bar
    HoverStep { delta: i32 },
    /// Back to the newest bars
    Reset,
    /// Show feed statistics
    Status,
    /// Show the command list
    Help,
    /// Quit the application
    Quit,
}

/// Parses typed commands and feeds them to the session
#[derive(Debug, Default)]
pub struct CommandRouter;

impl CommandRouter {
    pub fn new() -> Self {
        Self
    }

    /// Parse interactive command from string input
    pub fn parse_interactive_command(&self, input: &str) -> Result<Option<InteractiveCommand>> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let command = parts[0].trim_start_matches('/').to_ascii_lowercase();

        let parsed = match command.as_str() {
            "symbol" | "s" => {
                let symbol = parts
                    .get(1)
                    .ok_or_else(|| anyhow!("Usage: symbol <code>"))?;
                let symbol = Config::normalize_symbol(symbol);
                if !Config::is_valid_symbol(&symbol) {
                    return Err(anyhow!("Invalid symbol: {}", symbol));
                }
                InteractiveCommand::Symbol { symbol }
            }
            "tf" | "timeframe" => {
                let timeframe = parts
                    .get(1)
                    .ok_or_else(|| anyhow!("Usage: tf <minute|daily|weekly|monthly|yearly> [scope]"))?
                    .parse::<Timeframe>()
                    .map_err(|e| anyhow!(e))?;
                let tic_scope = match parts.get(2) {
                    Some(raw) => {
                        let scope: u32 = raw
                            .parse()
                            .map_err(|_| anyhow!("Invalid minute scope: {}", raw))?;
                        if !TIC_SCOPES.contains(&scope) {
                            return Err(anyhow!(
                                "Minute scope must be one of {:?}",
                                TIC_SCOPES
                            ));
                        }
                        Some(scope)
                    }
                    None => None,
                };
                InteractiveCommand::Timeframe {
                    timeframe,
                    tic_scope,
                }
            }
            "pan" => match parts.get(1).copied() {
                Some("past") | Some("left") => InteractiveCommand::Edge {
                    direction: PanDirection::Past,
                },
                Some("future") | Some("right") => InteractiveCommand::Edge {
                    direction: PanDirection::Future,
                },
                Some(raw) => {
                    let bars: f64 = raw
                        .parse()
                        .map_err(|_| anyhow!("Usage: pan past|future|<bars>"))?;
                    InteractiveCommand::Pan { bars }
                }
                None => return Err(anyhow!("Usage: pan past|future|<bars>")),
            },
            "zoom" => match parts.get(1).copied() {
                Some("in") | Some("+") => InteractiveCommand::Zoom { factor: ZOOM_IN },
                Some("out") | Some("-") => InteractiveCommand::Zoom { factor: ZOOM_OUT },
                _ => return Err(anyhow!("Usage: zoom in|out")),
            },
            "hover" => match parts.get(1).copied() {
                Some("off") | None => InteractiveCommand::Hover { index: None },
                Some(raw) => {
                    let index: usize = raw
                        .parse()
                        .map_err(|_| anyhow!("Usage: hover <index>|off"))?;
                    InteractiveCommand::Hover { index: Some(index) }
                }
            },
            "reset" => InteractiveCommand::Reset,
            "status" => InteractiveCommand::Status,
            "help" | "?" => InteractiveCommand::Help,
            "quit" | "exit" | "q" => InteractiveCommand::Quit,
            other => return Err(anyhow!("Unknown command: {}. Type 'help'.", other)),
        };

        Ok(Some(parsed))
    }

    /// Read commands from stdin until EOF, forwarding them as session events
    pub fn spawn_stdin_reader(self, events: mpsc::UnboundedSender<SessionEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                };

                let event = match self.parse_interactive_command(&line) {
                    Ok(Some(command)) => SessionEvent::UserCommand { command },
                    Ok(None) => continue,
                    Err(e) => SessionEvent::Error {
                        message: e.to_string(),
                    },
                };
                if events.send(event).is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Option<InteractiveCommand>> {
        CommandRouter::new().parse_interactive_command(input)
    }

    #[test]
    fn test_parse_symbol_command() {
        assert_eq!(
            parse("symbol 000660").unwrap(),
            Some(InteractiveCommand::Symbol {
                symbol: "000660".to_string()
            })
        );
        assert!(parse("symbol").is_err());
        assert!(parse("symbol ab-cd").is_err());
    }

    #[test]
    fn test_parse_timeframe_with_scope() {
        assert_eq!(
            parse("tf minute 5").unwrap(),
            Some(InteractiveCommand::Timeframe {
                timeframe: Timeframe::Minute,
                tic_scope: Some(5)
            })
        );
        assert_eq!(
            parse("/tf weekly").unwrap(),
            Some(InteractiveCommand::Timeframe {
                timeframe: Timeframe::Weekly,
                tic_scope: None
            })
        );
        assert!(parse("tf minute 7").is_err());
        assert!(parse("tf hourly").is_err());
    }

    #[test]
    fn test_parse_view_commands() {
        assert_eq!(
            parse("pan past").unwrap(),
            Some(InteractiveCommand::Edge {
                direction: PanDirection::Past
            })
        );
        assert_eq!(
            parse("pan -3").unwrap(),
            Some(InteractiveCommand::Pan { bars: -3.0 })
        );
        assert_eq!(
            parse("zoom in").unwrap(),
            Some(InteractiveCommand::Zoom { factor: ZOOM_IN })
        );
        assert_eq!(
            parse("hover 4").unwrap(),
            Some(InteractiveCommand::Hover { index: Some(4) })
        );
        assert_eq!(
            parse("hover off").unwrap(),
            Some(InteractiveCommand::Hover { index: None })
        );
    }

    #[test]
    fn test_parse_empty_and_unknown() {
        assert_eq!(parse("   ").unwrap(), None);
        assert!(parse("buy 10").is_err());
        assert_eq!(parse("quit").unwrap(), Some(InteractiveCommand::Quit));
    }
}
