//! Terminal User Interface implementation
//!
//! Draws the price and volume panes with ratatui.

mod input;
mod render;

use std::io::{Stdout, stdout};

use anyhow::Result;
use crossterm::{
    cursor, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use super::ViewState;
use crate::chart::{CandlePoint, PaneBuffer, VolumeBar};
use crate::market_data::Selection;
use crate::session::command_router::InteractiveCommand;

pub use input::handle_key_event;
use render::render_root;

/// Actions generated from key handling
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    None,
    Command(InteractiveCommand),
    QuitRequested,
}

/// Everything the renderer needs from the chart
pub struct ChartView<'a> {
    pub selection: Option<&'a Selection>,
    pub price: &'a PaneBuffer<CandlePoint>,
    pub volume: &'a PaneBuffer<VolumeBar>,
    pub loading: bool,
    pub loading_older: bool,
}

/// RAII helper controlling the terminal lifecycle
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Create a new TUI terminal instance
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self { terminal })
    }

    /// Render the chart
    pub fn draw(&mut self, view: &ViewState, chart: &ChartView<'_>) -> Result<()> {
        self.terminal.draw(|frame| {
            render_root(frame, view, chart);
        })?;
        Ok(())
    }

    /// Restore terminal to canonical mode
    pub fn restore(&mut self) -> Result<()> {
        disable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, cursor::Show, LeaveAlternateScreen)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        // Attempt to restore the terminal; ignore errors because we are in Drop
        let _ = disable_raw_mode();
        let mut stdout = stdout();
        let _ = execute!(stdout, cursor::Show, LeaveAlternateScreen);
    }
}
