//! User Interface module
//!
//! Provides both TUI (Terminal User Interface) and simple CLI output capabilities.

/// TUI application state and rendering
pub mod tui;

/// Simple CLI output functions
pub mod cli;

use crate::market_data::{Selection, Timeframe};
use crate::metrics::FeedMetrics;

/// Color of rising bars and positive changes (`#ff3333`)
pub const UP_RGB: (u8, u8, u8) = (0xff, 0x33, 0x33);
/// Color of falling bars and negative changes (`#5050ff`)
pub const DOWN_RGB: (u8, u8, u8) = (0x50, 0x50, 0xff);

/// View state shared by both front ends
#[derive(Debug, Clone)]
pub struct ViewState {
    pub should_quit: bool,
    pub symbols: Vec<String>,
    pub selected_symbol: usize,
    pub timeframe: Timeframe,
    pub tic_scope: u32,
    /// Bar under the keyboard crosshair, as an index into the visible slice
    pub hover_index: Option<usize>,
    pub connection: FeedMetrics,
    pub notification: Option<String>,
    pub enable_colors: bool,
}

impl ViewState {
    /// Create new view state
    pub fn new(symbols: Vec<String>, timeframe: Timeframe, tic_scope: u32) -> Self {
        Self {
            should_quit: false,
            symbols,
            selected_symbol: 0,
            timeframe,
            tic_scope,
            hover_index: None,
            connection: FeedMetrics::default(),
            notification: None,
            enable_colors: true,
        }
    }

    /// Move to next symbol
    pub fn next_symbol(&mut self) {
        if !self.symbols.is_empty() {
            self.selected_symbol = (self.selected_symbol + 1) % self.symbols.len();
            self.hover_index = None;
        }
    }

    /// Move to previous symbol
    pub fn previous_symbol(&mut self) {
        if !self.symbols.is_empty() {
            self.selected_symbol = if self.selected_symbol == 0 {
                self.symbols.len() - 1
            } else {
                self.selected_symbol - 1
            };
            self.hover_index = None;
        }
    }

    /// Select `symbol`, adding it to the list when it is new
    pub fn focus_symbol(&mut self, symbol: &str) {
        match self.symbols.iter().position(|s| s == symbol) {
            Some(idx) => self.selected_symbol = idx,
            None => {
                self.symbols.push(symbol.to_string());
                self.selected_symbol = self.symbols.len() - 1;
            }
        }
        self.hover_index = None;
    }

    /// Get currently selected symbol
    pub fn current_symbol(&self) -> Option<&String> {
        self.symbols.get(self.selected_symbol)
    }

    pub fn set_timeframe(&mut self, timeframe: Timeframe, tic_scope: Option<u32>) {
        self.timeframe = timeframe;
        if let Some(scope) = tic_scope {
            self.tic_scope = scope;
        }
        self.hover_index = None;
    }

    /// The selection the chart should be showing
    pub fn selection(&self) -> Option<Selection> {
        self.current_symbol()
            .map(|symbol| Selection::new(symbol.clone(), self.timeframe).with_tic_scope(self.tic_scope))
    }

    /// Move the keyboard crosshair by `delta` bars within `len` visible bars
    pub fn step_hover(&mut self, delta: i32, len: usize) -> Option<usize> {
        if len == 0 {
            self.hover_index = None;
            return None;
        }
        let last = len as i64 - 1;
        let next = match self.hover_index {
            Some(idx) => (idx as i64 + i64::from(delta)).clamp(0, last),
            // entering hover starts from the newest bar
            None => last,
        };
        self.hover_index = Some(next as usize);
        self.hover_index
    }

    pub fn push_notification(&mut self, message: impl Into<String>) {
        self.notification = Some(message.into());
    }
}
