//! In-memory series for the current selection plus the visible window over it
//!
//! The store keeps every record loaded for a selection, ascending by time
//! with unique times. Only a contiguous window of at most `page_size`
//! records is handed to the chart surfaces; panning near an edge slides
//! the window or asks for an older page.

use tracing::{debug, info};

use super::ohlcv::{OhlcvRecord, Selection};

pub const DEFAULT_PAGE_SIZE: usize = 60;
pub const DEFAULT_PAGE_INCREMENT: usize = 30;
pub const DEFAULT_EDGE_MARGIN: usize = 3;
pub const DEFAULT_VALUE_PADDING: f64 = 0.1;

/// Window sizing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    pub page_size: usize,
    pub page_increment: usize,
    pub edge_margin: usize,
    pub value_padding_ratio: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_increment: DEFAULT_PAGE_INCREMENT,
            edge_margin: DEFAULT_EDGE_MARGIN,
            value_padding_ratio: DEFAULT_VALUE_PADDING,
        }
    }
}

/// Half-open index range `[start, end)` into the series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleWindow {
    pub start: usize,
    pub end: usize,
}

impl VisibleWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    Past,
    Future,
}

/// Result of a pan that reached an edge of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanOutcome {
    /// The window slid by `shift` records toward the requested direction
    Revealed { shift: usize },
    /// In-memory data is exhausted; an older page ending before `before` is needed
    NeedsOlder { before: i64 },
    /// Nothing further in that direction
    AtBoundary,
}

/// How a live record changed the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickApplied {
    /// The tail bucket was updated rather than a new bucket appended
    pub replaced: bool,
    /// The visible slice changed and must be re-rendered
    pub window_changed: bool,
}

/// Padded value bounds of the loaded series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Windowed history for one selection
#[derive(Debug)]
pub struct HistoryStore {
    config: WindowConfig,
    selection: Option<Selection>,
    series: Vec<OhlcvRecord>,
    window: VisibleWindow,
    history_exhausted: bool,
}

impl HistoryStore {
    /// Create a new empty store
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            selection: None,
            series: Vec::new(),
            window: VisibleWindow::default(),
            history_exhausted: false,
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Replace all data with a freshly fetched series and show its tail
    pub fn load_initial(&mut self, selection: Selection, records: Vec<OhlcvRecord>) {
        self.series = ordered(records);
        self.selection = Some(selection);
        self.history_exhausted = self.series.is_empty();
        self.window = self.tail_window();
        info!(
            "Loaded {} records, showing [{}, {})",
            self.series.len(),
            self.window.start,
            self.window.end
        );
    }

    /// Drop everything, e.g. when the selection changes
    pub fn clear(&mut self) {
        self.selection = None;
        self.series.clear();
        self.window = VisibleWindow::default();
        self.history_exhausted = false;
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn series(&self) -> &[OhlcvRecord] {
        &self.series
    }

    pub fn window(&self) -> VisibleWindow {
        self.window
    }

    /// Records currently handed to the surfaces
    pub fn visible_slice(&self) -> &[OhlcvRecord] {
        &self.series[self.window.start..self.window.end]
    }

    pub fn latest(&self) -> Option<&OhlcvRecord> {
        self.series.last()
    }

    pub fn earliest(&self) -> Option<&OhlcvRecord> {
        self.series.first()
    }

    pub fn is_history_exhausted(&self) -> bool {
        self.history_exhausted
    }

    /// Whether the window currently ends at the newest record
    pub fn is_at_tail(&self) -> bool {
        self.window.end == self.series.len()
    }

    /// Record with exactly this bucket time
    pub fn record_at(&self, time: i64) -> Option<&OhlcvRecord> {
        self.series
            .binary_search_by_key(&time, |r| r.time)
            .ok()
            .map(|idx| &self.series[idx])
    }

    /// Record immediately before the one at `time`
    pub fn previous_of(&self, time: i64) -> Option<&OhlcvRecord> {
        let idx = self.series.partition_point(|r| r.time < time);
        idx.checked_sub(1).map(|i| &self.series[i])
    }

    /// Which edge, if any, a logical bar range `[from, to]` over the visible slice touches
    pub fn edge_for(&self, from: f64, to: f64) -> Option<PanDirection> {
        let len = self.window.len();
        if len == 0 {
            return None;
        }
        let margin = self.config.edge_margin as f64;
        if from < margin {
            Some(PanDirection::Past)
        } else if to > (len as f64 - 1.0 - margin) {
            Some(PanDirection::Future)
        } else {
            None
        }
    }

    /// Slide the window toward `direction` after the user panned to an edge
    pub fn on_pan_to_edge(&mut self, direction: PanDirection) -> PanOutcome {
        let step = self.config.page_increment.max(1);
        match direction {
            PanDirection::Past => {
                if self.window.start > 0 {
                    // a window narrower than the target width grows before it slides
                    let width = self.config.page_size.max(1).min(self.series.len());
                    let grow = width
                        .saturating_sub(self.window.len())
                        .min(step)
                        .min(self.window.start);
                    self.window.start -= grow;
                    let slide = (step - grow).min(self.window.start);
                    self.window.start -= slide;
                    self.window.end -= slide;
                    let shift = grow + slide;
                    debug!(
                        "Window moved {} records into the past ({} widened)",
                        shift, grow
                    );
                    PanOutcome::Revealed { shift }
                } else if self.history_exhausted {
                    PanOutcome::AtBoundary
                } else {
                    match self.series.first() {
                        Some(first) => PanOutcome::NeedsOlder { before: first.time },
                        None => PanOutcome::AtBoundary,
                    }
                }
            }
            PanDirection::Future => {
                let remaining = self.series.len() - self.window.end;
                if remaining > 0 {
                    let shift = step.min(remaining);
                    self.window.start += shift;
                    self.window.end += shift;
                    debug!("Window moved {} records into the future", shift);
                    PanOutcome::Revealed { shift }
                } else {
                    PanOutcome::AtBoundary
                }
            }
        }
    }

    /// Merge an older page in front of the series
    ///
    /// Only records strictly older than the current first record are kept.
    /// The window keeps pointing at the same records. Returns how many were
    /// added; zero marks history as exhausted.
    pub fn prepend_page(&mut self, records: Vec<OhlcvRecord>) -> usize {
        let mut older = ordered(records);
        if let Some(first) = self.series.first() {
            let cutoff = first.time;
            older.retain(|r| r.time < cutoff);
        }

        let added = older.len();
        if added == 0 {
            info!("No older records returned, history exhausted");
            self.history_exhausted = true;
            return 0;
        }

        older.append(&mut self.series);
        self.series = older;
        self.window.start += added;
        self.window.end += added;
        info!("Prepended {} older records ({} total)", added, self.series.len());
        added
    }

    /// Apply a live record to the tail of the series
    ///
    /// Same bucket as the tail replaces it, a newer bucket is appended and
    /// anything older is ignored. The window only follows when it was
    /// already showing the tail.
    pub fn append_live_tick(&mut self, record: OhlcvRecord) -> Option<TickApplied> {
        let last_time = self.series.last()?.time;
        let at_tail = self.is_at_tail();

        if record.time == last_time {
            if let Some(last) = self.series.last_mut() {
                *last = record;
            }
            return Some(TickApplied {
                replaced: true,
                window_changed: at_tail,
            });
        }

        if record.time < last_time {
            debug!("Ignoring tick for past bucket {}", record.time);
            return None;
        }

        self.series.push(record);
        if at_tail {
            self.window.end += 1;
            if self.window.len() > self.config.page_size {
                self.window.start += 1;
            }
        }
        Some(TickApplied {
            replaced: false,
            window_changed: at_tail,
        })
    }

    /// Return the window to the tail of the series
    pub fn reset(&mut self) {
        self.window = self.tail_window();
    }

    /// Padded min/max over every loaded record
    pub fn value_range(&self) -> Option<ValueRange> {
        let first = self.series.first()?;
        let (min, max) = self
            .series
            .iter()
            .fold((first.low, first.high), |(lo, hi), r| (lo.min(r.low), hi.max(r.high)));

        let span = max - min;
        let pad = if span > 0.0 {
            span * self.config.value_padding_ratio
        } else if max.abs() > 0.0 {
            max.abs() * self.config.value_padding_ratio
        } else {
            1.0
        };

        Some(ValueRange {
            min: min - pad,
            max: max + pad,
        })
    }

    fn tail_window(&self) -> VisibleWindow {
        let end = self.series.len();
        VisibleWindow {
            start: end.saturating_sub(self.config.page_size.max(1)),
            end,
        }
    }
}

/// Sort ascending by time, later duplicates win
fn ordered(mut records: Vec<OhlcvRecord>) -> Vec<OhlcvRecord> {
    if records.windows(2).all(|w| w[0].time < w[1].time) {
        return records;
    }
    records.reverse();
    // stable sort keeps later input first among equal times
    records.sort_by_key(|r| r.time);
    records.dedup_by_key(|r| r.time);
    records
}
