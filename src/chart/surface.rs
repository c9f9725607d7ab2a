//! Render surface abstraction for the two chart panes

use crate::market_data::{OhlcvRecord, ValueRange};

use super::overlay::OverlayLine;

/// Logical bar range `[from, to]` relative to the data currently set on a pane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRange {
    pub from: f64,
    pub to: f64,
}

impl VisibleRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Range covering `len` bars, or `None` for no data
    pub fn full(len: usize) -> Option<Self> {
        (len > 0).then(|| Self::new(0.0, len as f64 - 1.0))
    }

    pub fn shifted(&self, by: f64) -> Self {
        Self::new(self.from + by, self.to + by)
    }

    pub fn span(&self) -> f64 {
        self.to - self.from
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneId {
    Price,
    Volume,
}

impl PaneId {
    pub fn other(self) -> Self {
        match self {
            PaneId::Price => PaneId::Volume,
            PaneId::Volume => PaneId::Price,
        }
    }
}

/// Candle drawn by the price pane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandlePoint {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<&OhlcvRecord> for CandlePoint {
    fn from(r: &OhlcvRecord) -> Self {
        Self {
            time: r.time,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
        }
    }
}

/// Bar drawn by the volume pane, colored by the candle direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBar {
    pub time: i64,
    pub value: f64,
    pub up: bool,
}

impl From<&OhlcvRecord> for VolumeBar {
    fn from(r: &OhlcvRecord) -> Self {
        Self {
            time: r.time,
            value: r.volume,
            up: r.is_up(),
        }
    }
}

/// Something that can draw one chart pane
///
/// `set_visible_range` returns the range-change notification the surface
/// fires as a consequence, which is `None` when the range did not change.
pub trait RenderSurface {
    type Point: Clone;

    fn set_data(&mut self, points: Vec<Self::Point>);
    fn visible_range(&self) -> Option<VisibleRange>;
    fn set_visible_range(&mut self, range: VisibleRange) -> Option<VisibleRange>;
    fn set_crosshair(&mut self, time: i64);
    fn clear_crosshair(&mut self);
    fn set_overlay(&mut self, overlay: Option<OverlayLine>);
    fn set_error(&mut self, message: Option<String>);
    fn set_hidden(&mut self, hidden: bool);
    fn set_value_range(&mut self, _range: Option<ValueRange>) {}
    fn destroy(&mut self);
}

/// Retained pane state, drawn by the terminal UI
#[derive(Debug, Clone)]
pub struct PaneBuffer<T> {
    data: Vec<T>,
    range: Option<VisibleRange>,
    crosshair: Option<i64>,
    overlay: Option<OverlayLine>,
    error: Option<String>,
    value_range: Option<ValueRange>,
    hidden: bool,
    destroyed: bool,
    range_updates: usize,
}

impl<T> Default for PaneBuffer<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            range: None,
            crosshair: None,
            overlay: None,
            error: None,
            value_range: None,
            hidden: false,
            destroyed: false,
            range_updates: 0,
        }
    }
}

impl<T> PaneBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn crosshair(&self) -> Option<i64> {
        self.crosshair
    }

    pub fn overlay(&self) -> Option<&OverlayLine> {
        self.overlay.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn value_range(&self) -> Option<ValueRange> {
        self.value_range
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// How many times the visible range actually changed
    pub fn range_updates(&self) -> usize {
        self.range_updates
    }
}

impl<T: Clone> RenderSurface for PaneBuffer<T> {
    type Point = T;

    fn set_data(&mut self, points: Vec<T>) {
        if self.destroyed {
            return;
        }
        self.data = points;
    }

    fn visible_range(&self) -> Option<VisibleRange> {
        self.range
    }

    fn set_visible_range(&mut self, range: VisibleRange) -> Option<VisibleRange> {
        if self.destroyed || self.range == Some(range) {
            return None;
        }
        self.range = Some(range);
        self.range_updates += 1;
        Some(range)
    }

    fn set_crosshair(&mut self, time: i64) {
        self.crosshair = Some(time);
    }

    fn clear_crosshair(&mut self) {
        self.crosshair = None;
    }

    fn set_overlay(&mut self, overlay: Option<OverlayLine>) {
        self.overlay = overlay;
    }

    fn set_error(&mut self, message: Option<String>) {
        self.error = message;
    }

    fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    fn set_value_range(&mut self, range: Option<ValueRange>) {
        self.value_range = range;
    }

    fn destroy(&mut self) {
        self.data.clear();
        self.range = None;
        self.crosshair = None;
        self.overlay = None;
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_notification_only_on_change() {
        let mut pane: PaneBuffer<VolumeBar> = PaneBuffer::new();
        let range = VisibleRange::new(0.0, 10.0);
        assert_eq!(pane.set_visible_range(range), Some(range));
        assert_eq!(pane.set_visible_range(range), None);
        assert_eq!(pane.range_updates(), 1);
    }

    #[test]
    fn test_destroyed_pane_ignores_updates() {
        let mut pane: PaneBuffer<CandlePoint> = PaneBuffer::new();
        pane.destroy();
        assert_eq!(pane.set_visible_range(VisibleRange::new(0.0, 1.0)), None);
        pane.set_data(vec![CandlePoint { time: 0, open: 1.0, high: 1.0, low: 1.0, close: 1.0 }]);
        assert!(pane.data().is_empty());
    }

    #[test]
    fn test_volume_bar_direction() {
        let up = OhlcvRecord::new(0, 10.0, 12.0, 9.0, 10.0, 5.0);
        let down = OhlcvRecord::new(0, 10.0, 12.0, 9.0, 9.5, 5.0);
        assert!(VolumeBar::from(&up).up);
        assert!(!VolumeBar::from(&down).up);
    }
}
