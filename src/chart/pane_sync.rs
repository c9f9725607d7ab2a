//! Keeps the price and volume panes aligned
//!
//! A range change on either pane is mirrored to the other. Applying the
//! mirrored range makes the target pane fire its own change notification;
//! that echo arrives while `syncing` is set and is dropped, so one gesture
//! produces exactly one update on the opposite pane.

use tracing::trace;

use crate::market_data::{OhlcvRecord, ValueRange};

use super::overlay::OverlayLine;
use super::surface::{CandlePoint, PaneId, RenderSurface, VisibleRange, VolumeBar};

pub struct DualPaneSync<P, V> {
    price: P,
    volume: V,
    syncing: bool,
    hovered: Option<i64>,
}

impl<P, V> DualPaneSync<P, V>
where
    P: RenderSurface<Point = CandlePoint>,
    V: RenderSurface<Point = VolumeBar>,
{
    pub fn new(price: P, volume: V) -> Self {
        Self {
            price,
            volume,
            syncing: false,
            hovered: None,
        }
    }

    pub fn price(&self) -> &P {
        &self.price
    }

    pub fn volume(&self) -> &V {
        &self.volume
    }

    /// Time currently under the crosshair, if any
    pub fn hovered(&self) -> Option<i64> {
        self.hovered
    }

    pub fn range_of(&self, pane: PaneId) -> Option<VisibleRange> {
        match pane {
            PaneId::Price => self.price.visible_range(),
            PaneId::Volume => self.volume.visible_range(),
        }
    }

    /// Push the same records to both panes
    pub fn set_series(&mut self, records: &[OhlcvRecord]) {
        self.price.set_data(records.iter().map(CandlePoint::from).collect());
        self.volume.set_data(records.iter().map(VolumeBar::from).collect());
    }

    pub fn set_value_range(&mut self, range: Option<ValueRange>) {
        self.price.set_value_range(range);
    }

    /// Handle a range-change notification fired by `source`
    ///
    /// Returns false when the notification was an echo of our own update.
    pub fn on_visible_range_change(&mut self, source: PaneId, range: VisibleRange) -> bool {
        if self.syncing {
            trace!("Dropping echoed range change from {:?}", source);
            return false;
        }

        self.syncing = true;
        let echo = match source {
            PaneId::Price => self.volume.set_visible_range(range),
            PaneId::Volume => self.price.set_visible_range(range),
        };
        if let Some(echo) = echo {
            self.on_visible_range_change(source.other(), echo);
        }
        self.syncing = false;
        true
    }

    /// Apply a user gesture to `source`, then mirror it
    ///
    /// Returns the notification the gesture produced, if the range changed.
    pub fn user_range_change(&mut self, source: PaneId, range: VisibleRange) -> Option<VisibleRange> {
        let notification = match source {
            PaneId::Price => self.price.set_visible_range(range),
            PaneId::Volume => self.volume.set_visible_range(range),
        }?;
        self.on_visible_range_change(source, notification);
        Some(notification)
    }

    /// Set a range on both panes from the controller, not from a gesture
    pub fn apply_range(&mut self, range: VisibleRange) {
        self.syncing = true;
        let _ = self.price.set_visible_range(range);
        let _ = self.volume.set_visible_range(range);
        self.syncing = false;
    }

    /// Mirror a crosshair move to the opposite pane
    pub fn on_crosshair_move(&mut self, source: PaneId, time: Option<i64>) {
        self.hovered = time;
        match (source.other(), time) {
            (PaneId::Price, Some(t)) => self.price.set_crosshair(t),
            (PaneId::Price, None) => self.price.clear_crosshair(),
            (PaneId::Volume, Some(t)) => self.volume.set_crosshair(t),
            (PaneId::Volume, None) => self.volume.clear_crosshair(),
        }
    }

    /// Pointer moved over `source`: draw its crosshair, then mirror it
    pub fn pointer_at(&mut self, source: PaneId, time: Option<i64>) {
        match (source, time) {
            (PaneId::Price, Some(t)) => self.price.set_crosshair(t),
            (PaneId::Price, None) => self.price.clear_crosshair(),
            (PaneId::Volume, Some(t)) => self.volume.set_crosshair(t),
            (PaneId::Volume, None) => self.volume.clear_crosshair(),
        }
        self.on_crosshair_move(source, time);
    }

    pub fn clear_crosshair(&mut self) {
        self.hovered = None;
        self.price.clear_crosshair();
        self.volume.clear_crosshair();
    }

    pub fn set_overlay(&mut self, overlay: Option<OverlayLine>) {
        self.volume.set_overlay(overlay.clone());
        self.price.set_overlay(overlay);
    }

    /// Inline error on the price pane, volume pane hidden
    pub fn show_error(&mut self, message: String) {
        self.price.set_error(Some(message));
        self.volume.set_hidden(true);
    }

    pub fn clear_error(&mut self) {
        self.price.set_error(None);
        self.volume.set_hidden(false);
    }

    /// Empty both panes
    pub fn clear(&mut self) {
        self.set_series(&[]);
        self.set_value_range(None);
        self.set_overlay(None);
        self.clear_crosshair();
    }

    pub fn destroy(&mut self) {
        self.price.destroy();
        self.volume.destroy();
        self.hovered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::surface::PaneBuffer;

    type Panes = DualPaneSync<PaneBuffer<CandlePoint>, PaneBuffer<VolumeBar>>;

    fn panes() -> Panes {
        DualPaneSync::new(PaneBuffer::new(), PaneBuffer::new())
    }

    #[test]
    fn test_gesture_updates_other_pane_once() {
        let mut sync = panes();
        let range = VisibleRange::new(10.0, 40.0);

        assert_eq!(sync.user_range_change(PaneId::Price, range), Some(range));
        assert_eq!(sync.volume().visible_range(), Some(range));
        assert_eq!(sync.volume().range_updates(), 1);
        assert_eq!(sync.price().range_updates(), 1);

        // and the other way round
        let back = VisibleRange::new(5.0, 35.0);
        sync.user_range_change(PaneId::Volume, back);
        assert_eq!(sync.price().visible_range(), Some(back));
        assert_eq!(sync.price().range_updates(), 2);
        assert_eq!(sync.volume().range_updates(), 2);
    }

    #[test]
    fn test_echo_is_dropped() {
        let mut sync = panes();
        sync.syncing = true;
        assert!(!sync.on_visible_range_change(PaneId::Volume, VisibleRange::new(0.0, 1.0)));
        assert_eq!(sync.price().range_updates(), 0);
    }

    #[test]
    fn test_apply_range_sets_both_without_loop() {
        let mut sync = panes();
        sync.apply_range(VisibleRange::new(0.0, 59.0));
        assert_eq!(sync.price().range_updates(), 1);
        assert_eq!(sync.volume().range_updates(), 1);
        assert!(!sync.syncing);
    }

    #[test]
    fn test_crosshair_mirrors_and_clears() {
        let mut sync = panes();
        sync.on_crosshair_move(PaneId::Price, Some(120));
        assert_eq!(sync.volume().crosshair(), Some(120));
        assert_eq!(sync.hovered(), Some(120));

        sync.on_crosshair_move(PaneId::Price, None);
        assert_eq!(sync.volume().crosshair(), None);
        assert_eq!(sync.hovered(), None);
    }

    #[test]
    fn test_error_hides_volume() {
        let mut sync = panes();
        sync.show_error("boom".to_string());
        assert_eq!(sync.price().error(), Some("boom"));
        assert!(sync.volume().is_hidden());
        sync.clear_error();
        assert!(!sync.volume().is_hidden());
    }
}
