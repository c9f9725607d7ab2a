//! Chart controller
//!
//! Owns the current selection, the history store and both panes. Network
//! work is never done here: the controller queues [`ChartEffect`]s that the
//! session executes, and results come back through `on_fetch_completed`
//! together with the [`FetchTicket`] they were issued under. Responses whose
//! ticket no longer matches the current selection are discarded.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::feed::RestApiError;
use crate::market_data::{
    ChartRequest, HistoryStore, LiveTick, PanDirection, PanOutcome, Selection, WindowConfig,
    extract_items, normalize, wall_clock_epoch,
};

use super::overlay::OverlayLine;
use super::pane_sync::DualPaneSync;
use super::surface::{CandlePoint, PaneId, RenderSurface, VisibleRange, VolumeBar};

/// Controller tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    pub window: WindowConfig,
    pub currency_suffix: String,
    pub enable_history_paging: bool,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            currency_suffix: "원".to_string(),
            enable_history_paging: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    Older,
}

/// Identifies the request a fetch result belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub selection: Selection,
    pub kind: FetchKind,
}

/// Side effects requested by the controller, executed in queue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartEffect {
    /// Release the previous push subscription and subscribe to `symbol`
    SwitchSubscription { symbol: String },
    /// Tell the backend to start relaying `symbol`
    AnnounceSubscription { symbol: String },
    Fetch {
        ticket: FetchTicket,
        request: ChartRequest,
    },
    /// Release the push subscription without replacing it
    ReleaseSubscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    Applied,
    Stale,
}

pub struct ChartController<P, V> {
    settings: ChartSettings,
    store: HistoryStore,
    panes: DualPaneSync<P, V>,
    selection: Option<Selection>,
    subscribed: Option<String>,
    generation: u64,
    loading: bool,
    older_in_flight: Option<FetchTicket>,
    effects: VecDeque<ChartEffect>,
    mounted: bool,
}

impl<P, V> ChartController<P, V>
where
    P: RenderSurface<Point = CandlePoint>,
    V: RenderSurface<Point = VolumeBar>,
{
    /// Create a new controller mounted on the given panes
    pub fn new(settings: ChartSettings, price: P, volume: V) -> Self {
        Self {
            store: HistoryStore::new(settings.window),
            settings,
            panes: DualPaneSync::new(price, volume),
            selection: None,
            subscribed: None,
            generation: 0,
            loading: false,
            older_in_flight: None,
            effects: VecDeque::new(),
            mounted: true,
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn panes(&self) -> &DualPaneSync<P, V> {
        &self.panes
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loading_older(&self) -> bool {
        self.older_in_flight.is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Take the queued effects
    pub fn drain_effects(&mut self) -> Vec<ChartEffect> {
        self.effects.drain(..).collect()
    }

    /// Switch to a new symbol/timeframe
    ///
    /// Everything loaded for the previous selection is dropped. When the
    /// symbol changes the push subscription is switched before the REST
    /// announcement and the chart fetch are queued.
    pub fn select(&mut self, selection: Selection) {
        if !self.mounted {
            warn!("Ignoring selection of {} after unmount", selection.symbol);
            return;
        }
        if self.selection.as_ref() == Some(&selection) {
            debug!("Selection unchanged: {} {}", selection.symbol, selection.timeframe);
            return;
        }

        info!(
            "Selecting {} {} (tic_scope={})",
            selection.symbol, selection.timeframe, selection.tic_scope
        );

        self.generation += 1;
        self.older_in_flight = None;
        self.store.clear();
        self.panes.clear();
        self.panes.clear_error();

        if self.subscribed.as_deref() != Some(selection.symbol.as_str()) {
            self.effects.push_back(ChartEffect::SwitchSubscription {
                symbol: selection.symbol.clone(),
            });
            self.effects.push_back(ChartEffect::AnnounceSubscription {
                symbol: selection.symbol.clone(),
            });
            self.subscribed = Some(selection.symbol.clone());
        }

        let ticket = FetchTicket {
            generation: self.generation,
            selection: selection.clone(),
            kind: FetchKind::Initial,
        };
        self.effects.push_back(ChartEffect::Fetch {
            ticket,
            request: ChartRequest::latest(&selection),
        });
        self.selection = Some(selection);
        self.loading = true;
    }

    /// Deliver the result of a fetch issued through a [`ChartEffect::Fetch`]
    pub fn on_fetch_completed(
        &mut self,
        ticket: FetchTicket,
        result: Result<Value, RestApiError>,
    ) -> FetchDisposition {
        if !self.is_current(&ticket) {
            info!(
                "Discarding stale {:?} response for {} {}",
                ticket.kind, ticket.selection.symbol, ticket.selection.timeframe
            );
            return FetchDisposition::Stale;
        }

        let timeframe = ticket.selection.timeframe;
        match ticket.kind {
            FetchKind::Initial => {
                self.loading = false;
                match result {
                    Ok(payload) => {
                        let records = normalize(timeframe, extract_items(timeframe, &payload));
                        self.panes.clear_error();
                        if records.is_empty() {
                            warn!(
                                "No chart data for {} {}",
                                ticket.selection.symbol, timeframe
                            );
                            self.store.load_initial(ticket.selection, Vec::new());
                            self.panes.clear();
                        } else {
                            self.store.load_initial(ticket.selection, records);
                            self.render_window(None);
                        }
                    }
                    Err(e) => {
                        error!("Failed to load chart for {}: {}", ticket.selection.symbol, e);
                        self.store.clear();
                        self.panes.clear();
                        self.panes
                            .show_error(format!("차트 데이터를 불러올 수 없습니다 ({})", e));
                    }
                }
            }
            FetchKind::Older => {
                self.older_in_flight = None;
                match result {
                    Ok(payload) => {
                        let records = normalize(timeframe, extract_items(timeframe, &payload));
                        if self.store.prepend_page(records) > 0 {
                            self.pan_to_edge(PanDirection::Past);
                        }
                    }
                    // no visible error; the next pan to the edge retries
                    Err(e) => warn!("Failed to load older page: {}", e),
                }
            }
        }

        FetchDisposition::Applied
    }

    /// Apply a live tick received for `symbol` at market wall-clock time `now`
    ///
    /// Returns true when the store changed.
    pub fn on_live_tick(&mut self, symbol: &str, payload: &Value, now: NaiveDateTime) -> bool {
        let Some(selection) = self.selection.as_ref() else {
            return false;
        };
        if selection.symbol != symbol {
            debug!("Dropping tick for {} while showing {}", symbol, selection.symbol);
            return false;
        }
        let Some(tick) = LiveTick::from_payload(payload) else {
            debug!("Tick for {} carries no price", symbol);
            return false;
        };

        let bucket = wall_clock_epoch(selection.timeframe.bucket_start(now, selection.tic_scope));
        let before = self.store.window();
        let existing = self.store.latest().copied();
        let record = tick.into_record(bucket, existing.as_ref());

        let Some(applied) = self.store.append_live_tick(record) else {
            return false;
        };

        if applied.window_changed {
            let after = self.store.window();
            // keep the right edge on the newest bar while the window grows
            let grown = (after.end - before.end) as f64 - (after.start - before.start) as f64;
            let range = self.panes.range_of(PaneId::Price).map(|r| r.shifted(grown));
            self.render_window(range);
        } else {
            self.panes.set_value_range(self.store.value_range());
            self.refresh_overlay();
        }
        true
    }

    /// A user gesture set `range` on `source`
    pub fn pan(&mut self, source: PaneId, range: VisibleRange) {
        if let Some(notification) = self.panes.user_range_change(source, range) {
            self.check_edges(notification);
        }
    }

    /// A surface fired a range-change notification on its own
    pub fn on_visible_range_change(&mut self, source: PaneId, range: VisibleRange) {
        if self.panes.on_visible_range_change(source, range) {
            self.check_edges(range);
        }
    }

    /// Slide the window, or request an older page, toward `direction`
    pub fn pan_to_edge(&mut self, direction: PanDirection) {
        match self.store.on_pan_to_edge(direction) {
            PanOutcome::Revealed { shift } => {
                let delta = match direction {
                    PanDirection::Past => shift as f64,
                    PanDirection::Future => -(shift as f64),
                };
                let range = self.panes.range_of(PaneId::Price).map(|r| r.shifted(delta));
                self.render_window(range);
            }
            PanOutcome::NeedsOlder { before } => self.request_older(before),
            PanOutcome::AtBoundary => {}
        }
    }

    /// Crosshair moved over `source` to `time`, or left the pane
    pub fn on_crosshair_move(&mut self, source: PaneId, time: Option<i64>) {
        self.panes.pointer_at(source, time);
        self.refresh_overlay();
    }

    /// Hover the bar at `index` within the visible slice
    pub fn hover_index(&mut self, source: PaneId, index: Option<usize>) {
        let time = index
            .and_then(|i| self.store.visible_slice().get(i))
            .map(|r| r.time);
        self.on_crosshair_move(source, time);
    }

    /// Return to the newest records and fit them
    pub fn reset(&mut self) {
        self.store.reset();
        self.panes.clear_crosshair();
        self.render_window(None);
    }

    /// Tear down: destroy panes, release the subscription, ignore late results
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        info!("Unmounting chart");
        self.mounted = false;
        self.generation += 1;
        self.loading = false;
        self.older_in_flight = None;
        self.selection = None;
        self.store.clear();
        self.panes.destroy();
        if self.subscribed.take().is_some() {
            self.effects.push_back(ChartEffect::ReleaseSubscription);
        }
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        if !self.mounted || ticket.generation != self.generation {
            return false;
        }
        if self.selection.as_ref() != Some(&ticket.selection) {
            return false;
        }
        match ticket.kind {
            FetchKind::Initial => self.loading,
            FetchKind::Older => self.older_in_flight.as_ref() == Some(ticket),
        }
    }

    fn check_edges(&mut self, range: VisibleRange) {
        if let Some(direction) = self.store.edge_for(range.from, range.to) {
            self.pan_to_edge(direction);
        }
    }

    fn request_older(&mut self, before: i64) {
        if !self.settings.enable_history_paging || self.older_in_flight.is_some() {
            return;
        }
        let Some(selection) = self.selection.clone() else {
            return;
        };
        let Some(request) = ChartRequest::older_than(&selection, before) else {
            return;
        };

        info!(
            "Requesting older {} page for {} before {:?}",
            selection.timeframe, selection.symbol, request.body.base_dt
        );
        let ticket = FetchTicket {
            generation: self.generation,
            selection,
            kind: FetchKind::Older,
        };
        self.older_in_flight = Some(ticket.clone());
        self.effects.push_back(ChartEffect::Fetch { ticket, request });
    }

    fn render_window(&mut self, range: Option<VisibleRange>) {
        let slice = self.store.visible_slice();
        self.panes.set_series(slice);
        let target = range.or_else(|| VisibleRange::full(slice.len()));
        self.panes.set_value_range(self.store.value_range());
        if let Some(range) = target {
            self.panes.apply_range(range);
        }
        self.refresh_overlay();
    }

    fn refresh_overlay(&mut self) {
        let line = self.selection.as_ref().and_then(|selection| {
            let hovered = self.panes.hovered().and_then(|t| self.store.record_at(t));
            let (record, is_latest) = match hovered {
                Some(record) => (record, false),
                None => (self.store.latest()?, true),
            };
            let previous = self.store.previous_of(record.time);
            Some(OverlayLine::build(
                record,
                previous,
                selection.timeframe,
                &self.settings.currency_suffix,
                is_latest,
            ))
        });
        self.panes.set_overlay(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::surface::PaneBuffer;
    use crate::market_data::Timeframe;
    use chrono::NaiveDate;
    use serde_json::json;

    type Controller = ChartController<PaneBuffer<CandlePoint>, PaneBuffer<VolumeBar>>;

    fn controller() -> Controller {
        ChartController::new(ChartSettings::default(), PaneBuffer::new(), PaneBuffer::new())
    }

    fn daily_payload(days: u32, start: NaiveDate) -> Value {
        let items: Vec<Value> = (0..days)
            .map(|i| {
                let d = start + chrono::Duration::days(i64::from(i));
                json!({
                    "dt": d.format("%Y%m%d").to_string(),
                    "cur_prc": format!("{}", 1000 + i),
                    "open_pric": format!("{}", 1000 + i),
                    "trde_qty": "100",
                })
            })
            .collect();
        json!({ "stk_dt_pole_chart_qry": items })
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn fetch_ticket(effects: &[ChartEffect]) -> FetchTicket {
        effects
            .iter()
            .find_map(|e| match e {
                ChartEffect::Fetch { ticket, .. } => Some(ticket.clone()),
                _ => None,
            })
            .expect("fetch effect")
    }

    #[test]
    fn test_select_orders_effects() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let effects = chart.drain_effects();
        assert_eq!(effects.len(), 3);
        assert!(matches!(&effects[0], ChartEffect::SwitchSubscription { symbol } if symbol == "005930"));
        assert!(matches!(&effects[1], ChartEffect::AnnounceSubscription { .. }));
        assert!(matches!(&effects[2], ChartEffect::Fetch { .. }));

        // timeframe change keeps the subscription
        chart.select(Selection::new("005930", Timeframe::Weekly));
        let effects = chart.drain_effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], ChartEffect::Fetch { .. }));
    }

    #[test]
    fn test_initial_load_renders_tail() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let ticket = fetch_ticket(&chart.drain_effects());

        let outcome = chart.on_fetch_completed(ticket, Ok(daily_payload(100, start())));
        assert_eq!(outcome, FetchDisposition::Applied);
        assert!(!chart.is_loading());
        assert_eq!(chart.panes().price().data().len(), 60);
        assert_eq!(chart.panes().volume().data().len(), 60);
        assert_eq!(
            chart.panes().price().visible_range(),
            Some(VisibleRange::new(0.0, 59.0))
        );
        let overlay = chart.panes().price().overlay().unwrap();
        assert!(overlay.is_latest);
        assert_eq!(overlay.close, "1,099원");
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let stale = fetch_ticket(&chart.drain_effects());
        chart.select(Selection::new("000660", Timeframe::Daily));
        let current = fetch_ticket(&chart.drain_effects());

        assert_eq!(
            chart.on_fetch_completed(stale, Ok(daily_payload(10, start()))),
            FetchDisposition::Stale
        );
        assert!(chart.panes().price().data().is_empty());

        chart.on_fetch_completed(current, Ok(daily_payload(5, start())));
        assert_eq!(chart.panes().price().data().len(), 5);
    }

    #[test]
    fn test_fetch_error_shows_inline_error() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let ticket = fetch_ticket(&chart.drain_effects());
        chart.on_fetch_completed(ticket, Err(RestApiError::HttpStatusError(500, "boom".into())));

        assert!(chart.panes().price().error().is_some());
        assert!(chart.panes().volume().is_hidden());
        assert!(chart.panes().price().overlay().is_none());
    }

    #[test]
    fn test_empty_result_clears_panes() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let ticket = fetch_ticket(&chart.drain_effects());
        chart.on_fetch_completed(ticket, Ok(json!({ "stk_dt_pole_chart_qry": [] })));

        assert!(chart.panes().price().data().is_empty());
        assert!(chart.panes().price().overlay().is_none());
        assert!(chart.panes().price().error().is_none());
    }

    #[test]
    fn test_pan_to_past_edge_requests_older_page_once() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let ticket = fetch_ticket(&chart.drain_effects());
        chart.on_fetch_completed(ticket, Ok(daily_payload(40, start() + chrono::Duration::days(100))));

        chart.pan(PaneId::Price, VisibleRange::new(1.0, 30.0));
        let effects = chart.drain_effects();
        let older = fetch_ticket(&effects);
        assert_eq!(older.kind, FetchKind::Older);
        match &effects[0] {
            ChartEffect::Fetch { request, .. } => {
                assert_eq!(request.body.base_dt.as_deref(), Some("20240409"));
            }
            other => panic!("unexpected {:?}", other),
        }

        // a second edge pan while in flight issues nothing
        chart.pan(PaneId::Price, VisibleRange::new(0.5, 29.5));
        assert!(chart.drain_effects().is_empty());

        chart.on_fetch_completed(older, Ok(daily_payload(50, start())));
        assert_eq!(chart.store().len(), 90);
        assert_eq!(chart.panes().price().data().len(), 60);
        assert!(!chart.is_loading_older());
        // widened and revealed bars shift the range by the same amount
        assert_eq!(
            chart.panes().price().visible_range(),
            Some(VisibleRange::new(30.5, 59.5))
        );
    }

    #[test]
    fn test_live_tick_updates_tail_and_overlay() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let ticket = fetch_ticket(&chart.drain_effects());
        chart.on_fetch_completed(ticket, Ok(daily_payload(10, start())));

        let last_day = start() + chrono::Duration::days(9);
        let now = last_day.and_hms_opt(10, 15, 0).unwrap();
        assert!(chart.on_live_tick("005930", &json!({"price": "2,000"}), now));
        assert_eq!(chart.store().len(), 10);
        assert_eq!(chart.store().latest().unwrap().close, 2000.0);
        assert_eq!(chart.panes().price().overlay().unwrap().close, "2,000원");

        let next = (last_day + chrono::Duration::days(1)).and_hms_opt(9, 0, 0).unwrap();
        assert!(chart.on_live_tick("005930", &json!({"price": "2,010"}), next));
        assert_eq!(chart.store().len(), 11);
        assert_eq!(chart.panes().price().data().len(), 11);

        // other symbols and past buckets are ignored
        assert!(!chart.on_live_tick("000660", &json!({"price": "1"}), next));
        assert!(!chart.on_live_tick("005930", &json!({"price": "1"}), now));
    }

    #[test]
    fn test_hover_overlay_and_clear() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let ticket = fetch_ticket(&chart.drain_effects());
        chart.on_fetch_completed(ticket, Ok(daily_payload(10, start())));

        chart.hover_index(PaneId::Price, Some(2));
        let hovered = chart.panes().price().overlay().unwrap().clone();
        assert!(!hovered.is_latest);
        assert_eq!(hovered.label, "2024-01-03");
        assert_eq!(chart.panes().volume().crosshair(), Some(hovered.time));

        chart.hover_index(PaneId::Price, None);
        assert!(chart.panes().price().overlay().unwrap().is_latest);
        assert_eq!(chart.panes().volume().crosshair(), None);
    }

    #[test]
    fn test_unmount_releases_and_ignores_late_results() {
        let mut chart = controller();
        chart.select(Selection::new("005930", Timeframe::Daily));
        let ticket = fetch_ticket(&chart.drain_effects());

        chart.unmount();
        assert_eq!(chart.drain_effects(), vec![ChartEffect::ReleaseSubscription]);
        assert!(chart.panes().price().is_destroyed());
        assert_eq!(
            chart.on_fetch_completed(ticket, Ok(daily_payload(5, start()))),
            FetchDisposition::Stale
        );

        chart.select(Selection::new("005930", Timeframe::Daily));
        assert!(chart.drain_effects().is_empty());
    }
}
