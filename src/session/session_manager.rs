//! Session Manager for the chart session lifecycle
//!
//! Wires the feed task, the REST client and the chart controller together
//! and executes the effects the controller queues.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::chart::{
    CandlePoint, ChartController, ChartEffect, FetchDisposition, FetchKind, OverlayLine, PaneBuffer,
    PaneId, VisibleRange, VolumeBar,
};
use crate::config::Config;
use crate::feed::{ChartRestClient, FeedClient, FeedHandle, FeedMessage};
use crate::market_data::{Selection, market_now};
use crate::metrics::MetricsCollector;
use crate::ui::ViewState;
use crate::ui::cli as simple;
use crate::ui::tui::{ChartView, Tui, UiAction, handle_key_event};

use super::action_channel::{ActionChannel, SessionEvent};
use super::command_router::{CommandRouter, InteractiveCommand};

/// Fewest bars a zoom can narrow the view to
const MIN_VISIBLE_BARS: f64 = 5.0;
/// Period over which the tick rate is averaged
const RATE_WINDOW: Duration = Duration::from_secs(5);

type Controller = ChartController<PaneBuffer<CandlePoint>, PaneBuffer<VolumeBar>>;

/// Session state tracking
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// Session statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub commands_processed: u64,
    pub events_processed: u64,
    pub errors_encountered: u64,
}

/// How the session draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Tui,
    Simple,
}

/// Main session manager for the chart
pub struct SessionManager {
    app_config: Config,
    mode: OutputMode,
    state: SessionState,
    stats: SessionStats,
    controller: Controller,
    rest: Arc<ChartRestClient>,
    feed: Option<FeedHandle>,
    feed_rx: Option<mpsc::Receiver<FeedMessage>>,
    /// In-flight chart fetches
    fetches: JoinSet<SessionEvent>,
    metrics: MetricsCollector,
    view: ViewState,
    tui: Option<Tui>,
    input_task: Option<JoinHandle<()>>,
    last_printed: Option<OverlayLine>,
    frame_interval: Duration,
    action_channel: ActionChannel,
}

impl SessionManager {
    /// Create a new SessionManager showing `initial` first
    pub fn new(app_config: Config, mode: OutputMode, initial: Selection) -> Self {
        info!("Creating new SessionManager");

        let rest = Arc::new(ChartRestClient::new(
            app_config.backend.rest_url.clone(),
            Duration::from_secs(app_config.backend.timeout_seconds),
        ));

        let mut view = ViewState::new(
            app_config.symbols.clone(),
            initial.timeframe,
            initial.tic_scope,
        );
        view.enable_colors = app_config.ui.enable_colors;
        view.focus_symbol(&initial.symbol);

        let controller = ChartController::new(
            app_config.chart.settings(),
            PaneBuffer::new(),
            PaneBuffer::new(),
        );

        let fps = u64::from(app_config.ui.update_rate_fps.max(1));
        let frame_interval = match mode {
            OutputMode::Tui => Duration::from_millis(1000 / fps),
            OutputMode::Simple => Duration::from_millis(app_config.refresh_rate_ms.max(50)),
        };

        Self {
            app_config,
            mode,
            state: SessionState::Starting,
            stats: SessionStats::default(),
            controller,
            rest,
            feed: None,
            feed_rx: None,
            fetches: JoinSet::new(),
            metrics: MetricsCollector::default(),
            view,
            tui: None,
            input_task: None,
            last_printed: None,
            frame_interval,
            action_channel: ActionChannel::new(),
        }
    }

    /// Start the feed and the front end, then load the initial selection
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing chart session");

        let (feed, feed_rx) = FeedClient::spawn(
            self.app_config.backend.ws_url.clone(),
            Duration::from_millis(self.app_config.backend.reconnect_interval_ms),
        );
        self.feed = Some(feed);
        self.feed_rx = Some(feed_rx);

        match self.mode {
            OutputMode::Tui => self.tui = Some(Tui::new()?),
            OutputMode::Simple => {
                simple::display_help().map_err(|e| anyhow!(e))?;
                let reader = CommandRouter::new().spawn_stdin_reader(self.action_channel.event_tx());
                self.input_task = Some(reader);
            }
        }

        self.select_current();
        self.execute_effects();

        self.state = SessionState::Running;
        info!("Session initialized successfully");
        Ok(())
    }

    /// Run the main session loop
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting chart session loop");

        let mut feed_rx = self
            .feed_rx
            .take()
            .ok_or_else(|| anyhow!("Session was not initialized"))?;
        let mut frame = tokio::time::interval(self.frame_interval);

        while self.state == SessionState::Running {
            tokio::select! {
                message = feed_rx.recv() => match message {
                    Some(message) => self.handle_feed_message(message),
                    None => {
                        warn!("Feed channel closed");
                        self.shutdown().await?;
                    }
                },

                Some(event) = self.action_channel.next_event() => {
                    self.handle_event(event).await?;
                }

                Some(joined) = self.fetches.join_next(), if !self.fetches.is_empty() => {
                    match joined {
                        Ok(event) => self.handle_event(event).await?,
                        Err(e) if e.is_cancelled() => debug!("Fetch task cancelled"),
                        Err(e) => error!("Fetch task failed: {}", e),
                    }
                }

                _ = frame.tick() => {
                    self.on_frame().await?;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C");
                    self.shutdown().await?;
                }
            }

            if self.state == SessionState::Running {
                self.execute_effects();
            }
        }

        info!("Session loop terminated");
        Ok(())
    }

    fn select_current(&mut self) {
        let Some(selection) = self.view.selection() else {
            warn!("No symbol to show");
            return;
        };
        self.last_printed = None;
        self.controller.select(selection);
    }

    fn handle_feed_message(&mut self, message: FeedMessage) {
        self.stats.events_processed += 1;
        match message {
            FeedMessage::Status(status) => {
                info!("Push channel status: {}", status.as_str());
                self.metrics.record_status(status);
            }
            FeedMessage::Tick { symbol, payload } => {
                self.metrics.record_tick_received();
                let now = market_now(self.app_config.chart.market_utc_offset_minutes);
                if self.controller.on_live_tick(&symbol, &payload, now) {
                    self.metrics.record_tick_applied();
                }
            }
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        self.stats.events_processed += 1;
        match event {
            SessionEvent::FetchCompleted {
                ticket,
                result,
                elapsed,
            } => {
                self.metrics.record_fetch_latency(elapsed);
                let kind = ticket.kind;
                let failed = result.as_ref().err().map(|e| e.to_string());
                match self.controller.on_fetch_completed(ticket, result) {
                    FetchDisposition::Stale => self.metrics.record_stale_response(),
                    FetchDisposition::Applied => {
                        if kind == FetchKind::Older {
                            self.metrics.record_older_page();
                        }
                        // older page failures stay silent until the next edge pan retries
                        if let Some(message) = failed {
                            if kind == FetchKind::Initial && self.mode == OutputMode::Simple {
                                self.report_error(message);
                            }
                        }
                    }
                }
            }
            SessionEvent::UserCommand { command } => self.handle_command(command).await?,
            SessionEvent::Error { message } => self.report_error(message),
            SessionEvent::ShutdownRequested => self.shutdown().await?,
        }
        Ok(())
    }

    /// Handle user command
    async fn handle_command(&mut self, command: InteractiveCommand) -> Result<()> {
        debug!("Handling command: {:?}", command);
        self.stats.commands_processed += 1;

        match command {
            InteractiveCommand::Symbol { symbol } => {
                self.view.focus_symbol(&symbol);
                self.select_current();
            }
            InteractiveCommand::Timeframe {
                timeframe,
                tic_scope,
            } => {
                self.view.set_timeframe(timeframe, tic_scope);
                self.select_current();
            }
            InteractiveCommand::Pan { bars } => {
                if let Some(range) = self.controller.panes().range_of(PaneId::Price) {
                    self.controller.pan(PaneId::Price, range.shifted(bars));
                }
            }
            InteractiveCommand::Edge { direction } => self.controller.pan_to_edge(direction),
            InteractiveCommand::Zoom { factor } => self.handle_zoom(factor),
            InteractiveCommand::Hover { index } => {
                self.view.hover_index = index;
                self.controller.hover_index(PaneId::Price, index);
            }
            InteractiveCommand::HoverStep { delta } => {
                let len = self.controller.store().visible_slice().len();
                let index = self.view.step_hover(delta, len);
                self.controller.hover_index(PaneId::Price, index);
            }
            InteractiveCommand::Reset => {
                self.view.hover_index = None;
                self.controller.reset();
            }
            InteractiveCommand::Status => self.handle_status()?,
            InteractiveCommand::Help => match self.mode {
                OutputMode::Simple => simple::display_help().map_err(|e| anyhow!(e))?,
                OutputMode::Tui => self.view.push_notification("Type keys shown below"),
            },
            InteractiveCommand::Quit => self.shutdown().await?,
        }
        Ok(())
    }

    /// Narrow or widen the view, keeping the newest visible bar anchored
    fn handle_zoom(&mut self, factor: f64) {
        let Some(range) = self.controller.panes().range_of(PaneId::Price) else {
            return;
        };
        let max_span = self.app_config.chart.page_size.max(1) as f64;
        let span = (range.span() * factor).clamp(MIN_VISIBLE_BARS, max_span);
        self.controller
            .pan(PaneId::Price, VisibleRange::new(range.to - span, range.to));
    }

    fn handle_status(&mut self) -> Result<()> {
        let snapshot = self.metrics.snapshot();
        match self.mode {
            OutputMode::Simple => {
                simple::display_status(self.controller.selection(), &snapshot)
                    .map_err(|e| anyhow!(e))?;
            }
            OutputMode::Tui => self.view.push_notification(format!(
                "{} · {} ticks · {} stale · {} reconnects",
                snapshot.status.as_str(),
                snapshot.ticks_applied,
                snapshot.stale_responses,
                snapshot.reconnect_count
            )),
        }
        Ok(())
    }

    fn report_error(&mut self, message: String) {
        self.stats.errors_encountered += 1;
        warn!("{}", message);
        match self.mode {
            OutputMode::Simple => eprintln!("⚠️  {}", message),
            OutputMode::Tui => self.view.push_notification(message),
        }
    }

    /// Run the controller's queued effects
    fn execute_effects(&mut self) {
        for effect in self.controller.drain_effects() {
            match effect {
                ChartEffect::SwitchSubscription { symbol } => {
                    if let Some(feed) = &self.feed {
                        if let Err(e) = feed.subscribe(&symbol) {
                            error!("Failed to subscribe to {}: {}", symbol, e);
                        }
                    }
                }
                ChartEffect::AnnounceSubscription { symbol } => {
                    let rest = Arc::clone(&self.rest);
                    let tr_id = self.app_config.backend.realtime_tr_id.clone();
                    tokio::spawn(async move {
                        if let Err(e) = rest.announce_subscription(&symbol, &tr_id).await {
                            warn!("Subscription announcement for {} failed: {}", symbol, e);
                        }
                    });
                }
                ChartEffect::Fetch { ticket, request } => {
                    let rest = Arc::clone(&self.rest);
                    self.fetches.spawn(async move {
                        let started = Instant::now();
                        let result = rest.fetch_chart(&request).await;
                        SessionEvent::FetchCompleted {
                            ticket,
                            result,
                            elapsed: started.elapsed(),
                        }
                    });
                }
                ChartEffect::ReleaseSubscription => {
                    if let Some(feed) = &self.feed {
                        if let Err(e) = feed.unsubscribe() {
                            warn!("Failed to release subscription: {}", e);
                        }
                    }
                }
            }
        }
    }

    async fn on_frame(&mut self) -> Result<()> {
        self.view.connection = self.metrics.snapshot();

        match self.mode {
            OutputMode::Tui => {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        match handle_key_event(&mut self.view, key) {
                            UiAction::None => {}
                            UiAction::Command(command) => self.handle_command(command).await?,
                            UiAction::QuitRequested => {
                                // handled by the session loop on its next turn
                                self.action_channel.request_shutdown()?;
                                return Ok(());
                            }
                        }
                        self.execute_effects();
                    }
                }

                let panes = self.controller.panes();
                let chart = ChartView {
                    selection: self.controller.selection(),
                    price: panes.price(),
                    volume: panes.volume(),
                    loading: self.controller.is_loading(),
                    loading_older: self.controller.is_loading_older(),
                };
                if let Some(tui) = self.tui.as_mut() {
                    tui.draw(&self.view, &chart)?;
                }
            }
            OutputMode::Simple => {
                let line = self.controller.panes().price().overlay().cloned();
                if line != self.last_printed {
                    if let (Some(selection), Some(line)) = (self.controller.selection(), &line) {
                        simple::display_overlay(selection, line).map_err(|e| anyhow!(e))?;
                    }
                    self.last_printed = line;
                }
            }
        }

        if self.metrics.rate_window() >= RATE_WINDOW {
            self.metrics.reset_rate();
        }
        Ok(())
    }

    /// Graceful shutdown
    pub async fn shutdown(&mut self) -> Result<()> {
        if matches!(self.state, SessionState::ShuttingDown | SessionState::Terminated) {
            return Ok(());
        }
        info!("Initiating graceful shutdown");
        self.state = SessionState::ShuttingDown;

        self.controller.unmount();
        self.execute_effects();
        self.fetches.abort_all();

        if let Some(mut feed) = self.feed.take() {
            feed.shutdown().await;
        }
        if let Some(task) = self.input_task.take() {
            task.abort();
        }
        if let Some(mut tui) = self.tui.take() {
            tui.restore()?;
        }

        self.state = SessionState::Terminated;
        info!(
            "Shutdown completed ({} commands, {} events, {} errors)",
            self.stats.commands_processed, self.stats.events_processed, self.stats.errors_encountered
        );
        Ok(())
    }

}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if self.state != SessionState::Terminated {
            warn!("SessionManager dropped without proper shutdown");
        }
    }
}
