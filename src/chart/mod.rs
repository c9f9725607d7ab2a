//! Dual-pane chart: render surfaces, pane synchronization, overlay and controller

pub mod controller;
pub mod overlay;
pub mod pane_sync;
pub mod surface;

pub use controller::{
    ChartController, ChartEffect, ChartSettings, FetchDisposition, FetchKind, FetchTicket,
};
pub use overlay::{ChangeSign, OverlayLine};
pub use pane_sync::DualPaneSync;
pub use surface::{CandlePoint, PaneBuffer, PaneId, RenderSurface, VisibleRange, VolumeBar};
