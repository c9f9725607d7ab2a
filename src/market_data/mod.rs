//! Market data processing: timeframes, normalization and windowed history

pub mod history_store;
pub mod normalizer;
pub mod ohlcv;
pub mod timeframe;

pub use history_store::{
    HistoryStore, PanDirection, PanOutcome, TickApplied, ValueRange, VisibleWindow, WindowConfig,
};
pub use normalizer::{LiveTick, extract_items, normalize, parse_date, parse_number};
pub use ohlcv::{ChartRequest, ChartRequestBody, OhlcvRecord, Selection, market_now, wall_clock_epoch};
pub use timeframe::{TIC_SCOPES, Timeframe};

use tracing::info;

use crate::feed::{ChartRestClient, RestApiError};

/// Fetch and normalize the latest page for a selection
pub async fn fetch_series(
    client: &ChartRestClient,
    selection: &Selection,
) -> Result<Vec<OhlcvRecord>, RestApiError> {
    let request = ChartRequest::latest(selection);
    let payload = client.fetch_chart(&request).await?;
    let records = normalize(selection.timeframe, extract_items(selection.timeframe, &payload));
    info!(
        "Fetched {} {} records for {}",
        records.len(),
        selection.timeframe,
        selection.symbol
    );
    Ok(records)
}
