//! Simple CLI output implementation
//!
//! Line-oriented output for the `--simple` watch mode and the snapshot command.

use colored::{ColoredString, Colorize};

use super::{DOWN_RGB, UP_RGB};
use crate::AppResult;
use crate::chart::overlay::{OverlayLine, format_change_percent, format_price, format_volume};
use crate::chart::{ChangeSign, overlay};
use crate::market_data::{OhlcvRecord, Selection};
use crate::metrics::FeedMetrics;

fn paint(text: String, up: bool) -> ColoredString {
    let (r, g, b) = if up { UP_RGB } else { DOWN_RGB };
    text.truecolor(r, g, b)
}

/// Display the overlay line of the current selection
pub fn display_overlay(selection: &Selection, line: &OverlayLine) -> AppResult<()> {
    let marker = if line.is_latest { "▶" } else { "◆" };
    println!(
        "{} {} {} {}",
        marker,
        selection.symbol.bold(),
        selection.timeframe.label().dimmed(),
        paint(line.price_text(), line.sign == ChangeSign::Up)
    );
    println!("     {}", line.volume_text().dimmed());
    Ok(())
}

/// Display connection status in CLI format
pub fn display_status(selection: Option<&Selection>, metrics: &FeedMetrics) -> AppResult<()> {
    println!("🔍 stockchart status:");
    match selection {
        Some(selection) => println!(
            "   Selection: {} {} (tic_scope={})",
            selection.symbol, selection.timeframe, selection.tic_scope
        ),
        None => println!("   Selection: (none)"),
    }
    println!("   Connection: {}", metrics.status.as_str());
    println!(
        "   Ticks: {} received, {} applied ({:.1}/s)",
        metrics.ticks_received, metrics.ticks_applied, metrics.ticks_per_second
    );
    println!(
        "   Fetch latency P50/P95: {}ms / {}ms",
        metrics.fetch_latency_p50, metrics.fetch_latency_p95
    );
    println!("   Older pages: {}", metrics.older_pages);
    println!("   Stale responses dropped: {}", metrics.stale_responses);
    println!("   Reconnects: {}", metrics.reconnect_count);
    Ok(())
}

/// Display the last `records` of a series as a table
pub fn display_snapshot(
    selection: &Selection,
    records: &[OhlcvRecord],
    currency_suffix: &str,
) -> AppResult<()> {
    println!(
        "📊 {} {} ({} records)",
        selection.symbol.bold(),
        selection.timeframe,
        records.len()
    );
    if records.is_empty() {
        println!("   (no data)");
        return Ok(());
    }

    println!(
        "   {:<16} {:>14} {:>14} {:>14} {:>14} {:>10} {:>9}",
        "time", "open", "high", "low", "close", "volume", "change"
    );
    let mut previous: Option<&OhlcvRecord> = None;
    for record in records {
        let pct = overlay::round_percent(overlay::change_percent(record, previous));
        let row = format!(
            "{:<16} {:>14} {:>14} {:>14} {:>14} {:>10} {:>9}",
            overlay::format_time_label(record.time, selection.timeframe),
            format_price(record.open, currency_suffix),
            format_price(record.high, currency_suffix),
            format_price(record.low, currency_suffix),
            format_price(record.close, currency_suffix),
            format_volume(record.volume),
            format_change_percent(pct),
        );
        println!("   {}", paint(row, pct >= 0.0));
        previous = Some(record);
    }
    Ok(())
}

/// Display the interactive command list
pub fn display_help() -> AppResult<()> {
    println!("📋 Commands:");
    println!("   symbol <code>          switch symbol (e.g. symbol 005930)");
    println!("   tf <timeframe> [scope] switch timeframe: minute|daily|weekly|monthly|yearly");
    println!("   pan past|future|<n>    move the view by a page or by n bars");
    println!("   zoom in|out            narrow or widen the visible bars");
    println!("   hover <index>|off      show the bar at an index of the visible slice");
    println!("   reset                  jump back to the newest bars");
    println!("   status                 show feed statistics");
    println!("   help                   show this list");
    println!("   quit                   exit");
    Ok(())
}
