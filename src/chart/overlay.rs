//! Info overlay text shown above each pane

use crate::market_data::ohlcv::epoch_to_wall_clock;
use crate::market_data::{OhlcvRecord, Timeframe};

/// Direction of the change versus the previous bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSign {
    Up,
    Down,
}

/// Formatted overlay content for one record
///
/// Both panes receive the same line so their colors always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLine {
    pub time: i64,
    pub label: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub change: String,
    pub sign: ChangeSign,
    /// True when showing the latest record rather than a hovered one
    pub is_latest: bool,
}

impl OverlayLine {
    /// Build the overlay for `record`
    ///
    /// The change is measured against `previous`'s close, or against the
    /// record's own open when it is the first one.
    pub fn build(
        record: &OhlcvRecord,
        previous: Option<&OhlcvRecord>,
        timeframe: Timeframe,
        currency_suffix: &str,
        is_latest: bool,
    ) -> Self {
        let pct = round_percent(change_percent(record, previous));
        Self {
            time: record.time,
            label: format_time_label(record.time, timeframe),
            open: format_price(record.open, currency_suffix),
            high: format_price(record.high, currency_suffix),
            low: format_price(record.low, currency_suffix),
            close: format_price(record.close, currency_suffix),
            volume: format_volume(record.volume),
            change: format_change_percent(pct),
            sign: if pct >= 0.0 { ChangeSign::Up } else { ChangeSign::Down },
            is_latest,
        }
    }

    /// Text for the price pane
    pub fn price_text(&self) -> String {
        format!(
            "{}  O {}  H {}  L {}  C {}  {}",
            self.label, self.open, self.high, self.low, self.close, self.change
        )
    }

    /// Text for the volume pane
    pub fn volume_text(&self) -> String {
        format!("{}  Vol {}", self.label, self.volume)
    }
}

pub fn change_percent(record: &OhlcvRecord, previous: Option<&OhlcvRecord>) -> f64 {
    let base = previous.map(|p| p.close).unwrap_or(record.open);
    if base == 0.0 {
        return 0.0;
    }
    (record.close - base) / base * 100.0
}

/// Price with thousands separators and a currency suffix, e.g. `71,000원`
pub fn format_price(value: f64, suffix: &str) -> String {
    format!("{}{}", format_thousands(value), suffix)
}

/// Thousands-separated number; fractions kept to two decimals
pub fn format_thousands(value: f64) -> String {
    let negative = value < 0.0;
    let abs = value.abs();
    let rounded = (abs * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let frac = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative && (whole > 0 || frac > 0) { "-" } else { "" };
    if frac > 0 {
        format!("{}{}.{:02}", sign, grouped, frac)
    } else {
        format!("{}{}", sign, grouped)
    }
}

/// Compact volume such as `1.23M`
pub fn format_volume(value: f64) -> String {
    let (scaled, unit) = scale_number(value);
    if unit.is_empty() {
        format!("{:.0}", scaled)
    } else {
        format!("{:.2}{}", scaled, unit)
    }
}

/// Scale to the largest unit that still shows at least `1` after rounding
fn scale_number(v: f64) -> (f64, &'static str) {
    const UNITS: [(f64, &str); 3] = [(1_000_000_000.0, "B"), (1_000_000.0, "M"), (1_000.0, "K")];
    for (divisor, unit) in UNITS {
        let scaled = (v * 100.0 / divisor).round() / 100.0;
        if scaled.abs() >= 1.0 {
            return (scaled, unit);
        }
    }
    (v.round(), "")
}

/// Percentage rounded to the two decimals it is shown with
pub fn round_percent(pct: f64) -> f64 {
    let rounded = (pct * 100.0).round() / 100.0;
    // collapse -0.00 into 0
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Signed percentage with two decimals
pub fn format_change_percent(pct: f64) -> String {
    let rounded = round_percent(pct);
    if rounded >= 0.0 {
        format!("+{:.2}%", rounded)
    } else {
        format!("{:.2}%", rounded)
    }
}

/// Date label at the resolution of the timeframe
pub fn format_time_label(time: i64, timeframe: Timeframe) -> String {
    let Some(at) = epoch_to_wall_clock(time) else {
        return time.to_string();
    };
    let pattern = match timeframe {
        Timeframe::Minute => "%Y-%m-%d %H:%M",
        Timeframe::Daily | Timeframe::Weekly => "%Y-%m-%d",
        Timeframe::Monthly => "%Y-%m",
        Timeframe::Yearly => "%Y",
    };
    at.format(pattern).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::parse_date;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(71000.0), "71,000");
        assert_eq!(format_thousands(1234567.5), "1,234,567.50");
        assert_eq!(format_thousands(-1500.0), "-1,500");
        assert_eq!(format_price(71000.0, "원"), "71,000원");
    }

    #[test]
    fn test_format_volume_units() {
        assert_eq!(format_volume(950.0), "950");
        assert_eq!(format_volume(12_300.0), "12.30K");
        assert_eq!(format_volume(1_230_000.0), "1.23M");
        assert_eq!(format_volume(2_500_000_000.0), "2.50B");
    }

    #[test]
    fn test_format_volume_carries_into_next_unit() {
        assert_eq!(format_volume(999_999.0), "1.00M");
        assert_eq!(format_volume(999.6), "1.00K");
        assert_eq!(format_volume(994.0), "994");
        assert_eq!(format_volume(999_994_999_999.0), "999.99B");
        assert_eq!(format_volume(999_999_999.0), "1.00B");
    }

    #[test]
    fn test_tiny_negative_change_is_flat() {
        assert_eq!(format_change_percent(-0.004), "+0.00%");
        assert_eq!(format_change_percent(-0.006), "-0.01%");
        assert_eq!(format_change_percent(0.004), "+0.00%");

        let prev = OhlcvRecord::new(0, 100_000.0, 100_000.0, 100_000.0, 100_000.0, 0.0);
        let cur = OhlcvRecord::new(60, 100_000.0, 100_000.0, 99_996.0, 99_996.0, 0.0);
        let line = OverlayLine::build(&cur, Some(&prev), Timeframe::Daily, "원", false);
        assert_eq!(line.change, "+0.00%");
        assert_eq!(line.sign, ChangeSign::Up);
    }

    #[test]
    fn test_change_against_previous_close() {
        let prev = OhlcvRecord::new(0, 100.0, 100.0, 100.0, 100.0, 0.0);
        let cur = OhlcvRecord::new(60, 90.0, 105.0, 90.0, 102.0, 0.0);
        assert!((change_percent(&cur, Some(&prev)) - 2.0).abs() < 1e-9);
        // first record compares against its own open
        assert!((change_percent(&cur, None) - 13.333333).abs() < 1e-4);
    }

    #[test]
    fn test_overlay_sign_shared() {
        let prev = OhlcvRecord::new(0, 100.0, 100.0, 100.0, 100.0, 0.0);
        let down = OhlcvRecord::new(60, 99.0, 99.0, 98.0, 98.0, 1500.0);
        let line = OverlayLine::build(&down, Some(&prev), Timeframe::Daily, "원", false);
        assert_eq!(line.sign, ChangeSign::Down);
        assert_eq!(line.change, "-2.00%");
        assert!(line.volume_text().ends_with("Vol 1.50K"));

        let flat = OverlayLine::build(&prev, Some(&prev), Timeframe::Daily, "원", true);
        assert_eq!(flat.sign, ChangeSign::Up);
        assert_eq!(flat.change, "+0.00%");
    }

    #[test]
    fn test_time_labels() {
        let t = parse_date(Timeframe::Minute, "20240105093000").unwrap();
        assert_eq!(format_time_label(t, Timeframe::Minute), "2024-01-05 09:30");
        assert_eq!(format_time_label(t, Timeframe::Monthly), "2024-01");
        assert_eq!(format_time_label(t, Timeframe::Yearly), "2024");
    }
}
