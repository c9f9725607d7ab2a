//! Conversion of raw upstream payloads into clean OHLCV series
//!
//! Upstream quotes arrive as loosely typed JSON: numbers may be strings
//! with thousands separators and a leading direction sign, and field names
//! differ between endpoints. Everything in here is pure.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::debug;

use super::ohlcv::{OhlcvRecord, wall_clock_epoch};
use super::timeframe::Timeframe;

const CLOSE_KEYS: &[&str] = &["cur_prc", "clos_prc"];
const OPEN_KEYS: &[&str] = &["open_pric", "open_prc"];
const HIGH_KEYS: &[&str] = &["high_pric", "high_prc"];
const LOW_KEYS: &[&str] = &["low_pric", "low_prc"];
const VOLUME_KEYS: &[&str] = &["trde_qty", "trd_qty"];

/// Locate the quote array of a chart response
///
/// Returns an empty slice when no known key holds an array.
pub fn extract_items(timeframe: Timeframe, payload: &Value) -> &[Value] {
    timeframe
        .data_fields()
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Normalize raw quote items into an ascending, de-duplicated series
///
/// Items without a valid date or close price are dropped. When two items
/// share a bucket time the later one in input order wins.
pub fn normalize(timeframe: Timeframe, items: &[Value]) -> Vec<OhlcvRecord> {
    let mut by_time = BTreeMap::new();
    let mut dropped = 0usize;

    for item in items {
        match normalize_item(timeframe, item) {
            Some(record) => {
                by_time.insert(record.time, record);
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("Dropped {} malformed {} chart items", dropped, timeframe);
    }

    by_time.into_values().collect()
}

fn normalize_item(timeframe: Timeframe, item: &Value) -> Option<OhlcvRecord> {
    let date = first_text(item, timeframe.date_keys())?;
    let time = parse_date(timeframe, &date)?;
    let close = first_number(item, CLOSE_KEYS)?;

    let open = first_number(item, OPEN_KEYS).unwrap_or(close);
    let high = first_number(item, HIGH_KEYS).unwrap_or(close);
    let low = first_number(item, LOW_KEYS).unwrap_or(close);
    let volume = first_number(item, VOLUME_KEYS).unwrap_or(0.0);

    Some(OhlcvRecord::new(time, open, high, low, close, volume))
}

/// Parse an upstream date string into bucket epoch seconds
///
/// Accepts `YYYY` (yearly only), `YYYYMMDD` (all timeframes) and
/// `YYYYMMDDHHmmss` (minute only; seconds are ignored).
pub fn parse_date(timeframe: Timeframe, raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !timeframe.accepts_date_len(raw.len()) {
        return None;
    }

    let field = |range: std::ops::Range<usize>| raw[range].parse::<u32>().ok();
    let year = raw[0..4].parse::<i32>().ok()?;

    let at: NaiveDateTime = match raw.len() {
        4 => NaiveDate::from_ymd_opt(year, 1, 1)?.and_time(NaiveTime::MIN),
        8 => NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)?.and_time(NaiveTime::MIN),
        14 => {
            let date = NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)?;
            // validated but not kept
            NaiveTime::from_hms_opt(field(8..10)?, field(10..12)?, field(12..14)?)?;
            date.and_hms_opt(field(8..10)?, field(10..12)?, 0)?
        }
        _ => return None,
    };

    Some(wall_clock_epoch(at))
}

/// Parse a loosely typed upstream number
///
/// Strings may carry thousands separators and a leading `+`/`-` direction
/// marker; the marker is dropped so prices and volumes come back unsigned.
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            let unsigned = cleaned.trim_start_matches(['+', '-']);
            if unsigned.is_empty() {
                return None;
            }
            unsigned.parse::<f64>().ok()?
        }
        _ => return None,
    };

    parsed.is_finite().then(|| parsed.abs())
}

fn first_number(item: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| item.get(*key).and_then(parse_number))
}

fn first_text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A single live price update, independent of its wire shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveTick {
    pub price: f64,
    pub volume: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl LiveTick {
    /// Extract a tick from any of the known push payload shapes
    ///
    /// * flat: `{ "price": .., "volume": .. }` or `{ "cur_prc": .., "trde_qty": .. }`
    /// * relay: `{ "output": { "현재가": .., "거래량": .., "시가": .., "고가": .., "저가": .. } }`
    /// * raw realtime: `{ "values": { "20": .., "13": .., "16": .., "17": .., "18": .. } }`
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if let Some(output) = payload.get("output") {
            if let Some(tick) = Self::from_fields(output, &["현재가"], &["거래량"], &["시가"], &["고가"], &["저가"]) {
                return Some(tick);
            }
        }
        if let Some(values) = payload.get("values") {
            if let Some(tick) = Self::from_fields(values, &["20"], &["13"], &["16"], &["17"], &["18"]) {
                return Some(tick);
            }
        }
        Self::from_fields(
            payload,
            &["price", "cur_prc", "currentPrice"],
            &["volume", "trde_qty", "acc_trde_qty"],
            &["open", "open_pric"],
            &["high", "high_pric"],
            &["low", "low_pric"],
        )
    }

    fn from_fields(
        source: &Value,
        price: &[&str],
        volume: &[&str],
        open: &[&str],
        high: &[&str],
        low: &[&str],
    ) -> Option<Self> {
        Some(Self {
            price: first_number(source, price)?,
            volume: first_number(source, volume),
            open: first_number(source, open),
            high: first_number(source, high),
            low: first_number(source, low),
        })
    }

    /// Fold the tick into the bucket starting at `bucket_time`
    ///
    /// `existing` is the stored record for the same bucket, if any. Fields
    /// the tick lacks are taken from it, with high/low widened to the new
    /// price. Applying the same tick twice yields the same record.
    pub fn into_record(self, bucket_time: i64, existing: Option<&OhlcvRecord>) -> OhlcvRecord {
        let existing = existing.filter(|r| r.time == bucket_time);
        let open = self
            .open
            .or(existing.map(|r| r.open))
            .unwrap_or(self.price);
        let high = self
            .high
            .or(existing.map(|r| r.high.max(self.price)))
            .unwrap_or(self.price);
        let low = self
            .low
            .or(existing.map(|r| r.low.min(self.price)))
            .unwrap_or(self.price);
        let volume = self
            .volume
            .or(existing.map(|r| r.volume))
            .unwrap_or(0.0);

        OhlcvRecord::new(bucket_time, open, high.max(self.price), low.min(self.price), self.price, volume)
    }
}
