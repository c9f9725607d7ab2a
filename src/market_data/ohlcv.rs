//! OHLCV records, chart selections and chart requests

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timeframe::Timeframe;

/// One aggregated bucket of a chart series
///
/// `time` is the bucket start in epoch seconds, taken from the market
/// wall-clock time read as if it were UTC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRecord {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvRecord {
    /// Create a new record, repairing the price envelope
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
        .repaired()
    }

    /// Widen high/low to cover open and close, and floor volume at zero
    pub fn repaired(mut self) -> Self {
        self.high = self.high.max(self.open).max(self.close);
        self.low = self.low.min(self.open).min(self.close);
        if !self.volume.is_finite() || self.volume < 0.0 {
            self.volume = 0.0;
        }
        self
    }

    /// Up bars close at or above their open
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Epoch seconds of a wall-clock time interpreted as UTC
pub fn wall_clock_epoch(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp()
}

/// Inverse of [`wall_clock_epoch`]
pub fn epoch_to_wall_clock(time: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(time, 0).map(|dt| dt.naive_utc())
}

/// Current wall-clock time at the exchange
pub fn market_now(utc_offset_minutes: i32) -> NaiveDateTime {
    match FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
        None => Utc::now().naive_utc(),
    }
}

/// The symbol/timeframe pair the chart is showing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub tic_scope: u32,
}

impl Selection {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            tic_scope: 1,
        }
    }

    pub fn with_tic_scope(mut self, tic_scope: u32) -> Self {
        self.tic_scope = tic_scope;
        self
    }

    /// Push topic carrying ticks for this symbol
    pub fn topic(&self) -> String {
        format!("stock/{}", self.symbol)
    }
}

/// JSON body of a chart request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRequestBody {
    pub stk_cd: String,
    pub upd_stkpc_tp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tic_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dt: Option<String>,
}

/// A chart fetch: which endpoint to call and what to send it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub body: ChartRequestBody,
}

impl ChartRequest {
    /// Request for the latest page of a selection
    pub fn latest(selection: &Selection) -> Self {
        let tic_scope = match selection.timeframe {
            Timeframe::Minute => Some(selection.tic_scope.to_string()),
            _ => None,
        };

        Self {
            symbol: selection.symbol.clone(),
            timeframe: selection.timeframe,
            body: ChartRequestBody {
                stk_cd: selection.symbol.clone(),
                upd_stkpc_tp: "1".to_string(),
                tic_scope,
                base_dt: None,
            },
        }
    }

    /// Request for the page ending the day before `oldest_time`
    ///
    /// Minute charts have no date anchor and return `None`.
    pub fn older_than(selection: &Selection, oldest_time: i64) -> Option<Self> {
        if !selection.timeframe.supports_paging() {
            return None;
        }
        let anchor = epoch_to_wall_clock(oldest_time)? - Duration::days(1);
        let mut request = Self::latest(selection);
        request.body.base_dt = Some(anchor.format("%Y%m%d").to_string());
        Some(request)
    }

    pub fn api_id(&self) -> &'static str {
        self.timeframe.api_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_record_repairs_envelope() {
        let record = OhlcvRecord::new(0, 100.0, 90.0, 95.0, 80.0, -5.0);
        assert_eq!(record.high, 100.0);
        assert_eq!(record.low, 80.0);
        assert_eq!(record.volume, 0.0);
        assert!(!record.is_up());
    }

    #[test]
    fn test_wall_clock_round_trip() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let time = wall_clock_epoch(at);
        assert_eq!(epoch_to_wall_clock(time), Some(at));
    }

    #[test]
    fn test_latest_request_body() {
        let daily = ChartRequest::latest(&Selection::new("005930", Timeframe::Daily));
        let body = serde_json::to_value(&daily.body).unwrap();
        assert_eq!(body, serde_json::json!({"stk_cd": "005930", "upd_stkpc_tp": "1"}));

        let minute = Selection::new("005930", Timeframe::Minute).with_tic_scope(5);
        let body = serde_json::to_value(&ChartRequest::latest(&minute).body).unwrap();
        assert_eq!(body["tic_scope"], "5");
    }

    #[test]
    fn test_older_request_anchors_previous_day() {
        let selection = Selection::new("005930", Timeframe::Daily);
        let oldest = wall_clock_epoch(
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let request = ChartRequest::older_than(&selection, oldest).unwrap();
        assert_eq!(request.body.base_dt.as_deref(), Some("20240229"));
        assert_eq!(request.api_id(), "KA10081");

        let minute = Selection::new("005930", Timeframe::Minute);
        assert!(ChartRequest::older_than(&minute, oldest).is_none());
    }

    #[test]
    fn test_selection_topic() {
        assert_eq!(Selection::new("000660", Timeframe::Daily).topic(), "stock/000660");
    }
}
