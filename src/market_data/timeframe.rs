//! Chart timeframes and the upstream schema attached to each of them

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Minute bucket sizes accepted by the minute chart endpoint
pub const TIC_SCOPES: [u32; 8] = [1, 3, 5, 10, 15, 30, 45, 60];

/// Aggregation granularity of a chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Minute,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Timeframe {
    /// All timeframes in selector order
    pub const ALL: [Timeframe; 5] = [
        Timeframe::Minute,
        Timeframe::Daily,
        Timeframe::Weekly,
        Timeframe::Monthly,
        Timeframe::Yearly,
    ];

    /// Upstream request identifier passed as `apiId`
    pub fn api_id(self) -> &'static str {
        match self {
            Timeframe::Minute => "KA10080",
            Timeframe::Daily => "KA10081",
            Timeframe::Weekly => "KA10082",
            Timeframe::Monthly => "KA10083",
            Timeframe::Yearly => "KA10094",
        }
    }

    /// Response keys holding the quote array, in lookup order
    pub fn data_fields(self) -> &'static [&'static str] {
        match self {
            Timeframe::Minute => &["stk_min_pole_chart_qry", "stk_stk_pole_chart_qry"],
            Timeframe::Daily => &["stk_dt_pole_chart_qry"],
            Timeframe::Weekly => &["stk_stk_pole_chart_qry", "stk_wk_pole_chart_qry"],
            Timeframe::Monthly => &["stk_mth_pole_chart_qry"],
            Timeframe::Yearly => &["stk_yr_pole_chart_qry"],
        }
    }

    /// Item keys holding the bucket date, in lookup order
    pub fn date_keys(self) -> &'static [&'static str] {
        match self {
            Timeframe::Minute => &["cntr_tm"],
            _ => &["dt", "trd_dt"],
        }
    }

    /// Whether a date string of `len` digits is valid for this timeframe
    pub fn accepts_date_len(self, len: usize) -> bool {
        match len {
            8 => true,
            14 => self == Timeframe::Minute,
            4 => self == Timeframe::Yearly,
            _ => false,
        }
    }

    /// Older pages can be requested with a `base_dt` anchor
    pub fn supports_paging(self) -> bool {
        self != Timeframe::Minute
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Minute => "minute",
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
            Timeframe::Yearly => "yearly",
        }
    }

    /// Short label used by the timeframe selector
    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Minute => "1분",
            Timeframe::Daily => "일",
            Timeframe::Weekly => "주",
            Timeframe::Monthly => "월",
            Timeframe::Yearly => "년",
        }
    }

    /// Start of the bucket containing `at` (market wall-clock time)
    pub fn bucket_start(self, at: NaiveDateTime, tic_scope: u32) -> NaiveDateTime {
        let date = at.date();
        let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);

        match self {
            Timeframe::Minute => {
                let scope = tic_scope.max(1);
                let minute_of_day = at.hour() * 60 + at.minute();
                let floored = minute_of_day - minute_of_day % scope;
                midnight(date) + Duration::minutes(i64::from(floored))
            }
            Timeframe::Daily => midnight(date),
            Timeframe::Weekly => {
                let back = i64::from(date.weekday().num_days_from_monday());
                midnight(date - Duration::days(back))
            }
            Timeframe::Monthly => midnight(date.with_day(1).unwrap_or(date)),
            Timeframe::Yearly => midnight(
                NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
            ),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "min" | "1m" | "m" | "1분" | "분" => Ok(Timeframe::Minute),
            "daily" | "day" | "d" | "일" => Ok(Timeframe::Daily),
            "weekly" | "week" | "w" | "주" => Ok(Timeframe::Weekly),
            "monthly" | "month" | "mo" | "월" => Ok(Timeframe::Monthly),
            "yearly" | "year" | "y" | "년" => Ok(Timeframe::Yearly),
            other => Err(format!("Unknown timeframe: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_api_ids_are_distinct() {
        let ids: std::collections::HashSet<_> =
            Timeframe::ALL.iter().map(|tf| tf.api_id()).collect();
        assert_eq!(ids.len(), Timeframe::ALL.len());
        assert_eq!(Timeframe::Daily.api_id(), "KA10081");
    }

    #[test]
    fn test_date_length_rules() {
        assert!(Timeframe::Daily.accepts_date_len(8));
        assert!(!Timeframe::Daily.accepts_date_len(14));
        assert!(Timeframe::Minute.accepts_date_len(14));
        assert!(Timeframe::Yearly.accepts_date_len(4));
        assert!(!Timeframe::Monthly.accepts_date_len(4));
        assert!(!Timeframe::Weekly.accepts_date_len(6));
    }

    #[test]
    fn test_parse_timeframe_aliases() {
        assert_eq!("daily".parse::<Timeframe>().unwrap(), Timeframe::Daily);
        assert_eq!("W".parse::<Timeframe>().unwrap(), Timeframe::Weekly);
        assert_eq!("년".parse::<Timeframe>().unwrap(), Timeframe::Yearly);
        assert!("fortnight".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_bucket_start_per_timeframe() {
        // 2024-01-10 is a Wednesday
        let t = at("2024-01-10 09:37:12");
        assert_eq!(Timeframe::Minute.bucket_start(t, 1), at("2024-01-10 09:37:00"));
        assert_eq!(Timeframe::Minute.bucket_start(t, 5), at("2024-01-10 09:35:00"));
        assert_eq!(Timeframe::Minute.bucket_start(t, 60), at("2024-01-10 09:00:00"));
        assert_eq!(Timeframe::Daily.bucket_start(t, 1), at("2024-01-10 00:00:00"));
        assert_eq!(Timeframe::Weekly.bucket_start(t, 1), at("2024-01-08 00:00:00"));
        assert_eq!(Timeframe::Monthly.bucket_start(t, 1), at("2024-01-01 00:00:00"));
        assert_eq!(Timeframe::Yearly.bucket_start(t, 1), at("2024-01-01 00:00:00"));
    }
}
