use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Daily,
    Monthly,
}

impl PeriodType {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Monthly => "monthly",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "daily" => Some(PeriodType::Daily),
            "monthly" => Some(PeriodType::Monthly),
            _ => None,
        }
    }
}

/// Half-open UTC window `[00:00 of date, 00:00 of the next day)`.
/// Time-of-day truncation falls out of the interval: any two completions on
/// the same calendar date land in the same window.
pub fn day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight exists"));
    let next = date.succ_opt().unwrap_or(date);
    let end = Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).expect("midnight exists"));
    (start, end)
}

/// Half-open UTC window covering one calendar month. Equivalent to the closed
/// interval ending at `23:59:59.999` of the last day: the month's final
/// millisecond is inside, the next month's first instant is not.
pub fn month_window(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?);
    let end = Utc.from_utc_datetime(&next_first.and_hms_opt(0, 0, 0)?);
    Some((start, end))
}

/// Year and month of a timestamp, for deriving the monthly period of a
/// completion event.
pub fn year_month_of(ts: DateTime<Utc>) -> (i32, u32) {
    (ts.year(), ts.month())
}
