//! Adaptive bucket width selection and period truncation.

use std::fmt;

use chrono::{DateTime, Datelike, Days, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TimeSpan;

/// Spans longer than this many whole days are bucketed by year.
const YEAR_THRESHOLD_DAYS: i64 = 365;
/// Spans longer than this many whole days are bucketed by month.
const MONTH_THRESHOLD_DAYS: i64 = 30;

/// The temporal width of a statistics bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Month,
    Year,
}

/// How a granularity truncates instants and labels periods.
struct Rule {
    name: &'static str,
    truncate: fn(DateTime<Utc>) -> DateTime<Utc>,
    label_format: &'static str,
}

/// Indexed by `Granularity as usize`.
static RULES: [Rule; 4] = [
    Rule {
        name: "hour",
        truncate: start_of_hour,
        label_format: "%Y-%m-%d %H:00",
    },
    Rule {
        name: "day",
        truncate: start_of_day,
        label_format: "%Y-%m-%d",
    },
    Rule {
        name: "month",
        truncate: start_of_month,
        label_format: "%Y-%m",
    },
    Rule {
        name: "year",
        truncate: start_of_year,
        label_format: "%Y",
    },
];

impl Granularity {
    pub const ALL: [Self; 4] = [Self::Hour, Self::Day, Self::Month, Self::Year];

    fn rule(self) -> &'static Rule {
        &RULES[self as usize]
    }

    /// Chooses the bucket width for a non-empty selection.
    ///
    /// Only a selection inside one UTC calendar date is hourly. A selection
    /// that crosses midnight is daily even when it spans less than a day.
    pub fn pick(span: TimeSpan) -> Self {
        if span.is_single_day() {
            return Self::Hour;
        }
        match span.whole_days() {
            days if days > YEAR_THRESHOLD_DAYS => Self::Year,
            days if days > MONTH_THRESHOLD_DAYS => Self::Month,
            _ => Self::Day,
        }
    }

    /// Maps `time` to the start of its containing period.
    pub fn truncate(self, time: DateTime<Utc>) -> DateTime<Utc> {
        (self.rule().truncate)(time)
    }

    /// Formats a period start for display.
    pub fn label(self, period: DateTime<Utc>) -> String {
        period.format(self.rule().label_format).to_string()
    }

    pub fn as_str(self) -> &'static str {
        self.rule().name
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn start_of_day(time: DateTime<Utc>) -> DateTime<Utc> {
    time.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn start_of_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(time) + TimeDelta::hours(i64::from(time.hour()))
}

fn start_of_month(time: DateTime<Utc>) -> DateTime<Utc> {
    let date = time.date_naive();
    (date - Days::new(u64::from(date.day0())))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

fn start_of_year(time: DateTime<Utc>) -> DateTime<Utc> {
    let date = time.date_naive();
    (date - Days::new(u64::from(date.ordinal0())))
        .and_time(NaiveTime::MIN)
        .and_utc()
}
