//! Filter resolution: raw request parameters to a validated [`FilterSpec`].
//!
//! # Policy
//!
//! - A parameter is present when its key exists and its trimmed value is
//!   non-empty. `"0"` is a real bound, not an absent one.
//! - No dates: the time window defaults to `[now - lookback, now)`.
//! - Both dates: `[min_date 00:00, max_date + 1 day 00:00)`, so the max date
//!   covers its whole day and equal dates select exactly one day.
//! - One date only: nothing is filtered. The returned spec carries an
//!   [`AmbiguousDateRange`] marker so callers can tell the user.
//! - Any malformed date or number fails the whole resolution. Callers
//!   treat that as an empty selection, never as a partial filter.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::event::Event;

/// Request parameter names understood by [`resolve`].
pub mod params {
    pub const MIN_DATE: &str = "min_date";
    pub const MAX_DATE: &str = "max_date";
    pub const MIN_LATITUDE: &str = "min_latitude";
    pub const MAX_LATITUDE: &str = "max_latitude";
    pub const MIN_LONGITUDE: &str = "min_longitude";
    pub const MAX_LONGITUDE: &str = "max_longitude";
    pub const MIN_DEPTH: &str = "min_depth";
    pub const MAX_DEPTH: &str = "max_depth";
    pub const MIN_MAGNITUDE: &str = "min_magnitude";
    pub const MAX_MAGNITUDE: &str = "max_magnitude";
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_LOOKBACK_HOURS: u32 = 24;

/// Raised when a date or numeric parameter cannot be parsed.
///
/// Both variants mean the same thing downstream: the selection is empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid {param} {value:?}: expected a date as YYYY-MM-DD")]
    InvalidDate {
        param: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid {param} {value:?}: expected a decimal number")]
    InvalidNumber { param: &'static str, value: String },
}

/// Raw request parameters, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams(BTreeMap<String, String>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the trimmed value if the parameter is present and non-empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Defaults applied when the request leaves the date range open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Length of the trailing window used when no dates are given.
    pub lookback: TimeDelta,
}

impl FilterPolicy {
    pub fn with_lookback_hours(hours: u32) -> Self {
        Self {
            lookback: TimeDelta::hours(i64::from(hours)),
        }
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::with_lookback_hours(DEFAULT_LOOKBACK_HOURS)
    }
}

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The window of length `lookback` ending at `now`.
    pub fn trailing(now: DateTime<Utc>, lookback: TimeDelta) -> Self {
        Self {
            start: now
                .checked_sub_signed(lookback)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: now,
        }
    }

    /// Whole calendar days from `first` through `last` inclusive.
    ///
    /// Equal dates yield exactly that one day. A reversed pair yields a
    /// window that contains nothing.
    pub fn calendar_days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: midnight(first),
            end: last
                .succ_opt()
                .map_or(DateTime::<Utc>::MAX_UTC, midnight),
        }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.end
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Closed numeric bounds; an absent side is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Which date bound was supplied when its partner was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBound {
    Min,
    Max,
}

impl DateBound {
    pub const fn param(self) -> &'static str {
        match self {
            Self::Min => params::MIN_DATE,
            Self::Max => params::MAX_DATE,
        }
    }

    pub const fn missing_param(self) -> &'static str {
        match self {
            Self::Min => params::MAX_DATE,
            Self::Max => params::MIN_DATE,
        }
    }
}

/// Only one side of the date range was supplied, so nothing was filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousDateRange {
    pub given: DateBound,
    pub value: String,
}

/// A validated selection over events.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FilterSpec {
    pub time: Option<TimeWindow>,
    pub latitude: Bounds,
    pub longitude: Bounds,
    pub depth: Bounds,
    pub magnitude: Bounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiguity: Option<AmbiguousDateRange>,
}

impl FilterSpec {
    /// A spec that selects every event.
    pub fn unfiltered() -> Self {
        Self::default()
    }

    fn ambiguous(given: DateBound, value: &str) -> Self {
        Self {
            ambiguity: Some(AmbiguousDateRange {
                given,
                value: value.to_string(),
            }),
            ..Self::default()
        }
    }

    /// Set when the request named only one side of the date range.
    pub const fn ambiguity(&self) -> Option<&AmbiguousDateRange> {
        self.ambiguity.as_ref()
    }

    /// Whether `event` satisfies every bound.
    pub fn matches(&self, event: &Event) -> bool {
        self.time.is_none_or(|window| window.contains(event.time()))
            && self.latitude.contains(event.latitude())
            && self.longitude.contains(event.longitude())
            && self.depth.contains(event.depth())
            && self.magnitude.contains(event.magnitude())
    }
}

/// Resolves raw parameters into a filter spec.
pub fn resolve(
    raw: &RawParams,
    policy: &FilterPolicy,
    now: DateTime<Utc>,
) -> Result<FilterSpec, FilterError> {
    let time = match (raw.get(params::MIN_DATE), raw.get(params::MAX_DATE)) {
        (None, None) => TimeWindow::trailing(now, policy.lookback),
        (Some(min), Some(max)) => {
            let min = parse_date(params::MIN_DATE, min)?;
            let max = parse_date(params::MAX_DATE, max)?;
            TimeWindow::calendar_days(min, max)
        }
        (Some(value), None) => return Ok(FilterSpec::ambiguous(DateBound::Min, value)),
        (None, Some(value)) => return Ok(FilterSpec::ambiguous(DateBound::Max, value)),
    };

    Ok(FilterSpec {
        time: Some(time),
        latitude: parse_bounds(raw, params::MIN_LATITUDE, params::MAX_LATITUDE)?,
        longitude: parse_bounds(raw, params::MIN_LONGITUDE, params::MAX_LONGITUDE)?,
        depth: parse_bounds(raw, params::MIN_DEPTH, params::MAX_DEPTH)?,
        magnitude: parse_bounds(raw, params::MIN_MAGNITUDE, params::MAX_MAGNITUDE)?,
        ambiguity: None,
    })
}

fn parse_date(param: &'static str, value: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| FilterError::InvalidDate {
        param,
        value: value.to_string(),
        source,
    })
}

fn parse_bounds(
    raw: &RawParams,
    min_param: &'static str,
    max_param: &'static str,
) -> Result<Bounds, FilterError> {
    Ok(Bounds {
        min: parse_number(raw, min_param)?,
        max: parse_number(raw, max_param)?,
    })
}

fn parse_number(raw: &RawParams, param: &'static str) -> Result<Option<f64>, FilterError> {
    let Some(value) = raw.get(param) else {
        return Ok(None);
    };
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(Some(number)),
        _ => Err(FilterError::InvalidNumber {
            param,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn now() -> DateTime<Utc> {
        at("2025-06-15T12:30:00Z")
    }

    fn resolve_pairs(pairs: &[(&str, &str)]) -> Result<FilterSpec, FilterError> {
        let raw: RawParams = pairs.iter().copied().collect();
        resolve(&raw, &FilterPolicy::default(), now())
    }

    fn without_ambiguity(spec: &FilterSpec) -> FilterSpec {
        FilterSpec {
            ambiguity: None,
            ..spec.clone()
        }
    }

    #[test]
    fn empty_params_default_to_last_24_hours() {
        let spec = resolve_pairs(&[]).unwrap();
        assert_eq!(
            spec.time,
            Some(TimeWindow {
                start: at("2025-06-14T12:30:00Z"),
                end: now(),
            })
        );
        assert_eq!(spec.latitude, Bounds::default());
        assert_eq!(spec.magnitude, Bounds::default());
        assert!(spec.ambiguity().is_none());
    }

    #[test]
    fn lookback_is_configurable() {
        let raw = RawParams::new();
        let spec = resolve(&raw, &FilterPolicy::with_lookback_hours(6), now()).unwrap();
        assert_eq!(spec.time.unwrap().start, at("2025-06-15T06:30:00Z"));
    }

    #[test]
    fn blank_values_count_as_absent() {
        let spec = resolve_pairs(&[("min_date", ""), ("max_date", "  "), ("min_depth", "")]).unwrap();
        assert_eq!(spec.time.unwrap().end, now());
        assert_eq!(spec.depth, Bounds::default());
    }

    #[test]
    fn same_day_selects_that_day() {
        let spec = resolve_pairs(&[("min_date", "2025-01-01"), ("max_date", "2025-01-01")]).unwrap();
        assert_eq!(
            spec.time,
            Some(TimeWindow {
                start: at("2025-01-01T00:00:00Z"),
                end: at("2025-01-02T00:00:00Z"),
            })
        );
    }

    #[test]
    fn max_date_includes_its_whole_day() {
        let spec = resolve_pairs(&[("min_date", "2025-01-01"), ("max_date", "2025-01-31")]).unwrap();
        let window = spec.time.unwrap();
        assert_eq!(window.start, at("2025-01-01T00:00:00Z"));
        assert_eq!(window.end, at("2025-02-01T00:00:00Z"));
        assert!(window.contains(at("2025-01-31T23:59:59.999Z")));
        assert!(!window.contains(at("2025-02-01T00:00:00Z")));
    }

    #[test]
    fn single_date_passes_through_unfiltered() {
        let spec = resolve_pairs(&[("min_date", "2025-01-01"), ("min_latitude", "38")]).unwrap();
        assert_eq!(without_ambiguity(&spec), FilterSpec::unfiltered());
        assert_eq!(
            spec.ambiguity(),
            Some(&AmbiguousDateRange {
                given: DateBound::Min,
                value: "2025-01-01".to_string(),
            })
        );

        let spec = resolve_pairs(&[("max_date", "not-a-date")]).unwrap();
        assert_eq!(without_ambiguity(&spec), FilterSpec::unfiltered());
        assert_eq!(spec.ambiguity().unwrap().given, DateBound::Max);
        assert_eq!(DateBound::Max.missing_param(), "min_date");
    }

    #[test]
    fn malformed_date_fails() {
        let err = resolve_pairs(&[("min_date", "2025-13-01"), ("max_date", "2025-12-01")]).unwrap_err();
        assert!(matches!(err, FilterError::InvalidDate { param: "min_date", .. }));

        let err = resolve_pairs(&[("min_date", "2025-01-01"), ("max_date", "01/02/2025")]).unwrap_err();
        assert!(matches!(err, FilterError::InvalidDate { param: "max_date", .. }));
    }

    #[test]
    fn malformed_number_fails_whole_filter() {
        let err = resolve_pairs(&[("min_latitude", "abc"), ("max_magnitude", "5")]).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidNumber {
                param: "min_latitude",
                value: "abc".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            r#"invalid min_latitude "abc": expected a decimal number"#
        );
    }

    #[test]
    fn non_finite_numbers_are_malformed() {
        assert!(resolve_pairs(&[("max_depth", "NaN")]).is_err());
        assert!(resolve_pairs(&[("min_magnitude", "inf")]).is_err());
    }

    #[test]
    fn zero_is_a_real_bound() {
        let spec = resolve_pairs(&[("min_depth", "0"), ("max_longitude", "0.0")]).unwrap();
        assert_eq!(spec.depth.min, Some(0.0));
        assert_eq!(spec.longitude.max, Some(0.0));
    }

    #[test]
    fn numeric_bounds_are_closed() {
        let spec = resolve_pairs(&[("min_magnitude", "3.5"), ("max_magnitude", "4.5")]).unwrap();
        assert!(spec.magnitude.contains(3.5));
        assert!(spec.magnitude.contains(4.5));
        assert!(!spec.magnitude.contains(4.51));
    }

    #[test]
    fn matches_requires_every_axis() {
        let spec = resolve_pairs(&[
            ("min_date", "2025-01-01"),
            ("max_date", "2025-01-01"),
            ("min_latitude", "38"),
            ("max_depth", "10"),
        ])
        .unwrap();
        let inside = Event::new(at("2025-01-01T05:00:00Z"), 38.5, 21.0, 10.0, 3.0).unwrap();
        let too_deep = Event::new(at("2025-01-01T05:00:00Z"), 38.5, 21.0, 10.1, 3.0).unwrap();
        let wrong_day = Event::new(at("2025-01-02T00:00:00Z"), 38.5, 21.0, 5.0, 3.0).unwrap();
        assert!(spec.matches(&inside));
        assert!(!spec.matches(&too_deep));
        assert!(!spec.matches(&wrong_day));
    }

    proptest! {
        #[test]
        fn ordered_dates_cover_first_through_last_day(start in 0i64..40_000, len in 0i64..2_000) {
            let base = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
            let first = base + TimeDelta::days(start);
            let last = first + TimeDelta::days(len);
            let raw: RawParams = [
                ("min_date", first.format("%Y-%m-%d").to_string()),
                ("max_date", last.format("%Y-%m-%d").to_string()),
            ]
            .into_iter()
            .collect();
            let spec = resolve(&raw, &FilterPolicy::default(), now()).unwrap();
            let window = spec.time.unwrap();
            prop_assert_eq!(window.start, midnight(first));
            prop_assert_eq!(window.end, midnight(last) + TimeDelta::days(1));
            prop_assert!(spec.ambiguity().is_none());
        }

        #[test]
        fn any_single_date_is_a_pass_through(value in "\\PC{0,12}", use_min in any::<bool>()) {
            prop_assume!(!value.trim().is_empty());
            let key = if use_min { "min_date" } else { "max_date" };
            let raw: RawParams = [(key, value)].into_iter().collect();
            let spec = resolve(&raw, &FilterPolicy::default(), now()).unwrap();
            prop_assert_eq!(without_ambiguity(&spec), FilterSpec::unfiltered());
            prop_assert!(spec.ambiguity().is_some());
        }

        #[test]
        fn alphabetic_bounds_always_fail(value in "[a-zA-Z]{1,8}") {
            let raw: RawParams = [("max_latitude", value)].into_iter().collect();
            prop_assert!(resolve(&raw, &FilterPolicy::default(), now()).is_err());
        }
    }
}
