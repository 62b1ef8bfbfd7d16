//! Per-period statistics over a selection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::granularity::Granularity;

/// Statistics for one non-empty period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Start of the period, truncated to the report granularity.
    pub period: DateTime<Utc>,
    pub count: u64,
    /// Mean magnitude rounded to two decimals.
    pub avg_magnitude: f64,
    pub max_magnitude: f64,
}

/// Running count, sum and maximum for one period.
///
/// The sum is an exact decimal over each magnitude's shortest representation,
/// independent of the order magnitudes are added in.
#[derive(Debug, Clone)]
pub struct PeriodTotals {
    count: u64,
    sum: Option<Decimal>,
    float_sum: f64,
    max: f64,
}

impl PeriodTotals {
    pub fn new(magnitude: f64) -> Self {
        Self {
            count: 1,
            sum: exact(magnitude),
            float_sum: magnitude,
            max: magnitude,
        }
    }

    pub fn add(&mut self, magnitude: f64) {
        self.count += 1;
        self.sum = self
            .sum
            .zip(exact(magnitude))
            .and_then(|(sum, value)| sum.checked_add(value));
        self.float_sum += magnitude;
        self.max = self.max.max(magnitude);
    }

    /// Mean magnitude rounded half away from zero at two decimals.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        let rounded = self
            .sum
            .and_then(|sum| sum.checked_div(Decimal::from(self.count)))
            .map(|mean| mean.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|mean| mean.to_string().parse().ok());
        // Magnitudes beyond decimal range fall back to float arithmetic
        rounded.unwrap_or_else(|| (self.float_sum / self.count as f64 * 100.0).round() / 100.0)
    }

    pub fn into_bucket(self, period: DateTime<Utc>) -> Bucket {
        Bucket {
            period,
            count: self.count,
            avg_magnitude: self.mean(),
            max_magnitude: self.max,
        }
    }
}

fn exact(value: f64) -> Option<Decimal> {
    value.to_string().parse().ok()
}

/// Groups events by truncated period, in ascending period order.
pub fn aggregate<'a, I>(events: I, granularity: Granularity) -> Vec<Bucket>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut periods: BTreeMap<DateTime<Utc>, PeriodTotals> = BTreeMap::new();
    for event in events {
        let magnitude = event.magnitude();
        periods
            .entry(granularity.truncate(event.time()))
            .and_modify(|totals| totals.add(magnitude))
            .or_insert_with(|| PeriodTotals::new(magnitude));
    }

    periods
        .into_iter()
        .map(|(period, totals)| totals.into_bucket(period))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn quake(time: &str, magnitude: f64) -> Event {
        Event::new(at(time), 38.0, 22.0, 10.0, magnitude).unwrap()
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "single-event buckets carry the magnitude unchanged"
    )]
    fn separate_hours_make_separate_buckets() {
        let events = [
            quake("2025-01-01T01:00:00Z", 3.0),
            quake("2025-01-01T05:00:00Z", 5.0),
        ];
        let buckets = aggregate(&events, Granularity::Hour);
        assert_eq!(buckets.len(), 2);

        assert_eq!(buckets[0].period, at("2025-01-01T01:00:00Z"));
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[0].avg_magnitude, 3.0);
        assert_eq!(buckets[0].max_magnitude, 3.0);

        assert_eq!(buckets[1].period, at("2025-01-01T05:00:00Z"));
        assert_eq!(buckets[1].count, 1);
        assert_eq!(buckets[1].avg_magnitude, 5.0);
        assert_eq!(buckets[1].max_magnitude, 5.0);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded values are exact decimals")]
    fn average_is_rounded_and_max_is_not() {
        let events = [
            quake("2025-01-01T01:10:00Z", 3.111),
            quake("2025-01-01T01:50:00Z", 3.119),
        ];
        let buckets = aggregate(&events, Granularity::Hour);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].avg_magnitude, 3.12);
        assert_eq!(buckets[0].max_magnitude, 3.119);
    }

    #[test]
    fn buckets_come_out_in_period_order() {
        let events = [
            quake("2025-03-05T00:00:00Z", 2.0),
            quake("2025-01-20T00:00:00Z", 2.5),
            quake("2025-03-01T00:00:00Z", 4.0),
        ];
        let buckets = aggregate(&events, Granularity::Month);
        let periods: Vec<_> = buckets.iter().map(|b| b.period).collect();
        assert_eq!(
            periods,
            vec![at("2025-01-01T00:00:00Z"), at("2025-03-01T00:00:00Z")]
        );
        assert_eq!(buckets[1].count, 2);
    }

    #[test]
    fn no_events_no_buckets() {
        assert!(aggregate(&[], Granularity::Day).is_empty());
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded values are exact decimals")]
    fn midpoint_means_round_away_from_zero() {
        // 21.3 / 4 is 5.325, which float summation lands just below
        let events = [
            quake("2025-01-01T00:10:00Z", 5.5),
            quake("2025-01-01T00:20:00Z", 5.4),
            quake("2025-01-01T00:30:00Z", 3.8),
            quake("2025-01-01T00:40:00Z", 6.6),
        ];
        let buckets = aggregate(&events, Granularity::Hour);
        assert_eq!(buckets[0].avg_magnitude, 5.33);
        assert_eq!(buckets[0].max_magnitude, 6.6);

        let mut totals = PeriodTotals::new(-1.0);
        totals.add(-1.01);
        assert_eq!(totals.mean(), -1.01);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded values are exact decimals")]
    fn mean_does_not_depend_on_insertion_order() {
        let magnitudes = [6.6, 3.8, 5.4, 5.5];
        let mut forward = PeriodTotals::new(magnitudes[0]);
        magnitudes[1..].iter().for_each(|&m| forward.add(m));
        let mut backward = PeriodTotals::new(magnitudes[3]);
        magnitudes[..3].iter().rev().for_each(|&m| backward.add(m));
        assert_eq!(forward.mean(), backward.mean());
        assert_eq!(forward.mean(), 5.33);
    }

    #[test]
    fn huge_magnitudes_fall_back_to_float() {
        let mut totals = PeriodTotals::new(1e30);
        totals.add(1e30);
        assert!((totals.mean() / 1e30 - 1.0).abs() < 1e-9);
    }
}
