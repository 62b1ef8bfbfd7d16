//! The request pipeline: resolve, select, pick, aggregate, report.

use chrono::{DateTime, Utc};

use crate::filter::{FilterPolicy, RawParams, resolve};
use crate::granularity::Granularity;
use crate::report::{StatsReport, build_report};
use crate::select::select;
use crate::store::EventStore;

/// Computes statistics for `params` as of now.
pub fn compute_stats<S: EventStore>(
    store: &S,
    params: &RawParams,
    policy: &FilterPolicy,
) -> Result<StatsReport, S::Error> {
    compute_stats_at(store, params, policy, Utc::now())
}

/// Computes statistics for `params` with an explicit reference time.
///
/// Only store failures are errors. Malformed parameters and empty matches
/// both yield [`StatsReport::empty`].
pub fn compute_stats_at<S: EventStore>(
    store: &S,
    params: &RawParams,
    policy: &FilterPolicy,
    now: DateTime<Utc>,
) -> Result<StatsReport, S::Error> {
    let dataset = select(store, resolve(params, policy, now));

    // The span picks the granularity, so both reads must see the same rows
    dataset.read_consistent(|dataset| {
        let Some(span) = dataset.time_range()? else {
            tracing::debug!("selection is empty");
            return Ok(StatsReport::empty());
        };

        let granularity = Granularity::pick(span);
        tracing::debug!(
            first = %span.first,
            last = %span.last,
            %granularity,
            "picked granularity"
        );

        let buckets = dataset.buckets(granularity)?;
        Ok(build_report(Some(granularity), buckets))
    })
}
