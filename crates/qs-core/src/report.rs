//! The externally consumed statistics result.

use serde::{Deserialize, Serialize};

use crate::aggregate::Bucket;
use crate::granularity::Granularity;

/// Bucketed statistics for one request.
///
/// The shape is the same whichever way a request ends up empty: no match,
/// malformed parameters, or an empty store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub has_results: bool,
    pub granularity: Option<Granularity>,
    pub buckets: Vec<Bucket>,
}

impl StatsReport {
    pub const fn empty() -> Self {
        Self {
            has_results: false,
            granularity: None,
            buckets: Vec::new(),
        }
    }

    /// Total events across all buckets.
    pub fn total_events(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }
}

/// Assembles a report from the picked granularity and its buckets.
pub fn build_report(granularity: Option<Granularity>, buckets: Vec<Bucket>) -> StatsReport {
    match granularity {
        Some(granularity) if !buckets.is_empty() => StatsReport {
            has_results: true,
            granularity: Some(granularity),
            buckets,
        },
        _ => StatsReport::empty(),
    }
}
