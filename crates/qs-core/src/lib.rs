//! Core domain logic for seismic event statistics.
//!
//! This crate contains:
//! - Event records and their validation
//! - Filter resolution from raw request parameters
//! - Selection against any [`EventStore`]
//! - Adaptive granularity and per-period aggregation
//! - The [`StatsReport`] assembled from those pieces

mod aggregate;
mod event;
pub mod filter;
mod granularity;
mod report;
mod select;
mod stats;
mod store;
mod types;

pub use aggregate::{Bucket, PeriodTotals, aggregate};
pub use event::{Event, EventKey};
pub use filter::{
    AmbiguousDateRange, Bounds, DateBound, FilterError, FilterPolicy, FilterSpec, RawParams,
    TimeWindow, resolve,
};
pub use granularity::Granularity;
pub use report::{StatsReport, build_report};
pub use select::{Dataset, select};
pub use stats::{compute_stats, compute_stats_at};
pub use store::{EventStore, MemoryStore};
pub use types::{TimeSpan, ValidationError};
