//! Applies a resolved filter to a store.

use crate::aggregate::Bucket;
use crate::filter::{FilterError, FilterSpec};
use crate::granularity::Granularity;
use crate::store::EventStore;
use crate::types::TimeSpan;

/// A filtered view of a store.
///
/// Queries are deferred to the store, so a dataset costs nothing until read.
#[derive(Debug)]
pub enum Dataset<'s, S> {
    /// Nothing can match: the parameters failed validation.
    Empty,
    /// Events in `store` matching `spec`.
    Selection { store: &'s S, spec: FilterSpec },
}

/// Selects events from `store`, failing closed on a rejected resolution.
pub fn select<S: EventStore>(
    store: &S,
    resolution: Result<FilterSpec, FilterError>,
) -> Dataset<'_, S> {
    match resolution {
        Ok(spec) => Dataset::Selection { store, spec },
        Err(err) => {
            tracing::debug!(error = %err, "parameters rejected, selecting nothing");
            Dataset::Empty
        }
    }
}

impl<S: EventStore> Dataset<'_, S> {
    /// Runs several reads of this dataset against one store snapshot.
    pub fn read_consistent<T, F>(&self, read: F) -> Result<T, S::Error>
    where
        F: FnOnce(&Self) -> Result<T, S::Error>,
    {
        match self {
            Self::Empty => read(self),
            Self::Selection { store, .. } => store.read_consistent(|_| read(self)),
        }
    }

    /// Earliest and latest event time; `None` when the dataset is empty.
    pub fn time_range(&self) -> Result<Option<TimeSpan>, S::Error> {
        match self {
            Self::Empty => Ok(None),
            Self::Selection { store, spec } => store.time_range(spec),
        }
    }

    pub fn buckets(&self, granularity: Granularity) -> Result<Vec<Bucket>, S::Error> {
        match self {
            Self::Empty => Ok(Vec::new()),
            Self::Selection { store, spec } => store.aggregate_by_period(spec, granularity),
        }
    }
}
