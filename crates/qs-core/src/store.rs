//! The storage contract the statistics pipeline runs against.

use std::collections::HashSet;
use std::convert::Infallible;

use crate::aggregate::{Bucket, aggregate};
use crate::event::{Event, EventKey};
use crate::filter::FilterSpec;
use crate::granularity::Granularity;
use crate::types::TimeSpan;

/// A queryable collection of events.
///
/// Only [`EventStore::query`] is required. Stores that can compute the time
/// range or per-period aggregates natively should override the defaults;
/// overrides must return exactly what the defaults would.
pub trait EventStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns matching events ordered by ascending time.
    fn query(&self, spec: &FilterSpec) -> Result<Vec<Event>, Self::Error>;

    /// Returns the earliest and latest matching time, or `None` if nothing matches.
    fn time_range(&self, spec: &FilterSpec) -> Result<Option<TimeSpan>, Self::Error> {
        let events = self.query(spec)?;
        Ok(events
            .iter()
            .map(Event::time)
            .fold(None, |span: Option<TimeSpan>, time| {
                Some(span.map_or_else(|| TimeSpan::new(time, time), |span| span.including(time)))
            }))
    }

    /// Returns per-period statistics for matching events.
    fn aggregate_by_period(
        &self,
        spec: &FilterSpec,
        granularity: Granularity,
    ) -> Result<Vec<Bucket>, Self::Error> {
        let events = self.query(spec)?;
        Ok(aggregate(&events, granularity))
    }

    /// Runs `read` against one consistent view of the store.
    ///
    /// Reads inside `read` must not observe writes committed by others in
    /// between. Stores without concurrent writers need not do anything.
    fn read_consistent<T, F>(&self, read: F) -> Result<T, Self::Error>
    where
        F: FnOnce(&Self) -> Result<T, Self::Error>,
    {
        read(self)
    }
}

/// An in-memory event store.
///
/// Enforces the five-tuple uniqueness rule on insert. Reads take `&self`, so
/// a `MemoryStore` behind an `Arc` can serve concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    events: Vec<Event>,
    keys: HashSet<EventKey>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts events, skipping exact duplicates. Returns the number inserted.
    pub fn insert(&mut self, events: impl IntoIterator<Item = Event>) -> usize {
        let mut inserted = 0;
        for event in events {
            if self.keys.insert(event.key()) {
                self.events.push(event);
                inserted += 1;
            }
        }
        inserted
    }
}

impl FromIterator<Event> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        let mut store = Self::new();
        store.insert(iter);
        store
    }
}

impl EventStore for MemoryStore {
    type Error = Infallible;

    fn query(&self, spec: &FilterSpec) -> Result<Vec<Event>, Self::Error> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|event| spec.matches(event))
            .copied()
            .collect();
        events.sort_by_key(Event::time);
        Ok(events)
    }
}
