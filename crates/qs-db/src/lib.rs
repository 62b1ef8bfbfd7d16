//! Storage layer for quakestat.
//!
//! Provides a SQLite-backed [`EventStore`] using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! This means a `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! For concurrent requests, either:
//! - Use a `Mutex<Database>` to serialize access
//! - Open a separate `Database` per thread (SQLite handles concurrent readers)
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Event times are stored as TEXT in a fixed-width RFC 3339 form with
//! millisecond precision and a `Z` suffix (e.g., `2024-01-15T10:30:00.000Z`).
//! This format ensures:
//! - Lexicographic ordering matches chronological ordering
//! - A period key is a plain prefix of the timestamp (13 characters for an
//!   hour, 10 for a day, 7 for a month, 4 for a year)
//!
//! [`Event`] only admits years 1 through 9999, which keeps the width fixed.
//!
//! ## Deduplication
//!
//! The five-tuple `(time, latitude, longitude, depth, magnitude)` carries a
//! `UNIQUE` constraint and inserts use `INSERT OR IGNORE`, so concurrent
//! ingestion cannot create duplicate rows.

use std::path::Path;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use qs_core::{
    Bounds, Bucket, Event, EventStore, FilterSpec, Granularity, PeriodTotals, TimeSpan,
    ValidationError,
};
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp could not be parsed.
    #[error("invalid stored timestamp {timestamp:?}")]
    TimestampParse {
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row no longer passes event validation.
    #[error("invalid stored event at {timestamp}: {source}")]
    InvalidEvent {
        timestamp: String,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Outcome of a batch insert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InsertStats {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Overall contents of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSummary {
    pub events: u64,
    pub span: Option<TimeSpan>,
}

/// Row ordering for event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    OldestFirst,
    NewestFirst,
}

impl Order {
    const fn sql(self) -> &'static str {
        match self {
            Self::OldestFirst => "ORDER BY time ASC, id ASC",
            Self::NewestFirst => "ORDER BY time DESC, id DESC",
        }
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- time: fixed-width RFC 3339 UTC with milliseconds
            -- depth: kilometres below the surface, non-negative
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY,
                time TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                depth REAL NOT NULL,
                magnitude REAL NOT NULL,
                UNIQUE (time, latitude, longitude, depth, magnitude)
            );

            CREATE INDEX IF NOT EXISTS idx_events_time ON events(time);
            CREATE INDEX IF NOT EXISTS idx_events_magnitude ON events(magnitude);
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of events in one transaction, ignoring duplicates.
    pub fn insert_events(&mut self, events: &[Event]) -> Result<InsertStats, DbError> {
        if events.is_empty() {
            return Ok(InsertStats::default());
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO events (time, latitude, longitude, depth, magnitude)
                VALUES (?, ?, ?, ?, ?)
                ",
            )?;
            for event in events {
                inserted += stmt.execute(params![
                    format_timestamp(event.time()),
                    event.latitude(),
                    event.longitude(),
                    event.depth(),
                    event.magnitude(),
                ])?;
            }
        }
        tx.commit()?;

        let stats = InsertStats {
            inserted,
            duplicates: events.len() - inserted,
        };
        tracing::debug!(
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            "stored events"
        );
        Ok(stats)
    }

    /// Lists matching events in the given order, optionally capped.
    pub fn list_events(
        &self,
        spec: &FilterSpec,
        order: Order,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, DbError> {
        let (conditions, mut values) = where_clause(spec);
        let mut sql = format!(
            "SELECT time, latitude, longitude, depth, magnitude FROM events {conditions} {}",
            order.sql()
        );
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(EventRow {
                time: row.get(0)?,
                latitude: row.get(1)?,
                longitude: row.get(2)?,
                depth: row.get(3)?,
                magnitude: row.get(4)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }

    /// Counts stored events and reports the first and last event time.
    pub fn summary(&self) -> Result<StoreSummary, DbError> {
        let (events, first, last): (u64, Option<String>, Option<String>) = self.conn.query_row(
            "SELECT COUNT(*), MIN(time), MAX(time) FROM events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(StoreSummary {
            events,
            span: parse_span(first, last)?,
        })
    }

    /// Deletes every event strictly before `cutoff`. Returns the number removed.
    pub fn delete_events_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize, DbError> {
        let removed = self.conn.execute(
            "DELETE FROM events WHERE time < ?",
            params![format_timestamp(cutoff)],
        )?;
        tracing::info!(removed, cutoff = %cutoff, "pruned events");
        Ok(removed)
    }
}

impl EventStore for Database {
    type Error = DbError;

    fn query(&self, spec: &FilterSpec) -> Result<Vec<Event>, DbError> {
        self.list_events(spec, Order::OldestFirst, None)
    }

    fn time_range(&self, spec: &FilterSpec) -> Result<Option<TimeSpan>, DbError> {
        let (conditions, values) = where_clause(spec);
        let sql = format!("SELECT MIN(time), MAX(time) FROM events {conditions}");
        let (first, last): (Option<String>, Option<String>) =
            self.conn
                .query_row(&sql, params_from_iter(values), |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
        parse_span(first, last)
    }

    fn aggregate_by_period(
        &self,
        spec: &FilterSpec,
        granularity: Granularity,
    ) -> Result<Vec<Bucket>, DbError> {
        let (prefix_len, suffix) = period_key(granularity);
        let (conditions, values) = where_clause(spec);
        // Sums are exact in PeriodTotals, not in SQL floats
        let sql = format!(
            "
            SELECT substr(time, 1, {prefix_len}) AS period, magnitude
            FROM events {conditions}
            ORDER BY period ASC
            "
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        let mut periods: Vec<(String, PeriodTotals)> = Vec::new();
        for row in rows {
            let (key, magnitude) = row?;
            match periods.last_mut() {
                Some((current, totals)) if *current == key => totals.add(magnitude),
                _ => periods.push((key, PeriodTotals::new(magnitude))),
            }
        }
        let mut buckets = Vec::with_capacity(periods.len());
        for (key, totals) in periods {
            let period = parse_timestamp(&format!("{key}{suffix}"))?;
            buckets.push(totals.into_bucket(period));
        }
        Ok(buckets)
    }

    fn read_consistent<T, F>(&self, read: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        // A deferred transaction pins one snapshot from its first read on
        let tx = self.conn.unchecked_transaction()?;
        let out = read(self)?;
        tx.commit()?;
        Ok(out)
    }
}

#[derive(Debug)]
struct EventRow {
    time: String,
    latitude: f64,
    longitude: f64,
    depth: f64,
    magnitude: f64,
}

impl EventRow {
    fn into_event(self) -> Result<Event, DbError> {
        let time = parse_timestamp(&self.time)?;
        Event::new(time, self.latitude, self.longitude, self.depth, self.magnitude).map_err(
            |source| DbError::InvalidEvent {
                timestamp: self.time,
                source,
            },
        )
    }
}

/// Prefix length of the stored timestamp that identifies a period, and the
/// suffix that turns that prefix back into the period's start instant.
const fn period_key(granularity: Granularity) -> (usize, &'static str) {
    match granularity {
        Granularity::Hour => (13, ":00:00Z"),
        Granularity::Day => (10, "T00:00:00Z"),
        Granularity::Month => (7, "-01T00:00:00Z"),
        Granularity::Year => (4, "-01-01T00:00:00Z"),
    }
}

const MAX_STORED_YEAR: i32 = 9999;

/// Builds a `WHERE` clause with positional parameters for `spec`.
fn where_clause(spec: &FilterSpec) -> (String, Vec<Value>) {
    let mut conditions: Vec<&'static str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    // Stored years stop at 9999; bounds past that no longer compare as text
    if let Some(window) = spec.time {
        if window.start.year() > MAX_STORED_YEAR {
            conditions.push("0");
        } else {
            conditions.push("time >= ?");
            values.push(Value::Text(format_timestamp(window.start)));
        }
        if window.end.year() <= MAX_STORED_YEAR {
            conditions.push("time < ?");
            values.push(Value::Text(format_timestamp(window.end)));
        }
    }

    let mut push_bounds = |bounds: &Bounds, at_least: &'static str, at_most: &'static str| {
        if let Some(min) = bounds.min {
            conditions.push(at_least);
            values.push(Value::Real(min));
        }
        if let Some(max) = bounds.max {
            conditions.push(at_most);
            values.push(Value::Real(max));
        }
    };
    push_bounds(&spec.latitude, "latitude >= ?", "latitude <= ?");
    push_bounds(&spec.longitude, "longitude >= ?", "longitude <= ?");
    push_bounds(&spec.depth, "depth >= ?", "depth <= ?");
    push_bounds(&spec.magnitude, "magnitude >= ?", "magnitude <= ?");

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}

fn parse_span(first: Option<String>, last: Option<String>) -> Result<Option<TimeSpan>, DbError> {
    match (first, last) {
        (Some(first), Some(last)) => Ok(Some(TimeSpan::new(
            parse_timestamp(&first)?,
            parse_timestamp(&last)?,
        ))),
        _ => Ok(None),
    }
}

fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
