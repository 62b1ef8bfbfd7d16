//! Seismic event records.

use std::fmt;

use chrono::{DateTime, Datelike, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// A single recorded seismic occurrence.
///
/// Events are validated on construction and never mutated afterwards. The
/// time is kept at millisecond precision so every store sees the same value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    time: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    depth: f64,
    magnitude: f64,
}

/// Identity of an event for deduplication: the full five-tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
    time: DateTime<Utc>,
    latitude: u64,
    longitude: u64,
    depth: u64,
    magnitude: u64,
}

impl Event {
    /// Creates a new event after validation.
    pub fn new(
        time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        depth: f64,
        magnitude: f64,
    ) -> Result<Self, ValidationError> {
        check_range("latitude", latitude, -90.0, 90.0)?;
        check_range("longitude", longitude, -180.0, 180.0)?;
        check_finite("depth", depth)?;
        check_finite("magnitude", magnitude)?;
        if depth < 0.0 {
            return Err(ValidationError::NegativeDepth { value: depth });
        }
        if !(1..=9999).contains(&time.year()) {
            return Err(ValidationError::YearOutOfRange { year: time.year() });
        }
        Ok(Self {
            time: time.trunc_subsecs(3),
            latitude,
            longitude,
            depth,
            magnitude,
        })
    }

    pub const fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    pub const fn depth(&self) -> f64 {
        self.depth
    }

    pub const fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Returns the deduplication key.
    pub fn key(&self) -> EventKey {
        // Adding 0.0 folds -0.0 into 0.0 so both spellings collide.
        let bits = |value: f64| (value + 0.0).to_bits();
        EventKey {
            time: self.time,
            latitude: bits(self.latitude),
            longitude: bits(self.longitude),
            depth: bits(self.depth),
            magnitude: bits(self.magnitude),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | M{} | Lat: {}N | Lon: {}E | Depth: {} km",
            self.time.format("%Y-%m-%d %H:%M:%S UTC"),
            self.magnitude,
            self.latitude,
            self.longitude,
            self.depth
        )
    }
}

#[derive(Deserialize)]
struct RawEvent {
    time: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    depth: f64,
    magnitude: f64,
}

impl TryFrom<RawEvent> for Event {
    type Error = ValidationError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        Self::new(
            raw.time,
            raw.latitude,
            raw.longitude,
            raw.depth,
            raw.magnitude,
        )
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NotFinite { field, value })
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    check_finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
