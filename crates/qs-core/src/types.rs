//! Validation errors and shared value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric field was NaN or infinite.
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    /// A coordinate fell outside its valid range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Depth below the surface is reported as a non-negative distance.
    #[error("depth cannot be negative, got {value}")]
    NegativeDepth { value: f64 },

    /// The event time cannot be represented in the stored timestamp form.
    #[error("event year must be between 1 and 9999, got {year}")]
    YearOutOfRange { year: i32 },
}

/// The earliest and latest event time of a non-empty selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

impl TimeSpan {
    /// Creates a span, ordering the two instants.
    #[must_use]
    pub fn new(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        if a <= b {
            Self { first: a, last: b }
        } else {
            Self { first: b, last: a }
        }
    }

    /// Widens the span to include `time`.
    #[must_use]
    pub fn including(self, time: DateTime<Utc>) -> Self {
        Self {
            first: self.first.min(time),
            last: self.last.max(time),
        }
    }

    /// Whole days between the first and last instant, rounded down.
    pub fn whole_days(&self) -> i64 {
        self.last.signed_duration_since(self.first).num_days()
    }

    /// Whether both ends fall on the same UTC calendar date.
    pub fn is_single_day(&self) -> bool {
        self.first.date_naive() == self.last.date_naive()
    }
}
