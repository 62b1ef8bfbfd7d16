//! Bulletin XML and description-text parsing.

use std::sync::LazyLock;

use chrono::{NaiveDateTime, ParseError};
use qs_core::{Event, ValidationError};
use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;
use regex::Regex;
use thiserror::Error;

use crate::FeedError;

/// Bulletin times are UTC, e.g. `17-Oct-2025 22:51:58`.
const TIME_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Time:\s*(\d{2}-[A-Za-z]{3}-\d{4} \d{2}:\d{2}:\d{2})").unwrap()
});
static LATITUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Latitude:\s*([\d.]+)\s*N").unwrap());
static LONGITUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Longitude:\s*([\d.]+)\s*E").unwrap());
static DEPTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Depth:\s*([\d.]+)\s*km").unwrap());
static MAGNITUDE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"M\s*([\d.]+)").unwrap());
static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// Why a single feed item was skipped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ItemError {
    #[error("item has no description")]
    MissingDescription,
    #[error("description has no {0}")]
    MissingField(&'static str),
    #[error("invalid {field} {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid time {value:?}")]
    InvalidTime {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    InvalidEvent(#[from] ValidationError),
}

/// A feed item that did not yield an event.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedItem {
    /// Zero-based position of the item in the feed.
    pub index: usize,
    pub error: ItemError,
}

/// Events read from one feed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedBatch {
    pub events: Vec<Event>,
    pub rejected: Vec<RejectedItem>,
}

/// Parses every `<item>` of an RSS document.
///
/// Only malformed XML is an error; unreadable items land in
/// [`FeedBatch::rejected`].
pub fn parse_feed(xml: &str) -> Result<FeedBatch, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut batch = FeedBatch::default();
    let mut index = 0;
    let mut in_item = false;
    let mut in_description = false;
    let mut description: Option<String> = None;

    loop {
        match reader.read_event()? {
            XmlEvent::Start(tag) => match tag.local_name().as_ref() {
                b"item" => {
                    in_item = true;
                    description = None;
                }
                b"description" if in_item => {
                    in_description = true;
                    description = Some(String::new());
                }
                _ => {}
            },
            XmlEvent::End(tag) => match tag.local_name().as_ref() {
                b"item" if in_item => {
                    in_item = false;
                    let result = description
                        .take()
                        .ok_or(ItemError::MissingDescription)
                        .and_then(|text| parse_description(&text));
                    match result {
                        Ok(event) => batch.events.push(event),
                        Err(error) => {
                            tracing::warn!(index, %error, "skipping feed item");
                            batch.rejected.push(RejectedItem { index, error });
                        }
                    }
                    index += 1;
                }
                b"description" => in_description = false,
                _ => {}
            },
            XmlEvent::Text(text) if in_description => {
                if let Some(buffer) = description.as_mut() {
                    buffer.push_str(&text.unescape()?);
                }
            }
            XmlEvent::CData(data) if in_description => {
                if let Some(buffer) = description.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    Ok(batch)
}

/// Extracts an event from a bulletin description such as
/// `Time: 17-Oct-2025 22:51:58 (UTC)<br>Latitude: 38.12N<br>...`.
pub fn parse_description(description: &str) -> Result<Event, ItemError> {
    let text = LINE_BREAK_RE.replace_all(description, "\n");

    let time_str = capture(&TIME_RE, &text, "time")?;
    let time = NaiveDateTime::parse_from_str(time_str, TIME_FORMAT)
        .map_err(|source| ItemError::InvalidTime {
            value: time_str.to_string(),
            source,
        })?
        .and_utc();

    let latitude = number(&LATITUDE_RE, &text, "latitude")?;
    let longitude = number(&LONGITUDE_RE, &text, "longitude")?;
    let depth = number(&DEPTH_RE, &text, "depth")?;
    let magnitude = number(&MAGNITUDE_RE, &text, "magnitude")?;

    Ok(Event::new(time, latitude, longitude, depth, magnitude)?)
}

fn capture<'t>(re: &Regex, text: &'t str, field: &'static str) -> Result<&'t str, ItemError> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(ItemError::MissingField(field))
}

fn number(re: &Regex, text: &str, field: &'static str) -> Result<f64, ItemError> {
    let value = capture(re, text, field)?;
    value.parse().map_err(|_| ItemError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
