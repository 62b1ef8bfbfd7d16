//! Import command for loading spreadsheet exports and historical catalogs.
//!
//! Input is read completely before anything is written, so a malformed row
//! aborts the whole import.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use qs_core::Event;
use qs_db::Database;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::cli::ImportFormat;

/// Day-first layouts seen in spreadsheet exports, plus ISO as a fallback.
const SHEET_TIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// `1964 FEB 24 23:30:25.0` once the catalog columns are rejoined.
const CATALOG_TIME_FORMAT: &str = "%Y %b %d %H:%M:%S%.f";

const COLUMNS: [&str; 5] = ["time", "latitude", "longitude", "depth", "magnitude"];

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub format: ImportFormat,
    pub time_zone: Tz,
    pub delimiter: char,
}

pub fn run<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    db: &mut Database,
    options: &ImportOptions,
) -> Result<()> {
    let events = match options.format {
        ImportFormat::Sheet => parse_sheet(reader, options.delimiter, options.time_zone)?,
        ImportFormat::Catalog => parse_catalog(reader)?,
    };
    let stats = db
        .insert_events(&events)
        .context("failed to store imported events")?;
    tracing::info!(
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        "import finished"
    );
    writeln!(
        writer,
        "Imported {} events ({} already stored).",
        stats.inserted, stats.duplicates
    )?;
    Ok(())
}

/// Parses an IANA time zone name such as `Europe/Athens`.
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| anyhow::anyhow!("unknown time zone {name:?}"))
}

fn parse_sheet<R: BufRead>(reader: R, delimiter: char, time_zone: Tz) -> Result<Vec<Event>> {
    let mut columns: Option<[usize; 5]> = None;
    let mut events = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();

        let Some(columns) = columns else {
            columns = Some(
                header_columns(&fields)
                    .with_context(|| format!("invalid header on line {}", idx + 1))?,
            );
            continue;
        };

        let event = sheet_row(&fields, columns, time_zone)
            .with_context(|| format!("invalid row on line {}", idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Positions of the required columns, matched case-insensitively.
fn header_columns(fields: &[&str]) -> Result<[usize; 5]> {
    let mut positions = [0; 5];
    for (position, name) in positions.iter_mut().zip(COLUMNS) {
        *position = fields
            .iter()
            .position(|field| field.eq_ignore_ascii_case(name))
            .with_context(|| format!("missing column {name:?}"))?;
    }
    Ok(positions)
}

fn sheet_row(fields: &[&str], columns: [usize; 5], time_zone: Tz) -> Result<Event> {
    let [time, latitude, longitude, depth, magnitude] = columns.map(|idx| field(fields, idx));
    let time = localize(parse_sheet_time(time?)?, time_zone)?;
    normalized_event(
        time,
        decimal("latitude", latitude?)?,
        decimal("longitude", longitude?)?,
        decimal("depth", depth?)?,
        decimal("magnitude", magnitude?)?,
    )
}

fn field<'a>(fields: &[&'a str], idx: usize) -> Result<&'a str> {
    fields
        .get(idx)
        .copied()
        .with_context(|| format!("expected at least {} fields, found {}", idx + 1, fields.len()))
}

fn parse_sheet_time(value: &str) -> Result<NaiveDateTime> {
    SHEET_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .with_context(|| format!("unrecognised time {value:?}"))
}

/// Interprets a wall-clock time in `time_zone`. Repeated times resolve to
/// the earlier instant.
fn localize(naive: NaiveDateTime, time_zone: Tz) -> Result<DateTime<Utc>> {
    time_zone
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .with_context(|| format!("time {naive} does not exist in {time_zone}"))
}

/// Parses a number written with either a decimal point or a decimal comma.
fn decimal(column: &str, value: &str) -> Result<f64> {
    let normalized = value.trim().replace(',', ".");
    let number: f64 = normalized
        .parse()
        .with_context(|| format!("invalid {column} {value:?}"))?;
    if !number.is_finite() {
        bail!("invalid {column} {value:?}");
    }
    Ok(number)
}

fn parse_catalog<R: BufRead>(reader: R) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let event =
            catalog_row(&line).with_context(|| format!("invalid catalog line {}", idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

fn catalog_row(line: &str) -> Result<Event> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [year, month, day, hour, minute, second, latitude, longitude, depth, magnitude] =
        parts.as_slice()
    else {
        bail!("expected 10 columns, found {}", parts.len());
    };

    let stamp = format!("{year} {month} {day} {hour}:{minute}:{second}");
    let time = NaiveDateTime::parse_from_str(&stamp, CATALOG_TIME_FORMAT)
        .with_context(|| format!("invalid time {stamp:?}"))?
        .and_utc();

    normalized_event(
        time,
        decimal("latitude", latitude)?,
        decimal("longitude", longitude)?,
        decimal("depth", depth)?,
        decimal("magnitude", magnitude)?,
    )
}

/// Coordinates keep two decimals and magnitude one, matching the bulletin.
fn normalized_event(
    time: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    depth: f64,
    magnitude: f64,
) -> Result<Event> {
    Ok(Event::new(
        time,
        round_places(latitude, 2),
        round_places(longitude, 2),
        depth,
        round_places(magnitude, 1),
    )?)
}

/// Rounds the exact binary value of `value`, ties to even, so `4.25` keeps
/// `4.2` and `2.675` (stored just below) becomes `2.67`.
fn round_places(value: f64, places: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|exact| exact.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven))
        .and_then(|rounded| rounded.to_string().parse().ok())
        .unwrap_or(value)
}
