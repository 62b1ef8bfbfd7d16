//! Events command: lists matching events from the local database.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use qs_core::{Event, FilterPolicy, RawParams, resolve};
use qs_db::{Database, Order};

use crate::cli::FilterArgs;
use crate::commands::util::warn_about;

/// Runs the events command as of now.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    filter: &FilterArgs,
    policy: &FilterPolicy,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    let events = list(db, &filter.to_params(), policy, Utc::now(), limit)?;
    write_events(writer, &events, json)
}

/// Matching events, newest first. Malformed filters select nothing.
fn list(
    db: &Database,
    raw: &RawParams,
    policy: &FilterPolicy,
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> Result<Vec<Event>> {
    warn_about(raw, policy, now);
    let Ok(spec) = resolve(raw, policy, now) else {
        return Ok(Vec::new());
    };
    db.list_events(&spec, Order::NewestFirst, limit)
        .context("failed to list events")
}

fn write_events<W: Write>(writer: &mut W, events: &[Event], json: bool) -> Result<()> {
    if json {
        for event in events {
            writeln!(writer, "{}", serde_json::to_string(event)?)?;
        }
        return Ok(());
    }

    if events.is_empty() {
        writeln!(writer, "No events match the given filters.")?;
        return Ok(());
    }
    for event in events {
        writeln!(writer, "{event}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let events = [
            Event::new(at("2025-03-01T08:15:30Z"), 38.25, 21.74, 12.0, 2.8).unwrap(),
            Event::new(at("2025-03-02T23:59:59Z"), 35.4, 25.02, 8.5, 4.1).unwrap(),
            Event::new(at("2025-03-05T00:00:00Z"), 39.9, 20.1, 5.0, 3.0).unwrap(),
        ];
        db.insert_events(&events).unwrap();
        db
    }

    fn render(pairs: &[(&str, &str)], json: bool, limit: Option<usize>) -> String {
        let raw: RawParams = pairs.iter().copied().collect();
        let now = at("2025-03-10T00:00:00Z");
        let events = list(&seeded_db(), &raw, &FilterPolicy::default(), now, limit).unwrap();
        let mut output = Vec::new();
        write_events(&mut output, &events, json).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn lists_newest_first_within_range() {
        let output = render(
            &[("min_date", "2025-03-01"), ("max_date", "2025-03-02")],
            false,
            None,
        );
        assert_snapshot!(output, @r"
        2025-03-02 23:59:59 UTC | M4.1 | Lat: 35.4N | Lon: 25.02E | Depth: 8.5 km
        2025-03-01 08:15:30 UTC | M2.8 | Lat: 38.25N | Lon: 21.74E | Depth: 12 km
        ");
    }

    #[test]
    fn json_lines_respect_limit() {
        let output = render(
            &[("min_date", "2025-01-01"), ("max_date", "2025-12-31")],
            true,
            Some(1),
        );
        assert_snapshot!(output, @r#"{"time":"2025-03-05T00:00:00Z","latitude":39.9,"longitude":20.1,"depth":5.0,"magnitude":3.0}"#);
    }

    #[test]
    fn default_window_excludes_older_events() {
        assert_snapshot!(render(&[], false, None), @"No events match the given filters.");
    }

    #[test]
    fn malformed_bound_lists_nothing() {
        let output = render(&[("max_depth", "deep")], true, None);
        assert_eq!(output, "");
    }
}
