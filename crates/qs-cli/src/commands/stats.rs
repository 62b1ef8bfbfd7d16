//! Stats command: the bucketed statistics report.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use qs_core::{FilterPolicy, RawParams, StatsReport, compute_stats_at};
use qs_db::Database;

use crate::cli::FilterArgs;
use crate::commands::util::warn_about;

/// Runs the stats command as of now.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    filter: &FilterArgs,
    policy: &FilterPolicy,
    json: bool,
) -> Result<()> {
    let report = compute(db, &filter.to_params(), policy, Utc::now())?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(writer, "{}", format_report(&report))?;
    }
    Ok(())
}

/// Computes the report, warning about parameters the pipeline will ignore.
fn compute(
    db: &Database,
    raw: &RawParams,
    policy: &FilterPolicy,
    now: DateTime<Utc>,
) -> Result<StatsReport> {
    warn_about(raw, policy, now);
    compute_stats_at(db, raw, policy, now).context("failed to compute statistics")
}

/// Formats the human-readable report.
pub fn format_report(report: &StatsReport) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    let Some(granularity) = report.granularity.filter(|_| report.has_results) else {
        output.push_str("No events match the given filters.\n");
        return output;
    };

    let _ = writeln!(output, "Granularity: {granularity}");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{:<16}  {:>6}  {:>7}  {:>7}",
        "PERIOD", "EVENTS", "AVG MAG", "MAX MAG"
    );
    for bucket in &report.buckets {
        let _ = writeln!(
            output,
            "{:<16}  {:>6}  {:>7.2}  {:>7}",
            granularity.label(bucket.period),
            bucket.count,
            bucket.avg_magnitude,
            bucket.max_magnitude
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Total events: {}", report.total_events());
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use qs_core::Event;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let events = [
            ("2025-01-01T01:10:00Z", 3.0),
            ("2025-01-01T05:00:00Z", 4.2),
            ("2025-01-01T05:45:00Z", 2.5),
            ("2024-12-30T12:00:00Z", 3.3),
        ]
        .map(|(time, magnitude)| Event::new(at(time), 38.2, 21.7, 10.0, magnitude).unwrap());
        db.insert_events(&events).unwrap();
        db
    }

    fn params(pairs: &[(&str, &str)]) -> RawParams {
        pairs.iter().copied().collect()
    }

    fn now() -> DateTime<Utc> {
        at("2025-01-01T12:00:00Z")
    }

    #[test]
    fn hourly_table_for_default_window() {
        let report = compute(&seeded_db(), &params(&[]), &FilterPolicy::default(), now()).unwrap();
        assert_snapshot!(format_report(&report), @r"
        Granularity: hour

        PERIOD            EVENTS  AVG MAG  MAX MAG
        2025-01-01 01:00       1     3.00        3
        2025-01-01 05:00       2     3.35      4.2

        Total events: 3
        ");
    }

    #[test]
    fn daily_json_for_explicit_range() {
        let report = compute(
            &seeded_db(),
            &params(&[("min_date", "2024-12-30"), ("max_date", "2025-01-01")]),
            &FilterPolicy::default(),
            now(),
        )
        .unwrap();
        assert_snapshot!(serde_json::to_string(&report).unwrap(), @r#"{"has_results":true,"granularity":"day","buckets":[{"period":"2024-12-30T00:00:00Z","count":1,"avg_magnitude":3.3,"max_magnitude":3.3},{"period":"2025-01-01T00:00:00Z","count":3,"avg_magnitude":3.23,"max_magnitude":4.2}]}"#);
    }

    #[test]
    fn malformed_filter_prints_empty_message() {
        let report = compute(
            &seeded_db(),
            &params(&[("min_magnitude", "strong")]),
            &FilterPolicy::default(),
            now(),
        )
        .unwrap();
        assert_eq!(report, StatsReport::empty());
        assert_snapshot!(format_report(&report), @"No events match the given filters.");
    }

    #[test]
    fn single_date_reports_every_event() {
        let report = compute(
            &seeded_db(),
            &params(&[("min_date", "2025-01-01")]),
            &FilterPolicy::default(),
            now(),
        )
        .unwrap();
        assert_eq!(report.total_events(), 4);
    }
}
