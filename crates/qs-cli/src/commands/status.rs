//! Status command for showing what the local store holds.

use std::io::Write;

use anyhow::{Context, Result};

use qs_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let summary = db.summary().context("failed to summarize database")?;

    writeln!(writer, "Earthquake store status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Events: {}", summary.events)?;

    let Some(span) = summary.span else {
        writeln!(writer, "No events recorded.")?;
        return Ok(());
    };
    writeln!(writer, "First event: {}", span.first.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(writer, "Last event: {}", span.last.format("%Y-%m-%d %H:%M:%S UTC"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use insta::assert_snapshot;
    use qs_core::Event;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn config_for(db_path: &std::path::Path) -> Config {
        Config {
            database_path: db_path.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn status_command_outputs_event_span() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("quakes.db");
        let mut db = Database::open(&db_path).unwrap();
        db.insert_events(&[
            Event::new(at("2025-02-01T10:00:00Z"), 38.0, 21.0, 10.0, 3.2).unwrap(),
            Event::new(at("2024-11-20T06:30:15Z"), 36.5, 24.1, 4.0, 2.1).unwrap(),
        ])
        .unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &config_for(&db_path)).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/quakes.db");
        assert_snapshot!(output, @r"
        Earthquake store status
        Database: [TEMP]/quakes.db
        Events: 2
        First event: 2024-11-20 06:30:15 UTC
        Last event: 2025-02-01 10:00:00 UTC
        ");
    }

    #[test]
    fn status_command_on_empty_store() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("quakes.db");
        let db = Database::open(&db_path).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &config_for(&db_path)).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/quakes.db");
        assert_snapshot!(output, @r"
        Earthquake store status
        Database: [TEMP]/quakes.db
        Events: 0
        No events recorded.
        ");
    }
}
