//! Prune command: drops events older than a cutoff date.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};

use qs_db::Database;

/// Deletes every event before midnight UTC on `before`.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, before: NaiveDate) -> Result<()> {
    let cutoff = before.and_time(NaiveTime::MIN).and_utc();
    let removed = db
        .delete_events_before(cutoff)
        .with_context(|| format!("failed to prune events before {before}"))?;
    writeln!(writer, "Removed {removed} events recorded before {before}.")?;
    Ok(())
}
