//! Fetch command: downloads the bulletin feed into the local store.

use std::io::Write;

use anyhow::{Context, Result};
use qs_db::Database;
use qs_feed::{Client, FeedBatch};

use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    url: Option<&str>,
) -> Result<()> {
    let url = url
        .or(config.feed_url.as_deref())
        .context("no feed URL: pass --url or set feed_url in config")?;

    let client = Client::new().context("failed to create feed client")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let batch = runtime
        .block_on(client.fetch_events(url))
        .with_context(|| format!("failed to fetch {url}"))?;

    store_batch(writer, db, &batch)
}

/// Inserts parsed events and reports what happened to every item.
fn store_batch<W: Write>(writer: &mut W, db: &mut Database, batch: &FeedBatch) -> Result<()> {
    let stats = db
        .insert_events(&batch.events)
        .context("failed to store feed events")?;

    writeln!(
        writer,
        "Fetched {} items: {} new, {} already stored, {} skipped.",
        batch.events.len() + batch.rejected.len(),
        stats.inserted,
        stats.duplicates,
        batch.rejected.len()
    )?;
    for rejected in &batch.rejected {
        writeln!(writer, "- item {}: {}", rejected.index + 1, rejected.error)?;
    }
    Ok(())
}
