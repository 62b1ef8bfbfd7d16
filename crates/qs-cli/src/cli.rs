//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use qs_core::RawParams;
use qs_core::filter::params;

/// Seismic event statistics.
///
/// Collects earthquake records from the bulletin feed and spreadsheet
/// imports, then reports them bucketed by hour, day, month or year.
#[derive(Debug, Parser)]
#[command(name = "qs", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report bucketed statistics for matching events.
    Stats {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List matching events, newest first.
    Events {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print one JSON object per line.
        #[arg(long)]
        json: bool,

        /// Maximum number of events to print.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Download the bulletin feed and store its events.
    Fetch {
        /// Feed URL (defaults to `feed_url` from config).
        #[arg(long)]
        url: Option<String>,
    },

    /// Import events from stdin.
    Import {
        /// Input layout.
        #[arg(long, value_enum, default_value_t = ImportFormat::Sheet)]
        format: ImportFormat,

        /// Time zone of sheet timestamps (defaults to `import_time_zone`).
        #[arg(long)]
        time_zone: Option<String>,

        /// Column delimiter for sheets.
        #[arg(long, default_value_t = '\t')]
        delimiter: char,
    },

    /// Show database location and contents.
    Status,

    /// Delete events recorded before a date.
    Prune {
        /// First day to keep (YYYY-MM-DD).
        #[arg(long)]
        before: NaiveDate,
    },
}

/// Import input layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportFormat {
    /// Delimited rows with a `time, latitude, longitude, depth, magnitude` header.
    Sheet,
    /// Whitespace-separated historical catalog lines.
    Catalog,
}

/// Filter flags shared by `stats` and `events`.
///
/// Values are passed through unparsed; the resolver decides what is valid.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// First day to include (YYYY-MM-DD).
    #[arg(long)]
    pub min_date: Option<String>,
    /// Last day to include (YYYY-MM-DD).
    #[arg(long)]
    pub max_date: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub min_latitude: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub max_latitude: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub min_longitude: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub max_longitude: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub min_depth: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub max_depth: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub min_magnitude: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub max_magnitude: Option<String>,
}

impl FilterArgs {
    /// Converts the given flags into request parameters.
    pub fn to_params(&self) -> RawParams {
        [
            (params::MIN_DATE, &self.min_date),
            (params::MAX_DATE, &self.max_date),
            (params::MIN_LATITUDE, &self.min_latitude),
            (params::MAX_LATITUDE, &self.max_latitude),
            (params::MIN_LONGITUDE, &self.min_longitude),
            (params::MAX_LONGITUDE, &self.max_longitude),
            (params::MIN_DEPTH, &self.min_depth),
            (params::MAX_DEPTH, &self.max_depth),
            (params::MIN_MAGNITUDE, &self.min_magnitude),
            (params::MAX_MAGNITUDE, &self.max_magnitude),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
        .collect()
    }
}
