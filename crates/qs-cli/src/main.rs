use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use qs_cli::commands::{events, fetch, import, prune, stats, status};
use qs_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(qs_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = qs_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open {}", config.database_path.display())
    })?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("QS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Logs go to stderr so report output stays pipeable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut stdout = io::stdout().lock();

    match &cli.command {
        Some(Commands::Stats { filter, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            stats::run(&mut stdout, &db, filter, &config.filter_policy(), *json)?;
        }
        Some(Commands::Events {
            filter,
            json,
            limit,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            events::run(
                &mut stdout,
                &db,
                filter,
                &config.filter_policy(),
                *json,
                *limit,
            )?;
        }
        Some(Commands::Fetch { url }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            fetch::run(&mut stdout, &mut db, &config, url.as_deref())?;
        }
        Some(Commands::Import {
            format,
            time_zone,
            delimiter,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let zone_name = time_zone.as_deref().unwrap_or(&config.import_time_zone);
            let options = import::ImportOptions {
                format: *format,
                time_zone: import::parse_time_zone(zone_name)?,
                delimiter: *delimiter,
            };
            import::run(io::stdin().lock(), &mut stdout, &mut db, &options)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config)?;
        }
        Some(Commands::Prune { before }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            prune::run(&mut stdout, &mut db, *before)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
