//! CLI subcommand implementations.

pub mod events;
pub mod fetch;
pub mod import;
pub mod prune;
pub mod stats;
pub mod status;
pub mod util;
