//! Seismic event statistics CLI library.
//!
//! This crate provides the CLI interface for the earthquake store.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, FilterArgs, ImportFormat};
pub use config::Config;
