//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use qs_core::FilterPolicy;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Bulletin RSS feed used by `qs fetch`.
    #[serde(default)]
    pub feed_url: Option<String>,

    /// Length of the trailing window when a request names no dates.
    pub default_window_hours: u32,

    /// IANA time zone that sheet imports are recorded in.
    pub import_time_zone: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("feed_url", &self.feed_url)
            .field("default_window_hours", &self.default_window_hours)
            .field("import_time_zone", &self.import_time_zone)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("quakes.db"),
            feed_url: None,
            default_window_hours: 24,
            import_time_zone: "UTC".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (QS_*)
        figment = figment.merge(Env::prefixed("QS_"));

        figment.extract()
    }

    /// Filter defaults derived from this configuration.
    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::with_lookback_hours(self.default_window_hours)
    }
}

/// Returns the platform-specific config directory for qs.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("qs"))
}

/// Returns the platform-specific data directory for qs.
///
/// On Linux: `~/.local/share/qs`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("qs"))
}
