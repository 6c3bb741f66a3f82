//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use ft_core::EngineConfig;
use ft_store::RetryPolicy;

const MINUTE_MS: i64 = 60_000;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Period of the progress tick while watching a session.
    pub tick_period_ms: i64,

    /// Minutes of active time between check-in reminders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_minutes: Option<i64>,

    /// A wall-clock jump larger than this between two watch iterations is
    /// treated as the machine having been suspended.
    pub suspend_gap_ms: i64,

    /// Automatic retries of a failed store write before giving up.
    pub max_write_retries: u32,

    /// Delay before the first write retry.
    pub retry_base_delay_ms: i64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let retry = RetryPolicy::default();
        Self {
            database_path: data_dir.join("ft.db"),
            tick_period_ms: EngineConfig::default().tick_period_ms,
            check_in_minutes: None,
            suspend_gap_ms: 5_000,
            max_write_retries: retry.max_attempts,
            retry_base_delay_ms: retry.base_delay_ms,
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

        // Load from environment variables (FT_*)
        figment = figment.merge(Env::prefixed("FT_"));

        figment.extract()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tick_period_ms: self.tick_period_ms,
            check_in_every_ms: self
                .check_in_minutes
                .map(|minutes| minutes.saturating_mul(MINUTE_MS)),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_write_retries,
            base_delay_ms: self.retry_base_delay_ms,
            ..RetryPolicy::default()
        }
    }
}

/// Returns the platform-specific config directory for ft.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ft"))
}

/// Returns the platform-specific data directory for ft.
///
/// On Linux: `~/.local/share/ft`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ft"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_dirs_data_path_ends_with_ft() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "ft");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("ft.db"));
        assert_eq!(config.tick_period_ms, 1_000);
        assert_eq!(config.suspend_gap_ms, 5_000);
        assert_eq!(config.check_in_minutes, None);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_path = "/tmp/focus.db"
tick_period_ms = 250
check_in_minutes = 15
max_write_retries = 2
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/focus.db"));
        assert_eq!(config.tick_period_ms, 250);
        assert_eq!(config.retry_base_delay_ms, 500);

        let engine = config.engine_config();
        assert_eq!(engine.tick_period_ms, 250);
        assert_eq!(engine.check_in_every_ms, Some(900_000));
        assert_eq!(config.retry_policy().max_attempts, 2);
        assert_eq!(config.retry_policy().max_delay_ms, 60_000);
    }
}
