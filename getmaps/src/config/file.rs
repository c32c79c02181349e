//! Configuration file handling for `config.ini`.
//!
//! All keys are optional; missing keys keep the built-in defaults.
//!
//! ```ini
//! [server]
//! url = http://tiles.example.org/{zoom}/{x}/{y}.png
//! zoom_offset = 4
//! timeout = 30
//!
//! [store]
//! flush_interval = 100
//!
//! [retry]
//! ; 0 retries forever
//! max_attempts = 0
//! delay_ms = 0
//! give_up_on_client_errors = false
//!
//! [projection]
//! ; unit space of 2^world_size_bits, 2^tile_shift units per tile at zoom 0
//! world_size_bits = 26
//! tile_shift = 5
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::DownloadConfig;
use crate::coord::{Projection, MERCATOR_SPAN, MERCATOR_TOP, TILE_SHIFT, WORLD_SIZE_BITS};
use crate::fetch::RetryPolicy;
use crate::provider::UrlTemplate;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings read from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub zoom_offset: Option<i32>,
    pub timeout: Option<u64>,
    pub flush_interval: Option<u64>,
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<u64>,
    pub give_up_on_client_errors: Option<bool>,
    pub world_size_bits: Option<u32>,
    pub tile_shift: Option<u32>,
}

impl ConfigFile {
    /// Load configuration from the default path.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Overlays these settings on top of `base`.
    pub fn apply(&self, base: DownloadConfig) -> Result<DownloadConfig, ConfigFileError> {
        let mut config = base;

        if let Some(url) = &self.url {
            let template = UrlTemplate::parse(url).map_err(|e| ConfigFileError::InvalidValue {
                section: "server".to_string(),
                key: "url".to_string(),
                value: url.clone(),
                reason: e.to_string(),
            })?;
            config = config.with_url_template(template);
        }
        if let Some(offset) = self.zoom_offset {
            config = config.with_zoom_offset(offset);
        }
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err(ConfigFileError::InvalidValue {
                    section: "server".to_string(),
                    key: "timeout".to_string(),
                    value: timeout.to_string(),
                    reason: "must be at least 1 second".to_string(),
                });
            }
            config = config.with_timeout_secs(timeout);
        }
        if let Some(interval) = self.flush_interval {
            config = config.with_flush_interval(interval);
        }
        if self.max_attempts.is_some() || self.delay_ms.is_some() {
            config = config.with_retry(retry_policy(
                self.max_attempts.unwrap_or(0),
                self.delay_ms.unwrap_or(0),
            ));
        }
        if let Some(enabled) = self.give_up_on_client_errors {
            config = config.with_permanent_client_errors(enabled);
        }
        if self.world_size_bits.is_some() || self.tile_shift.is_some() {
            let world_size_bits = self.world_size_bits.unwrap_or(WORLD_SIZE_BITS);
            let tile_shift = self.tile_shift.unwrap_or(TILE_SHIFT);
            let projection =
                Projection::new(world_size_bits, MERCATOR_SPAN, MERCATOR_TOP, tile_shift).map_err(
                    |e| ConfigFileError::InvalidValue {
                        section: "projection".to_string(),
                        key: "world_size_bits, tile_shift".to_string(),
                        value: format!("{}, {}", world_size_bits, tile_shift),
                        reason: e.to_string(),
                    },
                )?;
            config = config.with_projection(projection);
        }

        Ok(config)
    }
}

/// Builds a retry policy from an attempt limit (0 = unlimited) and a delay.
pub fn retry_policy(max_attempts: u32, delay_ms: u64) -> RetryPolicy {
    let delay = Duration::from_millis(delay_ms);
    if max_attempts == 0 {
        RetryPolicy::forever(delay)
    } else {
        RetryPolicy::fixed(max_attempts, delay)
    }
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("url") {
            let v = v.trim();
            if !v.is_empty() {
                config.url = Some(v.to_string());
            }
        }
        config.zoom_offset = parse_value(section.get("zoom_offset"), "server", "zoom_offset")?;
        config.timeout = parse_value(section.get("timeout"), "server", "timeout")?;
    }

    // [store] section
    if let Some(section) = ini.section(Some("store")) {
        config.flush_interval =
            parse_value(section.get("flush_interval"), "store", "flush_interval")?;
    }

    // [retry] section
    if let Some(section) = ini.section(Some("retry")) {
        config.max_attempts = parse_value(section.get("max_attempts"), "retry", "max_attempts")?;
        config.delay_ms = parse_value(section.get("delay_ms"), "retry", "delay_ms")?;
        config.give_up_on_client_errors = parse_value(
            section.get("give_up_on_client_errors"),
            "retry",
            "give_up_on_client_errors",
        )?;
    }

    // [projection] section
    if let Some(section) = ini.section(Some("projection")) {
        config.world_size_bits =
            parse_value(section.get("world_size_bits"), "projection", "world_size_bits")?;
        config.tile_shift = parse_value(section.get("tile_shift"), "projection", "tile_shift")?;
    }

    Ok(config)
}

fn parse_value<T: FromStr>(
    value: Option<&str>,
    section: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            reason: format!("expected {}", std::any::type_name::<T>()),
        })
}

/// Get the path to the config directory (e.g. `~/.config/getmaps`).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("getmaps")
}

/// Get the path to the default config file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FLUSH_INTERVAL;
    use std::fs;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        fs::write(&path, content).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp_dir.path().join("nonexistent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_load_all_sections() {
        let (_dir, path) = write_config(
            "[server]\n\
             url = https://tiles.example.org/{zoom}/{x}/{y}.png\n\
             zoom_offset = 0\n\
             timeout = 10\n\
             [store]\n\
             flush_interval = 250\n\
             [retry]\n\
             max_attempts = 5\n\
             delay_ms = 200\n\
             give_up_on_client_errors = true\n",
        );

        let file = ConfigFile::load_from(&path).unwrap();
        let config = file.apply(DownloadConfig::default()).unwrap();

        assert_eq!(
            config.url_template().as_str(),
            "https://tiles.example.org/{zoom}/{x}/{y}.png"
        );
        assert_eq!(config.zoom_offset(), 0);
        assert_eq!(config.timeout_secs(), 10);
        assert_eq!(config.flush_interval(), 250);
        assert_eq!(
            config.retry(),
            &RetryPolicy::fixed(5, Duration::from_millis(200))
        );
        assert!(config.permanent_client_errors());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let (_dir, path) = write_config("[server]\ntimeout = 5\n");

        let config = ConfigFile::load_from(&path)
            .unwrap()
            .apply(DownloadConfig::default())
            .unwrap();

        assert_eq!(config.timeout_secs(), 5);
        assert_eq!(config.flush_interval(), DEFAULT_FLUSH_INTERVAL);
        assert_eq!(config.retry(), &RetryPolicy::default());
    }

    #[test]
    fn test_invalid_number_rejected() {
        let (_dir, path) = write_config("[store]\nflush_interval = lots\n");

        match ConfigFile::load_from(&path) {
            Err(ConfigFileError::InvalidValue { section, key, .. }) => {
                assert_eq!(section, "store");
                assert_eq!(key, "flush_interval");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_url_rejected_on_apply() {
        let (_dir, path) = write_config("[server]\nurl = http://example.org/tile.png\n");

        let file = ConfigFile::load_from(&path).unwrap();
        assert!(matches!(
            file.apply(DownloadConfig::default()),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected_on_apply() {
        let (_dir, path) = write_config("[server]\ntimeout = 0\n");

        let file = ConfigFile::load_from(&path).unwrap();
        match file.apply(DownloadConfig::default()) {
            Err(ConfigFileError::InvalidValue { section, key, .. }) => {
                assert_eq!(section, "server");
                assert_eq!(key, "timeout");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_projection_section() {
        let (_dir, path) = write_config("[projection]\nworld_size_bits = 20\ntile_shift = 4\n");

        let config = ConfigFile::load_from(&path)
            .unwrap()
            .apply(DownloadConfig::default())
            .unwrap();

        let projection = config.projection();
        assert_eq!(projection.world_size_bits(), 20);
        assert_eq!(projection.tile_shift(), 4);
        assert_eq!(projection.max_zoom(), 16);
    }

    #[test]
    fn test_unusable_projection_rejected_on_apply() {
        let (_dir, path) = write_config("[projection]\nworld_size_bits = 40\n");

        let file = ConfigFile::load_from(&path).unwrap();
        match file.apply(DownloadConfig::default()) {
            Err(ConfigFileError::InvalidValue { section, reason, .. }) => {
                assert_eq!(section, "projection");
                assert!(reason.contains("Invalid projection"), "{}", reason);
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_policy_zero_is_forever() {
        assert_eq!(retry_policy(0, 0), RetryPolicy::default());
        assert_eq!(
            retry_policy(3, 50),
            RetryPolicy::fixed(3, Duration::from_millis(50))
        );
    }

    #[test]
    fn test_config_file_path() {
        assert!(config_file_path().ends_with("getmaps/config.ini"));
    }
}
