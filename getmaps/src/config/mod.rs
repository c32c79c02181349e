//! Configuration for download runs.
//!
//! [`DownloadConfig`] holds the values a run needs; [`ConfigFile`] reads
//! optional overrides from an INI file.

mod download;
mod file;

pub use download::{DownloadConfig, DEFAULT_FLUSH_INTERVAL};
pub use file::{config_directory, config_file_path, retry_policy, ConfigFile, ConfigFileError};
