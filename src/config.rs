// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Only host-side tuning lives here. Stream names and the landmark cardinality
//! are compile-time constants (see [`crate::constants`]).

use crate::backends::camera::{CameraFacing, Size};
use crate::constants::{DEFAULT_CONVERTER_BUFFER_COUNT, DEFAULT_STREAM_ORIENTATION};
use crate::errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the platform configuration directory
const CONFIG_DIR_NAME: &str = "pose-camera";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera facing used when the pipeline first starts
    pub initial_facing: CameraFacing,
    /// Preferred capture resolution (None lets the frame source decide)
    pub target_resolution: Option<Size>,
    /// Output buffers allocated per GPU conversion handle
    pub converter_buffer_count: usize,
    /// Orientation handed to the streaming sink with the display surface
    pub stream_orientation_degrees: u32,
    /// Fallback log filter when RUST_LOG is not set
    pub log_filter: String,
    /// Log every joint angle report at info level
    pub log_reports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_facing: CameraFacing::Back,
            target_resolution: None,
            converter_buffer_count: DEFAULT_CONVERTER_BUFFER_COUNT,
            stream_orientation_degrees: DEFAULT_STREAM_ORIENTATION,
            log_filter: "warn".to_string(),
            log_reports: true,
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location, falling back to defaults if no file exists
    pub fn load() -> ConfigResult<Self> {
        match Self::default_path() {
            Ok(path) => Self::load_from(&path),
            Err(ConfigError::NoConfigDir) => {
                debug!("No configuration directory, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Load from a specific file, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config.sanitized())
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Replace values the pipeline cannot run with by their defaults
    ///
    /// A conversion handle needs at least one output buffer.
    pub fn sanitized(mut self) -> Self {
        if self.converter_buffer_count == 0 {
            self.converter_buffer_count = DEFAULT_CONVERTER_BUFFER_COUNT;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("pose-camera-test-{}-{}", name, std::process::id()))
            .join(CONFIG_FILE_NAME)
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = temp_config_path("missing");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_config_path("roundtrip");
        let config = Config {
            initial_facing: CameraFacing::Front,
            target_resolution: Some(Size::new(640, 480)),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_config_path("partial");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "initial_facing": "Front", "converter_buffer_count": 0 }"#)
            .unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.initial_facing, CameraFacing::Front);
        assert_eq!(loaded.converter_buffer_count, DEFAULT_CONVERTER_BUFFER_COUNT);
        assert_eq!(loaded.stream_orientation_degrees, DEFAULT_STREAM_ORIENTATION);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_config_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
