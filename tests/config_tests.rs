// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use pose_camera::{CameraFacing, Config};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.initial_facing, CameraFacing::Back);
    assert_eq!(config.converter_buffer_count, 2);
    assert_eq!(config.stream_orientation_degrees, 90);
    assert!(config.target_resolution.is_none());
    assert!(config.log_reports, "Reports should be logged by default");
}

#[test]
fn test_config_log_filter_defaults_to_warn() {
    assert_eq!(Config::default().log_filter, "warn");
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = std::env::temp_dir().join(format!("pose-camera-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = Config::load_from(&path);
    assert!(result.is_err(), "Malformed file should not fall back silently");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_sanitized_restores_buffer_count() {
    let config = Config {
        converter_buffer_count: 0,
        ..Config::default()
    };
    assert_eq!(config.sanitized().converter_buffer_count, 2);
}
