//! EngineConfig 单元测试

use crate::util::config::{ConfigError, EngineConfig, REPORTER_DEPTH_CEILING};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.framerate, 30);
    assert_eq!(config.max_call_depth, 1024);
    assert_eq!(config.warp_time(), Duration::from_millis(500));
    // 75% of a 30fps frame
    let expected = Duration::from_micros(25_000);
    let diff = config.work_time().abs_diff(expected);
    assert!(diff < Duration::from_micros(1), "work time {:?}", config.work_time());
}

#[test]
fn test_partial_ron_keeps_defaults() {
    let config = EngineConfig::from_ron_str("(framerate: 60, max_call_depth: 16)").unwrap();
    assert_eq!(config.framerate, 60);
    assert_eq!(config.max_call_depth, 16);
    assert_eq!(config.max_clones, 300);
    assert!(!config.turbo_mode);
}

#[test]
fn test_json_and_ron_agree() {
    let ron = EngineConfig::from_ron_str("(turbo_mode: true)").unwrap();
    let json = EngineConfig::from_json_str(r#"{"turbo_mode": true}"#).unwrap();
    assert_eq!(ron, json);
}

#[test]
fn test_ron_round_trip() {
    let config = EngineConfig {
        framerate: 60,
        work_fraction: 0.5,
        ..EngineConfig::default()
    };
    let text = config.to_ron_string().unwrap();
    assert_eq!(EngineConfig::from_ron_str(&text).unwrap(), config);
}

#[test]
fn test_zero_framerate_does_not_divide_by_zero() {
    let config = EngineConfig {
        framerate: 0,
        ..EngineConfig::default()
    };
    assert_eq!(config.frame_interval(), Duration::from_secs(1));
}

#[test]
fn test_reporter_depth_is_clamped() {
    assert_eq!(EngineConfig::default().reporter_depth(), 128);
    let config = EngineConfig::from_ron_str("(max_reporter_depth: 100000)").unwrap();
    assert_eq!(config.max_reporter_depth, 100_000);
    assert_eq!(config.reporter_depth(), REPORTER_DEPTH_CEILING);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".ron").tempfile().unwrap();
    write!(file, "(warp_time_ms: 250)").unwrap();
    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.warp_time(), Duration::from_millis(250));
}

#[test]
fn test_load_rejects_unknown_extension() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    let err = EngineConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "toml"));
}

#[test]
fn test_bad_ron_is_a_parse_error() {
    let err = EngineConfig::from_ron_str("(framerate: \"fast\")").unwrap_err();
    assert!(matches!(err, ConfigError::Ron(_)));
    assert!(err.to_string().starts_with("Config parse error"));
}
