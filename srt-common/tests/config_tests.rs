//! Unit tests for configuration and graceful degradation
//!
//! Tests that manipulate SRT_ROOT_FOLDER are marked #[serial] so they do not
//! race each other.

use serial_test::serial;
use srt_common::config::{
    default_root_folder, RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_defaults_when_toml_is_empty() {
    let config = TomlConfig::from_toml_str("").unwrap();

    assert_eq!(config.port, 5731);
    assert_eq!(config.bind, "127.0.0.1");
    assert_eq!(config.school_id, "default");
    assert_eq!(config.logging.level, "info");
    assert!(config.database_path.is_none());
    assert!(config.hierarchy_path.is_none());
}

#[test]
fn test_toml_values_override_defaults() {
    let text = r#"
        port = 6000
        school_id = "SCH-042"
        hierarchy_path = "/srv/srt/hierarchy.json"

        [logging]
        level = "debug"
    "#;
    let config = TomlConfig::from_toml_str(text).unwrap();

    assert_eq!(config.port, 6000);
    assert_eq!(config.school_id, "SCH-042");
    assert_eq!(
        config.hierarchy_path,
        Some(PathBuf::from("/srv/srt/hierarchy.json"))
    );
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let result = TomlConfig::from_toml_str("port = \"not a number\"");
    assert!(matches!(result, Err(srt_common::Error::Config(_))));
}

#[test]
fn test_explicit_missing_config_file_is_error() {
    let result = TomlConfig::load(Some(Path::new("/nonexistent/srt/config.toml")));
    assert!(result.is_err());
}

#[test]
fn test_explicit_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 7001\n").unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.port, 7001);
}

#[test]
#[serial]
fn test_resolver_cli_takes_precedence() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/srt-env-root");

    let cli = PathBuf::from("/tmp/srt-cli-root");
    let toml = PathBuf::from("/tmp/srt-toml-root");
    let resolved = RootFolderResolver::new(Some(&cli), Some(&toml)).resolve();
    assert_eq!(resolved, cli);

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/srt-env-root");

    let toml = PathBuf::from("/tmp/srt-toml-root");
    let resolved = RootFolderResolver::new(None, Some(&toml)).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/srt-env-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_falls_back_to_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new(None, None).resolve();
    assert_eq!(resolved, default_root_folder());
}

#[test]
fn test_initializer_paths() {
    let root = PathBuf::from("/tmp/srt-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("srt.db"));
    assert_eq!(initializer.pending_path(), root.join("pending_edits.json"));
}

#[test]
fn test_initializer_creates_directory_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("srt");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
}
