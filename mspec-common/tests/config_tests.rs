//! Integration tests for bootstrap configuration resolution
//!
//! Tests that manipulate MSPEC_CONFIG are marked #[serial] so they do not
//! race on the process environment.

use mspec_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use mspec_common::mapping::FieldErrorPolicy;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

#[test]
#[serial]
fn test_cli_path_beats_environment() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-cli.toml")));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_path_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let config = TomlConfig::load_or_default(Some(Path::new("/nonexistent/mspec.toml"))).unwrap();
    assert_eq!(config.bind_address, TomlConfig::default().bind_address);
}

#[test]
#[serial]
fn test_existing_file_is_loaded() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "bind_address = \"127.0.0.1:5001\"").unwrap();
    writeln!(file, "field_error_policy = \"fail_record\"").unwrap();
    writeln!(file, "cors_origins = []").unwrap();

    env::set_var(CONFIG_ENV_VAR, file.path());
    let config = TomlConfig::load_or_default(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.bind_address, "127.0.0.1:5001");
    assert_eq!(config.field_error_policy, FieldErrorPolicy::FailRecord);
    assert!(config.cors_origins.is_empty());
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "bind_address = [unterminated").unwrap();

    let result = TomlConfig::load_or_default(Some(file.path()));
    assert!(result.is_err());
}
