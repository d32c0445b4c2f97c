//! Tests for config file resolution and TOML loading
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that manipulate PARTYDJ_CONFIG are marked with #[serial].

use partydj_common::config::{
    env_override, load_toml_config, write_toml_config, ConfigFileResolver, LoggingConfig,
    CONFIG_ENV_VAR,
};
use serde::{Deserialize, Serialize};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct SampleConfig {
    logging: LoggingConfig,
    api_key: Option<String>,
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");

    let resolver = ConfigFileResolver::new("partydj-test");
    let cli = PathBuf::from("/from/cli.toml");
    assert_eq!(resolver.resolve(Some(&cli)), Some(cli));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");

    let resolver = ConfigFileResolver::new("partydj-test");
    assert_eq!(resolver.resolve(None), Some(PathBuf::from("/from/env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let config: SampleConfig = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config, SampleConfig::default());
    assert_eq!(config.logging.level, "info");

    let config: SampleConfig = load_toml_config(None).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_invalid_toml_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "api_key = [unterminated").unwrap();

    let result: partydj_common::Result<SampleConfig> = load_toml_config(Some(&path));
    assert!(matches!(result, Err(partydj_common::Error::Config(_))));
}

#[test]
fn test_write_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("service.toml");

    let config = SampleConfig {
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        api_key: Some("secret-key".to_string()),
    };
    write_toml_config(&config, &path).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists());

    let loaded: SampleConfig = load_toml_config(Some(&path)).unwrap();
    assert_eq!(loaded, config);
}

#[test]
#[serial]
fn test_env_override_ignores_blank_values() {
    env::set_var("PARTYDJ_TEST_BLANK", "   ");
    assert_eq!(env_override("PARTYDJ_TEST_BLANK"), None);

    env::set_var("PARTYDJ_TEST_BLANK", "value");
    assert_eq!(env_override("PARTYDJ_TEST_BLANK"), Some("value".to_string()));

    env::remove_var("PARTYDJ_TEST_BLANK");
}
