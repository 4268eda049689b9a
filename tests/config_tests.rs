//! Integration tests for server configuration loading

use graphql_http::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = ServerConfig::default();

    assert_eq!(config.server.address(), "127.0.0.1:4000");
    assert_eq!(config.server.path, "/graphql");
    assert!(!config.execution.debug);
    assert!(!config.execution.tracing);
    assert!(!config.execution.cache_control);
}

#[test]
fn test_full_yaml() {
    let yaml = r#"
server:
  host: 0.0.0.0
  port: 8080
  path: /api/graphql

execution:
  debug: true
  tracing: true
  cache_control: true
"#;

    let config = ServerConfig::from_yaml_str(yaml).unwrap();

    assert_eq!(config.server.address(), "0.0.0.0:8080");
    assert_eq!(config.server.path, "/api/graphql");
    assert!(config.execution.debug);
    assert!(config.execution.tracing);
    assert!(config.execution.cache_control);
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let yaml = r#"
server:
  port: 9000
"#;

    let config = ServerConfig::from_yaml_str(yaml).unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.path, "/graphql");
    assert_eq!(config.execution, ExecutionSettings::default());
}

#[test]
fn test_relative_path_is_rejected() {
    let yaml = r#"
server:
  path: graphql
"#;

    let err = ServerConfig::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPath(ref path) if path == "graphql"));
}

#[test]
fn test_malformed_yaml_is_rejected() {
    let err = ServerConfig::from_yaml_str("server: [unclosed").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "execution:\n  debug: true").unwrap();

    let config = ServerConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert!(config.execution.debug);
    assert_eq!(config.server, ServerSettings::default());
}

#[test]
fn test_missing_file_is_io_error() {
    let err = ServerConfig::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_settings_apply_to_options() {
    let mut options = QueryOptions::new(Arc::new(ResolverEngine::<()>::new()), ());
    let settings = ExecutionSettings {
        debug: true,
        tracing: true,
        cache_control: false,
    };

    options.apply_settings(&settings);

    assert!(options.debug);
    assert!(options.tracing);
    assert!(!options.cache_control);
}
