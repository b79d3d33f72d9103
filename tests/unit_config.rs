use std::fs;

use clap::Parser;
use shacl_validator::{CliArgs, ServerConfig};

#[test]
fn merges_config_file_and_cli_overrides() {
    let resources = tempfile::tempdir().expect("resources tempdir");
    let config_dir = tempfile::tempdir().expect("config tempdir");
    let config_path = config_dir.path().join("server.yaml");
    let yaml = format!(
        "resource_root: {}\nfetch_timeout_secs: 5\nhydra_root_path: /shacl/\nshacl_extensions:\n  - TTL\n  - rdf\n",
        resources.path().display()
    );
    fs::write(&config_path, yaml).expect("write config");

    let args = CliArgs::parse_from([
        "shacl-validator",
        "--config",
        config_path.to_str().expect("utf8 path"),
        "--fetch-timeout-secs",
        "12",
        "--shacl-extensions",
        ".ttl,NT,ttl",
        "--domains",
        "any, other,",
        "--hydra-server",
        "https://itb.example.org/",
    ]);
    let config = ServerConfig::from_args(args).expect("config");

    assert_eq!(config.resource_root, resources.path().to_path_buf());
    assert_eq!(config.fetch_timeout_secs, 12);
    assert_eq!(
        config.shacl_extensions,
        vec!["nt".to_string(), "ttl".to_string()]
    );
    let mut enabled = config.enabled_domains.clone().expect("enabled set");
    assert!(enabled.remove("any"));
    assert!(enabled.remove("other"));
    assert!(enabled.is_empty());
    assert_eq!(config.hydra_server, "https://itb.example.org");
    assert_eq!(config.hydra_root_path, "/shacl");
    assert_eq!(
        config.http_bind_address,
        "127.0.0.1:8080".parse().expect("default bind")
    );
    config.validate().expect("valid config");
}

#[test]
fn json_config_files_are_read() {
    let config_dir = tempfile::tempdir().expect("config tempdir");
    let config_path = config_dir.path().join("server.json");
    fs::write(
        &config_path,
        r#"{ "accept_types": ["text/turtle", "TEXT/TURTLE", "application/rdf+xml"], "max_import_depth": 2 }"#,
    )
    .expect("write config");

    let config = ServerConfig::from_args(CliArgs {
        config: Some(config_path),
        ..CliArgs::default()
    })
    .expect("config");
    assert_eq!(
        config.accept_types,
        vec!["text/turtle".to_string(), "application/rdf+xml".to_string()]
    );
    assert_eq!(config.max_import_depth, 2);
}

#[test]
fn empty_extensions_is_error() {
    let args = CliArgs {
        shacl_extensions: Some(vec![" ".to_string()]),
        ..CliArgs::default()
    };
    let err = ServerConfig::from_args(args).expect_err("expected failure");
    assert!(err.to_string().contains("at least one SHACL file extension"));
}

#[test]
fn unsupported_config_extension_is_error() {
    let config_dir = tempfile::tempdir().expect("config tempdir");
    let config_path = config_dir.path().join("server.toml");
    fs::write(&config_path, "resource_root = 'x'").expect("write config");

    let err = ServerConfig::from_args(CliArgs {
        config: Some(config_path),
        ..CliArgs::default()
    })
    .expect_err("toml is not read");
    assert!(err.to_string().contains("unsupported config extension"));
}

#[test]
fn validate_rejects_missing_root_and_unknown_accept_types() {
    let missing = ServerConfig {
        resource_root: std::path::PathBuf::from("/this/does/not/exist"),
        ..ServerConfig::default()
    };
    let err = missing.validate().expect_err("missing root");
    assert!(err.to_string().contains("does not exist"));

    let resources = tempfile::tempdir().expect("resources tempdir");
    let html = ServerConfig {
        resource_root: resources.path().to_path_buf(),
        accept_types: vec!["text/html".to_string()],
        ..ServerConfig::default()
    };
    let err = html.validate().expect_err("html is not RDF");
    assert!(err.to_string().contains("text/html"));
}

#[test]
fn extension_checks_ignore_case() {
    let config = ServerConfig::default();
    assert!(config.accepts_shacl_extension("TTL"));
    assert!(config.accepts_shacl_extension("jsonld"));
    assert!(!config.accepts_shacl_extension("txt"));
    assert!(config.is_domain_enabled("anything"));
}

#[test]
fn fetch_size_limit_comes_from_file_or_default() {
    let config_dir = tempfile::tempdir().expect("config tempdir");
    let config_path = config_dir.path().join("server.yaml");
    fs::write(&config_path, "max_fetch_bytes: 1024\n").expect("write config");

    let config = ServerConfig::from_args(CliArgs {
        config: Some(config_path),
        ..CliArgs::default()
    })
    .expect("config");
    assert_eq!(config.max_fetch_bytes, 1024);

    let defaults = ServerConfig::from_args(CliArgs::default()).expect("defaults");
    assert_eq!(defaults.max_fetch_bytes, 32 * 1024 * 1024);
}
