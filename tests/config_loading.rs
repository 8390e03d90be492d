//! Layered configuration loading: defaults, file, environment

use std::io::Write;
use std::sync::Mutex;

use gateway_translator::{Error, TranslatorConfig};

// Tests in this file mutate process environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const WORKERS_VAR: &str = "GATEWAY_TRANSLATOR__TRANSLATION__WORKER_THREADS";

fn yaml_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_apply_without_file_or_environment() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::env::remove_var(WORKERS_VAR);

    let config = TranslatorConfig::from_env().expect("default config");
    assert_eq!(config, TranslatorConfig::default());
}

#[test]
fn file_values_override_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::env::remove_var(WORKERS_VAR);

    let file = yaml_file(
        r#"
translation:
  worker_threads: 3
  consul_upstream_namespace: consul
observability:
  log_level: debug
  enable_metrics: false
"#,
    );
    let config = TranslatorConfig::load(Some(file.path())).expect("load config");

    assert_eq!(config.translation.worker_threads, 3);
    assert_eq!(config.translation.consul_upstream_namespace, "consul");
    assert_eq!(config.translation.graphql_placeholder_cluster, "graphql.dummy.cluster");
    assert_eq!(config.observability.log_level, "debug");
    assert!(!config.observability.enable_metrics);
}

#[test]
fn environment_overrides_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let file = yaml_file("translation:\n  worker_threads: 3\n");

    std::env::set_var(WORKERS_VAR, "6");
    let result = TranslatorConfig::load(Some(file.path()));
    std::env::remove_var(WORKERS_VAR);

    assert_eq!(result.expect("load config").translation.worker_threads, 6);
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::env::remove_var(WORKERS_VAR);

    let file = yaml_file("translation:\n  worker_threads: 1000\n");
    let err = TranslatorConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "{err}");

    let file = yaml_file("observability:\n  log_level: loud\n");
    let err = TranslatorConfig::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("loud"));

    std::env::set_var(WORKERS_VAR, "many");
    let result = TranslatorConfig::from_env();
    std::env::remove_var(WORKERS_VAR);
    assert!(matches!(result, Err(Error::Config { .. })));
}
