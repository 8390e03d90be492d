//! # Configuration Management
//!
//! Loads [`TranslatorConfig`] by layering built-in defaults, an optional
//! YAML/TOML/JSON file and `GATEWAY_TRANSLATOR__*` environment variables, then
//! validates the result.
//!
//! Nested keys use a double underscore, e.g.
//! `GATEWAY_TRANSLATOR__TRANSLATION__WORKER_THREADS=4`.

mod settings;

pub use settings::{ObservabilityConfig, TranslationConfig, TranslatorConfig};

use crate::errors::{Error, Result};
use config::{Config, Environment, File};
use std::path::Path;

/// Prefix of environment variables read by the loader
pub const ENV_PREFIX: &str = "GATEWAY_TRANSLATOR";

impl TranslatorConfig {
    /// Load configuration from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: TranslatorConfig = builder
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        tracing::debug!(
            worker_threads = config.translation.worker_threads,
            log_level = %config.observability.log_level,
            "Loaded translator configuration"
        );
        Ok(config)
    }

    /// Create configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true)
}
