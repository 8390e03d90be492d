//! # Configuration Settings
//!
//! Defines the configuration structure for the gateway translator.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Log levels accepted by `observability.log_level`
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main translator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Translation pass configuration
    #[validate(nested)]
    pub translation: TranslationConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl TranslatorConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        self.validate_custom()?;

        Ok(())
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        let level = self.observability.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::validation_field(
                format!(
                    "Log level '{}' must be one of {}",
                    self.observability.log_level,
                    LOG_LEVELS.join(", ")
                ),
                "observability.log_level",
            ));
        }

        if self.translation.graphql_placeholder_cluster.contains(char::is_whitespace) {
            return Err(Error::validation_field(
                "GraphQL placeholder cluster name cannot contain whitespace",
                "translation.graphql_placeholder_cluster",
            ));
        }

        Ok(())
    }
}

/// Settings that shape the generated configuration and the translation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TranslationConfig {
    /// Listeners translated concurrently (0 = one per CPU)
    #[validate(range(max = 256, message = "Worker threads must be between 0 and 256"))]
    pub worker_threads: usize,

    /// Namespace Consul service destinations are aliased into
    #[validate(length(min = 1, message = "Consul upstream namespace cannot be empty"))]
    pub consul_upstream_namespace: String,

    /// Cluster emitted for GraphQL routes until a later stage resolves them
    #[validate(length(min = 1, message = "GraphQL placeholder cluster cannot be empty"))]
    pub graphql_placeholder_cluster: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            consul_upstream_namespace: "gloo-system".to_string(),
            graphql_placeholder_cluster: "graphql.dummy.cluster".to_string(),
        }
    }
}

impl TranslationConfig {
    /// Effective number of worker threads
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        }
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Emit translation counters through the `metrics` facade
    pub enable_metrics: bool,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { enable_metrics: true, log_level: "info".to_string(), json_logging: false }
    }
}
