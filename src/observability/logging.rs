//! # Structured Logging
//!
//! Subscriber initialisation and span macros for translation passes.
//!
//! Every translation pass runs inside a span carrying an `operation_id`, so the
//! log lines of one listener (or one route configuration) can be correlated when
//! listeners are translated concurrently.

use crate::config::ObservabilityConfig;
use tracing_subscriber::EnvFilter;

/// Create a tracing span for a listener translation step
#[macro_export]
macro_rules! translation_span {
    ($operation:expr, $listener:expr) => {
        tracing::info_span!(
            "translation",
            operation = %$operation,
            listener = %$listener,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $listener:expr, $($field:tt)*) => {
        tracing::info_span!(
            "translation",
            operation = %$operation,
            listener = %$listener,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for building one route configuration
#[macro_export]
macro_rules! route_config_span {
    ($route_config:expr) => {
        tracing::debug_span!(
            "route_configuration",
            route_config = %$route_config,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($route_config:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "route_configuration",
            route_config = %$route_config,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` overrides the configured level. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_ascii_lowercase()));

    let result = if config.json_logging {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().json().with_env_filter(filter).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().with_env_filter(filter).finish(),
        )
    };

    // Subscriber already set elsewhere (e.g. integration tests); ignore.
    result.is_ok()
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::TranslatorConfig) {
    tracing::info!(
        worker_threads = config.translation.effective_worker_threads(),
        consul_upstream_namespace = %config.translation.consul_upstream_namespace,
        metrics_enabled = %config.observability.enable_metrics,
        json_logging = %config.observability.json_logging,
        "Gateway translator configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macros_compile() {
        let _span = translation_span!("compute_listener", "gateway");
        let _span = translation_span!("compute_listener", "gateway", kind = "http");
        let _span = route_config_span!("gateway");
        let _span = route_config_span!("gateway", virtual_hosts = 3);
    }

    #[test]
    fn test_log_config_info() {
        let config = crate::config::TranslatorConfig::default();

        // This should not panic
        log_config_info(&config);
    }
}
