//! # Observability Infrastructure
//!
//! Structured logging and translation metrics for the gateway translator.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::{describe_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;
use tracing::info;

/// Initialize logging and register metric descriptions.
///
/// Returns the recorder the translator should use.
pub fn init_observability(config: &ObservabilityConfig) -> MetricsRecorder {
    let installed = init_logging(config);

    if config.enable_metrics {
        describe_metrics();
    }

    info!(
        log_level = %config.log_level,
        json_logging = %config.json_logging,
        metrics_enabled = %config.enable_metrics,
        subscriber_installed = installed,
        "Observability initialized"
    );

    MetricsRecorder::new(config.enable_metrics)
}
