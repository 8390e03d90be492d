//! # Metrics Collection
//!
//! Translation counters emitted through the `metrics` facade. No exporter is
//! installed here; the embedding process decides where the counters go.

use crate::validation::ProxyReport;
use metrics::{counter, describe_counter, Unit};

/// Records translation counters, or nothing when disabled
#[derive(Debug, Clone, Copy)]
pub struct MetricsRecorder {
    enabled: bool,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MetricsRecorder {
    /// Create a recorder
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether counters are emitted
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a translated listener of the given kind
    pub fn record_listener(&self, kind: &'static str) {
        if !self.enabled {
            return;
        }
        counter!("gateway_translator_listeners_translated_total", "kind" => kind).increment(1);
    }

    /// Record emitted route configurations
    pub fn record_route_configurations(&self, count: usize) {
        if !self.enabled || count == 0 {
            return;
        }
        counter!("gateway_translator_route_configurations_total").increment(count as u64);
    }

    /// Record the error and warning totals of a finished report
    pub fn record_report(&self, report: &ProxyReport) {
        if !self.enabled {
            return;
        }
        let (errors, warnings) = report.counts();
        if errors > 0 {
            counter!("gateway_translator_report_errors_total").increment(errors as u64);
        }
        if warnings > 0 {
            counter!("gateway_translator_report_warnings_total").increment(warnings as u64);
        }
    }
}

/// Register descriptions of the translation counters
pub fn describe_metrics() {
    describe_counter!(
        "gateway_translator_listeners_translated_total",
        Unit::Count,
        "Number of listeners translated, by listener kind"
    );
    describe_counter!(
        "gateway_translator_route_configurations_total",
        Unit::Count,
        "Number of route configurations produced"
    );
    describe_counter!(
        "gateway_translator_report_errors_total",
        Unit::Count,
        "Number of errors written into translation reports"
    );
    describe_counter!(
        "gateway_translator_report_warnings_total",
        Unit::Count,
        "Number of warnings written into translation reports"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_without_exporter() {
        describe_metrics();
        let recorder = MetricsRecorder::default();
        assert!(recorder.is_enabled());
        recorder.record_listener("http");
        recorder.record_route_configurations(2);
        recorder.record_report(&ProxyReport::default());

        let disabled = MetricsRecorder::new(false);
        assert!(!disabled.is_enabled());
        disabled.record_listener("tcp");
    }
}
