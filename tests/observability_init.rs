//! Global subscriber installation.
//!
//! Kept in its own test binary: installing the global default subscriber would
//! hide log lines from `#[traced_test]` tests running in the same process.

use gateway_translator::observability::{init_logging, init_observability};
use gateway_translator::ObservabilityConfig;

#[test]
fn init_installs_once_and_returns_recorder() {
    let config = ObservabilityConfig { enable_metrics: false, ..Default::default() };

    let recorder = init_observability(&config);
    assert!(!recorder.is_enabled());

    // A subscriber is now installed, so further calls change nothing.
    assert!(!init_logging(&config));
    assert!(!init_logging(&ObservabilityConfig { json_logging: true, ..Default::default() }));
}
