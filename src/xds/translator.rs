//! Translation of a whole proxy.
//!
//! Listeners are independent of each other: each one writes only into its own
//! listener report, so they are translated in parallel on a rayon pool sized by
//! `worker_threads`. A panic while translating one listener is contained to that
//! listener. Results come back in proxy order.

use std::panic::{self, AssertUnwindSafe};

use envoy_types::pb::envoy::config::listener::v3::Listener as EnvoyListener;
use envoy_types::pb::envoy::config::route::v3::RouteConfiguration;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info, warn};

use crate::config::{TranslationConfig, TranslatorConfig};
use crate::model::{Listener, Proxy, Snapshot};
use crate::observability::MetricsRecorder;
use crate::plugins::{Params, PluginRegistry};
use crate::validation::{validate_listeners, ListenerErrorKind, ListenerReport, ProxyReport};
use crate::xds::listener_subsystem::ListenerSubsystemTranslatorFactory;

/// Everything one translation pass produces
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutput {
    /// Envoy listeners in proxy order; listeners without filter chains are left out
    pub listeners: Vec<EnvoyListener>,
    pub route_configurations: Vec<RouteConfiguration>,
    pub report: ProxyReport,
}

/// Output of a single listener
#[derive(Debug, Default)]
struct ListenerOutput {
    listener: Option<EnvoyListener>,
    route_configurations: Vec<RouteConfiguration>,
}

/// Translates proxies into envoy listeners and route configurations
#[derive(Debug, Clone)]
pub struct ProxyTranslator {
    registry: PluginRegistry,
    config: TranslationConfig,
    metrics: MetricsRecorder,
}

impl ProxyTranslator {
    pub fn new(registry: PluginRegistry, config: TranslationConfig) -> Self {
        Self { registry, config, metrics: MetricsRecorder::default() }
    }

    /// Translator configured from loaded settings
    pub fn from_config(registry: PluginRegistry, config: &TranslatorConfig) -> Self {
        Self {
            registry,
            config: config.translation.clone(),
            metrics: MetricsRecorder::new(config.observability.enable_metrics),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    /// Translate `proxy` against `snapshot`.
    ///
    /// Never fails: every problem is recorded in the returned report and the
    /// configuration is the best effort for the input.
    pub fn translate(&self, proxy: &Proxy, snapshot: &Snapshot) -> TranslationOutput {
        let span = crate::translation_span!("translate_proxy", proxy.name, listeners = proxy.listeners.len());
        let _guard = span.enter();

        let mut report = ProxyReport::for_proxy(proxy);
        validate_listeners(proxy, &mut report);
        report.listener_reports.resize_with(proxy.listeners.len(), ListenerReport::default);

        let params = Params::new(snapshot, &self.config);
        let outputs = self.translate_listeners(proxy, params, &mut report.listener_reports);

        let mut listeners = Vec::with_capacity(outputs.len());
        let mut route_configurations = Vec::new();
        for (listener, output) in proxy.listeners.iter().zip(outputs) {
            route_configurations.extend(output.route_configurations);
            match output.listener {
                Some(envoy_listener) if !envoy_listener.filter_chains.is_empty() => {
                    self.metrics.record_listener(listener.kind());
                    listeners.push(envoy_listener);
                }
                Some(_) => {
                    warn!(listener = %listener.name, "Dropping listener without filter chains");
                }
                None => {}
            }
        }

        self.metrics.record_route_configurations(route_configurations.len());
        self.metrics.record_report(&report);

        let (errors, warnings) = report.counts();
        info!(
            proxy = %proxy.name,
            listeners = listeners.len(),
            route_configurations = route_configurations.len(),
            errors,
            warnings,
            "Translated proxy"
        );

        TranslationOutput { listeners, route_configurations, report }
    }

    fn translate_listeners(
        &self,
        proxy: &Proxy,
        params: Params<'_>,
        reports: &mut [ListenerReport],
    ) -> Vec<ListenerOutput> {
        if proxy.listeners.is_empty() {
            return Vec::new();
        }

        let factory = ListenerSubsystemTranslatorFactory::new(&self.registry);
        let workers = self.config.effective_worker_threads().max(1);
        debug!(proxy = %proxy.name, workers, "Fanning out listener translation");

        match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| {
                proxy
                    .listeners
                    .par_iter()
                    .zip(reports.par_iter_mut())
                    .map(|(listener, report)| {
                        translate_listener_contained(&factory, proxy, listener, params, report)
                    })
                    .collect()
            }),
            Err(err) => {
                warn!(error = %err, "Failed to build listener worker pool, translating sequentially");
                proxy
                    .listeners
                    .iter()
                    .zip(reports.iter_mut())
                    .map(|(listener, report)| {
                        translate_listener_contained(&factory, proxy, listener, params, report)
                    })
                    .collect()
            }
        }
    }
}

/// Translate one listener, turning a panic into an error on its own report.
///
/// Whatever the panicking translation wrote into the report is discarded; the
/// report goes back to its state before translation started.
fn translate_listener_contained<'a>(
    factory: &ListenerSubsystemTranslatorFactory<'a>,
    proxy: &'a Proxy,
    listener: &'a Listener,
    params: Params<'a>,
    report: &mut ListenerReport,
) -> ListenerOutput {
    let before = report.clone();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        translate_listener(factory, proxy, listener, params, report)
    }));

    result.unwrap_or_else(|_| {
        let name = &listener.name;
        error!(listener = %name, "internal error: listener translation panicked");
        *report = before;
        report.add_error(
            ListenerErrorKind::Processing,
            format!("internal error: translation of listener {name} panicked"),
        );
        ListenerOutput::default()
    })
}

fn translate_listener<'a>(
    factory: &ListenerSubsystemTranslatorFactory<'a>,
    proxy: &'a Proxy,
    listener: &'a Listener,
    params: Params<'a>,
    report: &mut ListenerReport,
) -> ListenerOutput {
    let span = crate::translation_span!("compute_listener", listener.name, kind = listener.kind());
    let _guard = span.enter();

    let (listener_translator, route_config_translator) =
        factory.get_translators(proxy, listener, params, report);
    let envoy_listener = listener_translator.compute_listener(report);
    let route_configurations = route_config_translator.compute_route_configurations(report);

    debug!(
        listener = %listener.name,
        filter_chains = envoy_listener.filter_chains.len(),
        route_configurations = route_configurations.len(),
        "Translated listener"
    );

    ListenerOutput { listener: Some(envoy_listener), route_configurations }
}
