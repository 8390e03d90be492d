//! Common fixtures for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use gateway_translator::model::{
    Action, Destination, HttpListener, Listener, ListenerType, Matcher, Route, RouteAction,
    RouteDestination, Upstream, UpstreamGroup, VirtualHost, WeightedDestination,
};
use gateway_translator::observability::MetricsRecorder;
use gateway_translator::{
    PluginRegistry, Proxy, ProxyTranslator, Snapshot, TranslationConfig, TranslationInput,
};

/// Path of a file under `tests/fixtures`
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

pub fn load_fixture(name: &str) -> TranslationInput {
    TranslationInput::from_path(&fixture_path(name)).expect("fixture parses")
}

/// Upstreams `ns1.reviews` (subset selector `{region}`) and `ns1.ratings`,
/// plus the 90/10 upstream group `ns1.canary` across them
pub fn snapshot() -> Snapshot {
    Snapshot::new(
        vec![
            Upstream::new("ns1", "reviews").with_subset_selectors([vec!["region"]]),
            Upstream::new("ns1", "ratings"),
        ],
        vec![UpstreamGroup::new(
            "ns1",
            "canary",
            vec![
                WeightedDestination::new(Destination::upstream("ns1", "reviews"), 90),
                WeightedDestination::new(Destination::upstream("ns1", "ratings"), 10),
            ],
        )],
    )
}

pub fn route_to(destination: Destination) -> Route {
    Route::new(Action::RouteAction(RouteAction::new(RouteDestination::Single(destination))))
}

pub fn prefix_route(prefix: &str, destination: Destination) -> Route {
    route_to(destination).with_matchers(vec![Matcher::prefix(prefix)])
}

pub fn http_listener(name: &str, port: u32, virtual_hosts: Vec<VirtualHost>) -> Listener {
    Listener::new(
        name,
        "::",
        port,
        ListenerType::Http(HttpListener { virtual_hosts, stat_prefix: String::new() }),
    )
}

pub fn proxy(listeners: Vec<Listener>) -> Proxy {
    Proxy { name: "gateway-proxy".into(), namespace: "gloo-system".into(), listeners }
}

/// Translator with the built-in plugins, two workers and metrics off
pub fn translator() -> ProxyTranslator {
    let config = TranslationConfig { worker_threads: 2, ..Default::default() };
    ProxyTranslator::new(PluginRegistry::with_defaults(), config)
        .with_metrics(MetricsRecorder::new(false))
}
