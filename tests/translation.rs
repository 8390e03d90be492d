//! End-to-end translation scenarios
//!
//! Each test translates a whole proxy through the public API and checks both
//! the generated envoy resources and the report.

mod common;

use common::{http_listener, load_fixture, prefix_route, proxy, route_to, snapshot, translator};
use envoy_types::pb::envoy::config::listener::v3::Listener as EnvoyListener;
use envoy_types::pb::envoy::config::route::v3::{
    route::Action as EnvoyAction, route_action::ClusterSpecifier, virtual_host::TlsRequirementType,
    Route as EnvoyRoute,
};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::http_connection_manager::RouteSpecifier;
use gateway_translator::model::{
    Destination, ListenerType, SslConfig, TcpDestination, TcpHost, TcpListener, VirtualHost,
};
use gateway_translator::plugins::tcp::{SNI_CLUSTER_FILTER_NAME, TCP_PROXY_FILTER_NAME};
use gateway_translator::plugins::Params;
use gateway_translator::validation::{
    ListenerReport, ListenerTypeReport, RouteErrorKind, RouteWarningKind, TcpHostErrorKind,
    TcpListenerReport, VirtualHostErrorKind,
};
use gateway_translator::xds::listener::TLS_INSPECTOR_FILTER_NAME;
use gateway_translator::xds::network_filter::decode_http_connection_manager;
use gateway_translator::xds::ListenerSubsystemTranslatorFactory;
use gateway_translator::{PluginRegistry, TranslationConfig};
use prost::Message;
use tracing_test::traced_test;

fn route_cluster(route: &EnvoyRoute) -> Option<&ClusterSpecifier> {
    match &route.action {
        Some(EnvoyAction::Route(action)) => action.cluster_specifier.as_ref(),
        _ => None,
    }
}

#[test]
fn two_ssl_configs_yield_two_chains_and_one_route_configuration() {
    let mut listener = http_listener(
        "https",
        8443,
        vec![VirtualHost::new(
            "default",
            ["*"],
            vec![route_to(Destination::upstream("ns1", "ratings"))],
        )],
    );
    listener.ssl_configurations = vec![
        SslConfig::files("/tls/a.crt", "/tls/a.key").with_sni_domains(["a.example.com"]),
        SslConfig::files("/tls/b.crt", "/tls/b.key").with_sni_domains(["b.example.com"]),
    ];

    let output = translator().translate(&proxy(vec![listener]), &snapshot());

    assert!(!output.report.has_errors(), "{:?}", output.report.error_messages());
    assert_eq!(output.listeners.len(), 1);
    let chains = &output.listeners[0].filter_chains;
    assert_eq!(chains.len(), 2);
    assert_eq!(chains[0].filters, chains[1].filters);
    assert_ne!(chains[0].filter_chain_match, chains[1].filter_chain_match);
    assert!(chains.iter().all(|chain| chain.transport_socket.is_some()));
    assert_eq!(output.listeners[0].listener_filters[0].name, TLS_INSPECTOR_FILTER_NAME);

    let hcm = decode_http_connection_manager(&chains[0].filters[0]).expect("connection manager");
    assert_eq!(hcm.stat_prefix, "https");

    assert_eq!(output.route_configurations.len(), 1);
    let route_config = &output.route_configurations[0];
    assert_eq!(route_config.name, "https");
    assert_eq!(route_config.virtual_hosts[0].require_tls, TlsRequirementType::All as i32);
}

#[test]
fn missing_upstream_is_a_warning_not_an_abort() {
    let listener = http_listener(
        "http",
        8080,
        vec![VirtualHost::new(
            "default",
            ["*"],
            vec![
                prefix_route("/missing", Destination::upstream("ns1", "missing")),
                prefix_route("/ratings", Destination::upstream("ns1", "ratings")),
            ],
        )],
    );

    let output = translator().translate(&proxy(vec![listener]), &snapshot());

    assert!(!output.report.has_errors());
    assert_eq!(
        output.report.warning_messages(),
        vec!["listener[0].virtual_host[0].route[0]: InvalidDestinationWarning: upstream ns1.missing not found (route default-route-0-matcher-0)"
            .to_string()]
    );

    let routes = &output.route_configurations[0].virtual_hosts[0].routes;
    assert_eq!(routes.len(), 2);
    assert_eq!(route_cluster(&routes[0]), Some(&ClusterSpecifier::Cluster("missing_ns1".into())));
    assert_eq!(route_cluster(&routes[1]), Some(&ClusterSpecifier::Cluster("ratings_ns1".into())));
}

#[test]
fn subset_keys_must_match_an_upstream_selector() {
    let listener = http_listener(
        "http",
        8080,
        vec![VirtualHost::new(
            "default",
            ["*"],
            vec![route_to(Destination::upstream("ns1", "reviews").with_subset([("version", "v2")]))],
        )],
    );

    let output = translator().translate(&proxy(vec![listener]), &snapshot());

    let listener_report = &output.report.listener_reports[0];
    let Some(ListenerTypeReport::Http(http)) = &listener_report.listener_type else {
        panic!("expected http report");
    };
    let route_report = &http.virtual_host_reports[0].route_reports[0];
    assert_eq!(route_report.errors.len(), 1);
    assert_eq!(route_report.errors[0].kind, RouteErrorKind::Processing);
    assert_eq!(
        route_report.errors[0].message,
        "route has a subset config, but none of the subsets in the upstream match it"
    );
    assert!(route_report.warnings.is_empty());
    assert_eq!(output.route_configurations[0].virtual_hosts[0].routes.len(), 1);
}

#[test]
fn shared_domains_are_reported_on_every_virtual_host() {
    let listener = http_listener(
        "http",
        8080,
        vec![
            VirtualHost::new("a", ["shop.example.com"], vec![route_to(Destination::upstream("ns1", "ratings"))]),
            VirtualHost::new("b", ["shop.example.com", "b.example.com"], vec![]),
            VirtualHost::new("c", ["c.example.com"], vec![]),
        ],
    );

    let output = translator().translate(&proxy(vec![listener]), &snapshot());

    let Some(ListenerTypeReport::Http(http)) = &output.report.listener_reports[0].listener_type
    else {
        panic!("expected http report");
    };
    for index in [0, 1] {
        assert_eq!(
            http.virtual_host_reports[index].errors.iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![VirtualHostErrorKind::DomainsNotUnique]
        );
    }
    assert!(http.virtual_host_reports[2].errors.is_empty());
    assert_eq!(output.route_configurations.len(), 1);
    assert_eq!(output.route_configurations[0].virtual_hosts.len(), 3);
}

#[test]
fn hybrid_and_tcp_listeners_from_yaml() {
    let input = load_fixture("hybrid_gateway.yaml");
    let output = translator().translate(&input.proxy, &input.snapshot);

    assert_eq!(output.listeners.len(), 2);

    let hybrid = &output.listeners[0];
    assert_eq!(hybrid.name, "hybrid");
    assert_eq!(hybrid.filter_chains.len(), 2);
    assert_eq!(hybrid.listener_filters[0].name, TLS_INSPECTOR_FILTER_NAME);

    let http_chain = &hybrid.filter_chains[0];
    let http_match = http_chain.filter_chain_match.as_ref().expect("http chain match");
    assert_eq!(http_match.server_names, vec!["api.example.com".to_string()]);
    assert!(http_chain.transport_socket.is_some());
    let hcm = decode_http_connection_manager(&http_chain.filters[0]).expect("connection manager");

    let tcp_chain = &hybrid.filter_chains[1];
    let tcp_match = tcp_chain.filter_chain_match.as_ref().expect("tcp chain match");
    assert_eq!(tcp_match.source_prefix_ranges[0].address_prefix, "10.0.0.0");
    let filter_names: Vec<&str> = tcp_chain.filters.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(filter_names, vec![SNI_CLUSTER_FILTER_NAME, TCP_PROXY_FILTER_NAME]);

    assert_eq!(output.route_configurations.len(), 1);
    let route_config = &output.route_configurations[0];
    assert!(route_config.name.starts_with("hybrid-"));
    assert_ne!(route_config.name, "hybrid");
    match hcm.route_specifier {
        Some(RouteSpecifier::Rds(rds)) => {
            assert_eq!(rds.route_config_name, route_config.name);
        }
        other => panic!("expected rds, got {other:?}"),
    }
    let vhost = &route_config.virtual_hosts[0];
    assert_eq!(vhost.require_tls, TlsRequirementType::All as i32);
    assert_eq!(vhost.routes[0].name, "api-route-0-reviews-matcher-0");
    let Some(EnvoyAction::Route(action)) = &vhost.routes[0].action else {
        panic!("expected route action");
    };
    assert!(action.metadata_match.is_some());

    let tcp = &output.listeners[1];
    assert_eq!(tcp.filter_chains.len(), 1);
    assert_eq!(tcp.filter_chains[0].name, "db");
    assert!(tcp.listener_filters.is_empty());

    let Some(ListenerTypeReport::Tcp(tcp_report)) = &output.report.listener_reports[1].listener_type
    else {
        panic!("expected tcp report");
    };
    assert!(tcp_report.tcp_host_reports[0].errors.is_empty());
    assert_eq!(tcp_report.tcp_host_reports[1].errors[0].kind, TcpHostErrorKind::InvalidDestination);
    assert_eq!(tcp_report.tcp_host_reports[1].errors[0].message, "upstream ns1.redis not found");
    assert_eq!(output.report.counts(), (1, 0));
}

#[test]
fn repeated_translation_is_byte_identical() {
    let input = load_fixture("hybrid_gateway.yaml");
    let mut listeners = input.proxy.listeners.clone();
    listeners.push(http_listener(
        "http",
        8080,
        vec![VirtualHost::new(
            "default",
            ["*"],
            vec![
                route_to(Destination::upstream("ns1", "missing")),
                prefix_route("/reviews", Destination::upstream("ns1", "reviews")),
            ],
        )],
    ));
    let proxy = gateway_translator::Proxy { listeners, ..input.proxy };

    let translator = translator();
    let first = translator.translate(&proxy, &input.snapshot);
    let second = translator.translate(&proxy, &input.snapshot);

    assert_eq!(first, second);
    let encode = |listeners: &[EnvoyListener]| -> Vec<Vec<u8>> {
        listeners.iter().map(Message::encode_to_vec).collect()
    };
    assert_eq!(encode(&first.listeners), encode(&second.listeners));
    let route_bytes = |output: &gateway_translator::TranslationOutput| -> Vec<Vec<u8>> {
        output.route_configurations.iter().map(Message::encode_to_vec).collect()
    };
    assert_eq!(route_bytes(&first), route_bytes(&second));
    assert_eq!(first.report.entries(), second.report.entries());
}

#[test]
fn duplicate_listener_ports_do_not_stop_translation() {
    let tcp = gateway_translator::model::Listener::new(
        "tcp",
        "::",
        8080,
        ListenerType::Tcp(TcpListener {
            tcp_hosts: vec![TcpHost {
                name: "ratings".into(),
                ssl_config: None,
                destination: Some(TcpDestination::Single(Destination::upstream("ns1", "ratings"))),
            }],
            stat_prefix: String::new(),
        }),
    );
    let http = http_listener(
        "http",
        8080,
        vec![VirtualHost::new("default", ["*"], vec![route_to(Destination::upstream("ns1", "ratings"))])],
    );

    let output = translator().translate(&proxy(vec![tcp, http]), &snapshot());

    assert_eq!(output.listeners.len(), 2);
    assert_eq!(
        output.report.error_messages(),
        vec![
            "listener[0]: BindPortNotUniqueError: bind port 8080 is shared by the following listeners: [tcp, http]".to_string(),
            "listener[1]: BindPortNotUniqueError: bind port 8080 is shared by the following listeners: [tcp, http]".to_string(),
        ]
    );
}

#[test]
#[traced_test]
fn mismatched_listener_report_is_repaired_and_logged() {
    let registry = PluginRegistry::with_defaults();
    let settings = TranslationConfig::default();
    let snapshot = snapshot();
    let listener = http_listener(
        "http",
        8080,
        vec![VirtualHost::new("default", ["*"], vec![route_to(Destination::upstream("ns1", "missing"))])],
    );
    let proxy = proxy(vec![listener.clone()]);

    let mut report = ListenerReport {
        errors: Vec::new(),
        listener_type: Some(ListenerTypeReport::Tcp(TcpListenerReport::default())),
    };
    let factory = ListenerSubsystemTranslatorFactory::new(&registry);
    let (listener_translator, route_translator) =
        factory.get_translators(&proxy, &listener, Params::new(&snapshot, &settings), &mut report);
    let envoy_listener = listener_translator.compute_listener(&mut report);
    let route_configurations = route_translator.compute_route_configurations(&mut report);

    assert!(logs_contain("internal error"));
    assert_eq!(envoy_listener.filter_chains.len(), 1);
    assert_eq!(route_configurations.len(), 1);

    let http = report.http_mut().expect("repaired http report");
    let warnings = &http.virtual_host_reports[0].route_reports[0].warnings;
    assert_eq!(warnings[0].kind, RouteWarningKind::InvalidDestination);
}
