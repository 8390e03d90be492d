//! Built-in TCP proxy plugin
//!
//! Turns every TCP host of a TCP listener into one filter chain ending in a
//! `tcp_proxy` network filter. Hosts with an SSL config are gated by SNI and
//! terminate TLS.

use envoy_types::pb::envoy::config::listener::v3::{Filter, FilterChain, FilterChainMatch};
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::{
    tcp_proxy::{
        weighted_cluster::ClusterWeight as TcpClusterWeight, ClusterSpecifier, WeightedCluster,
    },
    TcpProxy,
};
use tracing::{debug, warn};

use super::{Params, Plugin, TcpFilterChainPlugin};
use crate::errors::TranslationError;
use crate::model::{Listener, TcpDestination, TcpHost, TcpListener, WeightedDestination};
use crate::validation::{
    check_that_subset_matches_upstream, destination_to_upstream_ref,
    validate_tcp_route_destinations, TcpHostErrorKind, TcpListenerReport,
};
use crate::xds::network_filter::typed_network_filter;
use crate::xds::ssl::SslConfigTranslator;
use crate::xds::utils::{lb_metadata, upstream_to_cluster_name};

/// Registered name of the built-in TCP plugin
pub const TCP_PLUGIN_NAME: &str = "tcp";

pub const TCP_PROXY_FILTER_NAME: &str = "envoy.filters.network.tcp_proxy";
pub const SNI_CLUSTER_FILTER_NAME: &str = "envoy.filters.network.sni_cluster";

const TCP_PROXY_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.tcp_proxy.v3.TcpProxy";
const SNI_CLUSTER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.sni_cluster.v3.SniCluster";

/// Builds one filter chain per TCP host
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpPlugin {
    ssl: SslConfigTranslator,
}

impl TcpPlugin {
    pub fn new() -> Self {
        Self { ssl: SslConfigTranslator::new() }
    }

    fn filter_chain_for_host(
        &self,
        params: &Params<'_>,
        stat_prefix: &str,
        host: &TcpHost,
    ) -> Result<FilterChain, TranslationError> {
        let filters = self.tcp_filters(params, stat_prefix, host)?;

        let (filter_chain_match, transport_socket) = match &host.ssl_config {
            Some(ssl_config) => {
                let socket = self.ssl.resolve_downstream_ssl_config(ssl_config)?;
                let chain_match = FilterChainMatch {
                    server_names: ssl_config.sni_domains.clone(),
                    ..Default::default()
                };
                (Some(chain_match), Some(socket))
            }
            None => (None, None),
        };

        Ok(FilterChain {
            name: host.name.clone(),
            filter_chain_match,
            filters,
            transport_socket,
            ..Default::default()
        })
    }

    fn tcp_filters(
        &self,
        params: &Params<'_>,
        stat_prefix: &str,
        host: &TcpHost,
    ) -> Result<Vec<Filter>, TranslationError> {
        let tcp_proxy = |cluster_specifier| TcpProxy {
            stat_prefix: stat_prefix.to_string(),
            cluster_specifier: Some(cluster_specifier),
            ..Default::default()
        };

        let filters = match host.destination.as_ref() {
            Some(TcpDestination::Single(destination)) => {
                check_that_subset_matches_upstream(params.snapshot, params.settings, destination)?;
                let upstream = destination_to_upstream_ref(destination, params.settings);
                let proxy = tcp_proxy(ClusterSpecifier::Cluster(upstream_to_cluster_name(&upstream)));
                vec![typed_network_filter(TCP_PROXY_FILTER_NAME, TCP_PROXY_TYPE_URL, &proxy)]
            }
            Some(TcpDestination::Multi(multi)) => {
                let weighted = weighted_clusters(params, &multi.destinations)?;
                let proxy = tcp_proxy(ClusterSpecifier::WeightedClusters(weighted));
                vec![typed_network_filter(TCP_PROXY_FILTER_NAME, TCP_PROXY_TYPE_URL, &proxy)]
            }
            Some(TcpDestination::UpstreamGroup(reference)) => {
                let group = params.snapshot.find_upstream_group(reference)?;
                let weighted = weighted_clusters(params, &group.destinations)?;
                let proxy = tcp_proxy(ClusterSpecifier::WeightedClusters(weighted));
                vec![typed_network_filter(TCP_PROXY_FILTER_NAME, TCP_PROXY_TYPE_URL, &proxy)]
            }
            Some(TcpDestination::ForwardSniClusterName) => {
                // The sni_cluster filter rewrites the cluster from the SNI before tcp_proxy runs
                let proxy = tcp_proxy(ClusterSpecifier::Cluster(String::new()));
                vec![
                    typed_network_filter(SNI_CLUSTER_FILTER_NAME, SNI_CLUSTER_TYPE_URL, &()),
                    typed_network_filter(TCP_PROXY_FILTER_NAME, TCP_PROXY_TYPE_URL, &proxy),
                ]
            }
            None => return Err(TranslationError::MissingDestination),
        };

        Ok(filters)
    }
}

fn weighted_clusters(
    params: &Params<'_>,
    destinations: &[WeightedDestination],
) -> Result<WeightedCluster, TranslationError> {
    if destinations.is_empty() {
        return Err(TranslationError::NoDestinationSpecified);
    }

    let clusters = destinations
        .iter()
        .map(|weighted| {
            check_that_subset_matches_upstream(params.snapshot, params.settings, &weighted.destination)?;
            let upstream = destination_to_upstream_ref(&weighted.destination, params.settings);
            Ok(TcpClusterWeight {
                name: upstream_to_cluster_name(&upstream),
                weight: weighted.weight,
                metadata_match: weighted
                    .destination
                    .subset
                    .as_ref()
                    .filter(|subset| !subset.values.is_empty())
                    .map(|subset| lb_metadata(&subset.values)),
                ..Default::default()
            })
        })
        .collect::<Result<Vec<_>, TranslationError>>()?;

    Ok(WeightedCluster { clusters, ..Default::default() })
}

impl Plugin for TcpPlugin {
    fn name(&self) -> &str {
        TCP_PLUGIN_NAME
    }
}

impl TcpFilterChainPlugin for TcpPlugin {
    fn create_tcp_filter_chains(
        &self,
        params: &Params<'_>,
        parent: &Listener,
        listener: &TcpListener,
        report: &mut TcpListenerReport,
    ) -> Result<Vec<FilterChain>, TranslationError> {
        let stat_prefix =
            if listener.stat_prefix.is_empty() { &parent.name } else { &listener.stat_prefix };

        let mut chains = Vec::with_capacity(listener.tcp_hosts.len());
        for (index, host) in listener.tcp_hosts.iter().enumerate() {
            if let Err(err) = validate_tcp_route_destinations(params, host.destination.as_ref()) {
                warn!(listener = %parent.name, tcp_host = %host.name, error = %err, "Skipping TCP host with invalid destination");
                report
                    .tcp_host_report_mut(index)
                    .add_error(TcpHostErrorKind::InvalidDestination, err.to_string());
                continue;
            }

            match self.filter_chain_for_host(params, stat_prefix, host) {
                Ok(chain) => chains.push(chain),
                Err(err) => {
                    warn!(listener = %parent.name, tcp_host = %host.name, error = %err, "Skipping TCP host");
                    report
                        .tcp_host_report_mut(index)
                        .add_error(TcpHostErrorKind::Processing, err.to_string());
                }
            }
        }

        debug!(listener = %parent.name, filter_chains = chains.len(), "Built TCP filter chains");
        Ok(chains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslationConfig;
    use crate::model::{
        Destination, ListenerType, MultiDestination, SslConfig, Snapshot, Upstream,
    };
    use envoy_types::pb::envoy::config::listener::v3::filter::ConfigType as FilterConfigType;
    use prost::Message;

    fn host(name: &str, destination: Option<TcpDestination>) -> TcpHost {
        TcpHost { name: name.into(), ssl_config: None, destination }
    }

    fn decode_tcp_proxy(filter: &Filter) -> TcpProxy {
        let Some(FilterConfigType::TypedConfig(any)) = &filter.config_type else {
            panic!("expected typed config");
        };
        assert_eq!(any.type_url, TCP_PROXY_TYPE_URL);
        TcpProxy::decode(any.value.as_slice()).expect("decode tcp proxy")
    }

    fn translate(listener: TcpListener, snapshot: &Snapshot) -> (Vec<FilterChain>, TcpListenerReport) {
        let settings = TranslationConfig::default();
        let params = Params::new(snapshot, &settings);
        let parent = Listener::new("tcp", "0.0.0.0", 9000, ListenerType::Tcp(listener.clone()));
        let mut report = TcpListenerReport::for_listener(&listener);
        let chains = TcpPlugin::new()
            .create_tcp_filter_chains(&params, &parent, &listener, &mut report)
            .expect("tcp plugin never fails as a whole");
        (chains, report)
    }

    #[test]
    fn one_chain_per_host() {
        let snapshot = Snapshot::new(
            vec![Upstream::new("ns1", "db"), Upstream::new("ns1", "cache")],
            vec![],
        );
        let multi = TcpDestination::Multi(MultiDestination {
            destinations: vec![
                WeightedDestination::new(Destination::upstream("ns1", "db"), 3),
                WeightedDestination::new(Destination::upstream("ns1", "cache"), 1),
            ],
        });
        let mut tls_host = host("tls", Some(TcpDestination::Single(Destination::upstream("ns1", "db"))));
        tls_host.ssl_config =
            Some(SslConfig::files("/certs/tls.crt", "/certs/tls.key").with_sni_domains(["db.example.com"]));

        let listener = TcpListener {
            tcp_hosts: vec![
                host("single", Some(TcpDestination::Single(Destination::upstream("ns1", "db")))),
                host("split", Some(multi)),
                host("sni", Some(TcpDestination::ForwardSniClusterName)),
                tls_host,
            ],
            stat_prefix: String::new(),
        };
        let (chains, report) = translate(listener, &snapshot);
        assert_eq!(chains.len(), 4);
        assert!(report.tcp_host_reports.iter().all(|host| host.errors.is_empty()));

        let single = decode_tcp_proxy(&chains[0].filters[0]);
        assert_eq!(single.stat_prefix, "tcp");
        assert_eq!(single.cluster_specifier, Some(ClusterSpecifier::Cluster("db_ns1".into())));

        let split = decode_tcp_proxy(&chains[1].filters[0]);
        let Some(ClusterSpecifier::WeightedClusters(weighted)) = split.cluster_specifier else {
            panic!("expected weighted clusters");
        };
        let entries: Vec<(&str, u32)> =
            weighted.clusters.iter().map(|c| (c.name.as_str(), c.weight)).collect();
        assert_eq!(entries, vec![("db_ns1", 3), ("cache_ns1", 1)]);

        assert_eq!(chains[2].filters.len(), 2);
        assert_eq!(chains[2].filters[0].name, SNI_CLUSTER_FILTER_NAME);
        assert_eq!(chains[2].filters[1].name, TCP_PROXY_FILTER_NAME);

        let tls_match = chains[3].filter_chain_match.as_ref().expect("sni match");
        assert_eq!(tls_match.server_names, vec!["db.example.com"]);
        assert!(chains[3].transport_socket.is_some());
    }

    #[test]
    fn invalid_hosts_are_reported_and_skipped() {
        let snapshot = Snapshot::new(vec![Upstream::new("ns1", "db")], vec![]);
        let listener = TcpListener {
            tcp_hosts: vec![
                host("missing", Some(TcpDestination::Single(Destination::upstream("ns1", "gone")))),
                host("none", None),
                host("ok", Some(TcpDestination::Single(Destination::upstream("ns1", "db")))),
            ],
            stat_prefix: "edge".into(),
        };
        let (chains, report) = translate(listener, &snapshot);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].name, "ok");
        assert_eq!(decode_tcp_proxy(&chains[0].filters[0]).stat_prefix, "edge");

        assert_eq!(report.tcp_host_reports[0].errors[0].kind, TcpHostErrorKind::InvalidDestination);
        assert_eq!(report.tcp_host_reports[1].errors[0].kind, TcpHostErrorKind::InvalidDestination);
        assert!(report.tcp_host_reports[2].errors.is_empty());
    }
}
