//! Filter-chain translators, one variant per listener kind.
//!
//! - HTTP listeners build their connection manager once and replicate the chain
//!   per merged SSL configuration.
//! - TCP listeners delegate to the TCP filter-chain plugins, each of which may
//!   emit any number of chains.
//! - Hybrid listeners build one HTTP chain or a set of TCP chains per matched
//!   listener, gated by that listener's matcher.

use envoy_types::pb::envoy::config::core::v3::CidrRange as EnvoyCidrRange;
use envoy_types::pb::envoy::config::listener::v3::{Filter, FilterChain, FilterChainMatch};
use envoy_types::pb::google::protobuf::UInt32Value;
use tracing::{error, warn};

use crate::model::{
    CidrRange, HttpListener, HybridListener, Listener, ListenerMatcher, MatchedListenerType,
    SslConfig, TcpListener,
};
use crate::plugins::{Params, PluginRegistry};
use crate::validation::{
    ListenerErrorKind, ListenerReport, TcpListenerErrorKind, TcpListenerReport,
};
use crate::xds::network_filter::HttpNetworkFilterTranslator;
use crate::xds::ssl::{merge_ssl_configs, SslConfigTranslator};
use crate::xds::utils::matched_route_config_name;

/// Builds the filter chains of one listener
#[derive(Debug, Clone)]
pub enum FilterChainTranslator<'a> {
    SslDuplicated(SslDuplicatedFilterChainTranslator<'a>),
    Tcp(TcpFilterChainTranslator<'a>),
    Matcher(MatcherFilterChainTranslator<'a>),
}

impl FilterChainTranslator<'_> {
    pub fn compute_filter_chains(&self, report: &mut ListenerReport) -> Vec<FilterChain> {
        match self {
            Self::SslDuplicated(translator) => translator.compute_filter_chains(report),
            Self::Tcp(translator) => translator.compute_filter_chains(report),
            Self::Matcher(translator) => translator.compute_filter_chains(report),
        }
    }
}

/// One HTTP filter chain per merged SSL configuration
#[derive(Debug, Clone)]
pub struct SslDuplicatedFilterChainTranslator<'a> {
    pub parent: &'a Listener,
    pub network_filter_translator: HttpNetworkFilterTranslator<'a>,
    pub ssl_config_translator: SslConfigTranslator,
}

impl SslDuplicatedFilterChainTranslator<'_> {
    pub fn compute_filter_chains(&self, report: &mut ListenerReport) -> Vec<FilterChain> {
        let filters = {
            let Some(http_report) = report.http_mut() else {
                error!(listener = %self.parent.name, "internal error: listener report has no HTTP sub-report");
                return Vec::new();
            };
            self.network_filter_translator.compute_network_filters(http_report)
        };
        if filters.is_empty() {
            return Vec::new();
        }

        if self.parent.ssl_configurations.is_empty() {
            return vec![FilterChain { filters, ..Default::default() }];
        }

        merge_ssl_configs(&self.parent.ssl_configurations)
            .iter()
            .filter_map(|ssl_config| {
                ssl_filter_chain(
                    &self.ssl_config_translator,
                    self.parent,
                    ssl_config,
                    filters.clone(),
                    report,
                )
            })
            .collect()
    }
}

/// Builds a TLS-terminating chain, or records why it cannot be built
fn ssl_filter_chain(
    translator: &SslConfigTranslator,
    parent: &Listener,
    ssl_config: &SslConfig,
    filters: Vec<Filter>,
    report: &mut ListenerReport,
) -> Option<FilterChain> {
    match translator.resolve_downstream_ssl_config(ssl_config) {
        Ok(socket) => Some(FilterChain {
            filter_chain_match: Some(FilterChainMatch {
                server_names: ssl_config.sni_domains.clone(),
                ..Default::default()
            }),
            filters,
            transport_socket: Some(socket),
            ..Default::default()
        }),
        Err(err) => {
            warn!(listener = %parent.name, error = %err, "Skipping filter chain with invalid SSL config");
            report.add_error(ListenerErrorKind::SslConfig, err.to_string());
            None
        }
    }
}

/// Chains contributed by the TCP filter-chain plugins
#[derive(Debug, Clone)]
pub struct TcpFilterChainTranslator<'a> {
    pub plugins: &'a PluginRegistry,
    pub params: Params<'a>,
    pub parent: &'a Listener,
    pub listener: &'a TcpListener,
}

impl TcpFilterChainTranslator<'_> {
    pub fn compute_filter_chains(&self, report: &mut ListenerReport) -> Vec<FilterChain> {
        let Some(tcp_report) = report.tcp_mut() else {
            error!(listener = %self.parent.name, "internal error: listener report has no TCP sub-report");
            return Vec::new();
        };
        self.compute_with_report(tcp_report)
    }

    fn compute_with_report(&self, report: &mut TcpListenerReport) -> Vec<FilterChain> {
        let mut chains = Vec::new();
        for plugin in self.plugins.tcp_filter_chain_plugins() {
            match plugin.create_tcp_filter_chains(&self.params, self.parent, self.listener, report) {
                Ok(created) => chains.extend(created),
                Err(err) => {
                    warn!(listener = %self.parent.name, plugin = %plugin.name(), error = %err, "TCP filter chain plugin failed");
                    report.add_error(TcpListenerErrorKind::Processing, err.to_string());
                }
            }
        }
        chains
    }
}

/// Chains of a hybrid listener, keyed by each matched listener's matcher
#[derive(Debug, Clone)]
pub struct MatcherFilterChainTranslator<'a> {
    pub plugins: &'a PluginRegistry,
    pub params: Params<'a>,
    pub parent: &'a Listener,
    pub listener: &'a HybridListener,
    pub ssl_config_translator: SslConfigTranslator,
}

impl MatcherFilterChainTranslator<'_> {
    pub fn compute_filter_chains(&self, report: &mut ListenerReport) -> Vec<FilterChain> {
        let mut chains = Vec::new();
        for (index, matched) in self.listener.matched_listeners.iter().enumerate() {
            match &matched.listener_type {
                MatchedListenerType::Http(http) => {
                    chains.extend(self.http_filter_chain(index, &matched.matcher, http, report));
                }
                MatchedListenerType::Tcp(tcp) => {
                    chains.extend(self.tcp_filter_chains(index, &matched.matcher, tcp, report));
                }
            }
        }
        chains
    }

    fn http_filter_chain(
        &self,
        index: usize,
        matcher: &ListenerMatcher,
        listener: &HttpListener,
        report: &mut ListenerReport,
    ) -> Option<FilterChain> {
        let network_filter_translator = HttpNetworkFilterTranslator {
            plugins: self.plugins,
            params: self.params,
            parent: self.parent,
            listener,
            route_config_name: matched_route_config_name(self.parent, matcher),
        };

        let filters = {
            let Some(http_report) = report.hybrid_mut().and_then(|hybrid| hybrid.http_mut(index))
            else {
                error!(listener = %self.parent.name, matched_listener = index, "internal error: hybrid report has no HTTP sub-report");
                return None;
            };
            network_filter_translator.compute_network_filters(http_report)
        };
        if filters.is_empty() {
            return None;
        }

        let mut chain = match &matcher.ssl_config {
            Some(ssl_config) => ssl_filter_chain(
                &self.ssl_config_translator,
                self.parent,
                ssl_config,
                filters,
                report,
            )?,
            None => FilterChain { filters, ..Default::default() },
        };
        apply_matcher(&mut chain, matcher);
        Some(chain)
    }

    fn tcp_filter_chains(
        &self,
        index: usize,
        matcher: &ListenerMatcher,
        listener: &TcpListener,
        report: &mut ListenerReport,
    ) -> Vec<FilterChain> {
        let Some(tcp_report) = report.hybrid_mut().and_then(|hybrid| hybrid.tcp_mut(index)) else {
            error!(listener = %self.parent.name, matched_listener = index, "internal error: hybrid report has no TCP sub-report");
            return Vec::new();
        };

        let translator = TcpFilterChainTranslator {
            plugins: self.plugins,
            params: self.params,
            parent: self.parent,
            listener,
        };
        let mut chains = translator.compute_with_report(tcp_report);
        for chain in &mut chains {
            apply_matcher(chain, matcher);
        }
        chains
    }
}

/// Narrow a chain's match to the matcher's source ranges and SNI domains
fn apply_matcher(chain: &mut FilterChain, matcher: &ListenerMatcher) {
    let sni_domains = matcher
        .ssl_config
        .as_ref()
        .map(|ssl| ssl.sni_domains.as_slice())
        .unwrap_or_default();
    if matcher.source_prefix_ranges.is_empty() && sni_domains.is_empty() {
        return;
    }

    let chain_match = chain.filter_chain_match.get_or_insert_with(FilterChainMatch::default);
    chain_match
        .source_prefix_ranges
        .extend(matcher.source_prefix_ranges.iter().map(to_envoy_cidr_range));
    if chain_match.server_names.is_empty() {
        chain_match.server_names = sni_domains.to_vec();
    }
}

fn to_envoy_cidr_range(range: &CidrRange) -> EnvoyCidrRange {
    EnvoyCidrRange {
        address_prefix: range.address_prefix.clone(),
        prefix_len: range.prefix_len.map(|value| UInt32Value { value }),
    }
}
