//! Envoy listener construction.

use envoy_types::pb::envoy::config::core::v3::{
    address::Address as AddressType, socket_address::PortSpecifier, Address, SocketAddress,
};
use envoy_types::pb::envoy::config::listener::v3::{
    listener_filter::ConfigType as ListenerFilterConfigType, Listener as EnvoyListener,
    ListenerFilter,
};
use envoy_types::pb::envoy::extensions::filters::listener::tls_inspector::v3::TlsInspector;
use tracing::{debug, warn};

use crate::model::Listener;
use crate::plugins::{Params, PluginRegistry};
use crate::validation::{ListenerErrorKind, ListenerReport};
use crate::xds::filter_chain::FilterChainTranslator;
use crate::xds::filters::any_from_message;

pub const TLS_INSPECTOR_FILTER_NAME: &str = "envoy.filters.listener.tls_inspector";

const TLS_INSPECTOR_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.listener.tls_inspector.v3.TlsInspector";

/// Builds the envoy listener of one input listener
#[derive(Debug, Clone)]
pub struct ListenerTranslator<'a> {
    pub plugins: &'a PluginRegistry,
    pub params: Params<'a>,
    pub listener: &'a Listener,
    pub filter_chain_translator: FilterChainTranslator<'a>,
}

impl ListenerTranslator<'_> {
    pub fn compute_listener(&self, report: &mut ListenerReport) -> EnvoyListener {
        let filter_chains = self.filter_chain_translator.compute_filter_chains(report);

        let needs_tls_inspector = filter_chains.iter().any(|chain| {
            chain.filter_chain_match.as_ref().is_some_and(|m| !m.server_names.is_empty())
        });
        let listener_filters = if needs_tls_inspector {
            vec![ListenerFilter {
                name: TLS_INSPECTOR_FILTER_NAME.to_string(),
                config_type: Some(ListenerFilterConfigType::TypedConfig(any_from_message(
                    TLS_INSPECTOR_TYPE_URL,
                    &TlsInspector::default(),
                ))),
                ..Default::default()
            }]
        } else {
            Vec::new()
        };

        let mut out = EnvoyListener {
            name: self.listener.name.clone(),
            address: Some(Address {
                address: Some(AddressType::SocketAddress(SocketAddress {
                    address: self.listener.bind_address.clone(),
                    port_specifier: Some(PortSpecifier::PortValue(self.listener.bind_port)),
                    ..Default::default()
                })),
            }),
            filter_chains,
            listener_filters,
            ..Default::default()
        };

        for plugin in self.plugins.listener_plugins() {
            if let Err(err) = plugin.process_listener(&self.params, self.listener, &mut out) {
                warn!(listener = %self.listener.name, plugin = %plugin.name(), error = %err, "Listener plugin failed");
                report.add_error(ListenerErrorKind::Processing, err.to_string());
            }
        }

        debug!(
            listener = %self.listener.name,
            filter_chains = out.filter_chains.len(),
            tls_inspector = needs_tls_inspector,
            "Built listener"
        );
        out
    }
}
