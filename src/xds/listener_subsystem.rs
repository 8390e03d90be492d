//! Picks the listener and route configuration translators for one listener.

use tracing::{debug, error};

use crate::model::{Listener, ListenerType, MatchedListenerType, Proxy};
use crate::plugins::{Params, PluginRegistry};
use crate::validation::ListenerReport;
use crate::xds::filter_chain::{
    FilterChainTranslator, MatcherFilterChainTranslator, SslDuplicatedFilterChainTranslator,
    TcpFilterChainTranslator,
};
use crate::xds::listener::ListenerTranslator;
use crate::xds::network_filter::HttpNetworkFilterTranslator;
use crate::xds::route_config::{
    HttpReportLocation, HttpRouteConfigurationTranslator, RouteConfigurationTranslator,
};
use crate::xds::ssl::SslConfigTranslator;
use crate::xds::utils::{matched_route_config_name, route_config_name};

/// Builds the translator pair of a listener, dispatching on its variant
#[derive(Debug, Clone, Copy)]
pub struct ListenerSubsystemTranslatorFactory<'a> {
    plugins: &'a PluginRegistry,
    ssl_config_translator: SslConfigTranslator,
}

impl<'a> ListenerSubsystemTranslatorFactory<'a> {
    pub fn new(plugins: &'a PluginRegistry) -> Self {
        Self { plugins, ssl_config_translator: SslConfigTranslator::new() }
    }

    /// Translators for `listener`.
    ///
    /// The typed sub-report of `report` must match the listener variant. A
    /// missing or mismatched one is a caller bug: it is logged and replaced so
    /// the translators always have a report node to write into.
    pub fn get_translators(
        &self,
        proxy: &'a Proxy,
        listener: &'a Listener,
        params: Params<'a>,
        report: &mut ListenerReport,
    ) -> (ListenerTranslator<'a>, RouteConfigurationTranslator<'a>) {
        ensure_report_shape(listener, report);

        let (filter_chain_translator, route_config_translator) = match &listener.listener_type {
            ListenerType::Http(http) => {
                let route_config_name = route_config_name(listener);
                let network_filter_translator = HttpNetworkFilterTranslator {
                    plugins: self.plugins,
                    params,
                    parent: listener,
                    listener: http,
                    route_config_name: route_config_name.clone(),
                };
                let filter_chains =
                    FilterChainTranslator::SslDuplicated(SslDuplicatedFilterChainTranslator {
                        parent: listener,
                        network_filter_translator,
                        ssl_config_translator: self.ssl_config_translator,
                    });
                let routes = RouteConfigurationTranslator::Http(HttpRouteConfigurationTranslator {
                    plugins: self.plugins,
                    params,
                    proxy,
                    parent: listener,
                    listener: http,
                    report_location: HttpReportLocation::TopLevel,
                    route_config_name,
                    require_tls_on_virtual_hosts: !listener.ssl_configurations.is_empty(),
                });
                (filter_chains, routes)
            }
            ListenerType::Tcp(tcp) => (
                FilterChainTranslator::Tcp(TcpFilterChainTranslator {
                    plugins: self.plugins,
                    params,
                    parent: listener,
                    listener: tcp,
                }),
                RouteConfigurationTranslator::Empty,
            ),
            ListenerType::Hybrid(hybrid) => {
                let routes = hybrid
                    .matched_listeners
                    .iter()
                    .enumerate()
                    .filter_map(|(index, matched)| match &matched.listener_type {
                        MatchedListenerType::Http(http) => Some(HttpRouteConfigurationTranslator {
                            plugins: self.plugins,
                            params,
                            proxy,
                            parent: listener,
                            listener: http,
                            report_location: HttpReportLocation::Matched(index),
                            route_config_name: matched_route_config_name(listener, &matched.matcher),
                            require_tls_on_virtual_hosts: matched.matcher.ssl_config.is_some(),
                        }),
                        MatchedListenerType::Tcp(_) => None,
                    })
                    .collect();
                (
                    FilterChainTranslator::Matcher(MatcherFilterChainTranslator {
                        plugins: self.plugins,
                        params,
                        parent: listener,
                        listener: hybrid,
                        ssl_config_translator: self.ssl_config_translator,
                    }),
                    RouteConfigurationTranslator::Multi(routes),
                )
            }
        };

        debug!(listener = %listener.name, kind = listener.kind(), "Selected listener translators");

        let listener_translator = ListenerTranslator {
            plugins: self.plugins,
            params,
            listener,
            filter_chain_translator,
        };
        (listener_translator, route_config_translator)
    }
}

fn ensure_report_shape(listener: &Listener, report: &mut ListenerReport) {
    if !report.matches(listener) {
        error!(
            listener = %listener.name,
            kind = listener.kind(),
            "internal error: listener report does not match the listener type; replacing it"
        );
        report.repair(listener);
        return;
    }

    if let ListenerType::Hybrid(hybrid) = &listener.listener_type {
        if report.hybrid_mut().is_some_and(|hybrid_report| !hybrid_report.matches(hybrid)) {
            error!(
                listener = %listener.name,
                "internal error: hybrid listener report does not match its matched listeners; replacing it"
            );
            report.repair(listener);
        }
    }
}
