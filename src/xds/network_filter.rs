//! Network filters of HTTP listeners.
//!
//! An HTTP (sub-)listener becomes a single HTTP connection manager filter that
//! fetches its route configuration over RDS from the aggregated xDS stream.

use envoy_types::pb::envoy::config::core::v3::{
    config_source::ConfigSourceSpecifier, AggregatedConfigSource, ApiVersion, ConfigSource,
};
use envoy_types::pb::envoy::config::listener::v3::{filter::ConfigType as FilterConfigType, Filter};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::{self, RouteSpecifier},
    HttpConnectionManager, Rds,
};
use prost::Message;
use tracing::{debug, warn};

use crate::model::{HttpListener, Listener};
use crate::plugins::{Params, PluginRegistry};
use crate::validation::{HttpListenerErrorKind, HttpListenerReport};
use crate::xds::filters::{any_from_message, build_http_filters, StagedHttpFilter};

/// Name of envoy's HTTP connection manager network filter
pub const HTTP_CONNECTION_MANAGER_FILTER_NAME: &str = "envoy.filters.network.http_connection_manager";

const HTTP_CONNECTION_MANAGER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";

/// Network filter configured with a typed prost message
pub fn typed_network_filter<M: Message>(name: &str, type_url: &str, config: &M) -> Filter {
    Filter {
        name: name.to_string(),
        config_type: Some(FilterConfigType::TypedConfig(any_from_message(type_url, config))),
    }
}

/// Builds the connection manager of one HTTP (sub-)listener
#[derive(Debug, Clone)]
pub struct HttpNetworkFilterTranslator<'a> {
    pub plugins: &'a PluginRegistry,
    pub params: Params<'a>,
    pub parent: &'a Listener,
    pub listener: &'a HttpListener,
    pub route_config_name: String,
}

impl HttpNetworkFilterTranslator<'_> {
    /// Network filters of the listener.
    ///
    /// Returns no filters only when the HTTP filter list cannot be assembled;
    /// plugin failures are recorded in `report` and otherwise skipped.
    pub fn compute_network_filters(&self, report: &mut HttpListenerReport) -> Vec<Filter> {
        let mut staged: Vec<StagedHttpFilter> = Vec::new();
        for plugin in self.plugins.http_filter_plugins() {
            match plugin.http_filters(&self.params, self.listener) {
                Ok(filters) => staged.extend(filters),
                Err(err) => {
                    warn!(listener = %self.parent.name, plugin = %plugin.name(), error = %err, "HTTP filter plugin failed");
                    report.add_error(HttpListenerErrorKind::Processing, err.to_string());
                }
            }
        }

        let http_filters = match build_http_filters(staged) {
            Ok(filters) => filters,
            Err(err) => {
                report.add_error(HttpListenerErrorKind::Processing, err.to_string());
                return Vec::new();
            }
        };

        let mut hcm = HttpConnectionManager {
            codec_type: http_connection_manager::CodecType::Auto as i32,
            stat_prefix: self.stat_prefix(),
            route_specifier: Some(RouteSpecifier::Rds(Rds {
                route_config_name: self.route_config_name.clone(),
                config_source: Some(ConfigSource {
                    config_source_specifier: Some(ConfigSourceSpecifier::Ads(
                        AggregatedConfigSource::default(),
                    )),
                    resource_api_version: ApiVersion::V3 as i32,
                    ..Default::default()
                }),
            })),
            http_filters,
            ..Default::default()
        };

        for plugin in self.plugins.http_connection_manager_plugins() {
            if let Err(err) = plugin.process_hcm(&self.params, self.listener, &mut hcm) {
                warn!(listener = %self.parent.name, plugin = %plugin.name(), error = %err, "Connection manager plugin failed");
                report.add_error(HttpListenerErrorKind::Processing, err.to_string());
            }
        }

        debug!(
            listener = %self.parent.name,
            route_config = %self.route_config_name,
            http_filters = hcm.http_filters.len(),
            "Built HTTP connection manager"
        );

        vec![typed_network_filter(
            HTTP_CONNECTION_MANAGER_FILTER_NAME,
            HTTP_CONNECTION_MANAGER_TYPE_URL,
            &hcm,
        )]
    }

    fn stat_prefix(&self) -> String {
        if self.listener.stat_prefix.is_empty() {
            self.parent.name.clone()
        } else {
            self.listener.stat_prefix.clone()
        }
    }
}

/// Decode the connection manager carried by a network filter
pub fn decode_http_connection_manager(filter: &Filter) -> Option<HttpConnectionManager> {
    match &filter.config_type {
        Some(FilterConfigType::TypedConfig(any)) if any.type_url == HTTP_CONNECTION_MANAGER_TYPE_URL => {
            HttpConnectionManager::decode(any.value.as_slice()).ok()
        }
        _ => None,
    }
}
