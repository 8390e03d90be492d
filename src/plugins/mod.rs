//! # Translation Plugins
//!
//! Extension points invoked while listeners and route configurations are built.
//! Each extension point is a capability trait; a plugin implements every trait
//! it participates in and is registered once per trait in a [`PluginRegistry`].
//!
//! Plugins run in registration order. A plugin error never stops the pipeline:
//! the translator files it in the report node of the object being built and
//! moves on to the next plugin.

pub mod headers;
pub mod tcp;

pub use headers::{HeadersPlugin, HEADERS_PLUGIN_NAME};
pub use tcp::{TcpPlugin, TCP_PLUGIN_NAME};

use std::fmt;
use std::sync::Arc;

use envoy_types::pb::envoy::config::listener::v3::{FilterChain, Listener as EnvoyListener};
use envoy_types::pb::envoy::config::route::v3::{
    weighted_cluster::ClusterWeight, Route as EnvoyRoute, RouteAction as EnvoyRouteAction,
    VirtualHost as EnvoyVirtualHost,
};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::HttpConnectionManager;

use crate::config::TranslationConfig;
use crate::errors::TranslationError;
use crate::model::{
    HttpListener, Listener, Proxy, Route, RouteAction, Snapshot, TcpListener, VirtualHost,
    WeightedDestination,
};
use crate::validation::TcpListenerReport;
use crate::xds::filters::StagedHttpFilter;

/// Inputs shared by every extension point
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    pub snapshot: &'a Snapshot,
    pub settings: &'a TranslationConfig,
}

impl<'a> Params<'a> {
    pub fn new(snapshot: &'a Snapshot, settings: &'a TranslationConfig) -> Self {
        Self { snapshot, settings }
    }
}

/// Inputs of virtual host plugins
#[derive(Debug, Clone, Copy)]
pub struct VirtualHostParams<'a> {
    pub params: Params<'a>,
    pub proxy: &'a Proxy,
    pub listener: &'a Listener,
    pub http_listener: &'a HttpListener,
}

/// Inputs of route and weighted destination plugins
#[derive(Debug, Clone, Copy)]
pub struct RouteParams<'a> {
    pub virtual_host_params: VirtualHostParams<'a>,
    pub virtual_host: &'a VirtualHost,
}

/// Inputs of route action plugins
#[derive(Debug, Clone, Copy)]
pub struct RouteActionParams<'a> {
    pub route_params: RouteParams<'a>,
    pub route: &'a Route,
}

/// Common plugin identity
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

/// Contributes HTTP filters to the connection manager of an HTTP listener
pub trait HttpFilterPlugin: Plugin {
    fn http_filters(
        &self,
        params: &Params<'_>,
        listener: &HttpListener,
    ) -> Result<Vec<StagedHttpFilter>, TranslationError>;
}

/// Mutates the HTTP connection manager after its filters are assembled
pub trait HttpConnectionManagerPlugin: Plugin {
    fn process_hcm(
        &self,
        params: &Params<'_>,
        listener: &HttpListener,
        out: &mut HttpConnectionManager,
    ) -> Result<(), TranslationError>;
}

/// Mutates a finished envoy listener
pub trait ListenerPlugin: Plugin {
    fn process_listener(
        &self,
        params: &Params<'_>,
        input: &Listener,
        out: &mut EnvoyListener,
    ) -> Result<(), TranslationError>;
}

/// Builds the filter chains of a TCP listener.
///
/// One TCP listener may yield any number of chains. Per-host problems belong in
/// `report`; an `Err` is filed as a listener-level processing error.
pub trait TcpFilterChainPlugin: Plugin {
    fn create_tcp_filter_chains(
        &self,
        params: &Params<'_>,
        parent: &Listener,
        listener: &TcpListener,
        report: &mut TcpListenerReport,
    ) -> Result<Vec<FilterChain>, TranslationError>;
}

/// Mutates a generated virtual host
pub trait VirtualHostPlugin: Plugin {
    fn process_virtual_host(
        &self,
        params: &VirtualHostParams<'_>,
        input: &VirtualHost,
        out: &mut EnvoyVirtualHost,
    ) -> Result<(), TranslationError>;
}

/// Mutates a generated route
pub trait RoutePlugin: Plugin {
    fn process_route(
        &self,
        params: &RouteParams<'_>,
        input: &Route,
        out: &mut EnvoyRoute,
    ) -> Result<(), TranslationError>;
}

/// Mutates the route action of a forwarding route
pub trait RouteActionPlugin: Plugin {
    fn process_route_action(
        &self,
        params: &RouteActionParams<'_>,
        input: &RouteAction,
        out: &mut EnvoyRouteAction,
    ) -> Result<(), TranslationError>;
}

/// Mutates one entry of a weighted cluster
pub trait WeightedDestinationPlugin: Plugin {
    fn process_weighted_destination(
        &self,
        params: &RouteParams<'_>,
        input: &WeightedDestination,
        out: &mut ClusterWeight,
    ) -> Result<(), TranslationError>;
}

/// Ordered plugin lists, one per extension point
#[derive(Clone, Default)]
pub struct PluginRegistry {
    http_filter_plugins: Vec<Arc<dyn HttpFilterPlugin>>,
    http_connection_manager_plugins: Vec<Arc<dyn HttpConnectionManagerPlugin>>,
    listener_plugins: Vec<Arc<dyn ListenerPlugin>>,
    tcp_filter_chain_plugins: Vec<Arc<dyn TcpFilterChainPlugin>>,
    virtual_host_plugins: Vec<Arc<dyn VirtualHostPlugin>>,
    route_plugins: Vec<Arc<dyn RoutePlugin>>,
    route_action_plugins: Vec<Arc<dyn RouteActionPlugin>>,
    weighted_destination_plugins: Vec<Arc<dyn WeightedDestinationPlugin>>,
}

impl PluginRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `headers` and `tcp` plugins
    pub fn with_defaults() -> Self {
        let headers = Arc::new(HeadersPlugin::new());
        Self::new()
            .with_virtual_host_plugin(headers.clone())
            .with_route_plugin(headers.clone())
            .with_weighted_destination_plugin(headers)
            .with_tcp_filter_chain_plugin(Arc::new(TcpPlugin::new()))
    }

    pub fn with_http_filter_plugin(mut self, plugin: Arc<dyn HttpFilterPlugin>) -> Self {
        self.http_filter_plugins.push(plugin);
        self
    }

    pub fn with_http_connection_manager_plugin(
        mut self,
        plugin: Arc<dyn HttpConnectionManagerPlugin>,
    ) -> Self {
        self.http_connection_manager_plugins.push(plugin);
        self
    }

    pub fn with_listener_plugin(mut self, plugin: Arc<dyn ListenerPlugin>) -> Self {
        self.listener_plugins.push(plugin);
        self
    }

    pub fn with_tcp_filter_chain_plugin(mut self, plugin: Arc<dyn TcpFilterChainPlugin>) -> Self {
        self.tcp_filter_chain_plugins.push(plugin);
        self
    }

    pub fn with_virtual_host_plugin(mut self, plugin: Arc<dyn VirtualHostPlugin>) -> Self {
        self.virtual_host_plugins.push(plugin);
        self
    }

    pub fn with_route_plugin(mut self, plugin: Arc<dyn RoutePlugin>) -> Self {
        self.route_plugins.push(plugin);
        self
    }

    pub fn with_route_action_plugin(mut self, plugin: Arc<dyn RouteActionPlugin>) -> Self {
        self.route_action_plugins.push(plugin);
        self
    }

    pub fn with_weighted_destination_plugin(
        mut self,
        plugin: Arc<dyn WeightedDestinationPlugin>,
    ) -> Self {
        self.weighted_destination_plugins.push(plugin);
        self
    }

    pub fn http_filter_plugins(&self) -> &[Arc<dyn HttpFilterPlugin>] {
        &self.http_filter_plugins
    }

    pub fn http_connection_manager_plugins(&self) -> &[Arc<dyn HttpConnectionManagerPlugin>] {
        &self.http_connection_manager_plugins
    }

    pub fn listener_plugins(&self) -> &[Arc<dyn ListenerPlugin>] {
        &self.listener_plugins
    }

    pub fn tcp_filter_chain_plugins(&self) -> &[Arc<dyn TcpFilterChainPlugin>] {
        &self.tcp_filter_chain_plugins
    }

    pub fn virtual_host_plugins(&self) -> &[Arc<dyn VirtualHostPlugin>] {
        &self.virtual_host_plugins
    }

    pub fn route_plugins(&self) -> &[Arc<dyn RoutePlugin>] {
        &self.route_plugins
    }

    pub fn route_action_plugins(&self) -> &[Arc<dyn RouteActionPlugin>] {
        &self.route_action_plugins
    }

    pub fn weighted_destination_plugins(&self) -> &[Arc<dyn WeightedDestinationPlugin>] {
        &self.weighted_destination_plugins
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn names<T: Plugin + ?Sized>(plugins: &[Arc<T>]) -> Vec<&str> {
            plugins.iter().map(|plugin| plugin.name()).collect()
        }

        f.debug_struct("PluginRegistry")
            .field("http_filter_plugins", &names(&self.http_filter_plugins))
            .field("http_connection_manager_plugins", &names(&self.http_connection_manager_plugins))
            .field("listener_plugins", &names(&self.listener_plugins))
            .field("tcp_filter_chain_plugins", &names(&self.tcp_filter_chain_plugins))
            .field("virtual_host_plugins", &names(&self.virtual_host_plugins))
            .field("route_plugins", &names(&self.route_plugins))
            .field("route_action_plugins", &names(&self.route_action_plugins))
            .field("weighted_destination_plugins", &names(&self.weighted_destination_plugins))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_builtin_plugins_in_order() {
        let registry = PluginRegistry::with_defaults();
        assert_eq!(registry.virtual_host_plugins().len(), 1);
        assert_eq!(registry.route_plugins()[0].name(), HEADERS_PLUGIN_NAME);
        assert_eq!(registry.weighted_destination_plugins()[0].name(), HEADERS_PLUGIN_NAME);
        assert_eq!(registry.tcp_filter_chain_plugins()[0].name(), TCP_PLUGIN_NAME);
        assert!(registry.http_filter_plugins().is_empty());
        assert!(registry.listener_plugins().is_empty());

        let debug = format!("{registry:?}");
        assert!(debug.contains("\"headers\""));
        assert!(debug.contains("\"tcp\""));
    }
}
