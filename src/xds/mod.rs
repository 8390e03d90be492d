//! # Envoy Configuration Builders
//!
//! Turns the input model into envoy v3 resources:
//!
//! - [`ProxyTranslator`] drives a whole pass over a proxy
//! - [`ListenerSubsystemTranslatorFactory`] picks the translator pair of a listener
//! - [`ListenerTranslator`] and the filter-chain translators build `Listener`s
//! - [`RouteConfigurationTranslator`] builds `RouteConfiguration`s
//!
//! Every builder writes its findings into the listener's report instead of
//! failing, so a pass always yields a configuration.

pub mod filter_chain;
pub mod filters;
pub mod listener;
pub mod listener_subsystem;
pub mod matchers;
pub mod network_filter;
pub mod route_config;
pub mod ssl;
pub mod translator;
pub mod utils;

pub use filter_chain::{
    FilterChainTranslator, MatcherFilterChainTranslator, SslDuplicatedFilterChainTranslator,
    TcpFilterChainTranslator,
};
pub use listener::ListenerTranslator;
pub use listener_subsystem::ListenerSubsystemTranslatorFactory;
pub use network_filter::HttpNetworkFilterTranslator;
pub use route_config::{
    HttpReportLocation, HttpRouteConfigurationTranslator, RouteConfigurationTranslator,
};
pub use ssl::SslConfigTranslator;
pub use translator::{ProxyTranslator, TranslationOutput};
