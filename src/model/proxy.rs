use serde::{Deserialize, Serialize};

use super::{RouteConfigurationOptions, TcpDestination, VirtualHost};

/// Root of the routing intent: an ordered set of listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Proxy {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub listeners: Vec<Listener>,
}

/// A bound network entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,
    pub bind_address: String,
    pub bind_port: u32,
    #[serde(default)]
    pub ssl_configurations: Vec<SslConfig>,
    #[serde(default)]
    pub route_options: RouteConfigurationOptions,
    #[serde(flatten)]
    pub listener_type: ListenerType,
}

impl Listener {
    pub fn new(
        name: impl Into<String>,
        bind_address: impl Into<String>,
        bind_port: u32,
        listener_type: ListenerType,
    ) -> Self {
        Self {
            name: name.into(),
            bind_address: bind_address.into(),
            bind_port,
            ssl_configurations: Vec::new(),
            route_options: RouteConfigurationOptions::default(),
            listener_type,
        }
    }

    /// Short label of the listener variant, used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self.listener_type {
            ListenerType::Http(_) => "http",
            ListenerType::Tcp(_) => "tcp",
            ListenerType::Hybrid(_) => "hybrid",
        }
    }
}

/// Listener variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerType {
    Http(HttpListener),
    Tcp(TcpListener),
    Hybrid(HybridListener),
}

/// HTTP listener: a set of virtual hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HttpListener {
    #[serde(default)]
    pub virtual_hosts: Vec<VirtualHost>,
    /// Stat prefix of the HTTP connection manager; defaults to the listener name
    #[serde(default)]
    pub stat_prefix: String,
}

/// Raw TCP listener: a set of TCP hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TcpListener {
    #[serde(default)]
    pub tcp_hosts: Vec<TcpHost>,
    /// Stat prefix of the TCP proxy filters; defaults to the listener name
    #[serde(default)]
    pub stat_prefix: String,
}

/// TCP forwarding target, optionally gated by SNI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpHost {
    pub name: String,
    #[serde(default)]
    pub ssl_config: Option<SslConfig>,
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub destination: Option<TcpDestination>,
}

/// Listener that dispatches connections to nested HTTP or TCP listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HybridListener {
    #[serde(default)]
    pub matched_listeners: Vec<MatchedListener>,
}

/// A nested listener selected by a connection-level predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedListener {
    #[serde(default)]
    pub matcher: ListenerMatcher,
    #[serde(flatten)]
    pub listener_type: MatchedListenerType,
}

/// Nested listener variants of a hybrid listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedListenerType {
    Http(HttpListener),
    Tcp(TcpListener),
}

/// Connection-level predicate of a matched listener
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ListenerMatcher {
    /// TLS termination and SNI gate
    #[serde(default)]
    pub ssl_config: Option<SslConfig>,
    /// Source address ranges the connection must originate from
    #[serde(default)]
    pub source_prefix_ranges: Vec<CidrRange>,
}

/// CIDR source range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CidrRange {
    pub address_prefix: String,
    #[serde(default)]
    pub prefix_len: Option<u32>,
}

/// Downstream TLS settings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SslConfig {
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub secret: SslSecret,
    #[serde(default)]
    pub sni_domains: Vec<String>,
    #[serde(default)]
    pub verify_subject_alt_name: Vec<String>,
    #[serde(default)]
    pub alpn_protocols: Vec<String>,
}

impl SslConfig {
    /// TLS settings backed by certificate files on the proxy's filesystem
    pub fn files(cert_chain: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            secret: SslSecret::Files {
                cert_chain: cert_chain.into(),
                private_key: private_key.into(),
                root_ca: None,
            },
            sni_domains: Vec::new(),
            verify_subject_alt_name: Vec::new(),
            alpn_protocols: Vec::new(),
        }
    }

    pub fn with_sni_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sni_domains = domains.into_iter().map(Into::into).collect();
        self
    }
}

/// Source of certificate material
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SslSecret {
    Files {
        cert_chain: String,
        private_key: String,
        #[serde(default)]
        root_ca: Option<String>,
    },
    Inline {
        cert_chain: String,
        private_key: String,
        #[serde(default)]
        root_ca: Option<String>,
    },
}
