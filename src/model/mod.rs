//! # Input Model
//!
//! The declarative, user-authored routing intent consumed by the translator:
//! a [`Proxy`] made of listeners, virtual hosts and routes, plus the
//! [`Snapshot`] of upstreams and upstream groups that destinations refer to.
//!
//! Every type is `serde` (de)serializable so a proxy can be loaded from YAML or
//! JSON, and only ordered collections are used so that translating the same
//! input twice produces identical output.

mod destination;
mod input;
mod options;
mod proxy;
mod routing;
mod snapshot;
mod upstream;

pub use destination::{
    ConsulServiceDestination, Destination, DestinationType, KubernetesServiceDestination,
    MultiDestination, RouteDestination, Subset, TcpDestination, WeightedDestination,
    WeightedDestinationOptions,
};
pub use input::TranslationInput;
pub use options::{
    HeaderManipulation, HeaderValueEntry, RouteConfigurationOptions, RouteOptions,
    VirtualHostOptions,
};
pub use proxy::{
    CidrRange, HttpListener, HybridListener, Listener, ListenerMatcher, ListenerType,
    MatchedListener, MatchedListenerType, Proxy, SslConfig, SslSecret, TcpHost, TcpListener,
};
pub use routing::{
    Action, DirectResponseAction, HeaderMatcher, Matcher, PathRewrite, PathSpecifier,
    QueryParameterMatcher, RedirectAction, RedirectResponseCode, Route, RouteAction, VirtualHost,
};
pub use snapshot::Snapshot;
pub use upstream::{SubsetSelector, SubsetSpec, Upstream, UpstreamGroup};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a namespaced resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ResourceRef {
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}
