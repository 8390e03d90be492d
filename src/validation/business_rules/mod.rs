//! Business rules checked while translating a proxy.

mod destination;
mod listener;
mod virtual_host;

pub use destination::{
    check_that_subset_matches_upstream, destination_to_upstream_ref, validate_cluster_header,
    validate_route_destinations, validate_tcp_route_destinations,
};
pub use listener::{validate_listeners, validate_tcp_host_names};
pub use virtual_host::{validate_virtual_host_domains, WILDCARD_DOMAIN};
