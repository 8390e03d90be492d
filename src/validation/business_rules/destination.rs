//! Destination checks against the snapshot.
//!
//! A destination that points at an upstream (or upstream group) missing from
//! the snapshot, or a subset requested against an upstream that declares no
//! subset spec, is a warning. Every other failure is an error. See
//! [`TranslationError::is_warning`].

use crate::config::TranslationConfig;
use crate::errors::TranslationError;
use crate::model::{
    Destination, DestinationType, ResourceRef, RouteDestination, Snapshot, TcpDestination,
    WeightedDestination,
};
use crate::plugins::Params;

/// Resolve the upstream a destination refers to.
///
/// Kubernetes and Consul service destinations are aliases for upstreams with
/// well-known generated names.
pub fn destination_to_upstream_ref(
    destination: &Destination,
    settings: &TranslationConfig,
) -> ResourceRef {
    match &destination.destination_type {
        DestinationType::Upstream(reference) => reference.clone(),
        DestinationType::Kube(kube) => ResourceRef::new(
            kube.service.namespace.clone(),
            format!("kube-svc:{}-{}-{}", kube.service.namespace, kube.service.name, kube.port),
        ),
        DestinationType::Consul(consul) => ResourceRef::new(
            settings.consul_upstream_namespace.clone(),
            format!("consul-svc:{}", consul.service_name),
        ),
    }
}

/// Validate an HTTP route destination against the snapshot.
///
/// Cluster-header destinations are accepted as-is; their target is only known
/// at request time.
pub fn validate_route_destinations(
    params: &Params<'_>,
    destination: Option<&RouteDestination>,
) -> Result<(), TranslationError> {
    match destination {
        Some(RouteDestination::Single(single)) => validate_single_destination(params, single),
        Some(RouteDestination::Multi(multi)) => {
            validate_multi_destination(params, &multi.destinations)
        }
        Some(RouteDestination::UpstreamGroup(reference)) => {
            validate_upstream_group(params, reference)
        }
        Some(RouteDestination::ClusterHeader(_)) => Ok(()),
        None => Err(TranslationError::MissingDestination),
    }
}

/// Validate a TCP host destination against the snapshot.
///
/// Forward-SNI destinations are accepted as-is; the cluster comes from the
/// downstream connection.
pub fn validate_tcp_route_destinations(
    params: &Params<'_>,
    destination: Option<&TcpDestination>,
) -> Result<(), TranslationError> {
    match destination {
        Some(TcpDestination::Single(single)) => validate_single_destination(params, single),
        Some(TcpDestination::Multi(multi)) => {
            validate_multi_destination(params, &multi.destinations)
        }
        Some(TcpDestination::UpstreamGroup(reference)) => {
            validate_upstream_group(params, reference)
        }
        Some(TcpDestination::ForwardSniClusterName) => Ok(()),
        None => Err(TranslationError::MissingDestination),
    }
}

fn validate_upstream_group(
    params: &Params<'_>,
    reference: &ResourceRef,
) -> Result<(), TranslationError> {
    let group = params.snapshot.find_upstream_group(reference)?;
    validate_multi_destination(params, &group.destinations)
}

fn validate_multi_destination(
    params: &Params<'_>,
    destinations: &[WeightedDestination],
) -> Result<(), TranslationError> {
    for weighted in destinations {
        validate_single_destination(params, &weighted.destination)
            .map_err(TranslationError::invalid_destination)?;
    }
    Ok(())
}

fn validate_single_destination(
    params: &Params<'_>,
    destination: &Destination,
) -> Result<(), TranslationError> {
    let reference = destination_to_upstream_ref(destination, params.settings);
    params.snapshot.find_upstream(&reference).map(|_| ())
}

/// Check that a destination's subset can be served by its upstream.
///
/// The subset's key set must equal one of the upstream's selector key sets;
/// selectors are tried in declaration order. Destinations without a subset, or
/// with an empty one, always pass.
pub fn check_that_subset_matches_upstream(
    snapshot: &Snapshot,
    settings: &TranslationConfig,
    destination: &Destination,
) -> Result<(), TranslationError> {
    let Some(subset) = destination.subset.as_ref().filter(|subset| !subset.values.is_empty())
    else {
        return Ok(());
    };

    let reference = destination_to_upstream_ref(destination, settings);
    let upstream = snapshot.find_upstream(&reference)?;

    let Some(spec) = upstream.subset_spec.as_ref() else {
        return Err(TranslationError::SubsetsMisconfigured);
    };

    let found = spec.selectors.iter().any(|selector| {
        selector.keys.len() == subset.values.len()
            && selector.keys.iter().all(|key| subset.values.contains_key(key))
    });

    if found {
        Ok(())
    } else {
        Err(TranslationError::SubsetMismatch)
    }
}

/// A cluster header must be an ASCII header name without `:`
pub fn validate_cluster_header(header: &str) -> Result<(), TranslationError> {
    if header.bytes().any(|byte| !byte.is_ascii() || byte == b':') {
        return Err(TranslationError::InvalidClusterHeader(header.to_string()));
    }
    Ok(())
}
