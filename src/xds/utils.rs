//! Naming and small envoy value helpers.

use std::collections::BTreeMap;

use envoy_types::pb::envoy::config::core::v3::{data_source::Specifier, DataSource, Metadata};
use envoy_types::pb::google::protobuf::{value::Kind, Struct, Value};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::model::{Listener, ListenerMatcher, ResourceRef};

/// Metadata namespace envoy's load balancer reads subset labels from
pub const LB_METADATA_NAMESPACE: &str = "envoy.lb";

lazy_static! {
    /// Characters envoy accepts in resource names
    static ref INVALID_NAME_CHARS: Regex =
        Regex::new(r"[^A-Za-z0-9_.:\-]").expect("static regex is valid");
}

/// Replace characters envoy rejects in resource names with `_`
pub fn sanitize_for_envoy(name: &str, kind: &str) -> String {
    let sanitized = INVALID_NAME_CHARS.replace_all(name, "_");
    if sanitized != name {
        debug!(original = %name, sanitized = %sanitized, kind = %kind, "Sanitized resource name");
    }
    sanitized.into_owned()
}

/// Route configuration name of a top-level HTTP listener
pub fn route_config_name(listener: &Listener) -> String {
    listener.name.clone()
}

/// Route configuration name of an HTTP listener nested in a hybrid listener.
///
/// Derived from the listener name and a digest of the matcher, so the name is
/// stable across passes and distinct per matcher.
pub fn matched_route_config_name(listener: &Listener, matcher: &ListenerMatcher) -> String {
    let canonical =
        serde_json::to_vec(matcher).unwrap_or_else(|_| format!("{matcher:?}").into_bytes());
    let digest = hex::encode(Sha256::digest(&canonical));
    format!("{}-{}", listener.name, &digest[..16])
}

/// Cluster name of an upstream
pub fn upstream_to_cluster_name(upstream: &ResourceRef) -> String {
    sanitize_for_envoy(&format!("{}_{}", upstream.name, upstream.namespace), "cluster")
}

/// Load balancer metadata selecting a subset of endpoints
pub fn lb_metadata(values: &BTreeMap<String, String>) -> Metadata {
    let labels = Struct {
        fields: values
            .iter()
            .map(|(key, value)| {
                (key.clone(), Value { kind: Some(Kind::StringValue(value.clone())) })
            })
            .collect(),
    };
    Metadata {
        filter_metadata: [(LB_METADATA_NAMESPACE.to_string(), labels)].into_iter().collect(),
        ..Default::default()
    }
}

/// Inline data source
pub fn data_source_from_string(value: &str) -> DataSource {
    DataSource { watched_directory: None, specifier: Some(Specifier::InlineString(value.to_string())) }
}

/// Data source read from a file on the proxy
pub fn data_source_from_path(path: &str) -> DataSource {
    DataSource { watched_directory: None, specifier: Some(Specifier::Filename(path.to_string())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CidrRange, HttpListener, ListenerType};

    fn listener(name: &str) -> Listener {
        Listener::new(name, "::", 8080, ListenerType::Http(HttpListener::default()))
    }

    #[test]
    fn sanitizes_invalid_characters() {
        assert_eq!(sanitize_for_envoy("my vhost/prod", "virtual host"), "my_vhost_prod");
        assert_eq!(sanitize_for_envoy("kube-svc:ns-name-80", "cluster"), "kube-svc:ns-name-80");
    }

    #[test]
    fn cluster_names_combine_name_and_namespace() {
        assert_eq!(upstream_to_cluster_name(&ResourceRef::new("ns1", "reviews")), "reviews_ns1");
    }

    #[test]
    fn matched_route_config_names_are_stable_and_distinct() {
        let listener = listener("hybrid");
        let a = ListenerMatcher {
            ssl_config: None,
            source_prefix_ranges: vec![CidrRange {
                address_prefix: "10.0.0.0".into(),
                prefix_len: Some(8),
            }],
        };
        let b = ListenerMatcher::default();

        let name_a = matched_route_config_name(&listener, &a);
        assert_eq!(name_a, matched_route_config_name(&listener, &a.clone()));
        assert_ne!(name_a, matched_route_config_name(&listener, &b));
        assert!(name_a.starts_with("hybrid-"));
        assert_eq!(name_a.len(), "hybrid-".len() + 16);
        assert_eq!(route_config_name(&listener), "hybrid");
    }

    #[test]
    fn lb_metadata_carries_subset_labels() {
        let values: BTreeMap<String, String> =
            [("version".to_string(), "v2".to_string())].into_iter().collect();
        let metadata = lb_metadata(&values);
        let labels = &metadata.filter_metadata[LB_METADATA_NAMESPACE];
        assert_eq!(
            labels.fields["version"].kind,
            Some(Kind::StringValue("v2".to_string()))
        );
    }
}
