use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{HeaderManipulation, ResourceRef};

/// Where an HTTP route action sends traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDestination {
    Single(Destination),
    Multi(MultiDestination),
    UpstreamGroup(ResourceRef),
    /// Cluster picked at request time from the named request header
    ClusterHeader(String),
}

/// Where a TCP host sends traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TcpDestination {
    Single(Destination),
    Multi(MultiDestination),
    UpstreamGroup(ResourceRef),
    /// Cluster named by the SNI of the downstream connection
    ForwardSniClusterName,
}

/// A reference to a single upstream, optionally narrowed to a subset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(flatten)]
    pub destination_type: DestinationType,
    #[serde(default)]
    pub subset: Option<Subset>,
}

impl Destination {
    /// Destination pointing directly at an upstream
    pub fn upstream(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            destination_type: DestinationType::Upstream(ResourceRef::new(namespace, name)),
            subset: None,
        }
    }

    pub fn with_subset<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.subset =
            Some(Subset { values: values.into_iter().map(|(k, v)| (k.into(), v.into())).collect() });
        self
    }
}

/// The upstream a destination refers to, directly or through a service alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    Upstream(ResourceRef),
    Kube(KubernetesServiceDestination),
    Consul(ConsulServiceDestination),
}

/// Kubernetes service alias for an upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesServiceDestination {
    #[serde(rename = "ref")]
    pub service: ResourceRef,
    pub port: u32,
}

/// Consul service alias for an upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsulServiceDestination {
    pub service_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub data_centers: Vec<String>,
}

/// Label selector narrowing load balancing to a sub-pool of endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Subset {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Proportional split across several destinations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MultiDestination {
    #[serde(default)]
    pub destinations: Vec<WeightedDestination>,
}

/// Destination with its share of traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedDestination {
    pub destination: Destination,
    pub weight: u32,
    #[serde(default)]
    pub options: WeightedDestinationOptions,
}

impl WeightedDestination {
    pub fn new(destination: Destination, weight: u32) -> Self {
        Self { destination, weight, options: WeightedDestinationOptions::default() }
    }
}

/// Options applied to a single weighted cluster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WeightedDestinationOptions {
    #[serde(default)]
    pub header_manipulation: Option<HeaderManipulation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RouteAction, TcpHost};

    #[test]
    fn route_destination_yaml_shapes() {
        let yaml = r#"
destination:
  multi:
    destinations:
      - destination:
          upstream: { namespace: ns1, name: reviews }
          subset:
            values: { version: v2 }
        weight: 10
      - destination:
          kube:
            ref: { namespace: default, name: ratings }
            port: 9080
        weight: 5
"#;
        let action: RouteAction = serde_yaml::from_str(yaml).expect("parse route action");
        let Some(RouteDestination::Multi(multi)) = action.destination else {
            panic!("expected multi destination");
        };
        assert_eq!(multi.destinations.len(), 2);
        assert_eq!(
            multi.destinations[0].destination.subset.as_ref().map(|s| s.values.len()),
            Some(1)
        );
        assert!(matches!(
            multi.destinations[1].destination.destination_type,
            DestinationType::Kube(KubernetesServiceDestination { port: 9080, .. })
        ));

        let header = RouteAction::new(RouteDestination::ClusterHeader("x-cluster".into()));
        let yaml = serde_yaml::to_string(&header).expect("serialize route action");
        assert!(yaml.contains("cluster_header: x-cluster"), "{yaml}");
        let round_trip: RouteAction = serde_yaml::from_str(&yaml).expect("parse route action");
        assert_eq!(round_trip.destination, Some(RouteDestination::ClusterHeader("x-cluster".into())));
    }

    #[test]
    fn tcp_destination_yaml_shapes() {
        let forward: TcpHost =
            serde_yaml::from_str("name: sni\ndestination: forward_sni_cluster_name\n").expect("parse host");
        assert_eq!(forward.destination, Some(TcpDestination::ForwardSniClusterName));

        let group: TcpHost = serde_yaml::from_str(
            "name: db\ndestination:\n  upstream_group: { namespace: ns1, name: pg }\n",
        )
        .expect("parse host");
        assert_eq!(
            group.destination,
            Some(TcpDestination::UpstreamGroup(ResourceRef::new("ns1", "pg")))
        );

        let bare: TcpHost = serde_yaml::from_str("name: none\n").expect("parse host");
        assert_eq!(bare.destination, None);
    }

    #[test]
    fn subset_builder_orders_keys() {
        let dest = Destination::upstream("ns", "up").with_subset([("zone", "a"), ("region", "eu")]);
        let keys: Vec<_> = dest.subset.expect("subset").values.into_keys().collect();
        assert_eq!(keys, vec!["region".to_string(), "zone".to_string()]);
    }
}
