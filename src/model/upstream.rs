use serde::{Deserialize, Serialize};

use super::{ResourceRef, WeightedDestination};

/// A backend service known to the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    pub metadata: ResourceRef,
    /// Label key-sets the upstream's endpoints can be partitioned by
    #[serde(default)]
    pub subset_spec: Option<SubsetSpec>,
}

impl Upstream {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { metadata: ResourceRef::new(namespace, name), subset_spec: None }
    }

    pub fn with_subset_selectors<I, K>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        self.subset_spec = Some(SubsetSpec {
            selectors: selectors
                .into_iter()
                .map(|keys| SubsetSelector { keys: keys.into_iter().map(Into::into).collect() })
                .collect(),
        });
        self
    }
}

/// Declared subset selectors of an upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubsetSpec {
    #[serde(default)]
    pub selectors: Vec<SubsetSelector>,
}

/// One label key-set an upstream can be partitioned by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubsetSelector {
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Named, externally stored list of weighted destinations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamGroup {
    pub metadata: ResourceRef,
    #[serde(default)]
    pub destinations: Vec<WeightedDestination>,
}

impl UpstreamGroup {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        destinations: Vec<WeightedDestination>,
    ) -> Self {
        Self { metadata: ResourceRef::new(namespace, name), destinations }
    }
}
