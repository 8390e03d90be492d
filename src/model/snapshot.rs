use serde::{Deserialize, Serialize};

use super::{ResourceRef, Upstream, UpstreamGroup};
use crate::errors::TranslationError;

/// Read-only view of the upstreams and upstream groups destinations refer to.
///
/// The snapshot is assembled by the caller before a pass and is never mutated
/// by the translator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Snapshot {
    #[serde(default)]
    pub upstreams: Vec<Upstream>,
    #[serde(default)]
    pub upstream_groups: Vec<UpstreamGroup>,
}

impl Snapshot {
    pub fn new(upstreams: Vec<Upstream>, upstream_groups: Vec<UpstreamGroup>) -> Self {
        Self { upstreams, upstream_groups }
    }

    /// Look up an upstream by namespace and name
    pub fn find_upstream(&self, reference: &ResourceRef) -> Result<&Upstream, TranslationError> {
        self.upstreams
            .iter()
            .find(|upstream| &upstream.metadata == reference)
            .ok_or_else(|| TranslationError::UpstreamNotFound(reference.clone()))
    }

    /// Look up an upstream group by namespace and name
    pub fn find_upstream_group(
        &self,
        reference: &ResourceRef,
    ) -> Result<&UpstreamGroup, TranslationError> {
        self.upstream_groups
            .iter()
            .find(|group| &group.metadata == reference)
            .ok_or_else(|| TranslationError::UpstreamGroupNotFound(reference.clone()))
    }
}
