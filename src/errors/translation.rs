//! Classified failures raised while translating a single proxy.
//!
//! None of these abort a translation pass. They are returned by destination
//! validation, weighted-cluster construction and plugins, then written into the
//! report tree as either a warning or an error depending on [`TranslationError::is_warning`].

use crate::model::ResourceRef;

/// Failure raised inside one translation pass
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// Referenced upstream is absent from the snapshot
    #[error("upstream {0} not found")]
    UpstreamNotFound(ResourceRef),

    /// Referenced upstream group is absent from the snapshot
    #[error("upstream group {0} not found")]
    UpstreamGroupNotFound(ResourceRef),

    /// Route requests a subset but the upstream declares no subset spec
    #[error("route has a subset config, but the upstream does not")]
    SubsetsMisconfigured,

    /// None of the upstream's subset selectors match the route's subset keys
    #[error("route has a subset config, but none of the subsets in the upstream match it")]
    SubsetMismatch,

    /// A multi destination (or upstream group) with no weighted destinations
    #[error("must specify at least one weighted destination for multi destination routes")]
    NoDestinationSpecified,

    /// Route action carries no destination at all
    #[error("must specify either 'single', 'multi', 'upstream_group' or 'cluster_header' for action")]
    MissingDestination,

    /// Route carries no action at all
    #[error("route has no action")]
    MissingAction,

    /// Cluster header name is not a valid HTTP header name
    #[error("{0} is an invalid HTTP header name")]
    InvalidClusterHeader(String),

    /// A member of a weighted destination list failed validation
    #[error("invalid destination in weighted destination list: {source}")]
    InvalidDestination {
        #[source]
        source: Box<TranslationError>,
    },

    /// Sum of destination weights does not fit in 32 bits
    #[error("total weight of weighted destinations overflows")]
    TotalWeightOverflow,

    /// SSL configuration could not be turned into a TLS context
    #[error("invalid ssl configuration: {0}")]
    SslConfig(String),

    /// Failure reported by a plugin
    #[error("{plugin}: {message}")]
    Plugin { plugin: String, message: String },

    /// Broken internal invariant
    #[error("internal error: {0}")]
    Internal(String),
}

impl TranslationError {
    /// Create a plugin error
    pub fn plugin<P: Into<String>, M: Into<String>>(plugin: P, message: M) -> Self {
        Self::Plugin { plugin: plugin.into(), message: message.into() }
    }

    /// Create an SSL configuration error
    pub fn ssl_config<S: Into<String>>(message: S) -> Self {
        Self::SslConfig(message.into())
    }

    /// Wrap a failure from one member of a weighted destination list
    pub fn invalid_destination(source: TranslationError) -> Self {
        Self::InvalidDestination { source: Box::new(source) }
    }

    /// Whether this failure is reported as a warning rather than an error.
    ///
    /// Only a missing upstream, a missing upstream group and a subset requested
    /// against an upstream without subset spec are warnings.
    pub fn is_warning(&self) -> bool {
        match self {
            Self::UpstreamNotFound(_)
            | Self::UpstreamGroupNotFound(_)
            | Self::SubsetsMisconfigured => true,
            Self::InvalidDestination { source } => source.is_warning(),
            _ => false,
        }
    }

    /// Whether the failure is a destination-not-found condition
    pub fn is_destination_not_found(&self) -> bool {
        match self {
            Self::UpstreamNotFound(_) | Self::UpstreamGroupNotFound(_) => true,
            Self::InvalidDestination { source } => source.is_destination_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_classification() {
        let missing = TranslationError::UpstreamNotFound(ResourceRef::new("ns1", "missing"));
        assert!(missing.is_warning());
        assert!(missing.is_destination_not_found());
        assert!(TranslationError::SubsetsMisconfigured.is_warning());
        assert!(!TranslationError::SubsetsMisconfigured.is_destination_not_found());

        assert!(!TranslationError::SubsetMismatch.is_warning());
        assert!(!TranslationError::NoDestinationSpecified.is_warning());
        assert!(!TranslationError::InvalidClusterHeader("x:y".into()).is_warning());
        assert!(!TranslationError::plugin("headers", "boom").is_warning());
    }

    #[test]
    fn wrapped_errors_keep_their_class() {
        let wrapped = TranslationError::invalid_destination(TranslationError::UpstreamGroupNotFound(
            ResourceRef::new("ns", "group"),
        ));
        assert!(wrapped.is_warning());
        assert_eq!(
            wrapped.to_string(),
            "invalid destination in weighted destination list: upstream group ns.group not found"
        );

        let wrapped = TranslationError::invalid_destination(TranslationError::SubsetMismatch);
        assert!(!wrapped.is_warning());
    }

    #[test]
    fn plugin_error_display() {
        let err = TranslationError::plugin("headers", "cannot mutate pseudo-header :path");
        assert_eq!(err.to_string(), "headers: cannot mutate pseudo-header :path");
    }
}
