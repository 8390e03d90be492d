//! HTTP filter utilities shared by the network filter builder and plugins.
//!
//! HTTP-filter plugins contribute [`StagedHttpFilter`]s. The connection manager
//! receives them sorted by [`FilterStage`], with the router filter always last.

use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router as RouterFilter;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_filter::ConfigType as HttpFilterConfigType, HttpFilter,
};
use envoy_types::pb::google::protobuf::Any;
use prost::Message;

use crate::errors::TranslationError;

/// Envoy's canonical router filter name
pub const ROUTER_FILTER_NAME: &str = "envoy.filters.http.router";

const ROUTER_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";

/// Helper for building Envoy `Any` values from prost messages.
pub fn any_from_message<M: Message>(type_url: impl Into<String>, msg: &M) -> Any {
    Any { type_url: type_url.into(), value: msg.encode_to_vec() }
}

/// Well-known positions in the HTTP filter chain, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WellKnownStage {
    Fault,
    Cors,
    Waf,
    AuthN,
    AuthZ,
    RateLimit,
    Accepted,
    OutAuth,
    Route,
}

/// Where a filter sits relative to a well-known stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageWeight {
    Before,
    During,
    After,
}

/// Position of an HTTP filter in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterStage {
    pub stage: WellKnownStage,
    pub weight: StageWeight,
}

impl FilterStage {
    pub fn before(stage: WellKnownStage) -> Self {
        Self { stage, weight: StageWeight::Before }
    }

    pub fn during(stage: WellKnownStage) -> Self {
        Self { stage, weight: StageWeight::During }
    }

    pub fn after(stage: WellKnownStage) -> Self {
        Self { stage, weight: StageWeight::After }
    }
}

/// An HTTP filter together with its stage
#[derive(Debug, Clone, PartialEq)]
pub struct StagedHttpFilter {
    pub filter: HttpFilter,
    pub stage: FilterStage,
}

impl StagedHttpFilter {
    /// Filter configured with a typed prost message
    pub fn new<M: Message>(
        name: impl Into<String>,
        type_url: &str,
        config: &M,
        stage: FilterStage,
    ) -> Self {
        Self {
            filter: HttpFilter {
                name: name.into(),
                is_optional: false,
                disabled: false,
                config_type: Some(HttpFilterConfigType::TypedConfig(any_from_message(
                    type_url, config,
                ))),
            },
            stage,
        }
    }
}

/// Build the ordered filter list and ensure the router filter is last.
///
/// Filters are sorted stably by stage, so filters of one stage keep the order
/// their plugins produced them in. A plugin may supply its own router filter;
/// more than one is an error.
pub fn build_http_filters(
    mut staged: Vec<StagedHttpFilter>,
) -> Result<Vec<HttpFilter>, TranslationError> {
    staged.sort_by_key(|filter| filter.stage);

    let mut filters = Vec::with_capacity(staged.len() + 1);
    let mut router_filter: Option<HttpFilter> = None;

    for StagedHttpFilter { filter, .. } in staged {
        if filter.name == ROUTER_FILTER_NAME {
            if router_filter.is_some() {
                return Err(TranslationError::Internal(
                    "multiple router filters specified".to_string(),
                ));
            }
            router_filter = Some(filter);
        } else {
            filters.push(filter);
        }
    }

    filters.push(router_filter.unwrap_or_else(default_router_filter));

    Ok(filters)
}

fn default_router_filter() -> HttpFilter {
    HttpFilter {
        name: ROUTER_FILTER_NAME.to_string(),
        is_optional: false,
        disabled: false,
        config_type: Some(HttpFilterConfigType::TypedConfig(any_from_message(
            ROUTER_TYPE_URL,
            &RouterFilter::default(),
        ))),
    }
}
