//! Header manipulation plugin
//!
//! Applies the `header_manipulation` options of virtual hosts, routes and
//! weighted destinations to the generated envoy objects.

use envoy_types::pb::envoy::config::core::v3::{
    header_value_option::HeaderAppendAction, HeaderValue, HeaderValueOption,
};
use envoy_types::pb::envoy::config::route::v3::{
    weighted_cluster::ClusterWeight, Route as EnvoyRoute, VirtualHost as EnvoyVirtualHost,
};

use super::{
    Plugin, RouteParams, RoutePlugin, VirtualHostParams, VirtualHostPlugin,
    WeightedDestinationPlugin,
};
use crate::errors::TranslationError;
use crate::model::{HeaderManipulation, HeaderValueEntry, Route, VirtualHost, WeightedDestination};

/// Name the route translator uses to pick this plugin for direct responses
pub const HEADERS_PLUGIN_NAME: &str = "headers";

/// Header lists ready to be copied onto an envoy object
#[derive(Debug, Default, PartialEq)]
struct EnvoyHeaders {
    request_headers_to_add: Vec<HeaderValueOption>,
    request_headers_to_remove: Vec<String>,
    response_headers_to_add: Vec<HeaderValueOption>,
    response_headers_to_remove: Vec<String>,
}

/// Adds and removes request/response headers
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadersPlugin;

impl HeadersPlugin {
    pub fn new() -> Self {
        Self
    }

    fn convert(&self, manipulation: &HeaderManipulation) -> Result<EnvoyHeaders, TranslationError> {
        Ok(EnvoyHeaders {
            request_headers_to_add: convert_entries(&manipulation.request_headers_to_add, "request")?,
            request_headers_to_remove: check_removals(
                &manipulation.request_headers_to_remove,
                "request",
            )?,
            response_headers_to_add: convert_entries(
                &manipulation.response_headers_to_add,
                "response",
            )?,
            response_headers_to_remove: check_removals(
                &manipulation.response_headers_to_remove,
                "response",
            )?,
        })
    }
}

fn check_key(key: &str, context: &str) -> Result<(), TranslationError> {
    if key.trim().is_empty() {
        return Err(TranslationError::plugin(
            HEADERS_PLUGIN_NAME,
            format!("{context} header key cannot be empty"),
        ));
    }
    if key.starts_with(':') {
        return Err(TranslationError::plugin(
            HEADERS_PLUGIN_NAME,
            format!("cannot mutate pseudo-header {key} in {context} headers"),
        ));
    }
    Ok(())
}

fn convert_entries(
    entries: &[HeaderValueEntry],
    context: &str,
) -> Result<Vec<HeaderValueOption>, TranslationError> {
    entries
        .iter()
        .map(|entry| {
            check_key(&entry.key, context)?;
            Ok(HeaderValueOption {
                header: Some(HeaderValue {
                    key: entry.key.clone(),
                    value: entry.value.clone(),
                    raw_value: Vec::new(),
                }),
                #[allow(deprecated)]
                append: None, // Deprecated field, use append_action instead
                append_action: if entry.append {
                    HeaderAppendAction::AppendIfExistsOrAdd as i32
                } else {
                    HeaderAppendAction::OverwriteIfExistsOrAdd as i32
                },
                keep_empty_value: false,
            })
        })
        .collect()
}

fn check_removals(headers: &[String], context: &str) -> Result<Vec<String>, TranslationError> {
    for header in headers {
        check_key(header, context)?;
    }
    Ok(headers.to_vec())
}

impl Plugin for HeadersPlugin {
    fn name(&self) -> &str {
        HEADERS_PLUGIN_NAME
    }
}

impl VirtualHostPlugin for HeadersPlugin {
    fn process_virtual_host(
        &self,
        _params: &VirtualHostParams<'_>,
        input: &VirtualHost,
        out: &mut EnvoyVirtualHost,
    ) -> Result<(), TranslationError> {
        let Some(manipulation) = input.options.header_manipulation.as_ref() else {
            return Ok(());
        };
        let headers = self.convert(manipulation)?;
        out.request_headers_to_add.extend(headers.request_headers_to_add);
        out.request_headers_to_remove.extend(headers.request_headers_to_remove);
        out.response_headers_to_add.extend(headers.response_headers_to_add);
        out.response_headers_to_remove.extend(headers.response_headers_to_remove);
        Ok(())
    }
}

impl RoutePlugin for HeadersPlugin {
    fn process_route(
        &self,
        _params: &RouteParams<'_>,
        input: &Route,
        out: &mut EnvoyRoute,
    ) -> Result<(), TranslationError> {
        let Some(manipulation) = input.options.header_manipulation.as_ref() else {
            return Ok(());
        };
        let headers = self.convert(manipulation)?;
        out.request_headers_to_add.extend(headers.request_headers_to_add);
        out.request_headers_to_remove.extend(headers.request_headers_to_remove);
        out.response_headers_to_add.extend(headers.response_headers_to_add);
        out.response_headers_to_remove.extend(headers.response_headers_to_remove);
        Ok(())
    }
}

impl WeightedDestinationPlugin for HeadersPlugin {
    fn process_weighted_destination(
        &self,
        _params: &RouteParams<'_>,
        input: &WeightedDestination,
        out: &mut ClusterWeight,
    ) -> Result<(), TranslationError> {
        let Some(manipulation) = input.options.header_manipulation.as_ref() else {
            return Ok(());
        };
        let headers = self.convert(manipulation)?;
        out.request_headers_to_add.extend(headers.request_headers_to_add);
        out.request_headers_to_remove.extend(headers.request_headers_to_remove);
        out.response_headers_to_add.extend(headers.response_headers_to_add);
        out.response_headers_to_remove.extend(headers.response_headers_to_remove);
        Ok(())
    }
}
