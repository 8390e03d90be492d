use serde::{Deserialize, Serialize};

/// Options applied to every route configuration produced for a listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RouteConfigurationOptions {
    /// Largest inline body a direct response may carry
    #[serde(default)]
    pub max_direct_response_body_size_bytes: Option<u32>,
}

/// Request/response header manipulation, attachable to virtual hosts, routes
/// and weighted destinations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HeaderManipulation {
    /// Headers to add/modify in requests
    #[serde(default)]
    pub request_headers_to_add: Vec<HeaderValueEntry>,
    /// Headers to remove from requests
    #[serde(default)]
    pub request_headers_to_remove: Vec<String>,
    /// Headers to add/modify in responses
    #[serde(default)]
    pub response_headers_to_add: Vec<HeaderValueEntry>,
    /// Headers to remove from responses
    #[serde(default)]
    pub response_headers_to_remove: Vec<String>,
}

impl HeaderManipulation {
    pub fn is_empty(&self) -> bool {
        self.request_headers_to_add.is_empty()
            && self.request_headers_to_remove.is_empty()
            && self.response_headers_to_add.is_empty()
            && self.response_headers_to_remove.is_empty()
    }
}

/// Single header entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderValueEntry {
    /// Header name
    pub key: String,
    /// Header value
    pub value: String,
    /// Whether to append if header already exists (default: false = overwrite)
    #[serde(default)]
    pub append: bool,
}

impl HeaderValueEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into(), append: false }
    }
}

/// Options attached to a virtual host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VirtualHostOptions {
    #[serde(default)]
    pub header_manipulation: Option<HeaderManipulation>,
}

/// Options attached to a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RouteOptions {
    #[serde(default)]
    pub header_manipulation: Option<HeaderManipulation>,
}
