use serde::{Deserialize, Serialize};

use super::{ResourceRef, RouteDestination, RouteOptions, VirtualHostOptions};

/// A named bundle of routes matched by request domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VirtualHost {
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub options: VirtualHostOptions,
}

impl VirtualHost {
    pub fn new<I, S>(name: impl Into<String>, domains: I, routes: Vec<Route>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            domains: domains.into_iter().map(Into::into).collect(),
            routes,
            options: VirtualHostOptions::default(),
        }
    }
}

/// A set of request predicates and the action taken when one matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Route {
    /// Optional user-facing name; unnamed routes are named from their position
    #[serde(default)]
    pub name: String,
    /// Zero matchers means a single catch-all prefix match on `/`
    #[serde(default)]
    pub matchers: Vec<Matcher>,
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub action: Option<Action>,
    #[serde(default)]
    pub options: RouteOptions,
}

impl Route {
    pub fn new(action: Action) -> Self {
        Self { action: Some(action), ..Default::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_matchers(mut self, matchers: Vec<Matcher>) -> Self {
        self.matchers = matchers;
        self
    }

    /// The route action, if this route forwards to a destination
    pub fn route_action(&self) -> Option<&RouteAction> {
        match &self.action {
            Some(Action::RouteAction(action)) => Some(action),
            _ => None,
        }
    }
}

/// Request predicate of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Matcher {
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub path_specifier: Option<PathSpecifier>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub headers: Vec<HeaderMatcher>,
    #[serde(default)]
    pub query_parameters: Vec<QueryParameterMatcher>,
    /// HTTP methods; empty matches any method
    #[serde(default)]
    pub methods: Vec<String>,
}

impl Matcher {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self { path_specifier: Some(PathSpecifier::Prefix(prefix.into())), ..Default::default() }
    }

    pub fn exact(path: impl Into<String>) -> Self {
        Self { path_specifier: Some(PathSpecifier::Exact(path.into())), ..Default::default() }
    }

    pub fn regex(regex: impl Into<String>) -> Self {
        Self { path_specifier: Some(PathSpecifier::Regex(regex.into())), ..Default::default() }
    }
}

/// Path predicate variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSpecifier {
    Prefix(String),
    Exact(String),
    Regex(String),
}

/// Request header predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMatcher {
    pub name: String,
    /// Empty value only checks that the header is present
    #[serde(default)]
    pub value: String,
    /// Treat `value` as a regular expression
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub invert_match: bool,
}

/// Query parameter predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameterMatcher {
    pub name: String,
    /// Empty value only checks that the parameter is present
    #[serde(default)]
    pub value: String,
    /// Treat `value` as a regular expression
    #[serde(default)]
    pub regex: bool,
}

/// What a route does with a matched request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    RouteAction(RouteAction),
    RedirectAction(RedirectAction),
    DirectResponseAction(DirectResponseAction),
    /// Reference to a GraphQL schema resolved by a later stage
    GraphqlSchemaRef(ResourceRef),
}

/// Forward the request to a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RouteAction {
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub destination: Option<RouteDestination>,
}

impl RouteAction {
    pub fn new(destination: RouteDestination) -> Self {
        Self { destination: Some(destination) }
    }
}

/// Answer with an HTTP redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RedirectAction {
    #[serde(default)]
    pub host_redirect: String,
    #[serde(default)]
    pub response_code: RedirectResponseCode,
    #[serde(default)]
    pub https_redirect: bool,
    #[serde(default)]
    pub strip_query: bool,
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub path_rewrite: Option<PathRewrite>,
}

/// Redirect status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RedirectResponseCode {
    /// 301
    #[default]
    MovedPermanently,
    /// 302
    Found,
    /// 303
    SeeOther,
    /// 307
    TemporaryRedirect,
    /// 308
    PermanentRedirect,
}

/// Path rewrite applied by a redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRewrite {
    PathRedirect(String),
    PrefixRewrite(String),
}

/// Answer directly with a fixed status and body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectResponseAction {
    pub status: u32,
    #[serde(default)]
    pub body: String,
}
