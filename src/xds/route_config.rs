//! Route configuration translation.
//!
//! Every HTTP listener, top-level or matched inside a hybrid listener, yields
//! exactly one envoy `RouteConfiguration`. Virtual hosts and routes are built in
//! input order and named from their position, so repeated passes over the same
//! input produce identical output. Problems are written into the report node of
//! the object they concern and never stop the pass.

use envoy_types::pb::envoy::config::core::v3::Metadata;
use envoy_types::pb::envoy::config::route::v3::{
    redirect_action::{
        PathRewriteSpecifier, RedirectResponseCode as EnvoyRedirectResponseCode,
        SchemeRewriteSpecifier,
    },
    route::Action as EnvoyAction,
    route_action::ClusterSpecifier,
    virtual_host::TlsRequirementType,
    weighted_cluster::ClusterWeight,
    DirectResponseAction as EnvoyDirectResponseAction, RedirectAction as EnvoyRedirectAction,
    Route as EnvoyRoute, RouteAction as EnvoyRouteAction, RouteConfiguration,
    VirtualHost as EnvoyVirtualHost, WeightedCluster,
};
use envoy_types::pb::google::protobuf::UInt32Value;
use tracing::{debug, error};

use crate::errors::TranslationError;
use crate::model::{
    Action, Destination, HttpListener, Listener, PathRewrite, Proxy, RedirectAction,
    RedirectResponseCode, Route, RouteAction, RouteDestination, VirtualHost, WeightedDestination,
};
use crate::plugins::{
    Params, PluginRegistry, RouteActionParams, RouteParams, VirtualHostParams,
    HEADERS_PLUGIN_NAME,
};
use crate::validation::{
    check_that_subset_matches_upstream, destination_to_upstream_ref, validate_cluster_header,
    validate_route_destinations, validate_virtual_host_domains, HttpListenerReport,
    ListenerReport, RouteErrorKind, RouteReport, RouteWarningKind, VirtualHostErrorKind,
    VirtualHostReport, WILDCARD_DOMAIN,
};
use crate::xds::matchers::{default_matcher, matcher_problems, translate_matcher};
use crate::xds::utils::{
    data_source_from_string, lb_metadata, sanitize_for_envoy, upstream_to_cluster_name,
};

/// Builds the route configurations of one listener
#[derive(Debug, Clone)]
pub enum RouteConfigurationTranslator<'a> {
    /// Listeners without HTTP traffic
    Empty,
    Http(HttpRouteConfigurationTranslator<'a>),
    /// One translator per HTTP matched listener, in matched-listener order
    Multi(Vec<HttpRouteConfigurationTranslator<'a>>),
}

impl RouteConfigurationTranslator<'_> {
    pub fn compute_route_configurations(&self, report: &mut ListenerReport) -> Vec<RouteConfiguration> {
        match self {
            Self::Empty => Vec::new(),
            Self::Http(translator) => vec![translator.compute_route_configuration(report)],
            Self::Multi(translators) => translators
                .iter()
                .map(|translator| translator.compute_route_configuration(report))
                .collect(),
        }
    }
}

/// Where an HTTP listener's report lives inside its listener report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpReportLocation {
    TopLevel,
    /// Index of the matched listener of a hybrid listener
    Matched(usize),
}

/// Builds the route configuration of one HTTP listener
#[derive(Debug, Clone)]
pub struct HttpRouteConfigurationTranslator<'a> {
    pub plugins: &'a PluginRegistry,
    pub params: Params<'a>,
    pub proxy: &'a Proxy,
    pub parent: &'a Listener,
    pub listener: &'a HttpListener,
    pub report_location: HttpReportLocation,
    pub route_config_name: String,
    pub require_tls_on_virtual_hosts: bool,
}

impl HttpRouteConfigurationTranslator<'_> {
    pub fn compute_route_configuration(&self, report: &mut ListenerReport) -> RouteConfiguration {
        let span = crate::route_config_span!(self.route_config_name, listener = %self.parent.name);
        let _guard = span.enter();

        let http_report = match self.report_location {
            HttpReportLocation::TopLevel => report.http_mut(),
            HttpReportLocation::Matched(index) => {
                report.hybrid_mut().and_then(|hybrid| hybrid.http_mut(index))
            }
        };

        match http_report {
            Some(http_report) => self.compute(http_report),
            None => {
                error!(
                    listener = %self.parent.name,
                    route_config = %self.route_config_name,
                    "internal error: listener report has no HTTP sub-report for route configuration"
                );
                self.compute(&mut HttpListenerReport::for_listener(self.listener))
            }
        }
    }

    fn compute(&self, report: &mut HttpListenerReport) -> RouteConfiguration {
        validate_virtual_host_domains(&self.listener.virtual_hosts, report);

        let virtual_hosts: Vec<EnvoyVirtualHost> = self
            .listener
            .virtual_hosts
            .iter()
            .enumerate()
            .map(|(index, virtual_host)| {
                self.compute_virtual_host(virtual_host, report.virtual_host_report_mut(index))
            })
            .collect();

        debug!(
            route_config = %self.route_config_name,
            virtual_hosts = virtual_hosts.len(),
            "Computed route configuration"
        );

        RouteConfiguration {
            name: self.route_config_name.clone(),
            virtual_hosts,
            max_direct_response_body_size_bytes: self
                .parent
                .route_options
                .max_direct_response_body_size_bytes
                .map(|value| UInt32Value { value }),
            ..Default::default()
        }
    }

    fn compute_virtual_host(
        &self,
        input: &VirtualHost,
        report: &mut VirtualHostReport,
    ) -> EnvoyVirtualHost {
        // Plugins see the sanitized copy, never the snapshot's value
        let mut virtual_host = input.clone();
        virtual_host.name = sanitize_for_envoy(&virtual_host.name, "virtual host");

        let virtual_host_params = VirtualHostParams {
            params: self.params,
            proxy: self.proxy,
            listener: self.parent,
            http_listener: self.listener,
        };
        let route_params =
            RouteParams { virtual_host_params, virtual_host: &virtual_host };

        let mut routes = Vec::new();
        for (index, route) in virtual_host.routes.iter().enumerate() {
            let generated_name = format!("{}-route-{}", virtual_host.name, index);
            routes.extend(self.envoy_routes(
                &route_params,
                route,
                &generated_name,
                report.route_report_mut(index),
            ));
        }

        let domains = match virtual_host.domains.as_slice() {
            [] => vec![WILDCARD_DOMAIN.to_string()],
            [only] if only.is_empty() => vec![WILDCARD_DOMAIN.to_string()],
            domains => domains.to_vec(),
        };

        let require_tls = if self.require_tls_on_virtual_hosts {
            TlsRequirementType::All
        } else {
            TlsRequirementType::None
        };

        let mut out = EnvoyVirtualHost {
            name: virtual_host.name.clone(),
            domains,
            routes,
            require_tls: require_tls as i32,
            ..Default::default()
        };

        for plugin in self.plugins.virtual_host_plugins() {
            if let Err(err) = plugin.process_virtual_host(&virtual_host_params, &virtual_host, &mut out) {
                debug!(virtual_host = %virtual_host.name, plugin = %plugin.name(), error = %err, "Virtual host plugin failed");
                report.add_error(
                    VirtualHostErrorKind::Processing,
                    format!("invalid virtual host [{}]: {}", virtual_host.name, err),
                );
            }
        }

        out
    }

    fn envoy_routes(
        &self,
        params: &RouteParams<'_>,
        route: &Route,
        generated_name: &str,
        report: &mut RouteReport,
    ) -> Vec<EnvoyRoute> {
        let mut out = init_routes(route, generated_name, report);
        for envoy_route in &mut out {
            self.set_action(params, route, envoy_route, report);
        }
        out
    }

    fn set_action(
        &self,
        params: &RouteParams<'_>,
        route: &Route,
        out: &mut EnvoyRoute,
        report: &mut RouteReport,
    ) {
        let route_name = out.name.clone();

        match &route.action {
            Some(Action::RouteAction(action)) => {
                if let Err(err) = validate_route_destinations(&self.params, action.destination.as_ref()) {
                    report_destination_error(report, &err, &route_name);
                }

                let mut envoy_action = EnvoyRouteAction::default();
                if let Err(err) =
                    self.set_route_action(params, action, &mut envoy_action, report, &route_name)
                {
                    report_destination_error(report, &err, &route_name);
                    if envoy_action.cluster_specifier.is_none() {
                        // Keep the route routable by name so a later pass can replace it
                        envoy_action.cluster_specifier = Some(ClusterSpecifier::Cluster(String::new()));
                    }
                }
                out.action = Some(EnvoyAction::Route(envoy_action));
                self.run_route_plugins(params, route, out, report);
            }
            Some(Action::DirectResponseAction(action)) => {
                out.action = Some(EnvoyAction::DirectResponse(EnvoyDirectResponseAction {
                    status: action.status,
                    body: Some(data_source_from_string(&action.body)),
                    ..Default::default()
                }));

                for plugin in self.plugins.route_plugins() {
                    if plugin.name() != HEADERS_PLUGIN_NAME {
                        continue;
                    }
                    if let Err(err) = plugin.process_route(params, route, out) {
                        report_plugin_error(report, &err, &route_name);
                    }
                }
            }
            Some(Action::GraphqlSchemaRef(_)) => {
                out.action = Some(EnvoyAction::Route(EnvoyRouteAction {
                    cluster_specifier: Some(ClusterSpecifier::Cluster(
                        self.params.settings.graphql_placeholder_cluster.clone(),
                    )),
                    ..Default::default()
                }));
                self.run_route_plugins(params, route, out, report);
            }
            Some(Action::RedirectAction(action)) => {
                out.action = Some(EnvoyAction::Redirect(translate_redirect(action)));
            }
            None => {
                report.add_error(
                    RouteErrorKind::Processing,
                    TranslationError::MissingAction.to_string(),
                    route_name,
                );
            }
        }
    }

    fn run_route_plugins(
        &self,
        params: &RouteParams<'_>,
        route: &Route,
        out: &mut EnvoyRoute,
        report: &mut RouteReport,
    ) {
        let route_name = out.name.clone();

        for plugin in self.plugins.route_plugins() {
            if let Err(err) = plugin.process_route(params, route, out) {
                report_plugin_error(report, &err, &route_name);
            }
        }

        let (Some(action), Some(EnvoyAction::Route(envoy_action))) =
            (route.route_action(), out.action.as_mut())
        else {
            return;
        };

        let route_action_params = RouteActionParams { route_params: *params, route };
        for plugin in self.plugins.route_action_plugins() {
            if let Err(err) = plugin.process_route_action(&route_action_params, action, envoy_action) {
                report_plugin_error(report, &err, &route_name);
            }
        }
    }

    fn set_route_action(
        &self,
        params: &RouteParams<'_>,
        input: &RouteAction,
        out: &mut EnvoyRouteAction,
        report: &mut RouteReport,
        route_name: &str,
    ) -> Result<(), TranslationError> {
        let Params { snapshot, settings } = self.params;

        match input.destination.as_ref() {
            Some(RouteDestination::Single(destination)) => {
                let upstream = destination_to_upstream_ref(destination, settings);
                out.cluster_specifier =
                    Some(ClusterSpecifier::Cluster(upstream_to_cluster_name(&upstream)));
                out.metadata_match = subset_metadata(destination);
                check_that_subset_matches_upstream(snapshot, settings, destination)
            }
            Some(RouteDestination::Multi(multi)) => {
                self.set_weighted_clusters(params, &multi.destinations, out, report, route_name)
            }
            Some(RouteDestination::UpstreamGroup(reference)) => {
                let group = snapshot.find_upstream_group(reference)?;
                self.set_weighted_clusters(params, &group.destinations, out, report, route_name)
            }
            Some(RouteDestination::ClusterHeader(header)) => {
                validate_cluster_header(header)?;
                out.cluster_specifier = Some(ClusterSpecifier::ClusterHeader(header.clone()));
                Ok(())
            }
            None => Err(TranslationError::MissingDestination),
        }
    }

    fn set_weighted_clusters(
        &self,
        params: &RouteParams<'_>,
        destinations: &[WeightedDestination],
        out: &mut EnvoyRouteAction,
        report: &mut RouteReport,
        route_name: &str,
    ) -> Result<(), TranslationError> {
        if destinations.is_empty() {
            return Err(TranslationError::NoDestinationSpecified);
        }

        let Params { snapshot, settings } = self.params;
        let mut total_weight: u32 = 0;
        let mut clusters = Vec::with_capacity(destinations.len());

        for weighted in destinations {
            let upstream = destination_to_upstream_ref(&weighted.destination, settings);
            total_weight = total_weight
                .checked_add(weighted.weight)
                .ok_or(TranslationError::TotalWeightOverflow)?;

            let mut cluster = ClusterWeight {
                name: upstream_to_cluster_name(&upstream),
                weight: Some(UInt32Value { value: weighted.weight }),
                metadata_match: subset_metadata(&weighted.destination),
                ..Default::default()
            };

            for plugin in self.plugins.weighted_destination_plugins() {
                if let Err(err) = plugin.process_weighted_destination(params, weighted, &mut cluster) {
                    report.add_error(RouteErrorKind::Processing, err.to_string(), route_name);
                }
            }

            clusters.push(cluster);
            check_that_subset_matches_upstream(snapshot, settings, &weighted.destination)?;
        }

        #[allow(deprecated)]
        let weighted_cluster = WeightedCluster {
            clusters,
            total_weight: Some(UInt32Value { value: total_weight }),
            ..Default::default()
        };
        out.cluster_specifier = Some(ClusterSpecifier::WeightedClusters(weighted_cluster));
        Ok(())
    }
}

/// One envoy route per matcher, or a single catch-all route
fn init_routes(route: &Route, generated_name: &str, report: &mut RouteReport) -> Vec<EnvoyRoute> {
    if route.matchers.is_empty() {
        return vec![EnvoyRoute {
            name: generated_name.to_string(),
            r#match: Some(translate_matcher(&default_matcher())),
            ..Default::default()
        }];
    }

    route
        .matchers
        .iter()
        .enumerate()
        .map(|(index, matcher)| {
            let name = if route.name.is_empty() {
                format!("{generated_name}-matcher-{index}")
            } else {
                format!("{generated_name}-{}-matcher-{index}", route.name)
            };
            for problem in matcher_problems(matcher) {
                report.add_error(RouteErrorKind::InvalidMatcher, problem, name.as_str());
            }
            EnvoyRoute {
                name,
                r#match: Some(translate_matcher(matcher)),
                ..Default::default()
            }
        })
        .collect()
}

fn translate_redirect(action: &RedirectAction) -> EnvoyRedirectAction {
    let response_code = match action.response_code {
        RedirectResponseCode::MovedPermanently => EnvoyRedirectResponseCode::MovedPermanently,
        RedirectResponseCode::Found => EnvoyRedirectResponseCode::Found,
        RedirectResponseCode::SeeOther => EnvoyRedirectResponseCode::SeeOther,
        RedirectResponseCode::TemporaryRedirect => EnvoyRedirectResponseCode::TemporaryRedirect,
        RedirectResponseCode::PermanentRedirect => EnvoyRedirectResponseCode::PermanentRedirect,
    };

    EnvoyRedirectAction {
        host_redirect: action.host_redirect.clone(),
        response_code: response_code as i32,
        scheme_rewrite_specifier: Some(SchemeRewriteSpecifier::HttpsRedirect(action.https_redirect)),
        strip_query: action.strip_query,
        path_rewrite_specifier: action.path_rewrite.as_ref().map(|rewrite| match rewrite {
            PathRewrite::PathRedirect(path) => PathRewriteSpecifier::PathRedirect(path.clone()),
            PathRewrite::PrefixRewrite(prefix) => PathRewriteSpecifier::PrefixRewrite(prefix.clone()),
        }),
        ..Default::default()
    }
}

fn subset_metadata(destination: &Destination) -> Option<Metadata> {
    destination
        .subset
        .as_ref()
        .filter(|subset| !subset.values.is_empty())
        .map(|subset| lb_metadata(&subset.values))
}

/// Missing upstreams are warnings, everything else is an error
fn report_destination_error(report: &mut RouteReport, err: &TranslationError, route_name: &str) {
    if err.is_warning() {
        report.add_warning(RouteWarningKind::InvalidDestination, err.to_string(), route_name);
    } else {
        report.add_error(RouteErrorKind::Processing, err.to_string(), route_name);
    }
}

/// Plugin failures on missing upstreams were already reported as warnings
fn report_plugin_error(report: &mut RouteReport, err: &TranslationError, route_name: &str) {
    if err.is_warning() {
        debug!(route = %route_name, error = %err, "Ignoring plugin warning");
        return;
    }
    report.add_error(RouteErrorKind::Processing, err.to_string(), route_name);
}
