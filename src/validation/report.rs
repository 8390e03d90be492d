//! # Translation Report
//!
//! A tree of findings that mirrors the proxy by position: listener report `N`
//! belongs to listener `N`, virtual host report `M` to virtual host `M`, and so
//! on. The tree is pre-sized from the proxy before a pass begins so each
//! listener's translators write into their own subtree only.
//!
//! Nodes only ever grow. Accessors that take an index extend the underlying
//! vector when the index is past the end instead of panicking, so a report that
//! was sized from a slightly different proxy still absorbs every finding.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{HttpListener, HybridListener, Listener, ListenerType, MatchedListenerType, Proxy, TcpListener};

/// A single error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding<K> {
    pub kind: K,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_name: Option<String>,
}

impl<K> Finding<K> {
    pub fn new(kind: K, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), route_name: None }
    }

    pub fn for_route(kind: K, message: impl Into<String>, route_name: impl Into<String>) -> Self {
        let route_name = route_name.into();
        Self {
            kind,
            message: message.into(),
            route_name: (!route_name.is_empty()).then_some(route_name),
        }
    }
}

impl<K: fmt::Display> fmt::Display for Finding<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.route_name {
            Some(route) => write!(f, "{}: {} (route {})", self.kind, self.message, route),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Append a finding unless an identical one is already present
fn push_unique<K: PartialEq>(findings: &mut Vec<Finding<K>>, finding: Finding<K>) {
    if !findings.contains(&finding) {
        findings.push(finding);
    }
}

fn grow<T: Default>(items: &mut Vec<T>, index: usize) -> &mut T {
    if items.len() <= index {
        items.resize_with(index + 1, T::default);
    }
    &mut items[index]
}

macro_rules! finding_kinds {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $label),+
                })
            }
        }
    };
}

finding_kinds!(
    /// Errors attached to a listener
    ListenerErrorKind {
        NameNotUnique => "NameNotUniqueError",
        BindPortNotUnique => "BindPortNotUniqueError",
        SslConfig => "SSLConfigError",
        Processing => "ProcessingError",
    }
);

finding_kinds!(
    /// Errors attached to an HTTP listener
    HttpListenerErrorKind {
        Processing => "ProcessingError",
    }
);

finding_kinds!(
    /// Errors attached to a virtual host
    VirtualHostErrorKind {
        DomainsNotUnique => "DomainsNotUniqueError",
        EmptyDomain => "EmptyDomainError",
        Processing => "ProcessingError",
    }
);

finding_kinds!(
    /// Errors attached to a route
    RouteErrorKind {
        InvalidMatcher => "InvalidMatcherError",
        Processing => "ProcessingError",
    }
);

finding_kinds!(
    /// Warnings attached to a route
    RouteWarningKind {
        InvalidDestination => "InvalidDestinationWarning",
    }
);

finding_kinds!(
    /// Errors attached to a TCP listener
    TcpListenerErrorKind {
        Processing => "ProcessingError",
    }
);

finding_kinds!(
    /// Errors attached to a TCP host
    TcpHostErrorKind {
        NameNotUnique => "NameNotUniqueError",
        InvalidDestination => "InvalidDestinationError",
        Processing => "ProcessingError",
    }
);

/// Severity of a flattened report entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A finding flattened out of the tree together with its position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Position in the tree, e.g. `listener[0].virtual_host[1].route[2]`
    pub path: String,
    pub severity: Severity,
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_name: Option<String>,
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.path, self.kind, self.message)?;
        if let Some(route) = &self.route_name {
            write!(f, " (route {route})")?;
        }
        Ok(())
    }
}

fn collect<K: fmt::Display>(
    out: &mut Vec<ReportEntry>,
    path: &str,
    severity: Severity,
    findings: &[Finding<K>],
) {
    out.extend(findings.iter().map(|finding| ReportEntry {
        path: path.to_string(),
        severity,
        kind: finding.kind.to_string(),
        message: finding.message.clone(),
        route_name: finding.route_name.clone(),
    }));
}

/// Report for a whole proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProxyReport {
    #[serde(default)]
    pub listener_reports: Vec<ListenerReport>,
}

impl ProxyReport {
    /// Pre-size a report so that it mirrors the proxy
    pub fn for_proxy(proxy: &Proxy) -> Self {
        Self { listener_reports: proxy.listeners.iter().map(ListenerReport::for_listener).collect() }
    }

    pub fn listener_report_mut(&mut self, index: usize) -> &mut ListenerReport {
        grow(&mut self.listener_reports, index)
    }

    /// Every finding in the tree, depth first in proxy order
    pub fn entries(&self) -> Vec<ReportEntry> {
        let mut out = Vec::new();
        for (index, listener) in self.listener_reports.iter().enumerate() {
            listener.collect(&mut out, &format!("listener[{index}]"));
        }
        out
    }

    pub fn has_errors(&self) -> bool {
        self.entries().iter().any(|entry| entry.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.entries().iter().any(|entry| entry.severity == Severity::Warning)
    }

    /// Number of errors and warnings in the tree
    pub fn counts(&self) -> (usize, usize) {
        self.entries().iter().fold((0, 0), |(errors, warnings), entry| match entry.severity {
            Severity::Error => (errors + 1, warnings),
            Severity::Warning => (errors, warnings + 1),
        })
    }

    /// Error lines prefixed with their position in the tree
    pub fn error_messages(&self) -> Vec<String> {
        self.messages(Severity::Error)
    }

    /// Warning lines prefixed with their position in the tree
    pub fn warning_messages(&self) -> Vec<String> {
        self.messages(Severity::Warning)
    }

    fn messages(&self, severity: Severity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.severity == severity)
            .map(|entry| entry.to_string())
            .collect()
    }
}

/// Report for one listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListenerReport {
    #[serde(default)]
    pub errors: Vec<Finding<ListenerErrorKind>>,
    /// Typed sub-report matching the listener variant
    #[serde(default)]
    pub listener_type: Option<ListenerTypeReport>,
}

/// Typed sub-report of a listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerTypeReport {
    Http(HttpListenerReport),
    Tcp(TcpListenerReport),
    Hybrid(HybridListenerReport),
}

impl ListenerTypeReport {
    fn for_listener_type(listener_type: &ListenerType) -> Self {
        match listener_type {
            ListenerType::Http(http) => Self::Http(HttpListenerReport::for_listener(http)),
            ListenerType::Tcp(tcp) => Self::Tcp(TcpListenerReport::for_listener(tcp)),
            ListenerType::Hybrid(hybrid) => Self::Hybrid(HybridListenerReport::for_listener(hybrid)),
        }
    }

    fn matches(&self, listener_type: &ListenerType) -> bool {
        matches!(
            (self, listener_type),
            (Self::Http(_), ListenerType::Http(_))
                | (Self::Tcp(_), ListenerType::Tcp(_))
                | (Self::Hybrid(_), ListenerType::Hybrid(_))
        )
    }
}

impl ListenerReport {
    pub fn for_listener(listener: &Listener) -> Self {
        Self {
            errors: Vec::new(),
            listener_type: Some(ListenerTypeReport::for_listener_type(&listener.listener_type)),
        }
    }

    pub fn add_error(&mut self, kind: ListenerErrorKind, message: impl Into<String>) {
        push_unique(&mut self.errors, Finding::new(kind, message));
    }

    /// Whether the typed sub-report is present and matches the listener variant
    pub fn matches(&self, listener: &Listener) -> bool {
        self.listener_type
            .as_ref()
            .is_some_and(|report| report.matches(&listener.listener_type))
    }

    /// Replace a missing or mismatched typed sub-report with a fresh one
    pub fn repair(&mut self, listener: &Listener) {
        self.listener_type = Some(ListenerTypeReport::for_listener_type(&listener.listener_type));
    }

    pub fn http_mut(&mut self) -> Option<&mut HttpListenerReport> {
        match self.listener_type.as_mut() {
            Some(ListenerTypeReport::Http(report)) => Some(report),
            _ => None,
        }
    }

    pub fn tcp_mut(&mut self) -> Option<&mut TcpListenerReport> {
        match self.listener_type.as_mut() {
            Some(ListenerTypeReport::Tcp(report)) => Some(report),
            _ => None,
        }
    }

    pub fn hybrid_mut(&mut self) -> Option<&mut HybridListenerReport> {
        match self.listener_type.as_mut() {
            Some(ListenerTypeReport::Hybrid(report)) => Some(report),
            _ => None,
        }
    }

    fn collect(&self, out: &mut Vec<ReportEntry>, path: &str) {
        collect(out, path, Severity::Error, &self.errors);
        match &self.listener_type {
            Some(ListenerTypeReport::Http(http)) => http.collect(out, path),
            Some(ListenerTypeReport::Tcp(tcp)) => tcp.collect(out, path),
            Some(ListenerTypeReport::Hybrid(hybrid)) => {
                for (index, matched) in hybrid.matched_listener_reports.iter().enumerate() {
                    let path = format!("{path}.matched_listener[{index}]");
                    match matched {
                        MatchedListenerReport::Http(http) => http.collect(out, &path),
                        MatchedListenerReport::Tcp(tcp) => tcp.collect(out, &path),
                    }
                }
            }
            None => {}
        }
    }
}

/// Report for an HTTP listener, top-level or matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HttpListenerReport {
    #[serde(default)]
    pub errors: Vec<Finding<HttpListenerErrorKind>>,
    #[serde(default)]
    pub virtual_host_reports: Vec<VirtualHostReport>,
}

impl HttpListenerReport {
    pub fn for_listener(listener: &HttpListener) -> Self {
        Self {
            errors: Vec::new(),
            virtual_host_reports: listener
                .virtual_hosts
                .iter()
                .map(|vhost| VirtualHostReport {
                    errors: Vec::new(),
                    route_reports: vec![RouteReport::default(); vhost.routes.len()],
                })
                .collect(),
        }
    }

    pub fn add_error(&mut self, kind: HttpListenerErrorKind, message: impl Into<String>) {
        push_unique(&mut self.errors, Finding::new(kind, message));
    }

    pub fn virtual_host_report_mut(&mut self, index: usize) -> &mut VirtualHostReport {
        grow(&mut self.virtual_host_reports, index)
    }

    fn collect(&self, out: &mut Vec<ReportEntry>, path: &str) {
        collect(out, path, Severity::Error, &self.errors);
        for (index, vhost) in self.virtual_host_reports.iter().enumerate() {
            vhost.collect(out, &format!("{path}.virtual_host[{index}]"));
        }
    }
}

/// Report for a virtual host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VirtualHostReport {
    #[serde(default)]
    pub errors: Vec<Finding<VirtualHostErrorKind>>,
    #[serde(default)]
    pub route_reports: Vec<RouteReport>,
}

impl VirtualHostReport {
    pub fn add_error(&mut self, kind: VirtualHostErrorKind, message: impl Into<String>) {
        push_unique(&mut self.errors, Finding::new(kind, message));
    }

    pub fn route_report_mut(&mut self, index: usize) -> &mut RouteReport {
        grow(&mut self.route_reports, index)
    }

    fn collect(&self, out: &mut Vec<ReportEntry>, path: &str) {
        collect(out, path, Severity::Error, &self.errors);
        for (index, route) in self.route_reports.iter().enumerate() {
            let path = format!("{path}.route[{index}]");
            collect(out, &path, Severity::Error, &route.errors);
            collect(out, &path, Severity::Warning, &route.warnings);
        }
    }
}

/// Report for a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RouteReport {
    #[serde(default)]
    pub errors: Vec<Finding<RouteErrorKind>>,
    #[serde(default)]
    pub warnings: Vec<Finding<RouteWarningKind>>,
}

impl RouteReport {
    pub fn add_error(
        &mut self,
        kind: RouteErrorKind,
        message: impl Into<String>,
        route_name: impl Into<String>,
    ) {
        push_unique(&mut self.errors, Finding::for_route(kind, message, route_name));
    }

    pub fn add_warning(
        &mut self,
        kind: RouteWarningKind,
        message: impl Into<String>,
        route_name: impl Into<String>,
    ) {
        push_unique(&mut self.warnings, Finding::for_route(kind, message, route_name));
    }
}

/// Report for a TCP listener, top-level or matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TcpListenerReport {
    #[serde(default)]
    pub errors: Vec<Finding<TcpListenerErrorKind>>,
    #[serde(default)]
    pub tcp_host_reports: Vec<TcpHostReport>,
}

impl TcpListenerReport {
    pub fn for_listener(listener: &TcpListener) -> Self {
        Self {
            errors: Vec::new(),
            tcp_host_reports: vec![TcpHostReport::default(); listener.tcp_hosts.len()],
        }
    }

    pub fn add_error(&mut self, kind: TcpListenerErrorKind, message: impl Into<String>) {
        push_unique(&mut self.errors, Finding::new(kind, message));
    }

    pub fn tcp_host_report_mut(&mut self, index: usize) -> &mut TcpHostReport {
        grow(&mut self.tcp_host_reports, index)
    }

    fn collect(&self, out: &mut Vec<ReportEntry>, path: &str) {
        collect(out, path, Severity::Error, &self.errors);
        for (index, host) in self.tcp_host_reports.iter().enumerate() {
            collect(out, &format!("{path}.tcp_host[{index}]"), Severity::Error, &host.errors);
        }
    }
}

/// Report for a TCP host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TcpHostReport {
    #[serde(default)]
    pub errors: Vec<Finding<TcpHostErrorKind>>,
}

impl TcpHostReport {
    pub fn add_error(&mut self, kind: TcpHostErrorKind, message: impl Into<String>) {
        push_unique(&mut self.errors, Finding::new(kind, message));
    }
}

/// Report for a hybrid listener, one entry per matched listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HybridListenerReport {
    #[serde(default)]
    pub matched_listener_reports: Vec<MatchedListenerReport>,
}

/// Typed report of a matched listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedListenerReport {
    Http(HttpListenerReport),
    Tcp(TcpListenerReport),
}

impl MatchedListenerReport {
    fn for_listener_type(listener_type: &MatchedListenerType) -> Self {
        match listener_type {
            MatchedListenerType::Http(http) => Self::Http(HttpListenerReport::for_listener(http)),
            MatchedListenerType::Tcp(tcp) => Self::Tcp(TcpListenerReport::for_listener(tcp)),
        }
    }
}

impl HybridListenerReport {
    pub fn for_listener(listener: &HybridListener) -> Self {
        Self {
            matched_listener_reports: listener
                .matched_listeners
                .iter()
                .map(|matched| MatchedListenerReport::for_listener_type(&matched.listener_type))
                .collect(),
        }
    }

    /// Whether every matched listener has a report of its own variant
    pub fn matches(&self, listener: &HybridListener) -> bool {
        self.matched_listener_reports.len() == listener.matched_listeners.len()
            && self.matched_listener_reports.iter().zip(&listener.matched_listeners).all(
                |(report, matched)| {
                    matches!(
                        (report, &matched.listener_type),
                        (MatchedListenerReport::Http(_), MatchedListenerType::Http(_))
                            | (MatchedListenerReport::Tcp(_), MatchedListenerType::Tcp(_))
                    )
                },
            )
    }

    pub fn http_mut(&mut self, index: usize) -> Option<&mut HttpListenerReport> {
        match self.matched_listener_reports.get_mut(index) {
            Some(MatchedListenerReport::Http(report)) => Some(report),
            _ => None,
        }
    }

    pub fn tcp_mut(&mut self, index: usize) -> Option<&mut TcpListenerReport> {
        match self.matched_listener_reports.get_mut(index) {
            Some(MatchedListenerReport::Tcp(report)) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Route, RouteAction, Action, VirtualHost};

    fn http_listener(vhosts: usize, routes: usize) -> Listener {
        let virtual_hosts = (0..vhosts)
            .map(|i| {
                VirtualHost::new(
                    format!("vh{i}"),
                    [format!("vh{i}.example.com")],
                    (0..routes).map(|_| Route::new(Action::RouteAction(RouteAction::default()))).collect(),
                )
            })
            .collect();
        Listener::new(
            "http",
            "::",
            8080,
            ListenerType::Http(HttpListener { virtual_hosts, stat_prefix: String::new() }),
        )
    }

    #[test]
    fn report_mirrors_proxy_shape() {
        let proxy = Proxy {
            name: "proxy".into(),
            namespace: "ns".into(),
            listeners: vec![http_listener(2, 3)],
        };
        let mut report = ProxyReport::for_proxy(&proxy);
        assert_eq!(report.listener_reports.len(), 1);
        let http = report.listener_reports[0].http_mut().expect("http report");
        assert_eq!(http.virtual_host_reports.len(), 2);
        assert_eq!(http.virtual_host_reports[1].route_reports.len(), 3);
        assert!(!report.has_errors());
        assert!(!report.has_warnings());
    }

    #[test]
    fn accessors_grow_instead_of_panicking() {
        let mut report = HttpListenerReport::default();
        report
            .virtual_host_report_mut(2)
            .route_report_mut(4)
            .add_error(RouteErrorKind::Processing, "boom", "r");
        assert_eq!(report.virtual_host_reports.len(), 3);
        assert_eq!(report.virtual_host_reports[2].route_reports.len(), 5);
    }

    #[test]
    fn identical_findings_are_deduplicated() {
        let mut route = RouteReport::default();
        route.add_warning(RouteWarningKind::InvalidDestination, "upstream ns.x not found", "r1");
        route.add_warning(RouteWarningKind::InvalidDestination, "upstream ns.x not found", "r1");
        route.add_warning(RouteWarningKind::InvalidDestination, "upstream ns.x not found", "r2");
        assert_eq!(route.warnings.len(), 2);
    }

    #[test]
    fn entries_carry_paths_and_kinds() {
        let mut report = ProxyReport::for_proxy(&Proxy {
            name: "p".into(),
            namespace: String::new(),
            listeners: vec![http_listener(1, 1)],
        });
        let listener = report.listener_report_mut(0);
        listener.add_error(ListenerErrorKind::BindPortNotUnique, "port 8080 is used twice");
        let http = listener.http_mut().expect("http report");
        http.virtual_host_report_mut(0).route_report_mut(0).add_error(
            RouteErrorKind::InvalidMatcher,
            "no path specifier provided",
            "vh0-route-0",
        );
        http.virtual_host_report_mut(0).route_report_mut(0).add_warning(
            RouteWarningKind::InvalidDestination,
            "upstream ns1.missing not found",
            "",
        );

        assert_eq!(report.counts(), (2, 1));
        assert_eq!(
            report.error_messages(),
            vec![
                "listener[0]: BindPortNotUniqueError: port 8080 is used twice".to_string(),
                "listener[0].virtual_host[0].route[0]: InvalidMatcherError: no path specifier provided (route vh0-route-0)"
                    .to_string(),
            ]
        );
        assert_eq!(
            report.warning_messages(),
            vec!["listener[0].virtual_host[0].route[0]: InvalidDestinationWarning: upstream ns1.missing not found"
                .to_string()]
        );
    }

    #[test]
    fn repair_replaces_mismatched_sub_report() {
        let listener = http_listener(1, 1);
        let mut report = ListenerReport {
            errors: Vec::new(),
            listener_type: Some(ListenerTypeReport::Tcp(TcpListenerReport::default())),
        };
        assert!(!report.matches(&listener));
        report.repair(&listener);
        assert!(report.matches(&listener));
        assert!(report.http_mut().is_some());
        assert!(report.tcp_mut().is_none());
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = ProxyReport::default();
        report.listener_report_mut(0).add_error(ListenerErrorKind::NameNotUnique, "dup");
        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["listener_reports"][0]["errors"][0]["kind"], "NameNotUnique");
        let back: ProxyReport = serde_json::from_value(json).expect("deserialize report");
        assert_eq!(back, report);
    }
}
