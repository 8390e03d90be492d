//! # Validation Module
//!
//! The translation report and the business rules whose violations are written
//! into it.
//!
//! Nothing in this module aborts a translation pass. Rules either append
//! findings to the report tree directly or return a classified
//! [`TranslationError`](crate::errors::TranslationError) that the caller files
//! as an error or a warning.

pub mod business_rules;
pub mod report;

pub use business_rules::*;
pub use report::{
    Finding, HttpListenerErrorKind, HttpListenerReport, HybridListenerReport, ListenerErrorKind,
    ListenerReport, ListenerTypeReport, MatchedListenerReport, ProxyReport, ReportEntry,
    RouteErrorKind, RouteReport, RouteWarningKind, Severity, TcpHostErrorKind, TcpHostReport,
    TcpListenerErrorKind, TcpListenerReport, VirtualHostErrorKind, VirtualHostReport,
};
