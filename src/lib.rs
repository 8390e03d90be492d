//! # Gateway Translator
//!
//! The translation core of an API-gateway control plane. It compiles a
//! declarative proxy model (listeners, virtual hosts, routes, destinations)
//! into Envoy v3 `Listener` and `RouteConfiguration` resources, together with
//! a hierarchical report of everything that was wrong with the input.
//!
//! ## Architecture
//!
//! ```text
//! Proxy + Snapshot → ProxyTranslator → ListenerSubsystemTranslatorFactory
//!                                        ↓                    ↓
//!                              ListenerTranslator   RouteConfigurationTranslator
//!                                        ↓                    ↓
//!                                  envoy Listener     envoy RouteConfiguration
//!                                        └──── ProxyReport ────┘
//! ```
//!
//! A pass never fails. Problems are recorded at the narrowest scope that
//! contains them (route, virtual host, listener) and the rest of the proxy is
//! still translated, so callers always get a best-effort configuration and
//! decide from the report whether to publish it.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use gateway_translator::{PluginRegistry, ProxyTranslator, Result, TranslationInput, TranslatorConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let config = TranslatorConfig::from_env()?;
//!     let recorder = gateway_translator::observability::init_observability(&config.observability);
//!     let input = TranslationInput::from_path(Path::new("proxy.yaml"))?;
//!
//!     let translator = ProxyTranslator::from_config(PluginRegistry::with_defaults(), &config)
//!         .with_metrics(recorder);
//!     let output = translator.translate(&input.proxy, &input.snapshot);
//!     for line in output.report.error_messages() {
//!         eprintln!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod model;
pub mod observability;
pub mod plugins;
pub mod validation;
pub mod xds;

// Re-export commonly used types and traits
pub use config::{ObservabilityConfig, TranslationConfig, TranslatorConfig};
pub use errors::{Error, Result, TranslationError};
pub use model::{Proxy, Snapshot, TranslationInput};
pub use plugins::PluginRegistry;
pub use validation::ProxyReport;
pub use xds::{ProxyTranslator, TranslationOutput};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
