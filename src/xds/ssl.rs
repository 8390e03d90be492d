//! Downstream TLS translation.

use envoy_types::pb::envoy::config::core::v3::{
    transport_socket::ConfigType as TransportSocketConfigType, DataSource, TransportSocket,
};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    common_tls_context, subject_alt_name_matcher::SanType, CertificateValidationContext,
    CommonTlsContext, DownstreamTlsContext, SubjectAltNameMatcher, TlsCertificate,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{string_matcher::MatchPattern, StringMatcher};

use crate::errors::TranslationError;
use crate::model::{SslConfig, SslSecret};
use crate::xds::filters::any_from_message;
use crate::xds::utils::{data_source_from_path, data_source_from_string};

/// Name of envoy's TLS transport socket
pub const TLS_TRANSPORT_SOCKET_NAME: &str = "envoy.transport_sockets.tls";

const DOWNSTREAM_TLS_CONTEXT_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext";

/// Merge configurations that differ only in their SNI domains.
///
/// The merged configuration carries the union of the SNI domains in first-seen
/// order. If any member matches every SNI (no domains), so does the merged one.
pub fn merge_ssl_configs(configs: &[SslConfig]) -> Vec<SslConfig> {
    let mut merged: Vec<(SslConfig, bool)> = Vec::new();

    for config in configs {
        let key = SslConfig { sni_domains: Vec::new(), ..config.clone() };
        let matches_all = config.sni_domains.is_empty();

        match merged.iter_mut().find(|(existing, _)| {
            SslConfig { sni_domains: Vec::new(), ..existing.clone() } == key
        }) {
            Some((existing, existing_matches_all)) => {
                *existing_matches_all |= matches_all;
                for domain in &config.sni_domains {
                    if !existing.sni_domains.contains(domain) {
                        existing.sni_domains.push(domain.clone());
                    }
                }
            }
            None => merged.push((config.clone(), matches_all)),
        }
    }

    merged
        .into_iter()
        .map(|(mut config, matches_all)| {
            if matches_all {
                config.sni_domains.clear();
            }
            config
        })
        .collect()
}

/// Builds TLS transport sockets for downstream connections
#[derive(Debug, Default, Clone, Copy)]
pub struct SslConfigTranslator;

impl SslConfigTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Build the TLS transport socket terminating downstream connections
    pub fn resolve_downstream_ssl_config(
        &self,
        config: &SslConfig,
    ) -> Result<TransportSocket, TranslationError> {
        let downstream = self.downstream_tls_context(config)?;
        Ok(TransportSocket {
            name: TLS_TRANSPORT_SOCKET_NAME.to_string(),
            config_type: Some(TransportSocketConfigType::TypedConfig(any_from_message(
                DOWNSTREAM_TLS_CONTEXT_TYPE_URL,
                &downstream,
            ))),
        })
    }

    /// Build the TLS context without wrapping it in a transport socket
    pub fn downstream_tls_context(
        &self,
        config: &SslConfig,
    ) -> Result<DownstreamTlsContext, TranslationError> {
        let (cert_chain, private_key, root_ca, inline) = match &config.secret {
            SslSecret::Files { cert_chain, private_key, root_ca } => {
                (cert_chain, private_key, root_ca, false)
            }
            SslSecret::Inline { cert_chain, private_key, root_ca } => {
                (cert_chain, private_key, root_ca, true)
            }
        };
        let cert_chain = data_source(cert_chain, inline);
        let private_key = data_source(private_key, inline);
        let root_ca = root_ca.as_deref().map(|ca| data_source(ca, inline));

        let cert_chain = cert_chain
            .ok_or_else(|| TranslationError::ssl_config("no certificate chain provided"))?;
        let private_key =
            private_key.ok_or_else(|| TranslationError::ssl_config("no private key provided"))?;
        let root_ca = root_ca.flatten();

        if root_ca.is_none() && !config.verify_subject_alt_name.is_empty() {
            return Err(TranslationError::ssl_config(
                "a root_ca must be provided if verify_subject_alt_name is not empty",
            ));
        }

        let validation_context_type = root_ca.map(|trusted_ca| {
            common_tls_context::ValidationContextType::ValidationContext(
                CertificateValidationContext {
                    trusted_ca: Some(trusted_ca),
                    match_typed_subject_alt_names: config
                        .verify_subject_alt_name
                        .iter()
                        .map(|san| SubjectAltNameMatcher {
                            san_type: SanType::Dns as i32,
                            matcher: Some(StringMatcher {
                                match_pattern: Some(MatchPattern::Exact(san.clone())),
                                ignore_case: false,
                            }),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                },
            )
        });

        let common = CommonTlsContext {
            tls_certificates: vec![TlsCertificate {
                certificate_chain: Some(cert_chain),
                private_key: Some(private_key),
                ..Default::default()
            }],
            validation_context_type,
            alpn_protocols: config.alpn_protocols.clone(),
            ..Default::default()
        };

        Ok(DownstreamTlsContext { common_tls_context: Some(common), ..Default::default() })
    }
}

fn data_source(value: &str, inline: bool) -> Option<DataSource> {
    if value.trim().is_empty() {
        None
    } else if inline {
        Some(data_source_from_string(value))
    } else {
        Some(data_source_from_path(value))
    }
}
