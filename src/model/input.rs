use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Proxy, Snapshot};
use crate::errors::{Error, Result};

/// A proxy together with the snapshot it is translated against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TranslationInput {
    pub proxy: Proxy,
    #[serde(default)]
    pub snapshot: Snapshot,
}

impl TranslationInput {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read an input file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::from(err).with_context(format!("reading {}", path.display())))?;

        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        };
        parsed.map_err(|err| err.with_context(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_input() {
        let input = TranslationInput::from_yaml_str(
            r#"
proxy:
  name: gateway-proxy
  namespace: gloo-system
  listeners:
    - name: http
      bind_address: "::"
      bind_port: 8080
      http:
        virtual_hosts:
          - name: default
            routes:
              - action:
                  route_action:
                    destination:
                      single:
                        upstream: { namespace: ns1, name: reviews }
snapshot:
  upstreams:
    - metadata: { namespace: ns1, name: reviews }
"#,
        )
        .expect("parse input");

        assert_eq!(input.proxy.listeners.len(), 1);
        assert_eq!(input.snapshot.upstreams.len(), 1);
    }

    #[test]
    fn reports_serialization_errors() {
        let err = TranslationInput::from_yaml_str("proxy: [").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));

        let err = TranslationInput::from_path(Path::new("/nonexistent/proxy.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/proxy.yaml"));
    }
}
