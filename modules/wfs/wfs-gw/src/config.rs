//! WFS gateway configuration.

use serde::{Deserialize, Serialize};

/// HTTP surface settings for the WFS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WfsGatewayConfig {
    /// Mount path of the WFS endpoint. The endpoint is also served at `/`.
    pub path: String,
    /// Externally visible endpoint URL used in generated documents. When
    /// unset it is derived from the request `Host` header.
    pub public_url: Option<String>,
    /// Maximum accepted request body, in bytes.
    pub body_limit_bytes: usize,
}

impl Default for WfsGatewayConfig {
    fn default() -> Self {
        Self {
            path: "/wfs".to_owned(),
            public_url: None,
            body_limit_bytes: 10 * 1024 * 1024, // 10 MiB
        }
    }
}

impl WfsGatewayConfig {
    /// [`Self::path`] with a leading `/` and no trailing one.
    #[must_use]
    pub fn mount_path(&self) -> String {
        let trimmed = self.path.trim().trim_matches('/');
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn mount_path_is_normalized() {
        let mut config = WfsGatewayConfig::default();
        assert_eq!(config.mount_path(), "/wfs");

        config.path = "ows/wfs/".to_owned();
        assert_eq!(config.mount_path(), "/ows/wfs");

        config.path = "/".to_owned();
        assert_eq!(config.mount_path(), "/");
    }
}
