//! Protocol engines, one per supported WFS version.

pub mod ns;
pub mod v1_0_0;

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use wfs_sdk::{RequestContext, WfsError};

use crate::gateway::ProtocolVersion;

/// Content type of every WFS document the gateway produces.
pub const WFS_MIME_TYPE: &str = "text/xml";

/// HTTP methods a capability can be invoked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WfsMethod {
    Get,
    Post,
}

impl WfsMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "Get",
            Self::Post => "Post",
        }
    }
}

/// A transport-neutral WFS request.
#[derive(Debug, Clone)]
pub struct WfsRequest {
    method: WfsMethod,
    params: BTreeMap<String, String>,
    body: Bytes,
    context: RequestContext,
}

impl WfsRequest {
    pub fn new(method: WfsMethod, context: RequestContext) -> Self {
        Self {
            method,
            params: BTreeMap::new(),
            body: Bytes::new(),
            context,
        }
    }

    /// Adds query parameters. Keys are case-insensitive; the first value
    /// of a repeated key wins.
    #[must_use]
    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.params
                .entry(key.as_ref().to_ascii_lowercase())
                .or_insert_with(|| value.into());
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn method(&self) -> WfsMethod {
        self.method
    }

    /// Case-insensitive parameter lookup.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

/// A rendered WFS document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WfsResponse {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl WfsResponse {
    #[must_use]
    pub fn xml(body: Vec<u8>) -> Self {
        Self {
            content_type: WFS_MIME_TYPE,
            body,
        }
    }
}

/// Capability dispatch for one protocol version.
#[async_trait]
pub trait WfsEngine: Send + Sync {
    fn version(&self) -> ProtocolVersion;

    /// Dispatches `request` to its capability handler.
    ///
    /// # Errors
    /// [`WfsError::InvalidRequest`] for unknown capabilities or methods, plus
    /// whatever the feature server reports.
    async fn handle(&self, request: &WfsRequest) -> Result<WfsResponse, WfsError>;
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn params_are_case_insensitive_and_first_wins() {
        let request = WfsRequest::new(WfsMethod::Get, RequestContext::new("http://h/wfs"))
            .with_params([("SERVICE", "WFS"), ("Request", "GetCapabilities"), ("service", "XYZ")]);

        assert_eq!(request.param("service"), Some("WFS"));
        assert_eq!(request.param("REQUEST"), Some("GetCapabilities"));
        assert_eq!(request.param("typename"), None);
    }
}
