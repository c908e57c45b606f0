//! Top-level entry point: `SERVICE` validation and version negotiation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use wfs_sdk::{FeatureServer, WfsError};

use crate::engine::v1_0_0::WfsOneZeroEngine;
use crate::engine::{WfsEngine, WfsRequest, WfsResponse};

/// A dotted `major.minor.patch` protocol version. Missing components are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProtocolVersion {
    pub const V1_0_0: Self = Self::new(1, 0, 0);

    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ProtocolVersion {
    type Err = WfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WfsError::invalid_request(format!("Invalid VERSION: '{s}'"));
        let numbers = s
            .trim()
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;

        match numbers.as_slice() {
            [major] => Ok(Self::new(*major, 0, 0)),
            [major, minor] => Ok(Self::new(*major, *minor, 0)),
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(invalid()),
        }
    }
}

/// Routes requests to the engine of the negotiated protocol version.
pub struct WfsGateway {
    engines: BTreeMap<ProtocolVersion, Arc<dyn WfsEngine>>,
}

impl fmt::Debug for WfsGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WfsGateway")
            .field("versions", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl WfsGateway {
    /// Engines registered for the same version replace earlier ones.
    pub fn new(engines: impl IntoIterator<Item = Arc<dyn WfsEngine>>) -> Self {
        Self {
            engines: engines
                .into_iter()
                .map(|engine| (engine.version(), engine))
                .collect(),
        }
    }

    /// Gateway serving `server` through every engine this crate provides.
    pub fn for_server(server: Arc<dyn FeatureServer>) -> Self {
        Self::new([Arc::new(WfsOneZeroEngine::new(server)) as Arc<dyn WfsEngine>])
    }

    pub fn supported_versions(&self) -> impl Iterator<Item = ProtocolVersion> + '_ {
        self.engines.keys().copied()
    }

    /// Picks the engine for `request`.
    ///
    /// No `VERSION` selects the highest supported version, an exact match
    /// selects itself, anything else the greatest supported version not
    /// above it, or the lowest supported version when none qualifies.
    ///
    /// # Errors
    /// [`WfsError::InvalidRequest`] when `SERVICE` is not exactly `WFS` or
    /// `VERSION` is unparsable.
    pub fn resolve(&self, request: &WfsRequest) -> Result<Arc<dyn WfsEngine>, WfsError> {
        let service = request.param("service");
        if service != Some("WFS") {
            return Err(WfsError::invalid_request(format!(
                "All requests must include a 'service=WFS' argument. Got: '{}'",
                service.unwrap_or_default()
            )));
        }

        let requested = request
            .param("version")
            .filter(|v| !v.trim().is_empty())
            .map(str::parse::<ProtocolVersion>)
            .transpose()?;

        let version = select_version(&self.engines, requested)
            .ok_or_else(|| WfsError::internal("no WFS engine registered"))?;

        self.engines
            .get(&version)
            .map(Arc::clone)
            .ok_or_else(|| WfsError::internal(format!("no WFS engine for version {version}")))
    }

    /// Resolves the engine and lets it handle `request`.
    ///
    /// # Errors
    /// See [`Self::resolve`] and [`WfsEngine::handle`].
    pub async fn handle(&self, request: &WfsRequest) -> Result<WfsResponse, WfsError> {
        let engine = self.resolve(request)?;
        tracing::debug!(version = %engine.version(), "dispatching WFS request");
        engine.handle(request).await
    }
}

fn select_version<V>(
    supported: &BTreeMap<ProtocolVersion, V>,
    requested: Option<ProtocolVersion>,
) -> Option<ProtocolVersion> {
    let lowest = *supported.keys().next()?;
    let Some(requested) = requested else {
        return supported.keys().next_back().copied();
    };
    Some(
        supported
            .range(..=requested)
            .next_back()
            .map_or(lowest, |(version, _)| *version),
    )
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wfs_sdk::RequestContext;

    use crate::engine::WfsMethod;

    struct StubEngine(ProtocolVersion);

    #[async_trait]
    impl WfsEngine for StubEngine {
        fn version(&self) -> ProtocolVersion {
            self.0
        }

        async fn handle(&self, _request: &WfsRequest) -> Result<WfsResponse, WfsError> {
            Ok(WfsResponse::xml(self.0.to_string().into_bytes()))
        }
    }

    fn gateway(versions: &[ProtocolVersion]) -> WfsGateway {
        WfsGateway::new(
            versions
                .iter()
                .map(|v| Arc::new(StubEngine(*v)) as Arc<dyn WfsEngine>),
        )
    }

    fn request(params: &[(&str, &str)]) -> WfsRequest {
        WfsRequest::new(WfsMethod::Get, RequestContext::new("http://localhost/wfs"))
            .with_params(params.iter().copied())
    }

    fn resolved(gateway: &WfsGateway, version: Option<&str>) -> ProtocolVersion {
        let mut params = vec![("SERVICE", "WFS")];
        if let Some(v) = version {
            params.push(("VERSION", v));
        }
        gateway.resolve(&request(&params)).unwrap().version()
    }

    const V1_1_0: ProtocolVersion = ProtocolVersion::new(1, 1, 0);
    const V2_0_0: ProtocolVersion = ProtocolVersion::new(2, 0, 0);

    #[test]
    fn parses_partial_versions() {
        assert_eq!("1".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::new(1, 0, 0));
        assert_eq!("1.1".parse::<ProtocolVersion>().unwrap(), V1_1_0);
        assert_eq!(" 2.0.0 ".parse::<ProtocolVersion>().unwrap(), V2_0_0);
        assert!("1.x".parse::<ProtocolVersion>().is_err());
        assert!("1.0.0.0".parse::<ProtocolVersion>().is_err());
        assert_eq!(ProtocolVersion::V1_0_0.to_string(), "1.0.0");
    }

    #[test]
    fn no_version_selects_highest() {
        let gw = gateway(&[ProtocolVersion::V1_0_0, V1_1_0, V2_0_0]);
        assert_eq!(resolved(&gw, None), V2_0_0);
        assert_eq!(resolved(&gw, Some("")), V2_0_0);
    }

    #[test]
    fn exact_version_is_used() {
        let gw = gateway(&[ProtocolVersion::V1_0_0, V1_1_0, V2_0_0]);
        assert_eq!(resolved(&gw, Some("1.1.0")), V1_1_0);
    }

    #[test]
    fn unsupported_version_falls_back() {
        let gw = gateway(&[ProtocolVersion::V1_0_0, V1_1_0, V2_0_0]);
        assert_eq!(resolved(&gw, Some("1.5")), V1_1_0);
        assert_eq!(resolved(&gw, Some("3.0.0")), V2_0_0);
        assert_eq!(resolved(&gw, Some("0.9.0")), ProtocolVersion::V1_0_0);
    }

    #[test]
    fn service_must_be_wfs() {
        let gw = gateway(&[ProtocolVersion::V1_0_0]);
        for params in [vec![], vec![("SERVICE", "wfs")], vec![("SERVICE", "WMS")]] {
            let err = gw.resolve(&request(&params)).err().unwrap();
            assert!(matches!(err, WfsError::InvalidRequest { .. }), "{err}");
        }
    }

    #[test]
    fn unparsable_version_is_rejected() {
        let gw = gateway(&[ProtocolVersion::V1_0_0]);
        let err = gw
            .resolve(&request(&[("SERVICE", "WFS"), ("VERSION", "latest")]))
            .err()
            .unwrap();
        assert!(err.to_string().contains("latest"));
    }

    #[test]
    fn empty_gateway_is_an_internal_error() {
        let gw = gateway(&[]);
        let err = gw.resolve(&request(&[("SERVICE", "WFS")])).err().unwrap();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn handle_delegates_to_selected_engine() {
        let gw = gateway(&[ProtocolVersion::V1_0_0, V2_0_0]);
        let response = gw
            .handle(&request(&[("service", "WFS"), ("version", "1.9")]))
            .await
            .unwrap();
        assert_eq!(response.body, b"1.0.0");
    }
}
