//! WFS 1.0.0 with GML 2.1.2 feature encoding.

mod capabilities;
mod features;
mod transaction;

use std::sync::Arc;

use async_trait::async_trait;
use wfs_sdk::{FeatureServer, GeometryCodec, Gml2Codec, WfsError, XmlWriter};

pub use transaction::{TransactionStatus, read_transaction};

use super::{WfsEngine, WfsMethod, WfsRequest, WfsResponse};
use crate::gateway::ProtocolVersion;

const VERSION: &str = "1.0.0";
const GML_VERSION: &str = "2.1.2";
const WFS_SCHEMA_LOCATION: &str = "http://schemas.opengis.net/wfs/1.0.0/wfs.xsd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capability {
    GetCapabilities,
    DescribeFeatureType,
    GetFeature,
    Transaction,
}

impl Capability {
    const ALL: [Self; 4] = [
        Self::GetCapabilities,
        Self::DescribeFeatureType,
        Self::GetFeature,
        Self::Transaction,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::GetCapabilities => "GetCapabilities",
            Self::DescribeFeatureType => "DescribeFeatureType",
            Self::GetFeature => "GetFeature",
            Self::Transaction => "Transaction",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    fn method(self) -> WfsMethod {
        match self {
            Self::Transaction => WfsMethod::Post,
            Self::GetCapabilities | Self::DescribeFeatureType | Self::GetFeature => WfsMethod::Get,
        }
    }

    /// Capability-specific elements listed after `DCPType` in GetCapabilities.
    fn write_description(self, out: &mut XmlWriter) -> Result<(), WfsError> {
        let (wrapper, value) = match self {
            Self::DescribeFeatureType => ("wfs:SchemaDescriptionLanguage", "wfs:XMLSCHEMA"),
            Self::GetFeature => ("wfs:ResultFormat", "wfs:GML2"),
            Self::GetCapabilities | Self::Transaction => return Ok(()),
        };
        out.start(wrapper, &[])?;
        out.empty(value, &[])?;
        out.end(wrapper)?;
        Ok(())
    }
}

/// The WFS 1.0.0 engine over a [`FeatureServer`].
pub struct WfsOneZeroEngine {
    server: Arc<dyn FeatureServer>,
    codec: Arc<dyn GeometryCodec>,
}

impl WfsOneZeroEngine {
    /// Engine using the GML 2 codec.
    pub fn new(server: Arc<dyn FeatureServer>) -> Self {
        Self::with_codec(server, Arc::new(Gml2Codec))
    }

    pub fn with_codec(server: Arc<dyn FeatureServer>, codec: Arc<dyn GeometryCodec>) -> Self {
        Self { server, codec }
    }

    /// POST always means Transaction; GET dispatches on `REQUEST`.
    fn capability_for(request: &WfsRequest) -> Result<Capability, WfsError> {
        if request.method() == WfsMethod::Post {
            return Ok(Capability::Transaction);
        }

        let name = request.param("request").unwrap_or_default();
        let capability = Capability::from_name(name).ok_or_else(|| {
            WfsError::invalid_request(format!("Unsupported capability: '{name}'"))
        })?;

        if capability.method() != request.method() {
            return Err(WfsError::invalid_request(format!(
                "Capability: '{name}' not supported via HTTP method: '{}'",
                request.method().as_str().to_ascii_uppercase()
            )));
        }
        Ok(capability)
    }
}

#[async_trait]
impl WfsEngine for WfsOneZeroEngine {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1_0_0
    }

    async fn handle(&self, request: &WfsRequest) -> Result<WfsResponse, WfsError> {
        let capability = Self::capability_for(request)?;
        let ctx = request.context();
        let server = self.server.as_ref();
        tracing::debug!(capability = capability.name(), "handling WFS 1.0.0 request");

        let body = match capability {
            Capability::GetCapabilities => capabilities::get_capabilities(server, ctx).await?,
            Capability::DescribeFeatureType => {
                capabilities::describe_feature_type(server, ctx, request.param("typename")).await?
            }
            Capability::GetFeature => {
                features::get_feature(server, self.codec.as_ref(), ctx, request.param("typename"))
                    .await?
            }
            Capability::Transaction => {
                transaction::transaction(server, self.codec.as_ref(), ctx, request.body()).await?
            }
        };
        Ok(WfsResponse::xml(body))
    }
}
