//! WFS Gateway
//!
//! Serves any [`wfs_sdk::FeatureServer`] as an OGC Web Feature Service.
//!
//! - [`WfsGateway`]: `SERVICE` check and version negotiation across engines
//! - [`engine`]: per-version capability dispatch and XML encoding
//! - [`api::rest`]: axum router, Basic credentials, exception reports
//!
//! ```text
//! HTTP request ─▶ api::rest ─▶ WfsGateway ─▶ WfsEngine (1.0.0) ─▶ FeatureServer
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod config;
pub mod engine;
pub mod gateway;

pub use api::rest::routes::router;
pub use config::WfsGatewayConfig;
pub use engine::v1_0_0::WfsOneZeroEngine;
pub use engine::{WFS_MIME_TYPE, WfsEngine, WfsMethod, WfsRequest, WfsResponse};
pub use gateway::{ProtocolVersion, WfsGateway};
