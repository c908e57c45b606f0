//! farmOS areas as WFS layers.
//!
//! [`ProxyFeatureServer`] implements the WFS [`FeatureServer`](wfs_sdk::FeatureServer)
//! contract by forwarding each request to farmOS as the calling user:
//!
//! - one backend client per `(user, password fingerprint)`, kept in a bounded cache
//! - area listings cached per client for a short TTL, dropped after every commit
//! - commits fan out to the backend with a fixed concurrency ceiling; each
//!   mutation succeeds or fails on its own

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod config;
pub mod domain;

pub use config::FarmosAreasConfig;
pub use domain::client::{AreaApi, AreaClient};
pub use domain::error::AreaError;
pub use domain::layers::area_layers;
pub use domain::service::{AreaClientFactory, ProxyFeatureServer, RestAreaClientFactory};
