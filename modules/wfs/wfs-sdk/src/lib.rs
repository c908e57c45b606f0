//! WFS SDK
//!
//! Contract between the WFS protocol engine and the backends that serve
//! features to it.
//!
//! - [`FeatureServer`]: the only seam the engine depends on
//! - models: layers, features, uncommitted mutations, transaction outcomes
//! - [`GeometryCodec`]: WKT and GML conversion of [`GeometryRecord`]s
//! - [`XmlWriter`]: the event writer used for every XML document the gateway emits

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod context;
pub mod error;
pub mod geometry;
pub mod models;
pub mod xml;

pub use api::FeatureServer;
pub use context::{Credentials, RequestContext};
pub use error::WfsError;
pub use geometry::{GeometryCodec, GeometryError, GeometryRecord, Gml2Codec, geometry_kind};
pub use models::{
    CommitOutcomeItem, Feature, FeatureField, FieldData, LayerDefinition, Operation, ServiceInfo,
    Transaction, TransactionOutcome, UncommittedFeature, UncommittedFeatureDelete,
    UncommittedFeatureUpdate,
};
pub use xml::{XmlError, XmlWriter};
