//! Transport-agnostic error type shared by the engine and feature servers.

use thiserror::Error;

use crate::geometry::GeometryError;
use crate::xml::XmlError;

#[derive(Error, Debug, Clone)]
pub enum WfsError {
    /// Malformed or unsupported protocol request. Not retried.
    #[error("invalid WFS request: {message}")]
    InvalidRequest { message: String },

    /// Missing or rejected credentials.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// The backend failed outside of per-item transaction handling.
    #[error("backend error: {message}")]
    Backend { message: String },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl WfsError {
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status the gateway answers with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Backend { .. } | Self::Geometry(_) | Self::Xml(_) | Self::Internal { .. } => 500,
        }
    }
}
