use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestWsError {
    #[error("invalid backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("login rejected for user '{user}' (status {status})")]
    LoginRejected { user: String, status: u16 },

    #[error("session token request failed (status {status}): {body}")]
    TokenRejected { status: u16, body: String },

    #[error("{operation} {entity_type} failed (status {status}): {body}")]
    UnexpectedStatus {
        operation: &'static str,
        entity_type: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {entity_type} response: {source}")]
    Decode {
        entity_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RestWsError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// True when the backend refused the credentials or the session handshake.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::LoginRejected { .. } | Self::TokenRejected { .. })
    }

    /// Backend HTTP status, when the failure carried one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::LoginRejected { status, .. }
            | Self::TokenRejected { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidUrl { .. } | Self::Decode { .. } => None,
        }
    }
}
