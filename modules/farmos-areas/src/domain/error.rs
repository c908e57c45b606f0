use drupal_restws::RestWsError;
use thiserror::Error;
use wfs_sdk::WfsError;

#[derive(Debug, Error)]
pub enum AreaError {
    #[error(transparent)]
    Rest(#[from] RestWsError),

    #[error("taxonomy term {id} is not a farm area")]
    NotAnArea { id: String },

    #[error("no taxonomy vocabulary with machine name '{machine_name}'")]
    MissingVocabulary { machine_name: String },

    /// A feature id that does not address an area of its layer.
    #[error("{0}")]
    InvalidFeatureId(String),

    #[error("malformed {what} from backend: {detail}")]
    Malformed { what: &'static str, detail: String },
}

impl AreaError {
    pub fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            detail: detail.into(),
        }
    }

    /// Protocol-level error for a failure outside per-item commit handling.
    #[must_use]
    pub fn to_wfs(&self) -> WfsError {
        match self {
            Self::Rest(e) if e.is_auth_failure() => WfsError::unauthorized(e.to_string()),
            other => WfsError::backend(other.to_string()),
        }
    }
}

impl From<AreaError> for WfsError {
    fn from(err: AreaError) -> Self {
        err.to_wfs()
    }
}
