use farmwfs_utils::SecretString;

use crate::error::WfsError;

/// Caller credentials as presented on the incoming request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecretString::new(password),
        }
    }
}

/// Per-request information handed to every [`FeatureServer`](crate::FeatureServer) call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    online_resource: String,
    credentials: Option<Credentials>,
}

impl RequestContext {
    /// `online_resource` is the URL clients should use to reach this endpoint.
    pub fn new(online_resource: impl Into<String>) -> Self {
        Self {
            online_resource: online_resource.into(),
            credentials: None,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn online_resource(&self) -> &str {
        &self.online_resource
    }

    /// # Errors
    /// [`WfsError::Unauthorized`] when the request carried no credentials.
    pub fn credentials(&self) -> Result<&Credentials, WfsError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| WfsError::unauthorized("credentials required"))
    }
}
