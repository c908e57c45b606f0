use std::sync::Arc;

use async_trait::async_trait;
use farmwfs_utils::{LazyCell, SecretString};
use reqwest::header::ACCEPT;
use reqwest::{Method, Response, StatusCode, redirect};
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::instrument;
use url::Url;

use crate::api::{Filters, PagePayload, RestWsApi};
use crate::config::RestWsConfig;
use crate::cookies::SessionCookieJar;
use crate::error::RestWsError;
use crate::pagination::page_number_from_link;
use crate::session::{Session, derive_session_expiry};

const CSRF_HEADER: &str = "X-CSRF-Token";

/// Shape of a `restws` collection response; other paging links are ignored.
#[derive(Deserialize)]
struct RawListing {
    #[serde(default)]
    list: Vec<Value>,
    #[serde(default)]
    last: Option<String>,
}

/// [`RestWsApi`] over HTTP, authenticated as one Drupal user.
pub struct RestWsClient {
    http: reqwest::Client,
    base_url: Url,
    user: String,
    password: SecretString,
    cookies: Arc<SessionCookieJar>,
    session: LazyCell<Session>,
}

impl std::fmt::Debug for RestWsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestWsClient")
            .field("base_url", &self.base_url.as_str())
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl RestWsClient {
    /// Builds an unauthenticated client; the first call logs in.
    ///
    /// # Errors
    /// Fails on a base URL that is not absolute http(s), or when the HTTP
    /// client cannot be constructed.
    pub fn new(
        config: &RestWsConfig,
        user: impl Into<String>,
        password: SecretString,
    ) -> Result<Self, RestWsError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RestWsError::invalid_url(&config.base_url, e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(RestWsError::invalid_url(
                &config.base_url,
                "expected an absolute http(s) URL",
            ));
        }

        let cookies = Arc::new(SessionCookieJar::new());
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(redirect::Policy::none())
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            http,
            base_url,
            user: user.into(),
            password,
            cookies,
            session: LazyCell::new(),
        })
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Current session, logging in first when there is none or it has expired.
    /// Concurrent callers share a single login.
    ///
    /// # Errors
    /// Login or token failures; these are not retried.
    pub async fn session(&self) -> Result<Arc<Session>, RestWsError> {
        self.session
            .get_or_try_init_valid(
                |s| s.is_valid_at(OffsetDateTime::now_utc()),
                || self.login(),
            )
            .await
    }

    #[instrument(skip_all, fields(user = %self.user))]
    async fn login(&self) -> Result<Session, RestWsError> {
        let login_url = self.endpoint(&["user", "login"])?;
        let response = self
            .http
            .post(login_url)
            .form(&[
                ("name", self.user.as_str()),
                ("pass", self.password.expose()),
                ("form_id", "user_login"),
            ])
            .send()
            .await?;

        if !response.status().is_redirection() {
            tracing::warn!(status = %response.status(), "login rejected");
            return Err(RestWsError::LoginRejected {
                user: self.user.clone(),
                status: response.status().as_u16(),
            });
        }

        let token_url = self.endpoint(&["restws", "session", "token"])?;
        let response = self.http.get(token_url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RestWsError::TokenRejected {
                status: status.as_u16(),
                body,
            });
        }
        let csrf_token = response.text().await?;

        let now = OffsetDateTime::now_utc();
        let expires_at = derive_session_expiry(&self.cookies.expiries(now), now);
        tracing::info!(%expires_at, "session established");

        Ok(Session {
            csrf_token: SecretString::new(csrf_token),
            expires_at,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RestWsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RestWsError::invalid_url(self.base_url.as_str(), "cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Response, RestWsError> {
        let session = self.session().await?;
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CSRF_HEADER, session.csrf_token.expose());
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn decode(entity_type: &str, response: Response) -> Result<Value, RestWsError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| RestWsError::Decode {
            entity_type: entity_type.to_owned(),
            source,
        })
    }
}

async fn expect_status(
    response: Response,
    expected: StatusCode,
    operation: &'static str,
    entity_type: &str,
) -> Result<Response, RestWsError> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(operation, entity_type, status = status.as_u16(), "backend call failed");
    Err(RestWsError::UnexpectedStatus {
        operation,
        entity_type: entity_type.to_owned(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RestWsApi for RestWsClient {
    #[instrument(skip(self), fields(user = %self.user))]
    async fn get_entity(&self, entity_type: &str, entity_id: &str) -> Result<Value, RestWsError> {
        let url = self.endpoint(&[entity_type, &format!("{entity_id}.json")])?;
        let response = self.send(Method::GET, url, None).await?;
        let response = expect_status(response, StatusCode::OK, "get", entity_type).await?;
        Self::decode(entity_type, response).await
    }

    #[instrument(skip(self), fields(user = %self.user))]
    async fn fetch_page(
        &self,
        entity_type: &str,
        filters: &Filters,
    ) -> Result<PagePayload, RestWsError> {
        let mut url = self.endpoint(&[&format!("{entity_type}.json")])?;
        url.query_pairs_mut().extend_pairs(filters.iter());

        let response = self.send(Method::GET, url, None).await?;
        let response = expect_status(response, StatusCode::OK, "list", entity_type).await?;
        let bytes = response.bytes().await?;
        let raw: RawListing =
            serde_json::from_slice(&bytes).map_err(|source| RestWsError::Decode {
                entity_type: entity_type.to_owned(),
                source,
            })?;

        Ok(PagePayload {
            records: raw.list,
            last_page: raw.last.as_deref().and_then(page_number_from_link),
        })
    }

    #[instrument(skip(self, record), fields(user = %self.user))]
    async fn create_entity(&self, entity_type: &str, record: &Value) -> Result<Value, RestWsError> {
        let url = self.endpoint(&[entity_type])?;
        let response = self.send(Method::POST, url, Some(record)).await?;
        let response = expect_status(response, StatusCode::CREATED, "create", entity_type).await?;
        Self::decode(entity_type, response).await
    }

    #[instrument(skip(self, record), fields(user = %self.user))]
    async fn update_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        record: &Value,
    ) -> Result<(), RestWsError> {
        let url = self.endpoint(&[entity_type, entity_id])?;
        let response = self.send(Method::PUT, url, Some(record)).await?;
        expect_status(response, StatusCode::OK, "update", entity_type).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user = %self.user))]
    async fn delete_entity(&self, entity_type: &str, entity_id: &str) -> Result<(), RestWsError> {
        let url = self.endpoint(&[entity_type, entity_id])?;
        let response = self.send(Method::DELETE, url, None).await?;
        expect_status(response, StatusCode::OK, "delete", entity_type).await?;
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn client(base: &str) -> Result<RestWsClient, RestWsError> {
        let config = RestWsConfig {
            base_url: base.to_owned(),
            ..RestWsConfig::default()
        };
        RestWsClient::new(&config, "farmer", SecretString::new("pw"))
    }

    #[test]
    fn endpoints_are_built_from_segments() {
        let c = client("http://farm.test/drupal/").unwrap();
        assert_eq!(
            c.endpoint(&["taxonomy_term", "5.json"]).unwrap().as_str(),
            "http://farm.test/drupal/taxonomy_term/5.json"
        );

        let c = client("http://farm.test").unwrap();
        assert_eq!(
            c.endpoint(&["user", "login"]).unwrap().as_str(),
            "http://farm.test/user/login"
        );
    }

    #[test]
    fn path_separators_in_ids_are_escaped() {
        let c = client("http://farm.test").unwrap();
        let url = c.endpoint(&["taxonomy_term", "../user/1"]).unwrap();
        assert_eq!(url.path(), "/taxonomy_term/..%2Fuser%2F1");
    }

    #[test]
    fn rejects_non_http_base() {
        assert!(matches!(client("ftp://farm.test"), Err(RestWsError::InvalidUrl { .. })));
        assert!(matches!(client("not a url"), Err(RestWsError::InvalidUrl { .. })));
    }

    #[test]
    #[allow(clippy::use_debug)]
    fn debug_hides_password() {
        let c = client("http://farm.test").unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("farmer"));
        assert!(!dbg.contains("pw\""));
    }
}
