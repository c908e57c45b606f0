//! REST handlers for the WFS endpoint.
//!
//! Handlers are thin: build a [`WfsRequest`], hand it to the gateway, map
//! errors through [`WfsProblem`].

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use http::{HeaderMap, Method, StatusCode, Uri};
use wfs_sdk::{Credentials, RequestContext, WfsError};
use zeroize::Zeroizing;

use super::error::WfsProblem;
use crate::engine::{WfsMethod, WfsRequest};
use crate::gateway::WfsGateway;

/// Shared state of the WFS routes.
#[derive(Debug)]
pub struct WfsState {
    pub gateway: Arc<WfsGateway>,
    pub public_url: Option<String>,
}

/// GET /health - liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Any method on the WFS endpoint.
#[tracing::instrument(skip_all, fields(method = %method, path = %uri.path()))]
pub async fn wfs(
    State(state): State<Arc<WfsState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Response, WfsProblem> {
    let method = match method {
        Method::GET | Method::HEAD => WfsMethod::Get,
        Method::POST => WfsMethod::Post,
        other => {
            return Err(WfsError::invalid_request(format!(
                "HTTP method not supported: '{other}'"
            ))
            .into());
        }
    };

    let mut context = RequestContext::new(online_resource(&state, &headers, &uri));
    if let Some(credentials) = basic_credentials(&headers)? {
        context = context.with_credentials(credentials);
    }

    let request = WfsRequest::new(method, context)
        .with_params(params)
        .with_body(body);
    let response = state.gateway.handle(&request).await?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response())
}

/// The configured public URL, else `http://{Host}{path}`.
fn online_resource(state: &WfsState, headers: &HeaderMap, uri: &Uri) -> String {
    if let Some(url) = &state.public_url {
        return url.clone();
    }
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(http::uri::Authority::as_str))
        .unwrap_or("localhost");
    format!("http://{host}{}", uri.path())
}

/// Credentials from an `Authorization: Basic` header, if present.
///
/// # Errors
/// [`WfsError::Unauthorized`] for a malformed header or another scheme.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<Credentials>, WfsError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let malformed = || WfsError::unauthorized("malformed Basic authorization header");

    let value = value.to_str().map_err(|_| malformed())?;
    let (scheme, encoded) = value.trim().split_once(' ').ok_or_else(malformed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(WfsError::unauthorized("only Basic authorization is supported"));
    }

    let decoded = Zeroizing::new(STANDARD.decode(encoded.trim()).map_err(|_| malformed())?);
    let decoded = std::str::from_utf8(&decoded).map_err(|_| malformed())?;
    let (user, password) = decoded.split_once(':').ok_or_else(malformed)?;
    Ok(Some(Credentials::new(user, password)))
}
