//! REST error mapping for the WFS endpoint.

use std::any::Any;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use wfs_sdk::{WfsError, XmlError, XmlWriter};

use crate::engine::{WFS_MIME_TYPE, ns};

const BASIC_CHALLENGE: &str = r#"Basic realm="WFS""#;
const INTERNAL_ERROR_BODY: &str = "Internal server error";

/// A [`WfsError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct WfsProblem(pub WfsError);

impl From<WfsError> for WfsProblem {
    fn from(e: WfsError) -> Self {
        Self(e)
    }
}

/// OGC `ServiceExceptionReport` carrying one exception.
///
/// # Errors
/// Buffer write failure.
pub fn exception_report(message: &str) -> Result<Vec<u8>, XmlError> {
    let mut out = XmlWriter::new();
    out.declaration()?;
    out.start(
        "ServiceExceptionReport",
        &[("version", "1.2.0"), ("xmlns", ns::OGC)],
    )?;
    out.text_element("ServiceException", &[], message)?;
    out.end("ServiceExceptionReport")?;
    Ok(out.into_bytes())
}

fn report_response(status: StatusCode, message: &str) -> Response {
    match exception_report(message) {
        Ok(body) => (status, [(CONTENT_TYPE, WFS_MIME_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render exception report");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
        }
    }
}

impl IntoResponse for WfsProblem {
    fn into_response(self) -> Response {
        match &self.0 {
            WfsError::InvalidRequest { message } => {
                tracing::info!(%message, "rejected WFS request");
                report_response(StatusCode::BAD_REQUEST, message)
            }
            WfsError::Unauthorized { message } => {
                tracing::info!(%message, "unauthenticated WFS request");
                let mut response = report_response(StatusCode::UNAUTHORIZED, message);
                response.headers_mut().insert(
                    WWW_AUTHENTICATE,
                    http::HeaderValue::from_static(BASIC_CHALLENGE),
                );
                response
            }
            other => {
                tracing::error!(error = %other, "WFS request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
            }
        }
    }
}

/// Response for a handler panic; the process keeps serving.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "WFS handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
}
