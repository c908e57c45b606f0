#![allow(clippy::unwrap_used, clippy::expect_used)]

//! HTTP surface tests driven through `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{RecordingServer, point_feature, transaction_body};
use tower::ServiceExt;
use wfs_gw::{WfsGateway, WfsGatewayConfig, router};
use wfs_sdk::FeatureServer;

// farmer:pw
const AUTH: &str = "Basic ZmFybWVyOnB3";

fn app(server: RecordingServer, config: &WfsGatewayConfig) -> Router {
    let server: Arc<dyn FeatureServer> = Arc::new(server);
    router(Arc::new(WfsGateway::for_server(server)), config)
}

fn default_app() -> Router {
    app(RecordingServer::new().requiring_credentials(), &WfsGatewayConfig::default())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, header::HeaderMap, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "farm.example")
        .header(header::AUTHORIZATION, AUTH)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, _, body) = send(default_app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn capabilities_are_served_on_mount_path_and_root() {
    for path in ["/wfs", "/"] {
        let uri = format!("{path}?SERVICE=WFS&REQUEST=GetCapabilities");
        let (status, headers, body) = send(default_app(), get(&uri)).await;

        assert_eq!(status, StatusCode::OK, "{path}: {body}");
        assert_eq!(headers[header::CONTENT_TYPE], "text/xml");
        assert!(body.contains("WFS_Capabilities"), "{body}");
        assert!(
            body.contains(&format!("<wfs:OnlineResource>http://farm.example{path}</wfs:OnlineResource>")),
            "{body}"
        );
    }
}

#[tokio::test]
async fn public_url_overrides_derived_location() {
    let config = WfsGatewayConfig {
        public_url: Some("https://maps.example/ows".to_owned()),
        ..WfsGatewayConfig::default()
    };
    let app = app(RecordingServer::new(), &config);

    let (_, _, body) = send(app, get("/wfs?service=WFS&request=GetCapabilities")).await;
    assert!(body.contains("<wfs:OnlineResource>https://maps.example/ows</wfs:OnlineResource>"), "{body}");
}

#[tokio::test]
async fn invalid_requests_render_exception_reports() {
    let (status, headers, body) = send(default_app(), get("/wfs?REQUEST=GetCapabilities")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "text/xml");
    assert!(body.contains("ServiceExceptionReport"), "{body}");
    assert!(body.contains("service=WFS"), "{body}");
}

#[tokio::test]
async fn missing_credentials_are_challenged() {
    let request = Request::builder()
        .uri("/wfs?SERVICE=WFS&REQUEST=GetCapabilities")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(default_app(), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(
        headers[header::WWW_AUTHENTICATE]
            .to_str()
            .unwrap()
            .starts_with("Basic")
    );
}

#[tokio::test]
async fn post_is_a_transaction() {
    let body = transaction_body(&format!(
        r#"<wfs:Insert handle="new">{}</wfs:Insert>"#,
        point_feature("Orchard")
    ));
    let request = Request::builder()
        .method("POST")
        .uri("/wfs?SERVICE=WFS")
        .header(header::AUTHORIZATION, AUTH)
        .header(header::CONTENT_TYPE, "text/xml")
        .body(Body::from(body))
        .unwrap();

    let (status, _, body) = send(default_app(), request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("<wfs:SUCCESS/>"), "{body}");
    assert!(body.contains(r#"<wfs:InsertResult handle="new">"#), "{body}");
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let config = WfsGatewayConfig {
        body_limit_bytes: 64,
        ..WfsGatewayConfig::default()
    };
    let app = app(RecordingServer::new(), &config);
    let request = Request::builder()
        .method("POST")
        .uri("/wfs?SERVICE=WFS")
        .body(Body::from(transaction_body(&point_feature("x").repeat(10))))
        .unwrap();

    let (status, _, _) = send(app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn handler_panics_become_server_errors() {
    let app = app(RecordingServer::new().panicking(), &WfsGatewayConfig::default());

    let (status, _, body) = send(app, get("/wfs?SERVICE=WFS&REQUEST=GetCapabilities")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Internal server error");
}

#[tokio::test]
async fn unsupported_http_methods_are_rejected() {
    let request = Request::builder()
        .method("DELETE")
        .uri("/wfs?SERVICE=WFS")
        .header(header::AUTHORIZATION, AUTH)
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(default_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("HTTP method not supported"), "{body}");
}
