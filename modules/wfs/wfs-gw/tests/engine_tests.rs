#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end tests of the gateway and the 1.0.0 engine over an in-memory
//! feature server.

mod common;

use std::sync::Arc;

use common::{RecordingServer, point_feature, transaction_body};
use wfs_gw::{WfsGateway, WfsMethod, WfsRequest};
use wfs_sdk::{FeatureServer, RequestContext, WfsError};

const RESOURCE: &str = "http://farm.example/wfs";

fn setup() -> (Arc<RecordingServer>, WfsGateway) {
    let server = Arc::new(RecordingServer::new());
    let gateway = WfsGateway::for_server(Arc::clone(&server) as Arc<dyn FeatureServer>);
    (server, gateway)
}

fn get(params: &[(&str, &str)]) -> WfsRequest {
    WfsRequest::new(WfsMethod::Get, RequestContext::new(RESOURCE)).with_params(params.iter().copied())
}

fn post(body: String) -> WfsRequest {
    WfsRequest::new(WfsMethod::Post, RequestContext::new(RESOURCE))
        .with_params([("service", "WFS")])
        .with_body(body)
}

async fn text(gateway: &WfsGateway, request: &WfsRequest) -> String {
    let response = gateway.handle(request).await.unwrap();
    assert_eq!(response.content_type, "text/xml");
    String::from_utf8(response.body).unwrap()
}

async fn invalid(gateway: &WfsGateway, request: &WfsRequest) -> String {
    match gateway.handle(request).await {
        Err(WfsError::InvalidRequest { message }) => message,
        Err(other) => panic!("expected InvalidRequest, got {other}"),
        Ok(_) => panic!("expected InvalidRequest, got a document"),
    }
}

#[tokio::test]
async fn requests_without_service_never_reach_the_feature_server() {
    let (server, gateway) = setup();

    invalid(&gateway, &get(&[("REQUEST", "GetCapabilities")])).await;
    invalid(&gateway, &get(&[("SERVICE", "WMS"), ("REQUEST", "GetFeature")])).await;
    let mut without_service =
        WfsRequest::new(WfsMethod::Post, RequestContext::new(RESOURCE)).with_body("<x/>");
    without_service = without_service.with_params([("VERSION", "1.0.0")]);
    invalid(&gateway, &without_service).await;

    assert_eq!(server.call_count(), 0);
}

#[tokio::test]
async fn unknown_capability_and_wrong_method_are_rejected() {
    let (server, gateway) = setup();

    let message = invalid(&gateway, &get(&[("SERVICE", "WFS"), ("REQUEST", "GetMap")])).await;
    assert!(message.contains("Unsupported capability"), "{message}");

    let message = invalid(&gateway, &get(&[("SERVICE", "WFS"), ("REQUEST", "Transaction")])).await;
    assert!(message.contains("not supported via HTTP method"), "{message}");

    assert_eq!(server.call_count(), 0);
}

#[tokio::test]
async fn capabilities_list_requests_and_layers() {
    let (_server, gateway) = setup();
    let xml = text(
        &gateway,
        &get(&[("service", "WFS"), ("request", "GetCapabilities"), ("version", "1.0.0")]),
    )
    .await;

    let doc = roxmltree::Document::parse(&xml).unwrap();
    let root = doc.root_element();
    assert_eq!(root.tag_name().name(), "WFS_Capabilities");
    assert_eq!(root.attribute("version"), Some("1.0.0"));

    assert!(xml.contains("<wfs:Name>farm</wfs:Name>"), "{xml}");
    assert!(xml.contains(&format!("<wfs:OnlineResource>{RESOURCE}</wfs:OnlineResource>")), "{xml}");
    assert!(xml.contains(&format!(r#"<wfs:Post onlineResource="{RESOURCE}"/>"#)), "{xml}");
    assert!(xml.contains("<wfs:XMLSCHEMA/>"), "{xml}");
    assert!(xml.contains("<wfs:GML2/>"), "{xml}");

    let feature_types: Vec<&str> = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "FeatureType")
        .filter_map(|n| n.children().find(|c| c.tag_name().name() == "Name"))
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(feature_types, vec!["areas_point", "readonly"]);

    let operations = doc
        .descendants()
        .find(|n| n.tag_name().name() == "Operations")
        .unwrap()
        .children()
        .filter(roxmltree::Node::is_element)
        .count();
    assert_eq!(operations, 4);
}

#[tokio::test]
async fn describe_feature_type_filters_by_typename() {
    let (_server, gateway) = setup();

    let all = text(&gateway, &get(&[("SERVICE", "WFS"), ("REQUEST", "DescribeFeatureType")])).await;
    assert!(all.contains(r#"name="areas_pointType""#), "{all}");
    assert!(all.contains(r#"name="readonlyType""#), "{all}");

    let one = text(
        &gateway,
        &get(&[("SERVICE", "WFS"), ("REQUEST", "DescribeFeatureType"), ("TYPENAME", "areas_point")]),
    )
    .await;
    assert!(!one.contains("readonlyType"), "{one}");
    assert!(one.contains(r#"type="gml:PointPropertyType""#), "{one}");
    assert!(one.contains(r#"<element name="name" type="string"/>"#), "{one}");
    assert!(
        one.contains(r#"<element name="description" type="string" minOccurs="0"/>"#),
        "{one}"
    );
}

#[tokio::test]
async fn get_feature_requires_a_known_typename() {
    let (_server, gateway) = setup();

    let message = invalid(&gateway, &get(&[("SERVICE", "WFS"), ("REQUEST", "GetFeature")])).await;
    assert!(message.contains("unknown TYPENAME"), "{message}");

    let message = invalid(
        &gateway,
        &get(&[("SERVICE", "WFS"), ("REQUEST", "GetFeature"), ("TYPENAME", "nope")]),
    )
    .await;
    assert!(message.contains("'nope'"), "{message}");
}

#[tokio::test]
async fn get_feature_encodes_members() {
    let (_server, gateway) = setup();
    let xml = text(
        &gateway,
        &get(&[("SERVICE", "WFS"), ("REQUEST", "GetFeature"), ("TYPENAME", "areas_point")]),
    )
    .await;

    assert!(xml.contains(r#"<ms:areas_point fid="areas_point.7">"#), "{xml}");
    assert!(xml.contains("<gml:coordinates>1.5,2</gml:coordinates>"), "{xml}");
    assert!(xml.contains("<ms:name>Barn</ms:name>"), "{xml}");
    assert!(!xml.contains("ms:description"), "{xml}");
    assert!(
        xml.contains("REQUEST=DescribeFeatureType&amp;TYPENAME=areas_point"),
        "{xml}"
    );
    roxmltree::Document::parse(&xml).unwrap();
}

#[tokio::test]
async fn unsupported_filter_deletes_still_commit() {
    let (server, gateway) = setup();
    let body = transaction_body(
        r#"<wfs:Delete typeName="areas_point"><ogc:Filter><ogc:BBOX/></ogc:Filter></wfs:Delete>"#,
    );

    let xml = text(&gateway, &post(body)).await;

    let committed = server.committed.lock();
    assert_eq!(committed.len(), 1);
    assert!(committed[0].features_to_delete.is_empty());
    assert!(!committed[0].read_transaction_failures.is_empty());
    assert!(xml.contains("<wfs:FAILED/>"), "{xml}");
    assert!(xml.contains("Only deleting features by feature id is supported"), "{xml}");
}

#[tokio::test]
async fn insert_results_group_by_handle() {
    let (_server, gateway) = setup();
    let body = transaction_body(&format!(
        r#"<wfs:Insert handle="h1">{}{}</wfs:Insert><wfs:Insert>{}</wfs:Insert>"#,
        point_feature("a"),
        point_feature("b"),
        point_feature("c"),
    ));

    let xml = text(&gateway, &post(body)).await;
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let results: Vec<(Option<&str>, usize)> = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "InsertResult")
        .map(|n| {
            let count = n.children().filter(|c| c.tag_name().name() == "FeatureId").count();
            (n.attribute("handle"), count)
        })
        .collect();

    assert_eq!(results, vec![(None, 1), (Some("h1"), 2)]);
    assert!(xml.contains("<wfs:SUCCESS/>"), "{xml}");
}

#[tokio::test]
async fn commit_failures_make_a_partial_result() {
    let (_server, gateway) = setup();
    let body = transaction_body(
        r#"<wfs:Delete typeName="areas_point" handle="d"><ogc:Filter><ogc:FeatureId fid="areas_point.1"/><ogc:FeatureId fid="areas_point.404"/></ogc:Filter></wfs:Delete>"#,
    );

    let xml = text(&gateway, &post(body)).await;
    assert!(xml.contains("<wfs:PARTIAL/>"), "{xml}");
    assert!(xml.contains("areas_point.404 not found"), "{xml}");
}

#[tokio::test]
async fn malformed_transaction_is_rejected_before_commit() {
    let (server, gateway) = setup();

    let message = invalid(&gateway, &post("<wfs:Transaction".to_owned())).await;
    assert!(message.contains("Malformed"), "{message}");

    let message = invalid(
        &gateway,
        &post(r#"<Transaction xmlns="urn:other"/>"#.to_owned()),
    )
    .await;
    assert!(message.contains("wfs:Transaction"), "{message}");

    assert!(server.committed.lock().is_empty());
}
