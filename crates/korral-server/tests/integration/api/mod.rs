/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::util::ServiceExt;

use crate::fixtures::TestFixture;

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    let json = serde_json::from_slice(&body).expect("JSON body");
    (status, json)
}

const EXEC_QUERY: &str = "namespace=ns1&pod_name=web-0&container_name=app";

#[tokio::test]
async fn test_healthz_endpoint() {
    let fixture = TestFixture::offline(&[]);
    let app = fixture.create_test_router();

    let (status, body) = get(&app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_readyz_requires_a_cluster() {
    let empty = TestFixture::offline(&[]).create_test_router();
    let (status, _) = get(&empty, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let ready = TestFixture::offline(&["alpha"]).create_test_router();
    let (status, body) = get(&ready, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"Ready");
}

#[tokio::test]
async fn test_list_clusters_is_sorted() {
    let fixture = TestFixture::offline(&["beta", "alpha", "gamma"]);
    let app = fixture.create_test_router();

    let (status, json) = get_json(&app, "/api/v1/clusters").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!(["alpha", "beta", "gamma"]));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestFixture::offline(&[]).create_test_router();

    let (status, body) = get(&app, "/metrics").await;
    let text = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("korral_ingestors_running"));
    assert!(text.contains("korral_exec_sessions_active"));
}

#[tokio::test]
async fn test_exec_rejects_missing_parameters() {
    let app = TestFixture::offline(&["alpha"]).create_test_router();

    let (status, json) = get_json(&app, &format!("/api/v1/exec?{}", EXEC_QUERY)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "missing required parameter: cluster");

    let (status, json) = get_json(
        &app,
        "/api/v1/exec?namespace=&pod_name=web-0&container_name=app&cluster=alpha",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "missing required parameter: namespace");
}

#[tokio::test]
async fn test_exec_unknown_cluster_is_not_found() {
    let app = TestFixture::offline(&["alpha"]).create_test_router();

    let (status, json) =
        get_json(&app, &format!("/api/v1/exec?{}&cluster=nowhere", EXEC_QUERY)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "cluster 'nowhere' not found");
}

#[tokio::test]
async fn test_exec_without_upgrade_is_bad_request() {
    let app = TestFixture::offline(&["alpha"]).create_test_router();

    let (status, json) =
        get_json(&app, &format!("/api/v1/exec?{}&cluster=alpha", EXEC_QUERY)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("WebSocket"));
}

#[tokio::test]
async fn test_unknown_resource_kind_is_not_found() {
    let app = TestFixture::offline(&["alpha"]).create_test_router();

    let (status, json) = get_json(&app, "/api/v1/clusters/alpha/resources/widgets").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown resource kind 'widgets'");
}

#[tokio::test]
async fn test_resources_of_unknown_cluster_is_not_found() {
    let app = TestFixture::offline(&["alpha"]).create_test_router();

    let (status, _) = get_json(&app, "/api/v1/clusters/nowhere/resources/pods").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&app, "/api/v1/clusters/nowhere/summary").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreachable_cluster_is_upstream_error() {
    let app = TestFixture::offline(&["alpha"]).create_test_router();

    let (status, json) =
        get_json(&app, "/api/v1/clusters/alpha/resources/pods?filter=web&limit=5&page=1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("failed to list pods"));

    let (status, json) = get_json(&app, "/api/v1/clusters/alpha/summary").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("alpha"));
}
