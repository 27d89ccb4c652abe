mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use delivery_api::middleware_helpers::request_id::REQUEST_ID_HEADER;

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn caller_request_id_is_echoed_into_error_envelope() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/v1/orders")
        .header(REQUEST_ID_HEADER, "trace-me-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).unwrap(),
        "trace-me-42"
    );
    let body = response_json(response).await;
    assert_eq!(body["requestId"], "trace-me-42");
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["paths"]["/api/v1/carts/checkout"].is_object());
    assert!(body["paths"]["/api/v1/stores/{id}/orders"].is_object());
}
