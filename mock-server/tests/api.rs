use std::collections::BTreeMap;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, UploadedPart};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, content_type: &str, body: impl Into<axum::body::Body>) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_headers_and_body() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/echo?x=1")
                .header("X-Trace", "abc")
                .body(axum::body::Body::from("payload"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.headers["x-trace"], "abc");
    assert_eq!(echo.query["x"], "1");
    assert_eq!(echo.body, "payload");
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app()
        .oneshot(Request::builder().uri("/status/418").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(&body_bytes(resp).await[..], b"status 418");
}

#[tokio::test]
async fn status_rejects_out_of_range_code() {
    let resp = app()
        .oneshot(Request::builder().uri("/status/1000").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- widget ---

#[tokio::test]
async fn widget_sets_two_cookies() {
    let resp = app()
        .oneshot(Request::builder().uri("/widget").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get_all(http::header::SET_COOKIE).iter().count(), 2);
    let value: serde_json::Value = body_json(resp).await;
    assert_eq!(value["color"], "red");
}

// --- form ---

#[tokio::test]
async fn form_decodes_pairs() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/form",
            "application/x-www-form-urlencoded",
            "k1=v1&k2=v%202",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let params: BTreeMap<String, String> = body_json(resp).await;
    assert_eq!(params["k1"], "v1");
    assert_eq!(params["k2"], "v 2");
}

// --- upload ---

#[tokio::test]
async fn upload_decodes_fields_and_files() {
    let body = b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n\
--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"x.txt\"\r\n\
Content-Type: application/octet-stream\r\n\r\n\x01\x02\x03\r\n--B--"
        .to_vec();
    let resp = app()
        .oneshot(request("POST", "/upload", "multipart/form-data; boundary=B", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let parts: Vec<UploadedPart> = body_json(resp).await;
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].name, "a");
    assert_eq!(parts[0].content, b"1");
    assert!(parts[0].filename.is_none());
    assert_eq!(parts[1].filename.as_deref(), Some("x.txt"));
    assert_eq!(parts[1].content_type.as_deref(), Some("application/octet-stream"));
    assert_eq!(parts[1].content, vec![1, 2, 3]);
}

#[tokio::test]
async fn upload_without_boundary_is_rejected() {
    let resp = app()
        .oneshot(request("POST", "/upload", "multipart/form-data", "--B--"))
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}
