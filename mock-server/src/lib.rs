//! Test server for exercising the client over real HTTP.
//!
//! Every endpoint reports what it received as JSON so tests can assert on
//! the exact bytes, headers and parts a client sent.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query},
    http::{header, HeaderMap, Method, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{any, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: String,
}

/// One part decoded by `/upload`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UploadedPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// Payload of `/widget`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Widget {
    pub id: u32,
    pub name: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/widget", get(widget))
        .route("/form", post(form))
        .route("/upload", post(upload))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Json<Echo> {
    let mut seen = BTreeMap::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        seen.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.clone());
    }
    Json(Echo {
        method: method.to_string(),
        headers: seen,
        query,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>) -> (StatusCode, String) {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")),
        Err(_) => (StatusCode::BAD_REQUEST, format!("invalid status {code}")),
    }
}

/// Carries a field `Widget` does not declare and two cookies.
async fn widget() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, "a=1"), (header::SET_COOKIE, "b=2")]),
        Json(serde_json::json!({"id": 7, "name": "gear", "color": "red"})),
    )
}

async fn form(Form(params): Form<BTreeMap<String, String>>) -> Json<BTreeMap<String, String>> {
    Json(params)
}

async fn upload(mut multipart: Multipart) -> Result<Json<Vec<UploadedPart>>, (StatusCode, String)> {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let content = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        parts.push(UploadedPart {
            name,
            filename,
            content_type,
            content: content.to_vec(),
        });
    }
    Ok(Json(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_serializes_to_json() {
        let widget = Widget {
            id: 1,
            name: "bolt".to_string(),
        };
        let json = serde_json::to_value(&widget).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "bolt");
    }

    #[test]
    fn uploaded_part_roundtrips_through_json() {
        let part = UploadedPart {
            name: "f".to_string(),
            filename: Some("x.txt".to_string()),
            content_type: Some("application/octet-stream".to_string()),
            content: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&part).unwrap();
        let back: UploadedPart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn echo_defaults_are_empty() {
        let echo: Echo =
            serde_json::from_str(r#"{"method":"GET","headers":{},"query":{},"body":""}"#).unwrap();
        assert!(echo.headers.is_empty());
        assert!(echo.body.is_empty());
    }
}
