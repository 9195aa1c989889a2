//! Fluent request builder.
//!
//! # Design
//! A `RequestSpec` is created by one of the factories (`get`, `post`, `form`,
//! `upload`, ...) and refined with chainable calls. Factories never fail:
//! a bad URL or a body operation that does not fit the body kind is recorded
//! and reported as `HttpError::InvalidRequest` when the request is turned into
//! a wire request, so nothing invalid ever reaches the transport.
//!
//! Dispatch borrows the request and snapshots it with `to_wire`, so a request can
//! be sent again unless its body is a single-use reader.

use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use serde::Serialize;
use url::Url;

use crate::body::Body;
use crate::codec::{JsonCodec, SerdeJsonCodec};
use crate::error::HttpError;
use crate::form::FORM_CONTENT_TYPE;
use crate::http::{HeaderMap, HttpMethod, HttpRequest};
use crate::multipart::{self, MultipartEncoder, Part, DEFAULT_BOUNDARY, OCTET_STREAM};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Mutable description of one outbound HTTP call.
///
/// Must not be mutated while a dispatch of it is in progress; the borrow
/// taken by `Dispatcher::send` enforces this for safe code.
#[derive(Debug)]
pub struct RequestSpec {
    method: HttpMethod,
    url: Result<Url, String>,
    headers: HeaderMap,
    body: Body,
    problem: Option<String>,
}

impl RequestSpec {
    /// A request with no headers and no body.
    pub fn new(method: HttpMethod, url: &str) -> Self {
        Self {
            method,
            url: parse_url(url),
            headers: HeaderMap::new(),
            body: Body::Empty,
            problem: None,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn delete(url: &str) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// POST an already serialized JSON document.
    pub fn post(url: &str, json: impl Into<String>) -> Self {
        Self::with_json(HttpMethod::Post, url, json.into())
    }

    /// PUT an already serialized JSON document.
    pub fn put(url: &str, json: impl Into<String>) -> Self {
        Self::with_json(HttpMethod::Put, url, json.into())
    }

    /// POST `value` as JSON. It is held as a `serde_json::Value` and
    /// serialized by the dispatcher's `JsonCodec` at dispatch.
    pub fn post_json<T: Serialize + ?Sized>(url: &str, value: &T) -> Self {
        Self::serialize_json(HttpMethod::Post, url, value)
    }

    pub fn put_json<T: Serialize + ?Sized>(url: &str, value: &T) -> Self {
        Self::serialize_json(HttpMethod::Put, url, value)
    }

    /// POST `params` as `application/x-www-form-urlencoded`, in iteration
    /// order. Only values are percent-encoded; see `form::encode`.
    pub fn form<I, K, V>(url: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = params.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let mut spec = Self::new(HttpMethod::Post, url);
        spec.headers.insert(CONTENT_TYPE, FORM_CONTENT_TYPE);
        spec.body = Body::Form(pairs);
        spec
    }

    /// Multipart upload using `DEFAULT_BOUNDARY`. Add parts with
    /// `add_param` and `add_file`.
    pub fn upload(url: &str) -> Self {
        Self::upload_with_boundary(url, DEFAULT_BOUNDARY)
    }

    pub fn upload_with_boundary(url: &str, boundary: impl Into<String>) -> Self {
        let encoder = MultipartEncoder::new(boundary);
        let mut spec = Self::new(HttpMethod::Post, url);
        spec.headers.insert(CONTENT_TYPE, encoder.content_type());
        spec.body = Body::Multipart(encoder);
        spec
    }

    fn with_json(method: HttpMethod, url: &str, json: String) -> Self {
        Self::with_json_body(method, url, Body::Fixed(Bytes::from(json)))
    }

    fn with_json_body(method: HttpMethod, url: &str, body: Body) -> Self {
        let mut spec = Self::new(method, url);
        spec.headers.insert(CONTENT_TYPE, JSON_CONTENT_TYPE);
        spec.body = body;
        spec
    }

    fn serialize_json<T: Serialize + ?Sized>(method: HttpMethod, url: &str, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::with_json_body(method, url, Body::Json(value)),
            Err(e) => {
                let mut spec = Self::new(method, url);
                spec.record(format!("failed to serialize json body: {e}"));
                spec
            }
        }
    }

    /// Set `key`, replacing any existing header with the same name.
    pub fn add_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Merge `headers` with the same overwrite rule as `add_header`.
    pub fn add_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers);
        self
    }

    /// Append a form pair or a multipart field, depending on the body kind.
    pub fn add_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let accepted = match &mut self.body {
            Body::Form(pairs) => {
                pairs.push((key.into(), value.into()));
                true
            }
            Body::Multipart(encoder) => {
                encoder.push(Part::Field {
                    name: key.into(),
                    value: value.into(),
                });
                true
            }
            _ => false,
        };
        if !accepted {
            self.record("add_param requires a form or upload request".to_string());
        }
        self
    }

    /// Append a file part typed `application/octet-stream`.
    pub fn add_file(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        self.add_file_with_type(name, filename, content, OCTET_STREAM)
    }

    pub fn add_file_with_type(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        let part = Part::File {
            name: name.into(),
            filename: filename.into(),
            content: content.into(),
            content_type: content_type.into(),
        };
        self.push_part(part);
        self
    }

    /// Append the file at `path`. A read failure is reported at dispatch.
    pub fn add_file_path(mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match multipart::file_part(name.into(), path) {
            Ok(part) => self.push_part(part),
            Err(e) => self.record(format!("failed to read {}: {e}", path.display())),
        }
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Use a stream as the body. It is drained by the first dispatch; a
    /// second dispatch fails with `HttpError::BodyAlreadyConsumed`.
    pub fn body_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = Body::reader(reader);
        self
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The parsed URL, or `None` if it failed to parse.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref().ok()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_ref(&self) -> &Body {
        &self.body
    }

    /// Snapshot this request into a wire request, encoding JSON bodies with
    /// `SerdeJsonCodec`.
    pub fn to_wire(&self) -> Result<HttpRequest, HttpError> {
        self.to_wire_with(&SerdeJsonCodec)
    }

    /// Snapshot this request into a wire request, resolving the body with
    /// `codec`.
    pub fn to_wire_with(&self, codec: &dyn JsonCodec) -> Result<HttpRequest, HttpError> {
        if let Some(problem) = &self.problem {
            return Err(HttpError::InvalidRequest(problem.clone()));
        }
        let url = self.url.clone().map_err(HttpError::InvalidRequest)?;
        self.headers.validate().map_err(HttpError::InvalidRequest)?;
        if self.method.forbids_body() && !self.body.is_empty() {
            return Err(HttpError::InvalidRequest(format!(
                "{} requests cannot carry a body",
                self.method
            )));
        }
        let body = self.body.resolve(codec)?;
        Ok(HttpRequest {
            method: self.method,
            url,
            headers: self.headers.clone(),
            body,
        })
    }

    fn push_part(&mut self, part: Part) {
        if let Body::Multipart(encoder) = &mut self.body {
            encoder.push(part);
        } else {
            self.record("add_file requires an upload request".to_string());
        }
    }

    /// Keep the first problem; later ones are usually caused by it.
    fn record(&mut self, problem: String) {
        self.problem.get_or_insert(problem);
    }
}

fn parse_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid url {raw:?}: {e}"))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(format!("unsupported url scheme {:?} in {raw:?}", url.scheme()))
    }
}
