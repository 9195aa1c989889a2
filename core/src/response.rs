//! Typed views over a transport response.
//!
//! # Design
//! The transport hands over an unread body stream. `ResponseView` drains it
//! on the first call that needs the bytes and caches the result, so
//! `bytes`, `text`, `json` and `object` can be called in any order and any
//! number of times with a single read of the underlying body.

use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::{decode_with, JsonCodec};
use crate::error::HttpError;
use crate::http::{HeaderMap, HttpResponse};

/// A received response with lazily decoded body.
pub struct ResponseView {
    status: u16,
    headers: HeaderMap,
    source: Mutex<Option<Box<dyn Read + Send>>>,
    body: OnceLock<Bytes>,
    codec: Arc<dyn JsonCodec>,
}

impl ResponseView {
    pub fn new(response: HttpResponse, codec: Arc<dyn JsonCodec>) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            source: Mutex::new(Some(response.body)),
            body: OnceLock::new(),
            codec,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The body bytes, read from the transport on first use.
    pub fn bytes(&self) -> Result<Bytes, HttpError> {
        if let Some(body) = self.body.get() {
            return Ok(body.clone());
        }
        let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have filled the cache while we waited.
        if let Some(body) = self.body.get() {
            return Ok(body.clone());
        }
        let mut reader = source
            .take()
            .ok_or_else(|| HttpError::transport("response body was lost by an earlier failed read"))?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(HttpError::transport)?;
        Ok(self.body.get_or_init(|| Bytes::from(buf)).clone())
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> Result<String, HttpError> {
        let bytes = self.bytes()?;
        match std::str::from_utf8(&bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(e) => Err(HttpError::decode("utf-8 text", &bytes, e)),
        }
    }

    /// The body parsed as a JSON tree.
    pub fn json(&self) -> Result<Value, HttpError> {
        let bytes = self.bytes()?;
        self.codec
            .parse(&bytes)
            .map_err(|e| HttpError::decode("json", &bytes, e))
    }

    /// The body bound to `T`. Fields `T` does not declare are ignored.
    pub fn object<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        let bytes = self.bytes()?;
        decode_with(self.codec.as_ref(), &bytes)
            .map_err(|e| HttpError::decode(std::any::type_name::<T>(), &bytes, e))
    }

    /// Turn a non-2xx response into `HttpError::UnexpectedStatus`.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            return Ok(self);
        }
        let body = match self.bytes() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => format!("<body unavailable: {e}>"),
        };
        Err(HttpError::UnexpectedStatus {
            status: self.status,
            body,
        })
    }
}

impl fmt::Debug for ResponseView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseView")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_read", &self.body.get().is_some())
            .finish()
    }
}
