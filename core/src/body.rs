//! Request body producers.
//!
//! # Design
//! Plain, JSON, form and multipart requests share one `RequestSpec` type;
//! they differ only in which `Body` variant they carry. Every variant is
//! turned into bytes at dispatch time by `resolve`, which serializes JSON
//! documents with the dispatcher's codec. All variants except `Reader` can be
//! resolved any number of times.

use std::fmt;
use std::io::Read;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::HttpError;
use crate::form;
use crate::multipart::MultipartEncoder;

/// The body of a `RequestSpec`.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Fixed(Bytes),
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(MultipartEncoder),
    Reader(OnceReader),
}

impl Body {
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Body::Reader(OnceReader::new(reader))
    }

    /// Produce the bytes to send, or `None` for an empty body.
    pub fn resolve(&self, codec: &dyn JsonCodec) -> Result<Option<Bytes>, HttpError> {
        match self {
            Body::Empty => Ok(None),
            Body::Fixed(bytes) => Ok(Some(bytes.clone())),
            Body::Json(value) => codec
                .encode(value)
                .map(|json| Some(Bytes::from(json)))
                .map_err(|e| HttpError::InvalidRequest(format!("failed to encode json body: {e}"))),
            Body::Form(pairs) => Ok(Some(form::encode_pairs(pairs))),
            Body::Multipart(encoder) => Ok(Some(encoder.build())),
            Body::Reader(reader) => reader.drain().map(Some),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Fixed(bytes) => bytes.is_empty(),
            Body::Form(pairs) => pairs.is_empty(),
            Body::Json(_) | Body::Multipart(_) | Body::Reader(_) => false,
        }
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Fixed(b)
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Fixed(Bytes::from(v))
    }
}

impl From<&'static [u8]> for Body {
    fn from(s: &'static [u8]) -> Self {
        Body::Fixed(Bytes::from_static(s))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Fixed(Bytes::from(s))
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Fixed(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<MultipartEncoder> for Body {
    fn from(encoder: MultipartEncoder) -> Self {
        Body::Multipart(encoder)
    }
}

/// A body stream that can be read exactly once.
pub struct OnceReader {
    inner: Mutex<Option<Box<dyn Read + Send>>>,
}

impl OnceReader {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Some(Box::new(reader))),
        }
    }

    fn drain(&self) -> Result<Bytes, HttpError> {
        let taken = self.inner.lock().unwrap_or_else(PoisonError::into_inner).take();
        let mut reader = taken.ok_or(HttpError::BodyAlreadyConsumed)?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| HttpError::InvalidRequest(format!("failed to read request body: {e}")))?;
        Ok(Bytes::from(buf))
    }

    pub fn is_consumed(&self) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

impl fmt::Debug for OnceReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceReader")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::SerdeJsonCodec;

    #[test]
    fn empty_resolves_to_none() {
        assert!(Body::Empty.resolve(&SerdeJsonCodec).unwrap().is_none());
        assert!(Body::default().is_empty());
    }

    #[test]
    fn fixed_resolves_repeatedly() {
        let body = Body::from("payload");
        assert_eq!(body.resolve(&SerdeJsonCodec).unwrap().unwrap(), Bytes::from_static(b"payload"));
        assert_eq!(body.resolve(&SerdeJsonCodec).unwrap().unwrap(), Bytes::from_static(b"payload"));
    }

    #[test]
    fn form_resolves_encoded_pairs() {
        let body = Body::Form(vec![("k".to_string(), "a b".to_string())]);
        assert_eq!(&body.resolve(&SerdeJsonCodec).unwrap().unwrap()[..], b"k=a%20b");
    }

    #[test]
    fn json_goes_through_the_codec() {
        struct Refuses;

        impl JsonCodec for Refuses {
            fn parse(&self, _bytes: &[u8]) -> Result<Value, crate::error::BoxError> {
                Err("unused".into())
            }

            fn encode(&self, _value: &Value) -> Result<Vec<u8>, crate::error::BoxError> {
                Err("no encoder configured".into())
            }
        }

        let body = Body::from(serde_json::json!({"a": 1}));
        assert!(!body.is_empty());
        assert_eq!(&body.resolve(&SerdeJsonCodec).unwrap().unwrap()[..], br#"{"a":1}"#);
        let err = body.resolve(&Refuses).unwrap_err();
        assert!(err.to_string().contains("no encoder configured"));
    }

    #[test]
    fn reader_resolves_once() {
        let body = Body::reader(Cursor::new(b"stream".to_vec()));
        assert_eq!(&body.resolve(&SerdeJsonCodec).unwrap().unwrap()[..], b"stream");
        let err = body.resolve(&SerdeJsonCodec).unwrap_err();
        assert!(matches!(err, HttpError::BodyAlreadyConsumed));
    }
}
