//! `multipart/form-data` body encoder.
//!
//! # Design
//! Parts are kept as an ordered list and only serialized in `build`, which
//! takes `&self` so an encoder can be built any number of times (a request may
//! be dispatched again). The output buffer is sized up front from
//! `encoded_len`, so it never reallocates.
//!
//! Names, filenames and values are written verbatim. A quote or CRLF in a
//! name produces a malformed body rather than an error, and content that
//! contains the boundary token is not detected unless the caller asks for it
//! with `check_boundary`.

use std::fs;
use std::io;
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::HttpError;

/// Boundary used by `RequestSpec::upload`.
pub const DEFAULT_BOUNDARY: &str = "----boundary";

/// Content type of file parts added without an explicit type.
pub const OCTET_STREAM: &str = "application/octet-stream";

const CRLF: &[u8] = b"\r\n";
const DASHES: &[u8] = b"--";
const DISPOSITION: &[u8] = b"Content-Disposition: form-data; name=\"";
const FILENAME: &[u8] = b"\"; filename=\"";
const CONTENT_TYPE: &[u8] = b"Content-Type: ";

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Field {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content: Bytes,
        content_type: String,
    },
}

impl Part {
    pub fn name(&self) -> &str {
        match self {
            Part::Field { name, .. } | Part::File { name, .. } => name,
        }
    }

    fn encoded_len(&self, boundary: &str) -> usize {
        let opening = DASHES.len() + boundary.len() + CRLF.len();
        let disposition = DISPOSITION.len() + self.name().len() + 1 + CRLF.len();
        let tail = CRLF.len();
        match self {
            Part::Field { value, .. } => opening + disposition + CRLF.len() + value.len() + tail,
            Part::File {
                filename,
                content,
                content_type,
                ..
            } => {
                opening
                    + disposition
                    + FILENAME.len()
                    + filename.len()
                    + CONTENT_TYPE.len()
                    + content_type.len()
                    + CRLF.len()
                    + CRLF.len()
                    + content.len()
                    + tail
            }
        }
    }

    fn write_to(&self, boundary: &str, buf: &mut BytesMut) {
        buf.put_slice(DASHES);
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(DISPOSITION);
        buf.put_slice(self.name().as_bytes());
        match self {
            Part::Field { value, .. } => {
                buf.put_slice(b"\"");
                buf.put_slice(CRLF);
                buf.put_slice(CRLF);
                buf.put_slice(value.as_bytes());
            }
            Part::File {
                filename,
                content,
                content_type,
                ..
            } => {
                buf.put_slice(FILENAME);
                buf.put_slice(filename.as_bytes());
                buf.put_slice(b"\"");
                buf.put_slice(CRLF);
                buf.put_slice(CONTENT_TYPE);
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(CRLF);
                buf.put_slice(CRLF);
                buf.put_slice(content);
            }
        }
        buf.put_slice(CRLF);
    }

    fn contains(&self, needle: &[u8]) -> bool {
        let hit = |haystack: &[u8]| haystack.windows(needle.len()).any(|w| w == needle);
        match self {
            Part::Field { name, value } => hit(name.as_bytes()) || hit(value.as_bytes()),
            Part::File {
                name,
                filename,
                content,
                ..
            } => hit(name.as_bytes()) || hit(filename.as_bytes()) || hit(content),
        }
    }
}

/// Builds a `multipart/form-data` body from ordered parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartEncoder {
    boundary: String,
    parts: Vec<Part>,
}

impl MultipartEncoder {
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// A boundary that is unlikely to appear in real content.
    pub fn random_boundary() -> String {
        format!("----boundary{}", uuid::Uuid::new_v4().simple())
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn add_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Part::Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a file part typed `application/octet-stream`.
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
        self.push(Part::File {
            name: name.into(),
            filename: filename.into(),
            content: content.into(),
            content_type: content_type.into(),
        });
        self
    }

    /// Read `path` into a file part named after its last path component.
    pub fn add_file_path(mut self, name: impl Into<String>, path: impl AsRef<Path>) -> io::Result<Self> {
        self.push(file_part(name.into(), path.as_ref())?);
        Ok(self)
    }

    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Exact length of the output of `build`.
    pub fn encoded_len(&self) -> usize {
        let parts: usize = self.parts.iter().map(|p| p.encoded_len(&self.boundary)).sum();
        parts + DASHES.len() + self.boundary.len() + DASHES.len()
    }

    /// Serialize all parts followed by the closing `--boundary--` line.
    pub fn build(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        for part in &self.parts {
            part.write_to(&self.boundary, &mut buf);
        }
        buf.put_slice(DASHES);
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(DASHES);
        buf.freeze()
    }

    /// Fails naming the first part that contains the boundary token.
    pub fn check_boundary(&self) -> Result<(), HttpError> {
        if self.boundary.is_empty() {
            return Err(HttpError::InvalidRequest("multipart boundary is empty".to_string()));
        }
        match self.parts.iter().find(|p| p.contains(self.boundary.as_bytes())) {
            Some(part) => Err(HttpError::InvalidRequest(format!(
                "multipart part {:?} contains the boundary {:?}",
                part.name(),
                self.boundary
            ))),
            None => Ok(()),
        }
    }
}

pub(crate) fn file_part(name: String, path: &Path) -> io::Result<Part> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let content = fs::read(path)?;
    Ok(Part::File {
        name,
        filename,
        content: Bytes::from(content),
        content_type: OCTET_STREAM.to_string(),
    })
}
