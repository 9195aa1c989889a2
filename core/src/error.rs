//! Error taxonomy for building, dispatching and decoding requests.
//!
//! # Design
//! Transport failures and non-2xx statuses are separate variants so callers
//! decide whether a 404 is exceptional. A non-2xx response only becomes an
//! error through `StatusPolicy::RequireSuccess` or
//! `ResponseView::error_for_status`. Decode errors carry a short preview of
//! the body, never the full body.

use thiserror::Error;

/// Boxed cause retained by transport and decode errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Longest body prefix quoted in a `Decode` error.
const PREVIEW_LIMIT: usize = 64;

/// Errors returned by dispatch and by `ResponseView` decoding.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request could not be built; it was never sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The transport failed to deliver the request or read the response.
    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: BoxError,
    },

    /// The server answered with a status the caller chose to reject.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body could not be decoded into `target`.
    #[error("failed to decode {len}-byte body as {target} (body starts with {preview:?}): {source}")]
    Decode {
        target: String,
        len: usize,
        preview: String,
        #[source]
        source: BoxError,
    },

    /// A single-use request body was already drained by an earlier dispatch.
    #[error("request body already consumed")]
    BodyAlreadyConsumed,
}

/// Discriminant of `HttpError`, for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    Transport,
    UnexpectedStatus,
    Decode,
    BodyAlreadyConsumed,
}

impl HttpError {
    pub fn transport(source: impl Into<BoxError>) -> Self {
        HttpError::Transport {
            source: source.into(),
        }
    }

    pub(crate) fn decode(target: &str, body: &[u8], source: impl Into<BoxError>) -> Self {
        let end = body.len().min(PREVIEW_LIMIT);
        HttpError::Decode {
            target: target.to_string(),
            len: body.len(),
            preview: String::from_utf8_lossy(&body[..end]).into_owned(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HttpError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            HttpError::Transport { .. } => ErrorKind::Transport,
            HttpError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            HttpError::Decode { .. } => ErrorKind::Decode,
            HttpError::BodyAlreadyConsumed => ErrorKind::BodyAlreadyConsumed,
        }
    }

    /// Status code, for errors raised after a response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
