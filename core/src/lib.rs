//! Fluent builder for outbound HTTP requests.
//!
//! # Overview
//! Plain, JSON, form-urlencoded and multipart requests are all described by
//! one `RequestSpec`, sent by a `Dispatcher` through an injected `Transport`,
//! and read back through a `ResponseView` that decodes the body lazily.
//!
//! ```rust,no_run
//! use fluent_http::{Dispatcher, RequestSpec};
//!
//! # fn main() -> Result<(), fluent_http::HttpError> {
//! let http = Dispatcher::default();
//! let spec = RequestSpec::upload("http://localhost:3000/upload")
//!     .add_header("Authorization", "Bearer tok")
//!     .add_param("title", "report")
//!     .add_file("file", "report.csv", b"a,b\n1,2\n".to_vec());
//! let response = http.send(&spec)?;
//! println!("{} {}", response.status(), response.text()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Request shapes differ only in their `Body` variant; bodies are turned
//!   into bytes at dispatch time, so a request can be sent more than once.
//! - Build problems (bad URL, body on GET, wrong body kind) are deferred and
//!   reported as `HttpError::InvalidRequest` before any I/O.
//! - Non-2xx responses are data, not errors, unless the dispatcher is
//!   configured with `StatusPolicy::RequireSuccess`.
//! - Transport and JSON codec are explicit constructor arguments;
//!   `Dispatcher::default()` wires up `UreqTransport` and `SerdeJsonCodec`.

pub mod body;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod form;
pub mod http;
pub mod multipart;
pub mod request;
pub mod response;
pub mod transport;

pub use body::Body;
pub use codec::{JsonCodec, SerdeJsonCodec};
pub use config::{DispatcherConfig, StatusPolicy, TransportConfig};
pub use dispatcher::{Dispatcher, ResponseFuture};
pub use error::{BoxError, ErrorKind, HttpError};
pub use http::{HeaderMap, HttpMethod, HttpRequest, HttpResponse};
pub use multipart::{MultipartEncoder, Part};
pub use request::RequestSpec;
pub use response::ResponseView;
pub use transport::{Completion, Transport, UreqTransport};
