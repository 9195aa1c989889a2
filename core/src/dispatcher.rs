//! Sends `RequestSpec`s through a transport.
//!
//! # Design
//! `Dispatcher` holds only the injected transport, the JSON codec and its
//! config, all shared behind `Arc`, so it is cheap to clone and safe to use
//! from many threads. Each dispatch snapshots the `RequestSpec` into an
//! `HttpRequest` before any I/O starts. Failures of every kind come back as
//! `HttpError`; nothing is retried.
//!
//! The async path bridges the transport's completion callback to a
//! `tokio::sync::oneshot` channel. The channel can carry one value, so a
//! `ResponseFuture` resolves exactly once. The user callback is held by a
//! guard that runs it with a transport error if the transport drops its
//! completion without calling it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::codec::{JsonCodec, SerdeJsonCodec};
use crate::config::{DispatcherConfig, StatusPolicy};
use crate::error::{BoxError, HttpError};
use crate::http::{HttpRequest, HttpResponse};
use crate::request::RequestSpec;
use crate::response::ResponseView;
use crate::transport::{Transport, UreqTransport};

/// Executes request specs against a transport.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn JsonCodec>,
    config: Arc<DispatcherConfig>,
}

impl Dispatcher {
    pub fn new(transport: impl Transport, codec: impl JsonCodec + 'static) -> Self {
        Self::with_config(transport, codec, DispatcherConfig::default())
    }

    pub fn with_config(
        transport: impl Transport,
        codec: impl JsonCodec + 'static,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            codec: Arc::new(codec),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Send `spec` and wait for the response on the calling thread.
    pub fn send(&self, spec: &RequestSpec) -> Result<ResponseView, HttpError> {
        let request = self.prepare(spec)?;
        let response = self.transport.execute(request);
        self.complete(response)
    }

    /// Send `spec` in the background.
    ///
    /// The wire request is built before this returns, so later changes to
    /// `spec` do not affect the call. Dropping the future abandons the
    /// result; whether the network call stops is up to the transport.
    pub fn send_async(&self, spec: &RequestSpec) -> ResponseFuture {
        let (tx, rx) = oneshot::channel();
        self.send_with_callback(spec, move |result| {
            // The receiver is gone if the caller dropped the future.
            let _ = tx.send(result);
        });
        ResponseFuture { state: State::Waiting(rx) }
    }

    /// Send `spec` in the background and hand the outcome to `callback`.
    ///
    /// `callback` runs exactly once: on the calling thread if the request
    /// cannot be built, otherwise on the transport's completion thread.
    pub fn send_with_callback<F>(&self, spec: &RequestSpec, callback: F)
    where
        F: FnOnce(Result<ResponseView, HttpError>) + Send + 'static,
    {
        let request = match self.prepare(spec) {
            Ok(request) => request,
            Err(e) => return callback(Err(e)),
        };
        let this = self.clone();
        let guard = CallbackGuard {
            callback: Some(callback),
        };
        Arc::clone(&self.transport).enqueue(
            request,
            Box::new(move |response| guard.call(this.complete(response))),
        );
    }

    fn prepare(&self, spec: &RequestSpec) -> Result<HttpRequest, HttpError> {
        let mut request = spec.to_wire_with(self.codec.as_ref())?;
        if !self.config.default_headers.is_empty() {
            self.config
                .default_headers
                .validate()
                .map_err(HttpError::InvalidRequest)?;
            let mut headers = self.config.default_headers.clone();
            headers.extend(request.headers.iter());
            request.headers = headers;
        }
        Ok(request)
    }

    fn complete(&self, response: Result<HttpResponse, BoxError>) -> Result<ResponseView, HttpError> {
        let view = ResponseView::new(response.map_err(HttpError::transport)?, Arc::clone(&self.codec));
        match self.config.status_policy {
            StatusPolicy::Accept => Ok(view),
            StatusPolicy::RequireSuccess => view.error_for_status(),
        }
    }
}

impl Default for Dispatcher {
    /// `UreqTransport` with default settings and `SerdeJsonCodec`.
    fn default() -> Self {
        Self::new(UreqTransport::default(), SerdeJsonCodec)
    }
}

const DROPPED: &str = "transport dropped the request without completing it";

/// Runs the wrapped callback exactly once, with a transport error if the
/// guard is dropped before `call`.
struct CallbackGuard<F>
where
    F: FnOnce(Result<ResponseView, HttpError>),
{
    callback: Option<F>,
}

impl<F> CallbackGuard<F>
where
    F: FnOnce(Result<ResponseView, HttpError>),
{
    fn call(mut self, result: Result<ResponseView, HttpError>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl<F> Drop for CallbackGuard<F>
where
    F: FnOnce(Result<ResponseView, HttpError>),
{
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback(Err(HttpError::transport(DROPPED)));
        }
    }
}

enum State {
    Waiting(oneshot::Receiver<Result<ResponseView, HttpError>>),
    Done,
}

/// Outcome of `Dispatcher::send_async`.
#[must_use = "futures do nothing unless polled; dropping it discards the response"]
pub struct ResponseFuture {
    state: State,
}

impl Future for ResponseFuture {
    type Output = Result<ResponseView, HttpError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let State::Waiting(rx) = &mut self.state else {
            panic!("ResponseFuture polled after completion");
        };
        let outcome = match Pin::new(rx).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(result)) => result,
            Poll::Ready(Err(_)) => Err(HttpError::transport(DROPPED)),
        };
        self.state = State::Done;
        Poll::Ready(outcome)
    }
}
