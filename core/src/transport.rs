//! The transport collaborator and its default `ureq` implementation.
//!
//! # Design
//! A transport takes a fully built `HttpRequest` and returns an
//! `HttpResponse` or a failure. Pooling, redirects, cookies and TLS are its
//! own business. The async entry point is callback based: `enqueue` must
//! invoke the completion exactly once, on whatever thread suits the
//! transport. The default runs the blocking `execute` on a fresh thread and
//! reports a failure to start that thread through the completion.

use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::debug;

use crate::config::TransportConfig;
use crate::error::BoxError;
use crate::http::{HeaderMap, HttpRequest, HttpResponse};

/// Callback receiving the outcome of an enqueued request.
pub type Completion = Box<dyn FnOnce(Result<HttpResponse, BoxError>) + Send + 'static>;

/// Executes wire requests.
pub trait Transport: Send + Sync + 'static {
    /// Perform the call on the current thread.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;

    /// Perform the call in the background and report through `on_complete`.
    fn enqueue(self: Arc<Self>, request: HttpRequest, on_complete: Completion) {
        let slot = CompletionSlot::new(on_complete);
        let worker = slot.clone();
        let spawned = thread::Builder::new()
            .name("fluent-http-call".to_string())
            .spawn(move || worker.complete(self.execute(request)));
        if let Err(e) = spawned {
            debug!(error = %e, "failed to start request thread");
            slot.complete(Err(Box::new(e)));
        }
    }
}

/// A completion shared between the caller and a worker; whichever side
/// reaches it first runs it.
#[derive(Clone)]
struct CompletionSlot(Arc<Mutex<Option<Completion>>>);

impl CompletionSlot {
    fn new(on_complete: Completion) -> Self {
        Self(Arc::new(Mutex::new(Some(on_complete))))
    }

    fn complete(&self, result: Result<HttpResponse, BoxError>) {
        let taken = self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(on_complete) = taken {
            on_complete(result);
        }
    }
}

/// Blocking transport backed by a `ureq::Agent`.
///
/// Non-2xx statuses are returned as responses, never as errors, so status
/// interpretation stays with the caller.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    max_response_bytes: u64,
}

impl UreqTransport {
    pub fn new(config: TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self {
            agent,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("max_response_bytes", &self.max_response_bytes)
            .finish_non_exhaustive()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let sent = match request.body {
            Some(body) => self.agent.run(builder.body(body.to_vec())?),
            None => self.agent.run(builder.body(())?),
        };
        let mut response = sent.map_err(|e| {
            debug!(url = %request.url, error = %e, "request failed");
            e
        })?;

        let status = response.status().as_u16();
        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.append(name.as_str(), value);
            }
        }
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_response_bytes)
            .read_to_vec()?;

        debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse::new(status, headers, Cursor::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::http::HttpMethod;

    struct Teapot;

    impl Transport for Teapot {
        fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, BoxError> {
            Ok(HttpResponse::new(418, HeaderMap::new(), io::empty()))
        }
    }

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/".parse().unwrap(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[test]
    fn default_enqueue_completes_on_a_worker_thread() {
        let (tx, rx) = mpsc::channel();
        Arc::new(Teapot).enqueue(
            request(),
            Box::new(move |result| {
                let name = thread::current().name().map(str::to_string);
                tx.send((result.map(|r| r.status).ok(), name)).unwrap();
            }),
        );
        let (status, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(status, Some(418));
        assert_eq!(name.as_deref(), Some("fluent-http-call"));
    }

    #[test]
    fn slot_runs_its_completion_once() {
        let (tx, rx) = mpsc::channel();
        let slot = CompletionSlot::new(Box::new(move |result| {
            tx.send(result.err().map(|e| e.to_string())).unwrap();
        }));
        let worker = slot.clone();

        slot.complete(Err(Box::new(io::Error::other("thread limit reached"))));
        worker.complete(Ok(HttpResponse::new(200, HeaderMap::new(), io::empty())));

        assert_eq!(rx.recv().unwrap().as_deref(), Some("thread limit reached"));
        assert!(rx.try_recv().is_err());
    }
}
