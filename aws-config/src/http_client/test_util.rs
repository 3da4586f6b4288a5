/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Test HTTP clients

use crate::http_client::{
    ConnectorError, HttpClient, HttpClientFuture, HttpRequest, HttpResponse, SharedHttpClient,
};
use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Create a [`SharedHttpClient`] from `Fn(http::Request) -> http::Response`
///
/// # Examples
///
/// ```rust
/// use aws_config::http_client::test_util::infallible_client_fn;
/// let client = infallible_client_fn(|_req| http::Response::builder().status(200).body("OK!").unwrap());
/// ```
pub fn infallible_client_fn<B>(
    f: impl Fn(HttpRequest) -> http::Response<B> + Send + Sync + 'static,
) -> SharedHttpClient
where
    B: Into<Bytes>,
{
    SharedHttpClient::new(ClientFn {
        response: Arc::new(move |request| Ok(f(request).map(Into::into))),
    })
}

/// Create a [`SharedHttpClient`] whose requests all fail with the error returned by `f`
pub fn failing_client_fn(
    f: impl Fn() -> ConnectorError + Send + Sync + 'static,
) -> SharedHttpClient {
    SharedHttpClient::new(ClientFn {
        response: Arc::new(move |_request| Err(f())),
    })
}

type ResponseFn = dyn Fn(HttpRequest) -> Result<HttpResponse, ConnectorError> + Send + Sync;

#[derive(Clone)]
struct ClientFn {
    response: Arc<ResponseFn>,
}

impl fmt::Debug for ClientFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFn").finish()
    }
}

impl HttpClient for ClientFn {
    fn call(&self, request: HttpRequest) -> HttpClientFuture {
        HttpClientFuture::ready((self.response)(request))
    }
}

/// An HTTP client that never responds.
///
/// Returned futures will return Pending forever
#[derive(Clone, Debug, Default)]
pub struct NeverClient {
    invocations: Arc<AtomicUsize>,
}

impl NeverClient {
    /// Create a new never client.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of invocations made to this client.
    pub fn num_calls(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl HttpClient for NeverClient {
    fn call(&self, _request: HttpRequest) -> HttpClientFuture {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        HttpClientFuture::new(async move {
            std::future::pending::<()>().await;
            unreachable!()
        })
    }
}

/// A request/response pair for [`StaticReplayClient`]
#[derive(Debug)]
pub struct ReplayEvent {
    request: HttpRequest,
    response: HttpResponse,
}

impl ReplayEvent {
    /// Creates a new `ReplayEvent`.
    pub fn new(
        request: http::Request<impl Into<Bytes>>,
        response: http::Response<impl Into<Bytes>>,
    ) -> Self {
        Self {
            request: request.map(Into::into),
            response: response.map(Into::into),
        }
    }
}

#[derive(Debug, Default)]
struct ReplayState {
    remaining: VecDeque<ReplayEvent>,
    expected: Vec<HttpRequest>,
    actual: Vec<HttpRequest>,
}

/// Replays a fixed list of responses, in order, and records the requests it received
///
/// Once every response has been replayed, further requests fail with a [`ConnectorError`].
/// Use [`assert_requests_match`](StaticReplayClient::assert_requests_match) to verify the
/// requests afterwards.
#[derive(Clone, Debug)]
pub struct StaticReplayClient {
    state: Arc<Mutex<ReplayState>>,
}

impl StaticReplayClient {
    /// Creates a new client that replays `events` in order.
    pub fn new(events: Vec<ReplayEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplayState {
                remaining: events.into(),
                ..Default::default()
            })),
        }
    }

    /// Returns the requests received so far
    pub fn actual_requests(&self) -> Vec<HttpRequest> {
        self.state
            .lock()
            .unwrap()
            .actual
            .iter()
            .map(clone_request)
            .collect()
    }

    /// Asserts that every event was replayed and that each request matched the expected request.
    ///
    /// Method, URI, and body must be equal. Every header of the expected request must be present
    /// with the same value, except those named in `ignore_headers`. Extra headers on the actual
    /// request are permitted.
    #[track_caller]
    pub fn assert_requests_match(&self, ignore_headers: &[&str]) {
        let state = self.state.lock().unwrap();
        assert!(
            state.remaining.is_empty(),
            "{} events were not replayed",
            state.remaining.len()
        );
        assert_eq!(
            state.expected.len(),
            state.actual.len(),
            "a different number of requests was sent"
        );
        for (i, (expected, actual)) in state.expected.iter().zip(&state.actual).enumerate() {
            assert_eq!(expected.method(), actual.method(), "request {i}: method");
            assert_eq!(expected.uri(), actual.uri(), "request {i}: uri");
            for (name, value) in expected.headers() {
                if ignore_headers
                    .iter()
                    .any(|ignored| name.as_str().eq_ignore_ascii_case(ignored))
                {
                    continue;
                }
                assert_eq!(
                    Some(value),
                    actual.headers().get(name),
                    "request {i}: header `{name}`"
                );
            }
            assert_eq!(
                String::from_utf8_lossy(expected.body()),
                String::from_utf8_lossy(actual.body()),
                "request {i}: body"
            );
        }
    }
}

fn clone_request(request: &HttpRequest) -> HttpRequest {
    let mut builder = http::Request::builder()
        .method(request.method().clone())
        .uri(request.uri().clone());
    for (name, value) in request.headers() {
        builder = builder.header(name, value);
    }
    builder
        .body(request.body().clone())
        .expect("valid request parts")
}

impl HttpClient for StaticReplayClient {
    fn call(&self, request: HttpRequest) -> HttpClientFuture {
        let mut state = self.state.lock().unwrap();
        state.actual.push(request);
        let result = match state.remaining.pop_front() {
            Some(event) => {
                state.expected.push(event.request);
                Ok(event.response)
            }
            None => Err(ConnectorError::other("no more events to replay")),
        };
        HttpClientFuture::ready(result)
    }
}

impl From<NeverClient> for SharedHttpClient {
    fn from(client: NeverClient) -> Self {
        SharedHttpClient::new(client)
    }
}

impl From<StaticReplayClient> for SharedHttpClient {
    fn from(client: StaticReplayClient) -> Self {
        SharedHttpClient::new(client)
    }
}
