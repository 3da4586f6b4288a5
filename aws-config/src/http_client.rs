/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! HTTP client abstraction used by the credential providers that make network calls.
//!
//! Requests and responses are fully buffered: every credentials endpoint returns small JSON
//! documents, so streaming bodies buy nothing here.

#[cfg(feature = "rustls")]
mod hyper_client;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

#[cfg(feature = "rustls")]
pub use hyper_client::HyperClient;

use bytes::Bytes;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A buffered HTTP request
pub type HttpRequest = http::Request<Bytes>;
/// A buffered HTTP response
pub type HttpResponse = http::Response<Bytes>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectorErrorKind {
    Timeout,
    Io,
    Other,
}

/// Error from the HTTP client: the request never produced an HTTP response
#[derive(Debug)]
pub struct ConnectorError {
    kind: ConnectorErrorKind,
    source: BoxError,
}

impl ConnectorError {
    /// The request timed out
    pub fn timeout(source: impl Into<BoxError>) -> Self {
        Self {
            kind: ConnectorErrorKind::Timeout,
            source: source.into(),
        }
    }

    /// An IO error occurred, for example the connection was refused
    pub fn io(source: impl Into<BoxError>) -> Self {
        Self {
            kind: ConnectorErrorKind::Io,
            source: source.into(),
        }
    }

    /// Any other failure of the HTTP client
    pub fn other(source: impl Into<BoxError>) -> Self {
        Self {
            kind: ConnectorErrorKind::Other,
            source: source.into(),
        }
    }

    /// True if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        self.kind == ConnectorErrorKind::Timeout
    }

    /// True if this error is an IO error
    pub fn is_io(&self) -> bool {
        self.kind == ConnectorErrorKind::Io
    }
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConnectorErrorKind::Timeout => write!(f, "timeout"),
            ConnectorErrorKind::Io => write!(f, "io error"),
            ConnectorErrorKind::Other => write!(f, "other"),
        }
    }
}

impl Error for ConnectorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Future returned by [`HttpClient::call`]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct HttpClientFuture(
    Pin<Box<dyn Future<Output = Result<HttpResponse, ConnectorError>> + Send + 'static>>,
);

impl HttpClientFuture {
    /// Create an `HttpClientFuture` from a future
    pub fn new(
        future: impl Future<Output = Result<HttpResponse, ConnectorError>> + Send + 'static,
    ) -> Self {
        Self(Box::pin(future))
    }

    /// Create an `HttpClientFuture` that is immediately ready
    pub fn ready(result: Result<HttpResponse, ConnectorError>) -> Self {
        Self::new(std::future::ready(result))
    }
}

impl fmt::Debug for HttpClientFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HttpClientFuture")
    }
}

impl Future for HttpClientFuture {
    type Output = Result<HttpResponse, ConnectorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

/// An HTTP client that sends a buffered request and returns the buffered response
pub trait HttpClient: Send + Sync + fmt::Debug {
    /// Send `request`
    fn call(&self, request: HttpRequest) -> HttpClientFuture;
}

/// Cheaply cloneable handle to an [`HttpClient`]
#[derive(Clone, Debug)]
pub struct SharedHttpClient(Arc<dyn HttpClient>);

impl SharedHttpClient {
    /// Wrap `client` in a `SharedHttpClient`
    pub fn new(client: impl HttpClient + 'static) -> Self {
        Self(Arc::new(client))
    }
}

impl HttpClient for SharedHttpClient {
    fn call(&self, request: HttpRequest) -> HttpClientFuture {
        self.0.call(request)
    }
}

/// Returns the default HTTP client, if a TLS implementation was enabled
#[cfg(feature = "rustls")]
pub fn default_http_client() -> Option<SharedHttpClient> {
    match HyperClient::new() {
        Ok(client) => Some(SharedHttpClient::new(client)),
        Err(err) => {
            tracing::warn!(error = %err, "failed to construct the default HTTPS client");
            None
        }
    }
}

/// Returns the default HTTP client, if a TLS implementation was enabled
#[cfg(not(feature = "rustls"))]
pub fn default_http_client() -> Option<SharedHttpClient> {
    tracing::debug!("no default HTTP client: the `rustls` feature is disabled");
    None
}
