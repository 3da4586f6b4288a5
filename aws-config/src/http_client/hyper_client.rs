/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::http_client::{ConnectorError, HttpClient, HttpClientFuture, HttpRequest};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{ConfigBuilderExt, HttpsConnector};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// HTTPS client built on hyper 1.x and rustls, trusting the platform's native roots
#[derive(Clone)]
pub struct HyperClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperClient").finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Creates a client; fails if the TLS configuration or the native root store can't be loaded
    pub fn new() -> Result<Self, Box<dyn Error + Send + Sync>> {
        let tls = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_native_roots()?
        .with_no_client_auth();

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);
        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
        })
    }
}

impl HttpClient for HyperClient {
    fn call(&self, request: HttpRequest) -> HttpClientFuture {
        let client = self.client.clone();
        HttpClientFuture::new(async move {
            let response = client
                .request(request.map(Full::new))
                .await
                .map_err(|err| {
                    if err.is_connect() {
                        ConnectorError::io(err)
                    } else {
                        ConnectorError::other(err)
                    }
                })?;
            let (parts, body) = response.into_parts();
            let body = body.collect().await.map_err(ConnectorError::io)?.to_bytes();
            Ok(http::Response::from_parts(parts, body))
        })
    }
}
