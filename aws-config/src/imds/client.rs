/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Raw IMDSv2 Client
//!
//! Client for direct access to IMDSv2.

use crate::http_client::{ConnectorError, HttpClient, HttpRequest, HttpResponse, SharedHttpClient};
use crate::imds::env;
use crate::provider_config::ProviderConfig;
use aws_credential_types::cache::ExpiringCache;
use aws_credential_types::rt::sleep::{AsyncSleep, SharedAsyncSleep};
use aws_credential_types::rt::timeout::Timeout;
use aws_credential_types::time_source::SharedTimeSource;
use bytes::Bytes;
use http::uri::Uri;
use http::StatusCode;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use zeroize::Zeroizing;

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(21_600);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
// refresh the session token this long before it expires
const TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(120);

const TOKEN_PATH: &str = "/latest/api/token";
const X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const X_AWS_EC2_METADATA_TOKEN: &str = "x-aws-ec2-metadata-token";

const IPV4_ENDPOINT: &str = "http://169.254.169.254";
const IPV6_ENDPOINT: &str = "http://[fd00:ec2::254]";

/// IMDSv2 Client
///
/// Client for IMDSv2. This client handles fetching tokens, retrying on token expiry, and
/// generating internal tokens.
///
/// # Client Configuration
/// The IMDS client can load configuration explicitly, via environment variables, or via the
/// [`ProviderConfig`]. The endpoint is resolved in this order:
/// 1. Explicit configuration via [`Builder::endpoint`]
/// 2. The `AWS_EC2_METADATA_SERVICE_ENDPOINT` environment variable
/// 3. `AWS_EC2_METADATA_SERVICE_ENDPOINT_MODE` (`IPv4` or `IPv6`), selecting `http://169.254.169.254`
///    or `http://[fd00:ec2::254]`
///
/// Tokens are cached and reused until shortly before their TTL elapses.
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<ClientInner>,
    token: ExpiringCache<Token, ImdsError>,
}

#[derive(Debug)]
struct ClientInner {
    endpoint: Result<String, ImdsError>,
    http_client: Option<SharedHttpClient>,
    sleep: Option<SharedAsyncSleep>,
    time_source: SharedTimeSource,
    token_ttl: Duration,
    timeout: Duration,
}

#[derive(Clone)]
struct Token(Zeroizing<String>);

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("** redacted **")
    }
}

impl Client {
    /// IMDS client builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Retrieve information from IMDS
    ///
    /// This method will handle loading and caching a session token and combining the `path` with
    /// the configured IMDS endpoint.
    ///
    /// ## Examples
    /// ```no_run
    /// use aws_config::imds::client::Client;
    /// # async fn docs() {
    /// let client = Client::builder().build();
    /// let ami_id = client
    ///   .get("/latest/meta-data/ami-id")
    ///   .await
    ///   .expect("failure communicating with IMDS");
    /// # }
    /// ```
    pub async fn get(&self, path: &str) -> Result<String, ImdsError> {
        let endpoint = self.inner.endpoint.clone()?;
        let token = self.token(&endpoint).await?;
        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(format!("{endpoint}{path}"))
            .header(X_AWS_EC2_METADATA_TOKEN, token.0.as_str())
            .body(Bytes::new())
            .map_err(ImdsError::unexpected)?;
        let response = self.inner.send(request).await?;
        match response.status() {
            status if status.is_success() => String::from_utf8(response.body().to_vec())
                .map_err(ImdsError::unexpected),
            StatusCode::UNAUTHORIZED => {
                // the token was rejected; the next call fetches a new one
                self.token.clear();
                Err(ImdsError::error_response(response))
            }
            _ => Err(ImdsError::error_response(response)),
        }
    }

    /// Drops the cached session token
    pub(crate) fn clear_token(&self) {
        self.token.clear();
    }

    async fn token(&self, endpoint: &str) -> Result<Token, ImdsError> {
        let now = self.inner.time_source.now();
        let inner = self.inner.clone();
        let uri = format!("{endpoint}{TOKEN_PATH}");
        self.token
            .get_or_load(now, move || async move { inner.load_token(uri, now).await })
            .await
    }
}

impl ClientInner {
    async fn load_token(
        &self,
        uri: String,
        now: SystemTime,
    ) -> Result<(Token, SystemTime), ImdsError> {
        tracing::debug!("loading IMDS session token");
        let request = http::Request::builder()
            .method(http::Method::PUT)
            .uri(uri)
            .header(
                X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS,
                self.token_ttl.as_secs().to_string(),
            )
            .body(Bytes::new())
            .map_err(ImdsError::unexpected)?;
        let response = self.send(request).await.map_err(ImdsError::into_token_error)?;
        if !response.status().is_success() {
            return Err(ImdsError::error_response(response).into_token_error());
        }
        let ttl = response
            .headers()
            .get(X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS)
            .and_then(|ttl| ttl.to_str().ok())
            .and_then(|ttl| ttl.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.token_ttl);
        let token = String::from_utf8(response.into_body().to_vec())
            .map_err(|err| ImdsError::unexpected(err).into_token_error())?;
        let expiry = now.checked_add(ttl).ok_or_else(|| {
            ImdsError::unexpected(format!("token TTL of {} seconds is out of range", ttl.as_secs()))
                .into_token_error()
        })?;
        Ok((Token(Zeroizing::new(token)), expiry))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ImdsError> {
        let http_client = self.http_client.as_ref().ok_or_else(|| {
            ImdsError::unexpected("no HTTP client was configured for the IMDS client")
        })?;
        let response = match &self.sleep {
            Some(sleep) => Timeout::new(http_client.call(request), sleep.sleep(self.timeout))
                .await
                .map_err(|_| ImdsError::timeout(self.timeout))?,
            None => http_client.call(request).await,
        };
        response.map_err(ImdsError::io)
    }
}

/// Error from a request to IMDS
#[derive(Debug, Clone)]
pub struct ImdsError {
    kind: ImdsErrorKind,
    while_loading_token: bool,
}

#[derive(Debug, Clone)]
enum ImdsErrorKind {
    InvalidEndpoint {
        endpoint: String,
        source: Option<Arc<http::uri::InvalidUri>>,
    },
    ErrorResponse {
        status: StatusCode,
        body: String,
    },
    Io(Arc<ConnectorError>),
    Timeout(Duration),
    Unexpected(Arc<dyn Error + Send + Sync>),
}

impl ImdsError {
    fn new(kind: ImdsErrorKind) -> Self {
        Self {
            kind,
            while_loading_token: false,
        }
    }

    fn error_response(response: HttpResponse) -> Self {
        Self::new(ImdsErrorKind::ErrorResponse {
            status: response.status(),
            body: String::from_utf8_lossy(response.body()).into_owned(),
        })
    }

    fn io(err: ConnectorError) -> Self {
        Self::new(ImdsErrorKind::Io(Arc::new(err)))
    }

    fn timeout(duration: Duration) -> Self {
        Self::new(ImdsErrorKind::Timeout(duration))
    }

    fn unexpected(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::new(ImdsErrorKind::Unexpected(Arc::from(err.into())))
    }

    fn into_token_error(mut self) -> Self {
        self.while_loading_token = true;
        self
    }

    /// The status code of the response, if IMDS responded with an error
    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            ImdsErrorKind::ErrorResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True if IMDS could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self.kind, ImdsErrorKind::Io(_) | ImdsErrorKind::Timeout(_))
    }

    /// True if the configured endpoint was not a valid URI
    pub fn is_invalid_endpoint(&self) -> bool {
        matches!(self.kind, ImdsErrorKind::InvalidEndpoint { .. })
    }

    /// True if the error occurred while loading the session token
    pub fn is_token_error(&self) -> bool {
        self.while_loading_token
    }
}

impl fmt::Display for ImdsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.while_loading_token {
            write!(f, "failed to load IMDS session token: ")?;
        }
        match &self.kind {
            ImdsErrorKind::InvalidEndpoint { endpoint, .. } => {
                write!(f, "invalid IMDS endpoint `{endpoint}`")
            }
            ImdsErrorKind::ErrorResponse { status, body } => {
                write!(f, "error response from IMDS (code: {}): {body}", status.as_u16())
            }
            ImdsErrorKind::Io(_) => write!(f, "an IO error occurred communicating with IMDS"),
            ImdsErrorKind::Timeout(timeout) => {
                write!(f, "IMDS did not respond within {timeout:?}")
            }
            ImdsErrorKind::Unexpected(_) => write!(f, "unexpected error communicating with IMDS"),
        }
    }
}

impl Error for ImdsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ImdsErrorKind::InvalidEndpoint { source, .. } => {
                source.as_deref().map(|err| err as &(dyn Error + 'static))
            }
            ImdsErrorKind::Io(err) => Some(err.as_ref()),
            ImdsErrorKind::Unexpected(err) => Some(err.as_ref()),
            ImdsErrorKind::ErrorResponse { .. } | ImdsErrorKind::Timeout(_) => None,
        }
    }
}

/// IMDS endpoint mode
///
/// IMDS can be accessed with an IPv4 or IPv6 endpoint. This is used to select the default
/// endpoint when no endpoint is set explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    /// IPv4 IMDS endpoint: `http://169.254.169.254`
    IpV4,
    /// IPv6 IMDS endpoint: `http://[fd00:ec2::254]`
    IpV6,
}

impl EndpointMode {
    fn endpoint(&self) -> &'static str {
        match self {
            EndpointMode::IpV4 => IPV4_ENDPOINT,
            EndpointMode::IpV6 => IPV6_ENDPOINT,
        }
    }
}

/// Invalid endpoint mode
#[derive(Debug, Clone)]
pub struct InvalidEndpointMode(String);

impl fmt::Display for InvalidEndpointMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` is not a valid endpoint mode. Valid values are [`IPv4`, `IPv6`]",
            self.0
        )
    }
}

impl Error for InvalidEndpointMode {}

impl FromStr for EndpointMode {
    type Err = InvalidEndpointMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            _ if value.eq_ignore_ascii_case("ipv4") => Ok(EndpointMode::IpV4),
            _ if value.eq_ignore_ascii_case("ipv6") => Ok(EndpointMode::IpV6),
            other => Err(InvalidEndpointMode(other.to_owned())),
        }
    }
}

/// IMDS Client Builder
#[derive(Default, Debug, Clone)]
pub struct Builder {
    endpoint: Option<String>,
    mode_override: Option<EndpointMode>,
    token_ttl: Option<Duration>,
    timeout: Option<Duration>,
    config: Option<ProviderConfig>,
}

impl Builder {
    /// Configure generic options of the [`Client`]
    pub fn configure(mut self, provider_config: &ProviderConfig) -> Self {
        self.config = Some(provider_config.clone());
        self
    }

    /// Override the endpoint for the [`Client`]
    ///
    /// By default, the client will resolve an endpoint from the environment, then the endpoint
    /// mode.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Override the endpoint mode for [`Client`]
    ///
    /// * When set to [`IpV4`](EndpointMode::IpV4), the endpoint will be `http://169.254.169.254`.
    /// * When set to [`IpV6`](EndpointMode::IpV6), the endpoint will be `http://[fd00:ec2::254]`.
    pub fn endpoint_mode(mut self, mode: EndpointMode) -> Self {
        self.mode_override = Some(mode);
        self
    }

    /// Override the time-to-live for the session token
    ///
    /// Requests to IMDS utilize a session token for authentication. By default, session tokens
    /// last for 6 hours. When the TTL for the token expires, a new token must be retrieved from
    /// the metadata service.
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    /// Override the timeout applied to each request to IMDS
    ///
    /// By default, requests time out after 1 second. The timeout only applies when a sleep
    /// implementation is available.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build an IMDSv2 Client
    pub fn build(self) -> Client {
        let config = self.config.unwrap_or_default();
        let os_env = config.env();
        let endpoint = self
            .endpoint
            .or_else(|| os_env.get(env::ENDPOINT).ok())
            .map(|endpoint| validate_endpoint(&endpoint))
            .unwrap_or_else(|| {
                let mode = match self.mode_override {
                    Some(mode) => mode,
                    None => match os_env.get(env::ENDPOINT_MODE) {
                        Ok(mode) => mode.parse().unwrap_or_else(|err| {
                            tracing::warn!(err = %err, "ignoring invalid IMDS endpoint mode");
                            EndpointMode::IpV4
                        }),
                        Err(_) => EndpointMode::IpV4,
                    },
                };
                Ok(mode.endpoint().to_string())
            });
        Client {
            inner: Arc::new(ClientInner {
                endpoint,
                http_client: config.http_client(),
                sleep: config.sleep(),
                time_source: config.time_source(),
                token_ttl: self.token_ttl.unwrap_or(DEFAULT_TOKEN_TTL),
                timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            }),
            token: ExpiringCache::new(TOKEN_REFRESH_BUFFER),
        }
    }
}

fn validate_endpoint(endpoint: &str) -> Result<String, ImdsError> {
    let invalid = |source: Option<http::uri::InvalidUri>| {
        ImdsError::new(ImdsErrorKind::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source: source.map(Arc::new),
        })
    };
    let uri = Uri::from_str(endpoint).map_err(|err| invalid(Some(err)))?;
    // metadata paths are appended to the endpoint, so it needs a scheme and a host
    if uri.scheme().is_none() || uri.host().is_none() {
        return Err(invalid(None));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}
