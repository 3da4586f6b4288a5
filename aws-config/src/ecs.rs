/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Ecs Credentials Provider
//!
//! This credential provider is frequently used with an AWS-provided credentials service (e.g.
//! [IAM Roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)).
//! However, it's possible to use environment variables to configure this provider to use your own
//! credentials sources.
//!
//! This provider is part of the [default credentials chain](crate::default_provider::credentials).
//!
//! ## Configuration
//! **First**: It will check the value of `$AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`. It will use this
//! to construct a URI rooted at `http://169.254.170.2`. For example, if the value of the environment
//! variable was `/credentials`, the SDK would look for credentials at `http://169.254.170.2/credentials`.
//!
//! **Next**: It will check the value of `$AWS_CONTAINER_CREDENTIALS_FULL_URI`. This specifies the full
//! URL to load credentials. The URL MUST satisfy one of the following two properties:
//! 1. The URL begins with `https`
//! 2. The URL refers to an allowed IP address or host name. Allowed addresses are the loopback
//!    addresses, `localhost`, the ECS task metadata address `169.254.170.2` and the EKS pod
//!    identity addresses `169.254.170.23` and `fd00:ec2::23`.
//!
//! **Next**: It will check the value of `$AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE`, and then of
//! `$AWS_CONTAINER_AUTHORIZATION_TOKEN`. If either is set, its value will be passed in the
//! `Authorization` header.
//!
//! ## Credentials Format
//! Credentials MUST be returned in a JSON format:
//! ```json
//! {
//!    "AccessKeyId" : "MUA...",
//!    "SecretAccessKey" : "/7PC5om....",
//!    "Token" : "AQoDY....=",
//!    "Expiration" : "2016-02-25T06:03:31Z"
//!  }
//! ```
//!
//! Credentials errors MAY be returned with a `code` and `message` field:
//! ```json
//! {
//!   "code": "ErrorCode",
//!   "message": "Helpful error message."
//! }
//! ```

use crate::http_client::{HttpClient, SharedHttpClient};
use crate::json_credentials::{parse_json_credentials, JsonCredentials, RefreshableCredentials};
use crate::provider_config::ProviderConfig;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{self, future, ProvideCredentials};
use aws_credential_types::rt::sleep::{AsyncSleep, SharedAsyncSleep};
use aws_credential_types::rt::timeout::Timeout;
use aws_credential_types::Credentials;
use aws_types::os_shim_internal::{Env, Fs};
use bytes::Bytes;
use http::header::{HeaderValue, AUTHORIZATION};
use http::uri::{Scheme, Uri};
use std::error::Error;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use tracing::Instrument;

const BASE_HOST: &str = "http://169.254.170.2";
const ENV_RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
const ENV_FULL_URI: &str = "AWS_CONTAINER_CREDENTIALS_FULL_URI";
const ENV_AUTHORIZATION_TOKEN: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN";
const ENV_AUTHORIZATION_TOKEN_FILE: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE";

const PROVIDER_NAME: &str = "EcsContainer";
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Credential provider for ECS and generalized HTTP credentials
///
/// See the [module](crate::ecs) documentation for more details.
///
/// This credential provider is part of the default chain.
#[derive(Debug)]
pub struct EcsCredentialsProvider {
    env: Env,
    fs: Fs,
    http_client: Option<SharedHttpClient>,
    sleep: Option<SharedAsyncSleep>,
    timeout: Duration,
}

impl EcsCredentialsProvider {
    /// Builder for [`EcsCredentialsProvider`]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Load credentials from this credentials provider
    pub async fn credentials(&self) -> provider::Result {
        let uri = match Provider::uri(&self.env) {
            Provider::Configured(uri) => uri,
            Provider::NotConfigured => {
                return Err(CredentialsError::not_loaded(
                    "ECS provider not configured",
                ))
            }
            Provider::InvalidConfiguration(err) => {
                return Err(CredentialsError::invalid_configuration(err))
            }
        };
        let authorization = self.authorization().await?;
        let http_client = self.http_client.clone().ok_or_else(|| {
            CredentialsError::invalid_configuration("no HTTP client was configured")
        })?;

        let mut request = http::Request::builder().method(http::Method::GET).uri(uri);
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        let request = request
            .body(Bytes::new())
            .map_err(CredentialsError::unhandled)?;

        let response = match &self.sleep {
            Some(sleep) => Timeout::new(http_client.call(request), sleep.sleep(self.timeout))
                .await
                .map_err(|_| CredentialsError::provider_timed_out(self.timeout))?,
            None => http_client.call(request).await,
        }
        .map_err(CredentialsError::not_loaded)?;

        if !response.status().is_success() {
            return Err(CredentialsError::provider_error(format!(
                "non-200 status from the container credentials endpoint: {}",
                response.status()
            )));
        }
        let body = std::str::from_utf8(response.body()).map_err(CredentialsError::unhandled)?;
        let json_creds = parse_json_credentials(body).map_err(CredentialsError::unhandled)?;
        match json_creds {
            JsonCredentials::RefreshableCredentials(RefreshableCredentials {
                access_key_id,
                secret_access_key,
                session_token,
                account_id,
                expiration,
            }) => {
                let mut builder = Credentials::builder()
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .session_token(session_token)
                    .expiry(expiration)
                    .provider_name(PROVIDER_NAME);
                builder.set_account_id(account_id.map(String::from));
                Ok(builder.build())
            }
            JsonCredentials::Error { code, message } => Err(CredentialsError::provider_error(
                format!("failed to load credentials [{code}]: {message}"),
            )),
        }
    }

    async fn authorization(&self) -> Result<Option<HeaderValue>, CredentialsError> {
        let token = match self.env.get(ENV_AUTHORIZATION_TOKEN_FILE) {
            Ok(path) => {
                let contents = self.fs.read_to_end(&path).await.map_err(|err| {
                    CredentialsError::invalid_configuration(EcsConfigurationError::TokenFile {
                        path,
                        err,
                    })
                })?;
                Some(String::from_utf8(contents).map_err(CredentialsError::invalid_configuration)?)
            }
            Err(_) => self.env.get(ENV_AUTHORIZATION_TOKEN).ok(),
        };
        token
            .map(|token| HeaderValue::try_from(token.trim()))
            .transpose()
            .map_err(|err| {
                CredentialsError::invalid_configuration(
                    EcsConfigurationError::InvalidAuthToken { err },
                )
            })
    }
}

impl ProvideCredentials for EcsCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.credentials()
                .instrument(tracing::debug_span!("load_credentials", provider = PROVIDER_NAME)),
        )
    }
}

#[derive(Debug)]
enum Provider {
    Configured(Uri),
    NotConfigured,
    InvalidConfiguration(EcsConfigurationError),
}

impl Provider {
    fn uri(env: &Env) -> Provider {
        let relative_uri = env.get(ENV_RELATIVE_URI).ok();
        let full_uri = env.get(ENV_FULL_URI).ok();
        if let Some(relative_uri) = relative_uri {
            Self::build_full_uri(relative_uri)
        } else if let Some(full_uri) = full_uri {
            match validate_full_uri(&full_uri) {
                Ok(uri) => Provider::Configured(uri),
                Err(err) => Provider::InvalidConfiguration(err),
            }
        } else {
            Provider::NotConfigured
        }
    }

    fn build_full_uri(relative_uri: String) -> Provider {
        let full_uri = format!("{BASE_HOST}{relative_uri}");
        match full_uri.parse::<Uri>() {
            Ok(uri) => Provider::Configured(uri),
            Err(invalid_uri) => {
                Provider::InvalidConfiguration(EcsConfigurationError::InvalidRelativeUri {
                    err: invalid_uri,
                    uri: relative_uri,
                })
            }
        }
    }
}

#[derive(Debug)]
enum EcsConfigurationError {
    InvalidRelativeUri {
        err: http::uri::InvalidUri,
        uri: String,
    },
    InvalidFullUri {
        err: InvalidFullUriError,
        uri: String,
    },
    InvalidAuthToken {
        err: http::header::InvalidHeaderValue,
    },
    TokenFile {
        path: String,
        err: std::io::Error,
    },
}

impl fmt::Display for EcsConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsConfigurationError::InvalidRelativeUri { err, uri } => write!(
                f,
                "invalid relative URI for ECS provider ({err}): {uri}"
            ),
            EcsConfigurationError::InvalidFullUri { err, uri } => {
                write!(f, "invalid full URI for ECS provider ({err}): {uri}")
            }
            EcsConfigurationError::InvalidAuthToken { err } => write!(
                f,
                "`{ENV_AUTHORIZATION_TOKEN}` could not be used as a header value: {err}"
            ),
            EcsConfigurationError::TokenFile { path, .. } => write!(
                f,
                "failed to read the authorization token file `{path}` named by `{ENV_AUTHORIZATION_TOKEN_FILE}`"
            ),
        }
    }
}

impl Error for EcsConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EcsConfigurationError::InvalidRelativeUri { err, .. } => Some(err),
            EcsConfigurationError::InvalidFullUri { err, .. } => Some(err),
            EcsConfigurationError::InvalidAuthToken { err } => Some(err),
            EcsConfigurationError::TokenFile { err, .. } => Some(err),
        }
    }
}

/// Builder for [`EcsCredentialsProvider`]
#[derive(Default, Debug, Clone)]
pub struct Builder {
    provider_config: Option<ProviderConfig>,
    timeout: Option<Duration>,
}

impl Builder {
    /// Override the configuration used for this provider
    pub fn configure(mut self, configuration: &ProviderConfig) -> Self {
        self.provider_config = Some(configuration.clone());
        self
    }

    /// Override the timeout used for requests to the credentials endpoint
    ///
    /// The timeout only applies when a sleep implementation is available.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create an [`EcsCredentialsProvider`] from this builder
    pub fn build(self) -> EcsCredentialsProvider {
        let provider_config = self.provider_config.unwrap_or_default();
        EcsCredentialsProvider {
            env: provider_config.env(),
            fs: provider_config.fs(),
            http_client: provider_config.http_client(),
            sleep: provider_config.sleep(),
            timeout: self.timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
        }
    }
}

#[derive(Debug)]
enum InvalidFullUriError {
    /// The provided URI could not be parsed as a URI
    InvalidUri(http::uri::InvalidUri),

    /// No Dns service was provided
    MissingHost,

    /// The URI did not specify a secure scheme (https) or an allowed host
    DisallowedHost(String),
}

impl fmt::Display for InvalidFullUriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidFullUriError::InvalidUri(_) => write!(f, "URI was invalid"),
            InvalidFullUriError::MissingHost => write!(f, "URI did not specify a host"),
            InvalidFullUriError::DisallowedHost(host) => write!(
                f,
                "`{host}` is not allowed: the URI must use HTTPS, or refer to a loopback, ECS, or EKS address"
            ),
        }
    }
}

impl Error for InvalidFullUriError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InvalidFullUriError::InvalidUri(err) => Some(err),
            _ => None,
        }
    }
}

/// Validate that `uri` is valid to be used as a full provider URI
fn validate_full_uri(uri: &str) -> Result<Uri, EcsConfigurationError> {
    let invalid = |err| EcsConfigurationError::InvalidFullUri {
        err,
        uri: uri.to_string(),
    };
    let parsed: Uri = uri
        .parse()
        .map_err(|err| invalid(InvalidFullUriError::InvalidUri(err)))?;
    if parsed.scheme() == Some(&Scheme::HTTPS) {
        return Ok(parsed);
    }
    let host = parsed
        .host()
        .ok_or_else(|| invalid(InvalidFullUriError::MissingHost))?;
    if is_allowed_host(host) {
        Ok(parsed)
    } else {
        Err(invalid(InvalidFullUriError::DisallowedHost(host.to_string())))
    }
}

fn is_allowed_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let host = host.trim_start_matches('[').trim_end_matches(']');
    match host.parse::<IpAddr>() {
        Ok(addr) => addr.is_loopback() || is_ecs_or_eks(addr),
        Err(_) => false,
    }
}

fn is_ecs_or_eks(addr: IpAddr) -> bool {
    const ECS: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(169, 254, 170, 2));
    const EKS_V4: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(169, 254, 170, 23));
    const EKS_V6: IpAddr = IpAddr::V6(std::net::Ipv6Addr::new(0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x23));
    addr == ECS || addr == EKS_V4 || addr == EKS_V6
}
