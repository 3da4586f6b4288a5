/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! SSO Credentials Provider
//!
//! This credentials provider enables loading credentials from `~/.aws/sso/cache`. For this
//! provider to work, the `aws sso login` command must have been run first. The cached token is
//! exchanged for role credentials with the SSO portal's `GetRoleCredentials` operation.
//!
//! This provider is included automatically when profiles are loaded.

use crate::http_client::{HttpClient, SharedHttpClient};
use crate::provider_config::ProviderConfig;
use crate::sso::cache::load_cached_token;
use crate::sso::{LoginRequired, ServiceError, SsoTokenProvider};
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::token::ProvideAccessToken;
use aws_credential_types::provider::{self, future, ProvideCredentials};
use aws_credential_types::time_source::SharedTimeSource;
use aws_credential_types::Credentials;
use aws_types::os_shim_internal::{Env, Fs};
use aws_types::region::Region;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::time::{Duration, UNIX_EPOCH};
use zeroize::Zeroizing;

const PROVIDER_NAME: &str = "SSO";
const BEARER_TOKEN_HEADER: &str = "x-amz-sso_bearer_token";

/// Characters left unescaped in query values (RFC 3986 unreserved)
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// SSO Credentials Provider
///
/// _Note: This provider is part of the default credentials chain and is integrated with the profile-file provider._
///
/// This credentials provider will use cached SSO tokens stored in `~/.aws/sso/cache/<hash>.json`.
/// `<hash>` is the SHA-1 of the configured [`session_name`](Builder::session_name) when one is
/// set, and of the [`start_url`](Builder::start_url) otherwise.
///
/// A token loaded by start URL is never refreshed; once it expires, `aws sso login` must be run
/// again. A token loaded by session name is refreshed by an [`SsoTokenProvider`].
#[derive(Debug)]
pub struct SsoCredentialsProvider {
    fs: Fs,
    env: Env,
    sso_provider_config: SsoProviderConfig,
    http_client: Option<SharedHttpClient>,
    time_source: SharedTimeSource,
    token_provider: Option<SsoTokenProvider>,
}

impl SsoCredentialsProvider {
    /// Creates a builder for [`SsoCredentialsProvider`]
    pub fn builder() -> Builder {
        Builder::new()
    }

    pub(crate) fn new(
        provider_config: &ProviderConfig,
        sso_provider_config: SsoProviderConfig,
    ) -> Self {
        let token_provider = sso_provider_config
            .session_name
            .as_ref()
            .map(|session_name| {
                SsoTokenProvider::builder()
                    .configure(provider_config)
                    .region(sso_provider_config.region.clone())
                    .session_name(session_name.clone())
                    .start_url(sso_provider_config.start_url.clone())
                    .build()
            });
        SsoCredentialsProvider {
            fs: provider_config.fs(),
            env: provider_config.env(),
            sso_provider_config,
            http_client: provider_config.http_client(),
            time_source: provider_config.time_source(),
            token_provider,
        }
    }

    async fn access_token(&self) -> Result<Zeroizing<String>, CredentialsError> {
        if let Some(token_provider) = &self.token_provider {
            let token = token_provider
                .provide_access_token()
                .await
                .map_err(CredentialsError::from)?;
            return Ok(Zeroizing::new(token.token().to_string()));
        }
        let start_url = &self.sso_provider_config.start_url;
        let token = load_cached_token(&self.env, &self.fs, start_url)
            .await
            .map_err(|err| {
                CredentialsError::invalid_configuration(LoginRequired::unreadable(start_url, err))
            })?;
        // legacy tokens are never refreshed
        if self.time_source.now() > token.expires_at {
            return Err(CredentialsError::invalid_configuration(
                LoginRequired::expired(start_url),
            ));
        }
        Ok(token.access_token)
    }

    pub(crate) async fn credentials(&self) -> provider::Result {
        let access_token = self.access_token().await?;
        let http_client = self.http_client.clone().ok_or_else(|| {
            CredentialsError::invalid_configuration("no HTTP client was configured")
        })?;
        let request = get_role_credentials_request(&self.sso_provider_config, &access_token)?;
        let response = http_client
            .call(request)
            .await
            .map_err(CredentialsError::not_loaded)?;
        if !response.status().is_success() {
            return Err(CredentialsError::provider_error(ServiceError::new(
                "GetRoleCredentials",
                &response,
            )));
        }
        parse_role_credentials(response.body())
    }
}

impl ProvideCredentials for SsoCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }

    fn close(&self) {
        if let Some(token_provider) = &self.token_provider {
            token_provider.clear();
        }
    }
}

fn get_role_credentials_request(
    config: &SsoProviderConfig,
    access_token: &str,
) -> Result<http::Request<Bytes>, CredentialsError> {
    let uri = format!(
        "https://portal.sso.{region}.amazonaws.com/federation/credentials?account_id={account_id}&role_name={role_name}",
        region = config.region,
        account_id = utf8_percent_encode(&config.account_id, QUERY_VALUE),
        role_name = utf8_percent_encode(&config.role_name, QUERY_VALUE),
    );
    http::Request::builder()
        .method(http::Method::GET)
        .uri(uri)
        .header(BEARER_TOKEN_HEADER, access_token)
        .body(Bytes::new())
        .map_err(CredentialsError::invalid_configuration)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetRoleCredentialsOutput {
    role_credentials: Option<RoleCredentials>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleCredentials {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    /// Milliseconds since the epoch
    expiration: Option<i64>,
}

fn parse_role_credentials(body: &[u8]) -> provider::Result {
    let output: GetRoleCredentialsOutput =
        serde_json::from_slice(body).map_err(CredentialsError::unhandled)?;
    let credentials = output.role_credentials.ok_or_else(|| {
        CredentialsError::protocol_violation("GetRoleCredentials response had no `roleCredentials`")
    })?;
    let access_key_id = credentials.access_key_id.ok_or_else(|| {
        CredentialsError::protocol_violation("`roleCredentials` had no `accessKeyId`")
    })?;
    let secret_access_key = credentials.secret_access_key.ok_or_else(|| {
        CredentialsError::protocol_violation("`roleCredentials` had no `secretAccessKey`")
    })?;
    let expiration = credentials
        .expiration
        .and_then(|millis| u64::try_from(millis).ok())
        .map(|millis| UNIX_EPOCH + Duration::from_millis(millis));
    let mut builder = Credentials::builder()
        .access_key_id(access_key_id)
        .secret_access_key(secret_access_key)
        .provider_name(PROVIDER_NAME);
    builder.set_session_token(credentials.session_token);
    builder.set_expiry(expiration);
    Ok(builder.build())
}

/// Builder for [`SsoCredentialsProvider`]
#[derive(Default, Debug, Clone)]
pub struct Builder {
    provider_config: Option<ProviderConfig>,
    account_id: Option<String>,
    region: Option<Region>,
    role_name: Option<String>,
    start_url: Option<String>,
    session_name: Option<String>,
}

impl Builder {
    /// Create a new builder for [`SsoCredentialsProvider`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the configuration used for this provider
    pub fn configure(mut self, provider_config: &ProviderConfig) -> Self {
        self.provider_config = Some(provider_config.clone());
        self
    }

    /// Set the account id used for SSO
    ///
    /// This is a required field.
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set the region used for SSO
    ///
    /// This is a required field.
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Set the role name used for SSO
    ///
    /// This is a required field.
    pub fn role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }

    /// Set the start URL used for SSO
    ///
    /// This is a required field.
    pub fn start_url(mut self, start_url: impl Into<String>) -> Self {
        self.start_url = Some(start_url.into());
        self
    }

    /// Set the session name used for SSO
    ///
    /// When set, the token is loaded and refreshed through an [`SsoTokenProvider`].
    pub fn session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    /// Construct an SsoCredentialsProvider from the builder
    ///
    /// # Panics
    /// This method will panic if the any of the following required fields are unset:
    /// - [`start_url`](Self::start_url)
    /// - [`role_name`](Self::role_name)
    /// - [`account_id`](Self::account_id)
    /// - [`region`](Self::region)
    pub fn build(self) -> SsoCredentialsProvider {
        let provider_config = self.provider_config.unwrap_or_default();
        let sso_config = SsoProviderConfig {
            account_id: self.account_id.expect("account_id must be set"),
            role_name: self.role_name.expect("role_name must be set"),
            start_url: self.start_url.expect("start_url must be set"),
            region: self.region.expect("region must be set"),
            session_name: self.session_name,
        };
        SsoCredentialsProvider::new(&provider_config, sso_config)
    }
}

/// The identity an [`SsoCredentialsProvider`] resolves credentials for
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SsoProviderConfig {
    pub(crate) account_id: String,
    pub(crate) role_name: String,
    pub(crate) start_url: String,
    pub(crate) region: Region,
    pub(crate) session_name: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http_client::test_util::{
        failing_client_fn, infallible_client_fn, ReplayEvent, StaticReplayClient,
    };
    use crate::http_client::ConnectorError;
    use aws_credential_types::time_source::StaticTimeSource;
    use std::collections::HashMap;
    use std::time::SystemTime;

    const START_URL: &str = "https://d-abc123.awsapps.com/start";

    fn legacy_cache_file() -> String {
        use sha1::Digest;
        format!(
            "/home/user/.aws/sso/cache/{}.json",
            hex::encode(sha1::Sha1::digest(START_URL.as_bytes()))
        )
    }

    fn config(cached_token: Option<&str>, now: u64) -> ProviderConfig {
        let mut files = HashMap::new();
        if let Some(token) = cached_token {
            files.insert(legacy_cache_file(), token.as_bytes().to_vec());
        }
        ProviderConfig::no_configuration()
            .with_env(Env::from_slice(&[("HOME", "/home/user")]))
            .with_fs(Fs::from_map(files))
            .with_time_source(StaticTimeSource::from_secs(now))
    }

    fn provider(config: &ProviderConfig) -> SsoCredentialsProvider {
        SsoCredentialsProvider::builder()
            .configure(config)
            .account_id("012345678901")
            .role_name("SampleRole")
            .start_url(START_URL)
            .region(Region::from_static("us-east-1"))
            .build()
    }

    const VALID_TOKEN: &str =
        r#"{"accessToken": "a-token", "expiresAt": "2021-12-25T21:30:00Z", "startUrl": "https://d-abc123.awsapps.com/start"}"#;

    fn credentials_response(body: &'static str) -> http::Response<&'static str> {
        http::Response::builder().status(200).body(body).unwrap()
    }

    #[tokio::test]
    async fn legacy_token_is_exchanged_for_role_credentials() {
        let http_client = StaticReplayClient::new(vec![ReplayEvent::new(
            http::Request::builder()
                .uri("https://portal.sso.us-east-1.amazonaws.com/federation/credentials?account_id=012345678901&role_name=SampleRole")
                .header("x-amz-sso_bearer_token", "a-token")
                .body("")
                .unwrap(),
            credentials_response(
                r#"{"roleCredentials":{"accessKeyId":"ASIARTESTID","secretAccessKey":"TESTSECRETKEY","sessionToken":"TESTSESSIONTOKEN","expiration":1651516560000}}"#,
            ),
        )]);
        let config = config(Some(VALID_TOKEN), 1_640_000_000).with_http_client(http_client.clone());
        let credentials = provider(&config)
            .provide_credentials()
            .await
            .expect("success");
        assert_eq!("ASIARTESTID", credentials.access_key_id());
        assert_eq!("TESTSECRETKEY", credentials.secret_access_key());
        assert_eq!(Some("TESTSESSIONTOKEN"), credentials.session_token());
        assert_eq!(
            Some(UNIX_EPOCH + Duration::from_secs(1651516560)),
            credentials.expiry()
        );
        assert_eq!("SSO", credentials.provider_name());
        http_client.assert_requests_match(&[]);
    }

    #[tokio::test]
    async fn expired_legacy_token_fails_without_a_network_call() {
        let http_client = StaticReplayClient::new(vec![]);
        let config = config(Some(VALID_TOKEN), 1_640_467_801).with_http_client(http_client.clone());
        let err = provider(&config)
            .provide_credentials()
            .await
            .expect_err("expired");
        assert!(
            matches!(err, CredentialsError::InvalidConfiguration(_)),
            "{err:?}"
        );
        assert!(http_client.actual_requests().is_empty());
    }

    #[tokio::test]
    async fn missing_cache_file_fails_without_a_network_call() {
        let http_client = StaticReplayClient::new(vec![]);
        let config = config(None, 1_640_000_000).with_http_client(http_client.clone());
        let err = provider(&config)
            .provide_credentials()
            .await
            .expect_err("no token");
        assert!(
            matches!(err, CredentialsError::InvalidConfiguration(_)),
            "{err:?}"
        );
        assert!(http_client.actual_requests().is_empty());
    }

    #[tokio::test]
    async fn missing_session_token_is_allowed() {
        let config = config(Some(VALID_TOKEN), 1_640_000_000).with_http_client(
            infallible_client_fn(|_| {
                credentials_response(
                    r#"{"roleCredentials":{"accessKeyId":"ASIARTESTID","secretAccessKey":"TESTSECRETKEY","expiration":1651516560000}}"#,
                )
            }),
        );
        let credentials = provider(&config)
            .provide_credentials()
            .await
            .expect("success");
        assert_eq!(None, credentials.session_token());
    }

    #[tokio::test]
    async fn missing_role_credentials_is_a_protocol_violation() {
        let config = config(Some(VALID_TOKEN), 1_640_000_000)
            .with_http_client(infallible_client_fn(|_| credentials_response("{}")));
        let err = provider(&config)
            .provide_credentials()
            .await
            .expect_err("no role credentials");
        assert!(
            matches!(err, CredentialsError::ProtocolViolation(_)),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn missing_secret_key_is_a_protocol_violation() {
        let config = config(Some(VALID_TOKEN), 1_640_000_000).with_http_client(
            infallible_client_fn(|_| {
                credentials_response(r#"{"roleCredentials":{"accessKeyId":"ASIARTESTID"}}"#)
            }),
        );
        let err = provider(&config)
            .provide_credentials()
            .await
            .expect_err("no secret");
        assert!(
            matches!(err, CredentialsError::ProtocolViolation(_)),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn error_status_is_a_provider_error() {
        let config = config(Some(VALID_TOKEN), 1_640_000_000).with_http_client(
            infallible_client_fn(|_| {
                http::Response::builder()
                    .status(401)
                    .body(r#"{"message":"Session token not found or invalid"}"#)
                    .unwrap()
            }),
        );
        let err = provider(&config)
            .provide_credentials()
            .await
            .expect_err("unauthorized");
        assert!(matches!(err, CredentialsError::ProviderError(_)), "{err:?}");
        let message = aws_credential_types::provider::error::DisplayErrorContext(&err).to_string();
        assert!(message.contains("401"), "{message}");
        assert!(message.contains("Session token not found"), "{message}");
    }

    #[tokio::test]
    async fn transport_failure_is_not_loaded() {
        let config = config(Some(VALID_TOKEN), 1_640_000_000).with_http_client(
            failing_client_fn(|| ConnectorError::io("connection refused")),
        );
        let err = provider(&config)
            .provide_credentials()
            .await
            .expect_err("transport failure");
        assert!(
            matches!(err, CredentialsError::CredentialsNotLoaded(_)),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn session_flow_uses_the_session_cache_key() {
        use sha1::Digest;
        let session_file = format!(
            "/home/user/.aws/sso/cache/{}.json",
            hex::encode(sha1::Sha1::digest(b"my-sso-session"))
        );
        let config = ProviderConfig::no_configuration()
            .with_env(Env::from_slice(&[("HOME", "/home/user")]))
            .with_fs(Fs::from_map(HashMap::from([(
                session_file,
                br#"{"accessToken": "session-token", "expiresAt": "2021-12-25T21:30:00Z"}"#.to_vec(),
            )])))
            .with_time_source(StaticTimeSource::new(
                SystemTime::UNIX_EPOCH + Duration::from_secs(1_640_000_000),
            ))
            .with_http_client(infallible_client_fn(|req| {
                assert_eq!(
                    Some("session-token"),
                    req.headers()
                        .get("x-amz-sso_bearer_token")
                        .and_then(|value| value.to_str().ok())
                );
                credentials_response(
                    r#"{"roleCredentials":{"accessKeyId":"ASIARTESTID","secretAccessKey":"TESTSECRETKEY","sessionToken":"TOKEN","expiration":1651516560000}}"#,
                )
            }));
        let provider = SsoCredentialsProvider::builder()
            .configure(&config)
            .account_id("012345678901")
            .role_name("SampleRole")
            .start_url(START_URL)
            .session_name("my-sso-session")
            .region(Region::from_static("us-east-1"))
            .build();
        let credentials = provider.provide_credentials().await.expect("success");
        assert_eq!("ASIARTESTID", credentials.access_key_id());
        // closing twice is harmless
        provider.close();
        provider.close();
    }

    #[test]
    fn query_values_are_encoded() {
        let config = SsoProviderConfig {
            account_id: "012345678901".into(),
            role_name: "Role With Spaces+Plus".into(),
            start_url: START_URL.into(),
            region: Region::from_static("eu-west-1"),
            session_name: None,
        };
        let request = get_role_credentials_request(&config, "token").expect("valid");
        assert_eq!(
            "https://portal.sso.eu-west-1.amazonaws.com/federation/credentials?account_id=012345678901&role_name=Role%20With%20Spaces%2BPlus",
            request.uri().to_string()
        );
    }
}
