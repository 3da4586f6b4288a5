/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! IMDSv2 Credentials Provider
//!
//! # Important
//! This credential provider will NOT fallback to IMDSv1. Ensure that IMDSv2 is enabled on your instances.

use crate::imds::client::{Client, ImdsError};
use crate::imds::env;
use crate::json_credentials::{parse_json_credentials, JsonCredentials, RefreshableCredentials};
use crate::provider_config::ProviderConfig;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{self, future, ProvideCredentials};
use aws_credential_types::Credentials;
use aws_types::os_shim_internal::Env;
use http::StatusCode;
use std::fmt;
use tracing::Instrument;

const CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";
const PROVIDER_NAME: &str = "IMDSv2";

/// IMDSv2 Credentials Provider
///
/// _Note: This credentials provider will NOT fallback to the IMDSv1 flow._
#[derive(Debug)]
pub struct ImdsCredentialsProvider {
    client: Client,
    env: Env,
    profile: Option<String>,
}

impl ImdsCredentialsProvider {
    /// Builder for [`ImdsCredentialsProvider`]
    pub fn builder() -> Builder {
        Builder::default()
    }

    fn imds_disabled(&self) -> bool {
        match self.env.get(env::EC2_METADATA_DISABLED) {
            Ok(value) => value.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Retrieve the instance profile from IMDS
    async fn get_profile_uncached(&self) -> Result<String, CredentialsError> {
        let profile = self
            .client
            .get(CREDENTIALS_PATH)
            .await
            .map_err(|err| imds_error(err, "no IAM role is attached to this instance"))?;
        // IMDS lists one role per line; an instance profile carries at most one
        match profile.lines().next().map(str::trim) {
            Some(profile) if !profile.is_empty() => Ok(profile.to_string()),
            _ => Err(CredentialsError::not_loaded(
                "IMDS did not return an instance profile",
            )),
        }
    }

    async fn credentials(&self) -> provider::Result {
        if self.imds_disabled() {
            tracing::debug!("IMDS disabled because $AWS_EC2_METADATA_DISABLED was set to `true`");
            return Err(CredentialsError::not_loaded(
                "IMDS disabled by $AWS_EC2_METADATA_DISABLED",
            ));
        }
        tracing::debug!("loading credentials from IMDS");
        let profile = match &self.profile {
            Some(profile) => profile.clone(),
            None => self.get_profile_uncached().await?,
        };
        tracing::debug!(profile = %profile, "loaded profile");
        let credentials = self
            .client
            .get(&format!("{CREDENTIALS_PATH}{profile}"))
            .await
            .map_err(|err| imds_error(err, "the instance profile has no credentials"))?;
        match parse_json_credentials(&credentials) {
            Ok(JsonCredentials::RefreshableCredentials(RefreshableCredentials {
                access_key_id,
                secret_access_key,
                session_token,
                account_id,
                expiration,
            })) => {
                let mut builder = Credentials::builder()
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .session_token(session_token)
                    .expiry(expiration)
                    .provider_name(PROVIDER_NAME);
                builder.set_account_id(account_id.map(String::from));
                Ok(builder.build())
            }
            Ok(JsonCredentials::Error { code, message }) => {
                Err(CredentialsError::provider_error(format!(
                    "Error retrieving credentials from IMDS: {code} {message}"
                )))
            }
            Err(invalid) => Err(CredentialsError::unhandled(invalid)),
        }
    }
}

impl ProvideCredentials for ImdsCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.credentials()
                .instrument(tracing::debug_span!("imds_load_credentials")),
        )
    }

    fn close(&self) {
        self.client.clear_token();
    }
}

#[derive(Debug)]
struct NotAvailable {
    reason: &'static str,
    source: ImdsError,
}

impl fmt::Display for NotAvailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "credentials are not available from IMDS: {}", self.reason)
    }
}

impl std::error::Error for NotAvailable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

fn imds_error(err: ImdsError, not_found: &'static str) -> CredentialsError {
    if err.is_invalid_endpoint() {
        return CredentialsError::invalid_configuration(err);
    }
    if err.status() == Some(StatusCode::NOT_FOUND) {
        return CredentialsError::not_loaded(NotAvailable {
            reason: not_found,
            source: err,
        });
    }
    // a failed or forbidden token request means we are not on EC2 or IMDS is turned off
    if err.is_unreachable() || (err.is_token_error() && err.status() == Some(StatusCode::FORBIDDEN))
    {
        return CredentialsError::not_loaded(NotAvailable {
            reason: "IMDS could not be reached",
            source: err,
        });
    }
    CredentialsError::provider_error(err)
}

/// Builder for [`ImdsCredentialsProvider`]
#[derive(Default, Debug)]
pub struct Builder {
    provider_config: Option<ProviderConfig>,
    profile_override: Option<String>,
    imds_override: Option<Client>,
}

impl Builder {
    /// Override the configuration used for this provider
    pub fn configure(mut self, configuration: &ProviderConfig) -> Self {
        self.provider_config = Some(configuration.clone());
        self
    }

    /// Override the IMDS client used for this provider
    ///
    /// When unset, the default IMDS client will be used.
    pub fn imds_client(mut self, client: Client) -> Self {
        self.imds_override = Some(client);
        self
    }

    /// Override the profile that will be loaded from IMDS
    ///
    /// When unset, the profile will be loaded from
    /// `http://169.254.169.254/latest/meta-data/iam/security-credentials/`
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile_override = Some(profile.into());
        self
    }

    /// Create an [`ImdsCredentialsProvider`] from this builder
    pub fn build(self) -> ImdsCredentialsProvider {
        let env = self
            .provider_config
            .as_ref()
            .map(|configuration| configuration.env())
            .unwrap_or_default();
        let client = self.imds_override.unwrap_or_else(|| {
            Client::builder()
                .configure(&self.provider_config.unwrap_or_default())
                .build()
        });
        ImdsCredentialsProvider {
            client,
            env,
            profile: self.profile_override,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http_client::test_util::{NeverClient, ReplayEvent, StaticReplayClient};
    use crate::imds::client::test::{
        imds_request, imds_response, make_client, token_request, token_response,
    };
    use aws_credential_types::time_source::TestingTimeSource;
    use std::time::{Duration, UNIX_EPOCH};

    const TOKEN_A: &str = "token_a";

    fn time_source() -> TestingTimeSource {
        TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(1_632_197_146))
    }

    const CREDENTIALS_RESPONSE: &str = "{\n  \"Code\" : \"Success\",\n  \"LastUpdated\" : \"2021-09-20T21:42:26Z\",\n  \"Type\" : \"AWS-HMAC\",\n  \"AccessKeyId\" : \"ASIARTEST\",\n  \"SecretAccessKey\" : \"testsecret\",\n  \"Token\" : \"testtoken\",\n  \"Expiration\" : \"2021-09-21T04:16:53Z\"\n}";

    #[tokio::test]
    async fn profile_is_not_cached() {
        let http_client = StaticReplayClient::new(vec![
            ReplayEvent::new(
                token_request("http://169.254.169.254", 21600),
                token_response(21600, TOKEN_A),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/", TOKEN_A),
                imds_response(r#"profile-name"#),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/profile-name", TOKEN_A),
                imds_response(CREDENTIALS_RESPONSE),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/", TOKEN_A),
                imds_response(r#"different-profile"#),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/different-profile", TOKEN_A),
                imds_response(CREDENTIALS_RESPONSE),
            ),
        ]);
        let client = ImdsCredentialsProvider::builder()
            .imds_client(make_client(http_client.clone(), time_source()))
            .configure(&ProviderConfig::no_configuration())
            .build();
        let creds1 = client.provide_credentials().await.expect("valid creds");
        let creds2 = client.provide_credentials().await.expect("valid creds");
        assert_eq!(creds1.access_key_id(), "ASIARTEST");
        assert_eq!(creds1.session_token(), Some("testtoken"));
        assert_eq!(creds1.provider_name(), "IMDSv2");
        assert_eq!(
            creds1.expiry(),
            Some(UNIX_EPOCH + Duration::from_secs(1_632_197_813))
        );
        assert_eq!(creds1.access_key_id(), creds2.access_key_id());
        http_client.assert_requests_match(&[]);
    }

    #[tokio::test]
    async fn profile_override_skips_profile_lookup() {
        let http_client = StaticReplayClient::new(vec![
            ReplayEvent::new(
                token_request("http://169.254.169.254", 21600),
                token_response(21600, TOKEN_A),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/my-role", TOKEN_A),
                imds_response(CREDENTIALS_RESPONSE),
            ),
        ]);
        let provider = ImdsCredentialsProvider::builder()
            .imds_client(make_client(http_client.clone(), time_source()))
            .profile("my-role")
            .build();
        provider.provide_credentials().await.expect("valid creds");
        http_client.assert_requests_match(&[]);
    }

    #[tokio::test]
    async fn close_drops_the_session_token() {
        let http_client = StaticReplayClient::new(vec![
            ReplayEvent::new(
                token_request("http://169.254.169.254", 21600),
                token_response(21600, TOKEN_A),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/my-role", TOKEN_A),
                imds_response(CREDENTIALS_RESPONSE),
            ),
            ReplayEvent::new(
                token_request("http://169.254.169.254", 21600),
                token_response(21600, "token_b"),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/my-role", "token_b"),
                imds_response(CREDENTIALS_RESPONSE),
            ),
        ]);
        let provider = ImdsCredentialsProvider::builder()
            .imds_client(make_client(http_client.clone(), time_source()))
            .profile("my-role")
            .build();
        provider.provide_credentials().await.expect("valid creds");
        provider.close();
        provider.provide_credentials().await.expect("valid creds");
        http_client.assert_requests_match(&[]);
    }

    #[tokio::test]
    async fn no_role_is_not_loaded() {
        let http_client = StaticReplayClient::new(vec![
            ReplayEvent::new(
                token_request("http://169.254.169.254", 21600),
                token_response(21600, TOKEN_A),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/", TOKEN_A),
                http::Response::builder().status(404).body("").unwrap(),
            ),
        ]);
        let provider = ImdsCredentialsProvider::builder()
            .imds_client(make_client(http_client.clone(), time_source()))
            .build();
        let err = provider.provide_credentials().await.expect_err("no role");
        assert!(
            matches!(err, CredentialsError::CredentialsNotLoaded(_)),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn server_error_is_a_provider_error() {
        let http_client = StaticReplayClient::new(vec![
            ReplayEvent::new(
                token_request("http://169.254.169.254", 21600),
                token_response(21600, TOKEN_A),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/", TOKEN_A),
                http::Response::builder().status(500).body("").unwrap(),
            ),
        ]);
        let provider = ImdsCredentialsProvider::builder()
            .imds_client(make_client(http_client.clone(), time_source()))
            .build();
        let err = provider.provide_credentials().await.expect_err("500");
        assert!(matches!(err, CredentialsError::ProviderError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn error_document_is_a_provider_error() {
        let http_client = StaticReplayClient::new(vec![
            ReplayEvent::new(
                token_request("http://169.254.169.254", 21600),
                token_response(21600, TOKEN_A),
            ),
            ReplayEvent::new(
                imds_request("http://169.254.169.254/latest/meta-data/iam/security-credentials/my-role", TOKEN_A),
                imds_response(r#"{"Code": "AssumeRoleUnauthorizedAccess", "Message": "denied"}"#),
            ),
        ]);
        let provider = ImdsCredentialsProvider::builder()
            .imds_client(make_client(http_client.clone(), time_source()))
            .profile("my-role")
            .build();
        let err = provider.provide_credentials().await.expect_err("error document");
        assert!(matches!(err, CredentialsError::ProviderError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn disabled_by_env() {
        let http_client = NeverClient::new();
        let config = ProviderConfig::no_configuration()
            .with_env(Env::from_slice(&[("AWS_EC2_METADATA_DISABLED", "TRUE")]))
            .with_http_client(http_client.clone());
        let provider = ImdsCredentialsProvider::builder().configure(&config).build();
        let err = provider.provide_credentials().await.expect_err("disabled");
        assert!(
            matches!(err, CredentialsError::CredentialsNotLoaded(_)),
            "{err:?}"
        );
        assert_eq!(0, http_client.num_calls());
    }
}
