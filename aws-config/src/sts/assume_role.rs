/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Assume credentials for a role through the AWS Security Token Service (STS).

use crate::provider_config::ProviderConfig;
use crate::sts::{default_session_name, AssumeRole, StsClient};
use aws_credential_types::provider::{self, future, ProvideCredentials, SharedCredentialsProvider};
use aws_types::region::Region;
use std::time::Duration;
use tracing::Instrument;

/// Credentials provider that uses credentials provided by another provider to assume a role
/// through the AWS Security Token Service (STS).
///
/// When asked to provide credentials, this provider will first invoke the inner credentials
/// provider to get AWS credentials for STS. Then, it will call STS to get assumed credentials for
/// the desired role.
///
/// # Examples
/// ```no_run
/// use aws_credential_types::Credentials;
/// use aws_config::sts::AssumeRoleProvider;
/// use aws_types::region::Region;
///
/// let provider = AssumeRoleProvider::builder("arn:aws:iam::123456789012:role/demo")
///   .region(Region::from_static("us-east-2"))
///   .session_name("testAR")
///   .build(Credentials::from_keys("akid", "secret", None));
/// ```
#[derive(Debug)]
pub struct AssumeRoleProvider {
    client: StsClient,
    request: AssumeRole,
    source: SharedCredentialsProvider,
}

impl AssumeRoleProvider {
    /// Build a new role-assuming provider for the given role.
    ///
    /// The `role` argument should take the form an Amazon Resource Name (ARN) like
    ///
    /// ```text
    /// arn:aws:iam::123456789012:role/example
    /// ```
    pub fn builder(role: impl Into<String>) -> AssumeRoleProviderBuilder {
        AssumeRoleProviderBuilder::new(role.into())
    }

    async fn credentials(&self) -> provider::Result {
        let source = self.source.provide_credentials().await?;
        tracing::debug!("retrieving assumed credentials");
        let assumed = self.client.assume_role(&self.request, &source).await;
        match &assumed {
            Ok(creds) => {
                tracing::debug!(access_key_id = ?creds.access_key_id(), "obtained assumed credentials")
            }
            Err(err) => tracing::warn!(error = %err, "failed to assume role"),
        }
        assumed
    }
}

impl ProvideCredentials for AssumeRoleProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials().instrument(tracing::debug_span!(
            "assume_role",
            role_arn = %self.request.role_arn,
            session_name = %self.request.session_name,
        )))
    }

    fn close(&self) {
        self.source.close();
    }
}

/// A builder for [`AssumeRoleProvider`].
///
/// Construct one through [`AssumeRoleProvider::builder`].
#[derive(Debug)]
pub struct AssumeRoleProviderBuilder {
    role_arn: String,
    external_id: Option<String>,
    session_name: Option<String>,
    session_length: Option<Duration>,
    region: Option<Region>,
    config: Option<ProviderConfig>,
}

impl AssumeRoleProviderBuilder {
    /// Start a new assume role builder for the given role.
    ///
    /// The `role` argument should take the form an Amazon Resource Name (ARN) like
    ///
    /// ```text
    /// arn:aws:iam::123456789012:role/example
    /// ```
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role_arn: role.into(),
            external_id: None,
            session_name: None,
            session_length: None,
            region: None,
            config: None,
        }
    }

    /// Set a unique identifier that might be required when you assume a role in another account.
    ///
    /// If the administrator of the account to which the role belongs provided you with an
    /// external ID, then provide that value in this parameter. The value can be any string, such
    /// as a passphrase or account number.
    pub fn external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Set an identifier for the assumed role session.
    ///
    /// Use the role session name to uniquely identify a session when the same role is assumed by
    /// different principals or for different reasons. When unset, the session name is
    /// `aws-config-` followed by the current time in milliseconds.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// Set the expiration time of the role session.
    ///
    /// When unset, STS uses its default of one hour. Durations are truncated to whole seconds.
    pub fn session_length(mut self, length: Duration) -> Self {
        self.session_length = Some(length);
        self
    }

    /// Set the region used to call STS
    ///
    /// When unset, the region from the [`ProviderConfig`] is used, falling back to `us-east-1`.
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Set the [`ProviderConfig`] used for the HTTP client, time source, and default region
    pub fn configure(mut self, conf: &ProviderConfig) -> Self {
        self.config = Some(conf.clone());
        self
    }

    /// Build a credentials provider for this role, authorized by the given `provider`.
    pub fn build(self, provider: impl ProvideCredentials + 'static) -> AssumeRoleProvider {
        self.build_from_provider(SharedCredentialsProvider::new(provider))
    }

    /// Build a credentials provider for this role, authorized by an already shared `provider`.
    pub fn build_from_provider(self, provider: SharedCredentialsProvider) -> AssumeRoleProvider {
        let config = self.config.unwrap_or_default();
        let client = config.sts_client(self.region);
        let session_name = self
            .session_name
            .unwrap_or_else(|| default_session_name(client.time_source().now()));
        AssumeRoleProvider {
            client,
            request: AssumeRole {
                role_arn: self.role_arn,
                session_name,
                external_id: self.external_id,
                duration: self.session_length,
            },
            source: provider,
        }
    }
}
