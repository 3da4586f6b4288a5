/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::ecs::EcsCredentialsProvider;
use crate::environment::credentials::EnvironmentVariableCredentialsProvider;
use crate::imds::credentials::ImdsCredentialsProvider;
use crate::meta::credentials::CredentialsProviderChain;
use crate::profile::credentials as profile;
use crate::provider_config::ProviderConfig;
use aws_credential_types::cache::{self, LazyCachingCredentialsProvider};
use aws_credential_types::provider::{future, ProvideCredentials};
use aws_types::region::Region;
use std::borrow::Cow;
use std::time::Duration;

/// Default AWS credentials provider chain with no overrides
///
/// Equivalent to `DefaultCredentialsChain::builder().build()`.
pub fn default_provider() -> DefaultCredentialsChain {
    DefaultCredentialsChain::builder().build()
}

/// Default AWS credentials provider chain
///
/// Resolution order:
/// 1. Environment variables: [`EnvironmentVariableCredentialsProvider`]
/// 2. Shared config (`~/.aws/config`, `~/.aws/credentials`): [`ProfileFileCredentialsProvider`](crate::profile::ProfileFileCredentialsProvider)
/// 3. [ECS (IAM Roles for Tasks)](crate::ecs)
/// 4. [EC2 IMDSv2](crate::imds)
///
/// The outer provider is wrapped in a refreshing cache: at most one refresh is in flight at a
/// time, and failures are never hidden behind expired credentials.
///
/// More providers are a work in progress.
///
/// # Examples
/// Create a default chain with a custom region:
/// ```no_run
/// use aws_types::region::Region;
/// use aws_config::default_provider::credentials::DefaultCredentialsChain;
/// let credentials_provider = DefaultCredentialsChain::builder()
///     .region(Region::new("us-west-1"))
///     .build();
/// ```
///
/// Create a default chain with no overrides:
/// ```no_run
/// use aws_config::default_provider::credentials::DefaultCredentialsChain;
/// let credentials_provider = DefaultCredentialsChain::builder().build();
/// ```
#[derive(Debug)]
pub struct DefaultCredentialsChain {
    provider_chain: LazyCachingCredentialsProvider,
}

impl DefaultCredentialsChain {
    /// Builder for `DefaultCredentialsChain`
    pub fn builder() -> Builder {
        Builder::default()
    }

    async fn credentials(&self) -> aws_credential_types::provider::Result {
        self.provider_chain.provide_credentials().await
    }
}

impl ProvideCredentials for DefaultCredentialsChain {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }

    fn close(&self) {
        self.provider_chain.close();
    }
}

/// Builder for [`DefaultCredentialsChain`]
#[derive(Debug, Default)]
pub struct Builder {
    profile_file_builder: profile::Builder,
    credential_cache: cache::builder::Builder,
    region_override: Option<Region>,
    conf: Option<ProviderConfig>,
}

impl Builder {
    /// Sets the region used when making requests to AWS services
    ///
    /// When unset, the region of the [`ProviderConfig`] is used, falling back to the `region` of
    /// the selected profile.
    pub fn region(mut self, region: impl Into<Option<Region>>) -> Self {
        self.set_region(region);
        self
    }

    /// Sets the region used when making requests to AWS services
    pub fn set_region(&mut self, region: impl Into<Option<Region>>) -> &mut Self {
        self.region_override = region.into();
        self
    }

    /// Add an additional credential source for the ProfileProvider
    ///
    /// Assume role profiles may specify named credential sources:
    /// ```ini
    /// [default]
    /// role_arn = arn:aws:iam::123456789:role/RoleA
    /// credential_source = MyCustomProvider
    /// ```
    ///
    /// Typically, these are built-in providers like `Environment`, however, custom sources must
    /// be registered:
    /// ```no_run
    /// use aws_config::default_provider::credentials::DefaultCredentialsChain;
    /// use aws_credential_types::Credentials;
    ///
    /// // assume role can now use `MyCustomProvider`
    /// let provider_chain = DefaultCredentialsChain::builder()
    ///     .with_custom_credential_source("MyCustomProvider", Credentials::from_keys("AKID", "SECRET", None))
    ///     .build();
    /// ```
    pub fn with_custom_credential_source(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.profile_file_builder = self
            .profile_file_builder
            .with_custom_provider(name, provider);
        self
    }

    /// Override the profile name used by this provider
    pub fn profile_name(mut self, name: &str) -> Self {
        self.profile_file_builder = self.profile_file_builder.profile_name(name);
        self
    }

    /// Timeout for the entire credential loading chain.
    ///
    /// Defaults to 5 seconds.
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.credential_cache = self.credential_cache.load_timeout(timeout);
        self
    }

    /// Amount of time before the actual credential expiration time where credentials are
    /// considered expired.
    ///
    /// Defaults to 5 minutes.
    pub fn buffer_time(mut self, buffer_time: Duration) -> Self {
        self.credential_cache = self.credential_cache.buffer_time(buffer_time);
        self
    }

    /// Default expiration time to set on credentials if they don't have an expiration time.
    ///
    /// Must be at least 15 minutes, the default.
    pub fn default_credential_expiration(mut self, duration: Duration) -> Self {
        self.credential_cache = self.credential_cache.default_credential_expiration(duration);
        self
    }

    /// Override the configuration used for this provider
    pub fn configure(mut self, config: ProviderConfig) -> Self {
        self.conf = Some(config);
        self
    }

    /// Creates a `DefaultCredentialsChain`
    ///
    /// ## Panics
    /// This function will panic if no connector has been set or the `rustls`
    /// feature has been disabled, or if no sleep implementation is available.
    pub fn build(self) -> DefaultCredentialsChain {
        let conf = self.conf.unwrap_or_default();
        let conf = match self.region_override {
            Some(region) => conf.with_region(Some(region)),
            None => conf,
        };

        let env_provider = EnvironmentVariableCredentialsProvider::new_with_env(conf.env());
        let profile_provider = self.profile_file_builder.configure(&conf).build();
        let ecs_provider = EcsCredentialsProvider::builder().configure(&conf).build();
        let imds_provider = ImdsCredentialsProvider::builder().configure(&conf).build();

        let provider_chain = CredentialsProviderChain::first_try("Environment", env_provider)
            .or_else("Profile", profile_provider)
            .or_else("EcsContainer", ecs_provider)
            .or_else("Ec2InstanceMetadata", imds_provider);

        let mut credential_cache = self
            .credential_cache
            .load(provider_chain)
            .time_source(conf.time_source());
        if let Some(sleep) = conf.sleep() {
            credential_cache = credential_cache.sleep(sleep);
        }

        DefaultCredentialsChain {
            provider_chain: credential_cache.build(),
        }
    }
}
