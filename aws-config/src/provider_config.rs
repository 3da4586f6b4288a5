/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Configuration Options for Credential Providers

use crate::http_client::{default_http_client, SharedHttpClient};
use aws_credential_types::rt::sleep::{default_async_sleep, AsyncSleep, SharedAsyncSleep};
use aws_credential_types::time_source::{SharedTimeSource, TimeSource};
use aws_types::os_shim_internal::{Env, Fs};
use aws_types::region::Region;
use std::fmt::{Debug, Formatter};

/// Configuration options for Credential Providers
///
/// Most credential providers builders offer a `configure` method which applies general provider
/// configuration options.
///
/// To use a region from the default region provider chain use [`ProviderConfig::with_region`];
/// region resolution itself is out of scope for these providers.
#[derive(Clone)]
pub struct ProviderConfig {
    env: Env,
    fs: Fs,
    time_source: SharedTimeSource,
    http_client: Option<SharedHttpClient>,
    sleep: Option<SharedAsyncSleep>,
    region: Option<Region>,
}

impl Debug for ProviderConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("env", &self.env)
            .field("fs", &self.fs)
            .field("time_source", &self.time_source)
            .field("http_client", &self.http_client)
            .field("sleep", &self.sleep)
            .field("region", &self.region)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            env: Env::default(),
            fs: Fs::default(),
            time_source: SharedTimeSource::default(),
            http_client: default_http_client(),
            sleep: default_async_sleep(),
            region: None,
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl ProviderConfig {
    /// ProviderConfig with all configuration removed
    ///
    /// Unlike [`ProviderConfig::empty`] where `env` and `fs` will use their non-mocked implementations,
    /// this method will use an empty mock environment and an empty mock file system.
    pub fn no_configuration() -> Self {
        use std::collections::HashMap;
        Self {
            env: Env::from_slice(&[]),
            fs: Fs::from_raw_map(HashMap::new()),
            time_source: SharedTimeSource::default(),
            http_client: None,
            sleep: None,
            region: None,
        }
    }
}

impl ProviderConfig {
    /// Create a default provider config with the region unset.
    ///
    /// Using this option means that you may need to set a region manually.
    ///
    /// This constructor will use a default value for the HTTPS client (when the `rustls` feature is
    /// enabled) and for the sleep implementation (when the `rt-tokio` feature is enabled).
    ///
    /// # Examples
    /// ```no_run
    /// # #[cfg(feature = "rustls")]
    /// # fn example() {
    /// use aws_config::provider_config::ProviderConfig;
    /// use aws_types::region::Region;
    /// use aws_config::sso::SsoCredentialsProvider;
    /// let conf = ProviderConfig::without_region().with_region(Some(Region::new("us-east-1")));
    ///
    /// let credential_provider = SsoCredentialsProvider::builder()
    ///     .configure(&conf)
    ///     .account_id("012345678901")
    ///     .role_name("SampleRole")
    ///     .start_url("https://d-abc123.awsapps.com/start")
    ///     .region(Region::new("us-east-1"))
    ///     .build();
    /// # }
    /// ```
    pub fn without_region() -> Self {
        Self::default()
    }

    /// Constructs a ProviderConfig with no fields set
    pub fn empty() -> Self {
        ProviderConfig {
            env: Env::default(),
            fs: Fs::default(),
            time_source: SharedTimeSource::default(),
            http_client: None,
            sleep: None,
            region: None,
        }
    }

    pub(crate) fn env(&self) -> Env {
        self.env.clone()
    }

    pub(crate) fn fs(&self) -> Fs {
        self.fs.clone()
    }

    pub(crate) fn time_source(&self) -> SharedTimeSource {
        self.time_source.clone()
    }

    pub(crate) fn http_client(&self) -> Option<SharedHttpClient> {
        self.http_client.clone()
    }

    pub(crate) fn sleep(&self) -> Option<SharedAsyncSleep> {
        self.sleep.clone()
    }

    pub(crate) fn region(&self) -> Option<Region> {
        self.region.clone()
    }

    /// Override the region for the configuration
    pub fn with_region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    /// Override the file system used by providers, for example `~/.aws/config` and the SSO cache
    pub fn with_fs(self, fs: Fs) -> Self {
        ProviderConfig { fs, ..self }
    }

    /// Override the environment variables seen by providers
    pub fn with_env(self, env: Env) -> Self {
        ProviderConfig { env, ..self }
    }

    /// Override the time source used for expiry checks
    pub fn with_time_source(self, time_source: impl TimeSource + 'static) -> Self {
        ProviderConfig {
            time_source: SharedTimeSource::new(time_source),
            ..self
        }
    }

    /// Override the HTTPS client used by providers that make network calls
    pub fn with_http_client(self, http_client: impl Into<SharedHttpClient>) -> Self {
        ProviderConfig {
            http_client: Some(http_client.into()),
            ..self
        }
    }

    /// Override the sleep implementation for this configuration
    pub fn with_sleep(self, sleep: impl AsyncSleep + 'static) -> Self {
        ProviderConfig {
            sleep: Some(SharedAsyncSleep::new(sleep)),
            ..self
        }
    }
}
