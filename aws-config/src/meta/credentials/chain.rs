/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::default_provider::credentials::DefaultCredentialsChain;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{self, future, ProvideCredentials};
use std::borrow::Cow;
use tracing::Instrument;

/// Credentials provider that checks a series of inner providers
///
/// Each provider will be evaluated in order:
/// * If a provider returns valid [`Credentials`](aws_credential_types::Credentials) they will be
///   returned immediately. No other credential providers will be used.
/// * Otherwise, the error is recorded and the next provider is checked.
///
/// If every provider fails, [`CredentialsError::ChainExhausted`] is returned with each provider's
/// name and error. The chain does not cache; wrap it in a
/// [`LazyCachingCredentialsProvider`](aws_credential_types::cache::LazyCachingCredentialsProvider)
/// for that.
///
/// ## Example
/// ```no_run
/// use aws_config::meta::credentials::CredentialsProviderChain;
/// use aws_config::environment::credentials::EnvironmentVariableCredentialsProvider;
/// use aws_config::profile::ProfileFileCredentialsProvider;
///
/// let provider = CredentialsProviderChain::first_try("Environment", EnvironmentVariableCredentialsProvider::new())
///     .or_else("Profile", ProfileFileCredentialsProvider::builder().build());
/// ```
#[derive(Debug)]
pub struct CredentialsProviderChain {
    providers: Vec<(Cow<'static, str>, Box<dyn ProvideCredentials>)>,
}

impl CredentialsProviderChain {
    /// Create a `ProviderChain` that begins by evaluating this provider
    pub fn first_try(
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        CredentialsProviderChain {
            providers: vec![(name.into(), Box::new(provider))],
        }
    }

    /// Add a fallback provider to the credentials provider chain
    pub fn or_else(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.providers.push((name.into(), Box::new(provider)));
        self
    }

    /// Add a fallback to the default provider chain
    pub fn or_default_provider(self) -> Self {
        self.or_else(
            "DefaultProviderChain",
            DefaultCredentialsChain::builder().build(),
        )
    }

    async fn credentials(&self) -> provider::Result {
        let mut causes = Vec::with_capacity(self.providers.len());
        for (name, provider) in &self.providers {
            let span = tracing::debug_span!("load_credentials", provider = %name);
            match provider.provide_credentials().instrument(span).await {
                Ok(credentials) => {
                    tracing::debug!(provider = %name, "loaded credentials");
                    return Ok(credentials);
                }
                Err(err @ CredentialsError::CredentialsNotLoaded(_)) => {
                    tracing::debug!(provider = %name, context = %provider::error::DisplayErrorContext(&err), "provider in chain did not provide credentials");
                    causes.push((name.clone(), err));
                }
                Err(err) => {
                    tracing::warn!(provider = %name, error = %provider::error::DisplayErrorContext(&err), "provider failed to provide credentials");
                    causes.push((name.clone(), err));
                }
            }
        }
        Err(CredentialsError::chain_exhausted(causes))
    }
}

impl ProvideCredentials for CredentialsProviderChain {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.credentials()
                .instrument(tracing::info_span!("load_credentials", provider = "Chain")),
        )
    }

    fn close(&self) {
        for (_, provider) in &self.providers {
            provider.close();
        }
    }
}
