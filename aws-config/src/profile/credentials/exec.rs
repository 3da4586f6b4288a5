/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::repr::{self, BaseProvider};
use super::ProfileFileError;
use crate::provider_config::ProviderConfig;
use crate::sso::credentials::SsoProviderConfig;
use crate::sso::SsoCredentialsProvider;
use crate::sts::{default_session_name, AssumeRole, StsClient};
use aws_credential_types::provider::{self, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_types::region::Region;
use std::borrow::Cow;
use std::collections::HashMap;

/// One `role_arn` step of a profile chain
#[derive(Debug)]
pub(super) struct AssumeRoleStep {
    client: StsClient,
    request: AssumeRole,
}

impl AssumeRoleStep {
    pub(super) fn role_arn(&self) -> &str {
        &self.request.role_arn
    }

    pub(super) async fn credentials(&self, input_credentials: &Credentials) -> provider::Result {
        self.client.assume_role(&self.request, input_credentials).await
    }
}

/// Executable form of a [`repr::ProfileChain`]
#[derive(Debug)]
pub(super) struct ProviderChain {
    base: SharedCredentialsProvider,
    chain: Vec<AssumeRoleStep>,
}

impl ProviderChain {
    pub(super) fn base(&self) -> &SharedCredentialsProvider {
        &self.base
    }

    pub(super) fn chain(&self) -> &[AssumeRoleStep] {
        &self.chain
    }

    /// Build live providers for `repr`
    ///
    /// `sts_region` is used for every role in the chain.
    pub(super) fn from_repr(
        provider_config: &ProviderConfig,
        sts_region: Option<Region>,
        repr: repr::ProfileChain<'_>,
        factory: &named::NamedProviderFactory,
    ) -> Result<Self, ProfileFileError> {
        tracing::info!(base = ?repr.base, "first credentials will be loaded from the base provider");
        let base = match repr.base {
            BaseProvider::NamedSource(name) => {
                factory
                    .provider(name)
                    .ok_or_else(|| ProfileFileError::UnknownProvider {
                        name: name.to_string(),
                    })?
            }
            BaseProvider::AccessKey(key) => SharedCredentialsProvider::new(key),
            BaseProvider::Sso {
                session_name,
                start_url,
                region,
                account_id,
                role_name,
            } => SharedCredentialsProvider::new(SsoCredentialsProvider::new(
                provider_config,
                SsoProviderConfig {
                    account_id: account_id.to_string(),
                    role_name: role_name.to_string(),
                    start_url: start_url.to_string(),
                    region: Region::new(region.to_string()),
                    session_name: session_name.map(ToOwned::to_owned),
                },
            )),
        };
        let client = provider_config.sts_client(sts_region);
        let chain = repr
            .chain
            .into_iter()
            .map(|role| {
                tracing::info!(role_arn = ?role.role_arn, "which will be used to assume a role");
                AssumeRoleStep {
                    request: AssumeRole {
                        role_arn: role.role_arn.into(),
                        session_name: role
                            .session_name
                            .map(ToOwned::to_owned)
                            .unwrap_or_else(|| default_session_name(client.time_source().now())),
                        external_id: role.external_id.map(ToOwned::to_owned),
                        duration: role.duration,
                    },
                    client: client.clone(),
                }
            })
            .collect();
        Ok(ProviderChain { base, chain })
    }
}

pub(super) mod named {
    use super::*;
    use crate::ecs::EcsCredentialsProvider;
    use crate::environment::credentials::EnvironmentVariableCredentialsProvider;
    use crate::imds::credentials::ImdsCredentialsProvider;

    /// Providers that can be referenced by `credential_source`
    #[derive(Debug)]
    pub(crate) struct NamedProviderFactory {
        providers: HashMap<Cow<'static, str>, SharedCredentialsProvider>,
    }

    impl NamedProviderFactory {
        /// The builtin sources (`Environment`, `Ec2InstanceMetadata`, `EcsContainer`), with
        /// `custom` providers added or replacing them
        pub(crate) fn new(
            provider_config: &ProviderConfig,
            custom: HashMap<Cow<'static, str>, SharedCredentialsProvider>,
        ) -> Self {
            let mut providers: HashMap<Cow<'static, str>, SharedCredentialsProvider> =
                HashMap::new();
            providers.insert(
                "Environment".into(),
                SharedCredentialsProvider::new(
                    EnvironmentVariableCredentialsProvider::new_with_env(provider_config.env()),
                ),
            );
            providers.insert(
                "Ec2InstanceMetadata".into(),
                SharedCredentialsProvider::new(
                    ImdsCredentialsProvider::builder()
                        .configure(provider_config)
                        .build(),
                ),
            );
            providers.insert(
                "EcsContainer".into(),
                SharedCredentialsProvider::new(
                    EcsCredentialsProvider::builder()
                        .configure(provider_config)
                        .build(),
                ),
            );
            providers.extend(custom);
            NamedProviderFactory { providers }
        }

        pub(crate) fn provider(&self, name: &str) -> Option<SharedCredentialsProvider> {
            self.providers.get(name).cloned()
        }
    }
}

#[cfg(test)]
mod test {
    use super::named::NamedProviderFactory;
    use super::*;
    use crate::profile::credentials::repr::resolve_chain;
    use crate::profile::ProfileSet;
    use aws_credential_types::time_source::StaticTimeSource;
    use std::time::Duration;

    fn build(config: &str, selected: &'static str) -> Result<ProviderChain, ProfileFileError> {
        let provider_config = ProviderConfig::no_configuration()
            .with_time_source(StaticTimeSource::from_secs(1_640_000_000));
        let factory = NamedProviderFactory::new(&provider_config, HashMap::new());
        let set = ProfileSet::from_contents(config, "", selected).expect("valid profile");
        ProviderChain::from_repr(
            &provider_config,
            None,
            resolve_chain(&set)?,
            &factory,
        )
    }

    #[test]
    fn builtin_named_sources() {
        for source in ["Environment", "Ec2InstanceMetadata", "EcsContainer"] {
            let config = format!(
                "[profile a]\nrole_arn = arn:aws:iam::123456789012:role/a\ncredential_source = {source}\n"
            );
            let chain = build(&config, "a").expect("builtin source");
            assert_eq!(1, chain.chain().len());
        }
    }

    #[test]
    fn unknown_named_source() {
        let err = build(
            "[profile a]\nrole_arn = arn:aws:iam::123456789012:role/a\ncredential_source = Fax\n",
            "a",
        )
        .expect_err("unknown source");
        assert_eq!(
            "profile referenced `Fax` provider but that provider is not supported",
            err.to_string()
        );
    }

    #[test]
    fn session_name_defaults_to_the_current_time() {
        let chain = build(
            "[profile a]\nrole_arn = arn:aws:iam::123456789012:role/a\n\
             credential_source = Environment\nduration_seconds = 1200\n",
            "a",
        )
        .expect("valid chain");
        let step = &chain.chain()[0];
        assert_eq!("arn:aws:iam::123456789012:role/a", step.role_arn());
        assert_eq!("aws-config-1640000000000", step.request.session_name);
        assert_eq!(Some(Duration::from_secs(1200)), step.request.duration);
    }
}
