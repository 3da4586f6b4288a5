/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Flattens a profile set into the chain of providers it describes.
//!
//! A profile set like
//! ```ini
//! [profile admin]
//! role_arn = arn:aws:iam::123456789012:role/admin
//! source_profile = base
//!
//! [profile base]
//! aws_access_key_id = AKID
//! aws_secret_access_key = SECRET
//! ```
//! resolves to a `BaseProvider::AccessKey` followed by a single role to assume. No I/O happens
//! here; [`super::exec`] turns the result into real providers.

use super::ProfileFileError;
use crate::profile::{Profile, ProfileSet};
use aws_credential_types::Credentials;
use std::time::Duration;

/// Chain of profile providers
///
/// Within a profile file, a chain of providers is produced. Starting with a base provider,
/// additional roles may be assumed, each authorized by the credentials of the previous step.
#[derive(Debug)]
pub(super) struct ProfileChain<'a> {
    pub(super) base: BaseProvider<'a>,
    pub(super) chain: Vec<RoleArn<'a>>,
}

/// A base member of the profile chain
///
/// Base providers do not require input credentials to provide their own credentials,
/// e.g. IMDS, ECS, Environment variables
#[derive(Clone, Debug)]
pub(super) enum BaseProvider<'a> {
    /// A profile that specifies a named credential source
    /// Eg: `credential_source = Ec2InstanceMetadata`
    ///
    /// The following profile produces two separate `ProfileProvider` rows:
    /// 1. `BaseProvider::NamedSource("Ec2InstanceMetadata")`
    /// 2. `RoleArn { role_arn: "...", ... }`
    /// ```ini
    /// [profile assume-role]
    /// role_arn = arn:aws:iam::123456789:role/MyRole
    /// credential_source = Ec2InstanceMetadata
    /// ```
    NamedSource(&'a str),

    /// A profile with explicitly configured access keys
    ///
    /// Example
    /// ```ini
    /// [profile C]
    /// aws_access_key_id = abc123
    /// aws_secret_access_key = def456
    /// ```
    AccessKey(Credentials),

    /// An SSO profile, either configured inline or through an `[sso-session]` section
    Sso {
        session_name: Option<&'a str>,
        start_url: &'a str,
        region: &'a str,
        account_id: &'a str,
        role_name: &'a str,
    },
}

/// A profile that specifies a role to assume
#[derive(Debug, Eq, PartialEq)]
pub(super) struct RoleArn<'a> {
    /// Role to assume
    pub(super) role_arn: &'a str,
    /// external_id parameter to pass to the assume role provider
    pub(super) external_id: Option<&'a str>,
    /// session name parameter to pass to the assume role provider
    pub(super) session_name: Option<&'a str>,
    /// requested lifetime of the role session
    pub(super) duration: Option<Duration>,
}

/// Resolve a ProfileChain from a ProfileSet or return an error
pub(super) fn resolve_chain(profile_set: &ProfileSet) -> Result<ProfileChain<'_>, ProfileFileError> {
    if profile_set.is_empty() {
        return Err(ProfileFileError::NoProfilesDefined);
    }
    let mut source_profile_name = profile_set.selected_profile();
    let mut visited_profiles: Vec<&str> = vec![];
    let mut chain = vec![];
    let base = loop {
        if visited_profiles.contains(&source_profile_name) {
            return Err(ProfileFileError::CredentialLoop {
                profiles: visited_profiles.into_iter().map(ToOwned::to_owned).collect(),
                next: source_profile_name.to_string(),
            });
        }
        let profile = profile_set.get_profile(source_profile_name).ok_or_else(|| {
            ProfileFileError::MissingProfile {
                profile: source_profile_name.into(),
                message: match visited_profiles.last() {
                    Some(referrer) => {
                        format!("it was referenced as `source_profile` by `{referrer}`").into()
                    }
                    None => "it was selected but is not present in the config or credentials file"
                        .into(),
                },
            }
        })?;
        visited_profiles.push(source_profile_name);
        // After the first item in the chain, static credentials take priority over a role
        if visited_profiles.len() > 1 {
            if let Ok(creds) = static_creds_from_profile(profile) {
                break BaseProvider::AccessKey(creds);
            }
        }
        let role = match role_arn_from_profile(profile)? {
            Some(role) => role,
            // no role to assume: this profile must provide credentials on its own
            None => break base_provider(profile_set, profile)?,
        };
        chain.push(role);
        match next_profile(profile)? {
            NextProfile::SelfReference => {
                break BaseProvider::AccessKey(static_creds_from_profile(profile)?);
            }
            NextProfile::Named(name) => source_profile_name = name,
            NextProfile::CredentialSource(source) => break BaseProvider::NamedSource(source),
        }
    };
    chain.reverse();
    Ok(ProfileChain { base, chain })
}

mod role {
    pub(super) const ROLE_ARN: &str = "role_arn";
    pub(super) const EXTERNAL_ID: &str = "external_id";
    pub(super) const SESSION_NAME: &str = "role_session_name";
    pub(super) const DURATION_SECONDS: &str = "duration_seconds";

    pub(super) const CREDENTIAL_SOURCE: &str = "credential_source";
    pub(super) const SOURCE_PROFILE: &str = "source_profile";
}

mod sso {
    pub(super) const ACCOUNT_ID: &str = "sso_account_id";
    pub(super) const REGION: &str = "sso_region";
    pub(super) const ROLE_NAME: &str = "sso_role_name";
    pub(super) const START_URL: &str = "sso_start_url";
    pub(super) const SESSION_NAME: &str = "sso_session";
}

mod static_credentials {
    pub(super) const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
    pub(super) const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
    pub(super) const AWS_SESSION_TOKEN: &str = "aws_session_token";
    pub(super) const AWS_ACCOUNT_ID: &str = "aws_account_id";
}

const PROVIDER_NAME: &str = "ProfileFile";

fn base_provider<'a>(
    profile_set: &'a ProfileSet,
    profile: &'a Profile,
) -> Result<BaseProvider<'a>, ProfileFileError> {
    let is_sso = [sso::SESSION_NAME, sso::START_URL, sso::ACCOUNT_ID]
        .iter()
        .any(|key| profile.get(key).is_some());
    if is_sso {
        sso_provider(profile_set, profile)
    } else {
        static_creds_from_profile(profile).map(BaseProvider::AccessKey)
    }
}

enum NextProfile<'a> {
    SelfReference,
    CredentialSource(&'a str),
    Named(&'a str),
}

fn role_arn_from_profile(profile: &Profile) -> Result<Option<RoleArn<'_>>, ProfileFileError> {
    let role_arn = match profile.get(role::ROLE_ARN) {
        Some(role_arn) => role_arn,
        None => return Ok(None),
    };
    let duration = profile
        .get(role::DURATION_SECONDS)
        .map(|value| {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ProfileFileError::InvalidProperty {
                    profile: profile.name().into(),
                    key: role::DURATION_SECONDS,
                    message: format!("`{value}` is not a whole number of seconds").into(),
                })
        })
        .transpose()?;
    Ok(Some(RoleArn {
        role_arn,
        external_id: profile.get(role::EXTERNAL_ID),
        session_name: profile.get(role::SESSION_NAME),
        duration,
    }))
}

fn next_profile(profile: &Profile) -> Result<NextProfile<'_>, ProfileFileError> {
    let credential_source = profile.get(role::CREDENTIAL_SOURCE);
    let source_profile = profile.get(role::SOURCE_PROFILE);
    match (source_profile, credential_source) {
        (Some(_), Some(_)) => Err(ProfileFileError::InvalidCredentialSource {
            profile: profile.name().to_string(),
            message: "profile contained both source_profile and credential_source. \
                Only one or the other can be defined"
                .into(),
        }),
        (None, None) => Err(ProfileFileError::MissingCredentialSource {
            profile: profile.name().to_string(),
            message:
                "profile must contain `source_profile` or `credential_source` but neither were defined"
                    .into(),
        }),
        (Some(source_profile), None) if source_profile == profile.name() => {
            Ok(NextProfile::SelfReference)
        }
        (Some(source_profile), None) => Ok(NextProfile::Named(source_profile)),
        (None, Some(credential_source)) => Ok(NextProfile::CredentialSource(credential_source)),
    }
}

fn sso_provider<'a>(
    profile_set: &'a ProfileSet,
    profile: &'a Profile,
) -> Result<BaseProvider<'a>, ProfileFileError> {
    let invalid = |message: String| ProfileFileError::InvalidSsoConfig {
        profile: profile.name().into(),
        message: message.into(),
    };
    let required = |key: &'static str| {
        profile
            .get(key)
            .ok_or_else(|| invalid(format!("`{key}` was missing")))
    };
    let session_name = profile.get(sso::SESSION_NAME);
    let (start_url, region) = match session_name {
        Some(session_name) => {
            let session = profile_set.sso_session(session_name).ok_or_else(|| {
                invalid(format!(
                    "`[sso-session {session_name}]` was referenced but not defined"
                ))
            })?;
            let from_session = |key: &'static str| -> Result<&'a str, ProfileFileError> {
                let value = session.get(key).ok_or_else(|| {
                    invalid(format!(
                        "`{key}` was missing from `[sso-session {session_name}]`"
                    ))
                })?;
                // a value repeated in the profile must agree with the session
                match profile.get(key) {
                    Some(profile_value) if profile_value != value => Err(invalid(format!(
                        "`{key}` in the profile ({profile_value}) does not match \
                         `{key}` in `[sso-session {session_name}]` ({value})"
                    ))),
                    _ => Ok(value),
                }
            };
            (from_session(sso::START_URL)?, from_session(sso::REGION)?)
        }
        None => (required(sso::START_URL)?, required(sso::REGION)?),
    };
    Ok(BaseProvider::Sso {
        session_name,
        start_url,
        region,
        account_id: required(sso::ACCOUNT_ID)?,
        role_name: required(sso::ROLE_NAME)?,
    })
}

/// Load static credentials from a profile
///
/// Example:
/// ```ini
/// [profile B]
/// aws_access_key_id = abc123
/// aws_secret_access_key = def456
/// ```
fn static_creds_from_profile(profile: &Profile) -> Result<Credentials, ProfileFileError> {
    use static_credentials::*;
    let access_key = profile.get(AWS_ACCESS_KEY_ID);
    let secret_key = profile.get(AWS_SECRET_ACCESS_KEY);
    let (access_key, secret_key) = match (access_key, secret_key) {
        (Some(access_key), Some(secret_key)) => (access_key, secret_key),
        (None, None) => {
            return Err(ProfileFileError::ProfileDidNotContainCredentials {
                profile: profile.name().to_string(),
            })
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(ProfileFileError::InvalidCredentialSource {
                profile: profile.name().to_string(),
                message: format!(
                    "profile must define both `{AWS_ACCESS_KEY_ID}` and `{AWS_SECRET_ACCESS_KEY}`"
                )
                .into(),
            })
        }
    };
    let mut builder = Credentials::builder()
        .access_key_id(access_key)
        .secret_access_key(secret_key)
        .provider_name(PROVIDER_NAME);
    builder.set_session_token(profile.get(AWS_SESSION_TOKEN).map(ToOwned::to_owned));
    builder.set_account_id(profile.get(AWS_ACCOUNT_ID).map(ToOwned::to_owned));
    Ok(builder.build())
}
