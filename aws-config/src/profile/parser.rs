/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Parsing and merging of `~/.aws/config` and `~/.aws/credentials`

mod normalize;
mod parse;
mod section;
mod source;

pub use parse::ProfileParseError;
pub use section::{Profile, Property};
pub(crate) use section::SsoSession;

use aws_types::os_shim_internal::{Env, Fs};
use std::borrow::Cow;
use std::collections::HashMap;

/// Read & parse AWS config files
///
/// Loads and parses profile files following the rules shared by the AWS SDKs and CLI:
///
/// ## Location of Profile Files
/// * The location of the config file will be loaded from the `AWS_CONFIG_FILE` environment variable
///   with a fallback to `~/.aws/config`
/// * The location of the credentials file will be loaded from the `AWS_SHARED_CREDENTIALS_FILE`
///   environment variable with a fallback to `~/.aws/credentials`
///
/// ## Home directory resolution
/// Home directory resolution is implemented to match the behavior of the CLI & Python. `~` is only
/// used for home directory resolution when it:
/// - Starts the path
/// - Is either followed immediately by a path separator or at the end of the path
///
/// The selected profile is `profile_override` when set, then `$AWS_PROFILE`, then `default`.
/// Missing files are not an error: they produce an empty [`ProfileSet`].
pub async fn load(
    fs: &Fs,
    env: &Env,
    profile_override: Option<&str>,
) -> Result<ProfileSet, ProfileParseError> {
    let source = source::load(env, fs, profile_override).await;
    ProfileSet::parse(source)
}

/// A top-level configuration source containing multiple named profiles
#[derive(Debug, Eq, Clone, PartialEq)]
pub struct ProfileSet {
    profiles: HashMap<String, Profile>,
    selected_profile: Cow<'static, str>,
    sso_sessions: HashMap<String, SsoSession>,
}

impl ProfileSet {
    /// Create a new ProfileSet directly from the contents of a config and a credentials file
    pub fn from_contents(
        config: &str,
        credentials: &str,
        selected_profile: impl Into<Cow<'static, str>>,
    ) -> Result<Self, ProfileParseError> {
        Self::parse(source::Source {
            files: vec![
                source::File {
                    kind: source::ProfileFileKind::Config,
                    path: None,
                    contents: config.to_string(),
                },
                source::File {
                    kind: source::ProfileFileKind::Credentials,
                    path: None,
                    contents: credentials.to_string(),
                },
            ],
            profile: selected_profile.into(),
        })
    }

    /// Retrieves a key-value pair from the currently selected profile
    pub fn get(&self, key: &str) -> Option<&str> {
        self.profiles
            .get(self.selected_profile.as_ref())
            .and_then(|profile| profile.get(key))
    }

    /// Retrieves a named profile from the profile set
    pub fn get_profile(&self, profile_name: &str) -> Option<&Profile> {
        self.profiles.get(profile_name)
    }

    /// Returns the name of the currently selected profile
    pub fn selected_profile(&self) -> &str {
        self.selected_profile.as_ref()
    }

    /// Returns true if no profiles are contained in this profile set
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Returns the names of the profiles in this profile set
    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_ref)
    }

    /// Returns the `[sso-session name]` section called `name`
    pub(crate) fn sso_session(&self, name: &str) -> Option<&SsoSession> {
        self.sso_sessions.get(name)
    }

    fn parse(source: source::Source) -> Result<Self, ProfileParseError> {
        let mut base = ProfileSet {
            profiles: HashMap::new(),
            selected_profile: source.profile,
            sso_sessions: HashMap::new(),
        };
        for file in source.files {
            normalize::merge_in(&mut base, parse::parse_profile_file(&file)?, file.kind);
        }
        Ok(base)
    }
}
