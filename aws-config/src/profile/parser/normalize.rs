/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::profile::parser::parse::{RawProfileSet, WHITESPACE};
use crate::profile::parser::section::{Section, SsoSession};
use crate::profile::parser::source::ProfileFileKind;
use crate::profile::parser::{Profile, ProfileSet, Property};
use std::borrow::Cow;
use std::collections::HashMap;

const DEFAULT: &str = "default";
const PROFILE_PREFIX: &str = "profile";
const SSO_SESSION_PREFIX: &str = "sso-session";

#[derive(Eq, PartialEq, Hash, Debug)]
enum SectionKey<'a> {
    /// `[default]` or `[profile default]`
    Default {
        /// True when it is `[profile default]`
        prefixed: bool,
    },
    /// `[profile name]` or `[name]`
    Profile {
        /// True if prefixed with `profile`.
        prefixed: bool,
        name: Cow<'a, str>,
    },
    /// `[sso-session name]`
    SsoSession { name: Cow<'a, str> },
    /// Any other `[<prefix> <suffix>]` section
    Unknown {
        prefix: Cow<'a, str>,
        suffix: Cow<'a, str>,
    },
}

impl<'a> SectionKey<'a> {
    fn parse(input: &'a str) -> SectionKey<'a> {
        let input = input.trim_matches(WHITESPACE);
        if input == DEFAULT {
            return SectionKey::Default { prefixed: false };
        }
        match input.split_once(WHITESPACE) {
            Some((prefix, suffix)) => {
                let suffix = suffix.trim_matches(WHITESPACE);
                match prefix {
                    PROFILE_PREFIX if suffix == DEFAULT => SectionKey::Default { prefixed: true },
                    PROFILE_PREFIX => SectionKey::Profile {
                        prefixed: true,
                        name: suffix.into(),
                    },
                    SSO_SESSION_PREFIX => SectionKey::SsoSession {
                        name: suffix.into(),
                    },
                    _ => SectionKey::Unknown {
                        prefix: prefix.into(),
                        suffix: suffix.into(),
                    },
                }
            }
            None => SectionKey::Profile {
                prefixed: false,
                name: input.into(),
            },
        }
    }

    /// Validate a SectionKey for a given file kind
    ///
    /// 1. Names must ALWAYS be valid identifiers
    /// 2. For config files, the profile must either be `default` or it must have a profile prefix
    /// 3. For credentials files, the profile name MUST NOT have a profile prefix
    /// 4. Only config files can have sso-session sections
    fn valid_for(self, kind: ProfileFileKind) -> Result<Self, String> {
        match &self {
            SectionKey::Default { .. } => Ok(self),
            SectionKey::Profile { prefixed, name } => {
                if validate_identifier(name).is_err() {
                    return Err(format!(
                        "profile `{name}` ignored because `{name}` was not a valid identifier",
                    ));
                }
                match (kind, prefixed) {
                    (ProfileFileKind::Config, false) => Err(format!(
                        "profile `{name}` ignored because config profiles must be of the form `[profile <name>]`"
                    )),
                    (ProfileFileKind::Credentials, true) => Err(format!(
                        "profile `{name}` ignored because credential profiles must NOT begin with `profile`"
                    )),
                    _ => Ok(self),
                }
            }
            SectionKey::SsoSession { name } => {
                if validate_identifier(name).is_err() {
                    return Err(format!(
                        "section [sso-session {name}] ignored because `{name}` was not a valid identifier",
                    ));
                }
                match kind {
                    ProfileFileKind::Config => Ok(self),
                    ProfileFileKind::Credentials => Err(format!(
                        "section [sso-session {name}] ignored; sso-session sections must be in the AWS config file"
                    )),
                }
            }
            SectionKey::Unknown { prefix, suffix } => Err(format!(
                "section [{prefix} {suffix}] ignored because `{prefix}` is not a known section type"
            )),
        }
    }
}

/// Normalize a raw profile set and merge it into `base`
///
/// - When the profile is a config file, strip `profile` and trim whitespace (`profile foo` => `foo`)
/// - Profile and property names are validated (see [`validate_identifier`])
/// - A profile named `profile default` takes priority over a profile named `default`.
/// - Profiles with identical names are merged, later files winning property-by-property
pub(super) fn merge_in(
    base: &mut ProfileSet,
    raw_profile_set: RawProfileSet<'_>,
    kind: ProfileFileKind,
) {
    // valid_sections may still contain both `[profile default]` and `[default]`
    let valid_sections = raw_profile_set
        .into_iter()
        .filter_map(
            |(section_key, properties)| match SectionKey::parse(section_key).valid_for(kind) {
                Ok(section_key) => Some((section_key, properties)),
                Err(err_str) => {
                    tracing::warn!("{}", err_str);
                    None
                }
            },
        )
        .collect::<Vec<_>>();
    let ignore_unprefixed_default = valid_sections
        .iter()
        .any(|(section_key, _)| matches!(section_key, SectionKey::Default { prefixed: true }));

    for (section_key, raw_profile) in valid_sections {
        // `[profile default]` fully replaces the contents of `[default]`
        if ignore_unprefixed_default
            && matches!(section_key, SectionKey::Default { prefixed: false })
        {
            tracing::warn!("profile `default` ignored because `[profile default]` was found which takes priority");
            continue;
        }
        let section: &mut dyn Section = match section_key {
            SectionKey::Default { .. } => base
                .profiles
                .entry(DEFAULT.to_string())
                .or_insert_with(|| Profile::new(DEFAULT, HashMap::new())),
            SectionKey::Profile { name, .. } => base
                .profiles
                .entry(name.to_string())
                .or_insert_with(|| Profile::new(name, HashMap::new())),
            SectionKey::SsoSession { name } => base
                .sso_sessions
                .entry(name.to_string())
                .or_insert_with(|| SsoSession::new(name)),
            // rejected by `valid_for`
            SectionKey::Unknown { .. } => continue,
        };
        merge_into_base(section, raw_profile)
    }
}

fn merge_into_base(target: &mut dyn Section, profile: HashMap<Cow<'_, str>, Cow<'_, str>>) {
    for (k, v) in profile {
        match validate_identifier(k.as_ref()) {
            Ok(k) => {
                target.insert(k.to_owned(), Property::new(k.to_owned(), v.into()));
            }
            Err(_) => {
                tracing::warn!(profile = %target.name(), key = ?k, "key ignored because `{k}` was not a valid identifier");
            }
        }
    }
}

/// Validate that a string is a valid identifier
///
/// Identifiers must match `[A-Za-z0-9_\-/.%@:\+]+`
fn validate_identifier(input: &str) -> Result<&str, ()> {
    input
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || "_-/.%@:+".contains(ch))
        .then_some(input)
        .ok_or(())
}
