/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_types::fs_util::{expand_home, Os};
use aws_types::os_shim_internal::{Env, Fs};
use std::borrow::Cow;
use std::io::ErrorKind;
use tracing::Instrument;

/// In-memory source of profile data
#[derive(Debug)]
pub(super) struct Source {
    /// Profile files, in the order they are merged
    pub(super) files: Vec<File>,

    /// Profile to use
    ///
    /// Overridden via `$AWS_PROFILE`, defaults to `default`
    pub(super) profile: Cow<'static, str>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum ProfileFileKind {
    Config,
    Credentials,
}

impl ProfileFileKind {
    fn default_path(&self) -> &'static str {
        match self {
            ProfileFileKind::Config => "~/.aws/config",
            ProfileFileKind::Credentials => "~/.aws/credentials",
        }
    }

    fn override_environment_variable(&self) -> &'static str {
        match self {
            ProfileFileKind::Config => "AWS_CONFIG_FILE",
            ProfileFileKind::Credentials => "AWS_SHARED_CREDENTIALS_FILE",
        }
    }
}

/// In-memory configuration file
#[derive(Debug)]
pub(super) struct File {
    pub(super) kind: ProfileFileKind,
    /// Expanded path, for diagnostics; `None` when the contents did not come from disk
    pub(super) path: Option<String>,
    pub(super) contents: String,
}

/// Load a [`Source`] from a given environment and filesystem.
pub(super) async fn load(env: &Env, fs: &Fs, profile_override: Option<&str>) -> Source {
    let mut files = Vec::with_capacity(2);
    for kind in [ProfileFileKind::Config, ProfileFileKind::Credentials] {
        let span = match kind {
            ProfileFileKind::Config => tracing::debug_span!("load_config_file"),
            ProfileFileKind::Credentials => tracing::debug_span!("load_credentials_file"),
        };
        files.push(read(fs, env, kind).instrument(span).await);
    }
    Source {
        files,
        profile: profile_override
            .map(|profile| Cow::Owned(profile.to_string()))
            .or_else(|| env.get("AWS_PROFILE").ok().map(Cow::Owned))
            .unwrap_or(Cow::Borrowed("default")),
    }
}

/// Read a file given a potential path override & Home directory expansion
async fn read(fs: &Fs, env: &Env, kind: ProfileFileKind) -> File {
    let default_path = kind.default_path();
    let path = env
        .get(kind.override_environment_variable())
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed(default_path));
    let expanded = expand_home(path.as_ref(), env, Os::real());
    tracing::debug!(before = ?path, after = ?expanded, "home directory expanded");
    let data = match fs.read_to_end(&expanded).await {
        Ok(data) => data,
        Err(err) => {
            match err.kind() {
                ErrorKind::NotFound if path == default_path => {
                    tracing::debug!(path = %path, "config file not found")
                }
                ErrorKind::NotFound => tracing::warn!(
                    path = %path,
                    env = %kind.override_environment_variable(),
                    "config file overridden via environment variable not found"
                ),
                _other => tracing::warn!(path = %path, error = %err, "failed to read config file"),
            };
            Default::default()
        }
    };
    let contents = match String::from_utf8(data) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "config file did not contain utf-8 encoded data");
            Default::default()
        }
    };
    tracing::debug!(path = %path, size = ?contents.len(), "config file loaded");
    File {
        kind,
        // lossy is OK here, the name of this file is just for debugging purposes
        path: Some(expanded.to_string_lossy().into()),
        contents,
    }
}
