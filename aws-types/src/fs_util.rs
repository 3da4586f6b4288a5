/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Home directory resolution and `~` expansion.

use crate::os_shim_internal::Env;
use std::path::{Component, Path, PathBuf};

/// The operating system family, which decides where the home directory comes from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Os {
    /// Windows: `HOME`, then `USERPROFILE`, then `HOMEDRIVE` + `HOMEPATH`
    Windows,
    /// Everything else: `HOME`
    NotWindows,
}

impl Os {
    /// The OS this process is running on.
    pub fn real() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            _ => Os::NotWindows,
        }
    }
}

/// Resolve a home directory given a set of environment variables
pub fn home_dir(env_var: &Env, os: Os) -> Option<PathBuf> {
    if let Ok(home) = env_var.get("HOME") {
        tracing::debug!(src = "HOME", "loaded home directory");
        return Some(PathBuf::from(home));
    }

    if os == Os::Windows {
        if let Ok(home) = env_var.get("USERPROFILE") {
            tracing::debug!(src = "USERPROFILE", "loaded home directory");
            return Some(PathBuf::from(home));
        }

        let home_drive = env_var.get("HOMEDRIVE");
        let home_path = env_var.get("HOMEPATH");
        if let (Ok(mut drive), Ok(path)) = (home_drive, home_path) {
            tracing::debug!(src = "HOMEDRIVE/HOMEPATH", "loaded home directory");
            drive.push_str(&path);
            return Some(drive.into());
        }
    }
    None
}

/// Replace a leading `~` component with the home directory.
///
/// Only a bare `~` component is expanded: `~aws/config` is returned unchanged. If no home
/// directory can be determined the remainder of the path is returned relative.
pub fn expand_home(path: impl AsRef<Path>, env_var: &Env, os: Os) -> PathBuf {
    let path = path.as_ref();
    let mut components = path.components();
    match components.next() {
        None => path.into(),
        Some(Component::Normal(s)) if s == "~" => {
            let mut path = match home_dir(env_var, os) {
                Some(dir) => {
                    tracing::debug!(home = ?dir, "performing home directory substitution");
                    dir
                }
                None => {
                    tracing::warn!(
                        "could not determine home directory but home expansion was requested"
                    );
                    PathBuf::new()
                }
            };
            // rewrite the path using system-specific path separators
            for component in components {
                path.push(component);
            }
            path
        }
        // paths from environment variables already use the platform's separators
        _other => path.into(),
    }
}
