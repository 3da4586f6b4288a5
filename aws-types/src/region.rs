/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! AWS region

use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// The region to send requests to.
///
/// Credential providers that reach AWS services (SSO, SSO OIDC, STS) need a region to build
/// their endpoints. Resolving a region from the environment is not the job of this crate: callers
/// provide it explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Region(
    // Regions are almost always known statically. However, as an escape hatch for when they
    // are not, allow for an owned region
    Cow<'static, str>,
);

impl AsRef<str> for Region {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Region {
    /// Creates a new `Region` from the given string.
    pub fn new(region: impl Into<Cow<'static, str>>) -> Self {
        Self(region.into())
    }

    /// Const function that creates a new `Region` from a static str.
    pub const fn from_static(region: &'static str) -> Self {
        Self(Cow::Borrowed(region))
    }
}

#[cfg(test)]
mod test {
    use super::Region;

    #[test]
    fn owned_and_static_regions_compare_equal() {
        let owned = Region::new(String::from("us-west-2"));
        assert_eq!(owned, Region::from_static("us-west-2"));
        assert_eq!("us-west-2", owned.to_string());
    }
}
