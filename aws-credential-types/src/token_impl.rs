/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::credentials_impl::format_expiry;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use zeroize::Zeroizing;

/// AWS Access Token
///
/// Provides token which is used to securely authorize requests to AWS
/// services. A token is a string that the OAuth client uses to make requests to
/// the resource server.
///
/// For more details on tokens, see: <https://oauth.net/2/access-tokens>
#[derive(Clone, Eq, PartialEq)]
pub struct AccessToken(Arc<Inner>);

impl AccessToken {
    /// Create a new access token
    pub fn new(token: impl Into<String>, expires_after: Option<SystemTime>) -> Self {
        Self(Arc::new(Inner {
            token: Zeroizing::new(token.into()),
            expires_after,
        }))
    }

    /// Get the access token
    pub fn token(&self) -> &str {
        &self.0.token
    }

    /// Get the token expiration time
    pub fn expires_after(&self) -> Option<SystemTime> {
        self.0.expires_after
    }
}

#[derive(Eq, PartialEq)]
struct Inner {
    token: Zeroizing<String>,
    expires_after: Option<SystemTime>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("AccessToken");
        dbg.field("token", &"** redacted **");
        if let Some(expires_after) = self.0.expires_after {
            dbg.field("expires_after", &format_expiry(expires_after));
        } else {
            dbg.field("expires_after", &"never");
        }
        dbg.finish()
    }
}

#[cfg(test)]
mod test {
    use super::AccessToken;

    #[test]
    fn debug_is_redacted() {
        let token = AccessToken::new("secret-token", None);
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret-token"), "{debug}");
        assert!(debug.contains("never"), "{debug}");
    }
}
