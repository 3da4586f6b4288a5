/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! SSO Credentials and Token providers
//!
//! Both providers read tokens written by `aws sso login` from `~/.aws/sso/cache`. The
//! [`SsoCredentialsProvider`] exchanges such a token for role credentials through the SSO portal.
//! When an `sso_session` is configured, the token comes from an [`SsoTokenProvider`] which
//! refreshes it through SSO OIDC; otherwise the cached token is used as-is until it expires.

pub(crate) mod cache;
pub mod credentials;
mod oidc;
pub mod token;

pub use credentials::SsoCredentialsProvider;
pub use token::SsoTokenProvider;

use crate::sso::cache::CachedSsoTokenError;
use std::error::Error;
use std::fmt;

/// A cached token could not be loaded; the fix is to run `aws sso login`
#[derive(Debug)]
pub(crate) struct LoginRequired {
    identifier: String,
    reason: LoginRequiredReason,
}

#[derive(Debug)]
enum LoginRequiredReason {
    Unreadable(CachedSsoTokenError),
    Expired,
}

impl LoginRequired {
    pub(crate) fn unreadable(identifier: impl Into<String>, source: CachedSsoTokenError) -> Self {
        Self {
            identifier: identifier.into(),
            reason: LoginRequiredReason::Unreadable(source),
        }
    }

    pub(crate) fn expired(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reason: LoginRequiredReason::Expired,
        }
    }
}

impl fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            LoginRequiredReason::Unreadable(_) => write!(
                f,
                "failed to load a cached SSO token for `{}`. Run `aws sso login` to create one",
                self.identifier
            ),
            LoginRequiredReason::Expired => write!(
                f,
                "the cached SSO token for `{}` is expired. Run `aws sso login` to refresh it",
                self.identifier
            ),
        }
    }
}

impl Error for LoginRequired {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.reason {
            LoginRequiredReason::Unreadable(err) => Some(err),
            LoginRequiredReason::Expired => None,
        }
    }
}

/// An SSO or SSO OIDC endpoint answered with a non-success status
#[derive(Debug)]
pub(crate) struct ServiceError {
    operation: &'static str,
    status: http::StatusCode,
    body: String,
}

impl ServiceError {
    pub(crate) fn new(operation: &'static str, response: &crate::http_client::HttpResponse) -> Self {
        Self {
            operation,
            status: response.status(),
            body: String::from_utf8_lossy(response.body()).into_owned(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed with status {}: {}",
            self.operation, self.status, self.body
        )
    }
}

impl Error for ServiceError {}
