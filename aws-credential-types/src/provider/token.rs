/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Access token provider interface
//!
//! Bearer tokens, such as the SSO portal token, are resolved through [`ProvideAccessToken`].
//! Token failures convert into [`CredentialsError`](crate::provider::error::CredentialsError)
//! with the same classification, so that credentials providers built on a token provider report
//! a missing login the same way as a missing profile.

use crate::AccessToken;

/// Token provider errors
pub mod error {
    use crate::provider::error::CredentialsError;
    use std::error::Error;
    use std::fmt;
    use std::sync::Arc;

    type BoxError = Box<dyn Error + Send + Sync + 'static>;

    /// How an access token failed to load
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[non_exhaustive]
    pub enum AccessTokenErrorKind {
        /// The token source is not set up here
        TokenNotLoaded,
        /// The token source is set up but unusable, for example the cached token expired and
        /// `aws sso login` has to be run
        InvalidConfiguration,
        /// The token service answered with an error
        ProviderError,
        /// Anything else, for example a response that was not valid JSON
        Unhandled,
    }

    /// Error returned when an access token provider fails to provide an access token
    ///
    /// Cheap to clone: every caller waiting on a shared token load receives the same error.
    #[derive(Debug, Clone)]
    pub struct AccessTokenError {
        kind: AccessTokenErrorKind,
        source: Arc<dyn Error + Send + Sync + 'static>,
    }

    impl AccessTokenError {
        fn new(kind: AccessTokenErrorKind, source: impl Into<BoxError>) -> Self {
            Self {
                kind,
                source: Arc::from(source.into()),
            }
        }

        /// The token source is not set up here
        pub fn not_loaded(source: impl Into<BoxError>) -> Self {
            Self::new(AccessTokenErrorKind::TokenNotLoaded, source)
        }

        /// The token source is set up but cannot produce a token without user action
        pub fn invalid_configuration(source: impl Into<BoxError>) -> Self {
            Self::new(AccessTokenErrorKind::InvalidConfiguration, source)
        }

        /// The token service returned an error
        pub fn provider_error(source: impl Into<BoxError>) -> Self {
            Self::new(AccessTokenErrorKind::ProviderError, source)
        }

        /// An unexpected error occurred while loading a token
        pub fn unhandled(source: impl Into<BoxError>) -> Self {
            Self::new(AccessTokenErrorKind::Unhandled, source)
        }

        /// Returns how the token failed to load
        pub fn kind(&self) -> AccessTokenErrorKind {
            self.kind
        }
    }

    impl fmt::Display for AccessTokenError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.kind {
                AccessTokenErrorKind::TokenNotLoaded => {
                    write!(f, "the access token provider was not enabled")
                }
                AccessTokenErrorKind::InvalidConfiguration => {
                    write!(f, "the access token provider was not properly configured")
                }
                AccessTokenErrorKind::ProviderError => {
                    write!(f, "an error occurred while loading an access token")
                }
                AccessTokenErrorKind::Unhandled => write!(f, "unexpected access token error"),
            }
        }
    }

    impl Error for AccessTokenError {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(self.source.as_ref() as _)
        }
    }

    impl From<AccessTokenError> for CredentialsError {
        fn from(err: AccessTokenError) -> Self {
            match err.kind {
                AccessTokenErrorKind::TokenNotLoaded => CredentialsError::not_loaded(err),
                AccessTokenErrorKind::InvalidConfiguration => {
                    CredentialsError::invalid_configuration(err)
                }
                AccessTokenErrorKind::ProviderError => CredentialsError::provider_error(err),
                AccessTokenErrorKind::Unhandled => CredentialsError::unhandled(err),
            }
        }
    }
}

/// Result type for token providers
pub type Result = std::result::Result<AccessToken, error::AccessTokenError>;

/// Future returned by [`ProvideAccessToken`]
pub mod future {
    use crate::provider::future::BoxFuture;
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Future new-type that `ProvideAccessToken::provide_access_token` must return.
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct ProvideAccessToken<'a>(BoxFuture<'a, super::Result>);

    impl<'a> ProvideAccessToken<'a> {
        /// Wraps the future that resolves the token
        pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
            ProvideAccessToken(Box::pin(future))
        }
    }

    impl fmt::Debug for ProvideAccessToken<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("ProvideAccessToken")
        }
    }

    impl Future for ProvideAccessToken<'_> {
        type Output = super::Result;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            self.0.as_mut().poll(cx)
        }
    }
}

/// Asynchronous access token provider
pub trait ProvideAccessToken: Send + Sync + std::fmt::Debug {
    /// Returns a future that resolves an access token
    fn provide_access_token<'a>(&'a self) -> future::ProvideAccessToken<'a>
    where
        Self: 'a;
}
