/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Errors related to credential loading.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type BoxError = Box<dyn Error + Send + Sync + 'static>;
type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// Details for [`CredentialsError::CredentialsNotLoaded`]
#[derive(Debug, Clone)]
pub struct CredentialsNotLoaded {
    source: SharedError,
}

/// Details for [`CredentialsError::ProviderTimedOut`]
#[derive(Debug, Clone)]
pub struct ProviderTimedOut {
    timeout_duration: Duration,
}

impl ProviderTimedOut {
    /// Returns the maximum allowed timeout duration that was exceeded
    pub fn timeout_duration(&self) -> Duration {
        self.timeout_duration
    }
}

/// Details for [`CredentialsError::InvalidConfiguration`]
#[derive(Debug, Clone)]
pub struct InvalidConfiguration {
    source: SharedError,
}

/// Details for [`CredentialsError::ProviderError`]
#[derive(Debug, Clone)]
pub struct ProviderError {
    source: SharedError,
}

/// Details for [`CredentialsError::ProtocolViolation`]
#[derive(Debug, Clone)]
pub struct ProtocolViolation {
    source: SharedError,
}

/// Details for [`CredentialsError::ChainExhausted`]
#[derive(Debug, Clone)]
pub struct ChainExhausted {
    causes: Vec<(Cow<'static, str>, CredentialsError)>,
}

impl ChainExhausted {
    /// Every provider of the chain, in the order it was tried, with the error it failed with
    pub fn causes(&self) -> &[(Cow<'static, str>, CredentialsError)] {
        &self.causes
    }
}

/// Details for [`CredentialsError::Unhandled`]
#[derive(Debug, Clone)]
pub struct Unhandled {
    source: SharedError,
}

/// Error returned when credentials failed to load.
///
/// Errors are cheap to clone so that a single failed load can be reported to every caller that
/// was waiting on it.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CredentialsError {
    /// No credentials were available for this provider
    CredentialsNotLoaded(CredentialsNotLoaded),

    /// Loading credentials from this provider exceeded the maximum allowed duration
    ProviderTimedOut(ProviderTimedOut),

    /// The provider was given an invalid configuration
    ///
    /// For example:
    /// - syntax error in ~/.aws/config
    /// - assume role profile that forms an infinite loop
    /// - no cached SSO token, so `aws sso login` must be run first
    InvalidConfiguration(InvalidConfiguration),

    /// The provider experienced an error during credential resolution
    ///
    /// This may include errors like a 503 from STS or a file system error when attempting to
    /// read a configuration file.
    ProviderError(ProviderError),

    /// The credentials source answered successfully but the response was missing required data
    ProtocolViolation(ProtocolViolation),

    /// Every provider of a provider chain failed
    ChainExhausted(ChainExhausted),

    /// An unexpected error occurred during credential resolution
    ///
    /// If the error is something that can occur during expected usage of a provider, `ProviderError`
    /// should be returned instead. Unhandled is reserved for exceptional cases, for example:
    /// - Returned data not UTF-8
    Unhandled(Unhandled),
}

impl CredentialsError {
    /// The credentials provider did not provide credentials
    ///
    /// This error indicates the credentials provider was not enable or no configuration was set.
    /// This contrasts with [`invalid_configuration`](CredentialsError::InvalidConfiguration), indicating
    /// that the provider was configured in some way, but certain settings were invalid.
    pub fn not_loaded(source: impl Into<BoxError>) -> Self {
        CredentialsError::CredentialsNotLoaded(CredentialsNotLoaded {
            source: Arc::from(source.into()),
        })
    }

    /// An unexpected error occurred loading credentials from this provider
    ///
    /// Unhandled errors should not occur during normal operation and should be reserved for exceptional
    /// cases, such as a JSON API returning an output that was not parseable as JSON.
    pub fn unhandled(source: impl Into<BoxError>) -> Self {
        Self::Unhandled(Unhandled {
            source: Arc::from(source.into()),
        })
    }

    /// The credentials provider returned an error
    pub fn provider_error(source: impl Into<BoxError>) -> Self {
        Self::ProviderError(ProviderError {
            source: Arc::from(source.into()),
        })
    }

    /// The provided configuration for a provider was invalid
    pub fn invalid_configuration(source: impl Into<BoxError>) -> Self {
        Self::InvalidConfiguration(InvalidConfiguration {
            source: Arc::from(source.into()),
        })
    }

    /// A successful response from the credentials source lacked required fields
    pub fn protocol_violation(source: impl Into<BoxError>) -> Self {
        Self::ProtocolViolation(ProtocolViolation {
            source: Arc::from(source.into()),
        })
    }

    /// The credentials provider did not provide credentials within an allotted duration
    pub fn provider_timed_out(timeout_duration: Duration) -> Self {
        Self::ProviderTimedOut(ProviderTimedOut { timeout_duration })
    }

    /// Every member of a provider chain failed; `causes` lists them in order
    pub fn chain_exhausted(causes: Vec<(Cow<'static, str>, CredentialsError)>) -> Self {
        Self::ChainExhausted(ChainExhausted { causes })
    }
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::CredentialsNotLoaded(_) => {
                write!(f, "the credential provider was not enabled")
            }
            CredentialsError::ProviderTimedOut(details) => write!(
                f,
                "credentials provider timed out after {} seconds",
                details.timeout_duration.as_secs()
            ),
            CredentialsError::InvalidConfiguration(_) => {
                write!(f, "the credentials provider was not properly configured")
            }
            CredentialsError::ProviderError(_) => {
                write!(f, "an error occurred while loading credentials")
            }
            CredentialsError::ProtocolViolation(_) => {
                write!(f, "the credentials source returned an incomplete response")
            }
            CredentialsError::ChainExhausted(details) => {
                write!(f, "no provider in the chain provided credentials")?;
                for (name, err) in &details.causes {
                    write!(f, "; {name}: {}", DisplayErrorContext(err))?;
                }
                Ok(())
            }
            CredentialsError::Unhandled(_) => write!(f, "unexpected credentials error"),
        }
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialsError::CredentialsNotLoaded(details) => Some(details.source.as_ref() as _),
            CredentialsError::ProviderTimedOut(_) => None,
            CredentialsError::InvalidConfiguration(details) => Some(details.source.as_ref() as _),
            CredentialsError::ProviderError(details) => Some(details.source.as_ref() as _),
            CredentialsError::ProtocolViolation(details) => Some(details.source.as_ref() as _),
            // causes are rendered by `Display`
            CredentialsError::ChainExhausted(_) => None,
            CredentialsError::Unhandled(details) => Some(details.source.as_ref() as _),
        }
    }
}

/// Formats an error together with its chain of sources on a single line.
///
/// ```rust
/// use aws_credential_types::provider::error::{CredentialsError, DisplayErrorContext};
/// let err = CredentialsError::provider_error("HTTP 500");
/// assert_eq!(
///     "an error occurred while loading credentials: HTTP 500",
///     DisplayErrorContext(&err).to_string()
/// );
/// ```
#[derive(Debug)]
pub struct DisplayErrorContext<E>(pub E);

impl<E: Error> fmt::Display for DisplayErrorContext<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{CredentialsError, DisplayErrorContext};
    use std::error::Error;
    use std::time::Duration;

    #[test]
    fn errors_are_cheap_to_clone_and_keep_their_source() {
        let err = CredentialsError::invalid_configuration("run `aws sso login`");
        let clone = err.clone();
        assert_eq!(
            "run `aws sso login`",
            clone.source().expect("has source").to_string()
        );
        assert!(matches!(clone, CredentialsError::InvalidConfiguration(_)));
    }

    #[test]
    fn chain_exhausted_lists_every_cause() {
        let err = CredentialsError::chain_exhausted(vec![
            ("Environment".into(), CredentialsError::not_loaded("no keys")),
            (
                "Imds".into(),
                CredentialsError::provider_timed_out(Duration::from_secs(5)),
            ),
        ]);
        assert_eq!(
            "no provider in the chain provided credentials; \
             Environment: the credential provider was not enabled: no keys; \
             Imds: credentials provider timed out after 5 seconds",
            DisplayErrorContext(&err).to_string()
        );
        match err {
            CredentialsError::ChainExhausted(details) => assert_eq!(2, details.causes().len()),
            other => panic!("expected chain exhaustion, got {other:?}"),
        }
    }
}
