/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::cache::ExpiringCache;
use crate::provider::error::CredentialsError;
use crate::provider::{future, ProvideCredentials, SharedCredentialsProvider};
use crate::rt::sleep::{AsyncSleep, SharedAsyncSleep};
use crate::rt::timeout::Timeout;
use crate::time_source::SharedTimeSource;
use crate::Credentials;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};

const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CREDENTIAL_EXPIRATION: Duration = Duration::from_secs(15 * 60);
const DEFAULT_BUFFER_TIME: Duration = Duration::from_secs(5 * 60);

/// `LazyCachingCredentialsProvider` implements [`ProvideCredentials`] by caching
/// credentials that it loads by calling a user-provided [`ProvideCredentials`] implementation.
///
/// For example, you can provide a [`ProvideCredentials`] implementation that calls
/// AWS STS's AssumeRole operation to get temporary credentials, and `LazyCachingCredentialsProvider`
/// will cache those credentials until they expire.
///
/// Credentials are refreshed `buffer_time` before they expire. Concurrent callers that find the
/// cache empty or expired wait on a single load of the inner provider. A failed load is returned
/// to every waiting caller; expired credentials are never served in its place.
#[derive(Debug)]
pub struct LazyCachingCredentialsProvider {
    time: SharedTimeSource,
    sleeper: SharedAsyncSleep,
    cache: ExpiringCache<Credentials, CredentialsError>,
    provider: SharedCredentialsProvider,
    load_timeout: Duration,
    default_credential_expiration: Duration,
}

impl LazyCachingCredentialsProvider {
    /// Returns a new `Builder` that can be used to construct the `LazyCachingCredentialsProvider`.
    pub fn builder() -> builder::Builder {
        builder::Builder::new()
    }
}

impl ProvideCredentials for LazyCachingCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        let now = self.time.now();
        let time = self.time.clone();
        let sleeper = self.sleeper.clone();
        let provider = self.provider.clone();
        let load_timeout = self.load_timeout;
        let default_credential_expiration = self.default_credential_expiration;

        future::ProvideCredentials::new(async move {
            // Attempt to get cached credentials, or clear the cache if they're expired
            if let Some(credentials) = self.cache.yield_or_clear_if_expired(now) {
                debug!("loaded credentials from cache");
                return Ok(credentials);
            }

            // If we didn't get credentials from the cache, then we need to try and load.
            // There may be other threads also loading simultaneously, but this is OK
            // since the futures are not eagerly executed, and the cache will only run one
            // of them.
            let span = info_span!("lazy_load_credentials");
            let result = self
                .cache
                .get_or_load(now, move || {
                    async move {
                        let load = Timeout::new(
                            provider.provide_credentials(),
                            sleeper.sleep(load_timeout),
                        );
                        let credentials = match load.await {
                            Ok(result) => result?,
                            Err(_timed_out) => {
                                return Err(CredentialsError::provider_timed_out(load_timeout))
                            }
                        };
                        // If the credentials don't have an expiration time, then create a default one
                        let expiry = credentials
                            .expiry()
                            .unwrap_or(time.now() + default_credential_expiration);
                        Ok::<_, CredentialsError>((credentials, expiry))
                    }
                    // Only instrument the actual load future so that no span
                    // is opened if the cache decides not to execute it.
                    .instrument(span)
                })
                .await;
            match &result {
                Ok(credentials) => {
                    debug!(new_expiration = ?credentials.expiry(), "loaded credentials")
                }
                Err(err) => debug!(error = %err, "failed to load credentials"),
            }
            result
        })
    }

    fn close(&self) {
        self.cache.clear();
        self.provider.close();
    }
}

pub mod builder {
    //! Builder for [`LazyCachingCredentialsProvider`]

    use super::{
        LazyCachingCredentialsProvider, DEFAULT_BUFFER_TIME, DEFAULT_CREDENTIAL_EXPIRATION,
        DEFAULT_LOAD_TIMEOUT,
    };
    use crate::cache::ExpiringCache;
    use crate::provider::{ProvideCredentials, SharedCredentialsProvider};
    use crate::rt::sleep::{default_async_sleep, SharedAsyncSleep};
    use crate::time_source::SharedTimeSource;
    use std::time::Duration;

    /// Builder for constructing a [`LazyCachingCredentialsProvider`].
    ///
    /// # Examples
    ///
    /// ```
    /// use aws_credential_types::Credentials;
    /// use aws_credential_types::credential_fn::provide_credentials_fn;
    /// use aws_credential_types::cache::LazyCachingCredentialsProvider;
    /// use std::time::Duration;
    ///
    /// let provider = LazyCachingCredentialsProvider::builder()
    ///     .load(provide_credentials_fn(|| async {
    ///         // An async process to retrieve credentials would go here:
    ///         Ok(Credentials::from_keys("example", "example", None))
    ///     }))
    ///     .load_timeout(Duration::from_secs(30))
    ///     .build();
    /// ```
    #[derive(Debug, Default)]
    pub struct Builder {
        sleep: Option<SharedAsyncSleep>,
        time_source: Option<SharedTimeSource>,
        load: Option<SharedCredentialsProvider>,
        load_timeout: Option<Duration>,
        buffer_time: Option<Duration>,
        default_credential_expiration: Option<Duration>,
    }

    impl Builder {
        /// Creates a new builder
        pub fn new() -> Self {
            Default::default()
        }

        /// An implementation of [`ProvideCredentials`] that will be used to load
        /// the cached credentials once they're expired.
        pub fn load(mut self, loader: impl ProvideCredentials + 'static) -> Self {
            self.load = Some(SharedCredentialsProvider::new(loader));
            self
        }

        /// Implementation of [`AsyncSleep`](crate::rt::sleep::AsyncSleep) to use for timeouts.
        ///
        /// This enables use of the `LazyCachingCredentialsProvider` with other async runtimes.
        /// If using Tokio as the async runtime, this should be set to an instance of
        /// [`TokioSleep`](crate::rt::sleep::TokioSleep).
        pub fn sleep(mut self, sleep: SharedAsyncSleep) -> Self {
            self.sleep = Some(sleep);
            self
        }

        /// Time source used to decide whether cached credentials are still valid.
        pub fn time_source(mut self, time_source: SharedTimeSource) -> Self {
            self.time_source = Some(time_source);
            self
        }

        /// (Optional) Timeout for the given [`ProvideCredentials`] implementation.
        ///
        /// Defaults to 5 seconds.
        pub fn load_timeout(mut self, timeout: Duration) -> Self {
            self.load_timeout = Some(timeout);
            self
        }

        /// (Optional) Amount of time before the actual credential expiration time
        /// where credentials are considered expired.
        ///
        /// For example, if credentials are expiring in 15 minutes, and the buffer time is 10 seconds,
        /// then any requests made after 14 minutes and 50 seconds will load new credentials.
        ///
        /// Defaults to 5 minutes.
        pub fn buffer_time(mut self, buffer_time: Duration) -> Self {
            self.buffer_time = Some(buffer_time);
            self
        }

        /// (Optional) Default expiration time to set on credentials if they don't
        /// have an expiration time.
        ///
        /// This is only used if the given [`ProvideCredentials`] returns
        /// [`Credentials`](crate::Credentials) that don't have their `expiry` set.
        /// This must be at least 15 minutes.
        pub fn default_credential_expiration(mut self, duration: Duration) -> Self {
            self.default_credential_expiration = Some(duration);
            self
        }

        /// Creates the [`LazyCachingCredentialsProvider`].
        ///
        /// # Panics
        /// This will panic if no `sleep` implementation is given and if no default crate features
        /// are used. By default, the [`TokioSleep`](crate::rt::sleep::TokioSleep)
        /// implementation will be set automatically.
        ///
        /// This will also panic if no credentials provider was given to load from, or if the
        /// default credential expiration is shorter than 15 minutes.
        pub fn build(self) -> LazyCachingCredentialsProvider {
            let default_credential_expiration = self
                .default_credential_expiration
                .unwrap_or(DEFAULT_CREDENTIAL_EXPIRATION);
            assert!(
                default_credential_expiration >= DEFAULT_CREDENTIAL_EXPIRATION,
                "default_credential_expiration must be at least 15 minutes"
            );
            LazyCachingCredentialsProvider {
                time: self.time_source.unwrap_or_default(),
                sleeper: self.sleep.unwrap_or_else(|| {
                    default_async_sleep().expect("no default sleep implementation available")
                }),
                cache: ExpiringCache::new(self.buffer_time.unwrap_or(DEFAULT_BUFFER_TIME)),
                provider: self.load.expect("a provider to load credentials from is required"),
                load_timeout: self.load_timeout.unwrap_or(DEFAULT_LOAD_TIMEOUT),
                default_credential_expiration,
            }
        }
    }
}
