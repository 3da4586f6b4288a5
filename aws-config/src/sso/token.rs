/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! SSO Token Provider
//!
//! This token provider enables loading an access token from `~/.aws/sso/cache`. For this
//! provider to work, the `aws sso login` command must have been run with an `sso_session`
//! configured. The cached token is refreshed through SSO OIDC shortly before it expires, and the
//! refreshed token is written back to the cache.
//!
//! This provider is included automatically when profiles are loaded.

use crate::http_client::SharedHttpClient;
use crate::provider_config::ProviderConfig;
use crate::sso::cache::{load_cached_token, save_cached_token, CachedSsoToken};
use crate::sso::oidc::{self, RefreshGrant};
use crate::sso::LoginRequired;
use aws_credential_types::cache::ExpiringCache;
use aws_credential_types::provider::token::error::AccessTokenError;
use aws_credential_types::provider::token::{self, future, ProvideAccessToken};
use aws_credential_types::time_source::SharedTimeSource;
use aws_credential_types::AccessToken;
use aws_types::os_shim_internal::{Env, Fs};
use aws_types::region::Region;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;
use zeroize::Zeroizing;

const REFRESH_BUFFER_TIME: Duration = Duration::from_secs(5 * 60 /* 5 minutes */);
const MIN_TIME_BETWEEN_REFRESH: Duration = Duration::from_secs(30);

/// SSO Token Provider
///
/// This token provider will use cached SSO tokens stored in `~/.aws/sso/cache/<hash>.json`.
/// `<hash>` is computed based on the configured [`session_name`](Builder::session_name).
///
/// If possible, the cached token will be refreshed when it gets close to expiring. Tokens are
/// held in memory and reused until they are within five minutes of expiring; concurrent callers
/// share a single load.
#[derive(Debug)]
pub struct SsoTokenProvider {
    inner: Arc<Inner>,
    token_cache: ExpiringCache<CachedSsoToken, AccessTokenError>,
}

#[derive(Debug)]
struct Inner {
    env: Env,
    fs: Fs,
    region: Region,
    session_name: String,
    start_url: String,
    http_client: Option<SharedHttpClient>,
    time_source: SharedTimeSource,
    last_refresh_attempt: Mutex<Option<SystemTime>>,
}

impl SsoTokenProvider {
    /// Creates a `SsoTokenProvider` builder
    pub fn builder() -> Builder {
        Default::default()
    }

    async fn refresh_cached_token(
        inner: &Inner,
        cached_token: &CachedSsoToken,
        now: SystemTime,
    ) -> Result<CachedSsoToken, AccessTokenError> {
        let refresh_token = cached_token.refresh_token.as_ref().ok_or_else(|| {
            AccessTokenError::invalid_configuration(format!(
                "the cached SSO token for session `{}` has no refresh token",
                inner.session_name
            ))
        })?;
        let http_client = inner.http_client.as_ref().ok_or_else(|| {
            AccessTokenError::invalid_configuration("no HTTP client was configured")
        })?;

        let mut base = cached_token.clone();
        if !cached_token.registration_is_valid(now) {
            tracing::debug!("registering a new SSO OIDC client");
            let registration = oidc::register_client(http_client, &inner.region).await?;
            base.client_id = Some(registration.client_id);
            base.client_secret = Some(Zeroizing::new(registration.client_secret));
            base.registration_expires_at = Some(
                unix_time(registration.client_secret_expires_at).ok_or_else(|| {
                    AccessTokenError::unhandled(format!(
                        "client registration expiry `{}` is out of range",
                        registration.client_secret_expires_at
                    ))
                })?,
            );
            Self::save(inner, &base, "client registration").await;
        }
        let (Some(client_id), Some(client_secret)) = (&base.client_id, &base.client_secret) else {
            return Err(AccessTokenError::unhandled(
                "client registration missing after registering",
            ));
        };

        let output = oidc::create_token(
            http_client,
            &inner.region,
            RefreshGrant {
                client_id,
                client_secret,
                refresh_token,
            },
        )
        .await?;

        let expires_at = now
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|since_epoch| since_epoch.as_secs().checked_add(output.expires_in))
            .and_then(unix_time)
            .ok_or_else(|| {
                AccessTokenError::unhandled(format!(
                    "token lifetime of {} seconds is out of range",
                    output.expires_in
                ))
            })?;
        let refreshed = CachedSsoToken {
            access_token: Zeroizing::new(output.access_token),
            expires_at,
            refresh_token: output
                .refresh_token
                .map(Zeroizing::new)
                .or_else(|| base.refresh_token.clone()),
            region: Some(inner.region.to_string()),
            start_url: Some(inner.start_url.clone()),
            ..base
        };
        Self::save(inner, &refreshed, "refreshed token").await;
        Ok(refreshed)
    }

    async fn save(inner: &Inner, token: &CachedSsoToken, what: &str) {
        if let Err(err) = save_cached_token(&inner.env, &inner.fs, &inner.session_name, token).await
        {
            tracing::warn!(error = %err, "failed to save the SSO {what} to the cache");
        }
    }

    async fn load(inner: Arc<Inner>) -> Result<(CachedSsoToken, SystemTime), AccessTokenError> {
        tracing::debug!("expiring cache asked for an updated SSO token");
        let token = load_cached_token(&inner.env, &inner.fs, &inner.session_name)
            .await
            .map_err(|err| {
                AccessTokenError::invalid_configuration(LoginRequired::unreadable(
                    &inner.session_name,
                    err,
                ))
            })?;
        tracing::debug!("loaded cached SSO token");

        let now = inner.time_source.now();
        let expired = token.expires_at <= now;
        let expires_soon = token.expires_at <= now + REFRESH_BUFFER_TIME;
        let last_refresh = *inner
            .last_refresh_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let min_time_passed = last_refresh
            .map(|last| {
                now.duration_since(last).unwrap_or_default() >= MIN_TIME_BETWEEN_REFRESH
            })
            .unwrap_or(true);
        let refreshable = token.refresh_token.is_some() && min_time_passed;

        tracing::debug!(
            expired = ?expired,
            expires_soon = ?expires_soon,
            min_time_passed = ?min_time_passed,
            refreshable = ?refreshable,
            will_refresh = ?(expires_soon && refreshable),
            "cached SSO token refresh decision"
        );

        // Fail fast if the token has expired and we can't refresh it
        if expired && !refreshable {
            tracing::debug!("cached SSO token is expired and cannot be refreshed");
            return Err(AccessTokenError::invalid_configuration(
                LoginRequired::expired(&inner.session_name),
            ));
        }

        let token = if expires_soon && refreshable {
            tracing::debug!("attempting to refresh SSO token");
            *inner
                .last_refresh_attempt
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(now);
            match Self::refresh_cached_token(&inner, &token, now).await {
                Ok(refreshed) => refreshed,
                Err(err) if !expired => {
                    tracing::warn!(error = %err, "failed to refresh SSO token; using the cached token until it expires");
                    token
                }
                Err(err) => return Err(err),
            }
        } else {
            token
        };

        let expires_at = token.expires_at;
        Ok((token, expires_at))
    }

    async fn resolve_token(&self) -> Result<CachedSsoToken, AccessTokenError> {
        let now = self.inner.time_source.now();
        if let Some(token) = self.token_cache.yield_or_clear_if_expired(now) {
            tracing::debug!("using cached SSO token");
            return Ok(token);
        }
        let inner = self.inner.clone();
        self.token_cache
            .get_or_load(now, move || Self::load(inner))
            .await
    }

    async fn access_token(&self) -> token::Result {
        let token = self.resolve_token().await?;
        Ok(AccessToken::new(
            token.access_token.as_str(),
            Some(token.expires_at),
        ))
    }

    /// Drops the in-memory token; the next request reloads it from the cache
    pub(crate) fn clear(&self) {
        self.token_cache.clear();
    }
}

/// Whole seconds since the epoch as a timestamp the token cache file can hold
fn unix_time(secs: u64) -> Option<SystemTime> {
    let secs = i64::try_from(secs).ok()?;
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()
        .map(SystemTime::from)
}

impl ProvideAccessToken for SsoTokenProvider {
    fn provide_access_token<'a>(&'a self) -> future::ProvideAccessToken<'a>
    where
        Self: 'a,
    {
        future::ProvideAccessToken::new(self.access_token())
    }
}

/// Builder for [`SsoTokenProvider`]
#[derive(Debug, Default)]
pub struct Builder {
    provider_config: Option<ProviderConfig>,
    region: Option<Region>,
    session_name: Option<String>,
    start_url: Option<String>,
}

impl Builder {
    /// Creates a new builder for [`SsoTokenProvider`]
    pub fn new() -> Self {
        Default::default()
    }

    /// Override the configuration used for this provider
    pub fn configure(mut self, provider_config: &ProviderConfig) -> Self {
        self.provider_config = Some(provider_config.clone());
        self
    }

    /// Sets the SSO region
    ///
    /// This is a required field.
    pub fn region(mut self, region: impl Into<Region>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the SSO session name
    ///
    /// This is a required field.
    pub fn session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    /// Sets the SSO start URL
    ///
    /// This is a required field.
    pub fn start_url(mut self, start_url: impl Into<String>) -> Self {
        self.start_url = Some(start_url.into());
        self
    }

    /// Builds the [`SsoTokenProvider`]
    ///
    /// # Panics
    ///
    /// This will panic if any of the required fields are not given.
    pub fn build(self) -> SsoTokenProvider {
        let provider_config = self.provider_config.unwrap_or_default();
        SsoTokenProvider {
            inner: Arc::new(Inner {
                env: provider_config.env(),
                fs: provider_config.fs(),
                region: self.region.expect("region is required"),
                session_name: self.session_name.expect("session_name is required"),
                start_url: self.start_url.expect("start_url is required"),
                http_client: provider_config.http_client(),
                time_source: provider_config.time_source(),
                last_refresh_attempt: Mutex::new(None),
            }),
            token_cache: ExpiringCache::new(REFRESH_BUFFER_TIME),
        }
    }
}
