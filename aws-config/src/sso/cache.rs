/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::json_credentials::{format_date_time, parse_date_time};
use aws_types::fs_util::{home_dir, Os};
use aws_types::os_shim_internal::{Env, Fs};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use zeroize::Zeroizing;

/// A token cached under `~/.aws/sso/cache`
///
/// Legacy tokens only carry the access token and its expiry. Tokens written by the session flow
/// also carry the refresh token and the OIDC client registration used to refresh it.
#[derive(Clone)]
pub(crate) struct CachedSsoToken {
    pub(crate) access_token: Zeroizing<String>,
    pub(crate) client_id: Option<String>,
    pub(crate) client_secret: Option<Zeroizing<String>>,
    pub(crate) expires_at: SystemTime,
    pub(crate) refresh_token: Option<Zeroizing<String>>,
    pub(crate) region: Option<String>,
    pub(crate) registration_expires_at: Option<SystemTime>,
    pub(crate) start_url: Option<String>,
}

impl CachedSsoToken {
    /// True if a client registration is present and unexpired at `now`
    pub(crate) fn registration_is_valid(&self, now: SystemTime) -> bool {
        match (&self.client_id, &self.client_secret) {
            (Some(_), Some(_)) => self
                .registration_expires_at
                .map(|expiry| now < expiry)
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl fmt::Debug for CachedSsoToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSsoToken")
            .field("access_token", &"** redacted **")
            .field("client_id", &self.client_id)
            .field("client_secret", &"** redacted **")
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &"** redacted **")
            .field("region", &self.region)
            .field("registration_expires_at", &self.registration_expires_at)
            .field("start_url", &self.start_url)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) enum CachedSsoTokenError {
    FailedToFormatDateTime {
        source: Box<dyn StdError + Send + Sync>,
    },
    InvalidField {
        field: &'static str,
        source: Box<dyn StdError + Send + Sync>,
    },
    IoError {
        what: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    JsonError(Box<dyn StdError + Send + Sync>),
    MissingField(&'static str),
    NoHomeDirectory,
}

impl CachedSsoTokenError {
    /// True if the cache file does not exist
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(
            self,
            CachedSsoTokenError::IoError { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

impl fmt::Display for CachedSsoTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedToFormatDateTime { .. } => write!(f, "failed to format date time"),
            Self::InvalidField { field, .. } => write!(
                f,
                "invalid value for the `{field}` field in the cached SSO token file"
            ),
            Self::IoError { what, path, .. } => write!(f, "failed to {what} `{}`", path.display()),
            Self::JsonError(_) => write!(f, "invalid JSON in cached SSO token file"),
            Self::MissingField(field) => {
                write!(f, "missing field `{field}` in cached SSO token file")
            }
            Self::NoHomeDirectory => write!(f, "couldn't resolve a home directory"),
        }
    }
}

impl StdError for CachedSsoTokenError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::FailedToFormatDateTime { source } => Some(source.as_ref()),
            Self::InvalidField { source, .. } => Some(source.as_ref()),
            Self::IoError { source, .. } => Some(source),
            Self::JsonError(source) => Some(source.as_ref()),
            Self::MissingField(_) => None,
            Self::NoHomeDirectory => None,
        }
    }
}

impl From<serde_json::Error> for CachedSsoTokenError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.into())
    }
}

/// On-disk shape. Every field is optional here so that missing fields are reported by name.
#[derive(Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    registration_expires_at: Option<String>,
}

/// Determine the SSO cached token path for a given identifier.
///
/// The `identifier` is the `sso_start_url` for the legacy flow, or the `sso_session` name for the
/// session flow. The file name matches the AWS CLI: the hex SHA-1 of the identifier.
fn cached_token_path(identifier: &str, home: &Path) -> PathBuf {
    let mut out = home.join(".aws").join("sso").join("cache");
    out.push(hex::encode(Sha1::digest(identifier.as_bytes())));
    out.set_extension("json");
    out
}

fn cache_path(env: &Env, identifier: &str) -> Result<PathBuf, CachedSsoTokenError> {
    let home = home_dir(env, Os::real()).ok_or(CachedSsoTokenError::NoHomeDirectory)?;
    Ok(cached_token_path(identifier, &home))
}

/// Load the token for `identifier` from `~/.aws/sso/cache/<hashofidentifier>.json`
pub(crate) async fn load_cached_token(
    env: &Env,
    fs: &Fs,
    identifier: &str,
) -> Result<CachedSsoToken, CachedSsoTokenError> {
    let path = cache_path(env, identifier)?;
    tracing::debug!(path = %path.display(), "loading cached SSO token");
    let data = Zeroizing::new(fs.read_to_end(&path).await.map_err(|source| {
        CachedSsoTokenError::IoError {
            what: "read",
            path,
            source,
        }
    })?);
    parse_cached_token(&data)
}

fn parse_cached_token(data: &[u8]) -> Result<CachedSsoToken, CachedSsoTokenError> {
    let file: CacheFile = serde_json::from_slice(data)?;
    let access_token = file
        .access_token
        .map(Zeroizing::new)
        .ok_or(CachedSsoTokenError::MissingField("accessToken"))?;
    let expires_at = file
        .expires_at
        .ok_or(CachedSsoTokenError::MissingField("expiresAt"))?;
    let expires_at = parse_timestamp("expiresAt", &expires_at)?;
    let registration_expires_at = file
        .registration_expires_at
        .map(|value| parse_timestamp("registrationExpiresAt", &value))
        .transpose()?;
    Ok(CachedSsoToken {
        access_token,
        client_id: file.client_id,
        client_secret: file.client_secret.map(Zeroizing::new),
        expires_at,
        refresh_token: file.refresh_token.map(Zeroizing::new),
        region: file.region,
        registration_expires_at,
        start_url: file.start_url,
    })
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<SystemTime, CachedSsoTokenError> {
    parse_date_time(value).map_err(|err| CachedSsoTokenError::InvalidField {
        field,
        source: err.into(),
    })
}

fn format_timestamp(time: SystemTime) -> Result<String, CachedSsoTokenError> {
    format_date_time(time)
        .map_err(|err| CachedSsoTokenError::FailedToFormatDateTime { source: err.into() })
}

/// Save the token for `identifier` to `~/.aws/sso/cache/<hashofidentifier>.json`
///
/// The file is replaced atomically so that concurrent readers never observe a partial write.
pub(crate) async fn save_cached_token(
    env: &Env,
    fs: &Fs,
    identifier: &str,
    token: &CachedSsoToken,
) -> Result<(), CachedSsoTokenError> {
    let path = cache_path(env, identifier)?;
    let file = CacheFile {
        start_url: token.start_url.clone(),
        region: token.region.clone(),
        access_token: Some(token.access_token.to_string()),
        expires_at: Some(format_timestamp(token.expires_at)?),
        client_id: token.client_id.clone(),
        client_secret: token.client_secret.as_ref().map(|s| s.to_string()),
        refresh_token: token.refresh_token.as_ref().map(|s| s.to_string()),
        registration_expires_at: token
            .registration_expires_at
            .map(format_timestamp)
            .transpose()?,
    };
    let out = Zeroizing::new(serde_json::to_vec(&file)?);
    fs.write(&path, out.as_slice())
        .await
        .map_err(|source| CachedSsoTokenError::IoError {
            what: "write",
            path,
            source,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn epoch_secs(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn determine_correct_cache_filenames() {
        assert_eq!(
            "/home/someuser/.aws/sso/cache/d033e22ae348aeb5660fc2140aec35850c4da997.json",
            cached_token_path("admin", Path::new("/home/someuser"))
                .as_os_str()
                .to_string_lossy()
        );
        assert_eq!(
            "/home/someuser/.aws/sso/cache/75e4d41276d8bd17f85986fc6cccef29fd725ce3.json",
            cached_token_path("dev-scopes", Path::new("/home/someuser"))
                .as_os_str()
                .to_string_lossy()
        );
        assert_eq!(
            "/home/me/.aws/sso/cache/13f9d35043871d073ab260e020f0ffde092cb14b.json",
            cached_token_path("https://d-92671207e4.awsapps.com/start", Path::new("/home/me"))
                .as_os_str()
                .to_string_lossy()
        );
    }

    #[test]
    fn parse_legacy_token() {
        let data = br#"{
            "startUrl": "https://d-123.awsapps.com/start",
            "region": "us-west-2",
            "accessToken": "cachedtoken",
            "expiresAt": "2021-12-25T21:30:00UTC"
        }"#;
        let token = parse_cached_token(data).expect("success");
        assert_eq!("cachedtoken", token.access_token.as_str());
        assert_eq!(epoch_secs(1640467800), token.expires_at);
        assert_eq!(Some("us-west-2"), token.region.as_deref());
        assert_eq!(
            Some("https://d-123.awsapps.com/start"),
            token.start_url.as_deref()
        );
        assert!(token.refresh_token.is_none());
        assert!(!token.registration_is_valid(epoch_secs(0)));
    }

    #[test]
    fn parse_session_token() {
        let data = br#"{
            "accessToken": "cachedtoken",
            "expiresAt": "2021-12-25T21:30:00Z",
            "refreshToken": "cachedrefreshtoken",
            "clientId": "clientid",
            "clientSecret": "YSBzZWNyZXQ=",
            "registrationExpiresAt": "2022-12-25T13:30:00Z",
            "region": "ap-northeast-1",
            "startUrl": "https://d-123.awsapps.com/start"
        }"#;
        let token = parse_cached_token(data).expect("success");
        assert_eq!(Some("cachedrefreshtoken"), token.refresh_token.as_deref().map(String::as_str));
        assert_eq!(Some("clientid"), token.client_id.as_deref());
        assert_eq!(Some(epoch_secs(1671975000)), token.registration_expires_at);
        assert!(token.registration_is_valid(epoch_secs(1671974999)));
        assert!(!token.registration_is_valid(epoch_secs(1671975000)));
    }

    #[test]
    fn parse_missing_fields() {
        let missing_access_token = br#"{"expiresAt": "2021-12-25T21:30:00Z"}"#;
        let err = parse_cached_token(missing_access_token).expect_err("missing accessToken");
        assert!(
            matches!(err, CachedSsoTokenError::MissingField("accessToken")),
            "{err:?}"
        );

        let missing_expires_at = br#"{"accessToken": "token"}"#;
        let err = parse_cached_token(missing_expires_at).expect_err("missing expiresAt");
        assert!(
            matches!(err, CachedSsoTokenError::MissingField("expiresAt")),
            "{err:?}"
        );

        let bad_date = br#"{"accessToken": "token", "expiresAt": "tomorrow"}"#;
        let err = parse_cached_token(bad_date).expect_err("bad date");
        assert!(
            matches!(err, CachedSsoTokenError::InvalidField { field: "expiresAt", .. }),
            "{err:?}"
        );

        let err = parse_cached_token(b"not json").expect_err("not json");
        assert!(matches!(err, CachedSsoTokenError::JsonError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn load_token_from_cache() {
        let env = Env::from_slice(&[("HOME", "/home/user")]);
        let fs = Fs::from_map({
            let mut map = HashMap::new();
            map.insert(
                "/home/user/.aws/sso/cache/13f9d35043871d073ab260e020f0ffde092cb14b.json".to_string(),
                br#"{"accessToken": "secret-access-token", "expiresAt": "2021-12-25T21:30:00Z"}"#
                    .to_vec(),
            );
            map
        });
        let token = load_cached_token(&env, &fs, "https://d-92671207e4.awsapps.com/start")
            .await
            .expect("success");
        assert_eq!("secret-access-token", token.access_token.as_str());
        assert!(!format!("{token:?}").contains("secret-access-token"));
    }

    #[tokio::test]
    async fn error_on_missing_file() {
        let err = load_cached_token(
            &Env::from_slice(&[("HOME", "/home")]),
            &Fs::from_slice(&[]),
            "asdf",
        )
        .await
        .expect_err("should fail, file is missing");
        assert!(err.is_not_found(), "{err:?}");
    }

    #[tokio::test]
    async fn error_without_home_directory() {
        let err = load_cached_token(&Env::from_slice(&[]), &Fs::from_slice(&[]), "asdf")
            .await
            .expect_err("no home");
        assert!(matches!(err, CachedSsoTokenError::NoHomeDirectory));
    }

    #[tokio::test]
    async fn save_then_load_preserves_every_field() {
        let env = Env::from_slice(&[("HOME", "/home/user")]);
        let fs = Fs::from_slice(&[]);
        let token = CachedSsoToken {
            access_token: Zeroizing::new("access".into()),
            client_id: Some("clientid".into()),
            client_secret: Some(Zeroizing::new("clientsecret".into())),
            expires_at: epoch_secs(1640467800),
            refresh_token: Some(Zeroizing::new("refresh".into())),
            region: Some("us-west-2".into()),
            registration_expires_at: Some(epoch_secs(1671975000)),
            start_url: Some("https://d-123.awsapps.com/start".into()),
        };
        save_cached_token(&env, &fs, "my-session", &token)
            .await
            .expect("saved");

        let loaded = load_cached_token(&env, &fs, "my-session")
            .await
            .expect("loaded");
        assert_eq!(token.access_token, loaded.access_token);
        assert_eq!(token.client_id, loaded.client_id);
        assert_eq!(token.client_secret, loaded.client_secret);
        assert_eq!(token.expires_at, loaded.expires_at);
        assert_eq!(token.refresh_token, loaded.refresh_token);
        assert_eq!(token.region, loaded.region);
        assert_eq!(token.registration_expires_at, loaded.registration_expires_at);
        assert_eq!(token.start_url, loaded.start_url);
    }

    #[tokio::test]
    async fn saved_file_uses_cli_field_names() {
        let env = Env::from_slice(&[("HOME", "/home/user")]);
        let fs = Fs::from_slice(&[]);
        let token = CachedSsoToken {
            access_token: Zeroizing::new("access".into()),
            client_id: None,
            client_secret: None,
            expires_at: epoch_secs(1640467800),
            refresh_token: None,
            region: Some("us-west-2".into()),
            registration_expires_at: None,
            start_url: Some("https://d-92671207e4.awsapps.com/start".into()),
        };
        save_cached_token(&env, &fs, "https://d-92671207e4.awsapps.com/start", &token)
            .await
            .expect("saved");
        let raw = fs
            .read_to_end(
                "/home/user/.aws/sso/cache/13f9d35043871d073ab260e020f0ffde092cb14b.json",
            )
            .await
            .expect("written under the hashed start url");
        let json: serde_json::Value = serde_json::from_slice(&raw).expect("valid json");
        assert_eq!(
            serde_json::json!({
                "startUrl": "https://d-92671207e4.awsapps.com/start",
                "region": "us-west-2",
                "accessToken": "access",
                "expiresAt": "2021-12-25T21:30:00Z"
            }),
            json
        );
    }
}
