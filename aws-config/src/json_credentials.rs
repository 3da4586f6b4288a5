/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Parsing of the JSON credential documents returned by the ECS and IMDS endpoints, plus the
//! timestamp helpers shared by the JSON based providers.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug)]
pub(crate) enum InvalidJsonCredentials {
    /// The response did not contain valid JSON
    JsonError(Box<dyn Error + Send + Sync>),
    /// The response was missing a required field
    MissingField(&'static str),

    /// A field was invalid
    InvalidField {
        field: &'static str,
        err: Box<dyn Error + Send + Sync>,
    },

    /// Another unhandled error occurred
    Other(Cow<'static, str>),
}

impl From<serde_json::Error> for InvalidJsonCredentials {
    fn from(err: serde_json::Error) -> Self {
        InvalidJsonCredentials::JsonError(err.into())
    }
}

impl Display for InvalidJsonCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidJsonCredentials::JsonError(json) => {
                write!(f, "invalid JSON in response: {json}")
            }
            InvalidJsonCredentials::MissingField(field) => write!(
                f,
                "Expected field `{field}` in response but it was missing",
            ),
            InvalidJsonCredentials::Other(msg) => write!(f, "{msg}"),
            InvalidJsonCredentials::InvalidField { field, err } => {
                write!(f, "Invalid field in response: `{field}`. {err}")
            }
        }
    }
}

impl Error for InvalidJsonCredentials {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InvalidJsonCredentials::JsonError(err) => Some(err.as_ref()),
            InvalidJsonCredentials::InvalidField { err, .. } => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RefreshableCredentials<'a> {
    pub(crate) access_key_id: Cow<'a, str>,
    pub(crate) secret_access_key: Cow<'a, str>,
    pub(crate) session_token: Cow<'a, str>,
    pub(crate) account_id: Option<Cow<'a, str>>,
    pub(crate) expiration: SystemTime,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum JsonCredentials<'a> {
    RefreshableCredentials(RefreshableCredentials<'a>),
    Error {
        code: Cow<'a, str>,
        message: Cow<'a, str>,
    },
}

/// Deserialize an IMDS or ECS credential document
///
/// A successful document looks like:
/// ```json
/// {
///   "Code" : "Success",
///   "LastUpdated" : "2021-09-17T20:57:08Z",
///   "Type" : "AWS-HMAC",
///   "AccessKeyId" : "ASIARTEST",
///   "SecretAccessKey" : "xjtest",
///   "Token" : "IQote///test",
///   "Expiration" : "2021-09-18T03:31:56Z"
/// }
/// ```
///
/// Keys are matched case-insensitively. `Code` is optional (the ECS endpoint omits it); any value
/// other than `Success` is an error document carrying `Message`.
pub(crate) fn parse_json_credentials(
    credentials_response: &str,
) -> Result<JsonCredentials<'_>, InvalidJsonCredentials> {
    let document: Value = serde_json::from_str(credentials_response)?;
    let fields = document.as_object().ok_or(InvalidJsonCredentials::Other(
        "expected a JSON document starting with `{`".into(),
    ))?;

    let code = string_field(fields, "Code")?;
    match code {
        // IMDS does not appear to reply with a `Code` missing, but documentation indicates it
        // may be possible
        None | Some("Success") => {
            let access_key_id =
                string_field(fields, "AccessKeyId")?.ok_or(InvalidJsonCredentials::MissingField("AccessKeyId"))?;
            let secret_access_key = string_field(fields, "SecretAccessKey")?
                .ok_or(InvalidJsonCredentials::MissingField("SecretAccessKey"))?;
            let session_token =
                string_field(fields, "Token")?.ok_or(InvalidJsonCredentials::MissingField("Token"))?;
            let expiration =
                string_field(fields, "Expiration")?.ok_or(InvalidJsonCredentials::MissingField("Expiration"))?;
            let expiration = parse_date_time(expiration).map_err(|err| {
                InvalidJsonCredentials::InvalidField {
                    field: "Expiration",
                    err: err.into(),
                }
            })?;
            Ok(JsonCredentials::RefreshableCredentials(
                RefreshableCredentials {
                    access_key_id: Cow::Owned(access_key_id.to_owned()),
                    secret_access_key: Cow::Owned(secret_access_key.to_owned()),
                    session_token: Cow::Owned(session_token.to_owned()),
                    account_id: string_field(fields, "AccountId")?
                        .map(|account_id| Cow::Owned(account_id.to_owned())),
                    expiration,
                },
            ))
        }
        Some(other) => Ok(JsonCredentials::Error {
            code: Cow::Owned(other.to_owned()),
            message: Cow::Owned(
                string_field(fields, "Message")?
                    .unwrap_or("no message")
                    .to_owned(),
            ),
        }),
    }
}

/// Looks up `name` case-insensitively; `null` counts as absent.
pub(crate) fn string_field<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
) -> Result<Option<&'a str>, InvalidJsonCredentials> {
    match fields
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
    {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(InvalidJsonCredentials::InvalidField {
            field: name,
            err: "expected a string".into(),
        }),
    }
}

/// Parses an RFC 3339 timestamp. The `UTC` suffix written by some versions of the AWS CLI is
/// accepted in place of `Z`.
pub(crate) fn parse_date_time(value: &str) -> Result<SystemTime, time::error::Parse> {
    let normalized: Cow<'_, str> = match value.strip_suffix("UTC") {
        Some(prefix) => Cow::Owned(format!("{prefix}Z")),
        None => Cow::Borrowed(value),
    };
    Ok(OffsetDateTime::parse(&normalized, &Rfc3339)?.into())
}

/// Formats `time` as an RFC 3339 timestamp in UTC with second precision
pub(crate) fn format_date_time(time: SystemTime) -> Result<String, time::error::Format> {
    let time = OffsetDateTime::from(time);
    let time = time.replace_nanosecond(0).unwrap_or(time);
    time.format(&Rfc3339)
}
