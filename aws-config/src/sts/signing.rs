/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! SigV4 request signing for the STS requests made by the assume-role provider.
//!
//! The request must be fully built before signing: every header present when [`sign`] is called,
//! except `user-agent`, is signed.

use crate::http_client::HttpRequest;
use aws_credential_types::Credentials;
use hmac::{Hmac, Mac};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION, HOST, USER_AGENT};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt;
use std::time::SystemTime;
use time::OffsetDateTime;

const HMAC_256: &str = "AWS4-HMAC-SHA256";
const X_AMZ_DATE: &str = "x-amz-date";
const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

/// Characters that SigV4 leaves unescaped: `A-Z a-z 0-9 - _ . ~`
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Everything needed to sign a request besides the request itself
#[derive(Debug)]
pub(crate) struct SigningParams<'a> {
    pub(crate) credentials: &'a Credentials,
    pub(crate) region: &'a str,
    pub(crate) service: &'a str,
    pub(crate) time: SystemTime,
}

#[derive(Debug)]
pub(crate) enum SigningError {
    MissingAuthority,
    InvalidHeaderValue(http::header::InvalidHeaderValue),
    NonAsciiHeader(HeaderName),
}

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningError::MissingAuthority => write!(f, "request URI has no authority to sign"),
            SigningError::InvalidHeaderValue(_) => {
                write!(f, "signature could not be written as a header value")
            }
            SigningError::NonAsciiHeader(name) => {
                write!(f, "header `{name}` is not valid ASCII and cannot be signed")
            }
        }
    }
}

impl Error for SigningError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SigningError::InvalidHeaderValue(err) => Some(err),
            _ => None,
        }
    }
}

impl From<http::header::InvalidHeaderValue> for SigningError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        SigningError::InvalidHeaderValue(err)
    }
}

/// Sign `request` in place, adding `host`, `x-amz-date`, `x-amz-security-token` (when the
/// credentials carry a session token) and `authorization`.
pub(crate) fn sign(
    request: &mut HttpRequest,
    params: &SigningParams<'_>,
) -> Result<(), SigningError> {
    let date_time = format_date_time(params.time);
    let date = &date_time[..8];

    if !request.headers().contains_key(HOST) {
        let authority = request
            .uri()
            .authority()
            .ok_or(SigningError::MissingAuthority)?;
        let host = HeaderValue::try_from(authority.as_str())?;
        request.headers_mut().insert(HOST, host);
    }
    request
        .headers_mut()
        .insert(X_AMZ_DATE, HeaderValue::try_from(date_time.as_str())?);
    if let Some(token) = params.credentials.session_token() {
        let mut token = HeaderValue::try_from(token)?;
        token.set_sensitive(true);
        request.headers_mut().insert(X_AMZ_SECURITY_TOKEN, token);
    }

    let (canonical_request, signed_headers) = canonical_request(request)?;
    tracing::trace!(canonical_request = %canonical_request, "computed canonical request");
    let scope = format!("{date}/{}/{}/aws4_request", params.region, params.service);
    let string_to_sign = format!(
        "{HMAC_256}\n{date_time}\n{scope}\n{}",
        sha256_hex_string(canonical_request.as_bytes())
    );

    let signing_key = generate_signing_key(
        params.credentials.secret_access_key(),
        date,
        params.region,
        params.service,
    );
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));
    let authorization = format!(
        "{HMAC_256} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        params.credentials.access_key_id()
    );
    let mut authorization = HeaderValue::try_from(authorization)?;
    authorization.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, authorization);
    Ok(())
}

/// Returns the canonical request and its signed-headers list
fn canonical_request(request: &HttpRequest) -> Result<(String, String), SigningError> {
    let mut headers: Vec<(&str, String)> = Vec::with_capacity(request.headers().len());
    for name in request.headers().keys() {
        // proxies may rewrite the user agent
        if name == USER_AGENT {
            continue;
        }
        let mut values = Vec::new();
        for value in request.headers().get_all(name) {
            let value = value
                .to_str()
                .map_err(|_| SigningError::NonAsciiHeader(name.clone()))?;
            values.push(normalize_header_value(value));
        }
        headers.push((name.as_str(), values.join(",")));
    }
    headers.sort_by(|a, b| a.0.cmp(b.0));

    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");
    let path = match request.uri().path() {
        "" => "/",
        path => path,
    };

    let mut canonical = String::new();
    canonical.push_str(request.method().as_str());
    canonical.push('\n');
    canonical.push_str(path);
    canonical.push('\n');
    canonical.push_str(&canonical_query(request.uri().query()));
    canonical.push('\n');
    for (name, value) in &headers {
        canonical.push_str(name);
        canonical.push(':');
        canonical.push_str(value);
        canonical.push('\n');
    }
    canonical.push('\n');
    canonical.push_str(&signed_headers);
    canonical.push('\n');
    canonical.push_str(&sha256_hex_string(request.body()));
    Ok((canonical, signed_headers))
}

fn canonical_query(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };
    let mut params: Vec<(String, String)> = query
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            (encode(key), encode(value))
        })
        .collect();
    params.sort();
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

// re-encode so that already-escaped input is escaped exactly once
fn encode(component: &str) -> String {
    let decoded = percent_decode_str(component).decode_utf8_lossy();
    utf8_percent_encode(&decoded, UNRESERVED).to_string()
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_date_time(time: SystemTime) -> String {
    let time = OffsetDateTime::from(time);
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        time.year(),
        u8::from(time.month()),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
}

fn sha256_hex_string(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn generate_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    // kSecret = your secret access key
    // kDate = HMAC("AWS4" + kSecret, Date)
    // kRegion = HMAC(kDate, Region)
    // kService = HMAC(kRegion, Service)
    // kSigning = HMAC(kService, "aws4_request")
    let secret = format!("AWS4{secret}");
    let key = hmac_sha256(secret.as_bytes(), date.as_bytes());
    let key = hmac_sha256(&key, region.as_bytes());
    let key = hmac_sha256(&key, service.as_bytes());
    hmac_sha256(&key, b"aws4_request")
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, UNIX_EPOCH};

    fn example_credentials() -> Credentials {
        Credentials::from_keys(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            None,
        )
    }

    fn example_time() -> SystemTime {
        // 20150830T123600Z
        UNIX_EPOCH + Duration::from_secs(1_440_938_160)
    }

    fn iam_request() -> HttpRequest {
        http::Request::builder()
            .method("GET")
            .uri("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08")
            .header(
                "content-type",
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn canonical_request_matches_the_documented_example() {
        let mut request = iam_request();
        request
            .headers_mut()
            .insert(HOST, HeaderValue::from_static("iam.amazonaws.com"));
        request
            .headers_mut()
            .insert(X_AMZ_DATE, HeaderValue::from_static("20150830T123600Z"));
        let (canonical, signed_headers) = canonical_request(&request).unwrap();
        assert_eq!(
            "GET\n/\nAction=ListUsers&Version=2010-05-08\n\
             content-type:application/x-www-form-urlencoded; charset=utf-8\n\
             host:iam.amazonaws.com\n\
             x-amz-date:20150830T123600Z\n\n\
             content-type;host;x-amz-date\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            canonical
        );
        assert_eq!("content-type;host;x-amz-date", signed_headers);
        assert_eq!(
            "f536975d06c0309214f805bb90ccff089219ecd68b2577efef23edd43b7e1a59",
            sha256_hex_string(canonical.as_bytes())
        );
    }

    #[test]
    fn sign_documented_example() {
        let credentials = example_credentials();
        let mut request = iam_request();
        sign(
            &mut request,
            &SigningParams {
                credentials: &credentials,
                region: "us-east-1",
                service: "iam",
                time: example_time(),
            },
        )
        .unwrap();
        assert_eq!(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7",
            request.headers()[AUTHORIZATION].to_str().unwrap()
        );
        assert_eq!("20150830T123600Z", request.headers()[X_AMZ_DATE]);
        assert_eq!("iam.amazonaws.com", request.headers()[HOST]);
    }

    #[test]
    fn session_token_is_signed() {
        let credentials = Credentials::from_keys(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            Some("session-token".to_string()),
        );
        let mut request = iam_request();
        sign(
            &mut request,
            &SigningParams {
                credentials: &credentials,
                region: "us-east-1",
                service: "iam",
                time: example_time(),
            },
        )
        .unwrap();
        assert_eq!("session-token", request.headers()[X_AMZ_SECURITY_TOKEN]);
        let authorization = request.headers()[AUTHORIZATION].to_str().unwrap();
        assert!(
            authorization
                .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token,"),
            "{authorization}"
        );
    }

    #[test]
    fn user_agent_is_not_signed() {
        let mut request = iam_request();
        request
            .headers_mut()
            .insert(USER_AGENT, HeaderValue::from_static("aws-config"));
        request
            .headers_mut()
            .insert(HOST, HeaderValue::from_static("iam.amazonaws.com"));
        let (_, signed_headers) = canonical_request(&request).unwrap();
        assert_eq!("content-type;host", signed_headers);
    }

    #[test]
    fn query_is_sorted_and_encoded() {
        assert_eq!(
            "a=%2F&b=c%20d&z=",
            canonical_query(Some("z=&b=c%20d&a=/"))
        );
        assert_eq!("", canonical_query(None));
    }

    #[test]
    fn header_values_are_trimmed() {
        assert_eq!("a b c", normalize_header_value("  a   b c "));
    }

    #[test]
    fn date_formatting() {
        assert_eq!("20150830T123600Z", format_date_time(example_time()));
    }
}
