/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The two SSO OIDC operations needed to refresh a session token: `RegisterClient` and
//! `CreateToken`.

use crate::http_client::{HttpClient, SharedHttpClient};
use crate::sso::ServiceError;
use aws_credential_types::provider::token::error::AccessTokenError;
use aws_types::region::Region;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

const CLIENT_NAME: &str = "aws-config";
const CLIENT_TYPE: &str = "public";
const REFRESH_TOKEN_GRANT: &str = "refresh_token";
const SSO_OIDC_SCOPE: &str = "sso:account:access";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterClientRequest<'a> {
    client_name: &'a str,
    client_type: &'a str,
    scopes: [&'a str; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RegisterClientOutput {
    pub(super) client_id: String,
    pub(super) client_secret: String,
    /// Seconds since the epoch
    pub(super) client_secret_expires_at: u64,
}

impl fmt::Debug for RegisterClientOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterClientOutput")
            .field("client_id", &self.client_id)
            .field("client_secret", &"** redacted **")
            .field("client_secret_expires_at", &self.client_secret_expires_at)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateTokenOutput {
    pub(super) access_token: String,
    /// Seconds until `access_token` expires
    pub(super) expires_in: u64,
    pub(super) refresh_token: Option<String>,
}

impl fmt::Debug for CreateTokenOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateTokenOutput")
            .field("access_token", &"** redacted **")
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &"** redacted **")
            .finish()
    }
}

/// A refresh-token grant
pub(super) struct RefreshGrant<'a> {
    pub(super) client_id: &'a str,
    pub(super) client_secret: &'a str,
    pub(super) refresh_token: &'a str,
}

fn endpoint(region: &Region, path: &str) -> String {
    format!("https://oidc.{region}.amazonaws.com{path}")
}

pub(super) async fn register_client(
    http_client: &SharedHttpClient,
    region: &Region,
) -> Result<RegisterClientOutput, AccessTokenError> {
    let body = RegisterClientRequest {
        client_name: CLIENT_NAME,
        client_type: CLIENT_TYPE,
        scopes: [SSO_OIDC_SCOPE],
    };
    send_json(
        http_client,
        "RegisterClient",
        endpoint(region, "/client/register"),
        &body,
    )
    .await
}

pub(super) async fn create_token(
    http_client: &SharedHttpClient,
    region: &Region,
    grant: RefreshGrant<'_>,
) -> Result<CreateTokenOutput, AccessTokenError> {
    let body = CreateTokenRequest {
        client_id: grant.client_id,
        client_secret: grant.client_secret,
        grant_type: REFRESH_TOKEN_GRANT,
        refresh_token: grant.refresh_token,
    };
    send_json(http_client, "CreateToken", endpoint(region, "/token"), &body).await
}

async fn send_json<I: Serialize, O: DeserializeOwned>(
    http_client: &SharedHttpClient,
    operation: &'static str,
    uri: String,
    input: &I,
) -> Result<O, AccessTokenError> {
    let body = serde_json::to_vec(input).map_err(AccessTokenError::unhandled)?;
    let request = http::Request::builder()
        .method(http::Method::POST)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(body))
        .map_err(AccessTokenError::unhandled)?;
    tracing::debug!(operation, "calling SSO OIDC");
    let response = http_client
        .call(request)
        .await
        .map_err(AccessTokenError::not_loaded)?;
    if !response.status().is_success() {
        return Err(AccessTokenError::provider_error(ServiceError::new(
            operation, &response,
        )));
    }
    serde_json::from_slice(response.body()).map_err(AccessTokenError::unhandled)
}
