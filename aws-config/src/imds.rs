/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! IMDSv2 Client and Credentials Provider
//!
//! The [`Client`] speaks the session-oriented IMDSv2 protocol: a token is obtained with
//! `PUT /latest/api/token` and attached to every metadata request. The
//! [`ImdsCredentialsProvider`] uses it to load the credentials of the instance profile.

pub mod client;
pub mod credentials;

pub use client::Client;
pub use credentials::ImdsCredentialsProvider;

mod env {
    pub(super) const EC2_METADATA_DISABLED: &str = "AWS_EC2_METADATA_DISABLED";
    pub(super) const ENDPOINT: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";
    pub(super) const ENDPOINT_MODE: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT_MODE";
}
