/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! AWS credential providers.
//!
//! Most applications want the [default credentials chain](default_provider::credentials),
//! which checks environment variables, shared profile files, the ECS container endpoint and
//! the EC2 instance metadata service in that order, caching whatever it finds:
//!
//! ```no_run
//! use aws_config::default_provider::credentials::default_provider;
//! use aws_credential_types::provider::ProvideCredentials;
//!
//! # async fn example() {
//! let provider = default_provider();
//! let credentials = provider.provide_credentials().await;
//! # }
//! ```
//!
//! Individual providers live in their own modules and can be combined with
//! [`CredentialsProviderChain`](meta::credentials::CredentialsProviderChain).

pub mod default_provider;
pub mod ecs;
pub mod environment;
pub mod http_client;
pub mod imds;
pub mod meta;
pub mod profile;
pub mod provider_config;
pub mod sso;
pub mod sts;

mod json_credentials;
