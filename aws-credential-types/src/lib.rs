/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! AWS credential types and the interfaces credential providers implement.
//!
//! ## Implementing your own credentials provider
//!
//! [`Credentials`] implement [`ProvideCredentials`](provider::ProvideCredentials) directly, so static
//! credentials need no custom provider. Dynamically loaded credentials are best provided by defining
//! an inherent `async fn` on your structure, then calling it from the trait implementation:
//!
//! ```rust
//! use aws_credential_types::provider::{self, error::CredentialsError, future};
//! use aws_credential_types::Credentials;
//!
//! #[derive(Debug)]
//! struct SubprocessCredentialProvider;
//!
//! async fn invoke_command(command: &str) -> String {
//!     // implementation elided...
//!     # String::from("akid\nsecret")
//! }
//!
//! /// Parse access key and secret from the first two lines of a string
//! fn parse_credentials(creds: &str) -> provider::Result {
//!     let mut lines = creds.lines();
//!     let akid = lines.next().ok_or_else(|| CredentialsError::provider_error("invalid credentials"))?;
//!     let secret = lines.next().ok_or_else(|| CredentialsError::provider_error("invalid credentials"))?;
//!     Ok(Credentials::new(akid, secret, None, None, "CustomCommand"))
//! }
//!
//! impl SubprocessCredentialProvider {
//!     async fn load_credentials(&self) -> provider::Result {
//!         let creds = invoke_command("load-credentials.py").await;
//!         parse_credentials(&creds)
//!     }
//! }
//!
//! impl provider::ProvideCredentials for SubprocessCredentialProvider {
//!     fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
//!     where
//!         Self: 'a,
//!     {
//!         future::ProvideCredentials::new(self.load_credentials())
//!     }
//! }
//! ```

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub mod cache;
pub mod credential_fn;
mod credentials_impl;
pub mod provider;
pub mod rt;
pub mod time_source;
mod token_impl;

pub use credentials_impl::{Credentials, CredentialsBuilder};
pub use token_impl::AccessToken;
