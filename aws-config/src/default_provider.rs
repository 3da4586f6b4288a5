/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Providers that implement the default AWS provider chain
//!
//! Default credentials provider chain is available via [`credentials::DefaultCredentialsChain`].

/// Default credentials provider chain
pub mod credentials;
