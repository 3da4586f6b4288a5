/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Meta-providers that augment existing credentials providers with new behavior

mod chain;

pub use chain::CredentialsProviderChain;
