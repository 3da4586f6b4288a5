/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Caching for credentials and other expiring values.

mod expiring_cache;
mod lazy_caching;

pub use expiring_cache::ExpiringCache;
pub use lazy_caching::{builder, LazyCachingCredentialsProvider};
