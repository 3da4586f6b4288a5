/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! Shared types for AWS credential providers.
//!
//! Credential providers never touch the process environment or the file system directly. They go
//! through [`Env`](os_shim_internal::Env) and [`Fs`](os_shim_internal::Fs) so that tests can swap
//! in fakes.

pub mod fs_util;
pub mod os_shim_internal;
pub mod region;

pub use region::Region;
