/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Async runtime abstractions: sleeping and timeouts.

pub(crate) mod now_or_later;
pub mod sleep;
pub mod timeout;
