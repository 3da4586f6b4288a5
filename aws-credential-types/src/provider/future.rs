/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Convenience `ProvideCredentials` struct that implements the `ProvideCredentials` trait.

use crate::rt::now_or_later::NowOrLater;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Future new-type that `ProvideCredentials::provide_credentials` must return.
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ProvideCredentials<'a>(NowOrLater<super::Result, BoxFuture<'a, super::Result>>);

impl<'a> ProvideCredentials<'a> {
    /// Creates a `ProvideCredentials` struct from a future.
    pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
        ProvideCredentials(NowOrLater::new(Box::pin(future)))
    }

    /// Creates a `ProvideCredentials` struct from a resolved credentials value.
    pub fn ready(credentials: super::Result) -> Self {
        ProvideCredentials(NowOrLater::ready(credentials))
    }
}

impl Future for ProvideCredentials<'_> {
    type Output = super::Result;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}
