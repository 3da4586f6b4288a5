/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A future that is either immediately ready or boxed and awaited later.

use pin_project_lite::pin_project;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Future with an explicit `Now` variant
    ///
    /// When a future is immediately ready, this avoids the allocation of a boxed future.
    pub(crate) struct NowOrLater<T, F> {
        #[pin]
        inner: Inner<T, F>
    }
}

impl<T, F> fmt::Debug for NowOrLater<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NowOrLater").finish_non_exhaustive()
    }
}

pin_project! {
    #[project = NowOrLaterProj]
    enum Inner<T, F> {
        Now { value: Option<T> },
        Later { #[pin] future: F },
    }
}

impl<T, F> NowOrLater<T, F> {
    pub(crate) fn new(future: F) -> Self {
        Self {
            inner: Inner::Later { future },
        }
    }

    pub(crate) fn ready(value: T) -> Self {
        let value = Some(value);
        Self {
            inner: Inner::Now { value },
        }
    }
}

impl<T, F> Future for NowOrLater<T, F>
where
    F: Future<Output = T>,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().inner.project() {
            NowOrLaterProj::Now { value } => {
                Poll::Ready(value.take().expect("cannot be called twice"))
            }
            NowOrLaterProj::Later { future } => future.poll(cx),
        }
    }
}
