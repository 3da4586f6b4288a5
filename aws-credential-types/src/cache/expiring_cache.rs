/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, SystemTime};

type SharedLoad<T, E> = Shared<BoxFuture<'static, Result<(T, SystemTime), E>>>;

/// Expiry-aware cache that deduplicates concurrent loads
///
/// `ExpiringCache` holds at most one value together with its expiry. A value is considered
/// expired once `now` reaches `expiry - buffer_time`. Callers that find the value missing or
/// expired all join a single in-flight load: the first caller installs it, later callers clone
/// its handle. The load keeps running as long as any caller polls it, so a caller that gives up
/// (for example, because of a timeout) does not cancel the load for the others, and a later
/// caller resumes a load that every earlier caller abandoned.
pub struct ExpiringCache<T, E> {
    buffer_time: Duration,
    state: Arc<Mutex<State<T, E>>>,
}

struct State<T, E> {
    value: Option<(T, SystemTime)>,
    in_flight: Option<SharedLoad<T, E>>,
    // bumped by `clear` so that loads started before it do not repopulate the cache
    generation: u64,
}

impl<T, E> Clone for ExpiringCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            buffer_time: self.buffer_time,
            state: self.state.clone(),
        }
    }
}

impl<T, E> fmt::Debug for ExpiringCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("buffer_time", &self.buffer_time)
            .finish_non_exhaustive()
    }
}

fn lock<T, E>(state: &Mutex<State<T, E>>) -> MutexGuard<'_, State<T, E>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn expired(expiry: SystemTime, buffer_time: Duration, now: SystemTime) -> bool {
    now >= expiry.checked_sub(buffer_time).unwrap_or(SystemTime::UNIX_EPOCH)
}

impl<T, E> ExpiringCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates `ExpiringCache` with the given `buffer_time`.
    pub fn new(buffer_time: Duration) -> Self {
        ExpiringCache {
            buffer_time,
            state: Arc::new(Mutex::new(State {
                value: None,
                in_flight: None,
                generation: 0,
            })),
        }
    }

    /// Returns the cached value if it is still valid at `now`, and clears it otherwise.
    pub fn yield_or_clear_if_expired(&self, now: SystemTime) -> Option<T> {
        let mut state = lock(&self.state);
        match &state.value {
            Some((value, expiry)) if !expired(*expiry, self.buffer_time, now) => {
                Some(value.clone())
            }
            Some(_) => {
                state.value = None;
                None
            }
            None => None,
        }
    }

    /// Returns the cached value if it is still valid at `now`; otherwise awaits the in-flight
    /// load, starting one with `f` if there is none.
    ///
    /// `f` is only invoked when this caller has to start the load. A successful load replaces the
    /// cached value. A failed load is reported to every caller that awaited it and leaves the cache
    /// empty, so the next call starts a new load.
    pub async fn get_or_load<F, Fut>(&self, now: SystemTime, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(T, SystemTime), E>> + Send + 'static,
    {
        let load = {
            let mut state = lock(&self.state);
            if let Some((value, expiry)) = &state.value {
                if !expired(*expiry, self.buffer_time, now) {
                    return Ok(value.clone());
                }
            }
            match &state.in_flight {
                Some(load) => {
                    tracing::trace!("joining in-flight load");
                    load.clone()
                }
                None => {
                    let load = Self::install(Arc::downgrade(&self.state), state.generation, f());
                    state.in_flight = Some(load.clone());
                    load
                }
            }
        };
        load.await.map(|(value, _expiry)| value)
    }

    fn install<Fut>(state: Weak<Mutex<State<T, E>>>, generation: u64, load: Fut) -> SharedLoad<T, E>
    where
        Fut: Future<Output = Result<(T, SystemTime), E>> + Send + 'static,
    {
        async move {
            // a panicking load must still detach itself, or every later caller would join it
            let result = AssertUnwindSafe(load).catch_unwind().await;
            if let Some(state) = state.upgrade() {
                let mut state = lock(&state);
                if state.generation == generation {
                    state.in_flight = None;
                    if let Ok(Ok((value, expiry))) = &result {
                        state.value = Some((value.clone(), *expiry));
                    }
                }
            }
            match result {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        .boxed()
        .shared()
    }

    /// Drops the cached value and detaches any in-flight load from the cache.
    ///
    /// Callers already awaiting a detached load still receive its result, but the result is not
    /// cached.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.value = None;
        state.in_flight = None;
        state.generation += 1;
    }
}
