/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Time source abstraction so that expiry checks can be tested.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Trait with a `now()` function returning the current time
pub trait TimeSource: Debug + Send + Sync {
    /// Returns the current time
    fn now(&self) -> SystemTime;
}

/// Time source delegating to `SystemTime::now()`
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Creates a new SystemTimeSource
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Time source that always returns the same time
#[derive(Debug, Clone, Copy)]
pub struct StaticTimeSource {
    time: SystemTime,
}

impl StaticTimeSource {
    /// Creates a new static time source that always returns the same time
    pub fn new(time: SystemTime) -> Self {
        Self { time }
    }

    /// Creates a new static time source from the provided number of seconds since the UNIX epoch
    pub fn from_secs(epoch_secs: u64) -> Self {
        Self::new(SystemTime::UNIX_EPOCH + Duration::from_secs(epoch_secs))
    }
}

impl TimeSource for StaticTimeSource {
    fn now(&self) -> SystemTime {
        self.time
    }
}

/// Wrapper type for sharable [`TimeSource`]
#[derive(Debug, Clone)]
pub struct SharedTimeSource(Arc<dyn TimeSource>);

impl SharedTimeSource {
    /// Returns the current time
    pub fn now(&self) -> SystemTime {
        self.0.now()
    }

    /// Creates a new shared time source
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self(Arc::new(source))
    }
}

impl Default for SharedTimeSource {
    fn default() -> Self {
        SharedTimeSource(Arc::new(SystemTimeSource))
    }
}

impl TimeSource for SharedTimeSource {
    fn now(&self) -> SystemTime {
        self.0.now()
    }
}

/// Time Source that can be manually moved for tests
///
/// Clones share the same clock: advancing one advances all of them.
///
/// # Examples
///
/// ```rust
/// use aws_credential_types::time_source::{SharedTimeSource, TestingTimeSource};
/// use std::time::{UNIX_EPOCH, Duration};
/// let mut time = TestingTimeSource::new(UNIX_EPOCH);
/// let shared = SharedTimeSource::new(time.clone());
/// time.advance(Duration::from_secs(100));
/// assert_eq!(UNIX_EPOCH + Duration::from_secs(100), shared.now());
/// ```
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone, Debug)]
pub struct TestingTimeSource {
    now: Arc<std::sync::Mutex<SystemTime>>,
}

#[cfg(any(test, feature = "test-util"))]
impl TestingTimeSource {
    /// Creates `TestingTimeSource` with `start_time`.
    pub fn new(start_time: SystemTime) -> Self {
        Self {
            now: Arc::new(std::sync::Mutex::new(start_time)),
        }
    }

    /// Sets time to the specified `time`.
    pub fn set_time(&mut self, time: SystemTime) {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = time;
    }

    /// Advances time by `delta`.
    pub fn advance(&mut self, delta: Duration) {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner) += delta;
    }
}

#[cfg(any(test, feature = "test-util"))]
impl TimeSource for TestingTimeSource {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::{TestingTimeSource, TimeSource};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn testing_time_source_should_behave_as_expected() {
        let mut time_source = TestingTimeSource::new(UNIX_EPOCH);
        assert_eq!(time_source.now(), UNIX_EPOCH);
        time_source.advance(Duration::from_secs(10));
        assert_eq!(time_source.now(), UNIX_EPOCH + Duration::from_secs(10));
        time_source.set_time(UNIX_EPOCH);
        assert_eq!(time_source.now(), UNIX_EPOCH);
    }
}
