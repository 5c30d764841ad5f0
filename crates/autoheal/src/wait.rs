//! Wait-until-present polling.
//!
//! A wait is a bounded polling loop on the calling thread: probe, sleep one
//! poll interval (never past the deadline), probe again. There is no
//! background task and no cancellation other than the deadline itself.

use std::time::{Duration, Instant};

use crate::locator::{Locator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{DriverError, DriverResult};

/// Options for a single wait-until-present attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Total budget for the attempt
    pub timeout: Duration,
    /// Pause between probes
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Timeout in whole milliseconds
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Polls a probe until it yields an element or the budget runs out
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter
    #[must_use]
    pub const fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Wait until `probe` returns `Ok(Some(_))`.
    ///
    /// The probe always runs at least once, even with a zero timeout.
    /// `NotFound` and `StaleReference` from the probe are treated like
    /// `Ok(None)` and polling continues; any other error aborts the wait.
    ///
    /// # Errors
    ///
    /// [`DriverError::Timeout`] when the budget expires, or the first
    /// non-transient error the probe returned.
    pub fn until_present<T, F>(&self, locator: &Locator, mut probe: F) -> DriverResult<T>
    where
        F: FnMut() -> DriverResult<Option<T>>,
    {
        let start = Instant::now();

        loop {
            match probe() {
                Ok(Some(found)) => return Ok(found),
                Ok(None)
                | Err(DriverError::NotFound { .. } | DriverError::StaleReference { .. }) => {}
                Err(other) => return Err(other),
            }

            let elapsed = start.elapsed();
            if elapsed >= self.options.timeout {
                return Err(DriverError::Timeout {
                    locator: locator.clone(),
                    ms: self.options.timeout_ms(),
                });
            }
            std::thread::sleep(self.options.poll_interval.min(self.options.timeout - elapsed));
        }
    }
}
