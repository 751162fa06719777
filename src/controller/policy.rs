// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timing and retry budget for verified switching.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MisuseError;

/// Timing and retry budget for a [`VerifiedSwitch`](super::VerifiedSwitch).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use powerstrip_lib::controller::RetryPolicy;
///
/// // One switch, one read-back, no retries
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_retries(), 0);
///
/// let policy = RetryPolicy::new()
///     .with_max_retries(3)
///     .with_command_interval(Duration::from_millis(800))
///     .with_retry_interval(Duration::from_secs(10));
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    max_retries: u32,
    command_interval: Duration,
    settle_delay: Duration,
    retry_interval: Duration,
}

impl RetryPolicy {
    /// Default pause before each switch command.
    pub const DEFAULT_COMMAND_INTERVAL: Duration = Duration::from_millis(700);
    /// Default pause between switching and reading back.
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1200);
    /// Default pause before each retry round.
    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
    /// Shortest command interval the appliances tolerate.
    pub const MIN_COMMAND_INTERVAL: Duration = Duration::from_millis(700);

    /// Creates a policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many retry rounds may follow the first verification.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the pause before each switch command.
    ///
    /// Not checked here; call [`validate`](Self::validate) before driving
    /// real hardware.
    #[must_use]
    pub fn with_command_interval(mut self, interval: Duration) -> Self {
        self.command_interval = interval;
        self
    }

    /// Sets the pause between switching and reading back.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the pause before each retry round.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Returns the retry budget.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the command interval.
    #[must_use]
    pub fn command_interval(&self) -> Duration {
        self.command_interval
    }

    /// Returns the settle delay.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Returns the retry interval.
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Checks the policy against the appliances' limits.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::CommandIntervalTooShort` if the command
    /// interval is below [`MIN_COMMAND_INTERVAL`](Self::MIN_COMMAND_INTERVAL).
    pub fn validate(&self) -> Result<(), MisuseError> {
        if self.command_interval < Self::MIN_COMMAND_INTERVAL {
            return Err(MisuseError::CommandIntervalTooShort {
                min: Self::MIN_COMMAND_INTERVAL,
                actual: self.command_interval,
            });
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            command_interval: Self::DEFAULT_COMMAND_INTERVAL,
            settle_delay: Self::DEFAULT_SETTLE_DELAY,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
        }
    }
}
