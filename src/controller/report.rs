// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Result of a verified switch.

use serde::{Deserialize, Serialize};

use crate::types::{OutletAddress, OutletState, PowerAction};

/// Final verdict for one outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Read back in the expected state after the first switch.
    Confirmed,
    /// Read back in the expected state after retry round `round`.
    ConfirmedAfterRetry {
        /// Retry round (1-based) that succeeded.
        round: u32,
    },
    /// Still not in the expected state when the budget ran out.
    ///
    /// `observed` is `None` when the last read had no entry for the outlet.
    Mismatched {
        /// State seen on the last read.
        observed: Option<OutletState>,
    },
    /// Switched with an action that has no stable state to check.
    Unverified,
    /// Never switched because the run was stopped first.
    NotAttempted,
}

impl Outcome {
    /// Returns `true` for both confirmed variants.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed | Self::ConfirmedAfterRetry { .. })
    }
}

/// Outcome and attempt count for one targeted outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutletOutcome {
    /// Outlet this entry describes.
    pub address: OutletAddress,
    /// Final verdict.
    pub outcome: Outcome,
    /// Number of switch requests sent to the outlet.
    pub attempts: u32,
}

impl OutletOutcome {
    pub(crate) fn pending(address: OutletAddress) -> Self {
        Self {
            address,
            outcome: Outcome::NotAttempted,
            attempts: 0,
        }
    }
}

/// Caller-visible result of [`VerifiedSwitch::execute`](super::VerifiedSwitch::execute).
///
/// Outlets appear in the order of the command's targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchReport {
    action: PowerAction,
    outlets: Vec<OutletOutcome>,
    rounds: u32,
    interrupted: bool,
}

impl SwitchReport {
    pub(crate) fn new(action: PowerAction, outlets: Vec<OutletOutcome>) -> Self {
        Self {
            action,
            outlets,
            rounds: 0,
            interrupted: false,
        }
    }

    pub(crate) fn outlets_mut(&mut self) -> &mut [OutletOutcome] {
        &mut self.outlets
    }

    pub(crate) fn add_round(&mut self) {
        self.rounds += 1;
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    /// Returns the action that was applied.
    #[must_use]
    pub fn action(&self) -> PowerAction {
        self.action
    }

    /// Returns one entry per targeted outlet.
    #[must_use]
    pub fn outlets(&self) -> &[OutletOutcome] {
        &self.outlets
    }

    /// Returns the entry for `address`, if it was targeted.
    #[must_use]
    pub fn outcome(&self, address: OutletAddress) -> Option<&OutletOutcome> {
        self.outlets.iter().find(|o| o.address == address)
    }

    /// Returns the number of retry rounds run, summed over machines.
    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Returns `true` if a stop signal cut the run short.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Returns `true` if every outlet was confirmed.
    ///
    /// Always `false` for reset, which is never confirmed.
    #[must_use]
    pub fn all_confirmed(&self) -> bool {
        self.outlets.iter().all(|o| o.outcome.is_confirmed())
    }

    /// Iterates over outlets that ended mismatched.
    pub fn mismatched(&self) -> impl Iterator<Item = &OutletOutcome> {
        self.outlets
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Mismatched { .. }))
    }
}
