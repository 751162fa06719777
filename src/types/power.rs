// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power states and actions.
//!
//! [`OutletState`] is what a device reports back; [`PowerAction`] is what a
//! caller asks for. They differ because `Reset` is something a strip can do
//! but never a state it can be observed in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MisuseError;

/// Observed state of one outlet.
///
/// # Examples
///
/// ```
/// use powerstrip_lib::types::OutletState;
///
/// assert_eq!("on".parse::<OutletState>().unwrap(), OutletState::On);
/// assert_eq!(OutletState::Off.as_str(), "OFF");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutletState {
    /// Outlet is powered.
    On,
    /// Outlet is not powered.
    Off,
}

impl OutletState {
    /// Returns the display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for OutletState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutletState {
    type Err = MisuseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" | "1" => Ok(Self::On),
            "off" | "0" => Ok(Self::Off),
            _ => Err(MisuseError::InvalidState(s.to_string())),
        }
    }
}

/// A requested power change.
///
/// `Reset` power-cycles an SP8H outlet. It is fire-and-forget: there is no
/// stable state to verify afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    /// Switch the outlet on.
    On,
    /// Switch the outlet off.
    Off,
    /// Power-cycle the outlet (SP8H only).
    Reset,
}

impl PowerAction {
    /// Returns the display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Reset => "RESET",
        }
    }

    /// The state an outlet should be read back in after this action.
    ///
    /// Returns `None` for [`PowerAction::Reset`].
    #[must_use]
    pub const fn expected_state(&self) -> Option<OutletState> {
        match self {
            Self::On => Some(OutletState::On),
            Self::Off => Some(OutletState::Off),
            Self::Reset => None,
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PowerAction {
    type Err = MisuseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "reset" => Ok(Self::Reset),
            _ => Err(MisuseError::InvalidAction(s.to_string())),
        }
    }
}

/// One outlet's entry in a status read.
///
/// SP8H strips report a current draw next to the state. The device gives
/// no unit or format for it, so it is kept as the raw string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutletReading {
    /// Observed state.
    pub state: OutletState,
    /// Raw current-draw reading, if the device reports one.
    pub current: Option<String>,
}

impl OutletReading {
    /// Creates a reading without a current value.
    #[must_use]
    pub const fn new(state: OutletState) -> Self {
        Self {
            state,
            current: None,
        }
    }

    /// Attaches a current-draw reading.
    #[must_use]
    pub fn with_current(mut self, current: impl Into<String>) -> Self {
        self.current = Some(current.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlet_state_from_str() {
        assert_eq!("ON".parse::<OutletState>().unwrap(), OutletState::On);
        assert_eq!("off".parse::<OutletState>().unwrap(), OutletState::Off);
        assert_eq!("1".parse::<OutletState>().unwrap(), OutletState::On);
        assert_eq!("0".parse::<OutletState>().unwrap(), OutletState::Off);
        assert_eq!(
            "jj".parse::<OutletState>(),
            Err(MisuseError::InvalidState("jj".to_string()))
        );
    }

    #[test]
    fn power_action_expected_state() {
        assert_eq!(PowerAction::On.expected_state(), Some(OutletState::On));
        assert_eq!(PowerAction::Off.expected_state(), Some(OutletState::Off));
        assert_eq!(PowerAction::Reset.expected_state(), None);
    }

    #[test]
    fn power_action_from_str() {
        assert_eq!("reset".parse::<PowerAction>().unwrap(), PowerAction::Reset);
        assert_eq!("On".parse::<PowerAction>().unwrap(), PowerAction::On);
        assert_eq!(
            "toggle".parse::<PowerAction>(),
            Err(MisuseError::InvalidAction("toggle".to_string()))
        );
    }

    #[test]
    fn reading_with_current() {
        let reading = OutletReading::new(OutletState::On).with_current("0.3");
        assert_eq!(reading.current.as_deref(), Some("0.3"));
    }

    #[test]
    fn outlet_state_serde_lowercase() {
        let json = serde_json::to_string(&OutletState::On).unwrap();
        assert_eq!(json, "\"on\"");
    }
}
