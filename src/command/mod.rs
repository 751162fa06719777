// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switch intents and their wire encodings.
//!
//! [`SwitchCommand`] is what a caller hands to the
//! [`VerifiedSwitch`](crate::controller::VerifiedSwitch) controller. The
//! per-device request types in this module are what the sessions put on
//! the wire.
//!
//! | Request | Device | Path |
//! |---------|--------|------|
//! | [`Sp8hSwitchRequest`] | SP8H | `/power_monitor_frame.csp?srm_no&power_id&status` |
//! | [`Sp8hStatusRequest`] | SP8H | `/power_monitor_frame.csp?srm_no` |
//! | [`PortModeRequest`] | AW2401 | `/set_port_mode.html?portMode1..4` |
//!
//! # Examples
//!
//! ```
//! use powerstrip_lib::command::{Command, Sp8hSwitchRequest};
//! use powerstrip_lib::types::{MachineId, OutletId, PowerAction};
//!
//! let req = Sp8hSwitchRequest::new(
//!     MachineId::new(1).unwrap(),
//!     OutletId::new(3).unwrap(),
//!     PowerAction::Off,
//! );
//! assert_eq!(req.to_query(), Some("srm_no=1&power_id=3&status=2".to_string()));
//! ```

mod power;

pub use power::{
    AW2401_CONTROL_PATH, AW2401_STATUS_PATH, PORT_COUNT, PortMode, PortModeRequest,
    SP8H_CONTROL_PATH, Sp8hStatusRequest, Sp8hSwitchRequest,
};

use serde::Serialize;

use crate::error::MisuseError;
use crate::types::{DeviceFamily, OutletAddress, PowerAction};

/// A request that can be sent to a device as a GET with a query string.
pub trait Command {
    /// Request path on the device.
    fn path(&self) -> &'static str;

    /// Query parameters in the order the device web UI sends them.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;

    /// Returns the URL-encoded query string, or `None` when there are no
    /// parameters.
    fn to_query(&self) -> Option<String> {
        let pairs = self.query_pairs();
        if pairs.is_empty() {
            return None;
        }
        Some(
            pairs
                .iter()
                .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
                .collect::<Vec<_>>()
                .join("&"),
        )
    }
}

/// One switch intent: a set of outlets and the action to apply.
///
/// Targets are de-duplicated keeping first-occurrence order, and all belong
/// to the same device family.
///
/// # Examples
///
/// ```
/// use powerstrip_lib::command::SwitchCommand;
/// use powerstrip_lib::types::PowerAction;
///
/// let cmd = SwitchCommand::sp8h(&[1], &[3, 1, 3], PowerAction::On).unwrap();
/// assert_eq!(cmd.targets().len(), 2);
///
/// // AW2401 strips cannot reset an outlet
/// assert!(SwitchCommand::aw2401(&[1], PowerAction::Reset).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchCommand {
    targets: Vec<OutletAddress>,
    action: PowerAction,
}

impl SwitchCommand {
    /// Creates a command from explicit addresses.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError` if `targets` is empty, mixes device families,
    /// or asks an AW2401 to reset.
    pub fn new(
        targets: impl IntoIterator<Item = OutletAddress>,
        action: PowerAction,
    ) -> Result<Self, MisuseError> {
        let mut unique: Vec<OutletAddress> = Vec::new();
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }

        let family = unique
            .first()
            .map(OutletAddress::family)
            .ok_or(MisuseError::EmptyOutletSet)?;

        if unique.iter().any(|t| t.family() != family) {
            return Err(MisuseError::MixedFamilies);
        }

        if family == DeviceFamily::Aw2401 && action == PowerAction::Reset {
            return Err(MisuseError::UnsupportedAction { family, action });
        }

        Ok(Self {
            targets: unique,
            action,
        })
    }

    /// Creates an SP8H command for every outlet id on every machine id.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::OutOfRange` for an invalid id, or
    /// `MisuseError::EmptyOutletSet` if either list is empty.
    pub fn sp8h(machines: &[u8], outlets: &[u8], action: PowerAction) -> Result<Self, MisuseError> {
        let mut targets = Vec::with_capacity(machines.len() * outlets.len());
        for &machine in machines {
            for &outlet in outlets {
                targets.push(OutletAddress::sp8h(machine, outlet)?);
            }
        }
        Self::new(targets, action)
    }

    /// Creates an AW2401 command for the given ports.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError` for an invalid port, an empty list, or
    /// [`PowerAction::Reset`].
    pub fn aw2401(ports: &[u8], action: PowerAction) -> Result<Self, MisuseError> {
        let targets = ports
            .iter()
            .map(|&port| OutletAddress::aw2401(port))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(targets, action)
    }

    /// Outlets to switch, in order.
    #[must_use]
    pub fn targets(&self) -> &[OutletAddress] {
        &self.targets
    }

    /// Action to apply.
    #[must_use]
    pub fn action(&self) -> PowerAction {
        self.action
    }

    /// Device family every target belongs to.
    #[must_use]
    pub fn family(&self) -> DeviceFamily {
        self.targets[0].family()
    }
}
