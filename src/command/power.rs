// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power switching and status requests for both device families.

use crate::command::Command;
use crate::types::{MachineId, OutletId, OutletState, PortId, PowerAction};

/// SP8H switch and status page.
pub const SP8H_CONTROL_PATH: &str = "/power_monitor_frame.csp";
/// AW2401 switch endpoint.
pub const AW2401_CONTROL_PATH: &str = "/set_port_mode.html";
/// AW2401 status page.
pub const AW2401_STATUS_PATH: &str = "/get_port_mode.html";
/// Number of ports on an AW2401.
pub const PORT_COUNT: usize = PortId::MAX as usize;

/// SP8H request to switch one outlet.
///
/// The device encodes the action as `status`: 1 = on, 2 = off, 3 = reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sp8hSwitchRequest {
    machine: MachineId,
    outlet: OutletId,
    action: PowerAction,
}

impl Sp8hSwitchRequest {
    /// Creates a switch request.
    #[must_use]
    pub const fn new(machine: MachineId, outlet: OutletId, action: PowerAction) -> Self {
        Self {
            machine,
            outlet,
            action,
        }
    }

    /// Device-internal numeric code for an action.
    #[must_use]
    pub const fn status_code(action: PowerAction) -> u8 {
        match action {
            PowerAction::On => 1,
            PowerAction::Off => 2,
            PowerAction::Reset => 3,
        }
    }
}

impl Command for Sp8hSwitchRequest {
    fn path(&self) -> &'static str {
        SP8H_CONTROL_PATH
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("srm_no", self.machine.to_string()),
            ("power_id", self.outlet.to_string()),
            ("status", Self::status_code(self.action).to_string()),
        ]
    }
}

/// SP8H request for the status of every outlet on one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sp8hStatusRequest {
    machine: MachineId,
}

impl Sp8hStatusRequest {
    /// Creates a status request.
    #[must_use]
    pub const fn new(machine: MachineId) -> Self {
        Self { machine }
    }
}

impl Command for Sp8hStatusRequest {
    fn path(&self) -> &'static str {
        SP8H_CONTROL_PATH
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![("srm_no", self.machine.to_string())]
    }
}

/// Mode for one AW2401 port in a [`PortModeRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortMode {
    /// Leave the port as it is.
    #[default]
    Unchanged,
    /// Switch the port on.
    On,
    /// Switch the port off.
    Off,
}

impl PortMode {
    /// Wire value; `jj` is the device's "leave unchanged" sentinel.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "jj",
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl From<OutletState> for PortMode {
    fn from(state: OutletState) -> Self {
        match state {
            OutletState::On => Self::On,
            OutletState::Off => Self::Off,
        }
    }
}

/// AW2401 switch request.
///
/// The device has no per-port endpoint: every request restates all four
/// ports, and ports the caller does not target carry the sentinel.
///
/// # Examples
///
/// ```
/// use powerstrip_lib::command::{Command, PortModeRequest};
/// use powerstrip_lib::types::{OutletState, PortId};
///
/// let req = PortModeRequest::new(&[PortId::new(2).unwrap()], OutletState::On);
/// assert_eq!(
///     req.to_query().unwrap(),
///     "portMode1=jj&portMode2=on&portMode3=jj&portMode4=jj"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortModeRequest {
    modes: [PortMode; PORT_COUNT],
}

impl PortModeRequest {
    /// Drives `ports` to `state` and leaves the rest unchanged.
    #[must_use]
    pub fn new(ports: &[PortId], state: OutletState) -> Self {
        let mut modes = [PortMode::Unchanged; PORT_COUNT];
        for port in ports {
            modes[port.slot()] = state.into();
        }
        Self { modes }
    }

    /// Per-port modes in port order.
    #[must_use]
    pub fn modes(&self) -> &[PortMode; PORT_COUNT] {
        &self.modes
    }
}

impl Command for PortModeRequest {
    fn path(&self) -> &'static str {
        AW2401_CONTROL_PATH
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        const FIELDS: [&str; PORT_COUNT] = ["portMode1", "portMode2", "portMode3", "portMode4"];
        FIELDS
            .iter()
            .zip(self.modes)
            .map(|(field, mode)| (*field, mode.as_str().to_string()))
            .collect()
    }
}
