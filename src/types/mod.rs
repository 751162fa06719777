// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by sessions, parsers and the controller.
//!
//! Constrained ids validate on construction and cannot be built with an
//! out-of-range value.

mod endpoint;
mod outlet;
mod power;

pub use endpoint::{Credentials, DeviceEndpoint, DeviceFamily};
pub use outlet::{MachineId, OutletAddress, OutletId, PortId};
pub use power::{OutletReading, OutletState, PowerAction};
