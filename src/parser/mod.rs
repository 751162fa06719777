// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status body parsers.
//!
//! Neither device has a schema for its status reply; the device firmware is
//! the source of truth. Each family gets one pure function that turns the
//! raw body into an ordered list of [`OutletReading`](crate::types::OutletReading).

mod aw2401;
mod sp8h;

pub use aw2401::parse_status as parse_aw2401_status;
pub use sp8h::parse_status as parse_sp8h_status;
