// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device sessions.
//!
//! A session owns one [`Transport`](crate::transport::Transport) and speaks
//! one device family's protocol over it.
//!
//! | Session | Login | Switch | Status |
//! |---------|-------|--------|--------|
//! | [`Sp8hSession`] | form POST, cookie | one outlet per request | per machine, script blob |
//! | [`Aw2401Session`] | none | all four ports restated per request | HTML form |
//!
//! Both implement [`DeviceSession`], which is all the
//! [`VerifiedSwitch`](crate::controller::VerifiedSwitch) controller needs.
//!
//! # State machine
//!
//! ```text
//! Disconnected --open--> Connected --login--> Authenticated
//!                            ^                     |
//!                            +-------logout--------+
//! any --close--> Closed (terminal)
//! ```
//!
//! `Authenticated` only exists for SP8H.

mod aw2401;
#[cfg(test)]
pub(crate) mod script;
mod sp8h;

pub use aw2401::Aw2401Session;
pub use sp8h::{LOGIN_PATH, LOGOUT_PATH, Sp8hSession};

use std::fmt;

use crate::error::{Error, Result};
use crate::transport::Response;
use crate::types::{DeviceEndpoint, OutletAddress, OutletReading, PowerAction};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No connection yet.
    #[default]
    Disconnected,
    /// Transport open, not logged in.
    Connected,
    /// Logged in and holding a session cookie.
    Authenticated,
    /// Closed for good; the session cannot be reopened.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Capabilities shared by every device family.
///
/// Operations take `&mut self`: a session holds exactly one connection and
/// one login, and is driven by one caller.
#[allow(async_fn_in_trait)]
pub trait DeviceSession {
    /// Endpoint this session talks to.
    fn endpoint(&self) -> &DeviceEndpoint;

    /// Current lifecycle state.
    fn state(&self) -> SessionState;

    /// Opens the transport.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` if the device is unreachable, or
    /// `MisuseError::SessionClosed` after [`close`](Self::close).
    async fn open(&mut self) -> Result<()>;

    /// Closes the transport and ends the session.
    fn close(&mut self);

    /// Applies `action` to one outlet. The device does not confirm the
    /// change; read it back with [`query_outlets`](Self::query_outlets).
    ///
    /// # Errors
    ///
    /// Returns `Error::Misuse` if the session is not ready, the address
    /// belongs to another family, or the family cannot perform `action`.
    /// Transport and HTTP status errors are propagated.
    async fn switch_outlet(&mut self, address: OutletAddress, action: PowerAction) -> Result<()>;

    /// Reads the status list that contains `address`, in outlet order.
    ///
    /// An empty list means the device timed out while answering.
    ///
    /// # Errors
    ///
    /// Same as [`switch_outlet`](Self::switch_outlet), plus `Error::Parse`
    /// for a malformed body.
    async fn query_outlets(&mut self, address: OutletAddress) -> Result<Vec<OutletReading>>;
}

/// Maps a non-2xx reply on `path` to `Error::HttpStatus`.
fn check_status(path: &str, response: &Response) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(Error::HttpStatus {
            path: path.to_string(),
            status: response.status(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_disconnected() {
        assert_eq!(SessionState::default(), SessionState::Disconnected);
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Authenticated.to_string(), "authenticated");
        assert_eq!(SessionState::Closed.to_string(), "closed");
    }
}
