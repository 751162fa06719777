// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `powerstrip_lib` library.
//!
//! Failures are split by where they happen: reaching the device, moving
//! bytes, logging in, decoding a status body, or calling the API in a way
//! the device protocol does not allow. A switch that could not be confirmed
//! after all retries is *not* an error; it is reported through
//! [`SwitchReport`](crate::controller::SwitchReport).

use std::time::Duration;

use thiserror::Error;

use crate::types::{DeviceFamily, PowerAction};

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The device host is unreachable or refused the connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A request/response exchange failed at the socket level.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device refused the login.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The device answered with a non-2xx HTTP status.
    #[error("unexpected HTTP status {status} from {path}")]
    HttpStatus {
        /// Request path that failed.
        path: String,
        /// HTTP status code returned by the device.
        status: u16,
    },

    /// A status body could not be decoded.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The call was rejected before anything was sent to the device.
    #[error("protocol misuse: {0}")]
    Misuse(#[from] MisuseError),
}

/// Socket-level failures during an exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (reset, timeout, malformed response).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An exchange was attempted on a closed transport.
    #[error("transport is not open")]
    NotOpen,

    /// A request header could not be encoded.
    #[error("invalid header {0}")]
    InvalidHeader(String),
}

/// Reasons an SP8H login can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The device rejected the user name or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Every login slot on the device is in use.
    #[error("session table is full, too many users logged in")]
    SessionTableFull,

    /// The login request itself came back with a non-2xx status.
    #[error("login rejected with HTTP status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// The login reply was not one of the known status codes.
    #[error("unexpected login reply: {0:?}")]
    UnexpectedReply(String),
}

/// Errors related to decoding device status bodies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The SP8H body has fewer bracket groups than the grammar needs.
    #[error("expected at least {expected} bracket groups, found {found}")]
    MissingGroup {
        /// Number of groups required.
        expected: usize,
        /// Number of groups present.
        found: usize,
    },

    /// A bracket group is not a quote-delimited list.
    #[error("malformed bracket group: {0:?}")]
    MalformedGroup(String),

    /// An SP8H outlet state code is neither `0` nor `1`.
    #[error("unknown outlet state code: {0:?}")]
    UnknownStateCode(String),

    /// An AW2401 port element has no `value` attribute.
    #[error("port element {index} has no value attribute")]
    MissingAttribute {
        /// Zero-based position of the element in document order.
        index: usize,
    },

    /// An AW2401 port value is neither `on` nor `off`.
    #[error("unknown port mode: {0:?}")]
    UnknownPortMode(String),
}

/// Calls rejected before any network traffic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MisuseError {
    /// An id is outside the device's fixed cardinality.
    #[error("{what} {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Which id was invalid.
        what: &'static str,
        /// Minimum allowed value.
        min: u8,
        /// Maximum allowed value.
        max: u8,
        /// The value that was provided.
        actual: u8,
    },

    /// A string is not a known outlet state.
    #[error("invalid outlet state: {0:?}")]
    InvalidState(String),

    /// A string is not a known power action.
    #[error("invalid power action: {0:?}")]
    InvalidAction(String),

    /// The operation needs a logged-in SP8H session.
    #[error("session is not authenticated, login first")]
    NotAuthenticated,

    /// The operation needs an open connection.
    #[error("session is not connected")]
    NotConnected,

    /// The session was closed and cannot be reused.
    #[error("session is closed")]
    SessionClosed,

    /// The action is not supported by this device family.
    #[error("{family} does not support the {action} action")]
    UnsupportedAction {
        /// Device family the action was sent to.
        family: DeviceFamily,
        /// The rejected action.
        action: PowerAction,
    },

    /// A switch command needs at least one outlet.
    #[error("no outlets selected")]
    EmptyOutletSet,

    /// A switch command mixes outlets from both device families.
    #[error("outlets from different device families in one command")]
    MixedFamilies,

    /// An endpoint or address of the wrong family was given to a session.
    #[error("expected a {expected} target, got {actual}")]
    WrongFamily {
        /// Family the session speaks.
        expected: DeviceFamily,
        /// Family that was supplied.
        actual: DeviceFamily,
    },

    /// The interval between commands is shorter than the device tolerates.
    #[error("command interval {actual:?} is shorter than the minimum {min:?}")]
    CommandIntervalTooShort {
        /// Smallest accepted interval.
        min: Duration,
        /// Interval that was configured.
        actual: Duration,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misuse_out_of_range_display() {
        let err = MisuseError::OutOfRange {
            what: "machine id",
            min: 1,
            max: 4,
            actual: 5,
        };
        assert_eq!(err.to_string(), "machine id 5 is out of range [1, 4]");
    }

    #[test]
    fn error_from_auth_error() {
        let err: Error = AuthError::SessionTableFull.into();
        assert!(matches!(err, Error::Auth(AuthError::SessionTableFull)));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingGroup {
            expected: 3,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "expected at least 3 bracket groups, found 1"
        );
    }

    #[test]
    fn unsupported_action_display() {
        let err = MisuseError::UnsupportedAction {
            family: DeviceFamily::Aw2401,
            action: PowerAction::Reset,
        };
        assert_eq!(err.to_string(), "AW2401 does not support the RESET action");
    }

    #[test]
    fn http_status_display() {
        let err = Error::HttpStatus {
            path: "/logout.csp".to_string(),
            status: 500,
        };
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status 500 from /logout.csp"
        );
    }
}
