// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AW2401 session: no login, four ports switched by one form request.

use crate::command::{AW2401_STATUS_PATH, Command, PORT_COUNT, PortModeRequest};
use crate::error::{Error, MisuseError, Result};
use crate::parser::parse_aw2401_status;
use crate::session::{DeviceSession, SessionState, check_status};
use crate::transport::{HttpTransport, Request, Transport};
use crate::types::{
    DeviceEndpoint, DeviceFamily, OutletAddress, OutletReading, OutletState, PortId, PowerAction,
};

/// Session with an AW2401 strip.
///
/// The device has no authentication. A switch request restates all four
/// ports; ports outside the targeted set are sent the "unchanged" sentinel.
/// Reset is not supported.
///
/// # Examples
///
/// ```no_run
/// use powerstrip_lib::session::{Aw2401Session, DeviceSession};
/// use powerstrip_lib::types::{DeviceEndpoint, OutletState, PortId};
///
/// # async fn example() -> powerstrip_lib::Result<()> {
/// let mut session = Aw2401Session::new(DeviceEndpoint::aw2401("192.168.1.30"))?;
/// session.open().await?;
///
/// session
///     .switch_outlets(&[PortId::new(1)?, PortId::new(3)?], OutletState::Off)
///     .await?;
/// let readings = session.query_status().await?;
/// println!("{readings:?}");
///
/// session.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Aw2401Session<T = HttpTransport> {
    endpoint: DeviceEndpoint,
    transport: T,
    state: SessionState,
}

impl Aw2401Session<HttpTransport> {
    /// Creates a session over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::WrongFamily` if `endpoint` is not an AW2401.
    pub fn new(endpoint: DeviceEndpoint) -> Result<Self> {
        Self::with_transport(endpoint, HttpTransport::new())
    }
}

impl<T: Transport> Aw2401Session<T> {
    /// Creates a session over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::WrongFamily` if `endpoint` is not an AW2401.
    pub fn with_transport(endpoint: DeviceEndpoint, transport: T) -> Result<Self> {
        if endpoint.family() != DeviceFamily::Aw2401 {
            return Err(MisuseError::WrongFamily {
                expected: DeviceFamily::Aw2401,
                actual: endpoint.family(),
            }
            .into());
        }
        Ok(Self {
            endpoint,
            transport,
            state: SessionState::Disconnected,
        })
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Drives every port in `ports` to `state` in one request.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::EmptyOutletSet` if `ports` is empty,
    /// `MisuseError::NotConnected` before [`open`](DeviceSession::open), or
    /// `Error::HttpStatus` for a non-2xx reply.
    pub async fn switch_outlets(&mut self, ports: &[PortId], state: OutletState) -> Result<()> {
        if ports.is_empty() {
            return Err(MisuseError::EmptyOutletSet.into());
        }
        self.require_open()?;

        let request = PortModeRequest::new(ports, state);
        tracing::debug!(?ports, %state, "Switching AW2401 ports");
        let response = self
            .transport
            .exchange(Request::get(request.path()).with_query(request.to_query()))
            .await?;
        check_status(request.path(), &response)
    }

    /// Reads the mode of every port, in port order.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::NotConnected` before [`open`](DeviceSession::open),
    /// `Error::HttpStatus` for a non-2xx reply, or `Error::Parse` for a
    /// malformed page.
    pub async fn query_status(&mut self) -> Result<Vec<OutletReading>> {
        self.require_open()?;
        let response = self
            .transport
            .exchange(Request::get(AW2401_STATUS_PATH))
            .await?;
        check_status(AW2401_STATUS_PATH, &response)?;

        let readings = parse_aw2401_status(&response.text())?;
        if readings.len() != PORT_COUNT {
            tracing::warn!(
                ports = readings.len(),
                expected = PORT_COUNT,
                "AW2401 status page has an unexpected port count"
            );
        }
        Ok(readings)
    }

    fn require_open(&self) -> Result<()> {
        match self.state {
            SessionState::Connected => Ok(()),
            SessionState::Closed => Err(MisuseError::SessionClosed.into()),
            _ => Err(MisuseError::NotConnected.into()),
        }
    }
}

impl<T: Transport> DeviceSession for Aw2401Session<T> {
    fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn open(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(MisuseError::SessionClosed.into());
        }
        self.transport.open(&self.endpoint).await?;
        self.state = SessionState::Connected;
        Ok(())
    }

    fn close(&mut self) {
        self.transport.close();
        self.state = SessionState::Closed;
    }

    async fn switch_outlet(&mut self, address: OutletAddress, action: PowerAction) -> Result<()> {
        let OutletAddress::Aw2401 { port } = address else {
            return Err(wrong_family(address));
        };
        let Some(state) = action.expected_state() else {
            return Err(MisuseError::UnsupportedAction {
                family: DeviceFamily::Aw2401,
                action,
            }
            .into());
        };
        self.switch_outlets(&[port], state).await
    }

    async fn query_outlets(&mut self, address: OutletAddress) -> Result<Vec<OutletReading>> {
        match address {
            OutletAddress::Aw2401 { .. } => self.query_status().await,
            OutletAddress::Sp8h { .. } => Err(wrong_family(address)),
        }
    }
}

fn wrong_family(address: OutletAddress) -> Error {
    MisuseError::WrongFamily {
        expected: DeviceFamily::Aw2401,
        actual: address.family(),
    }
    .into()
}
