// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SP8H session: form login, cookie, per-outlet switching.

use url::form_urlencoded;

use crate::command::{Command, Sp8hStatusRequest, Sp8hSwitchRequest};
use crate::error::{AuthError, Error, MisuseError, Result};
use crate::parser::parse_sp8h_status;
use crate::session::{DeviceSession, SessionState, check_status};
use crate::transport::{HttpTransport, Request, Response, Transport};
use crate::types::{
    Credentials, DeviceEndpoint, DeviceFamily, MachineId, OutletAddress, OutletId, OutletReading,
    PowerAction,
};

/// Login form target.
pub const LOGIN_PATH: &str = "/login_auth.csp";
/// Logout page.
pub const LOGOUT_PATH: &str = "/logout.csp";

const LOGIN_OK: &[u8] = b"0";
const LOGIN_INVALID: &[u8] = b"1";
const LOGIN_TABLE_FULL: &[u8] = b"2";

/// Session with an SP8H strip.
///
/// Every switch and status request carries the cookie handed out at login.
/// Logging in again on an authenticated session restarts the connection
/// first, so a session never holds two logins at once.
///
/// # Examples
///
/// ```no_run
/// use powerstrip_lib::session::Sp8hSession;
/// use powerstrip_lib::types::{Credentials, DeviceEndpoint, MachineId, OutletId, PowerAction};
///
/// # async fn example() -> powerstrip_lib::Result<()> {
/// let endpoint = DeviceEndpoint::sp8h("192.168.1.20");
/// let mut session = Sp8hSession::new(endpoint, Credentials::default())?;
///
/// session.login().await?;
/// let machine = MachineId::new(1)?;
/// session
///     .switch_outlet(machine, OutletId::new(3)?, PowerAction::On)
///     .await?;
/// let readings = session.query_status(machine).await?;
/// println!("{readings:?}");
///
/// session.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Sp8hSession<T = HttpTransport> {
    endpoint: DeviceEndpoint,
    credentials: Credentials,
    transport: T,
    state: SessionState,
    cookie: Option<String>,
}

impl Sp8hSession<HttpTransport> {
    /// Creates a session over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::WrongFamily` if `endpoint` is not an SP8H.
    pub fn new(endpoint: DeviceEndpoint, credentials: Credentials) -> Result<Self> {
        Self::with_transport(endpoint, credentials, HttpTransport::new())
    }
}

impl<T: Transport> Sp8hSession<T> {
    /// Creates a session over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::WrongFamily` if `endpoint` is not an SP8H.
    pub fn with_transport(
        endpoint: DeviceEndpoint,
        credentials: Credentials,
        transport: T,
    ) -> Result<Self> {
        if endpoint.family() != DeviceFamily::Sp8h {
            return Err(MisuseError::WrongFamily {
                expected: DeviceFamily::Sp8h,
                actual: endpoint.family(),
            }
            .into());
        }
        Ok(Self {
            endpoint,
            credentials,
            transport,
            state: SessionState::Disconnected,
            cookie: None,
        })
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the `Cookie` header value sent with each request, if logged in.
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Returns `true` while logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Logs in with the session's credentials.
    ///
    /// Opens the transport if needed. On an already authenticated session
    /// the transport is closed and reopened before logging in again.
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` if the device rejects the login (bad
    /// credentials, full session table, non-2xx status or an unknown
    /// reply). Login is never retried here.
    pub async fn login(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closed => return Err(MisuseError::SessionClosed.into()),
            SessionState::Authenticated => {
                tracing::info!(host = %self.endpoint.host(), "Restarting SP8H session");
                self.transport.close();
                self.cookie = None;
                self.state = SessionState::Disconnected;
                self.open().await?;
            }
            SessionState::Disconnected => self.open().await?,
            SessionState::Connected => {}
        }

        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("auth_user", self.credentials.username())
            .append_pair("auth_passwd", self.credentials.password())
            .finish();
        let response = self
            .transport
            .exchange(Request::post(LOGIN_PATH).with_form(form))
            .await?;

        if !response.is_success() {
            return Err(AuthError::Rejected {
                status: response.status(),
            }
            .into());
        }

        match response.body().trim_ascii() {
            LOGIN_OK => {}
            LOGIN_INVALID => return Err(AuthError::InvalidCredentials.into()),
            LOGIN_TABLE_FULL => return Err(AuthError::SessionTableFull.into()),
            _ => return Err(AuthError::UnexpectedReply(response.text()).into()),
        }

        self.cookie = session_cookie(&response);
        if self.cookie.is_none() {
            tracing::warn!(host = %self.endpoint.host(), "Login reply carried no session cookie");
        }
        self.state = SessionState::Authenticated;
        tracing::info!(
            host = %self.endpoint.host(),
            user = %self.credentials.username(),
            "Logged in to SP8H"
        );
        Ok(())
    }

    /// Logs out and drops the session cookie.
    ///
    /// Returns `Ok(false)` without touching the device when not logged in.
    ///
    /// # Errors
    ///
    /// Returns `Error::HttpStatus` if the device answers with a non-2xx
    /// status; transport errors are propagated.
    pub async fn logout(&mut self) -> Result<bool> {
        if !self.is_authenticated() {
            tracing::warn!(state = %self.state, "Logout requested without a login");
            return Ok(false);
        }

        let request = self.authorized(Request::get(LOGOUT_PATH));
        let response = self.transport.exchange(request).await?;
        check_status(LOGOUT_PATH, &response)?;

        self.cookie = None;
        self.state = SessionState::Connected;
        tracing::info!(host = %self.endpoint.host(), "Logged out of SP8H");
        Ok(true)
    }

    /// Switches one outlet. The reply carries no confirmation.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::NotAuthenticated` before login, or
    /// `Error::HttpStatus` for a non-2xx reply.
    pub async fn switch_outlet(
        &mut self,
        machine: MachineId,
        outlet: OutletId,
        action: PowerAction,
    ) -> Result<()> {
        self.require_login()?;
        tracing::debug!(%machine, %outlet, %action, "Switching SP8H outlet");
        self.send(&Sp8hSwitchRequest::new(machine, outlet, action))
            .await
            .map(|_| ())
    }

    /// Reads every outlet on `machine`.
    ///
    /// Returns an empty list when the device times out mid-read.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::NotAuthenticated` before login,
    /// `Error::HttpStatus` for a non-2xx reply, or `Error::Parse` for a
    /// malformed body.
    pub async fn query_status(&mut self, machine: MachineId) -> Result<Vec<OutletReading>> {
        self.require_login()?;
        let response = self.send(&Sp8hStatusRequest::new(machine)).await?;
        let readings = parse_sp8h_status(&response.text())?;
        if readings.is_empty() {
            tracing::warn!(%machine, "SP8H status read timed out");
        }
        Ok(readings)
    }

    /// Logs out if logged in, then closes the session.
    ///
    /// For interrupt paths: a failed logout is logged, not returned.
    pub async fn shutdown(&mut self) {
        if self.is_authenticated() {
            if let Err(e) = self.logout().await {
                tracing::warn!(error = %e, "Logout failed during shutdown");
            }
        }
        self.close();
    }

    fn require_login(&self) -> Result<()> {
        match self.state {
            SessionState::Authenticated => Ok(()),
            SessionState::Closed => Err(MisuseError::SessionClosed.into()),
            _ => Err(MisuseError::NotAuthenticated.into()),
        }
    }

    fn authorized(&self, request: Request) -> Request {
        match &self.cookie {
            Some(cookie) => request.with_header("Cookie", cookie.clone()),
            None => request,
        }
    }

    async fn send<C: Command>(&mut self, command: &C) -> Result<Response> {
        let request = self.authorized(Request::get(command.path()).with_query(command.to_query()));
        let response = self.transport.exchange(request).await?;
        check_status(command.path(), &response)?;
        Ok(response)
    }
}

impl<T: Transport> DeviceSession for Sp8hSession<T> {
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
        self.cookie = None;
        self.state = SessionState::Connected;
        Ok(())
    }

    fn close(&mut self) {
        self.transport.close();
        self.cookie = None;
        self.state = SessionState::Closed;
    }

    async fn switch_outlet(&mut self, address: OutletAddress, action: PowerAction) -> Result<()> {
        match address {
            OutletAddress::Sp8h { machine, outlet } => {
                Sp8hSession::switch_outlet(self, machine, outlet, action).await
            }
            OutletAddress::Aw2401 { .. } => Err(wrong_family(address)),
        }
    }

    async fn query_outlets(&mut self, address: OutletAddress) -> Result<Vec<OutletReading>> {
        match address {
            OutletAddress::Sp8h { machine, .. } => self.query_status(machine).await,
            OutletAddress::Aw2401 { .. } => Err(wrong_family(address)),
        }
    }
}

fn wrong_family(address: OutletAddress) -> Error {
    MisuseError::WrongFamily {
        expected: DeviceFamily::Sp8h,
        actual: address.family(),
    }
    .into()
}

/// Reduces `Set-Cookie` headers to a `Cookie` header value.
fn session_cookie(response: &Response) -> Option<String> {
    let pairs: Vec<&str> = response
        .header_values("set-cookie")
        .filter_map(|h| h.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
