// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device endpoint and login credentials.

use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The two supported appliance families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    /// Multi-outlet strip with cookie login (up to 4 machines x 8 outlets).
    Sp8h,
    /// Four-port cloud strip without authentication.
    Aw2401,
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sp8h => write!(f, "SP8H"),
            Self::Aw2401 => write!(f, "AW2401"),
        }
    }
}

/// Where a device lives and which protocol it speaks.
///
/// # Examples
///
/// ```
/// use powerstrip_lib::types::{DeviceEndpoint, DeviceFamily};
/// use std::time::Duration;
///
/// let endpoint = DeviceEndpoint::sp8h("192.168.1.20")
///     .with_port(8080)
///     .with_timeout(Duration::from_secs(3));
///
/// assert_eq!(endpoint.family(), DeviceFamily::Sp8h);
/// assert_eq!(endpoint.base_url(), "http://192.168.1.20:8080");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    host: String,
    port: u16,
    family: DeviceFamily,
    timeout: Duration,
}

impl DeviceEndpoint {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default connect and request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates an endpoint for the given host and family.
    #[must_use]
    pub fn new(host: impl Into<String>, family: DeviceFamily) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            family,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Creates an SP8H endpoint.
    #[must_use]
    pub fn sp8h(host: impl Into<String>) -> Self {
        Self::new(host, DeviceFamily::Sp8h)
    }

    /// Creates an AW2401 endpoint.
    #[must_use]
    pub fn aw2401(host: impl Into<String>) -> Self {
        Self::new(host, DeviceFamily::Aw2401)
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connect and request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the device family.
    #[must_use]
    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL, omitting the port when it is 80.
    ///
    /// IPv6 literals are bracketed.
    #[must_use]
    pub fn base_url(&self) -> String {
        let host = if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == Self::DEFAULT_PORT {
            format!("http://{host}")
        } else {
            format!("http://{host}:{}", self.port)
        }
    }
}

/// SP8H login credentials.
///
/// The password is kept out of `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Factory-default user name.
    pub const DEFAULT_USERNAME: &'static str = "admin";
    /// Factory-default password.
    pub const DEFAULT_PASSWORD: &'static str = "admin";

    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(Self::DEFAULT_USERNAME, Self::DEFAULT_PASSWORD)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
