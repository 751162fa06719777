// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request/response exchange with one device.
//!
//! A [`Transport`] knows nothing about outlets or logins: it opens a
//! connection to an endpoint, moves one request and one response at a
//! time, and closes. Device semantics live in [`crate::session`].
//!
//! A non-2xx HTTP status is a normal [`Response`]; only socket-level
//! failures are errors.

mod http;

pub use http::HttpTransport;

use std::fmt;

use crate::error::Result;
use crate::types::DeviceEndpoint;

/// HTTP method used by the device protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET request.
    Get,
    /// POST request.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// One request to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    body: Option<String>,
    headers: Vec<(String, String)>,
}

impl Request {
    /// Creates a GET request for `path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request for `path`.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            headers: Vec::new(),
        }
    }

    /// Sets the already-encoded query string (without the leading `?`).
    #[must_use]
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }

    /// Sets a form-encoded body and its content type.
    #[must_use]
    pub fn with_form(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.with_header("Content-Type", "application/x-www-form-urlencoded")
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the first header with `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path plus query, as it appears on the request line.
    #[must_use]
    pub fn target(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }
}

/// One response from a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns every value of header `name`, compared case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Connection to a single device.
///
/// Implementations hold at most one open connection. Every method takes
/// `&mut self`; a transport is driven by one caller at a time.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Opens a connection to `endpoint`, closing any previous one first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` if the host is unreachable or refuses
    /// the connection.
    async fn open(&mut self, endpoint: &DeviceEndpoint) -> Result<()>;

    /// Releases the connection. Does nothing when already closed.
    fn close(&mut self);

    /// Returns `true` while a connection is open.
    fn is_open(&self) -> bool;

    /// Sends `request` and waits for the full response.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on socket-level failure or when the
    /// transport is not open. HTTP error statuses are returned as
    /// responses.
    async fn exchange(&mut self, request: Request) -> Result<Response>;
}
