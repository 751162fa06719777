// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport built on `reqwest`.

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::net::TcpStream;

use crate::error::{Error, Result, TransportError};
use crate::transport::{Method, Request, Response, Transport};
use crate::types::DeviceEndpoint;

/// HTTP transport holding one keep-alive connection to a device.
///
/// `open` checks the host with a TCP connect so an unreachable device fails
/// there instead of on the first request. Cookies are not stored by the
/// client; sessions manage them explicitly.
///
/// # Examples
///
/// ```no_run
/// use powerstrip_lib::transport::{HttpTransport, Request, Transport};
/// use powerstrip_lib::types::DeviceEndpoint;
///
/// # async fn example() -> powerstrip_lib::Result<()> {
/// let mut transport = HttpTransport::new();
/// transport.open(&DeviceEndpoint::aw2401("192.168.1.30")).await?;
///
/// let response = transport.exchange(Request::get("/get_port_mode.html")).await?;
/// println!("{}", response.text());
///
/// transport.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct HttpTransport {
    connection: Option<Connection>,
}

#[derive(Debug)]
struct Connection {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a closed transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL of the open connection.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.base_url.as_str())
    }
}

impl Transport for HttpTransport {
    async fn open(&mut self, endpoint: &DeviceEndpoint) -> Result<()> {
        self.close();

        let addr = (endpoint.host(), endpoint.port());
        match tokio::time::timeout(endpoint.timeout(), TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {}
            Ok(Err(e)) => {
                return Err(Error::Connection(format!(
                    "{}:{}: {e}",
                    endpoint.host(),
                    endpoint.port()
                )));
            }
            Err(_) => {
                return Err(Error::Connection(format!(
                    "{}:{}: timed out after {} ms",
                    endpoint.host(),
                    endpoint.port(),
                    endpoint.timeout().as_millis()
                )));
            }
        }

        let client = Client::builder()
            .timeout(endpoint.timeout())
            .connect_timeout(endpoint.timeout())
            .pool_max_idle_per_host(1)
            .build()
            .map_err(TransportError::Http)?;

        let base_url = endpoint.base_url();
        tracing::debug!(url = %base_url, "Opened device connection");

        self.connection = Some(Connection { client, base_url });
        Ok(())
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            tracing::debug!(url = %connection.base_url, "Closed device connection");
        }
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    async fn exchange(&mut self, request: Request) -> Result<Response> {
        let connection = self.connection.as_ref().ok_or(TransportError::NotOpen)?;

        let url = format!("{}{}", connection.base_url, request.target());
        tracing::debug!(method = %request.method(), url = %url, "Sending HTTP request");

        let mut headers = HeaderMap::new();
        for (name, value) in request.headers() {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|_| TransportError::InvalidHeader(name.as_str().to_string()))?;
            headers.append(name, value);
        }

        let builder = match request.method() {
            Method::Get => connection.client.get(&url),
            Method::Post => connection.client.post(&url),
        };
        let builder = match request.body() {
            Some(body) => builder.body(body.to_string()),
            None => builder,
        };

        let response = builder
            .headers(headers)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(TransportError::Http)?;

        tracing::debug!(status, bytes = body.len(), "Received HTTP response");

        Ok(Response::new(status, response_headers, body.to_vec()))
    }
}
