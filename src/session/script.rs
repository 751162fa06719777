// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted transport for session unit tests.

use std::collections::VecDeque;

use crate::error::{Error, Result, TransportError};
use crate::transport::{Request, Response, Transport};
use crate::types::DeviceEndpoint;

/// What happened on a [`ScriptedTransport`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Open,
    Close,
    Exchange(Request),
}

/// Replays canned responses and records every call.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    replies: VecDeque<Response>,
    events: Vec<Event>,
    open: bool,
    refuse: bool,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A transport whose `open` always fails.
    pub(crate) fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub(crate) fn reply(mut self, status: u16, body: &str) -> Self {
        self.replies
            .push_back(Response::new(status, Vec::new(), body.as_bytes()));
        self
    }

    pub(crate) fn reply_with_cookie(mut self, body: &str, cookie: &str) -> Self {
        self.replies.push_back(Response::new(
            200,
            vec![("set-cookie".to_string(), cookie.to_string())],
            body.as_bytes(),
        ));
        self
    }

    pub(crate) fn events(&self) -> &[Event] {
        &self.events
    }

    pub(crate) fn requests(&self) -> Vec<&Request> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Exchange(req) => Some(req),
                _ => None,
            })
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn open(&mut self, endpoint: &DeviceEndpoint) -> Result<()> {
        self.close();
        if self.refuse {
            return Err(Error::Connection(format!("{}: refused", endpoint.host())));
        }
        self.events.push(Event::Open);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.events.push(Event::Close);
            self.open = false;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn exchange(&mut self, request: Request) -> Result<Response> {
        if !self.open {
            return Err(TransportError::NotOpen.into());
        }
        self.events.push(Event::Exchange(request));
        Ok(self
            .replies
            .pop_front()
            .unwrap_or_else(|| Response::new(200, Vec::new(), "")))
    }
}
