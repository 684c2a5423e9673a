// SPDX-License-Identifier: MIT
//
// Message transport.
//
// The session never talks HTTP itself. It asks a `Transport` for the
// latest messages and hands it drafts to deliver, which keeps the session
// testable with an in-memory fake and keeps the relay protocol in one
// place:
//
//   POST {base}/messages  → {"messages": [Message, ...]}  newest first, ≤ 10
//   POST {base}/send      ← Draft as JSON                  any 2xx is success
//
// Both calls are blocking. They run on the event-loop thread, bounded by
// the request timeout.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use thiserror::Error;

use crate::message::{Draft, Message, MessageBatch};

/// Default base URL of the public relay.
pub const DEFAULT_SERVER: &str = "https://pport.top";

#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, timeout, or body decoding failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
}

/// Where messages come from and where drafts go.
pub trait Transport {
    /// The latest messages, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the server cannot be reached or answers with
    /// something other than a message batch.
    fn fetch_latest(&mut self) -> Result<Vec<Message>, TransportError>;

    /// Deliver one draft.
    ///
    /// # Errors
    ///
    /// Returns an error when the draft was not accepted.
    fn submit(&mut self, draft: &Draft) -> Result<(), TransportError>;
}

// ─── HTTP ────────────────────────────────────────────────────────────────────

/// Blocking HTTP client for the relay server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: String,
}

impl HttpTransport {
    /// A transport for `base` (for example `https://pport.top`). A trailing
    /// slash is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pport/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base)
    }
}

fn check(endpoint: &'static str, status: reqwest::StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            endpoint,
            status: status.as_u16(),
        })
    }
}

impl Transport for HttpTransport {
    fn fetch_latest(&mut self) -> Result<Vec<Message>, TransportError> {
        let response = self.client.post(self.url("/messages")).send()?;
        check("/messages", response.status())?;
        let batch: MessageBatch = response.json()?;
        debug!("fetched {} message(s)", batch.messages.len());
        Ok(batch.messages)
    }

    fn submit(&mut self, draft: &Draft) -> Result<(), TransportError> {
        let response = self.client.post(self.url("/send")).json(draft).send()?;
        check("/send", response.status())?;
        debug!("sent {} char(s) as {}", draft.text.chars().count(), draft.username);
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
