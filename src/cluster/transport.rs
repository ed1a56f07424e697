//! Transport implementations
//!
//! [`HttpTransport`] talks to a live cluster. [`ScriptedTransport`] replays
//! canned replies and records what was asked of it, for tests and dry runs.

use crate::domain::ports::{Transport, TransportResponse};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

// =============================================================================
// HTTP
// =============================================================================

/// GET-only transport backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

// =============================================================================
// Scripted
// =============================================================================

/// Transport that answers from a queue of prepared responses
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn push(&self, response: TransportResponse) {
        self.responses.lock().push_back(response);
    }

    /// Queue a 200 response with `body`
    pub fn push_ok(&self, body: &str) {
        self.push(TransportResponse::ok(body));
    }

    /// URLs requested so far
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    /// Decoded `request` parameter of every URL requested so far
    pub fn commands(&self) -> Vec<String> {
        self.urls
            .lock()
            .iter()
            .filter_map(|url| url.split_once("?request="))
            .filter_map(|(_, encoded)| urlencoding::decode(encoded).ok())
            .map(|decoded| decoded.into_owned())
            .collect()
    }

    /// Responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        self.urls.lock().push(url.to_string());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Internal("no scripted response left".into()))
    }
}
