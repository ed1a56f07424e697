//! Cluster REST access
//!
//! Provides the pieces every resource kind shares:
//! - Command codec and response envelope
//! - Session acquisition
//! - Transports (HTTP and scripted)

pub mod codec;
pub mod config;
pub mod envelope;
pub mod session;
pub mod transport;

pub use codec::{Category, Command, Operation, Params, Value};
pub use config::ClusterConfig;
pub use envelope::{decode, Classification, Envelope, ItemResult, Payload, Shape, Status};
pub use session::{Credentials, SessionProvider, SessionToken};
pub use transport::{HttpTransport, ScriptedTransport};

use crate::domain::ports::TransportRef;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// API Client
// =============================================================================

/// Sends encoded commands to the REST endpoint
pub struct ApiClient {
    base_url: String,
    transport: TransportRef,
}

impl ApiClient {
    pub fn new(config: &ClusterConfig, transport: TransportRef) -> Self {
        Self {
            base_url: config.base_url(),
            transport,
        }
    }

    /// Full request URL for `command`
    pub fn request_url(&self, command: &Command) -> String {
        format!(
            "{}?request={}",
            self.base_url,
            urlencoding::encode(&command.encode())
        )
    }

    /// Send `command` and return the raw body of a 2xx reply.
    ///
    /// A 404 means the endpoint did not understand the request and is treated
    /// as a decode failure for every operation.
    pub async fn fetch(&self, command: &Command) -> Result<String> {
        let operation = command.operation();
        debug!("Sending {} request", operation);

        let response = self.transport.get(&self.request_url(command)).await?;

        match response.status {
            200..=299 => Ok(response.body),
            404 => Err(Error::Decode {
                operation: operation.to_string(),
                reason: "endpoint returned 404 for a malformed or unknown request".into(),
            }),
            status => Err(Error::HttpStatus {
                status,
                operation: operation.to_string(),
            }),
        }
    }

    /// Send `command` and decode the reply
    pub async fn send(&self, command: &Command, expected: Shape) -> Result<Envelope> {
        let body = self.fetch(command).await?;
        decode(command.operation(), &body, expected)
    }
}

// =============================================================================
// Cluster
// =============================================================================

/// Authenticated access to one cluster, shared by all resource kinds
pub struct Cluster {
    client: ApiClient,
    credentials: Credentials,
}

impl Cluster {
    pub fn new(config: &ClusterConfig, transport: TransportRef) -> Self {
        Self {
            client: ApiClient::new(config, transport),
            credentials: config.credentials.clone(),
        }
    }

    /// Validate `config` and connect over HTTP
    pub fn connect(config: &ClusterConfig) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self::new(config, Arc::new(HttpTransport::new()))))
    }

    /// Log in and return a fresh session
    pub async fn session(&self) -> Result<SessionToken> {
        SessionProvider::new(&self.client, &self.credentials)
            .acquire()
            .await
    }

    /// Run `command` under `session` and decode the reply
    pub async fn call(
        &self,
        session: &SessionToken,
        command: Command,
        expected: Shape,
    ) -> Result<Envelope> {
        let command = command.with_session(session);
        self.client.send(&command, expected).await
    }
}
