//! Session Provider
//!
//! Every lifecycle operation logs in afresh and runs under the token it gets
//! back. Tokens are never cached, logged, or persisted.

use crate::cluster::codec::{Command, Operation, Params};
use crate::cluster::envelope::{decode, Shape, Status};
use crate::cluster::ApiClient;
use crate::error::{Error, Result};
use serde::Deserialize;
use tracing::{debug, warn};

// =============================================================================
// Secrets
// =============================================================================

/// Opaque session identifier issued by `Login`
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for rendering into a command only
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Login credentials for the cluster
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResult {
    #[serde(default)]
    session_id: String,
}

/// Obtains session tokens for an [`ApiClient`]
pub struct SessionProvider<'a> {
    client: &'a ApiClient,
    credentials: &'a Credentials,
}

impl<'a> SessionProvider<'a> {
    pub fn new(client: &'a ApiClient, credentials: &'a Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Log in and return a fresh session token.
    ///
    /// Every failure, including transport and decode failures, is reported as
    /// [`Error::Auth`]. There is no retry.
    pub async fn acquire(&self) -> Result<SessionToken> {
        let command = self.login_command()?;

        let body = self
            .client
            .fetch(&command)
            .await
            .map_err(|e| Error::Auth(format!("login request failed: {}", e)))?;

        let envelope = decode(Operation::Login, &body, Shape::Object)
            .map_err(|e| Error::Auth(format!("unreadable login response: {}", e)))?;

        if envelope.status != Status::Ok {
            warn!("Login rejected for user {}", self.credentials.username);
            return Err(Error::Auth(
                envelope
                    .message
                    .unwrap_or_else(|| format!("login status {}", envelope.status)),
            ));
        }

        let result: LoginResult = envelope
            .object()
            .map_err(|e| Error::Auth(format!("unreadable login result: {}", e)))?;

        if result.session_id.is_empty() {
            return Err(Error::Auth("login returned no session".into()));
        }

        debug!("Acquired session for user {}", self.credentials.username);
        Ok(SessionToken::new(result.session_id))
    }

    fn login_command(&self) -> Result<Command> {
        // Encoding errors would echo the offending value, so they are replaced
        // with a message naming only the field.
        let params = Params::new()
            .string("userName", &self.credentials.username)
            .map_err(|_| Error::Auth("username contains characters the protocol cannot carry".into()))?
            .string("password", &self.credentials.password)
            .map_err(|_| Error::Auth("password contains characters the protocol cannot carry".into()))?
            .string("cluster", "")?;

        Ok(Command::new(Operation::Login, params))
    }
}
