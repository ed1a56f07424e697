//! Cluster connection configuration

use crate::cluster::session::Credentials;
use crate::error::{Error, Result};

/// Configuration for reaching a cluster's REST endpoint
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Node address, `host` or `host:port`
    pub node: String,
    /// URL scheme, `http` or `https`
    pub scheme: String,
    /// Login credentials
    pub credentials: Credentials,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node: String::new(),
            scheme: "http".to_string(),
            credentials: Credentials::default(),
        }
    }
}

impl ClusterConfig {
    /// Default configuration pointed at `node`
    pub fn for_node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials::new(username, password);
        self
    }

    /// REST endpoint every command is sent to
    pub fn base_url(&self) -> String {
        format!("{}://{}/rest/", self.scheme, self.node)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.is_empty() {
            return Err(Error::Configuration("node address is required".into()));
        }
        if self.node.contains('/') || self.node.chars().any(char::is_whitespace) {
            return Err(Error::Configuration(format!(
                "node must be a host or host:port, got '{}'",
                self.node
            )));
        }
        match self.scheme.as_str() {
            "http" | "https" => {}
            other => {
                return Err(Error::Configuration(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        }
        if self.credentials.username.is_empty() {
            return Err(Error::Configuration("username is required".into()));
        }
        Ok(())
    }
}
