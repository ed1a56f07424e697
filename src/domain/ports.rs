//! Domain Ports - Core trait definitions for the adapter
//!
//! These traits define the boundaries between the lifecycle logic and the
//! outside world: the HTTP transport below it and the orchestrating caller
//! above it.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Resource Kinds
// =============================================================================

/// Remote object types the adapter manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Disk,
    Lun,
    Mount,
    Access,
}

impl ResourceKind {
    /// All kinds, in registration order
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Disk,
        ResourceKind::Lun,
        ResourceKind::Mount,
        ResourceKind::Access,
    ];

    /// Leading tag of the kind's identifier
    pub fn tag(&self) -> &'static str {
        match self {
            ResourceKind::Disk => "vdisk",
            ResourceKind::Lun => "lun",
            ResourceKind::Mount => "mount",
            ResourceKind::Access => "access",
        }
    }

    /// Number of `$`-separated fields in an identifier, tag included
    pub fn arity(&self) -> usize {
        match self {
            ResourceKind::Disk | ResourceKind::Lun | ResourceKind::Mount => 3,
            ResourceKind::Access => 4,
        }
    }

    /// Resource type name as registered with the orchestrating host
    pub fn resource_name(&self) -> &'static str {
        match self {
            ResourceKind::Disk => "hedvig_vdisk",
            ResourceKind::Lun => "hedvig_lun",
            ResourceKind::Mount => "hedvig_mount",
            ResourceKind::Access => "hedvig_access",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Disk => write!(f, "disk"),
            ResourceKind::Lun => write!(f, "lun"),
            ResourceKind::Mount => write!(f, "mount"),
            ResourceKind::Access => write!(f, "access"),
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disk" | "vdisk" | "hedvig_vdisk" => Ok(ResourceKind::Disk),
            "lun" | "hedvig_lun" => Ok(ResourceKind::Lun),
            "mount" | "hedvig_mount" => Ok(ResourceKind::Mount),
            "access" | "hedvig_access" => Ok(ResourceKind::Access),
            other => Err(Error::Configuration(format!(
                "Unknown resource kind: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Transport Port
// =============================================================================

/// Raw reply from the transport collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl TransportResponse {
    /// Successful (2xx) response with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// Port for issuing a single GET against the cluster REST endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` and return its status and body
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}

// =============================================================================
// Resource Lifecycle Port
// =============================================================================

/// Converged state of a present resource.
///
/// Returned to the orchestrating caller, which owns persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState<A> {
    /// Composite identifier addressing the remote object
    pub id: String,
    /// Attributes as reported by the cluster
    pub attributes: A,
}

/// Port for create/read/update/delete of one resource kind
#[async_trait]
pub trait ResourceLifecycle: Send + Sync {
    /// Declarative attribute set for this kind
    type Attributes: Clone + Serialize + DeserializeOwned + Send + Sync;

    /// Kind served by this implementation
    fn kind(&self) -> ResourceKind;

    /// Create the remote object and read back its authoritative state
    async fn create(&self, desired: Self::Attributes) -> Result<ResourceState<Self::Attributes>>;

    /// Read the remote object.
    ///
    /// `Ok(None)` means the object no longer exists and the identifier must be
    /// dropped. `prior` fills attributes the cluster does not report.
    async fn read(
        &self,
        id: &str,
        prior: Option<&Self::Attributes>,
    ) -> Result<Option<ResourceState<Self::Attributes>>>;

    /// Converge the remote object from `prior` towards `desired`
    async fn update(
        &self,
        id: &str,
        prior: &Self::Attributes,
        desired: Self::Attributes,
    ) -> Result<Option<ResourceState<Self::Attributes>>>;

    /// Remove the remote object
    async fn delete(&self, id: &str) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type TransportRef = Arc<dyn Transport>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_display() {
        assert_eq!(format!("{}", ResourceKind::Disk), "disk");
        assert_eq!(format!("{}", ResourceKind::Lun), "lun");
        assert_eq!(format!("{}", ResourceKind::Mount), "mount");
        assert_eq!(format!("{}", ResourceKind::Access), "access");
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("hedvig_vdisk".parse::<ResourceKind>().unwrap(), ResourceKind::Disk);
        assert_eq!("LUN".parse::<ResourceKind>().unwrap(), ResourceKind::Lun);
        assert_eq!("hedvig_access".parse::<ResourceKind>().unwrap(), ResourceKind::Access);
        assert!("bucket".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_arity_counts_tag() {
        assert_eq!(ResourceKind::Disk.arity(), 3);
        assert_eq!(ResourceKind::Access.arity(), 4);
    }
}
