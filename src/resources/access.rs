//! ACL Access Lifecycle
//!
//! Manages `hedvig_access` resources: an access-control entry granting a host
//! address access to a virtual disk. The identifier is
//! `access$<vdisk>$<host>$<address>`. Entries cannot be changed in place.

use crate::cluster::{Classification, Cluster, Command, Operation, Params, Shape};
use crate::domain::identifier::{build_id, parse_id};
use crate::domain::ports::{ResourceKind, ResourceLifecycle, ResourceState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Access type used when neither the caller nor prior state supplies one
pub const DEFAULT_ACCESS_TYPE: &str = "host";

/// Declarative attribute set of an ACL entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AccessAttributes {
    /// Virtual disk the entry applies to
    pub vdisk: String,
    /// Host name
    pub host: String,
    /// Initiator address, usually an IP
    pub address: String,
    /// Access type, e.g. `host`
    #[serde(rename = "type")]
    pub access_type: String,
}

impl AccessAttributes {
    pub fn new(
        vdisk: impl Into<String>,
        host: impl Into<String>,
        address: impl Into<String>,
        access_type: impl Into<String>,
    ) -> Self {
        Self {
            vdisk: vdisk.into(),
            host: host.into(),
            address: address.into(),
            access_type: access_type.into(),
        }
    }

    /// First attribute differing from `other`
    fn changed_field(&self, other: &AccessAttributes) -> Option<&'static str> {
        if self.vdisk != other.vdisk {
            Some("vdisk")
        } else if self.host != other.host {
            Some("host")
        } else if self.address != other.address {
            Some("address")
        } else if self.access_type != other.access_type {
            Some("type")
        } else {
            None
        }
    }
}

/// One host record of `GetACLInformation`
#[derive(Debug, Deserialize)]
struct AclRecord {
    host: String,
    #[serde(default)]
    initiator: Vec<Initiator>,
}

#[derive(Debug, Deserialize)]
struct Initiator {
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl Initiator {
    fn matches(&self, address: &str) -> bool {
        self.ip.as_deref() == Some(address) || self.name.as_deref() == Some(address)
    }
}

/// Find the entry for `host` and then `address` within the per-vdisk listing
fn find_entry(records: &[AclRecord], host: &str, address: &str) -> bool {
    records
        .iter()
        .filter(|record| record.host == host)
        .any(|record| record.initiator.iter().any(|i| i.matches(address)))
}

/// Lifecycle of `hedvig_access` resources
pub struct AccessResource {
    cluster: Arc<Cluster>,
}

impl AccessResource {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster }
    }

    fn access_id(access: &AccessAttributes) -> Result<String> {
        build_id(
            ResourceKind::Access,
            &[
                access.vdisk.as_str(),
                access.host.as_str(),
                access.address.as_str(),
            ],
        )
    }
}

#[async_trait]
impl ResourceLifecycle for AccessResource {
    type Attributes = AccessAttributes;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Access
    }

    async fn create(&self, desired: AccessAttributes) -> Result<ResourceState<AccessAttributes>> {
        if desired.access_type.trim().is_empty() {
            return Err(Error::InvalidAttribute {
                field: "type".into(),
                reason: "must not be empty".into(),
            });
        }
        let id = Self::access_id(&desired)?;
        let params = Params::new()
            .strings("virtualDisks", [desired.vdisk.as_str()])?
            .string("host", &desired.host)?
            .string("address", &desired.address)?
            .string("type", &desired.access_type)?;
        let command = Command::new(Operation::PersistACLAccess, params);

        let session = self.cluster.session().await?;
        info!(
            "Granting {} ({}) access to {}",
            desired.host, desired.address, desired.vdisk
        );

        let envelope = self.cluster.call(&session, command, Shape::Items).await?;
        if let Classification::NotFound(message) = envelope.classify()? {
            return Err(Error::RemoteRejection {
                operation: Operation::PersistACLAccess.to_string(),
                message,
            });
        }
        if envelope.items().is_empty() {
            return Err(Error::Decode {
                operation: Operation::PersistACLAccess.to_string(),
                reason: "no per-disk results in reply".into(),
            });
        }

        self.read(&id, Some(&desired))
            .await?
            .ok_or_else(|| Error::RemoteRejection {
                operation: Operation::GetACLInformation.to_string(),
                message: format!(
                    "access for {} at {} on {} not found after creation",
                    desired.host, desired.address, desired.vdisk
                ),
            })
    }

    async fn read(
        &self,
        id: &str,
        prior: Option<&AccessAttributes>,
    ) -> Result<Option<ResourceState<AccessAttributes>>> {
        let fields = parse_id(ResourceKind::Access, id)?;
        let (vdisk, host, address) = (&fields[0], &fields[1], &fields[2]);
        let command = Command::new(
            Operation::GetACLInformation,
            Params::new().string("virtualDisk", vdisk)?,
        );

        let session = self.cluster.session().await?;
        let envelope = self.cluster.call(&session, command, Shape::Records).await?;

        if let Classification::NotFound(message) = envelope.classify()? {
            warn!("ACL for {} not found ({}), clearing from state", vdisk, message);
            return Ok(None);
        }

        let records: Vec<AclRecord> = envelope.records()?;
        if !find_entry(&records, host, address) {
            warn!(
                "No ACL entry for {} at {} on {}, clearing from state",
                host, address, vdisk
            );
            return Ok(None);
        }

        let access_type = prior
            .map(|p| p.access_type.clone())
            .unwrap_or_else(|| DEFAULT_ACCESS_TYPE.to_string());

        Ok(Some(ResourceState {
            id: id.to_string(),
            attributes: AccessAttributes::new(vdisk.as_str(), host.as_str(), address.as_str(), access_type),
        }))
    }

    /// Entries are immutable; an unchanged set is re-read
    async fn update(
        &self,
        id: &str,
        prior: &AccessAttributes,
        desired: AccessAttributes,
    ) -> Result<Option<ResourceState<AccessAttributes>>> {
        parse_id(ResourceKind::Access, id)?;
        if let Some(field) = prior.changed_field(&desired) {
            return Err(Error::ImmutableAttribute {
                kind: ResourceKind::Access.to_string(),
                field: field.to_string(),
            });
        }
        self.read(id, Some(&desired)).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let fields = parse_id(ResourceKind::Access, id)?;
        let params = Params::new()
            .string("virtualDisk", &fields[0])?
            .string("host", &fields[1])?
            .strings("address", [fields[2].as_str()])?;
        let command = Command::new(Operation::RemoveACLAccess, params);

        let session = self.cluster.session().await?;
        info!("Revoking {} ({}) access to {}", fields[1], fields[2], fields[0]);

        match self.cluster.call(&session, command, Shape::Any).await?.classify()? {
            Classification::Success => Ok(()),
            Classification::NotFound(message) => {
                warn!("ACL entry {} already removed ({})", id, message);
                Ok(())
            }
        }
    }
}
