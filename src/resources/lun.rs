//! LUN Export Lifecycle
//!
//! Manages `hedvig_lun` resources: a virtual disk exported as a LUN through a
//! storage controller. The identifier is `lun$<vdisk>$<controller>`.

use crate::cluster::{Classification, Cluster, Command, Operation, Params, Shape};
use crate::domain::identifier::{build_id, parse_id};
use crate::domain::ports::{ResourceKind, ResourceLifecycle, ResourceState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Declarative attribute set of a LUN export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LunAttributes {
    /// Exported virtual disk
    pub vdisk: String,
    /// Controller presenting the LUN
    pub controller: String,
}

impl LunAttributes {
    pub fn new(vdisk: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            vdisk: vdisk.into(),
            controller: controller.into(),
        }
    }
}

/// Export locations reported by `VirtualDiskDetails`
#[derive(Debug, Default, Deserialize)]
struct LunDetails {
    #[serde(default, rename = "targetLocations")]
    target_locations: Vec<String>,
}

impl LunDetails {
    /// Whether `controller` appears among the `controller:port` locations
    fn exported_on(&self, controller: &str) -> bool {
        self.target_locations
            .iter()
            .any(|location| location.split(':').next() == Some(controller))
    }
}

/// Lifecycle of `hedvig_lun` resources
pub struct LunResource {
    cluster: Arc<Cluster>,
}

impl LunResource {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster }
    }

    fn key(id: &str) -> Result<LunAttributes> {
        let fields = parse_id(ResourceKind::Lun, id)?;
        Ok(LunAttributes::new(&fields[0], &fields[1]))
    }

    fn add_command(lun: &LunAttributes) -> Result<Command> {
        let params = Params::new()
            .strings("virtualDisks", [lun.vdisk.as_str()])?
            .strings("targets", [lun.controller.as_str()])?
            .boolean("readonly", false);
        Ok(Command::new(Operation::AddLun, params))
    }

    async fn unmap(&self, lun: &LunAttributes) -> Result<()> {
        let params = Params::new()
            .string("virtualDisk", &lun.vdisk)?
            .string("target", &lun.controller)?;
        let command = Command::new(Operation::UnmapLun, params);

        let session = self.cluster.session().await?;
        info!("Unmapping LUN: {} from {}", lun.vdisk, lun.controller);

        match self.cluster.call(&session, command, Shape::Any).await?.classify()? {
            Classification::Success => Ok(()),
            Classification::NotFound(message) => {
                warn!(
                    "LUN {} on {} already unmapped ({})",
                    lun.vdisk, lun.controller, message
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ResourceLifecycle for LunResource {
    type Attributes = LunAttributes;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Lun
    }

    async fn create(&self, desired: LunAttributes) -> Result<ResourceState<LunAttributes>> {
        let id = build_id(ResourceKind::Lun, &[desired.vdisk.as_str(), desired.controller.as_str()])?;
        let command = Self::add_command(&desired)?;

        let session = self.cluster.session().await?;
        info!("Exporting LUN: {} via {}", desired.vdisk, desired.controller);

        let envelope = self.cluster.call(&session, command, Shape::Items).await?;
        if let Classification::NotFound(message) = envelope.classify()? {
            return Err(Error::RemoteRejection {
                operation: Operation::AddLun.to_string(),
                message,
            });
        }

        self.read(&id, Some(&desired))
            .await?
            .ok_or_else(|| Error::RemoteRejection {
                operation: Operation::VirtualDiskDetails.to_string(),
                message: format!(
                    "LUN {} not exported on {} after creation",
                    desired.vdisk, desired.controller
                ),
            })
    }

    async fn read(
        &self,
        id: &str,
        _prior: Option<&LunAttributes>,
    ) -> Result<Option<ResourceState<LunAttributes>>> {
        let key = Self::key(id)?;
        let command = Command::new(
            Operation::VirtualDiskDetails,
            Params::new().string("virtualDisk", &key.vdisk)?,
        );

        let session = self.cluster.session().await?;
        let envelope = self.cluster.call(&session, command, Shape::Object).await?;

        if let Classification::NotFound(message) = envelope.classify()? {
            warn!("Virtual disk {} for LUN not found ({}), clearing from state", key.vdisk, message);
            return Ok(None);
        }

        let details: LunDetails = envelope.object()?;
        if !details.exported_on(&key.controller) {
            warn!(
                "LUN {} no longer exported on {}, clearing from state",
                key.vdisk, key.controller
            );
            return Ok(None);
        }

        Ok(Some(ResourceState {
            id: id.to_string(),
            attributes: key,
        }))
    }

    /// Every attribute is part of the key, so a change remaps the LUN
    async fn update(
        &self,
        id: &str,
        prior: &LunAttributes,
        desired: LunAttributes,
    ) -> Result<Option<ResourceState<LunAttributes>>> {
        let current = Self::key(id)?;
        if *prior == desired && current == desired {
            return self.read(id, Some(&desired)).await;
        }

        // The replacement must be encodable before the old export goes away
        build_id(ResourceKind::Lun, &[desired.vdisk.as_str(), desired.controller.as_str()])?;
        Self::add_command(&desired)?;
        self.unmap(&current).await?;
        self.create(desired).await.map(Some)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let key = Self::key(id)?;
        self.unmap(&key).await
    }
}
