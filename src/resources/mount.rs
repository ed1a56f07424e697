//! NFS Mount Lifecycle
//!
//! Manages `hedvig_mount` resources: an NFS virtual disk exported through a
//! storage controller. The identifier is `mount$<vdisk>$<controller>`.

use crate::cluster::{Classification, Cluster, Command, Operation, Params, Shape};
use crate::domain::identifier::{build_id, parse_id};
use crate::domain::ports::{ResourceKind, ResourceLifecycle, ResourceState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Declarative attribute set of an NFS mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MountAttributes {
    /// Mounted virtual disk
    pub vdisk: String,
    /// Controller exporting the filesystem
    pub controller: String,
}

impl MountAttributes {
    pub fn new(vdisk: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            vdisk: vdisk.into(),
            controller: controller.into(),
        }
    }
}

/// Lifecycle of `hedvig_mount` resources
pub struct MountResource {
    cluster: Arc<Cluster>,
}

impl MountResource {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster }
    }

    fn key(id: &str) -> Result<MountAttributes> {
        let fields = parse_id(ResourceKind::Mount, id)?;
        Ok(MountAttributes::new(fields[0].as_str(), fields[1].as_str()))
    }

    fn command(operation: Operation, mount: &MountAttributes) -> Result<Command> {
        let params = Params::new()
            .string("virtualDisk", &mount.vdisk)?
            .strings("targets", [mount.controller.as_str()])?;
        Ok(Command::new(operation, params))
    }

    async fn unmount(&self, mount: &MountAttributes) -> Result<()> {
        let command = Self::command(Operation::Unmount, mount)?;

        let session = self.cluster.session().await?;
        info!("Unmounting {} from {}", mount.vdisk, mount.controller);

        match self.cluster.call(&session, command, Shape::Any).await?.classify()? {
            Classification::Success => Ok(()),
            Classification::NotFound(message) => {
                warn!(
                    "Mount {} on {} already gone ({})",
                    mount.vdisk, mount.controller, message
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ResourceLifecycle for MountResource {
    type Attributes = MountAttributes;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Mount
    }

    async fn create(&self, desired: MountAttributes) -> Result<ResourceState<MountAttributes>> {
        let id = build_id(
            ResourceKind::Mount,
            &[desired.vdisk.as_str(), desired.controller.as_str()],
        )?;
        let command = Self::command(Operation::Mount, &desired)?;

        let session = self.cluster.session().await?;
        info!("Mounting {} on {}", desired.vdisk, desired.controller);

        let envelope = self.cluster.call(&session, command, Shape::Any).await?;
        if let Classification::NotFound(message) = envelope.classify()? {
            return Err(Error::RemoteRejection {
                operation: Operation::Mount.to_string(),
                message,
            });
        }

        self.read(&id, Some(&desired))
            .await?
            .ok_or_else(|| Error::RemoteRejection {
                operation: Operation::ListExportedTargets.to_string(),
                message: format!(
                    "{} not exported on {} after mount",
                    desired.vdisk, desired.controller
                ),
            })
    }

    async fn read(
        &self,
        id: &str,
        _prior: Option<&MountAttributes>,
    ) -> Result<Option<ResourceState<MountAttributes>>> {
        let key = Self::key(id)?;
        let command = Command::new(
            Operation::ListExportedTargets,
            Params::new().string("virtualDisk", &key.vdisk)?,
        );

        let session = self.cluster.session().await?;
        let envelope = self.cluster.call(&session, command, Shape::Strings).await?;

        if let Classification::NotFound(message) = envelope.classify()? {
            warn!("Mount of {} not found ({}), clearing from state", key.vdisk, message);
            return Ok(None);
        }

        if !envelope.strings()?.iter().any(|target| *target == key.controller) {
            warn!(
                "{} no longer exported on {}, clearing from state",
                key.vdisk, key.controller
            );
            return Ok(None);
        }

        Ok(Some(ResourceState {
            id: id.to_string(),
            attributes: key,
        }))
    }

    /// Every attribute is part of the key, so a change remounts
    async fn update(
        &self,
        id: &str,
        prior: &MountAttributes,
        desired: MountAttributes,
    ) -> Result<Option<ResourceState<MountAttributes>>> {
        let current = Self::key(id)?;
        if *prior == desired && current == desired {
            return self.read(id, Some(&desired)).await;
        }

        // The replacement must be encodable before the old export goes away
        build_id(
            ResourceKind::Mount,
            &[desired.vdisk.as_str(), desired.controller.as_str()],
        )?;
        Self::command(Operation::Mount, &desired)?;
        self.unmount(&current).await?;
        self.create(desired).await.map(Some)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let key = Self::key(id)?;
        self.unmount(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterConfig, ScriptedTransport};
    use crate::domain::ports::TransportResponse;
    use assert_matches::assert_matches;

    const LOGIN: &str = r#"{"status":"ok","result":{"sessionId":"s-1"}}"#;

    fn setup() -> (Arc<ScriptedTransport>, MountResource) {
        let transport = Arc::new(ScriptedTransport::new());
        let config = ClusterConfig::for_node("hv1").with_credentials("admin", "pw");
        let cluster = Arc::new(Cluster::new(&config, transport.clone()));
        (transport, MountResource::new(cluster))
    }

    #[tokio::test]
    async fn test_create_mount() {
        let (transport, mounts) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":[{"name":"ctrl-a","status":"ok"}]}"#);
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":["ctrl-a"]}"#);

        let state = mounts.create(MountAttributes::new("share", "ctrl-a")).await.unwrap();

        assert_eq!(state.id, "mount$share$ctrl-a");
        assert_eq!(
            transport.commands()[1],
            "{type:Mount,category:VirtualDiskManagement,params:{virtualDisk:'share',targets:['ctrl-a']},sessionId:'s-1'}"
        );
        assert!(transport.commands()[3].starts_with("{type:ListExportedTargets,"));
    }

    #[tokio::test]
    async fn test_read_empty_list_drops_mount() {
        let (transport, mounts) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":[]}"#);

        assert!(mounts.read("mount$share$ctrl-a", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_404_is_hard_error() {
        let (transport, mounts) = setup();
        transport.push_ok(LOGIN);
        transport.push(TransportResponse {
            status: 404,
            body: String::new(),
        });

        let err = mounts.read("mount$share$ctrl-a", None).await.unwrap_err();
        assert_matches!(err, Error::Decode { .. });
    }

    #[tokio::test]
    async fn test_update_unchanged_only_reads() {
        let (transport, mounts) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":["ctrl-a","ctrl-b"]}"#);

        let attrs = MountAttributes::new("share", "ctrl-a");
        let state = mounts
            .update("mount$share$ctrl-a", &attrs, attrs.clone())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(state.attributes, attrs);
        assert_eq!(transport.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_update_unencodable_key_keeps_old_mount() {
        let (transport, mounts) = setup();

        let prior = MountAttributes::new("share", "ctrl-a");
        let err = mounts
            .update("mount$share$ctrl-a", &prior, MountAttributes::new("share", "ctrl[b]"))
            .await
            .unwrap_err();

        assert_matches!(err, Error::UnencodableValue { .. });
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_update_remounts() {
        let (transport, mounts) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok"}"#);
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":[{"name":"ctrl-b","status":"ok"}]}"#);
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":["ctrl-b"]}"#);

        let prior = MountAttributes::new("share", "ctrl-a");
        let state = mounts
            .update("mount$share$ctrl-a", &prior, MountAttributes::new("share", "ctrl-b"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(state.id, "mount$share$ctrl-b");
        let commands = transport.commands();
        assert!(commands[1].starts_with("{type:Unmount,"));
        assert!(commands[3].starts_with("{type:Mount,"));
    }

    #[tokio::test]
    async fn test_delete_unmounts() {
        let (transport, mounts) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":[{"name":"ctrl-a","status":"ok"}]}"#);

        mounts.delete("mount$share$ctrl-a").await.unwrap();
        assert!(transport.commands()[1].starts_with(
            "{type:Unmount,category:VirtualDiskManagement,params:{virtualDisk:'share',targets:['ctrl-a']}"
        ));
    }

    #[tokio::test]
    async fn test_delete_rejection_surfaces() {
        let (transport, mounts) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"error","message":"share is busy"}"#);

        let err = mounts.delete("mount$share$ctrl-a").await.unwrap_err();
        assert_matches!(err, Error::RemoteRejection { ref message, .. } if message == "share is busy");
    }
}
