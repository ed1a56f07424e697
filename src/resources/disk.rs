//! Virtual Disk Lifecycle
//!
//! Manages `hedvig_vdisk` resources. The identifier is `vdisk$<name>$<type>`;
//! only `size` can change in place, and only upwards.

use crate::cluster::{Classification, Cluster, Command, Operation, Params, Shape};
use crate::domain::identifier::{build_id, parse_id};
use crate::domain::ports::{ResourceKind, ResourceLifecycle, ResourceState};
use crate::error::{Error, Result};
use crate::resources::validation::validate_disk;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

// =============================================================================
// Attributes
// =============================================================================

/// Disk type as declared by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DiskType {
    #[serde(rename = "BLOCK", alias = "block")]
    Block,
    #[serde(rename = "NFS", alias = "nfs", alias = "NFS_MASTER_DISK")]
    Nfs,
}

impl DiskType {
    /// Name used in identifiers
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskType::Block => "BLOCK",
            DiskType::Nfs => "NFS",
        }
    }

    /// Name the cluster uses on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            DiskType::Block => "BLOCK",
            DiskType::Nfs => "NFS_MASTER_DISK",
        }
    }

    /// Parse either naming
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "BLOCK" => Some(DiskType::Block),
            "NFS" | "NFS_MASTER_DISK" => Some(DiskType::Nfs),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media the disk resides on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Residence {
    #[default]
    #[serde(rename = "HDD", alias = "hdd")]
    Hdd,
    #[serde(rename = "FLASH", alias = "flash")]
    Flash,
}

impl Residence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Residence::Hdd => "HDD",
            Residence::Flash => "FLASH",
        }
    }
}

/// Replica placement policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ReplicationPolicy {
    #[default]
    Agnostic,
    RackAware,
    DataCenterAware,
}

impl ReplicationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicationPolicy::Agnostic => "Agnostic",
            ReplicationPolicy::RackAware => "RackAware",
            ReplicationPolicy::DataCenterAware => "DataCenterAware",
        }
    }
}

fn default_replication_factor() -> u32 {
    3
}

fn default_block_size() -> u32 {
    512
}

/// Declarative attribute set of a virtual disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiskAttributes {
    /// Virtual disk name
    pub name: String,

    /// Size in GB; the only attribute that can change in place
    pub size: u64,

    /// BLOCK or NFS
    #[serde(rename = "type")]
    pub disk_type: DiskType,

    #[serde(default)]
    pub residence: Residence,

    #[serde(default = "default_replication_factor", rename = "replicationfactor")]
    pub replication_factor: u32,

    #[serde(default)]
    pub deduplication: bool,

    #[serde(default)]
    pub compressed: bool,

    /// Block size in bytes
    #[serde(default = "default_block_size", rename = "blocksize")]
    pub block_size: u32,

    #[serde(default, rename = "clusteredfilesystem")]
    pub clustered_filesystem: bool,

    /// SCSI-3 persistent reservations
    #[serde(default)]
    pub scsi3pr: bool,

    #[serde(default, rename = "cacheenabled")]
    pub cache_enabled: bool,

    #[serde(default)]
    pub encryption: bool,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "replicationpolicy")]
    pub replication_policy: ReplicationPolicy,
}

impl DiskAttributes {
    /// Attribute set with every optional field at its default
    pub fn new(name: impl Into<String>, size: u64, disk_type: DiskType) -> Self {
        Self {
            name: name.into(),
            size,
            disk_type,
            residence: Residence::default(),
            replication_factor: default_replication_factor(),
            deduplication: false,
            compressed: false,
            block_size: default_block_size(),
            clustered_filesystem: false,
            scsi3pr: false,
            cache_enabled: false,
            encryption: false,
            description: String::new(),
            replication_policy: ReplicationPolicy::default(),
        }
    }

    /// First attribute, other than size, that differs from `other`
    fn immutable_change(&self, other: &DiskAttributes) -> Option<&'static str> {
        let changes = [
            (self.name != other.name, "name"),
            (self.disk_type != other.disk_type, "type"),
            (self.residence != other.residence, "residence"),
            (self.replication_factor != other.replication_factor, "replicationfactor"),
            (self.deduplication != other.deduplication, "deduplication"),
            (self.compressed != other.compressed, "compressed"),
            (self.block_size != other.block_size, "blocksize"),
            (self.clustered_filesystem != other.clustered_filesystem, "clusteredfilesystem"),
            (self.scsi3pr != other.scsi3pr, "scsi3pr"),
            (self.cache_enabled != other.cache_enabled, "cacheenabled"),
            (self.encryption != other.encryption, "encryption"),
            (self.description != other.description, "description"),
            (self.replication_policy != other.replication_policy, "replicationpolicy"),
        ];
        changes
            .into_iter()
            .find(|(changed, _)| *changed)
            .map(|(_, field)| field)
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct DiskSize {
    #[serde(default)]
    units: Option<String>,
    value: u64,
}

impl DiskSize {
    fn gigabytes(&self) -> std::result::Result<u64, String> {
        match self.units.as_deref().map(str::to_uppercase).as_deref() {
            None | Some("GB") => Ok(self.value),
            Some("TB") => self
                .value
                .checked_mul(1024)
                .ok_or_else(|| format!("{} TB overflows GB", self.value)),
            Some(other) => Err(format!("unsupported size unit '{}'", other)),
        }
    }
}

/// `VirtualDiskDetails` result
#[derive(Debug, Deserialize)]
struct DiskDetails {
    #[serde(rename = "vDiskName")]
    name: String,
    size: DiskSize,
    #[serde(rename = "diskType")]
    disk_type: String,
    #[serde(default)]
    residence: Option<Residence>,
    #[serde(default, rename = "replicationFactor")]
    replication_factor: Option<u32>,
    #[serde(default, alias = "dedup")]
    deduplication: Option<bool>,
    #[serde(default)]
    compressed: Option<bool>,
    #[serde(default, rename = "blockSize")]
    block_size: Option<u32>,
    #[serde(default, rename = "clusteredFileSystem", alias = "clusteredfilesystem")]
    clustered_filesystem: Option<bool>,
    #[serde(default)]
    scsi3pr: Option<bool>,
    #[serde(default, rename = "cacheEnabled", alias = "cacheEnable")]
    cache_enabled: Option<bool>,
    #[serde(default, alias = "isEncrypted")]
    encryption: Option<bool>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "replicationPolicy")]
    replication_policy: Option<ReplicationPolicy>,
}

impl DiskDetails {
    /// Attribute set as reported, falling back to `prior` for anything the
    /// cluster left out
    fn reconcile(self, prior: Option<&DiskAttributes>) -> std::result::Result<DiskAttributes, String> {
        let disk_type = DiskType::from_name(&self.disk_type)
            .ok_or_else(|| format!("unknown disk type '{}'", self.disk_type))?;
        let size = self.size.gigabytes()?;

        let mut attributes = match prior {
            Some(prior) => prior.clone(),
            None => DiskAttributes::new(self.name.clone(), size, disk_type),
        };

        attributes.name = self.name;
        attributes.size = size;
        attributes.disk_type = disk_type;
        if let Some(v) = self.residence {
            attributes.residence = v;
        }
        if let Some(v) = self.replication_factor {
            attributes.replication_factor = v;
        }
        if let Some(v) = self.deduplication {
            attributes.deduplication = v;
        }
        if let Some(v) = self.compressed {
            attributes.compressed = v;
        }
        if let Some(v) = self.block_size {
            attributes.block_size = v;
        }
        if let Some(v) = self.clustered_filesystem {
            attributes.clustered_filesystem = v;
        }
        if let Some(v) = self.scsi3pr {
            attributes.scsi3pr = v;
        }
        if let Some(v) = self.cache_enabled {
            attributes.cache_enabled = v;
        }
        if let Some(v) = self.encryption {
            attributes.encryption = v;
        }
        if let Some(v) = self.description {
            attributes.description = v;
        }
        if let Some(v) = self.replication_policy {
            attributes.replication_policy = v;
        }

        Ok(attributes)
    }
}

fn size_param(size: u64) -> Result<Params> {
    Ok(Params::new().string("unit", "GB")?.int("value", size))
}

fn add_command(disk: &DiskAttributes) -> Result<Command> {
    let mut params = Params::new()
        .string("name", &disk.name)?
        .object("size", size_param(disk.size)?)
        .symbol("diskType", disk.disk_type.wire_name())?
        .symbol("residence", disk.residence.as_str())?
        .int("replicationFactor", u64::from(disk.replication_factor))
        .boolean("deduplication", disk.deduplication)
        .boolean("compressed", disk.compressed)
        .int("blockSize", u64::from(disk.block_size))
        .boolean("clusteredfilesystem", disk.clustered_filesystem)
        .boolean("scsi3pr", disk.scsi3pr)
        .boolean("cacheEnable", disk.cache_enabled)
        .boolean("encryption", disk.encryption);
    if !disk.description.is_empty() {
        params = params.string("description", &disk.description)?;
    }
    params = params.symbol("replicationPolicy", disk.replication_policy.as_str())?;

    Ok(Command::new(Operation::AddVirtualDisk, params))
}

fn details_command(name: &str) -> Result<Command> {
    Ok(Command::new(
        Operation::VirtualDiskDetails,
        Params::new().string("virtualDisk", name)?,
    ))
}

// =============================================================================
// Disk Resource
// =============================================================================

/// Lifecycle of `hedvig_vdisk` resources
pub struct DiskResource {
    cluster: Arc<Cluster>,
}

impl DiskResource {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster }
    }

    fn disk_id(disk: &DiskAttributes) -> Result<String> {
        build_id(ResourceKind::Disk, &[disk.name.as_str(), disk.disk_type.as_str()])
    }

    /// Parse an identifier into the disk name and type
    fn disk_key(id: &str) -> Result<(String, DiskType)> {
        let mut fields = parse_id(ResourceKind::Disk, id)?;
        let disk_type = DiskType::from_name(&fields[1]).ok_or_else(|| Error::InvalidIdentifierField {
            kind: ResourceKind::Disk.tag().to_string(),
            field: fields[1].clone(),
            reason: "unknown disk type".into(),
        })?;
        Ok((fields.swap_remove(0), disk_type))
    }

    fn disk_name(id: &str) -> Result<String> {
        Self::disk_key(id).map(|(name, _)| name)
    }

    async fn resize(&self, name: &str, size: u64) -> Result<Classification> {
        let params = Params::new()
            .strings("virtualDisks", [name])?
            .object("size", size_param(size)?);
        let command = Command::new(Operation::ResizeDisks, params);

        let session = self.cluster.session().await?;
        info!("Resizing virtual disk: {} to {} GB", name, size);
        self.cluster
            .call(&session, command, Shape::Items)
            .await?
            .classify()
    }
}

#[async_trait]
impl ResourceLifecycle for DiskResource {
    type Attributes = DiskAttributes;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Disk
    }

    async fn create(&self, desired: DiskAttributes) -> Result<ResourceState<DiskAttributes>> {
        validate_disk(&desired)?;
        let command = add_command(&desired)?;
        let id = Self::disk_id(&desired)?;

        let session = self.cluster.session().await?;
        info!(
            "Creating virtual disk: {} ({} GB, type: {}, residence: {})",
            desired.name,
            desired.size,
            desired.disk_type,
            desired.residence.as_str()
        );

        let envelope = self.cluster.call(&session, command, Shape::Any).await?;
        if let Classification::NotFound(message) = envelope.classify()? {
            return Err(Error::RemoteRejection {
                operation: Operation::AddVirtualDisk.to_string(),
                message,
            });
        }

        self.read(&id, Some(&desired))
            .await?
            .ok_or_else(|| Error::RemoteRejection {
                operation: Operation::VirtualDiskDetails.to_string(),
                message: format!("virtual disk {} not found after creation", desired.name),
            })
    }

    async fn read(
        &self,
        id: &str,
        prior: Option<&DiskAttributes>,
    ) -> Result<Option<ResourceState<DiskAttributes>>> {
        let (name, disk_type) = Self::disk_key(id)?;
        let command = details_command(&name)?;

        let session = self.cluster.session().await?;
        let envelope = self.cluster.call(&session, command, Shape::Object).await?;

        if let Classification::NotFound(message) = envelope.classify()? {
            warn!("Virtual disk {} not found ({}), clearing from state", name, message);
            return Ok(None);
        }

        let details: DiskDetails = envelope.object()?;
        let attributes = details.reconcile(prior).map_err(|reason| Error::Decode {
            operation: Operation::VirtualDiskDetails.to_string(),
            reason,
        })?;

        // Same name, different disk: recreated out of band
        if attributes.name != name || attributes.disk_type != disk_type {
            warn!(
                "Virtual disk {} reported as {} ({}), expected {}; clearing from state",
                name, attributes.name, attributes.disk_type, disk_type
            );
            return Ok(None);
        }

        Ok(Some(ResourceState {
            id: id.to_string(),
            attributes,
        }))
    }

    async fn update(
        &self,
        id: &str,
        prior: &DiskAttributes,
        desired: DiskAttributes,
    ) -> Result<Option<ResourceState<DiskAttributes>>> {
        let name = Self::disk_name(id)?;
        if let Some(field) = prior.immutable_change(&desired) {
            return Err(Error::ImmutableAttribute {
                kind: ResourceKind::Disk.to_string(),
                field: field.to_string(),
            });
        }
        validate_disk(&desired)?;

        if desired.size != prior.size {
            let current = match self.read(id, Some(prior)).await? {
                Some(state) => state.attributes.size,
                None => return Ok(None),
            };

            if desired.size < current {
                return Err(Error::CannotDownsize {
                    name,
                    current,
                    requested: desired.size,
                });
            }

            if desired.size > current {
                if let Classification::NotFound(message) = self.resize(&name, desired.size).await? {
                    warn!("Virtual disk {} vanished during resize ({})", name, message);
                    return Ok(None);
                }
            }
        }

        self.read(id, Some(&desired)).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let name = Self::disk_name(id)?;
        let command = Command::new(
            Operation::DeleteVDisk,
            Params::new().strings("virtualDisks", [name.as_str()])?,
        );

        let session = self.cluster.session().await?;
        info!("Deleting virtual disk: {}", name);

        match self.cluster.call(&session, command, Shape::Items).await?.classify()? {
            Classification::Success => Ok(()),
            Classification::NotFound(message) => {
                warn!("Virtual disk {} already absent ({})", name, message);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterConfig, ScriptedTransport};
    use crate::resources::validation::DiskRule;
    use assert_matches::assert_matches;

    const LOGIN: &str = r#"{"status":"ok","result":{"sessionId":"s-1"}}"#;

    fn setup() -> (Arc<ScriptedTransport>, DiskResource) {
        let transport = Arc::new(ScriptedTransport::new());
        let config = ClusterConfig::for_node("hv1").with_credentials("admin", "pw");
        let cluster = Arc::new(Cluster::new(&config, transport.clone()));
        (transport, DiskResource::new(cluster))
    }

    fn details(name: &str, size: u64, disk_type: &str) -> String {
        format!(
            r#"{{"status":"ok","result":{{"vDiskName":"{}","size":{{"units":"GB","value":{}}},"diskType":"{}","residence":"HDD","replicationFactor":3,"deduplication":false,"compressed":false,"blockSize":512,"clusteredFileSystem":{},"scsi3pr":false,"cacheEnabled":false,"encryption":false,"description":"","replicationPolicy":"Agnostic"}}}}"#,
            name,
            size,
            disk_type,
            disk_type == "NFS_MASTER_DISK"
        )
    }

    #[tokio::test]
    async fn test_create_block_disk() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":{}}"#);
        transport.push_ok(LOGIN);
        transport.push_ok(&details("d1", 9, "BLOCK"));

        let desired = DiskAttributes::new("d1", 9, DiskType::Block);
        let state = disks.create(desired.clone()).await.unwrap();

        assert_eq!(state.id, "vdisk$d1$BLOCK");
        assert_eq!(state.attributes, desired);
        assert_eq!(state.attributes.size, 9);

        let commands = transport.commands();
        assert_eq!(commands.len(), 4);
        assert!(commands[1].starts_with(
            "{type:AddVirtualDisk,category:VirtualDiskManagement,params:{name:'d1',size:{unit:'GB',value:9},diskType:BLOCK,"
        ));
        assert!(commands[3].contains("params:{virtualDisk:'d1'}"));
    }

    #[tokio::test]
    async fn test_create_nfs_maps_type_back() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok"}"#);
        transport.push_ok(LOGIN);
        transport.push_ok(&details("share", 14, "NFS_MASTER_DISK"));

        let mut desired = DiskAttributes::new("share", 14, DiskType::Nfs);
        desired.clustered_filesystem = true;
        let state = disks.create(desired.clone()).await.unwrap();

        assert_eq!(state.id, "vdisk$share$NFS");
        assert_eq!(state.attributes, desired);
        assert!(transport.commands()[1].contains("diskType:NFS_MASTER_DISK"));
    }

    #[tokio::test]
    async fn test_invalid_set_makes_no_requests() {
        let (transport, disks) = setup();

        let mut desired = DiskAttributes::new("d2", 9, DiskType::Nfs);
        desired.block_size = 4096;
        let err = disks.create(desired).await.unwrap_err();

        assert_matches!(err, Error::Validation(DiskRule::NfsRequiresBlockSize512));
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_unencodable_description_makes_no_requests() {
        let (transport, disks) = setup();

        let mut desired = DiskAttributes::new("d1", 9, DiskType::Block);
        desired.description = "{evil}".into();
        let err = disks.create(desired).await.unwrap_err();

        assert_matches!(err, Error::UnencodableValue { ref field, .. } if field == "description");
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejected() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"error","message":"Virtual disk d1 already exists"}"#);

        let err = disks
            .create(DiskAttributes::new("d1", 9, DiskType::Block))
            .await
            .unwrap_err();

        assert_matches!(
            err,
            Error::RemoteRejection { ref message, .. } if message == "Virtual disk d1 already exists"
        );
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn test_read_missing_disk_clears_state() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"warning","message":"Virtual disk d1 couldn't be found"}"#);

        let state = disks.read("vdisk$d1$BLOCK", None).await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_read_malformed_id_makes_no_requests() {
        let (transport, disks) = setup();

        let err = disks.read("vdisk$only-one-field", None).await.unwrap_err();
        assert_matches!(err, Error::MalformedIdentifier { expected: 3, found: 2, .. });

        let err = disks.read("vdisk$d1$TAPE", None).await.unwrap_err();
        assert_matches!(err, Error::InvalidIdentifierField { .. });

        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_read_without_prior_uses_remote_values() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(
            r#"{"status":"ok","result":{"vDiskName":"d1","size":{"units":"TB","value":2},"diskType":"BLOCK","residence":"FLASH"}}"#,
        );

        let state = disks.read("vdisk$d1$BLOCK", None).await.unwrap().unwrap();
        assert_eq!(state.attributes.size, 2048);
        assert_eq!(state.attributes.residence, Residence::Flash);
        assert_eq!(state.attributes.block_size, 512);
    }

    #[tokio::test]
    async fn test_read_type_change_is_drift() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(&details("d1", 9, "NFS_MASTER_DISK"));

        assert!(disks.read("vdisk$d1$BLOCK", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_oversized_tb_is_decode_error() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(&format!(
            r#"{{"status":"ok","result":{{"vDiskName":"d1","size":{{"units":"TB","value":{}}},"diskType":"BLOCK"}}}}"#,
            u64::MAX
        ));

        let err = disks.read("vdisk$d1$BLOCK", None).await.unwrap_err();
        assert_matches!(err, Error::Decode { ref reason, .. } if reason.contains("overflows"));
    }

    #[tokio::test]
    async fn test_grow_disk() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(&details("d1", 9, "BLOCK"));
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":[{"name":"d1","status":"ok"}]}"#);
        transport.push_ok(LOGIN);
        transport.push_ok(&details("d1", 20, "BLOCK"));

        let prior = DiskAttributes::new("d1", 9, DiskType::Block);
        let mut desired = prior.clone();
        desired.size = 20;

        let state = disks.update("vdisk$d1$BLOCK", &prior, desired).await.unwrap().unwrap();
        assert_eq!(state.attributes.size, 20);
        assert!(transport.commands()[3].starts_with(
            "{type:ResizeDisks,category:VirtualDiskManagement,params:{virtualDisks:['d1'],size:{unit:'GB',value:20}}"
        ));
    }

    #[tokio::test]
    async fn test_shrink_refused_without_resize() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(&details("d1", 9, "BLOCK"));

        let prior = DiskAttributes::new("d1", 9, DiskType::Block);
        let mut desired = prior.clone();
        desired.size = 5;

        let err = disks.update("vdisk$d1$BLOCK", &prior, desired).await.unwrap_err();
        assert_matches!(err, Error::CannotDownsize { current: 9, requested: 5, .. });
        assert!(transport
            .commands()
            .iter()
            .all(|c| !c.contains("ResizeDisks")));
    }

    #[tokio::test]
    async fn test_shrink_checked_against_remote_size() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        // Grown out-of-band to 30
        transport.push_ok(&details("d1", 30, "BLOCK"));

        let prior = DiskAttributes::new("d1", 9, DiskType::Block);
        let mut desired = prior.clone();
        desired.size = 20;

        let err = disks.update("vdisk$d1$BLOCK", &prior, desired).await.unwrap_err();
        assert_matches!(err, Error::CannotDownsize { current: 30, requested: 20, .. });
    }

    #[tokio::test]
    async fn test_immutable_change_refused() {
        let (transport, disks) = setup();

        let prior = DiskAttributes::new("d1", 9, DiskType::Block);
        let mut desired = prior.clone();
        desired.residence = Residence::Flash;

        let err = disks.update("vdisk$d1$BLOCK", &prior, desired).await.unwrap_err();
        assert_matches!(err, Error::ImmutableAttribute { ref field, .. } if field == "residence");
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_surfaces_item_failure() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"ok","result":[{"name":"d1","status":"error","message":"disk is exported"}]}"#);

        let err = disks.delete("vdisk$d1$BLOCK").await.unwrap_err();
        assert_matches!(
            err,
            Error::RemoteRejection { ref message, .. } if message == "d1: disk is exported"
        );
    }

    #[tokio::test]
    async fn test_delete_already_absent() {
        let (transport, disks) = setup();
        transport.push_ok(LOGIN);
        transport.push_ok(r#"{"status":"warning","message":"Virtual disk d1 not found"}"#);

        disks.delete("vdisk$d1$BLOCK").await.unwrap();
        assert!(transport.commands()[1].contains("params:{virtualDisks:['d1']}"));
    }

    #[tokio::test]
    async fn test_auth_failure_short_circuits() {
        let (transport, disks) = setup();
        transport.push_ok(r#"{"status":"error","message":"Invalid credentials"}"#);

        let err = disks.delete("vdisk$d1$BLOCK").await.unwrap_err();
        assert_matches!(err, Error::Auth(_));
        assert_eq!(transport.urls().len(), 1);
    }

    #[test]
    fn test_attributes_deserialize_with_defaults() {
        let attrs: DiskAttributes =
            serde_json::from_str(r#"{"name":"d1","size":9,"type":"BLOCK","clusteredfilesystem":false}"#)
                .unwrap();
        assert_eq!(attrs, DiskAttributes::new("d1", 9, DiskType::Block));
    }
}
