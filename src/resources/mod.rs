//! Resource kinds
//!
//! One lifecycle implementation per kind, plus a type-erased view so callers
//! can drive any kind with JSON attribute sets.

pub mod access;
pub mod disk;
pub mod lun;
pub mod mount;
pub mod validation;

pub use access::{AccessAttributes, AccessResource};
pub use disk::{DiskAttributes, DiskResource, DiskType, ReplicationPolicy, Residence};
pub use lun::{LunAttributes, LunResource};
pub use mount::{MountAttributes, MountResource};
pub use validation::{first_violation, validate_disk, DiskRule};

use crate::cluster::Cluster;
use crate::domain::ports::{ResourceKind, ResourceLifecycle, ResourceState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Lifecycle over JSON attribute sets, for callers that pick the kind at runtime
#[async_trait]
pub trait DynResource: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// JSON schema of the attribute set
    fn schema(&self) -> Result<JsonValue>;

    async fn create(&self, desired: JsonValue) -> Result<ResourceState<JsonValue>>;

    async fn read(
        &self,
        id: &str,
        prior: Option<JsonValue>,
    ) -> Result<Option<ResourceState<JsonValue>>>;

    async fn update(
        &self,
        id: &str,
        prior: JsonValue,
        desired: JsonValue,
    ) -> Result<Option<ResourceState<JsonValue>>>;

    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl<R> DynResource for R
where
    R: ResourceLifecycle,
    R::Attributes: JsonSchema,
{
    fn kind(&self) -> ResourceKind {
        ResourceLifecycle::kind(self)
    }

    fn schema(&self) -> Result<JsonValue> {
        serde_json::to_value(schemars::schema_for!(R::Attributes))
            .map_err(|e| Error::Internal(format!("schema rendering failed: {}", e)))
    }

    async fn create(&self, desired: JsonValue) -> Result<ResourceState<JsonValue>> {
        let desired = attributes_from(desired)?;
        let state = ResourceLifecycle::create(self, desired).await?;
        state_to_value(state)
    }

    async fn read(
        &self,
        id: &str,
        prior: Option<JsonValue>,
    ) -> Result<Option<ResourceState<JsonValue>>> {
        let prior: Option<R::Attributes> = prior.map(attributes_from).transpose()?;
        ResourceLifecycle::read(self, id, prior.as_ref())
            .await?
            .map(state_to_value)
            .transpose()
    }

    async fn update(
        &self,
        id: &str,
        prior: JsonValue,
        desired: JsonValue,
    ) -> Result<Option<ResourceState<JsonValue>>> {
        let prior: R::Attributes = attributes_from(prior)?;
        let desired = attributes_from(desired)?;
        ResourceLifecycle::update(self, id, &prior, desired)
            .await?
            .map(state_to_value)
            .transpose()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        ResourceLifecycle::delete(self, id).await
    }
}

fn attributes_from<A: DeserializeOwned>(value: JsonValue) -> Result<A> {
    serde_json::from_value(value).map_err(|e| Error::InvalidAttribute {
        field: "attributes".into(),
        reason: e.to_string(),
    })
}

fn state_to_value<A: Serialize>(state: ResourceState<A>) -> Result<ResourceState<JsonValue>> {
    let attributes = serde_json::to_value(&state.attributes)
        .map_err(|e| Error::Internal(format!("state rendering failed: {}", e)))?;
    Ok(ResourceState {
        id: state.id,
        attributes,
    })
}

/// Factory for resource lifecycles
pub struct ResourceFactory;

impl ResourceFactory {
    /// Lifecycle for `kind` bound to `cluster`
    pub fn create(kind: ResourceKind, cluster: Arc<Cluster>) -> Arc<dyn DynResource> {
        match kind {
            ResourceKind::Disk => Arc::new(DiskResource::new(cluster)),
            ResourceKind::Lun => Arc::new(LunResource::new(cluster)),
            ResourceKind::Mount => Arc::new(MountResource::new(cluster)),
            ResourceKind::Access => Arc::new(AccessResource::new(cluster)),
        }
    }

    /// Lifecycle by kind name, e.g. `disk` or `hedvig_vdisk`
    pub fn by_name(name: &str, cluster: Arc<Cluster>) -> Result<Arc<dyn DynResource>> {
        Ok(Self::create(name.parse()?, cluster))
    }
}
