//! Hedvig Adapter - Resource Lifecycle for Hedvig Storage Clusters
//!
//! Reconciles declared virtual disks, LUN exports, NFS mounts and ACL
//! entries against a Hedvig cluster's REST management API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Orchestrating caller / CLI                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                  ResourceFactory (DynResource)                    │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌────────────┐  │
//! │  │    Disk    │  │    Lun     │  │   Mount    │  │   Access   │  │
//! │  └─────┬──────┘  └─────┬──────┘  └─────┬──────┘  └─────┬──────┘  │
//! │        └───────────────┴───────┬───────┴───────────────┘         │
//! ├────────────────────────────────┼─────────────────────────────────┤
//! │        Cluster: session, command codec, response envelope         │
//! ├────────────────────────────────┼─────────────────────────────────┤
//! │             Transport (HTTP GET /rest/?request=...)               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cluster`]: Command codec, envelope decoding, sessions and transports
//! - [`domain`]: Resource kinds, identifiers and lifecycle ports
//! - [`resources`]: Per-kind lifecycles and disk validation
//! - [`error`]: Error types and handling

pub mod cluster;
pub mod domain;
pub mod error;
pub mod resources;

// Re-export commonly used types
pub use cluster::{
    Classification, Cluster, ClusterConfig, Command, Credentials, Envelope, HttpTransport,
    Operation, Params, ScriptedTransport, SessionToken, Shape,
};

pub use domain::ports::{
    ResourceKind, ResourceLifecycle, ResourceState, Transport, TransportResponse,
};

pub use error::{Error, Result};

pub use resources::{
    AccessAttributes, AccessResource, DiskAttributes, DiskResource, DiskRule, DiskType,
    DynResource, LunAttributes, LunResource, MountAttributes, MountResource, ResourceFactory,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
