//! Virtual disk validation
//!
//! Field checks run first, then the compatibility matrix. The matrix is
//! evaluated in a fixed order and stops at the first violated rule.

use crate::error::{Error, Result};
use crate::resources::disk::{DiskAttributes, DiskType, Residence};
use thiserror::Error;

/// Block sizes the cluster accepts
pub const BLOCK_SIZES: [u32; 3] = [512, 4096, 65536];

/// Replication factors the cluster accepts
pub const REPLICATION_FACTORS: std::ops::RangeInclusive<u32> = 1..=6;

/// A violated disk compatibility rule
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskRule {
    #[error("rule 1: deduplication requires compressed=true")]
    DedupRequiresCompression,

    #[error("rule 2: deduplication on a BLOCK disk forbids clusteredfilesystem=true")]
    DedupBlockForbidsClusteredFs,

    #[error("rule 3: type NFS requires blocksize=512")]
    NfsRequiresBlockSize512,

    #[error("rule 4: deduplication requires residence=HDD")]
    DedupRequiresHdd,

    #[error("rule 5: type NFS requires clusteredfilesystem=true")]
    NfsRequiresClusteredFs,

    #[error("rule 6: clusteredfilesystem=true requires blocksize=512")]
    ClusteredFsRequiresBlockSize512,

    #[error("rule 7: scsi3pr=true is not allowed with type NFS")]
    Scsi3prForbidsNfs,

    #[error("rule 8: deduplication requires cacheenabled=true")]
    DedupRequiresCache,
}

impl DiskRule {
    /// Position of the rule in evaluation order, starting at 1
    pub fn number(&self) -> u8 {
        match self {
            DiskRule::DedupRequiresCompression => 1,
            DiskRule::DedupBlockForbidsClusteredFs => 2,
            DiskRule::NfsRequiresBlockSize512 => 3,
            DiskRule::DedupRequiresHdd => 4,
            DiskRule::NfsRequiresClusteredFs => 5,
            DiskRule::ClusteredFsRequiresBlockSize512 => 6,
            DiskRule::Scsi3prForbidsNfs => 7,
            DiskRule::DedupRequiresCache => 8,
        }
    }

    /// Attribute names in conflict
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            DiskRule::DedupRequiresCompression => &["deduplication", "compressed"],
            DiskRule::DedupBlockForbidsClusteredFs => {
                &["deduplication", "type", "clusteredfilesystem"]
            }
            DiskRule::NfsRequiresBlockSize512 => &["type", "blocksize"],
            DiskRule::DedupRequiresHdd => &["deduplication", "residence"],
            DiskRule::NfsRequiresClusteredFs => &["type", "clusteredfilesystem"],
            DiskRule::ClusteredFsRequiresBlockSize512 => &["clusteredfilesystem", "blocksize"],
            DiskRule::Scsi3prForbidsNfs => &["scsi3pr", "type"],
            DiskRule::DedupRequiresCache => &["deduplication", "cacheenabled"],
        }
    }
}

/// Evaluate the compatibility matrix, returning the first violated rule
pub fn first_violation(disk: &DiskAttributes) -> Option<DiskRule> {
    let nfs = disk.disk_type == DiskType::Nfs;
    let dedup = disk.deduplication;

    let checks = [
        (dedup && !disk.compressed, DiskRule::DedupRequiresCompression),
        (
            dedup && disk.disk_type == DiskType::Block && disk.clustered_filesystem,
            DiskRule::DedupBlockForbidsClusteredFs,
        ),
        (nfs && disk.block_size != 512, DiskRule::NfsRequiresBlockSize512),
        (dedup && disk.residence != Residence::Hdd, DiskRule::DedupRequiresHdd),
        (nfs && !disk.clustered_filesystem, DiskRule::NfsRequiresClusteredFs),
        (
            disk.clustered_filesystem && disk.block_size != 512,
            DiskRule::ClusteredFsRequiresBlockSize512,
        ),
        (disk.scsi3pr && nfs, DiskRule::Scsi3prForbidsNfs),
        (dedup && !disk.cache_enabled, DiskRule::DedupRequiresCache),
    ];

    checks
        .into_iter()
        .find(|(violated, _)| *violated)
        .map(|(_, rule)| rule)
}

/// Validate a disk attribute set before it is sent anywhere
pub fn validate_disk(disk: &DiskAttributes) -> Result<()> {
    if disk.name.trim().is_empty() {
        return Err(invalid("name", "must not be empty"));
    }
    if disk.size == 0 {
        return Err(invalid("size", "must be at least 1 GB"));
    }
    if !REPLICATION_FACTORS.contains(&disk.replication_factor) {
        return Err(invalid(
            "replicationfactor",
            format!("{} is outside 1..=6", disk.replication_factor),
        ));
    }
    if !BLOCK_SIZES.contains(&disk.block_size) {
        return Err(invalid(
            "blocksize",
            format!("{} is not one of 512, 4096, 65536", disk.block_size),
        ));
    }

    match first_violation(disk) {
        Some(rule) => Err(Error::Validation(rule)),
        None => Ok(()),
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    Error::InvalidAttribute {
        field: field.to_string(),
        reason: reason.into(),
    }
}
