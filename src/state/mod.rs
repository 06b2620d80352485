use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::auth::OrgId;

pub mod in_memory;

/// Block height at which a key was last written.
pub type Version = u64;

/// Transaction-scoped view of the key-value world state.
///
/// Reads take `&mut self` because implementations record every key read
/// for commit-time validation.
pub trait WorldState {
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StateError>;
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError>;
    fn del_state(&mut self, key: &str) -> Result<(), StateError>;
}

/// Per-key endorsement metadata, kept apart from the record values.
pub trait EndorsementPolicy {
    /// Replaces the set of orgs that must endorse future writes to `key`.
    fn set_endorsers(&mut self, key: &str, orgs: &[OrgId]) -> Result<(), EndorsementError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("key must not be an empty string")]
    EmptyKey,
    #[error("world state unavailable for {key}: {reason}")]
    Unavailable { key: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndorsementError {
    #[error("key must not be an empty string")]
    EmptyKey,
    #[error("endorsement policy for {key} needs at least one org")]
    NoOrgs { key: String },
    #[error("endorsement policy unavailable for {key}: {reason}")]
    Unavailable { key: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("MVCC read conflict on {key}: read version {read:?}, committed version {committed:?}")]
    MvccReadConflict {
        key: String,
        read: Option<Version>,
        committed: Option<Version>,
    },
    #[error("endorsement policy failure on {key}: endorsed by {endorsed_by}, requires {required:?}")]
    EndorsementPolicyFailure {
        key: String,
        endorsed_by: OrgId,
        required: BTreeSet<OrgId>,
    },
}

/// Everything one invocation read and staged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadWriteSet {
    /// Version seen by the first read of each key, `None` when absent.
    pub reads: BTreeMap<String, Option<Version>>,
    /// Staged values, `None` marks a delete.
    pub writes: BTreeMap<String, Option<Vec<u8>>>,
    pub endorser_writes: BTreeMap<String, BTreeSet<OrgId>>,
}

impl ReadWriteSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty() && self.endorser_writes.is_empty()
    }
}
