use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::{
    auth::{IdentityError, IdentityResolver, OrgId},
    contract::TransactionContext,
};

use super::{
    CommitError, EndorsementError, EndorsementPolicy, ReadWriteSet, StateError, Version,
    WorldState,
};

#[derive(Debug, Clone)]
struct VersionedValue {
    value: Vec<u8>,
    version: Version,
}

/// Committed ledger state, together with per-key endorsement sets.
#[derive(Debug, Default)]
pub struct InMemoryWorldState {
    records: BTreeMap<String, VersionedValue>,
    endorsers: BTreeMap<String, BTreeSet<OrgId>>,
    height: Version,
}

impl InMemoryWorldState {
    /// Opens a transaction handle over the current committed snapshot.
    pub fn simulate(&self, client_org: Option<&str>) -> TxSimulator<'_> {
        TxSimulator {
            client_org: client_org.map(ToOwned::to_owned),
            state: SimulatedState {
                snapshot: self,
                reads: BTreeMap::new(),
                writes: BTreeMap::new(),
            },
            endorsement: SimulatedEndorsement::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.records.get(key).map(|rec| rec.value.as_slice())
    }

    pub fn version(&self, key: &str) -> Option<Version> {
        self.records.get(key).map(|rec| rec.version)
    }

    pub fn endorsers(&self, key: &str) -> Option<&BTreeSet<OrgId>> {
        self.endorsers.get(key)
    }

    pub fn height(&self) -> Version {
        self.height
    }

    /// Committed records in key order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.records
            .iter()
            .map(|(key, rec)| (key.as_str(), rec.value.as_slice()))
    }

    /// Validates `rw_set` against the committed state and applies it as one block.
    ///
    /// Nothing is applied when validation fails.
    pub fn commit(
        &mut self,
        rw_set: ReadWriteSet,
        endorsed_by: &str,
    ) -> Result<Version, CommitError> {
        if let Err(err) = self.validate(&rw_set, endorsed_by) {
            warn!("commit rejected: {err}");
            return Err(err);
        }

        self.height += 1;
        let (writes, endorser_writes) = (rw_set.writes.len(), rw_set.endorser_writes.len());
        for (key, write) in rw_set.writes {
            match write {
                Some(value) => {
                    self.records.insert(
                        key,
                        VersionedValue {
                            value,
                            version: self.height,
                        },
                    );
                }
                None => {
                    self.records.remove(&key);
                    self.endorsers.remove(&key);
                }
            }
        }
        self.endorsers.extend(rw_set.endorser_writes);
        info!(height = self.height, writes, endorser_writes, "committed block");
        Ok(self.height)
    }

    fn validate(&self, rw_set: &ReadWriteSet, endorsed_by: &str) -> Result<(), CommitError> {
        for (key, read) in &rw_set.reads {
            let committed = self.version(key);
            if committed != *read {
                return Err(CommitError::MvccReadConflict {
                    key: key.clone(),
                    read: *read,
                    committed,
                });
            }
        }
        for key in rw_set.writes.keys().chain(rw_set.endorser_writes.keys()) {
            let Some(required) = self.endorsers.get(key) else {
                continue;
            };
            if !required.is_empty() && !required.contains(endorsed_by) {
                return Err(CommitError::EndorsementPolicyFailure {
                    key: key.clone(),
                    endorsed_by: endorsed_by.to_owned(),
                    required: required.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Key-value side of a simulated transaction.
///
/// Reads always see the committed snapshot, never the transaction's own
/// staged writes.
#[derive(Debug)]
pub struct SimulatedState<'s> {
    snapshot: &'s InMemoryWorldState,
    reads: BTreeMap<String, Option<Version>>,
    writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl SimulatedState<'_> {
    pub fn reads(&self) -> &BTreeMap<String, Option<Version>> {
        &self.reads
    }

    pub fn writes(&self) -> &BTreeMap<String, Option<Vec<u8>>> {
        &self.writes
    }
}

impl WorldState for SimulatedState<'_> {
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }
        let version = self.snapshot.version(key);
        self.reads.entry(key.to_owned()).or_insert(version);
        debug!(key, ?version, "read key");
        Ok(self.snapshot.get(key).map(<[u8]>::to_vec))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }
        debug!(key, len = value.len(), "staged write");
        self.writes.insert(key.to_owned(), Some(value));
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<(), StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }
        debug!(key, "staged delete");
        self.writes.insert(key.to_owned(), None);
        Ok(())
    }
}

/// Endorsement-metadata side of a simulated transaction.
#[derive(Debug, Default)]
pub struct SimulatedEndorsement {
    writes: BTreeMap<String, BTreeSet<OrgId>>,
}

impl SimulatedEndorsement {
    pub fn writes(&self) -> &BTreeMap<String, BTreeSet<OrgId>> {
        &self.writes
    }
}

impl EndorsementPolicy for SimulatedEndorsement {
    fn set_endorsers(&mut self, key: &str, orgs: &[OrgId]) -> Result<(), EndorsementError> {
        if key.is_empty() {
            return Err(EndorsementError::EmptyKey);
        }
        if orgs.is_empty() {
            return Err(EndorsementError::NoOrgs {
                key: key.to_owned(),
            });
        }
        debug!(key, ?orgs, "staged endorsement policy");
        self.writes.insert(key.to_owned(), orgs.iter().cloned().collect());
        Ok(())
    }
}

/// One invocation's handle onto the simulated platform.
#[derive(Debug)]
pub struct TxSimulator<'s> {
    client_org: Option<OrgId>,
    state: SimulatedState<'s>,
    endorsement: SimulatedEndorsement,
}

impl TxSimulator<'_> {
    pub fn state(&self) -> &SimulatedState<'_> {
        &self.state
    }

    pub fn endorsement(&self) -> &SimulatedEndorsement {
        &self.endorsement
    }

    pub fn into_read_write_set(self) -> ReadWriteSet {
        ReadWriteSet {
            reads: self.state.reads,
            writes: self.state.writes,
            endorser_writes: self.endorsement.writes,
        }
    }
}

impl IdentityResolver for TxSimulator<'_> {
    fn client_org_id(&self) -> Result<OrgId, IdentityError> {
        match self.client_org.as_deref() {
            None => Err(IdentityError::MissingIdentity),
            Some("") => Err(IdentityError::EmptyOrgId),
            Some(org) => Ok(org.to_owned()),
        }
    }
}

impl<'s> TransactionContext for TxSimulator<'s> {
    type State = SimulatedState<'s>;
    type Endorsement = SimulatedEndorsement;

    fn world_state(&mut self) -> &mut Self::State {
        &mut self.state
    }

    fn endorsement_policy(&mut self) -> &mut Self::Endorsement {
        &mut self.endorsement
    }
}
