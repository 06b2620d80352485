use tracing::{debug, info};

use crate::{
    account::Account,
    state::{EndorsementPolicy, WorldState},
};

use super::{AccountContract, ContractError, TransactionContext};

/// Accounts written by [`AccountContract::init_ledger`].
pub const SEED_ACCOUNTS: [(&str, f32, &str); 5] = [
    ("account1", 100.0, "JPMorgan Chase & Co."),
    ("account2", 200.0, "Bank of America Corp."),
    ("account3", 300.0, "JPMorgan Chase & Co."),
    ("account4", 400.0, "Bank of America Corp."),
    ("account5", 500.0, "JPMorgan Chase & Co."),
];

impl AccountContract {
    /// Writes the seed accounts, overwriting whatever is stored at their keys.
    pub fn init_ledger<C>(&self, ctx: &mut C) -> Result<(), ContractError>
    where
        C: TransactionContext,
    {
        self.guard.authorize(&*ctx)?;
        for (id, balance, bank) in SEED_ACCOUNTS {
            self.store(ctx, &Account::new(id, balance, bank))?;
        }
        info!(accounts = SEED_ACCOUNTS.len(), "ledger initialized");
        Ok(())
    }

    /// Absence is `Ok(false)`, only a failed read is an error.
    pub fn account_exists<C>(&self, ctx: &mut C, id: &str) -> Result<bool, ContractError>
    where
        C: TransactionContext,
    {
        self.guard.authorize(&*ctx)?;
        self.exists(ctx, id)
    }

    pub fn read_account<C>(&self, ctx: &mut C, id: &str) -> Result<Account, ContractError>
    where
        C: TransactionContext,
    {
        self.guard.authorize(&*ctx)?;
        self.load(ctx, id)
    }

    /// Stores a new account and makes the creating org its sole endorser.
    ///
    /// The record write is not undone when setting the endorsers fails; the
    /// whole invocation fails, so nothing of it is committed.
    pub fn create_account<C>(
        &self,
        ctx: &mut C,
        id: &str,
        balance: f32,
        bank: &str,
    ) -> Result<(), ContractError>
    where
        C: TransactionContext,
    {
        let client_org = self.guard.authorize(&*ctx)?;
        if self.exists(ctx, id)? {
            return Err(ContractError::AlreadyExists { id: id.to_owned() });
        }

        self.store(ctx, &Account::new(id, balance, bank))?;
        ctx.endorsement_policy()
            .set_endorsers(id, &[client_org.clone()])
            .map_err(|source| ContractError::EndorsementPolicy {
                id: id.to_owned(),
                source,
            })?;
        info!(id, balance, bank, endorser = %client_org, "account created");
        Ok(())
    }

    pub fn delete_account<C>(&self, ctx: &mut C, id: &str) -> Result<(), ContractError>
    where
        C: TransactionContext,
    {
        self.guard.authorize(&*ctx)?;
        if !self.exists(ctx, id)? {
            return Err(ContractError::NotFound { id: id.to_owned() });
        }
        ctx.world_state()
            .del_state(id)
            .map_err(|source| ContractError::Storage {
                key: id.to_owned(),
                source,
            })?;
        info!(id, "account deleted");
        Ok(())
    }

    fn fetch<C>(&self, ctx: &mut C, id: &str) -> Result<Option<Vec<u8>>, ContractError>
    where
        C: TransactionContext,
    {
        ctx.world_state()
            .get_state(id)
            .map_err(|source| ContractError::Storage {
                key: id.to_owned(),
                source,
            })
    }

    fn exists<C>(&self, ctx: &mut C, id: &str) -> Result<bool, ContractError>
    where
        C: TransactionContext,
    {
        let exists = self.fetch(ctx, id)?.is_some();
        debug!(id, exists, "account lookup");
        Ok(exists)
    }

    pub(super) fn load<C>(&self, ctx: &mut C, id: &str) -> Result<Account, ContractError>
    where
        C: TransactionContext,
    {
        let bytes = self
            .fetch(ctx, id)?
            .ok_or_else(|| ContractError::NotFound { id: id.to_owned() })?;
        Ok(Account::from_bytes(id, &bytes)?)
    }

    pub(super) fn store<C>(&self, ctx: &mut C, account: &Account) -> Result<(), ContractError>
    where
        C: TransactionContext,
    {
        let bytes = account.to_bytes()?;
        ctx.world_state()
            .put_state(&account.id, bytes)
            .map_err(|source| ContractError::Storage {
                key: account.id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::{
        auth::{AuthorizationError, IdentityError, IdentityResolver, OrgId, PeerConfig},
        state::{EndorsementError, StateError, in_memory::InMemoryWorldState},
    };

    use super::*;

    const ORG1: &str = "Org1MSP";

    fn contract() -> AccountContract {
        AccountContract::new(PeerConfig::new(ORG1).unwrap())
    }

    /// Runs `op` in one transaction and commits it when it succeeds.
    fn submit<T>(
        ledger: &mut InMemoryWorldState,
        op: impl FnOnce(&mut crate::state::in_memory::TxSimulator<'_>) -> Result<T, ContractError>,
    ) -> Result<T, ContractError> {
        let mut tx = ledger.simulate(Some(ORG1));
        let out = op(&mut tx);
        let rw_set = tx.into_read_write_set();
        if out.is_ok() {
            ledger.commit(rw_set, ORG1).unwrap();
        }
        out
    }

    fn seeded() -> InMemoryWorldState {
        let mut ledger = InMemoryWorldState::default();
        submit(&mut ledger, |tx| contract().init_ledger(tx)).unwrap();
        ledger
    }

    #[test]
    fn init_ledger_seeds_accounts() {
        let mut ledger = seeded();
        let contract = contract();
        for (id, balance, bank) in SEED_ACCOUNTS {
            let acc = submit(&mut ledger, |tx| contract.read_account(tx, id)).unwrap();
            assert_eq!(acc, Account::new(id, balance, bank));
            // seed accounts carry no endorsement policy
            assert_eq!(ledger.endorsers(id), None);
        }

        // replay resets seeded keys only
        submit(&mut ledger, |tx| contract.transfer(tx, "account1", "account2", 10.0)).unwrap();
        submit(&mut ledger, |tx| contract.create_account(tx, "extra", 1.0, "bank")).unwrap();
        submit(&mut ledger, |tx| contract.init_ledger(tx)).unwrap();
        let acc = submit(&mut ledger, |tx| contract.read_account(tx, "account1")).unwrap();
        assert_eq!(acc.balance, 100.0);
        assert!(submit(&mut ledger, |tx| contract.account_exists(tx, "extra")).unwrap());
    }

    #[test]
    fn absent_account() {
        let mut ledger = InMemoryWorldState::default();
        let contract = contract();
        assert!(!submit(&mut ledger, |tx| contract.account_exists(tx, "nope")).unwrap());
        let err = submit(&mut ledger, |tx| contract.read_account(tx, "nope")).unwrap_err();
        assert!(matches!(&err, ContractError::NotFound { id } if id == "nope"));
        assert_eq!(err.to_string(), "the account nope does not exist");
    }

    #[test]
    fn create_then_read() {
        let mut ledger = InMemoryWorldState::default();
        let contract = contract();
        submit(&mut ledger, |tx| contract.create_account(tx, "acc", -3.25, "Some Bank")).unwrap();
        let acc = submit(&mut ledger, |tx| contract.read_account(tx, "acc")).unwrap();
        assert_eq!(acc, Account::new("acc", -3.25, "Some Bank"));
        assert_eq!(
            ledger.endorsers("acc"),
            Some(&BTreeSet::from([ORG1.to_string()]))
        );
    }

    #[test]
    fn create_stages_record_and_endorsers_separately() {
        let ledger = InMemoryWorldState::default();
        let mut tx = ledger.simulate(Some(ORG1));
        contract().create_account(&mut tx, "acc", 5.0, "bank").unwrap();
        assert_eq!(
            tx.state().writes().get("acc"),
            Some(&Some(br#"{"ID":"acc","Balance":5,"Bank":"bank"}"#.to_vec()))
        );
        assert_eq!(
            tx.endorsement().writes().get("acc"),
            Some(&BTreeSet::from([ORG1.to_string()]))
        );
        // only the created key is read
        assert_eq!(tx.state().reads().len(), 1);
    }

    #[test]
    fn create_existing_account() {
        let mut ledger = seeded();
        let contract = contract();
        let before = ledger.get("account1").map(<[u8]>::to_vec);
        let err = submit(&mut ledger, |tx| {
            contract.create_account(tx, "account1", 1.0, "Other Bank")
        })
        .unwrap_err();
        assert!(matches!(&err, ContractError::AlreadyExists { id } if id == "account1"));
        assert_eq!(ledger.get("account1").map(<[u8]>::to_vec), before);
    }

    #[test]
    fn create_with_non_finite_balance() {
        let mut ledger = InMemoryWorldState::default();
        let err = submit(&mut ledger, |tx| {
            contract().create_account(tx, "acc", f32::INFINITY, "bank")
        })
        .unwrap_err();
        assert!(matches!(err, ContractError::Encode(_)));
        assert_eq!(ledger.get("acc"), None);
    }

    #[test]
    fn delete_account() {
        let mut ledger = seeded();
        let contract = contract();
        submit(&mut ledger, |tx| contract.delete_account(tx, "account4")).unwrap();
        assert!(!submit(&mut ledger, |tx| contract.account_exists(tx, "account4")).unwrap());

        let err = submit(&mut ledger, |tx| contract.delete_account(tx, "account4")).unwrap_err();
        assert!(matches!(&err, ContractError::NotFound { id } if id == "account4"));
    }

    #[test]
    fn stored_garbage_fails_to_decode() {
        let mut ledger = InMemoryWorldState::default();
        let mut tx = ledger.simulate(Some(ORG1));
        tx.world_state().put_state("bad", b"{\"ID\":".to_vec()).unwrap();
        let rw_set = tx.into_read_write_set();
        ledger.commit(rw_set, ORG1).unwrap();

        let contract = contract();
        let err = submit(&mut ledger, |tx| contract.read_account(tx, "bad")).unwrap_err();
        assert!(matches!(err, ContractError::Decode(_)));
        // existence does not decode
        assert!(submit(&mut ledger, |tx| contract.account_exists(tx, "bad")).unwrap());
    }

    #[test]
    fn wrong_org_is_rejected_before_state_access() {
        let ledger = seeded();
        let contract = contract();
        let mut tx = ledger.simulate(Some("Org2MSP"));
        assert!(matches!(
            contract.read_account(&mut tx, "account1"),
            Err(ContractError::Authorization(AuthorizationError::OrgMismatch { .. }))
        ));
        assert!(matches!(
            contract.account_exists(&mut tx, "account1"),
            Err(ContractError::Authorization(_))
        ));
        assert!(matches!(
            contract.delete_account(&mut tx, "account1"),
            Err(ContractError::Authorization(_))
        ));
        assert!(matches!(
            contract.init_ledger(&mut tx),
            Err(ContractError::Authorization(_))
        ));
        let rw_set = tx.into_read_write_set();
        assert!(rw_set.reads.is_empty());
        assert!(rw_set.is_read_only());
    }

    /// Context whose storage and endorsement channel can be made to fail.
    #[derive(Default)]
    struct FaultyContext {
        state: FaultyState,
        endorsement: FaultyEndorsement,
    }

    #[derive(Default)]
    struct FaultyState {
        fail_reads: bool,
        puts: Vec<String>,
    }

    #[derive(Default)]
    struct FaultyEndorsement {
        fail: bool,
    }

    impl IdentityResolver for FaultyContext {
        fn client_org_id(&self) -> Result<OrgId, IdentityError> {
            Ok(ORG1.to_string())
        }
    }

    impl WorldState for FaultyState {
        fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
            if self.fail_reads {
                return Err(StateError::Unavailable {
                    key: key.to_owned(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(None)
        }

        fn put_state(&mut self, key: &str, _value: Vec<u8>) -> Result<(), StateError> {
            self.puts.push(key.to_owned());
            Ok(())
        }

        fn del_state(&mut self, _key: &str) -> Result<(), StateError> {
            Ok(())
        }
    }

    impl EndorsementPolicy for FaultyEndorsement {
        fn set_endorsers(&mut self, key: &str, _orgs: &[OrgId]) -> Result<(), EndorsementError> {
            if self.fail {
                return Err(EndorsementError::Unavailable {
                    key: key.to_owned(),
                    reason: "metadata channel closed".to_string(),
                });
            }
            Ok(())
        }
    }

    impl TransactionContext for FaultyContext {
        type State = FaultyState;
        type Endorsement = FaultyEndorsement;

        fn world_state(&mut self) -> &mut Self::State {
            &mut self.state
        }

        fn endorsement_policy(&mut self) -> &mut Self::Endorsement {
            &mut self.endorsement
        }
    }

    #[test]
    fn storage_failure_is_not_absence() {
        let mut ctx = FaultyContext::default();
        ctx.state.fail_reads = true;
        let err = contract().account_exists(&mut ctx, "acc").unwrap_err();
        assert!(matches!(
            &err,
            ContractError::Storage { key, source: StateError::Unavailable { .. } } if key == "acc"
        ));
        let err = contract().create_account(&mut ctx, "acc", 1.0, "bank").unwrap_err();
        assert!(matches!(err, ContractError::Storage { .. }));
        assert!(ctx.state.puts.is_empty());
    }

    #[test]
    fn endorsement_failure_after_write() {
        let mut ctx = FaultyContext::default();
        ctx.endorsement.fail = true;
        let err = contract().create_account(&mut ctx, "acc", 1.0, "bank").unwrap_err();
        assert!(matches!(&err, ContractError::EndorsementPolicy { id, .. } if id == "acc"));
        // the record write was staged and is not rolled back by the contract
        assert_eq!(ctx.state.puts, vec!["acc".to_string()]);
    }
}
