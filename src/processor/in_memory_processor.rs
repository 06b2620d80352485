use tracing::debug;

use crate::{
    auth::PeerConfig,
    command::{ContractCall, ContractFunction},
    contract::{AccountContract, CallOutput, ContractError},
    state::{CommitError, ReadWriteSet, Version, in_memory::InMemoryWorldState},
};

use super::{TransactionProcessError, TransactionProcessor};

/// Simulation result of one invocation, waiting to be committed.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub function: ContractFunction,
    pub output: CallOutput,
    pub rw_set: ReadWriteSet,
}

/// A single peer with its own committed copy of the world state.
pub struct InMemoryTransactionProcessor {
    contract: AccountContract,
    pub world_state: InMemoryWorldState,
}

impl InMemoryTransactionProcessor {
    pub fn new(config: PeerConfig) -> Self {
        Self {
            contract: AccountContract::new(config),
            world_state: InMemoryWorldState::default(),
        }
    }

    pub fn peer_org_id(&self) -> &str {
        self.contract.peer_org_id()
    }

    /// Runs `call` against the current committed state without committing.
    pub fn endorse(
        &self,
        client_org: Option<&str>,
        call: ContractCall,
    ) -> Result<Proposal, ContractError> {
        let function = call.function();
        let mut tx = self.world_state.simulate(client_org);
        let output = self.contract.invoke(&mut tx, call)?;
        Ok(Proposal {
            function,
            output,
            rw_set: tx.into_read_write_set(),
        })
    }

    /// Commits a proposal endorsed by this peer.
    pub fn commit(&mut self, proposal: Proposal) -> Result<Version, CommitError> {
        self.world_state
            .commit(proposal.rw_set, self.contract.peer_org_id())
    }
}

impl TransactionProcessor for InMemoryTransactionProcessor {
    fn process_transaction(
        &mut self,
        client_org: Option<&str>,
        call: ContractCall,
    ) -> Result<CallOutput, TransactionProcessError> {
        let proposal = self.endorse(client_org, call)?;
        if proposal.function.is_query() {
            debug!(function = %proposal.function, "evaluated query");
            return Ok(proposal.output);
        }
        let output = proposal.output.clone();
        self.commit(proposal)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use crate::account::Account;

    use super::*;

    fn processor() -> InMemoryTransactionProcessor {
        InMemoryTransactionProcessor::new(PeerConfig::new("Org1MSP").unwrap())
    }

    fn read(processor: &mut InMemoryTransactionProcessor, id: &str) -> Account {
        let out = processor
            .process_transaction(
                Some("Org1MSP"),
                ContractCall::ReadAccount { id: id.to_string() },
            )
            .unwrap();
        match out {
            CallOutput::Account(acc) => acc,
            other => panic!("expected an account, got {other:?}"),
        }
    }

    #[test]
    fn process_some_transactions() {
        let mut processor = processor();
        processor
            .process_transaction(Some("Org1MSP"), ContractCall::InitLedger)
            .unwrap();
        assert_eq!(processor.world_state.height(), 1);

        processor
            .process_transaction(
                Some("Org1MSP"),
                ContractCall::Transfer {
                    from: "account1".to_string(),
                    to: "account2".to_string(),
                    amount: 50.0,
                },
            )
            .unwrap();
        assert_eq!(read(&mut processor, "account1").balance, 50.0);
        assert_eq!(read(&mut processor, "account2").balance, 250.0);
        // queries are not committed
        assert_eq!(processor.world_state.height(), 2);

        let err = processor
            .process_transaction(
                Some("Org1MSP"),
                ContractCall::CreateAccount {
                    id: "account1".to_string(),
                    balance: 1.0,
                    bank: "bank".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::ContractErr(ContractError::AlreadyExists { .. })
        ));
        assert_eq!(processor.world_state.height(), 2);
    }

    #[test]
    fn failed_invocation_commits_nothing() {
        let mut processor = processor();
        processor
            .process_transaction(Some("Org1MSP"), ContractCall::InitLedger)
            .unwrap();
        let err = processor
            .process_transaction(
                Some("Org2MSP"),
                ContractCall::DeleteAccount {
                    id: "account1".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::ContractErr(ContractError::Authorization(_))
        ));
        assert!(processor.world_state.get("account1").is_some());
        assert_eq!(processor.world_state.height(), 1);
    }

    #[test]
    fn failure_after_source_write_commits_nothing() {
        let mut processor = processor();
        processor
            .process_transaction(Some("Org1MSP"), ContractCall::InitLedger)
            .unwrap();
        processor
            .process_transaction(
                Some("Org1MSP"),
                ContractCall::CreateAccount {
                    id: "max".to_string(),
                    balance: f32::MAX,
                    bank: "bank".to_string(),
                },
            )
            .unwrap();
        let height = processor.world_state.height();

        // the credit overflows, so encoding the destination fails after the debit is staged
        let err = processor
            .process_transaction(
                Some("Org1MSP"),
                ContractCall::Transfer {
                    from: "account1".to_string(),
                    to: "max".to_string(),
                    amount: f32::MAX,
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::ContractErr(ContractError::Encode(_))
        ));
        assert_eq!(processor.world_state.height(), height);
        assert_eq!(read(&mut processor, "account1").balance, 100.0);
        assert_eq!(read(&mut processor, "max").balance, f32::MAX);
    }

    #[test]
    fn concurrent_proposals_commit_in_order() {
        let mut processor = processor();
        processor
            .process_transaction(Some("Org1MSP"), ContractCall::InitLedger)
            .unwrap();

        let create = processor
            .endorse(
                Some("Org1MSP"),
                ContractCall::CreateAccount {
                    id: "account6".to_string(),
                    balance: 600.0,
                    bank: "Bank of America Corp.".to_string(),
                },
            )
            .unwrap();
        let create_again = processor
            .endorse(
                Some("Org1MSP"),
                ContractCall::CreateAccount {
                    id: "account6".to_string(),
                    balance: 1.0,
                    bank: "JPMorgan Chase & Co.".to_string(),
                },
            )
            .unwrap();
        let unrelated = processor
            .endorse(
                Some("Org1MSP"),
                ContractCall::Transfer {
                    from: "account4".to_string(),
                    to: "account5".to_string(),
                    amount: 100.0,
                },
            )
            .unwrap();

        processor.commit(create).unwrap();
        let err = processor.commit(create_again).unwrap_err();
        assert!(matches!(
            err,
            CommitError::MvccReadConflict { key, read: None, committed: Some(_) } if key == "account6"
        ));
        processor.commit(unrelated).unwrap();

        assert_eq!(
            read(&mut processor, "account6"),
            Account::new("account6", 600.0, "Bank of America Corp.")
        );
        assert_eq!(read(&mut processor, "account4").balance, 300.0);
        assert_eq!(read(&mut processor, "account5").balance, 600.0);
    }
}
