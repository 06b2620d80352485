use thiserror::Error;

use crate::{
    command::{CallParseError, ContractCall},
    contract::{CallOutput, ContractError},
    state::CommitError,
};

pub mod in_memory_processor;

#[derive(Debug, Error)]
pub enum TransactionProcessError {
    #[error(transparent)]
    CallErr(#[from] CallParseError),
    #[error(transparent)]
    ContractErr(#[from] ContractError),
    #[error(transparent)]
    CommitErr(#[from] CommitError),
}

pub trait TransactionProcessor {
    /// Simulates `call` for a client of `client_org` and, unless it is a
    /// query, commits the result.
    fn process_transaction(
        &mut self,
        client_org: Option<&str>,
        call: ContractCall,
    ) -> Result<CallOutput, TransactionProcessError>;
}
