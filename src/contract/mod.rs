use thiserror::Error;
use tracing::debug;

use crate::{
    account::{Account, AccountId, CodecError},
    auth::{AuthorizationError, AuthorizationGuard, IdentityResolver, PeerConfig},
    command::ContractCall,
    state::{EndorsementError, EndorsementPolicy, StateError, WorldState},
};

pub mod ledger;
pub mod transfer;

/// Everything a single invocation can reach: the invoking identity, the
/// world state and the endorsement-policy channel.
pub trait TransactionContext: IdentityResolver {
    type State: WorldState;
    type Endorsement: EndorsementPolicy;

    fn world_state(&mut self) -> &mut Self::State;
    fn endorsement_policy(&mut self) -> &mut Self::Endorsement;
}

#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error("the account {id} does not exist")]
    NotFound { id: AccountId },
    #[error("the account {id} already exists")]
    AlreadyExists { id: AccountId },
    #[error("amount must be positive, got {amount}")]
    InvalidAmount { amount: f32 },
    #[error("source account {id} doesn't exist")]
    SourceNotFound { id: AccountId },
    #[error("destination account {id} doesn't exist")]
    DestinationNotFound { id: AccountId },
    #[error(transparent)]
    Decode(CodecError),
    #[error(transparent)]
    Encode(CodecError),
    #[error("failed to access world state for `{key}`: {source}")]
    Storage {
        key: String,
        #[source]
        source: StateError,
    },
    #[error("failed setting state based endorsement for {id}: {source}")]
    EndorsementPolicy {
        id: AccountId,
        #[source]
        source: EndorsementError,
    },
}

impl From<CodecError> for ContractError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decode { .. } => Self::Decode(err),
            CodecError::Encode { .. } | CodecError::NonFiniteBalance { .. } => Self::Encode(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    Done,
    Exists(bool),
    Account(Account),
}

/// The account contract as installed on one peer.
///
/// Every entry point authorizes the caller before touching the world state.
#[derive(Debug, Clone)]
pub struct AccountContract {
    guard: AuthorizationGuard,
}

impl AccountContract {
    pub fn new(config: PeerConfig) -> Self {
        Self {
            guard: AuthorizationGuard::new(config),
        }
    }

    pub fn peer_org_id(&self) -> &str {
        self.guard.peer_org_id()
    }

    /// Dispatches `call` to its entry point.
    pub fn invoke<C>(&self, ctx: &mut C, call: ContractCall) -> Result<CallOutput, ContractError>
    where
        C: TransactionContext,
    {
        debug!(function = %call.function(), "invoke");
        match call {
            ContractCall::InitLedger => self.init_ledger(ctx).map(|_| CallOutput::Done),
            ContractCall::AccountExists { id } => {
                self.account_exists(ctx, &id).map(CallOutput::Exists)
            }
            ContractCall::ReadAccount { id } => self.read_account(ctx, &id).map(CallOutput::Account),
            ContractCall::CreateAccount { id, balance, bank } => self
                .create_account(ctx, &id, balance, &bank)
                .map(|_| CallOutput::Done),
            ContractCall::DeleteAccount { id } => {
                self.delete_account(ctx, &id).map(|_| CallOutput::Done)
            }
            ContractCall::Transfer { from, to, amount } => self
                .transfer(ctx, &from, &to, amount)
                .map(|_| CallOutput::Done),
        }
    }
}
