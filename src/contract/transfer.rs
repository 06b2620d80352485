use tracing::{debug, info};

use crate::account::BalanceChange;

use super::{AccountContract, ContractError, TransactionContext};

impl AccountContract {
    /// Moves `amount` from `from` to `to`.
    ///
    /// Reads exactly the two accounts it writes. The source record is staged
    /// before the destination record; both commit or neither does. Balances
    /// may go negative. A self-transfer writes the unchanged record twice.
    pub fn transfer<C>(
        &self,
        ctx: &mut C,
        from: &str,
        to: &str,
        amount: f32,
    ) -> Result<(), ContractError>
    where
        C: TransactionContext,
    {
        self.guard.authorize(&*ctx)?;
        if amount.is_nan() || amount <= 0.0 {
            return Err(ContractError::InvalidAmount { amount });
        }

        let mut source = self.load(ctx, from).map_err(|err| match err {
            ContractError::NotFound { id } => ContractError::SourceNotFound { id },
            err => err,
        })?;
        let mut destination = self.load(ctx, to).map_err(|err| match err {
            ContractError::NotFound { id } => ContractError::DestinationNotFound { id },
            err => err,
        })?;

        if from == to {
            debug!(id = from, amount, "self-transfer");
        } else {
            source.apply(BalanceChange::Debit(amount));
            destination.apply(BalanceChange::Credit(amount));
        }

        self.store(ctx, &source)?;
        self.store(ctx, &destination)?;
        info!(from, to, amount, "transferred");
        Ok(())
    }
}
