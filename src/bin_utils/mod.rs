//! Replays an invocation file against a single simulated peer and prints the
//! resulting world state. Lives in the library so integration tests can drive it.

use std::io::{Read, Write};

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    account::Account,
    auth::PeerConfig,
    command::{ContractCall, ContractFunction},
    contract::CallOutput,
    processor::{
        TransactionProcessError, TransactionProcessor,
        in_memory_processor::InMemoryTransactionProcessor,
    },
};
use csv_parser::{CsvInvocationParser, Invocation};
use csv_printer::print_accounts;
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Malformed row: {0}")]
    Row(#[from] csv::Error),
    #[error(transparent)]
    Transaction(#[from] TransactionProcessError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub peer: PeerConfig,
    pub error_printer: Box<dyn FnMut(u64, ServiceError) + 'w>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvInvocationParser::new(self.input);

        let mut processor = InMemoryTransactionProcessor::new(self.peer);
        info!(peer_org = processor.peer_org_id(), "replaying invocations");

        for (line, row) in parser {
            let result = row
                .map_err(ServiceError::from)
                .and_then(|row| process_row(&mut processor, row).map_err(ServiceError::from));
            match result {
                Ok((function, output)) if function.is_query() => {
                    info!(line, %function, ?output, "query result");
                }
                Ok(_) => {}
                Err(err) => (self.error_printer)(line, err),
            }
        }

        print_accounts(
            self.output,
            processor
                .world_state
                .records()
                .filter_map(|(key, bytes)| match Account::from_bytes(key, bytes) {
                    Ok(acc) => Some(acc),
                    Err(err) => {
                        warn!("skipping undecodable record: {err}");
                        None
                    }
                }),
        )
    }
}

fn process_row(
    processor: &mut impl TransactionProcessor,
    row: Invocation,
) -> Result<(ContractFunction, CallOutput), TransactionProcessError> {
    let function: ContractFunction = row.function.parse()?;
    let call = ContractCall::parse(function, &row.args())?;
    let output = processor.process_transaction(row.org.as_deref(), call)?;
    Ok((function, output))
}
