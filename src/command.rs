use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::account::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFunction {
    InitLedger,
    AccountExists,
    ReadAccount,
    CreateAccount,
    DeleteAccount,
    Transfer,
}

impl ContractFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::InitLedger => "InitLedger",
            Self::AccountExists => "AccountExists",
            Self::ReadAccount => "ReadAccount",
            Self::CreateAccount => "CreateAccount",
            Self::DeleteAccount => "DeleteAccount",
            Self::Transfer => "Transfer",
        }
    }

    /// Queries are evaluated only, their read set is never submitted.
    pub fn is_query(self) -> bool {
        matches!(self, Self::AccountExists | Self::ReadAccount)
    }
}

impl fmt::Display for ContractFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractFunction {
    type Err = CallParseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "InitLedger" => Ok(Self::InitLedger),
            "AccountExists" => Ok(Self::AccountExists),
            "ReadAccount" => Ok(Self::ReadAccount),
            "CreateAccount" => Ok(Self::CreateAccount),
            "DeleteAccount" => Ok(Self::DeleteAccount),
            "Transfer" => Ok(Self::Transfer),
            _ => Err(CallParseError::UnknownFunction {
                name: name.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallParseError {
    #[error("Unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("Argument {position} is required for {function}")]
    MissingArgument {
        function: ContractFunction,
        position: usize,
    },
    #[error("Argument {position} of {function} is not a number: `{value}`")]
    InvalidNumber {
        function: ContractFunction,
        position: usize,
        value: String,
    },
    #[error("{function} takes {expected} argument(s), got {actual}")]
    UnexpectedArgument {
        function: ContractFunction,
        expected: usize,
        actual: usize,
    },
}

/// A typed invocation of one of the contract entry points.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractCall {
    InitLedger,
    AccountExists {
        id: AccountId,
    },
    ReadAccount {
        id: AccountId,
    },
    CreateAccount {
        id: AccountId,
        balance: f32,
        bank: String,
    },
    DeleteAccount {
        id: AccountId,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: f32,
    },
}

impl ContractCall {
    pub fn function(&self) -> ContractFunction {
        match self {
            Self::InitLedger => ContractFunction::InitLedger,
            Self::AccountExists { .. } => ContractFunction::AccountExists,
            Self::ReadAccount { .. } => ContractFunction::ReadAccount,
            Self::CreateAccount { .. } => ContractFunction::CreateAccount,
            Self::DeleteAccount { .. } => ContractFunction::DeleteAccount,
            Self::Transfer { .. } => ContractFunction::Transfer,
        }
    }

    /// Builds a call from positional string arguments.
    pub fn parse<S>(function: ContractFunction, args: &[S]) -> Result<Self, CallParseError>
    where
        S: AsRef<str>,
    {
        let args = Arguments { function, args };
        match function {
            ContractFunction::InitLedger => {
                args.expect_count(0)?;
                Ok(Self::InitLedger)
            }
            ContractFunction::AccountExists => {
                args.expect_count(1)?;
                Ok(Self::AccountExists { id: args.text(1)? })
            }
            ContractFunction::ReadAccount => {
                args.expect_count(1)?;
                Ok(Self::ReadAccount { id: args.text(1)? })
            }
            ContractFunction::CreateAccount => {
                args.expect_count(3)?;
                Ok(Self::CreateAccount {
                    id: args.text(1)?,
                    balance: args.number(2)?,
                    bank: args.text(3)?,
                })
            }
            ContractFunction::DeleteAccount => {
                args.expect_count(1)?;
                Ok(Self::DeleteAccount { id: args.text(1)? })
            }
            ContractFunction::Transfer => {
                args.expect_count(3)?;
                Ok(Self::Transfer {
                    from: args.text(1)?,
                    to: args.text(2)?,
                    amount: args.number(3)?,
                })
            }
        }
    }
}

struct Arguments<'a, S> {
    function: ContractFunction,
    args: &'a [S],
}

impl<S> Arguments<'_, S>
where
    S: AsRef<str>,
{
    fn expect_count(&self, expected: usize) -> Result<(), CallParseError> {
        if self.args.len() > expected {
            return Err(CallParseError::UnexpectedArgument {
                function: self.function,
                expected,
                actual: self.args.len(),
            });
        }
        Ok(())
    }

    /// `position` is 1-based.
    fn text(&self, position: usize) -> Result<String, CallParseError> {
        self.args
            .get(position - 1)
            .map(|arg| arg.as_ref().to_owned())
            .ok_or(CallParseError::MissingArgument {
                function: self.function,
                position,
            })
    }

    fn number(&self, position: usize) -> Result<f32, CallParseError> {
        let value = self.text(position)?;
        value
            .parse()
            .map_err(|_| CallParseError::InvalidNumber {
                function: self.function,
                position,
                value,
            })
    }
}
