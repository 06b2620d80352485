use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, Serializer};
use thiserror::Error;

pub type AccountId = String;

/// Account record as stored in the world state.
///
/// Fields are declared in alphabetical order of their wire names, `serde_json`
/// keeps declaration order, so every peer produces the same bytes for the
/// same account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "ID")]
    pub id: AccountId,
    // records written by earlier deployments carry the type-suffixed names
    #[serde(rename = "Balance", alias = "Balance float32")]
    pub balance: f32,
    #[serde(rename = "Bank", alias = "Bank string")]
    pub bank: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceChange {
    Debit(f32),
    Credit(f32),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("account {id} has a non-finite balance {balance}")]
    NonFiniteBalance { id: AccountId, balance: f32 },
    #[error("failed to encode account {id}: {source}")]
    Encode {
        id: AccountId,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode account {id}: {source}")]
    Decode {
        id: AccountId,
        #[source]
        source: serde_json::Error,
    },
}

impl Account {
    pub fn new(id: impl Into<AccountId>, balance: f32, bank: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            balance,
            bank: bank.into(),
        }
    }

    /// Applies a balance change without any floor check: overdrafts are allowed.
    pub fn apply(&mut self, change: BalanceChange) {
        match change {
            BalanceChange::Debit(amount) => self.balance -= amount,
            BalanceChange::Credit(amount) => self.balance += amount,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        if !self.balance.is_finite() {
            return Err(CodecError::NonFiniteBalance {
                id: self.id.clone(),
                balance: self.balance,
            });
        }
        let mut bytes = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut bytes, BalanceFormatter);
        self.serialize(&mut serializer)
            .map_err(|source| CodecError::Encode {
                id: self.id.clone(),
                source,
            })?;
        Ok(bytes)
    }

    /// Decodes the record stored under `id`.
    pub fn from_bytes(id: &str, bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|source| CodecError::Decode {
            id: id.to_owned(),
            source,
        })
    }
}

/// Formats a balance the way a 32-bit float is written in JSON records:
/// shortest round-trip digits, plain notation for magnitudes in `[1e-6, 1e21)`,
/// exponent notation with an explicit `+` sign outside it.
pub fn format_balance(balance: f32) -> String {
    let abs = balance.abs();
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        let formatted = format!("{balance:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    format!("{balance}")
}

/// JSON formatter writing `f32` values with [`format_balance`].
///
/// serde_json writes non-finite floats as `null` without reaching the
/// formatter, which is why [`Account::to_bytes`] rejects them up front.
struct BalanceFormatter;

impl Formatter for BalanceFormatter {
    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(format_balance(value).as_bytes())
    }
}
