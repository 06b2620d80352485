use std::io::Write;

use csv::Writer;
use serde::Serialize;

use crate::account::{Account, format_balance};

#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Balance")]
    balance: String,
    #[serde(rename = "Bank")]
    bank: &'a str,
}

/// Writes accounts as CSV with the `ID,Balance,Bank` header.
pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl Iterator<Item = Account>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for acc in accounts {
        let row = AccountRow {
            id: &acc.id,
            balance: format_balance(acc.balance),
            bank: &acc.bank,
        };
        if let Err(err) = writer.serialize(row) {
            anyhow::bail!("Failed to write account {} to CSV: {err}", acc.id)
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
