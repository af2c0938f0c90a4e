//! The entries of a user's transaction history.

use rusqlite::Row;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::database_id::TransactionId;

use super::validation::Action;

/// A deposit or withdrawal recorded by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The ID of the entry.
    pub id: TransactionId,
    /// The category of the holding the entry applied to.
    pub category: String,
    /// The sub-category of the holding the entry applied to.
    pub sub_category: String,
    /// The change to the holding's balance, negative for withdrawals.
    pub amount: i64,
    /// When the ledger recorded the entry.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl HistoryEntry {
    /// Whether the entry was a deposit or a withdrawal.
    pub fn action(&self) -> Action {
        if self.amount < 0 {
            Action::Withdraw
        } else {
            Action::Deposit
        }
    }
}

/// Map a row of `id, category, sub_category, amount, timestamp` to a [HistoryEntry].
pub(crate) fn map_history_row(row: &Row) -> Result<HistoryEntry, rusqlite::Error> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        category: row.get(1)?,
        sub_category: row.get(2)?,
        amount: row.get(3)?,
        timestamp: row.get(4)?,
    })
}
