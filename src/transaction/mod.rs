//! Deposits and withdrawals.
//!
//! This module contains everything related to moving money in and out of holdings:
//! - The validator that accepts or rejects a [TransactionRequest]
//! - The ledger functions that apply transactions and manage the history

mod core;
mod models;
mod validation;

pub use core::{
    apply_transaction, count_transactions, create_transaction_table, delete_transaction,
    get_history_page, submit_transaction,
};
pub(crate) use core::record_transaction;
pub use models::HistoryEntry;
pub use validation::{
    Action, Rejection, TransactionRequest, ValidatedTransaction, ValidationResult, validate,
    validate_against,
};
