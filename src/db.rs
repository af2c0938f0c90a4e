//! Sets up the application's SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    category::{create_category_table, seed_default_categories},
    portfolio::create_portfolio_table,
    transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the application tables and seed the category catalog.
///
/// Safe to call on a database that has already been initialized: existing
/// tables and categories are left untouched.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_portfolio_table(&transaction)?;
    create_transaction_table(&transaction)?;
    seed_default_categories(&transaction)?;

    transaction.commit()?;

    Ok(())
}
