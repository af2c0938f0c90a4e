//! Database queries for the balances each user holds.

use rusqlite::Connection;

use crate::{Error, database_id::DatabaseId, user::UserID};

use super::{
    aggregation::{aggregate, category_breakdown},
    models::{CategorySummary, Holding, PortfolioSummary},
};

// ============================================================================
// TABLE
// ============================================================================

/// Create the portfolio table, one row per user and catalog entry.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_portfolio_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS portfolio (
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
                PRIMARY KEY(user_id, category_id),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

// ============================================================================
// QUERIES
// ============================================================================

/// Get a snapshot of every holding of `user_id`, in catalog order.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_holdings(user_id: UserID, connection: &Connection) -> Result<Vec<Holding>, Error> {
    query_holdings(user_id, false, connection)
}

/// Get the holdings of `user_id` that have money to withdraw.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_withdrawable_holdings(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Holding>, Error> {
    query_holdings(user_id, true, connection)
}

fn query_holdings(
    user_id: UserID,
    positive_only: bool,
    connection: &Connection,
) -> Result<Vec<Holding>, Error> {
    let holdings = connection
        .prepare(
            "SELECT category.name, category.sub_category, portfolio.balance
             FROM portfolio
             INNER JOIN category ON portfolio.category_id = category.id
             WHERE portfolio.user_id = ?1 AND (?2 = 0 OR portfolio.balance > 0)
             ORDER BY category.id",
        )?
        .query_map((user_id.as_i64(), positive_only), |row| {
            Ok(Holding {
                category: row.get(0)?,
                sub_category: row.get(1)?,
                balance: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!("Loaded {} holdings for user {user_id}", holdings.len());

    Ok(holdings)
}

/// Aggregate the current holdings of `user_id` for the dashboard.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_portfolio_summary(
    user_id: UserID,
    connection: &Connection,
) -> Result<PortfolioSummary, Error> {
    get_holdings(user_id, connection).map(|holdings| aggregate(&holdings))
}

/// Aggregate the current holdings of `user_id` in a single category.
///
/// Returns `Ok(None)` if the user holds nothing in that category.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_category_summary(
    user_id: UserID,
    category: &str,
    connection: &Connection,
) -> Result<Option<CategorySummary>, Error> {
    get_holdings(user_id, connection).map(|holdings| category_breakdown(&holdings, category))
}

/// Get the stored balance of one holding, 0 if the user never held it.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_balance(
    user_id: UserID,
    category_id: DatabaseId,
    connection: &Connection,
) -> Result<i64, Error> {
    match connection.query_row(
        "SELECT balance FROM portfolio WHERE user_id = ?1 AND category_id = ?2",
        (user_id.as_i64(), category_id),
        |row| row.get(0),
    ) {
        Ok(balance) => Ok(balance),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(error) => Err(error.into()),
    }
}

/// Add `delta` to a holding, creating it if needed. Returns the new balance.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeBalance] if the balance would drop below zero,
/// - [Error::BalanceOverflow] if the balance would not fit in an `i64`,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn add_to_balance(
    user_id: UserID,
    category_id: DatabaseId,
    delta: i64,
    connection: &Connection,
) -> Result<i64, Error> {
    let balance = get_balance(user_id, category_id, connection)?
        .checked_add(delta)
        .ok_or(Error::BalanceOverflow)?;

    if balance < 0 {
        return Err(Error::NegativeBalance(balance));
    }

    connection
        .prepare(
            "INSERT INTO portfolio (user_id, category_id, balance) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, category_id) DO UPDATE SET balance = excluded.balance
             RETURNING balance",
        )?
        .query_row((user_id.as_i64(), category_id, balance), |row| row.get(0))
        .map_err(|error| error.into())
}

/// Check that the portfolio total of `user_id` can grow by `increase`.
///
/// Every holding is at most the total, so this also guarantees that no
/// single balance overflows.
///
/// # Errors
/// This function will return a:
/// - [Error::BalanceOverflow] if the new total would not fit in an `i64`,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn ensure_total_fits(
    user_id: UserID,
    increase: i64,
    connection: &Connection,
) -> Result<(), Error> {
    get_holdings(user_id, connection)?
        .iter()
        .try_fold(increase, |total, holding| total.checked_add(holding.balance))
        .map(|_| ())
        .ok_or(Error::BalanceOverflow)
}
