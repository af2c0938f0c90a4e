//! The ledger: applies deposits and withdrawals to holdings and keeps their history.
//!
//! Every write runs inside its own SQLite transaction so that the funds check
//! and the balance update see the same balance.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    Error,
    category::get_category_id,
    database_id::TransactionId,
    pagination::{Page, paginate},
    portfolio::{add_to_balance, ensure_total_fits, get_balance, get_portfolio_summary},
    user::UserID,
};

use super::{
    models::{HistoryEntry, map_history_row},
    validation::{Action, TransactionRequest, ValidatedTransaction, validate_against},
};

// ============================================================================
// TABLE
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                amount INTEGER NOT NULL CHECK (amount != 0),
                timestamp TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE
                )",
        (),
    )?;

    // Used by the history page.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_timestamp
         ON \"transaction\"(user_id, timestamp);",
        (),
    )?;

    Ok(())
}

// ============================================================================
// WRITES
// ============================================================================

/// Validate `request` against the current portfolio of `user_id` and apply it.
///
/// # Errors
/// This function will return a:
/// - [Error::Rejected] if the request fails validation,
/// - [Error::UnknownCategory] if the category pair is not in the catalog,
/// - [Error::InsufficientFunds] if the balance dropped between validation and writing,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn submit_transaction(
    user_id: UserID,
    request: &TransactionRequest,
    connection: &Connection,
) -> Result<HistoryEntry, Error> {
    let summary = get_portfolio_summary(user_id, connection)?;

    let transaction = validate_against(request, &summary).inspect_err(|rejection| {
        tracing::warn!("Rejected transaction for user {user_id}: {rejection}");
    })?;

    apply_transaction(user_id, &transaction, OffsetDateTime::now_utc(), connection)
}

/// Apply a validated transaction to the holdings of `user_id` and record it
/// in their history.
///
/// The balance of a withdrawal is re-checked against the stored balance
/// inside the write, so this is the final word on whether there are enough
/// funds, whatever the snapshot the transaction was validated against.
///
/// # Errors
/// This function will return a:
/// - [Error::UnknownCategory] if the category pair is not in the catalog,
/// - [Error::InsufficientFunds] if a withdrawal is larger than the stored balance,
/// - [Error::BalanceOverflow] if a deposit would take the portfolio total past `i64::MAX`,
/// - or [Error::SqlError] if there is some other SQL error, e.g. `user_id` does not exist.
pub fn apply_transaction(
    user_id: UserID,
    transaction: &ValidatedTransaction,
    timestamp: OffsetDateTime,
    connection: &Connection,
) -> Result<HistoryEntry, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let entry = record_transaction(user_id, transaction, timestamp, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(entry)
}

/// Apply `transaction` on `connection` without opening an SQL transaction.
///
/// Callers must already be inside one so that the funds check and the
/// balance update see the same balance.
pub(crate) fn record_transaction(
    user_id: UserID,
    transaction: &ValidatedTransaction,
    timestamp: OffsetDateTime,
    connection: &Connection,
) -> Result<HistoryEntry, Error> {
    let pair = transaction.pair();
    let category_id = get_category_id(pair, connection)?;

    match transaction.action() {
        Action::Deposit => {
            ensure_total_fits(user_id, transaction.amount(), connection).inspect_err(|_| {
                tracing::warn!(
                    "Refused deposit of {} into {pair} for user {user_id}: total would overflow",
                    transaction.amount()
                );
            })?;
        }
        Action::Withdraw => {
            let available = get_balance(user_id, category_id, connection)?;

            if transaction.amount() > available {
                tracing::warn!(
                    "Refused withdrawal of {} from {pair} for user {user_id}: only {available} available",
                    transaction.amount()
                );
                return Err(Error::InsufficientFunds { available });
            }
        }
    }

    let balance = add_to_balance(user_id, category_id, transaction.signed_amount(), connection)?;

    let id: TransactionId = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, category_id, amount, timestamp)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id",
        )?
        .query_row(
            (
                user_id.as_i64(),
                category_id,
                transaction.signed_amount(),
                timestamp,
            ),
            |row| row.get(0),
        )?;

    tracing::info!(
        "Applied transaction {id} of {} to {pair} for user {user_id}, new balance {balance}",
        transaction.signed_amount()
    );

    Ok(HistoryEntry {
        id,
        category: pair.category.clone(),
        sub_category: pair.sub_category.clone(),
        amount: transaction.signed_amount(),
        timestamp,
    })
}

/// Delete a history entry of `user_id` and reverse its effect on the holding.
///
/// Returns the deleted entry.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` is not an entry in the history of `user_id`,
/// - [Error::NegativeBalance] if reversing the entry would leave the holding
///   with a negative balance,
/// - [Error::BalanceOverflow] if reversing a withdrawal would take the
///   portfolio total past `i64::MAX`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<HistoryEntry, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let (entry, category_id) = sql_transaction
        .prepare(
            "SELECT t.id, c.name, c.sub_category, t.amount, t.timestamp, t.category_id
             FROM \"transaction\" t
             INNER JOIN category c ON t.category_id = c.id
             WHERE t.id = ?1 AND t.user_id = ?2",
        )?
        .query_row((id, user_id.as_i64()), |row| {
            Ok((map_history_row(row)?, row.get::<_, i64>(5)?))
        })?;

    if entry.amount < 0 {
        ensure_total_fits(user_id, -entry.amount, &sql_transaction)?;
    }

    let balance = get_balance(user_id, category_id, &sql_transaction)?;
    let reversed_balance = balance
        .checked_sub(entry.amount)
        .ok_or(Error::BalanceOverflow)?;

    if reversed_balance < 0 {
        tracing::warn!(
            "Refused to delete transaction {id} for user {user_id}: balance would be {reversed_balance}"
        );
        return Err(Error::NegativeBalance(reversed_balance));
    }

    add_to_balance(user_id, category_id, -entry.amount, &sql_transaction)?;
    sql_transaction.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?;
    sql_transaction.commit()?;

    tracing::info!("Deleted transaction {id} for user {user_id}, new balance {reversed_balance}");

    Ok(entry)
}

// ============================================================================
// QUERIES
// ============================================================================

/// Get one page of the history of `user_id`, newest entries first.
///
/// `page` and `page_size` are clamped as described in [paginate].
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_history_page(
    user_id: UserID,
    page: u64,
    page_size: u64,
    connection: &Connection,
) -> Result<Page<HistoryEntry>, Error> {
    let total = count_transactions(user_id, connection)?;
    let window = paginate(total, page, page_size);

    let items = connection
        .prepare(
            "SELECT t.id, c.name, c.sub_category, t.amount, t.timestamp
             FROM \"transaction\" t
             INNER JOIN category c ON t.category_id = c.id
             WHERE t.user_id = ?1
             ORDER BY t.timestamp DESC, t.id DESC
             LIMIT ?2 OFFSET ?3",
        )?
        .query_map(
            (
                user_id.as_i64(),
                to_sql_int(window.limit()),
                to_sql_int(window.offset()),
            ),
            map_history_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "Loaded page {} of {} ({} entries) for user {user_id}",
        window.page,
        window.pages,
        items.len()
    );

    Ok(Page { items, window })
}

/// Get the number of history entries of `user_id`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn count_transactions(user_id: UserID, connection: &Connection) -> Result<u64, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1",
        (user_id.as_i64(),),
        |row| row.get(0),
    )?;

    Ok(count.max(0) as u64)
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{Duration, macros::datetime};

    use crate::{
        Error,
        db::initialize,
        portfolio::{Holding, get_holdings, get_portfolio_summary},
        transaction::{Action, Rejection, TransactionRequest, validate, validate_against},
        user::{Identity, UserID, get_or_create_user},
    };

    use super::{
        apply_transaction, count_transactions, delete_transaction, get_history_page,
        submit_transaction,
    };

    fn get_test_connection() -> (Connection, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = get_or_create_user(&Identity::new("uid-1", "test@example.com"), &conn).unwrap();
        (conn, user.id)
    }

    fn request(action: Action, amount: f64) -> TransactionRequest {
        TransactionRequest::new(action, "Épargne", "PEA", amount)
    }

    #[test]
    fn deposit_then_withdraw_updates_balance() {
        let (conn, user_id) = get_test_connection();

        submit_transaction(user_id, &request(Action::Deposit, 500.0), &conn).unwrap();
        let entry = submit_transaction(user_id, &request(Action::Withdraw, 200.0), &conn).unwrap();

        assert_eq!(entry.amount, -200);
        assert_eq!(
            get_holdings(user_id, &conn).unwrap(),
            vec![Holding::new("Épargne", "PEA", 300)]
        );
    }

    #[test]
    fn submit_rejects_withdrawal_above_balance() {
        let (conn, user_id) = get_test_connection();
        submit_transaction(user_id, &request(Action::Deposit, 50.0), &conn).unwrap();

        let result = submit_transaction(user_id, &request(Action::Withdraw, 100.0), &conn);

        assert_eq!(
            result,
            Err(Error::Rejected(Rejection::InsufficientFunds { available: 50 }))
        );
        assert_eq!(count_transactions(user_id, &conn), Ok(1));
    }

    #[test]
    fn stale_validation_is_overruled_by_ledger() {
        let (conn, user_id) = get_test_connection();
        submit_transaction(user_id, &request(Action::Deposit, 100.0), &conn).unwrap();
        let snapshot = get_portfolio_summary(user_id, &conn).unwrap();
        let first = validate_against(&request(Action::Withdraw, 80.0), &snapshot).unwrap();
        let second = validate_against(&request(Action::Withdraw, 80.0), &snapshot).unwrap();
        let now = datetime!(2025-03-14 09:30 UTC);

        apply_transaction(user_id, &first, now, &conn).unwrap();
        let result = apply_transaction(user_id, &second, now, &conn);

        assert_eq!(result, Err(Error::InsufficientFunds { available: 20 }));
        assert_eq!(
            get_holdings(user_id, &conn).unwrap(),
            vec![Holding::new("Épargne", "PEA", 20)]
        );
    }

    #[test]
    fn unknown_category_pair_is_refused() {
        let (conn, user_id) = get_test_connection();
        let request = TransactionRequest::new(Action::Deposit, "Épargne", "Bas de laine", 10.0);
        let transaction = validate(&request, None).unwrap();

        let now = datetime!(2025-03-14 09:30 UTC);

        let result = apply_transaction(user_id, &transaction, now, &conn);

        assert!(
            matches!(result, Err(Error::UnknownCategory(_))),
            "want unknown category error, got {result:?}"
        );
        assert_eq!(count_transactions(user_id, &conn), Ok(0));
    }

    #[test]
    fn history_is_newest_first() {
        let (conn, user_id) = get_test_connection();
        let start = datetime!(2025-01-01 12:00 UTC);
        for day in 0..25 {
            let transaction = validate(&request(Action::Deposit, (day + 1) as f64), None).unwrap();
            apply_transaction(user_id, &transaction, start + Duration::days(day), &conn).unwrap();
        }

        let page = get_history_page(user_id, 1, 10, &conn).unwrap();

        assert_eq!(page.items.len(), 10);
        assert_eq!(page.items[0].amount, 25);
        assert_eq!(page.items[9].amount, 16);
        assert_eq!(page.window.total, 25);
        assert_eq!(page.window.pages, 3);
        assert!(page.window.has_next);
        assert!(!page.window.has_prev);
    }

    #[test]
    fn last_history_page_has_remaining_entries() {
        let (conn, user_id) = get_test_connection();
        let start = datetime!(2025-01-01 12:00 UTC);
        for day in 0..25 {
            let transaction = validate(&request(Action::Deposit, (day + 1) as f64), None).unwrap();
            apply_transaction(user_id, &transaction, start + Duration::days(day), &conn).unwrap();
        }

        let page = get_history_page(user_id, 3, 10, &conn).unwrap();

        assert_eq!(
            page.items.iter().map(|entry| entry.amount).collect::<Vec<_>>(),
            [5, 4, 3, 2, 1]
        );
        assert!(!page.window.has_next);
    }

    #[test]
    fn empty_history_has_one_empty_page() {
        let (conn, user_id) = get_test_connection();

        let page = get_history_page(user_id, 1, 10, &conn).unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.window.pages, 1);
    }

    #[test]
    fn delete_reverses_balance() {
        let (conn, user_id) = get_test_connection();
        submit_transaction(user_id, &request(Action::Deposit, 500.0), &conn).unwrap();
        let withdrawal =
            submit_transaction(user_id, &request(Action::Withdraw, 200.0), &conn).unwrap();

        let deleted = delete_transaction(user_id, withdrawal.id, &conn).unwrap();

        assert_eq!(deleted, withdrawal);
        assert_eq!(
            get_holdings(user_id, &conn).unwrap(),
            vec![Holding::new("Épargne", "PEA", 500)]
        );
        assert_eq!(count_transactions(user_id, &conn), Ok(1));
    }

    #[test]
    fn delete_refuses_negative_balance() {
        let (conn, user_id) = get_test_connection();
        let deposit = submit_transaction(user_id, &request(Action::Deposit, 500.0), &conn).unwrap();
        submit_transaction(user_id, &request(Action::Withdraw, 400.0), &conn).unwrap();

        let result = delete_transaction(user_id, deposit.id, &conn);

        assert_eq!(result, Err(Error::NegativeBalance(-400)));
        assert_eq!(count_transactions(user_id, &conn), Ok(2));
    }

    #[test]
    fn delete_of_other_users_entry_is_not_found() {
        let (conn, user_id) = get_test_connection();
        let other = get_or_create_user(&Identity::new("uid-2", "other@example.com"), &conn)
            .unwrap()
            .id;
        let entry = submit_transaction(user_id, &request(Action::Deposit, 500.0), &conn).unwrap();

        assert_eq!(delete_transaction(other, entry.id, &conn), Err(Error::NotFound));
        assert_eq!(delete_transaction(user_id, 9_999, &conn), Err(Error::NotFound));
    }

    #[test]
    fn deposit_past_largest_total_is_refused() {
        let (conn, user_id) = get_test_connection();
        let lep = |amount| TransactionRequest::new(Action::Deposit, "Épargne", "LEP", amount);
        submit_transaction(user_id, &request(Action::Deposit, 5e18), &conn).unwrap();

        let result = submit_transaction(user_id, &lep(5e18), &conn);

        assert_eq!(result, Err(Error::BalanceOverflow));
        assert_eq!(count_transactions(user_id, &conn), Ok(1));
        assert_eq!(
            get_portfolio_summary(user_id, &conn).unwrap().grand_total,
            5_000_000_000_000_000_000
        );
    }

    #[test]
    fn deposit_past_largest_balance_is_refused() {
        let (conn, user_id) = get_test_connection();
        submit_transaction(user_id, &request(Action::Deposit, 5e18), &conn).unwrap();

        let result = submit_transaction(user_id, &request(Action::Deposit, 5e18), &conn);

        assert_eq!(result, Err(Error::BalanceOverflow));
        assert_eq!(
            get_holdings(user_id, &conn).unwrap(),
            vec![Holding::new("Épargne", "PEA", 5_000_000_000_000_000_000)]
        );
    }

    #[test]
    fn delete_refuses_overflowing_total() {
        let (conn, user_id) = get_test_connection();
        submit_transaction(user_id, &request(Action::Deposit, 4e18), &conn).unwrap();
        let withdrawal = submit_transaction(user_id, &request(Action::Withdraw, 3e18), &conn).unwrap();
        let lep = TransactionRequest::new(Action::Deposit, "Épargne", "LEP", 6e18);
        submit_transaction(user_id, &lep, &conn).unwrap();

        let result = delete_transaction(user_id, withdrawal.id, &conn);

        assert_eq!(result, Err(Error::BalanceOverflow));
        assert_eq!(count_transactions(user_id, &conn), Ok(3));
    }
}
