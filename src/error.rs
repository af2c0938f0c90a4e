//! Defines the app level error type and its conversion from SQLite errors.

use crate::{category::CategoryPair, transaction::Rejection};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The (category, sub-category) pair is not part of the category catalog.
    #[error("\"{0}\" is not a known category and sub-category combination")]
    UnknownCategory(CategoryPair),

    /// The ledger refused a withdrawal because the stored balance is lower
    /// than the amount requested.
    ///
    /// This is the authoritative outcome: it wins over a request that was
    /// accepted by [crate::validate] against an older portfolio snapshot.
    #[error("insufficient funds: {available} available")]
    InsufficientFunds {
        /// The balance of the holding at write time.
        available: i64,
    },

    /// Deleting a history entry would leave its holding with a negative
    /// balance, e.g. removing a deposit whose funds were already withdrawn.
    #[error("removing this transaction would leave a negative balance of {0}")]
    NegativeBalance(i64),

    /// A balance or the portfolio total would not fit in an `i64`.
    #[error("the amount would take the portfolio past the largest balance that can be stored")]
    BalanceOverflow,

    /// The string does not name a risk profile.
    #[error("\"{0}\" is not a valid risk profile")]
    InvalidRiskProfile(String),

    /// The transaction was rejected before reaching the database.
    #[error("transaction rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The CSV had issues that prevented it from being parsed.
    #[error("could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::InvalidCSV(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, transaction::Rejection};

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn rejection_converts_into_error() {
        let error: Error = Rejection::MissingCategory.into();

        assert_eq!(error, Error::Rejected(Rejection::MissingCategory));
    }

    #[test]
    fn insufficient_funds_message_includes_balance() {
        let error = Error::InsufficientFunds { available: 42 };

        assert_eq!(error.to_string(), "insufficient funds: 42 available");
    }
}
