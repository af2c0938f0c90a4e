//! Import deposits in bulk from a CSV file.
//!
//! The file must have a header row with the columns `category`,
//! `sub_category` and `amount`. Amounts may be written the way they are
//! displayed, e.g. `1 500,00 €`.

use std::io::Read;

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    amount::parse_amount_input,
    transaction::{Action, HistoryEntry, TransactionRequest, record_transaction, validate},
    user::UserID,
};

#[derive(Debug, Deserialize)]
struct ImportRow {
    category: String,
    sub_category: String,
    amount: String,
}

/// A row of the CSV file that was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// The line of the row in the file, starting from 1 for the header.
    pub line: u64,
    /// Why the row was not imported.
    pub reason: String,
}

/// The outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// The deposits that were applied, in file order.
    pub imported: Vec<HistoryEntry>,
    /// The rows that were skipped.
    pub rejected: Vec<RejectedRow>,
}

/// Apply each row of the CSV in `reader` as a deposit into the holdings of `user_id`.
///
/// Rows that are malformed, are not valid UTF-8, fail validation or name a
/// pair that is not in the catalog are skipped and listed in the report; the
/// other rows are still imported.
///
/// The whole import runs in one database transaction. If an error is
/// returned, none of the rows are written.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCSV] if the file cannot be read, e.g. it has no header row
///   or reading from `reader` fails part way through,
/// - or [Error::SqlError] if there is an SQL error.
pub fn import_deposits<R: Read>(
    reader: R,
    user_id: UserID,
    connection: &Connection,
) -> Result<ImportReport, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let mut report = ImportReport::default();

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(error) if matches!(error.kind(), csv::ErrorKind::Utf8 { .. }) => {
                let line = error.position().map_or(0, |position| position.line());
                report.reject(line, error.to_string());
                continue;
            }
            Err(error) => return Err(error.into()),
        };
        let line = record.position().map_or(0, |position| position.line());

        let row: ImportRow = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(error) => {
                report.reject(line, error.to_string());
                continue;
            }
        };

        let request = TransactionRequest::new(
            Action::Deposit,
            &row.category,
            &row.sub_category,
            parse_amount_input(&row.amount),
        );

        let transaction = match validate(&request, None) {
            Ok(transaction) => transaction,
            Err(rejection) => {
                report.reject(line, rejection.to_string());
                continue;
            }
        };

        let timestamp = OffsetDateTime::now_utc();

        match record_transaction(user_id, &transaction, timestamp, &sql_transaction) {
            Ok(entry) => report.imported.push(entry),
            Err(error @ (Error::UnknownCategory(_) | Error::BalanceOverflow)) => {
                report.reject(line, error.to_string())
            }
            Err(error) => return Err(error),
        }
    }

    sql_transaction.commit()?;

    tracing::info!(
        "Imported {} deposits for user {user_id}, rejected {} rows",
        report.imported.len(),
        report.rejected.len()
    );

    Ok(report)
}

impl ImportReport {
    fn reject(&mut self, line: u64, reason: String) {
        tracing::warn!("Skipping line {line} of import: {reason}");
        self.rejected.push(RejectedRow { line, reason });
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        portfolio::{Holding, get_holdings},
        transaction::count_transactions,
        user::{Identity, UserID, get_or_create_user},
    };

    use super::import_deposits;

    fn get_test_connection() -> (Connection, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = get_or_create_user(&Identity::new("uid-1", "test@example.com"), &conn).unwrap();
        (conn, user.id)
    }

    #[test]
    fn imports_valid_rows() {
        let (conn, user_id) = get_test_connection();
        let text = "category,sub_category,amount\n\
                    Épargne,PEA,1500\n\
                    Épargne,PEA,\"2 000,00 €\"\n\
                    Immobilier,SCPI,300\n";

        let report = import_deposits(text.as_bytes(), user_id, &conn).unwrap();

        assert_eq!(report.imported.len(), 3);
        assert!(report.rejected.is_empty());
        assert_eq!(
            get_holdings(user_id, &conn).unwrap(),
            vec![
                Holding::new("Épargne", "PEA", 3_500),
                Holding::new("Immobilier", "SCPI", 300),
            ]
        );
    }

    #[test]
    fn reports_rejected_rows_with_line_numbers() {
        let (conn, user_id) = get_test_connection();
        let text = "category,sub_category,amount\n\
                    Épargne,PEA,100\n\
                    ,PEA,100\n\
                    Épargne,PEA,12.5\n\
                    Épargne,Tirelire,100\n\
                    Épargne,PEA\n";

        let report = import_deposits(text.as_bytes(), user_id, &conn).unwrap();

        assert_eq!(report.imported.len(), 1);
        assert_eq!(
            report
                .rejected
                .iter()
                .map(|row| row.line)
                .collect::<Vec<_>>(),
            [3, 4, 5, 6]
        );
        assert_eq!(report.rejected[0].reason, "please select a category");
        assert_eq!(
            get_holdings(user_id, &conn).unwrap(),
            vec![Holding::new("Épargne", "PEA", 100)]
        );
    }

    #[test]
    fn empty_file_imports_nothing() {
        let (conn, user_id) = get_test_connection();

        let report = import_deposits("category,sub_category,amount\n".as_bytes(), user_id, &conn)
            .unwrap();

        assert_eq!(report.imported, vec![]);
        assert_eq!(report.rejected, vec![]);
    }

    /// Yields `data`, then fails every later read.
    struct BrokenReader {
        data: &'static [u8],
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::other("connection reset"));
            }

            self.data.read(buf)
        }
    }

    #[test]
    fn invalid_utf8_row_is_rejected() {
        let (conn, user_id) = get_test_connection();
        let bytes: &[u8] = b"category,sub_category,amount\n\
                             \xc3\x89pargne,PEA,100\n\
                             \xff\xfe,PEA,100\n\
                             Immobilier,SCPI,300\n";

        let report = import_deposits(bytes, user_id, &conn).unwrap();

        assert_eq!(report.imported.len(), 2);
        assert_eq!(
            report
                .rejected
                .iter()
                .map(|row| row.line)
                .collect::<Vec<_>>(),
            [3]
        );
        assert_eq!(
            get_holdings(user_id, &conn).unwrap(),
            vec![
                Holding::new("Épargne", "PEA", 100),
                Holding::new("Immobilier", "SCPI", 300),
            ]
        );
    }

    #[test]
    fn invalid_utf8_header_is_invalid_csv() {
        let (conn, user_id) = get_test_connection();
        let bytes: &[u8] = b"\xff\xfe,sub_category,amount\nImmobilier,SCPI,100\n";

        let result = import_deposits(bytes, user_id, &conn);

        assert!(
            matches!(result, Err(Error::InvalidCSV(_))),
            "want invalid CSV error, got {result:?}"
        );
    }

    #[test]
    fn failed_read_writes_nothing() {
        let (conn, user_id) = get_test_connection();
        let reader = BrokenReader {
            data: "category,sub_category,amount\n\
                   Épargne,PEA,100\n\
                   Immobilier,SCPI,300\n"
                .as_bytes(),
        };

        let result = import_deposits(reader, user_id, &conn);

        assert!(
            matches!(result, Err(Error::InvalidCSV(_))),
            "want invalid CSV error, got {result:?}"
        );
        assert_eq!(get_holdings(user_id, &conn).unwrap(), vec![]);
        assert_eq!(count_transactions(user_id, &conn), Ok(0));
    }
}
