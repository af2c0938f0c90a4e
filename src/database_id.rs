//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of an entry in the transaction history.
pub type TransactionId = DatabaseId;
