//! HelpInvest tracks a personal investment portfolio.
//!
//! Holdings are recorded against a catalog of categories and sub-categories
//! (e.g. "Épargne" / "PEA"). Users deposit into and withdraw from their
//! holdings, review a paginated history of those transactions and keep a
//! risk profile on their account.
//!
//! This library provides:
//! - Formatting of amounts as French euro strings ([format_amount])
//! - Aggregation of holdings for the dashboard ([aggregate])
//! - Validation of deposits and withdrawals ([validate])
//! - Pagination of the transaction history ([paginate])
//! - A SQLite ledger that stores holdings, users and history ([initialize_db])

#![warn(missing_docs)]

mod amount;
mod category;
mod csv_import;
mod database_id;
mod db;
mod error;
mod logging;
mod pagination;
mod portfolio;
mod risk_profile;
mod transaction;
mod user;

pub use amount::{
    GROUP_SEPARATOR, UNIT_SEPARATOR, format_amount, format_amount_rounded, format_number,
    format_percentage, parse_amount_input, parse_digits, strip_currency_symbols,
};
pub use category::{
    CATEGORY_DISPLAY_ORDER, Category, CategoryPair, DEFAULT_CATEGORIES, get_all_categories,
    get_category_id, get_category_names,
};
pub use csv_import::{ImportReport, RejectedRow, import_deposits};
pub use database_id::{DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::setup_logging;
pub use pagination::{Page, PageWindow, PaginationConfig, paginate};
pub use portfolio::{
    CategorySummary, Holding, LABEL_SHARE_THRESHOLD, PieSlice, PortfolioSummary,
    SubCategoryBalance, aggregate, category_breakdown, get_category_summary, get_holdings,
    get_portfolio_summary, get_withdrawable_holdings,
};
pub use risk_profile::RiskProfile;
pub use transaction::{
    Action, HistoryEntry, Rejection, TransactionRequest, ValidatedTransaction, ValidationResult,
    apply_transaction, delete_transaction, get_history_page, submit_transaction, validate,
    validate_against,
};
pub use user::{
    Identity, User, UserID, delete_user, get_or_create_user, get_user_by_id, set_risk_profile,
};
