//! Checks a deposit or withdrawal before it is sent to the ledger.
//!
//! The checks mirror the ones the ledger makes so users get immediate
//! feedback. They are advisory: the ledger re-checks the balance when it
//! writes, and its answer is final.

use serde::{Deserialize, Serialize};

use crate::{amount::format_amount_rounded, category::CategoryPair, portfolio::PortfolioSummary};

/// Whether money goes into or out of a holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Add money to a holding.
    Deposit,
    /// Take money out of a holding.
    Withdraw,
}

/// A deposit or withdrawal as submitted by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Whether to deposit or withdraw.
    pub action: Action,
    /// The selected category, empty if nothing was selected.
    #[serde(rename = "categoryName")]
    pub category: String,
    /// The selected sub-category, empty if nothing was selected.
    pub sub_category: String,
    /// The amount as submitted, which may be fractional or negative.
    pub amount: f64,
}

impl TransactionRequest {
    /// Create a new request.
    pub fn new(action: Action, category: &str, sub_category: &str, amount: f64) -> Self {
        Self {
            action,
            category: category.to_owned(),
            sub_category: sub_category.to_owned(),
            amount,
        }
    }
}

/// A request that passed [validate].
///
/// Can only be created by the validator, so holding one means the selection
/// is complete and the amount is a positive whole number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedTransaction {
    action: Action,
    pair: CategoryPair,
    amount: i64,
}

impl ValidatedTransaction {
    /// Whether to deposit or withdraw.
    pub fn action(&self) -> Action {
        self.action
    }

    /// The holding the transaction applies to.
    pub fn pair(&self) -> &CategoryPair {
        &self.pair
    }

    /// The amount, always greater than zero.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// The change to the holding's balance: negative for withdrawals.
    pub fn signed_amount(&self) -> i64 {
        match self.action {
            Action::Deposit => self.amount,
            Action::Withdraw => -self.amount,
        }
    }
}

/// Why a request was rejected. The user can fix any of these and try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum Rejection {
    /// No category was selected.
    #[error("please select a category")]
    MissingCategory,

    /// No sub-category was selected.
    #[error("please select an account")]
    MissingSubCategory,

    /// The amount is not a whole number greater than zero.
    #[error("please enter a whole amount greater than zero")]
    InvalidAmount,

    /// A withdrawal is larger than the balance of the holding.
    #[error("insufficient funds ({} available)", available_funds(.available))]
    InsufficientFunds {
        /// The balance the request was checked against.
        available: i64,
    },
}

fn available_funds(available: &i64) -> String {
    format_amount_rounded(*available)
}

/// Either the accepted transaction or the reason it was rejected.
pub type ValidationResult = Result<ValidatedTransaction, Rejection>;

/// Check `request` against `current_balance`, the balance of the holding it
/// targets.
///
/// Checks run in order: category, sub-category, amount, then funds. A
/// withdrawal from a holding with an unknown balance is checked against a
/// balance of 0. Deposits have no upper bound.
pub fn validate(request: &TransactionRequest, current_balance: Option<i64>) -> ValidationResult {
    let category = request.category.trim();
    let sub_category = request.sub_category.trim();

    if category.is_empty() {
        return Err(Rejection::MissingCategory);
    }

    if sub_category.is_empty() {
        return Err(Rejection::MissingSubCategory);
    }

    let amount = whole_amount(request.amount).ok_or(Rejection::InvalidAmount)?;

    if request.action == Action::Withdraw {
        let available = current_balance.unwrap_or(0);

        if amount > available {
            return Err(Rejection::InsufficientFunds { available });
        }
    }

    Ok(ValidatedTransaction {
        action: request.action,
        pair: CategoryPair::new(category, sub_category),
        amount,
    })
}

/// [validate] `request` against the balance recorded in `summary`.
pub fn validate_against(request: &TransactionRequest, summary: &PortfolioSummary) -> ValidationResult {
    validate(
        request,
        summary.balance_of(request.category.trim(), request.sub_category.trim()),
    )
}

fn whole_amount(amount: f64) -> Option<i64> {
    let is_whole = amount.is_finite() && amount.fract() == 0.0;

    if is_whole && amount > 0.0 && amount < i64::MAX as f64 {
        Some(amount as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        category::CategoryPair,
        portfolio::{Holding, aggregate},
    };

    use super::{Action, Rejection, TransactionRequest, validate, validate_against};

    fn withdraw(amount: f64) -> TransactionRequest {
        TransactionRequest::new(Action::Withdraw, "A", "X", amount)
    }

    fn deposit(amount: f64) -> TransactionRequest {
        TransactionRequest::new(Action::Deposit, "A", "X", amount)
    }

    #[test]
    fn category_pair_is_trimmed() {
        let request = TransactionRequest::new(Action::Deposit, " Épargne ", "PEA ", 10.0);

        let transaction = validate(&request, None).unwrap();

        assert_eq!(transaction.pair(), &CategoryPair::new("Épargne", "PEA"));
    }

    #[test]
    fn padded_withdrawal_is_checked_against_stored_balance() {
        let summary = aggregate(&[Holding::new("Épargne", "PEA", 50)]);
        let request = TransactionRequest::new(Action::Withdraw, "Épargne ", " PEA", 30.0);

        let transaction = validate_against(&request, &summary).unwrap();

        assert_eq!(transaction.pair(), &CategoryPair::new("Épargne", "PEA"));
        assert_eq!(transaction.signed_amount(), -30);
    }

    #[test]
    fn withdrawal_above_balance_is_rejected() {
        let result = validate(&withdraw(100.0), Some(50));

        assert_eq!(result, Err(Rejection::InsufficientFunds { available: 50 }));
    }

    #[test]
    fn exact_balance_can_be_withdrawn() {
        let transaction = validate(&withdraw(50.0), Some(50)).unwrap();

        assert_eq!(transaction.amount(), 50);
        assert_eq!(transaction.signed_amount(), -50);
    }

    #[test]
    fn withdrawal_with_unknown_balance_is_rejected() {
        let result = validate(&withdraw(1.0), None);

        assert_eq!(result, Err(Rejection::InsufficientFunds { available: 0 }));
    }

    #[test]
    fn deposits_have_no_upper_bound() {
        let transaction = validate(&deposit(1_000_000.0), Some(0)).unwrap();

        assert_eq!(transaction.signed_amount(), 1_000_000);
    }

    #[test]
    fn missing_category_is_reported_first() {
        let request = TransactionRequest::new(Action::Deposit, "", "", -1.0);

        assert_eq!(validate(&request, Some(0)), Err(Rejection::MissingCategory));
    }

    #[test]
    fn blank_sub_category_is_missing() {
        let request = TransactionRequest::new(Action::Deposit, "A", "  ", 10.0);

        assert_eq!(
            validate(&request, Some(0)),
            Err(Rejection::MissingSubCategory)
        );
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        for amount in [0.0, -5.0, 12.5, f64::NAN, f64::INFINITY, 1e30] {
            assert_eq!(
                validate(&deposit(amount), Some(0)),
                Err(Rejection::InvalidAmount),
                "amount {amount} should be invalid"
            );
        }
    }

    #[test]
    fn invalid_amount_is_reported_before_funds() {
        assert_eq!(
            validate(&withdraw(0.5), Some(0)),
            Err(Rejection::InvalidAmount)
        );
    }

    #[test]
    fn looks_up_balance_in_summary() {
        let summary = aggregate(&[Holding::new("Épargne", "LEP", 300)]);
        let request = TransactionRequest::new(Action::Withdraw, "Épargne", "LEP", 300.0);
        let too_much = TransactionRequest::new(Action::Withdraw, "Épargne", "LEP", 301.0);
        let elsewhere = TransactionRequest::new(Action::Withdraw, "Épargne", "PEA", 1.0);

        assert!(validate_against(&request, &summary).is_ok());
        assert_eq!(
            validate_against(&too_much, &summary),
            Err(Rejection::InsufficientFunds { available: 300 })
        );
        assert_eq!(
            validate_against(&elsewhere, &summary),
            Err(Rejection::InsufficientFunds { available: 0 })
        );
    }

    #[test]
    fn deserializes_form_fields() {
        let request: TransactionRequest = serde_json::from_str(
            r#"{"action":"withdraw","categoryName":"Épargne","subCategory":"LEP","amount":20}"#,
        )
        .unwrap();

        assert_eq!(
            request,
            TransactionRequest::new(Action::Withdraw, "Épargne", "LEP", 20.0)
        );
    }

    #[test]
    fn rejection_message_shows_available_funds() {
        let message = Rejection::InsufficientFunds { available: 1_500 }.to_string();

        assert_eq!(message, "insufficient funds (1\u{202f}500\u{a0}€ available)");
    }
}
