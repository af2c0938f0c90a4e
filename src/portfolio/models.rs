//! Holdings and the summaries derived from them.

use serde::{Deserialize, Serialize};

/// A balance recorded against a (category, sub-category) pair.
///
/// Balances are whole euros and never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// The top level classification, e.g. "Épargne".
    pub category: String,
    /// The account or asset within the category, e.g. "Livret A/LDDS".
    pub sub_category: String,
    /// The amount held.
    pub balance: i64,
}

impl Holding {
    /// Create a new holding.
    pub fn new(category: &str, sub_category: &str, balance: i64) -> Self {
        Self {
            category: category.to_owned(),
            sub_category: sub_category.to_owned(),
            balance,
        }
    }
}

/// The balance of one sub-category within a [CategorySummary].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategoryBalance {
    /// The sub-category name.
    pub name: String,
    /// The sum of the holdings recorded against the sub-category.
    pub balance: i64,
}

/// The holdings of one category, broken down by sub-category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// The category name.
    pub category: String,
    /// The sum of the sub-category balances.
    pub total_balance: i64,
    /// The sub-categories in the order they were first encountered.
    pub sub_categories: Vec<SubCategoryBalance>,
}

impl CategorySummary {
    /// The balance of `sub_category`, or `None` if the category has no such row.
    pub fn balance_of(&self, sub_category: &str) -> Option<i64> {
        self.sub_categories
            .iter()
            .find(|row| row.name == sub_category)
            .map(|row| row.balance)
    }
}

/// Every category of a portfolio and the grand total.
///
/// Categories are in display order, see [crate::CATEGORY_DISPLAY_ORDER].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// The category summaries in display order.
    pub categories: Vec<CategorySummary>,
    /// The sum of all category totals.
    pub grand_total: i64,
}

impl PortfolioSummary {
    /// Whether there is nothing to show.
    ///
    /// An empty portfolio is not an error, callers should show a "no data"
    /// message instead of a table or chart.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// The summary of the category called `name`.
    pub fn category(&self, name: &str) -> Option<&CategorySummary> {
        self.categories.iter().find(|summary| summary.category == name)
    }

    /// The balance of a (category, sub-category) pair, or `None` if the pair
    /// has no holding in this snapshot.
    pub fn balance_of(&self, category: &str, sub_category: &str) -> Option<i64> {
        self.category(category)
            .and_then(|summary| summary.balance_of(sub_category))
    }
}
