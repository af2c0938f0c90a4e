//! Aggregation of holdings into per-category summaries.
//!
//! Holdings are grouped by category then sub-category, duplicate pairs are
//! summed and categories are sorted into display order.

use std::collections::HashMap;

use crate::category::display_rank;

use super::models::{CategorySummary, Holding, PortfolioSummary, SubCategoryBalance};

/// Summarise `holdings` by category and sub-category.
///
/// Holdings for the same (category, sub-category) pair are summed. Holdings
/// with a zero balance do not get a sub-category row, and categories left
/// without any rows are dropped. Categories follow
/// [crate::CATEGORY_DISPLAY_ORDER], unknown categories come after those in
/// the order they are first seen. Sub-categories keep the order they are
/// first seen in.
///
/// Sums saturate at `i64::MAX`. The ledger refuses writes that would take a
/// user's total past it, so only hand-built input can reach the cap.
pub fn aggregate(holdings: &[Holding]) -> PortfolioSummary {
    let mut categories: Vec<CategorySummary> = Vec::new();
    let mut category_index: HashMap<&str, usize> = HashMap::new();

    for holding in holdings.iter().filter(|holding| holding.balance != 0) {
        let index = *category_index
            .entry(holding.category.as_str())
            .or_insert_with(|| {
                categories.push(CategorySummary {
                    category: holding.category.clone(),
                    total_balance: 0,
                    sub_categories: Vec::new(),
                });
                categories.len() - 1
            });

        let summary = &mut categories[index];
        summary.total_balance = summary.total_balance.saturating_add(holding.balance);

        match summary
            .sub_categories
            .iter_mut()
            .find(|row| row.name == holding.sub_category)
        {
            Some(row) => row.balance = row.balance.saturating_add(holding.balance),
            None => summary.sub_categories.push(SubCategoryBalance {
                name: holding.sub_category.clone(),
                balance: holding.balance,
            }),
        }
    }

    categories.retain(|summary| !summary.sub_categories.is_empty());
    // Stable, so unranked categories keep encounter order.
    categories.sort_by_key(|summary| display_rank(&summary.category).unwrap_or(usize::MAX));

    let grand_total = categories
        .iter()
        .fold(0i64, |total, summary| total.saturating_add(summary.total_balance));

    PortfolioSummary {
        categories,
        grand_total,
    }
}

/// Summarise only the holdings of `category`.
///
/// Returns `None` if the category has no non-zero holdings.
pub fn category_breakdown(holdings: &[Holding], category: &str) -> Option<CategorySummary> {
    let in_category: Vec<Holding> = holdings
        .iter()
        .filter(|holding| holding.category == category)
        .cloned()
        .collect();

    aggregate(&in_category).categories.into_iter().next()
}
