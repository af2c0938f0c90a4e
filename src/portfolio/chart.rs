//! Pie chart data for the dashboard and the category pages.
//!
//! Only the data is produced here, rendering is left to the presentation layer.

use serde::Serialize;

use crate::amount::format_percentage;

use super::models::{CategorySummary, PortfolioSummary};

/// Slices with a share at or below this ratio are drawn without a percentage label.
pub const LABEL_SHARE_THRESHOLD: f64 = 0.05;

/// One slice of a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    /// The category or sub-category name.
    pub label: String,
    /// The balance the slice represents.
    pub value: i64,
    /// The slice's fraction of the whole pie, in `[0, 1]`.
    pub share: f64,
    /// The formatted percentage to draw on the slice, if it is large enough.
    pub percentage_label: Option<String>,
}

impl PieSlice {
    fn new(label: &str, value: i64, total: i64) -> Self {
        let share = if total > 0 {
            value as f64 / total as f64
        } else {
            0.0
        };

        let percentage_label =
            (share > LABEL_SHARE_THRESHOLD).then(|| format_percentage(share));

        Self {
            label: label.to_owned(),
            value,
            share,
            percentage_label,
        }
    }
}

impl PortfolioSummary {
    /// One slice per category, in display order.
    pub fn shares(&self) -> Vec<PieSlice> {
        self.categories
            .iter()
            .map(|summary| PieSlice::new(&summary.category, summary.total_balance, self.grand_total))
            .collect()
    }
}

impl CategorySummary {
    /// One slice per sub-category, largest first.
    pub fn slices(&self) -> Vec<PieSlice> {
        let mut slices: Vec<PieSlice> = self
            .sub_categories
            .iter()
            .map(|row| PieSlice::new(&row.name, row.balance, self.total_balance))
            .collect();

        slices.sort_by(|a, b| b.value.cmp(&a.value));

        slices
    }
}
