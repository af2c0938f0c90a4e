//! Portfolio holdings and their aggregation for the dashboard and category pages.
//!
//! This module contains:
//! - The `Holding` model and the summaries derived from it
//! - The aggregation of holdings into per-category breakdowns
//! - Pie chart data for those breakdowns
//! - Database functions for reading and updating balances

mod aggregation;
mod chart;
mod core;
mod models;

pub use aggregation::{aggregate, category_breakdown};
pub use chart::{LABEL_SHARE_THRESHOLD, PieSlice};
pub use core::{
    add_to_balance, create_portfolio_table, ensure_total_fits, get_balance, get_category_summary, get_holdings,
    get_portfolio_summary, get_withdrawable_holdings,
};
pub use models::{CategorySummary, Holding, PortfolioSummary, SubCategoryBalance};
