use serde::Serialize;

use crate::domain::{Cents, cents_as_decimal};
use crate::storage::CategoryTotal;

/// Totals over a set of expenses, overall and per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseSummary {
    #[serde(with = "cents_as_decimal")]
    pub total: Cents,
    pub count: i64,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    #[serde(with = "cents_as_decimal")]
    pub total: Cents,
    pub count: i64,
}

impl ExpenseSummary {
    /// Returns `None` when the grand total does not fit in `Cents`.
    pub fn from_totals(totals: Vec<CategoryTotal>) -> Option<Self> {
        let total = totals
            .iter()
            .try_fold(0 as Cents, |acc, t| acc.checked_add(t.total))?;
        let count = totals.iter().map(|t| t.count).sum();
        let categories = totals
            .into_iter()
            .map(|t| CategorySummary {
                category: t.category,
                total: t.total,
                count: t.count,
            })
            .collect();

        Some(Self {
            total,
            count,
            categories,
        })
    }
}
