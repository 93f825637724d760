//! Per period statistics. [aggregator] computes category totals for a [period::Bucket],
//! [cache] remembers them for a while, and [CategoryStatistics] is what callers get back.

pub mod aggregator;
pub mod cache;
pub mod period;

use chrono::Duration;

use crate::{
    store::entities::Category,
    utils::percentage::{duration_percentage, Percentage},
};

use aggregator::{sum_totals, CategoryTotal};

/// Category totals resolved to their category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStatistics {
    pub category: Category,
    pub total: Duration,
    pub count: usize,
    /// Share of the total time of every category in the bucket.
    pub share: Percentage,
}

/// Resolves totals to categories with `lookup`. Returns [None] if any category is missing.
pub fn resolve_totals<'a>(
    totals: &[CategoryTotal],
    mut lookup: impl FnMut(&CategoryTotal) -> Option<&'a Category>,
) -> Option<Vec<CategoryStatistics>> {
    let whole = sum_totals(totals);
    totals
        .iter()
        .map(|total| {
            lookup(total).map(|category| CategoryStatistics {
                category: category.clone(),
                total: total.total,
                count: total.count,
                share: duration_percentage(total.total, whole),
            })
        })
        .collect()
}

pub fn total_duration(statistics: &[CategoryStatistics]) -> Duration {
    statistics
        .iter()
        .fold(Duration::zero(), |acc, v| acc + v.total)
}
