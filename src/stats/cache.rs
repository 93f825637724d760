use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{store::entities::CategoryId, utils::time::duration_seconds};

use super::{
    aggregator::CategoryTotal,
    period::{Bucket, Period},
};

pub const DEFAULT_FRESHNESS: Duration = Duration::hours(1);

/// One aggregated category total. Keyed by the exact instants of its bucket so entries computed
/// under another week start or time zone never answer for the current one.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct StatisticsCacheEntry {
    pub period: Period,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end: DateTime<Utc>,
    pub category_id: CategoryId,
    #[serde(with = "duration_seconds")]
    pub total: Duration,
    pub count: usize,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub computed_at: DateTime<Utc>,
}

impl StatisticsCacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        now - self.computed_at < freshness
    }

    fn matches(&self, bucket: &Bucket) -> bool {
        self.period == bucket.period && self.start == bucket.start && self.end == bucket.end
    }

    fn covers(&self, moment: DateTime<Utc>) -> bool {
        self.start <= moment && moment < self.end
    }

    pub fn to_total(&self) -> CategoryTotal {
        CategoryTotal {
            category_id: self.category_id,
            total: self.total,
            count: self.count,
        }
    }
}

/// Keeps the last computed aggregates. Entries are trusted only while they are younger than the
/// freshness window.
#[derive(Debug, Clone)]
pub struct StatisticsCache {
    entries: Vec<StatisticsCacheEntry>,
    freshness: Duration,
}

impl StatisticsCache {
    pub fn new(entries: Vec<StatisticsCacheEntry>, freshness: Duration) -> Self {
        Self { entries, freshness }
    }

    pub fn entries(&self) -> &[StatisticsCacheEntry] {
        &self.entries
    }

    /// Returns the cached totals of a bucket, longest first. [None] if nothing is cached for it
    /// or any of the entries went stale.
    pub fn fresh_totals(&self, bucket: &Bucket, now: DateTime<Utc>) -> Option<Vec<CategoryTotal>> {
        let entries = self
            .entries
            .iter()
            .filter(|v| v.matches(bucket))
            .collect::<Vec<_>>();

        if entries.is_empty() || !entries.iter().all(|v| v.is_fresh(now, self.freshness)) {
            return None;
        }

        let mut totals = entries.iter().map(|v| v.to_total()).collect::<Vec<_>>();
        totals.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });
        Some(totals)
    }

    /// Drops whatever was cached for the bucket and stores `totals` instead.
    pub fn replace(&mut self, bucket: &Bucket, totals: &[CategoryTotal], now: DateTime<Utc>) {
        self.entries.retain(|v| !v.matches(bucket));
        self.entries
            .extend(totals.iter().map(|total| StatisticsCacheEntry {
                period: bucket.period,
                start: bucket.start,
                end: bucket.end,
                category_id: total.category_id,
                total: total.total,
                count: total.count,
                computed_at: now,
            }));
    }

    /// Drops every entry whose bucket contains `moment`, whichever calendar produced it.
    /// Returns whether anything was removed.
    pub fn invalidate_at(&mut self, moment: DateTime<Utc>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|v| !v.covers(moment));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Invalidated {removed} entries covering {moment}");
        }
        removed > 0
    }

    pub fn invalidate_category(&mut self, category_id: CategoryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|v| v.category_id != category_id);
        before != self.entries.len()
    }

    /// Removes stale entries. Returns whether anything was removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.entries.len();
        let freshness = self.freshness;
        self.entries.retain(|v| v.is_fresh(now, freshness));
        before != self.entries.len()
    }
}
