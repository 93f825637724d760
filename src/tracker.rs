//! [Tracker] is the single entry point for reading and changing tracked data. It is constructed
//! explicitly with its storage, calendar and clock and keeps everything in memory, persisting
//! after each change.

use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    overlap::{find_conflicts, Interval},
    stats::{
        aggregator::aggregate,
        cache::{StatisticsCache, StatisticsCacheEntry},
        period::{Calendar, Period},
        resolve_totals, CategoryStatistics,
    },
    store::{
        entities::{BlockId, Category, CategoryDraft, CategoryId, TimeBlock, TimeBlockDraft},
        storage::{Collection, Storage},
    },
    utils::clock::Clock,
};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("block must end after it starts ({start} >= {end})")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("block {0} doesn't exist")]
    BlockNotFound(BlockId),
    #[error("category {0} doesn't exist")]
    CategoryNotFound(CategoryId),
    #[error("block overlaps {}", format_ids(.0))]
    Conflict(Vec<BlockId>),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

fn format_ids(ids: &[BlockId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type TrackerResult<T> = Result<T, TrackerError>;

pub struct Tracker<S, Tz: TimeZone> {
    storage: S,
    calendar: Calendar<Tz>,
    clock: Box<dyn Clock>,
    blocks: Vec<TimeBlock>,
    categories: Vec<Category>,
    cache: StatisticsCache,
}

impl<S: Storage, Tz: TimeZone> Tracker<S, Tz> {
    /// Loads everything from `storage`. This is the only place where storage failures are fatal.
    pub async fn open(
        storage: S,
        calendar: Calendar<Tz>,
        clock: Box<dyn Clock>,
        freshness: Duration,
    ) -> anyhow::Result<Self> {
        let (blocks, categories, cached) = futures::try_join!(
            storage.load::<TimeBlock>(Collection::Blocks),
            storage.load::<Category>(Collection::Categories),
            storage.load::<StatisticsCacheEntry>(Collection::Statistics),
        )?;
        info!(
            "Loaded {} blocks, {} categories, {} cached statistics",
            blocks.len(),
            categories.len(),
            cached.len()
        );

        let mut tracker = Self {
            storage,
            calendar,
            clock,
            blocks,
            categories,
            cache: StatisticsCache::new(cached, freshness),
        };
        if tracker.cache.prune(tracker.clock.time()) {
            tracker.persist_cache().await;
        }
        Ok(tracker)
    }

    pub fn calendar(&self) -> &Calendar<Tz> {
        &self.calendar
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.time()
    }

    pub fn block(&self, id: BlockId) -> Option<&TimeBlock> {
        self.blocks.iter().find(|v| v.id == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|v| v.id == id)
    }

    /// Blocks starting in `[start, end)`, earliest first.
    pub fn blocks_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&TimeBlock> {
        let range = Interval { start, end };
        let mut blocks = self
            .blocks
            .iter()
            .filter(|v| range.contains(v.start))
            .collect::<Vec<_>>();
        blocks.sort_by_key(|v| (v.start, v.id));
        blocks
    }

    /// Blocks starting inside the `period` bucket around `reference`. Empty if the bucket can't
    /// be computed.
    pub fn blocks_for_period(&self, reference: DateTime<Utc>, period: Period) -> Vec<&TimeBlock> {
        match self.calendar.bucket(period, reference) {
            Ok(bucket) => self.blocks_between(bucket.start, bucket.end),
            Err(e) => {
                error!("Failed to compute {period} bucket for {reference}: {e:?}");
                vec![]
            }
        }
    }

    /// Categories ordered by their sort order, then by name.
    pub fn categories_ordered(&self) -> Vec<&Category> {
        let mut categories = self.categories.iter().collect::<Vec<_>>();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        categories
    }

    /// Stored blocks that would overlap `interval`.
    pub fn conflicts(&self, interval: Interval, exclude: Option<BlockId>) -> Vec<&TimeBlock> {
        find_conflicts(&self.blocks, interval, exclude)
    }

    pub async fn add_category(&mut self, draft: CategoryDraft) -> TrackerResult<Category> {
        let id = CategoryId(self.categories.iter().map(|v| v.id.0).max().unwrap_or(0) + 1);
        let category = draft.into_category(id);
        let mut categories = self.categories.clone();
        categories.push(category.clone());
        self.commit_categories(categories).await?;
        info!("Added category {} {}", category.id, category.name);
        Ok(category)
    }

    pub async fn update_category(
        &mut self,
        id: CategoryId,
        draft: CategoryDraft,
    ) -> TrackerResult<Category> {
        let mut categories = self.categories.clone();
        let category = categories
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(TrackerError::CategoryNotFound(id))?;
        *category = draft.into_category(id);
        let updated = category.clone();
        self.commit_categories(categories).await?;
        Ok(updated)
    }

    /// Removes a category. Blocks that referenced it become uncategorized.
    pub async fn delete_category(&mut self, id: CategoryId) -> TrackerResult<Category> {
        let mut categories = self.categories.clone();
        let position = categories
            .iter()
            .position(|v| v.id == id)
            .ok_or(TrackerError::CategoryNotFound(id))?;
        let removed = categories.remove(position);

        let mut blocks = self.blocks.clone();
        let mut detached = 0;
        for block in blocks.iter_mut().filter(|v| v.category_id == Some(id)) {
            block.category_id = None;
            detached += 1;
        }

        if detached > 0 {
            self.save_blocks(&blocks).await?;
        }
        if let Err(e) = self.save_categories(&categories).await {
            if detached > 0 {
                // Put the references back so the files keep agreeing with each other.
                if let Err(restore) = self.save_blocks(&self.blocks).await {
                    error!("Failed to restore blocks after a failed category delete {restore:?}");
                }
            }
            return Err(e.into());
        }
        self.blocks = blocks;
        self.categories = categories;

        if self.cache.invalidate_category(id) {
            self.persist_cache().await;
        }
        info!("Deleted category {id}, {detached} blocks left uncategorized");
        Ok(removed)
    }

    /// Assigns sort order by position in `ids`. Categories not listed keep their relative order
    /// after the listed ones.
    pub async fn reorder_categories(&mut self, ids: &[CategoryId]) -> TrackerResult<()> {
        if let Some(missing) = ids.iter().find(|id| self.category(**id).is_none()) {
            return Err(TrackerError::CategoryNotFound(*missing));
        }
        let rest = self
            .categories_ordered()
            .into_iter()
            .map(|v| v.id)
            .filter(|id| !ids.contains(id))
            .collect::<Vec<_>>();

        let mut categories = self.categories.clone();
        for (order, id) in ids.iter().chain(rest.iter()).enumerate() {
            if let Some(category) = categories.iter_mut().find(|v| v.id == *id) {
                category.sort_order = i32::try_from(order).unwrap_or(i32::MAX);
            }
        }
        self.commit_categories(categories).await?;
        Ok(())
    }

    pub async fn add_block(&mut self, draft: TimeBlockDraft) -> TrackerResult<TimeBlock> {
        self.validate(&draft, None)?;
        let id = BlockId(self.blocks.iter().map(|v| v.id.0).max().unwrap_or(0) + 1);
        let block = draft.into_block(id);
        let mut blocks = self.blocks.clone();
        blocks.push(block.clone());
        self.commit_blocks(blocks).await?;
        self.invalidate_statistics(&[block.start]).await;
        info!("Added block {} {}", block.id, block.title);
        Ok(block)
    }

    /// Replaces the contents of a block.
    pub async fn update_block(
        &mut self,
        id: BlockId,
        draft: TimeBlockDraft,
    ) -> TrackerResult<TimeBlock> {
        let previous_start = self
            .block(id)
            .map(|v| v.start)
            .ok_or(TrackerError::BlockNotFound(id))?;
        self.validate(&draft, Some(id))?;

        let updated = draft.into_block(id);
        let mut blocks = self.blocks.clone();
        if let Some(block) = blocks.iter_mut().find(|v| v.id == id) {
            *block = updated.clone();
        }
        self.commit_blocks(blocks).await?;
        self.invalidate_statistics(&[previous_start, updated.start])
            .await;
        Ok(updated)
    }

    /// Moves a block to start at `start`, keeping its duration. Rejected if the new position
    /// overlaps another block.
    pub async fn move_block(
        &mut self,
        id: BlockId,
        start: DateTime<Utc>,
    ) -> TrackerResult<TimeBlock> {
        let moved = self
            .block(id)
            .cloned()
            .ok_or(TrackerError::BlockNotFound(id))?
            .moved_to(start);
        self.update_block(id, moved.into()).await
    }

    pub async fn set_completed(&mut self, id: BlockId, completed: bool) -> TrackerResult<TimeBlock> {
        let mut blocks = self.blocks.clone();
        let block = blocks
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(TrackerError::BlockNotFound(id))?;
        block.completed = completed;
        let updated = block.clone();
        // Completion doesn't take part in statistics, so the cache stays valid.
        self.commit_blocks(blocks).await?;
        Ok(updated)
    }

    pub async fn delete_block(&mut self, id: BlockId) -> TrackerResult<TimeBlock> {
        let mut blocks = self.blocks.clone();
        let position = blocks
            .iter()
            .position(|v| v.id == id)
            .ok_or(TrackerError::BlockNotFound(id))?;
        let removed = blocks.remove(position);
        self.commit_blocks(blocks).await?;
        self.invalidate_statistics(&[removed.start]).await;
        info!("Deleted block {id}");
        Ok(removed)
    }

    /// Statistics of the `period` bucket around `reference`, served from the cache while it is
    /// fresh. Failures are logged and produce empty statistics.
    pub async fn statistics(
        &mut self,
        reference: DateTime<Utc>,
        period: Period,
    ) -> Vec<CategoryStatistics> {
        let bucket = match self.calendar.bucket(period, reference) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to compute {period} bucket for {reference}: {e:?}");
                return vec![];
            }
        };
        let now = self.clock.time();

        if let Some(cached) = self
            .cache
            .fresh_totals(&bucket, now)
            .and_then(|totals| resolve_totals(&totals, |v| self.category(v.category_id)))
        {
            debug!("Serving {period} statistics for {} from cache", bucket.start_date);
            return cached;
        }

        let totals = aggregate(&self.blocks, &bucket);
        self.cache.replace(&bucket, &totals, now);
        self.persist_cache().await;

        let known = totals
            .iter()
            .filter(|v| self.category(v.category_id).is_some())
            .cloned()
            .collect::<Vec<_>>();
        if known.len() != totals.len() {
            // Only possible when the files were edited by hand.
            warn!("Statistics reference unknown categories, skipping them");
        }
        resolve_totals(&known, |v| self.category(v.category_id)).unwrap_or_default()
    }

    fn validate(&self, draft: &TimeBlockDraft, editing: Option<BlockId>) -> TrackerResult<()> {
        let interval = Interval::new_opt(draft.start, draft.end).ok_or(
            TrackerError::InvalidInterval {
                start: draft.start,
                end: draft.end,
            },
        )?;
        if let Some(category_id) = draft.category_id {
            if self.category(category_id).is_none() {
                return Err(TrackerError::CategoryNotFound(category_id));
            }
        }
        let conflicts = self.conflicts(interval, editing);
        if !conflicts.is_empty() {
            return Err(TrackerError::Conflict(
                conflicts.into_iter().map(|v| v.id).collect(),
            ));
        }
        Ok(())
    }

    /// Drops cached statistics of every bucket containing one of `moments`. Entries are matched
    /// by their own bounds, so buckets cut under another week start or time zone go too.
    async fn invalidate_statistics(&mut self, moments: &[DateTime<Utc>]) {
        let mut changed = false;
        for moment in moments {
            changed |= self.cache.invalidate_at(*moment);
        }
        if changed {
            self.persist_cache().await;
        }
    }

    /// Saves `blocks` and only then makes them the current state.
    async fn commit_blocks(&mut self, blocks: Vec<TimeBlock>) -> anyhow::Result<()> {
        self.save_blocks(&blocks).await?;
        self.blocks = blocks;
        Ok(())
    }

    async fn commit_categories(&mut self, categories: Vec<Category>) -> anyhow::Result<()> {
        self.save_categories(&categories).await?;
        self.categories = categories;
        Ok(())
    }

    async fn save_blocks(&self, blocks: &[TimeBlock]) -> anyhow::Result<()> {
        self.storage
            .save(Collection::Blocks, blocks)
            .await
            .inspect_err(|e| error!("Failed to save blocks {e:?}"))
    }

    async fn save_categories(&self, categories: &[Category]) -> anyhow::Result<()> {
        self.storage
            .save(Collection::Categories, categories)
            .await
            .inspect_err(|e| error!("Failed to save categories {e:?}"))
    }

    /// The cache can always be rebuilt, so failing to save it is only logged.
    async fn persist_cache(&self) {
        if let Err(e) = self
            .storage
            .save(Collection::Statistics, self.cache.entries())
            .await
        {
            error!("Failed to save statistics cache {e:?}");
        }
    }
}
