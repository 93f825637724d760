use std::collections::HashMap;

use chrono::Duration;
use tracing::{instrument, trace};

use crate::store::entities::{CategoryId, TimeBlock};

use super::period::Bucket;

/// Time spent on a category during a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category_id: CategoryId,
    pub total: Duration,
    pub count: usize,
}

impl CategoryTotal {
    fn new(category_id: CategoryId) -> Self {
        Self {
            category_id,
            total: Duration::zero(),
            count: 0,
        }
    }
}

/// Groups blocks starting inside `bucket` by category. Blocks without a category aren't counted.
/// The result is sorted by total duration, longest first.
#[instrument(skip(blocks))]
pub fn aggregate<'a>(
    blocks: impl IntoIterator<Item = &'a TimeBlock>,
    bucket: &Bucket,
) -> Vec<CategoryTotal> {
    let mut map = HashMap::<CategoryId, CategoryTotal>::new();

    for block in blocks {
        if !bucket.contains(block.start) {
            continue;
        }
        let Some(category_id) = block.category_id else {
            trace!("Skipping uncategorized block {}", block.id);
            continue;
        };
        let total = map
            .entry(category_id)
            .or_insert_with(|| CategoryTotal::new(category_id));
        total.total += block.duration();
        total.count += 1;
    }

    let mut totals = map.into_values().collect::<Vec<_>>();
    totals.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    totals
}

pub fn sum_totals<'a>(totals: impl IntoIterator<Item = &'a CategoryTotal>) -> Duration {
    totals
        .into_iter()
        .fold(Duration::zero(), |acc, next| acc + next.total)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use crate::{
        stats::period::{Calendar, Period, WeekStart},
        store::entities::{BlockId, CategoryId, TimeBlock},
    };

    use super::{aggregate, sum_totals, CategoryTotal};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap()
    }

    fn block(
        id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category: Option<u64>,
    ) -> TimeBlock {
        TimeBlock {
            id: BlockId(id),
            title: format!("block {id}"),
            start,
            end,
            category_id: category.map(CategoryId),
            notes: String::new(),
            completed: false,
        }
    }

    #[test]
    fn daily_totals_per_category() {
        let blocks = [
            block(1, at(7, 9, 0), at(7, 10, 0), Some(1)),
            block(2, at(7, 10, 0), at(7, 11, 0), Some(2)),
        ];
        let bucket = Calendar::new(Utc, WeekStart::Monday)
            .bucket(Period::Daily, at(7, 12, 0))
            .unwrap();

        let totals = aggregate(&blocks, &bucket);

        assert_eq!(
            totals,
            vec![
                CategoryTotal {
                    category_id: CategoryId(1),
                    total: Duration::seconds(3600),
                    count: 1
                },
                CategoryTotal {
                    category_id: CategoryId(2),
                    total: Duration::seconds(3600),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn sorted_longest_first_and_uncategorized_excluded() {
        let blocks = [
            block(1, at(7, 8, 0), at(7, 8, 30), Some(1)),
            block(2, at(7, 9, 0), at(7, 11, 0), Some(2)),
            block(3, at(7, 11, 0), at(7, 12, 0), Some(1)),
            block(4, at(7, 13, 0), at(7, 18, 0), None),
        ];
        let bucket = Calendar::new(Utc, WeekStart::Monday)
            .bucket(Period::Daily, at(7, 0, 0))
            .unwrap();

        let totals = aggregate(&blocks, &bucket);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category_id, CategoryId(2));
        assert_eq!(totals[0].total, Duration::hours(2));
        assert_eq!(totals[1].category_id, CategoryId(1));
        assert_eq!(totals[1].total, Duration::minutes(90));
        assert_eq!(totals[1].count, 2);
    }

    #[test]
    fn only_blocks_starting_in_bucket_count() {
        // Starts the day before and runs past midnight, so it belongs to the 6th.
        let blocks = [
            block(1, at(6, 23, 0), at(7, 1, 0), Some(1)),
            block(2, at(7, 23, 30), at(8, 0, 30), Some(1)),
        ];
        let bucket = Calendar::new(Utc, WeekStart::Monday)
            .bucket(Period::Daily, at(7, 12, 0))
            .unwrap();

        let totals = aggregate(&blocks, &bucket);

        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].count, 1);
        assert_eq!(totals[0].total, Duration::hours(1));
    }

    fn blocks_strategy() -> impl Strategy<Value = Vec<TimeBlock>> {
        prop::collection::vec(
            (0i64..60 * 24 * 60, 1i64..4 * 60, prop::option::of(1u64..5)),
            0..40,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(id, (start, length, category))| {
                    let start = at(1, 0, 0) + Duration::minutes(start);
                    block(id as u64, start, start + Duration::minutes(length), category)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn total_matches_sum_of_matching_blocks(
            blocks in blocks_strategy(),
            period in prop::sample::select(Period::ALL.to_vec()),
            reference in 0i64..60 * 24,
        ) {
            let bucket = Calendar::new(Utc, WeekStart::Monday)
                .bucket(period, at(1, 0, 0) + Duration::hours(reference))
                .unwrap();

            let totals = aggregate(&blocks, &bucket);

            let expected = blocks
                .iter()
                .filter(|v| v.category_id.is_some() && bucket.contains(v.start))
                .fold(Duration::zero(), |acc, v| acc + v.duration());
            let expected_count = blocks
                .iter()
                .filter(|v| v.category_id.is_some() && bucket.contains(v.start))
                .count();

            prop_assert_eq!(sum_totals(&totals), expected);
            prop_assert_eq!(totals.iter().map(|v| v.count).sum::<usize>(), expected_count);
            prop_assert!(totals.windows(2).all(|w| w[0].total >= w[1].total));
        }
    }
}
