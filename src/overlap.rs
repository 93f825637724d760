//! Conflict detection between time blocks. Intervals are half-open, so a block ending at 10:00
//! and another starting at 10:00 don't conflict.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::entities::{BlockId, TimeBlock};

/// `[start, end)`
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Returns [None] unless `end > start`.
    pub fn new_opt(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }

    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.start <= moment && moment < self.end
    }
}

/// Returns all blocks intersecting `candidate`. `exclude` is the block being edited, it would
/// otherwise always conflict with its own new position.
pub fn find_conflicts<'a>(
    blocks: impl IntoIterator<Item = &'a TimeBlock>,
    candidate: Interval,
    exclude: Option<BlockId>,
) -> Vec<&'a TimeBlock> {
    blocks
        .into_iter()
        .filter(|block| Some(block.id) != exclude)
        .filter(|block| candidate.overlaps(&block.interval()))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use crate::store::entities::{BlockId, TimeBlock};

    use super::{find_conflicts, Interval};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, hour, minute, 0).unwrap()
    }

    fn block(id: u64, start: DateTime<Utc>, end: DateTime<Utc>) -> TimeBlock {
        TimeBlock {
            id: BlockId(id),
            title: format!("block {id}"),
            start,
            end,
            category_id: None,
            notes: String::new(),
            completed: false,
        }
    }

    #[test]
    fn partial_overlap_conflicts() {
        let existing = [block(1, at(9, 0), at(10, 0))];
        let candidate = Interval::new_opt(at(9, 30), at(10, 30)).unwrap();

        let conflicts = find_conflicts(&existing, candidate, None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, BlockId(1));
    }

    #[test]
    fn adjacent_blocks_do_not_conflict() {
        let existing = [
            block(1, at(9, 0), at(10, 0)),
            block(2, at(10, 0), at(11, 0)),
        ];
        assert!(find_conflicts(&existing, existing[0].interval(), Some(BlockId(1))).is_empty());
        assert!(find_conflicts(&existing, existing[1].interval(), Some(BlockId(2))).is_empty());
    }

    #[test]
    fn containment_conflicts_both_ways() {
        let existing = [block(1, at(9, 0), at(12, 0)), block(2, at(13, 0), at(13, 30))];

        let inner = Interval::new_opt(at(10, 0), at(10, 15)).unwrap();
        let outer = Interval::new_opt(at(12, 30), at(14, 0)).unwrap();

        assert_eq!(find_conflicts(&existing, inner, None)[0].id, BlockId(1));
        assert_eq!(find_conflicts(&existing, outer, None)[0].id, BlockId(2));
    }

    #[test]
    fn excluded_block_is_ignored() {
        let existing = [block(1, at(9, 0), at(10, 0)), block(2, at(9, 30), at(11, 0))];
        let candidate = Interval::new_opt(at(9, 15), at(9, 45)).unwrap();

        let conflicts = find_conflicts(&existing, candidate, Some(BlockId(1)));
        assert_eq!(
            conflicts.iter().map(|v| v.id).collect::<Vec<_>>(),
            vec![BlockId(2)]
        );
    }

    #[test]
    fn empty_intervals_are_rejected() {
        assert!(Interval::new_opt(at(9, 0), at(9, 0)).is_none());
        assert!(Interval::new_opt(at(10, 0), at(9, 0)).is_none());
    }

    fn interval_strategy() -> impl Strategy<Value = Interval> {
        (0i64..24 * 60, 1i64..6 * 60).prop_map(|(start, length)| {
            let start = at(0, 0) + Duration::minutes(start);
            Interval {
                start,
                end: start + Duration::minutes(length),
            }
        })
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in interval_strategy(), b in interval_strategy()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn overlap_matches_shared_moment(a in interval_strategy(), b in interval_strategy()) {
            // Both intervals are minute aligned, so sharing any minute is the same as overlapping.
            let shared = (0..24 * 60 + 6 * 60)
                .map(|m| at(0, 0) + Duration::minutes(m))
                .any(|moment| a.contains(moment) && b.contains(moment));
            prop_assert_eq!(a.overlaps(&b), shared);
        }
    }
}
