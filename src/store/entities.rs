use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::overlap::Interval;

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A single logged activity. Stored one per line, timestamps as unix seconds.
///
/// `end > start` holds for every block that went through [crate::tracker::Tracker].
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct TimeBlock {
    pub id: BlockId,
    pub title: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
}

impl TimeBlock {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }

    /// Shifts the block so that it starts at `start`, keeping its duration.
    pub fn moved_to(self, start: DateTime<Utc>) -> Self {
        let duration = self.duration();
        Self {
            start,
            end: start + duration,
            ..self
        }
    }
}

/// User supplied contents of a block. Identity and validation are handled by the tracker.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TimeBlockDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub category_id: Option<CategoryId>,
    pub notes: String,
    pub completed: bool,
}

impl TimeBlockDraft {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            start,
            end,
            category_id: None,
            notes: String::new(),
            completed: false,
        }
    }

    pub fn with_category(self, category_id: CategoryId) -> Self {
        Self {
            category_id: Some(category_id),
            ..self
        }
    }

    pub fn with_notes(self, notes: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
            ..self
        }
    }

    pub(crate) fn into_block(self, id: BlockId) -> TimeBlock {
        TimeBlock {
            id,
            title: self.title,
            start: self.start,
            end: self.end,
            category_id: self.category_id,
            notes: self.notes,
            completed: self.completed,
        }
    }
}

impl From<TimeBlock> for TimeBlockDraft {
    fn from(
        TimeBlock {
            title,
            start,
            end,
            category_id,
            notes,
            completed,
            ..
        }: TimeBlock,
    ) -> Self {
        Self {
            title,
            start,
            end,
            category_id,
            notes,
            completed,
        }
    }
}

/// Names are unique only by convention, nothing enforces it.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// `#RRGGBB`
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_color() -> String {
    "#808080".into()
}

impl Category {
    /// Parses [Category::color]. Returns [None] for anything that isn't `#RRGGBB`.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CategoryDraft {
    pub name: String,
    pub color: String,
    pub icon: String,
    pub sort_order: i32,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: default_color(),
            icon: String::new(),
            sort_order: 0,
        }
    }

    pub fn with_color(self, color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            ..self
        }
    }

    pub fn with_sort_order(self, sort_order: i32) -> Self {
        Self { sort_order, ..self }
    }

    pub(crate) fn into_category(self, id: CategoryId) -> Category {
        Category {
            id,
            name: self.name,
            color: self.color,
            icon: self.icon,
            sort_order: self.sort_order,
        }
    }
}

impl From<Category> for CategoryDraft {
    fn from(
        Category {
            name,
            color,
            icon,
            sort_order,
            ..
        }: Category,
    ) -> Self {
        Self {
            name,
            color,
            icon,
            sort_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{BlockId, Category, CategoryId, TimeBlock};

    fn block() -> TimeBlock {
        TimeBlock {
            id: BlockId(1),
            title: "writing".into(),
            start: Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 7, 10, 30, 0).unwrap(),
            category_id: Some(CategoryId(2)),
            notes: String::new(),
            completed: false,
        }
    }

    #[test]
    fn moving_keeps_duration() {
        let original = block();
        let moved = original
            .clone()
            .moved_to(Utc.with_ymd_and_hms(2025, 3, 7, 13, 0, 0).unwrap());
        assert_eq!(moved.duration(), Duration::minutes(90));
        assert_eq!(moved.end, Utc.with_ymd_and_hms(2025, 3, 7, 14, 30, 0).unwrap());
        assert_eq!(moved.title, original.title);
    }

    #[test]
    fn older_lines_without_optional_fields_still_parse() {
        let parsed: TimeBlock =
            serde_json::from_str(r#"{"id":4,"title":"gym","start":1741338000,"end":1741341600}"#)
                .unwrap();
        assert_eq!(parsed.category_id, None);
        assert!(!parsed.completed);
        assert_eq!(parsed.duration(), Duration::hours(1));
    }

    #[test]
    fn category_color_parsing() {
        let mut category = Category {
            id: CategoryId(1),
            name: "work".into(),
            color: "#ff8000".into(),
            icon: "briefcase".into(),
            sort_order: 0,
        };
        assert_eq!(category.rgb(), Some((255, 128, 0)));
        category.color = "ff8000".into();
        assert_eq!(category.rgb(), None);
        category.color = "#zz8000".into();
        assert_eq!(category.rgb(), None);
    }
}
