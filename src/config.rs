use std::{fmt::Display, io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use chrono::Duration;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::stats::{cache::DEFAULT_FRESHNESS, period::WeekStart};

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateStyle {
    #[default]
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// User preferences persisted next to the data. Unknown or missing fields fall back to defaults
/// so older files keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub week_start: WeekStart,
    /// How long cached statistics are trusted.
    pub freshness_minutes: u32,
    /// Style of dates used during parsing. For Uk it's day/month/year. For Us it's
    /// month/day/year
    pub date_style: DateStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            week_start: WeekStart::default(),
            freshness_minutes: DEFAULT_FRESHNESS.num_minutes() as u32,
            date_style: DateStyle::default(),
        }
    }
}

impl Settings {
    pub fn freshness(&self) -> Duration {
        Duration::minutes(self.freshness_minutes.into())
    }

    /// Reads settings from `dir`. A missing or unreadable file results in defaults.
    pub async fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {path:?}")),
        };
        match serde_json::from_str(&contents) {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("Ignoring malformed settings in {path:?}: {e}");
                Ok(Self::default())
            }
        }
    }

    pub async fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(SETTINGS_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {path:?}"))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Duration;
    use tempfile::tempdir;

    use crate::stats::period::WeekStart;

    use super::{DateStyle, Settings, SETTINGS_FILE};

    #[tokio::test]
    async fn missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let settings = Settings::load(dir.path()).await?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.freshness(), Duration::hours(1));
        assert_eq!(settings.week_start, WeekStart::Monday);
        Ok(())
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{"week_start": "sunday"}"#)?;

        let settings = Settings::load(dir.path()).await?;
        assert_eq!(settings.week_start, WeekStart::Sunday);
        assert_eq!(settings.freshness_minutes, 60);
        assert_eq!(settings.date_style, DateStyle::Uk);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json")?;

        assert_eq!(Settings::load(dir.path()).await?, Settings::default());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load() -> Result<()> {
        let dir = tempdir()?;
        let settings = Settings {
            week_start: WeekStart::Saturday,
            freshness_minutes: 15,
            date_style: DateStyle::Us,
        };
        settings.save(dir.path()).await?;

        assert_eq!(Settings::load(dir.path()).await?, settings);
        Ok(())
    }
}
