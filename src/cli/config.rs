use std::path::Path;

use anyhow::Result;

use crate::{
    config::{DateStyle, Settings},
    stats::period::WeekStart,
};

#[derive(Debug, clap::Args)]
pub struct ConfigCommand {
    #[arg(long, help = "First day of the week used by weekly statistics")]
    week_start: Option<WeekStart>,
    #[arg(long, help = "How long cached statistics are trusted")]
    freshness_minutes: Option<u32>,
    #[arg(
        long,
        help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
    )]
    date_style: Option<DateStyle>,
}

/// Shows settings, saving them first if any value was passed.
pub async fn process_config_command(
    ConfigCommand {
        week_start,
        freshness_minutes,
        date_style,
    }: ConfigCommand,
    mut settings: Settings,
    app_dir: &Path,
) -> Result<()> {
    let changed = week_start.is_some() || freshness_minutes.is_some() || date_style.is_some();
    if let Some(week_start) = week_start {
        settings.week_start = week_start;
    }
    if let Some(freshness_minutes) = freshness_minutes {
        settings.freshness_minutes = freshness_minutes;
    }
    if let Some(date_style) = date_style {
        settings.date_style = date_style;
    }
    if changed {
        settings.save(app_dir).await?;
    }

    println!("week_start\t{}", settings.week_start);
    println!("freshness_minutes\t{}", settings.freshness_minutes);
    println!("date_style\t{}", settings.date_style);
    Ok(())
}
