use ansi_term::Colour;
use anyhow::Result;
use chrono::Local;

use crate::{
    config::Settings,
    stats::{period::Period, total_duration, CategoryStatistics},
    utils::{
        percentage::Percentage,
        time::{date_to_string, format_duration},
    },
};

use super::{
    dates::{parse_reference, DATE_EXAMPLES},
    CliTracker,
};

#[derive(Debug, clap::Args)]
pub struct StatsCommand {
    #[arg(long, short, default_value_t = Period::Weekly)]
    period: Period,
    #[arg(long, short, help = format!("Any date inside the period. Defaults to now. {DATE_EXAMPLES}"))]
    date: Option<String>,
    #[arg(short = 'm', long = "min-percentage", help = "Hide categories below this share", default_value_t = Percentage::ZERO)]
    min_percentage: Percentage,
    #[arg(long, help = "Don't color category names")]
    plain: bool,
}

/// Prints time per category for the chosen period, longest first.
pub async fn process_stats_command(
    StatsCommand {
        period,
        date,
        min_percentage,
        plain,
    }: StatsCommand,
    tracker: &mut CliTracker,
    settings: &Settings,
) -> Result<()> {
    let now = tracker.now().with_timezone(&Local);
    let reference = parse_reference(date.as_deref(), settings.date_style, now)?;

    let bucket = tracker.calendar().bucket(period, reference)?;
    let statistics = tracker.statistics(reference, period).await;

    println!(
        "Statistics {period} ({} - {})",
        date_to_string(bucket.start_date),
        date_to_string(tracker.calendar().local_date(bucket.end) - chrono::Duration::days(1)),
    );
    if statistics.is_empty() {
        println!("Nothing tracked");
        return Ok(());
    }

    for entry in statistics.iter().filter(|v| v.share >= min_percentage) {
        println!(
            "{}%\t{}\t{}\t{}",
            *entry.share as i32,
            format_duration(entry.total),
            entry.count,
            category_label(entry, plain)
        );
    }
    println!();
    println!("Total\t{}", format_duration(total_duration(&statistics)));
    Ok(())
}

fn category_label(entry: &CategoryStatistics, plain: bool) -> String {
    match entry.category.rgb() {
        Some((r, g, b)) if !plain => Colour::RGB(r, g, b).paint(&entry.category.name).to_string(),
        _ => entry.category.name.clone(),
    }
}
