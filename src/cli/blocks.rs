use anyhow::Result;
use chrono::Local;
use clap::CommandFactory;

use crate::{
    config::Settings,
    overlap::Interval,
    stats::period::Period,
    store::entities::{BlockId, CategoryId, TimeBlock, TimeBlockDraft},
    utils::time::format_duration,
};

use super::{
    dates::{parse_moment, parse_reference, DATE_EXAMPLES},
    Args, CliTracker,
};

#[derive(Debug, clap::Args)]
pub struct AddCommand {
    title: String,
    #[arg(long, short, help = format!("Start of the block. {DATE_EXAMPLES}"))]
    start: String,
    #[arg(long, short, help = format!("End of the block. {DATE_EXAMPLES}"))]
    end: String,
    #[arg(long, short, help = "Category id")]
    category: Option<u64>,
    #[arg(long, short, default_value = "")]
    notes: String,
    #[arg(long, help = "Mark as completed right away")]
    completed: bool,
}

#[derive(Debug, clap::Args)]
pub struct ListCommand {
    #[arg(long, short, default_value_t = Period::Daily)]
    period: Period,
    #[arg(long, short, help = format!("Any date inside the period. Defaults to now. {DATE_EXAMPLES}"))]
    date: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct EditCommand {
    id: u64,
    #[arg(long)]
    title: Option<String>,
    #[arg(long, short)]
    start: Option<String>,
    #[arg(long, short)]
    end: Option<String>,
    #[arg(long, short, conflicts_with = "no_category")]
    category: Option<u64>,
    #[arg(long, help = "Remove the category of the block")]
    no_category: bool,
    #[arg(long, short)]
    notes: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct MoveCommand {
    id: u64,
    #[arg(long, short, help = format!("New start of the block. {DATE_EXAMPLES}"))]
    start: String,
}

#[derive(Debug, clap::Args)]
pub struct CompleteCommand {
    id: u64,
    #[arg(long, help = "Mark as not completed instead")]
    undo: bool,
}

#[derive(Debug, clap::Args)]
pub struct RemoveCommand {
    id: u64,
}

#[derive(Debug, clap::Args)]
pub struct ConflictsCommand {
    #[arg(long, short)]
    start: String,
    #[arg(long, short)]
    end: String,
    #[arg(long, help = "Block id to ignore, usually the one being moved")]
    exclude: Option<u64>,
}

pub async fn process_add_command(
    AddCommand {
        title,
        start,
        end,
        category,
        notes,
        completed,
    }: AddCommand,
    tracker: &mut CliTracker,
    settings: &Settings,
) -> Result<()> {
    let now = tracker.now().with_timezone(&Local);
    let start = parse_moment(&start, settings.date_style, now)?;
    let end = parse_moment(&end, settings.date_style, now)?;

    let mut draft = TimeBlockDraft::new(title, start, end).with_notes(notes);
    draft.category_id = category.map(CategoryId);
    draft.completed = completed;

    let block = tracker.add_block(draft).await?;
    println!("Added {}", format_block(tracker, &block));
    Ok(())
}

pub fn process_list_command(
    ListCommand { period, date }: ListCommand,
    tracker: &CliTracker,
    settings: &Settings,
) -> Result<()> {
    let now = tracker.now().with_timezone(&Local);
    let reference = parse_reference(date.as_deref(), settings.date_style, now)?;

    for block in tracker.blocks_for_period(reference, period) {
        println!("{}", format_block(tracker, block));
    }
    Ok(())
}

pub async fn process_edit_command(
    EditCommand {
        id,
        title,
        start,
        end,
        category,
        no_category,
        notes,
    }: EditCommand,
    tracker: &mut CliTracker,
    settings: &Settings,
) -> Result<()> {
    let id = BlockId(id);
    let Some(existing) = tracker.block(id).cloned() else {
        return Err(unknown_block(id));
    };

    let now = tracker.now().with_timezone(&Local);
    let mut draft = TimeBlockDraft::from(existing);
    if let Some(title) = title {
        draft.title = title;
    }
    if let Some(start) = start {
        draft.start = parse_moment(&start, settings.date_style, now)?;
    }
    if let Some(end) = end {
        draft.end = parse_moment(&end, settings.date_style, now)?;
    }
    if let Some(category) = category {
        draft.category_id = Some(CategoryId(category));
    }
    if no_category {
        draft.category_id = None;
    }
    if let Some(notes) = notes {
        draft.notes = notes;
    }

    let block = tracker.update_block(id, draft).await?;
    println!("Updated {}", format_block(tracker, &block));
    Ok(())
}

pub async fn process_move_command(
    MoveCommand { id, start }: MoveCommand,
    tracker: &mut CliTracker,
    settings: &Settings,
) -> Result<()> {
    let now = tracker.now().with_timezone(&Local);
    let start = parse_moment(&start, settings.date_style, now)?;
    let block = tracker.move_block(BlockId(id), start).await?;
    println!("Moved {}", format_block(tracker, &block));
    Ok(())
}

pub async fn process_complete_command(
    CompleteCommand { id, undo }: CompleteCommand,
    tracker: &mut CliTracker,
) -> Result<()> {
    let block = tracker.set_completed(BlockId(id), !undo).await?;
    println!("{}", format_block(tracker, &block));
    Ok(())
}

pub async fn process_remove_command(
    RemoveCommand { id }: RemoveCommand,
    tracker: &mut CliTracker,
) -> Result<()> {
    let block = tracker.delete_block(BlockId(id)).await?;
    println!("Removed {}", format_block(tracker, &block));
    Ok(())
}

pub fn process_conflicts_command(
    ConflictsCommand {
        start,
        end,
        exclude,
    }: ConflictsCommand,
    tracker: &CliTracker,
    settings: &Settings,
) -> Result<()> {
    let now = tracker.now().with_timezone(&Local);
    let start = parse_moment(&start, settings.date_style, now)?;
    let end = parse_moment(&end, settings.date_style, now)?;
    let Some(interval) = Interval::new_opt(start, end) else {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                "End of the range must be after its start",
            )
            .into());
    };

    let conflicts = tracker.conflicts(interval, exclude.map(BlockId));
    if conflicts.is_empty() {
        println!("No conflicts");
    }
    for block in conflicts {
        println!("{}", format_block(tracker, block));
    }
    Ok(())
}

fn unknown_block(id: BlockId) -> anyhow::Error {
    Args::command()
        .error(
            clap::error::ErrorKind::ValueValidation,
            format!("Block {id} doesn't exist"),
        )
        .into()
}

fn format_block(tracker: &CliTracker, block: &TimeBlock) -> String {
    let start = block.start.with_timezone(&Local);
    let end = block.end.with_timezone(&Local);
    let category = block
        .category_id
        .and_then(|id| tracker.category(id))
        .map(|v| v.name.as_str())
        .unwrap_or("-");
    format!(
        "{}\t{}\t{}\t{}\t[{}]\t{}\t{}",
        block.id.0,
        start.format("%x %H:%M"),
        end.format("%H:%M"),
        format_duration(block.duration()),
        if block.completed { "x" } else { " " },
        category,
        block.title
    )
}
