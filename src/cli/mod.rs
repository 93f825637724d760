pub mod blocks;
pub mod categories;
pub mod config;
pub mod dates;
pub mod stats;

use std::path::{Path, PathBuf};

use anyhow::Result;
use blocks::{
    process_add_command, process_complete_command, process_conflicts_command,
    process_edit_command, process_list_command, process_move_command, process_remove_command,
    AddCommand, CompleteCommand, ConflictsCommand, EditCommand, ListCommand, MoveCommand,
    RemoveCommand,
};
use categories::{process_category_command, CategoryCommand};
use chrono::Local;
use clap::{Parser, Subcommand};
use config::{process_config_command, ConfigCommand};
use stats::{process_stats_command, StatsCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    config::Settings,
    stats::period::Calendar,
    store::storage::JsonStorage,
    tracker::Tracker,
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "blocktime", version, long_about = None)]
#[command(about = "Log your day as time blocks and see where the time goes", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Log a new time block")]
    Add(AddCommand),
    #[command(about = "List time blocks of a day, week, month or year")]
    List(ListCommand),
    #[command(about = "Change a time block")]
    Edit(EditCommand),
    #[command(about = "Move a time block keeping its duration")]
    Move(MoveCommand),
    #[command(about = "Mark a time block as completed")]
    Complete(CompleteCommand),
    #[command(about = "Delete a time block")]
    Remove(RemoveCommand),
    #[command(about = "Show time blocks overlapping a range")]
    Conflicts(ConflictsCommand),
    #[command(about = "Show time spent per category")]
    Stats(StatsCommand),
    #[command(about = "Manage categories")]
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    #[command(about = "Show or change settings")]
    Config(ConfigCommand),
}

pub type CliTracker = Tracker<JsonStorage, Local>;

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    let settings = Settings::load(&app_dir).await?;

    let mut tracker = match args.commands {
        Commands::Config(command) => {
            return process_config_command(command, settings, &app_dir).await;
        }
        _ => open_tracker(&app_dir, &settings).await?,
    };

    match args.commands {
        Commands::Add(command) => process_add_command(command, &mut tracker, &settings).await,
        Commands::List(command) => process_list_command(command, &tracker, &settings),
        Commands::Edit(command) => process_edit_command(command, &mut tracker, &settings).await,
        Commands::Move(command) => process_move_command(command, &mut tracker, &settings).await,
        Commands::Complete(command) => process_complete_command(command, &mut tracker).await,
        Commands::Remove(command) => process_remove_command(command, &mut tracker).await,
        Commands::Conflicts(command) => process_conflicts_command(command, &tracker, &settings),
        Commands::Stats(command) => process_stats_command(command, &mut tracker, &settings).await,
        Commands::Category { command } => process_category_command(command, &mut tracker).await,
        Commands::Config(_) => Ok(()),
    }
}

pub async fn open_tracker(app_dir: &Path, settings: &Settings) -> Result<CliTracker> {
    let storage = JsonStorage::new(app_dir.to_path_buf())?;
    Tracker::open(
        storage,
        Calendar::new(Local, settings.week_start),
        Box::new(DefaultClock),
        settings.freshness(),
    )
    .await
}
