use anyhow::Result;
use clap::{CommandFactory, Subcommand};

use crate::store::entities::{Category, CategoryDraft, CategoryId};

use super::{Args, CliTracker};

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    #[command(about = "Create a category")]
    Add {
        name: String,
        #[arg(long, short, default_value = "#808080", help = "Display color as #RRGGBB")]
        color: String,
        #[arg(long, short, default_value = "")]
        icon: String,
        #[arg(long, short, default_value_t = 0, allow_negative_numbers = true)]
        order: i32,
    },
    #[command(about = "List categories in display order")]
    List,
    #[command(about = "Change a category")]
    Edit {
        id: u64,
        #[arg(long, short)]
        name: Option<String>,
        #[arg(long, short)]
        color: Option<String>,
        #[arg(long, short)]
        icon: Option<String>,
        #[arg(long, short, allow_negative_numbers = true)]
        order: Option<i32>,
    },
    #[command(about = "Delete a category. Its blocks become uncategorized")]
    Remove { id: u64 },
    #[command(about = "Put categories in the given order")]
    Reorder { ids: Vec<u64> },
}

pub async fn process_category_command(
    command: CategoryCommand,
    tracker: &mut CliTracker,
) -> Result<()> {
    match command {
        CategoryCommand::Add {
            name,
            color,
            icon,
            order,
        } => {
            validate_color(&color)?;
            let mut draft = CategoryDraft::new(name)
                .with_color(color)
                .with_sort_order(order);
            draft.icon = icon;
            let category = tracker.add_category(draft).await?;
            println!("Added {}", format_category(&category));
        }
        CategoryCommand::List => {
            for category in tracker.categories_ordered() {
                println!("{}", format_category(category));
            }
        }
        CategoryCommand::Edit {
            id,
            name,
            color,
            icon,
            order,
        } => {
            let id = CategoryId(id);
            let Some(existing) = tracker.category(id).cloned() else {
                return Err(invalid_value(format!("Category {id} doesn't exist")));
            };
            let mut draft = CategoryDraft::from(existing);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(color) = color {
                validate_color(&color)?;
                draft.color = color;
            }
            if let Some(icon) = icon {
                draft.icon = icon;
            }
            if let Some(order) = order {
                draft.sort_order = order;
            }
            let category = tracker.update_category(id, draft).await?;
            println!("Updated {}", format_category(&category));
        }
        CategoryCommand::Remove { id } => {
            let category = tracker.delete_category(CategoryId(id)).await?;
            println!("Removed {}", format_category(&category));
        }
        CategoryCommand::Reorder { ids } => {
            let ids = ids.into_iter().map(CategoryId).collect::<Vec<_>>();
            tracker.reorder_categories(&ids).await?;
            for category in tracker.categories_ordered() {
                println!("{}", format_category(category));
            }
        }
    }
    Ok(())
}

fn validate_color(color: &str) -> Result<()> {
    let probe = Category {
        id: CategoryId(0),
        name: String::new(),
        color: color.to_string(),
        icon: String::new(),
        sort_order: 0,
    };
    match probe.rgb() {
        Some(_) => Ok(()),
        None => Err(invalid_value(format!(
            "Color {color:?} should look like #RRGGBB"
        ))),
    }
}

fn invalid_value(message: String) -> anyhow::Error {
    Args::command()
        .error(clap::error::ErrorKind::ValueValidation, message)
        .into()
}

fn format_category(category: &Category) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        category.id.0, category.sort_order, category.color, category.icon, category.name
    )
}
