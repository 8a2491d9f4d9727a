use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::voice::{print_json, voice_workspace};
use crate::cli::Workspace;
use crate::error::Result;
use crate::gateway::AnthropicGateway;
use crate::ledger::{add_category, list_categories};
use crate::voice_categories::{self, CategoryOutcome};

pub fn add(name: &str, group: Option<&str>) -> Result<()> {
    let ws = Workspace::open()?;
    let budget = ws.active_budget()?;
    add_category(&ws.conn, budget.id, name, group)?;
    println!("Added category: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let ws = Workspace::open()?;
    let budget = ws.active_budget()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Group", "Name"]);
    for cat in list_categories(&ws.conn, budget.id)? {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.group_name.unwrap_or_default()),
            Cell::new(cat.name),
        ]);
    }
    println!("Categories in {}\n{table}", budget.name);
    Ok(())
}

pub fn speak(transcript: &str, json: bool) -> Result<()> {
    let (mut ws, budget) = voice_workspace()?;
    let gateway = AnthropicGateway::from_settings(&ws.settings.model)?;
    let outcome = voice_categories::speak(&gateway, &mut ws.conn, transcript, budget.id);
    if json {
        print_json(&outcome)?;
    } else {
        match &outcome {
            CategoryOutcome::Ok { created, skipped } => {
                for cat in created {
                    match &cat.group_name {
                        Some(group) => println!("{} {} ({group})", "Added".green(), cat.name),
                        None => println!("{} {}", "Added".green(), cat.name),
                    }
                }
                for name in skipped {
                    println!("{} {name}", "Skipped".yellow());
                }
            }
            CategoryOutcome::Empty => println!("No categories heard."),
            CategoryOutcome::Error { message } => eprintln!("{}", message.red()),
        }
    }
    if matches!(outcome, CategoryOutcome::Error { .. }) {
        std::process::exit(1);
    }
    Ok(())
}
