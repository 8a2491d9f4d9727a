use comfy_table::{Cell, Table};

use crate::cli::Workspace;
use crate::error::Result;
use crate::ledger::{create_budget, get_budget, list_budgets};
use crate::settings::save_settings;

pub fn create(name: &str, empty: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let id = create_budget(&ws.conn, name, !empty)?;
    println!("Created budget {id}: {name}");
    if ws.settings.active_budget.is_none() {
        let mut settings = ws.settings;
        settings.active_budget = Some(id);
        save_settings(&settings)?;
        println!("Now using budget {id}.");
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let ws = Workspace::open()?;
    let mut table = Table::new();
    table.set_header(vec!["", "ID", "Name"]);
    for budget in list_budgets(&ws.conn)? {
        let marker = if ws.settings.active_budget == Some(budget.id) { "*" } else { "" };
        table.add_row(vec![Cell::new(marker), Cell::new(budget.id), Cell::new(budget.name)]);
    }
    println!("Budgets\n{table}");
    Ok(())
}

pub fn use_budget(id: i64) -> Result<()> {
    let ws = Workspace::open()?;
    let budget = get_budget(&ws.conn, id)?;
    let mut settings = ws.settings;
    settings.active_budget = Some(budget.id);
    save_settings(&settings)?;
    println!("Now using budget {}: {}", budget.id, budget.name);
    Ok(())
}
