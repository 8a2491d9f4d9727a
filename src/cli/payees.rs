use comfy_table::{Cell, Table};

use crate::cli::Workspace;
use crate::error::Result;
use crate::ledger::{add_payee, find_category_id, list_categories, list_payees};

pub fn add(name: &str, category: Option<&str>) -> Result<()> {
    let ws = Workspace::open()?;
    let budget = ws.active_budget()?;
    let default_category = category
        .map(|c| find_category_id(&ws.conn, budget.id, c))
        .transpose()?;
    add_payee(&ws.conn, budget.id, name, default_category)?;
    println!("Added payee: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let ws = Workspace::open()?;
    let budget = ws.active_budget()?;
    let categories = list_categories(&ws.conn, budget.id)?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Default Category"]);
    for payee in list_payees(&ws.conn, budget.id)? {
        let default = payee
            .default_category_id
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| c.name.clone())
            .unwrap_or_default();
        table.add_row(vec![Cell::new(payee.id), Cell::new(payee.name), Cell::new(default)]);
    }
    println!("Payees in {}\n{table}", budget.name);
    Ok(())
}
