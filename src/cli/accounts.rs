use comfy_table::{Cell, Table};

use crate::cli::Workspace;
use crate::error::Result;
use crate::ledger::{add_account, list_accounts};

pub fn add(name: &str, account_type: &str) -> Result<()> {
    let ws = Workspace::open()?;
    let budget = ws.active_budget()?;
    add_account(&ws.conn, budget.id, name, account_type)?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let ws = Workspace::open()?;
    let budget = ws.active_budget()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type"]);
    for account in list_accounts(&ws.conn, budget.id)? {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.name),
            Cell::new(account.account_type),
        ]);
    }
    println!("Accounts in {}\n{table}", budget.name);
    Ok(())
}
