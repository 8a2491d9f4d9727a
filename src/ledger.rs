use rusqlite::{Connection, OptionalExtension};

use crate::db::STARTER_CATEGORIES;
use crate::error::{Result, TallyError};
use crate::models::{Account, Budget, BudgetView, Category, Payee};

pub struct BatchRow {
    pub batch_id: String,
    pub entries: i64,
    pub created_at: String,
}

pub fn create_budget(conn: &Connection, name: &str, use_template: bool) -> Result<i64> {
    conn.execute("INSERT INTO budgets (name) VALUES (?1)", [name])?;
    let budget_id = conn.last_insert_rowid();
    if use_template {
        for (group, category) in STARTER_CATEGORIES {
            add_category(conn, budget_id, category, Some(group))?;
        }
    }
    Ok(budget_id)
}

pub fn get_budget(conn: &Connection, budget_id: i64) -> Result<Budget> {
    conn.query_row(
        "SELECT id, name FROM budgets WHERE id = ?1",
        [budget_id],
        |row| Ok(Budget { id: row.get(0)?, name: row.get(1)? }),
    )
    .optional()?
    .ok_or(TallyError::UnknownBudget(budget_id))
}

pub fn list_budgets(conn: &Connection) -> Result<Vec<Budget>> {
    let mut stmt = conn.prepare("SELECT id, name FROM budgets ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| Ok(Budget { id: row.get(0)?, name: row.get(1)? }))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn add_account(conn: &Connection, budget_id: i64, name: &str, account_type: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (budget_id, name, account_type) VALUES (?1, ?2, ?3)",
        rusqlite::params![budget_id, name, account_type],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_accounts(conn: &Connection, budget_id: i64) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, account_type FROM accounts WHERE budget_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([budget_id], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                account_type: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn add_category(conn: &Connection, budget_id: i64, name: &str, group_name: Option<&str>) -> Result<i64> {
    conn.execute(
        "INSERT INTO categories (budget_id, name, group_name) VALUES (?1, ?2, ?3)",
        rusqlite::params![budget_id, name, group_name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_categories(conn: &Connection, budget_id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, group_name FROM categories \
         WHERE budget_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([budget_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                group_name: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_category_id(conn: &Connection, budget_id: i64, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM categories WHERE budget_id = ?1 AND name = ?2 COLLATE NOCASE",
        rusqlite::params![budget_id, name],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| TallyError::UnknownCategory(name.to_string()))
}

pub fn add_payee(
    conn: &Connection,
    budget_id: i64,
    name: &str,
    default_category_id: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO payees (budget_id, name, default_category_id) VALUES (?1, ?2, ?3)",
        rusqlite::params![budget_id, name, default_category_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_payees(conn: &Connection, budget_id: i64) -> Result<Vec<Payee>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, default_category_id FROM payees WHERE budget_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([budget_id], |row| {
            Ok(Payee {
                id: row.get(0)?,
                name: row.get(1)?,
                default_category_id: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn load_budget_view(conn: &Connection, budget_id: i64) -> Result<BudgetView> {
    get_budget(conn, budget_id)?;
    Ok(BudgetView {
        budget_id,
        accounts: list_accounts(conn, budget_id)?,
        categories: list_categories(conn, budget_id)?,
        payees: list_payees(conn, budget_id)?,
    })
}

/// Most recent voice batches for a budget, newest first.
pub fn list_batches(conn: &Connection, budget_id: i64, limit: usize) -> Result<Vec<BatchRow>> {
    let mut stmt = conn.prepare(
        "SELECT batch_id, count(*), min(created_at) FROM transactions \
         WHERE budget_id = ?1 AND batch_id IS NOT NULL \
         GROUP BY batch_id ORDER BY min(id) DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![budget_id, limit as i64], |row| {
            Ok(BatchRow {
                batch_id: row.get(0)?,
                entries: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
