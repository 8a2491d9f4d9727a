use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS budgets (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    budget_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    account_type TEXT NOT NULL DEFAULT 'bank',
    is_on_budget INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (budget_id) REFERENCES budgets(id)
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    budget_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    group_name TEXT,
    is_active INTEGER DEFAULT 1,
    FOREIGN KEY (budget_id) REFERENCES budgets(id)
);

CREATE TABLE IF NOT EXISTS payees (
    id INTEGER PRIMARY KEY,
    budget_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    default_category_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (budget_id) REFERENCES budgets(id),
    FOREIGN KEY (default_category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    budget_id INTEGER NOT NULL,
    account_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    date TEXT NOT NULL,
    amount REAL NOT NULL,
    memo TEXT,
    category_id INTEGER,
    payee_id INTEGER,
    transfer_pair_id INTEGER,
    batch_id TEXT,
    created_by TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (budget_id) REFERENCES budgets(id),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (payee_id) REFERENCES payees(id),
    FOREIGN KEY (transfer_pair_id) REFERENCES transactions(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_batch ON transactions(budget_id, batch_id);

CREATE TABLE IF NOT EXISTS consumed_sessions (
    session_id TEXT PRIMARY KEY,
    budget_id INTEGER NOT NULL,
    batch_id TEXT NOT NULL,
    consumed_at TEXT DEFAULT (datetime('now'))
);
";

// (group, name)
pub const STARTER_CATEGORIES: &[(&str, &str)] = &[
    ("Bills", "Rent/Mortgage"),
    ("Bills", "Utilities"),
    ("Bills", "Phone"),
    ("Bills", "Internet"),
    ("Bills", "Insurance"),
    ("Everyday", "Groceries"),
    ("Everyday", "Transportation"),
    ("Everyday", "Dining Out"),
    ("Everyday", "Entertainment"),
    ("Everyday", "Shopping"),
    ("Savings", "Emergency Fund"),
    ("Savings", "Vacation"),
    ("Savings", "Savings Goals"),
    ("Debt", "Credit Card"),
    ("Debt", "Student Loans"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
