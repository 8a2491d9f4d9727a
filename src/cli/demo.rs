use chrono::{Duration, Local};
use rusqlite::{Connection, OptionalExtension};

use crate::cli::Workspace;
use crate::error::Result;
use crate::ledger::{add_account, add_category, add_payee, create_budget};
use crate::settings::save_settings;

const BUDGET_NAME: &str = "Personal Budget";

const ACCOUNTS: &[(&str, &str)] = &[
    ("Main Checking", "bank"),
    ("Savings Account", "savings"),
    ("Chase Sapphire", "credit_card"),
    ("Amazon Card", "credit_card"),
    ("Capital One", "credit_card"),
    ("Cash Wallet", "cash"),
];

const CATEGORY_GROUPS: &[(&str, &[&str])] = &[
    ("Housing", &["Rent/Mortgage", "Utilities", "Internet", "Home Insurance"]),
    ("Transportation", &["Gas", "Car Payment", "Car Insurance", "Parking"]),
    ("Food & Dining", &["Groceries", "Restaurants", "Coffee"]),
    ("Personal", &["Clothing", "Health & Medical", "Haircut", "Subscriptions", "Gym"]),
    ("Entertainment & Fun", &["Entertainment", "Hobbies", "Travel", "Gifts"]),
    ("Savings Goals", &["Emergency Fund", "General Savings"]),
];

/// Payee name and the category a transcript falls back to when it names none.
const PAYEES: &[(&str, Option<&str>)] = &[
    ("Landlord", Some("Rent/Mortgage")),
    ("Electric Company", Some("Utilities")),
    ("Comcast Internet", Some("Internet")),
    ("Shell Gas", Some("Gas")),
    ("Chevron", Some("Gas")),
    ("Costco", Some("Groceries")),
    ("Safeway", Some("Groceries")),
    ("Trader Joes", Some("Groceries")),
    ("Chipotle", Some("Restaurants")),
    ("Starbucks", Some("Coffee")),
    ("Target", Some("Clothing")),
    ("Amazon", None),
    ("CVS Pharmacy", Some("Health & Medical")),
    ("Netflix", Some("Subscriptions")),
    ("Spotify", Some("Subscriptions")),
    ("Planet Fitness", Some("Gym")),
];

struct DemoTxn {
    days_ago: i64,
    kind: &'static str,
    account: &'static str,
    amount: f64,
    category: Option<&'static str>,
    payee: Option<&'static str>,
}

const TRANSACTIONS: &[DemoTxn] = &[
    DemoTxn { days_ago: 14, kind: "income", account: "Main Checking", amount: 2750.00, category: None, payee: None },
    DemoTxn { days_ago: 13, kind: "expense", account: "Main Checking", amount: -1800.00, category: Some("Rent/Mortgage"), payee: Some("Landlord") },
    DemoTxn { days_ago: 9, kind: "expense", account: "Chase Sapphire", amount: -132.48, category: Some("Groceries"), payee: Some("Costco") },
    DemoTxn { days_ago: 6, kind: "expense", account: "Capital One", amount: -41.20, category: Some("Gas"), payee: Some("Shell Gas") },
    DemoTxn { days_ago: 3, kind: "expense", account: "Cash Wallet", amount: -6.75, category: Some("Coffee"), payee: Some("Starbucks") },
    DemoTxn { days_ago: 1, kind: "expense", account: "Amazon Card", amount: -15.49, category: Some("Subscriptions"), payee: Some("Netflix") },
];

fn lookup(conn: &Connection, table: &str, budget_id: i64, name: &str) -> Result<i64> {
    let sql = format!("SELECT id FROM {table} WHERE budget_id = ?1 AND name = ?2");
    Ok(conn.query_row(&sql, rusqlite::params![budget_id, name], |r| r.get(0))?)
}

fn find_demo_budget(conn: &Connection) -> Result<Option<i64>> {
    Ok(conn
        .query_row("SELECT id FROM budgets WHERE name = ?1", [BUDGET_NAME], |r| r.get(0))
        .optional()?)
}

/// Creates the demo budget with its accounts, categories, payees and a few
/// recent transactions. Returns the new budget id.
pub(crate) fn insert_demo_data(conn: &Connection) -> Result<i64> {
    let budget_id = create_budget(conn, BUDGET_NAME, false)?;
    for (name, account_type) in ACCOUNTS {
        add_account(conn, budget_id, name, account_type)?;
    }
    for (group, names) in CATEGORY_GROUPS {
        for name in *names {
            add_category(conn, budget_id, name, Some(group))?;
        }
    }
    for (name, category) in PAYEES {
        let default_category = category
            .map(|c| lookup(conn, "categories", budget_id, c))
            .transpose()?;
        add_payee(conn, budget_id, name, default_category)?;
    }

    let today = Local::now().date_naive();
    for t in TRANSACTIONS {
        let account_id = lookup(conn, "accounts", budget_id, t.account)?;
        let category_id = t.category.map(|c| lookup(conn, "categories", budget_id, c)).transpose()?;
        let payee_id = t.payee.map(|p| lookup(conn, "payees", budget_id, p)).transpose()?;
        let date = (today - Duration::days(t.days_ago)).format("%Y-%m-%d").to_string();
        conn.execute(
            "INSERT INTO transactions (budget_id, account_id, kind, date, amount, category_id, payee_id, created_by) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'demo')",
            rusqlite::params![budget_id, account_id, t.kind, date, t.amount, category_id, payee_id],
        )?;
    }
    Ok(budget_id)
}

pub fn run() -> Result<()> {
    let ws = Workspace::open()?;
    let mut settings = ws.settings;

    let budget_id = match find_demo_budget(&ws.conn)? {
        Some(id) => {
            println!("Demo data already loaded (budget {id}: {BUDGET_NAME}).");
            id
        }
        None => {
            let id = insert_demo_data(&ws.conn)?;
            println!("Demo data loaded!");
            println!("  Budget:       {BUDGET_NAME} ({id})");
            println!("  Accounts:     {}", ACCOUNTS.len());
            println!("  Payees:       {}", PAYEES.len());
            println!("  Transactions: {}", TRANSACTIONS.len());
            id
        }
    };

    settings.active_budget = Some(budget_id);
    save_settings(&settings)?;

    println!();
    println!("Try these next:");
    println!("  tally ai on");
    println!("  tally parse \"Spent 12 dollars at Starbucks with cash\"");
    println!("  tally parse \"Moved 200 from main checking to savings\"");
    println!("  tally history");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::ledger::load_budget_view;

    #[test]
    fn test_demo_creates_data() {
        let (_dir, conn) = test_db();
        let budget_id = insert_demo_data(&conn).unwrap();
        let view = load_budget_view(&conn, budget_id).unwrap();

        let category_count: usize = CATEGORY_GROUPS.iter().map(|(_, c)| c.len()).sum();
        assert_eq!(view.accounts.len(), ACCOUNTS.len());
        assert_eq!(view.categories.len(), category_count);
        assert_eq!(view.payees.len(), PAYEES.len());

        let txns: i64 = conn
            .query_row("SELECT count(*) FROM transactions WHERE budget_id = ?1", [budget_id], |r| r.get(0))
            .unwrap();
        assert_eq!(txns, TRANSACTIONS.len() as i64);
    }

    #[test]
    fn test_demo_payee_defaults() {
        let (_dir, conn) = test_db();
        let budget_id = insert_demo_data(&conn).unwrap();
        let view = load_budget_view(&conn, budget_id).unwrap();

        let costco = view.payees.iter().find(|p| p.name == "Costco").unwrap();
        let groceries = view.category(costco.default_category_id.unwrap()).unwrap();
        assert_eq!(groceries.name, "Groceries");
        let amazon = view.payees.iter().find(|p| p.name == "Amazon").unwrap();
        assert!(amazon.default_category_id.is_none());
    }

    #[test]
    fn test_demo_budget_found_after_insert() {
        let (_dir, conn) = test_db();
        assert!(find_demo_budget(&conn).unwrap().is_none());
        let id = insert_demo_data(&conn).unwrap();
        assert_eq!(find_demo_budget(&conn).unwrap(), Some(id));
    }
}
