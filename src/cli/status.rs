use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::ledger::get_budget;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("User:        {}", settings.actor_name());
    println!("Data dir:    {}", settings.data_dir);
    println!("Database:    {}", db_path.display());
    println!("Voice entry: {}", if settings.ai_enabled { "on" } else { "off" });
    println!("Model:       {} (key from ${})", settings.model.model, settings.model.api_key_env);

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `tally init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:     {}", format_bytes(size));
    let conn = get_connection(&db_path)?;

    let Some(budget_id) = settings.active_budget else {
        println!("Budget:      (none selected)");
        return Ok(());
    };
    let budget = get_budget(&conn, budget_id)?;
    let count = |table: &str| -> Result<i64> {
        let sql = format!("SELECT count(*) FROM {table} WHERE budget_id = ?1");
        Ok(conn.query_row(&sql, [budget_id], |r| r.get(0))?)
    };
    let batches: i64 = conn.query_row(
        "SELECT count(DISTINCT batch_id) FROM transactions WHERE budget_id = ?1",
        [budget_id],
        |r| r.get(0),
    )?;

    println!("Budget:      {} ({})", budget.name, budget.id);
    println!();
    println!("Accounts:      {}", count("accounts")?);
    println!("Categories:    {}", count("categories")?);
    println!("Payees:        {}", count("payees")?);
    println!("Transactions:  {}", count("transactions")?);
    println!("Voice batches: {batches}");
    Ok(())
}
