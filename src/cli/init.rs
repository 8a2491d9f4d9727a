use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::ledger::{create_budget, list_budgets};
use crate::session::generate_secret;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path};

const FIRST_BUDGET: &str = "My Budget";

pub fn run(data_dir: Option<String>, user_name: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    let first_run = !settings_file_exists();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(name) = user_name {
        settings.user_name = name;
    }
    if settings.session.secret.is_empty() {
        settings.session.secret = generate_secret();
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    if list_budgets(&conn)?.is_empty() {
        let id = create_budget(&conn, FIRST_BUDGET, true)?;
        settings.active_budget = Some(id);
        println!("Created budget '{FIRST_BUDGET}' with starter categories.");
    }

    save_settings(&settings)?;
    tracing::info!(data_dir = %resolved.display(), first_run, "initialized");
    println!("Initialized tally at {}", resolved.display());
    if !settings.ai_enabled {
        println!("Voice entry is off. Run `tally ai on` to enable it.");
    }
    Ok(())
}
