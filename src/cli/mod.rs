pub mod accounts;
pub mod ai;
pub mod budgets;
pub mod categories;
pub mod demo;
pub mod init;
pub mod payees;
pub mod status;
pub mod voice;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{Result, TallyError};
use crate::ledger::get_budget;
use crate::models::Budget;
use crate::settings::{load_settings, Settings};

/// Loaded settings plus an open connection to the configured database.
pub(crate) struct Workspace {
    pub settings: Settings,
    pub conn: Connection,
}

impl Workspace {
    pub fn open() -> Result<Self> {
        let settings = load_settings();
        let db_path = settings.db_path();
        if !db_path.exists() {
            return Err(TallyError::Settings(format!(
                "no database at {}. Run `tally init` first.",
                db_path.display()
            )));
        }
        let conn = get_connection(&db_path)?;
        init_db(&conn)?;
        Ok(Self { settings, conn })
    }

    pub fn active_budget(&self) -> Result<Budget> {
        let id = self.settings.active_budget.ok_or(TallyError::NoActiveBudget)?;
        match get_budget(&self.conn, id) {
            Err(TallyError::UnknownBudget(_)) => Err(TallyError::NoActiveBudget),
            other => other,
        }
    }
}

#[derive(Parser)]
#[command(name = "tally", about = "Household budgeting from plain speech.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Tally: choose a data directory, create the database and a first budget.
    Init {
        /// Path for Tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Name recorded as the author of voice entries
        #[arg(long = "user")]
        user_name: Option<String>,
    },
    /// Manage budgets.
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
    /// Manage accounts in the active budget.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage categories in the active budget.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage payees in the active budget.
    Payees {
        #[command(subcommand)]
        command: PayeesCommands,
    },
    /// Turn voice entry on or off.
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
    /// Record transactions from a spoken sentence.
    Parse {
        /// What was said, e.g. "Paid $45.50 to Costco from checking for groceries"
        transcript: String,
        /// Print the raw JSON outcome
        #[arg(long)]
        json: bool,
    },
    /// Answer the questions from an earlier `parse` and record the result.
    Clarify {
        /// Session token printed by `parse`
        #[arg(long)]
        session: String,
        /// INDEX:FIELD:ID, e.g. 0:category_id:12 (repeatable)
        #[arg(long = "answer", required = true)]
        answers: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete every transaction recorded by one voice batch.
    Undo {
        /// Batch id printed by `parse` or `history`
        batch_id: String,
        #[arg(long)]
        json: bool,
    },
    /// List recent voice batches.
    History {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Load a sample budget to try voice entry against.
    Demo,
    /// Show settings, active budget and counts.
    Status,
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a budget.
    Create {
        name: String,
        /// Skip the starter category template
        #[arg(long)]
        empty: bool,
    },
    /// List budgets.
    List,
    /// Make a budget the active one.
    Use { id: i64 },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add an account.
    Add {
        /// Account name, e.g. 'Main Checking'
        name: String,
        /// Account type: bank, credit_card, cash, savings
        #[arg(long = "type", default_value = "bank")]
        account_type: String,
    },
    /// List accounts.
    List,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        name: String,
        /// Category group, e.g. 'Everyday'
        #[arg(long)]
        group: Option<String>,
    },
    /// List categories.
    List,
    /// Create categories from a spoken request (needs `tally ai on`).
    Speak {
        /// What was said, e.g. "add pet food and vet under pets"
        transcript: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PayeesCommands {
    /// Add a payee.
    Add {
        name: String,
        /// Category to use when a transcript names this payee but no category
        #[arg(long)]
        category: Option<String>,
    },
    /// List payees.
    List,
}

#[derive(Subcommand)]
pub enum AiCommands {
    On,
    Off,
}
