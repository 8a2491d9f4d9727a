mod clarifier;
mod cli;
mod committer;
mod db;
mod drafts;
mod error;
mod fmt;
mod gateway;
mod ledger;
mod matcher;
mod models;
mod normalizer;
mod prompt;
mod session;
mod settings;
mod voice;
mod voice_categories;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{AccountsCommands, AiCommands, BudgetCommands, CategoriesCommands, Cli, Commands, PayeesCommands};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tally=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        None | Some(Commands::Status) => cli::status::run(),
        Some(Commands::Init { data_dir, user_name }) => cli::init::run(data_dir, user_name),
        Some(Commands::Budget { command }) => match command {
            BudgetCommands::Create { name, empty } => cli::budgets::create(&name, empty),
            BudgetCommands::List => cli::budgets::list(),
            BudgetCommands::Use { id } => cli::budgets::use_budget(id),
        },
        Some(Commands::Accounts { command }) => match command {
            AccountsCommands::Add { name, account_type } => cli::accounts::add(&name, &account_type),
            AccountsCommands::List => cli::accounts::list(),
        },
        Some(Commands::Categories { command }) => match command {
            CategoriesCommands::Add { name, group } => cli::categories::add(&name, group.as_deref()),
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::Speak { transcript, json } => cli::categories::speak(&transcript, json),
        },
        Some(Commands::Payees { command }) => match command {
            PayeesCommands::Add { name, category } => cli::payees::add(&name, category.as_deref()),
            PayeesCommands::List => cli::payees::list(),
        },
        Some(Commands::Ai { command }) => cli::ai::set_enabled(matches!(command, AiCommands::On)),
        Some(Commands::Parse { transcript, json }) => cli::voice::parse(&transcript, json),
        Some(Commands::Clarify { session, answers, json }) => cli::voice::clarify(&session, &answers, json),
        Some(Commands::Undo { batch_id, json }) => cli::voice::undo(&batch_id, json),
        Some(Commands::History { limit }) => cli::voice::history(limit),
        Some(Commands::Demo) => cli::demo::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
