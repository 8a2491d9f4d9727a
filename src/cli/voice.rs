use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::clarifier::Answer;
use crate::cli::Workspace;
use crate::drafts::DraftField;
use crate::error::{Result, TallyError};
use crate::fmt::money;
use crate::gateway::AnthropicGateway;
use crate::ledger::{list_batches, load_budget_view};
use crate::models::{Actor, Budget, BudgetView, LedgerEntry};
use crate::session::SessionCodec;
use crate::voice::{undo_batch, Outcome, VoiceService};

/// Checks the preconditions every voice operation shares.
pub(crate) fn voice_workspace() -> Result<(Workspace, Budget)> {
    let ws = Workspace::open()?;
    if !ws.settings.ai_enabled {
        return Err(TallyError::AiDisabled);
    }
    let budget = ws.active_budget()?;
    Ok((ws, budget))
}

fn service(ws: &Workspace) -> Result<VoiceService<AnthropicGateway>> {
    let gateway = AnthropicGateway::from_settings(&ws.settings.model)?;
    let codec = SessionCodec::from_hex(&ws.settings.session.secret, ws.settings.session.max_age_secs)?;
    Ok(VoiceService::new(gateway, codec))
}

pub fn parse(transcript: &str, json: bool) -> Result<()> {
    let (mut ws, budget) = voice_workspace()?;
    let actor = Actor { name: ws.settings.actor_name() };
    let outcome = service(&ws)?.parse(&mut ws.conn, transcript, budget.id, &actor);
    report(&ws, &budget, &outcome, json)
}

pub fn clarify(session_token: &str, raw_answers: &[String], json: bool) -> Result<()> {
    let (mut ws, budget) = voice_workspace()?;
    let answers = raw_answers
        .iter()
        .map(|a| parse_answer(a))
        .collect::<Result<Vec<_>>>()?;
    let actor = Actor { name: ws.settings.actor_name() };
    let outcome = service(&ws)?.clarify(&mut ws.conn, session_token, &answers, budget.id, &actor);
    report(&ws, &budget, &outcome, json)
}

pub fn undo(batch_id: &str, json: bool) -> Result<()> {
    let (mut ws, budget) = voice_workspace()?;
    let outcome = undo_batch(&mut ws.conn, batch_id, budget.id)?;
    if json {
        print_json(&outcome)?;
    } else if outcome.deleted == 0 {
        println!("Nothing to undo for batch {batch_id}.");
    } else {
        println!("Removed {} transaction(s) from batch {batch_id}.", outcome.deleted);
    }
    Ok(())
}

pub fn history(limit: usize) -> Result<()> {
    let ws = Workspace::open()?;
    let budget = ws.active_budget()?;
    let mut table = Table::new();
    table.set_header(vec!["Batch", "Entries", "Recorded"]);
    for row in list_batches(&ws.conn, budget.id, limit)? {
        table.add_row(vec![Cell::new(row.batch_id), Cell::new(row.entries), Cell::new(row.created_at)]);
    }
    println!("Voice batches in {}\n{table}", budget.name);
    Ok(())
}

/// Parses `INDEX:FIELD:ID`, e.g. `0:category_id:12`.
fn parse_answer(raw: &str) -> Result<Answer> {
    let invalid = || TallyError::AnswerInvalid(format!("'{raw}' is not INDEX:FIELD:ID"));
    let mut parts = raw.trim().splitn(3, ':');
    let (Some(index), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    Ok(Answer {
        transaction_index: index.trim().parse().map_err(|_| invalid())?,
        field: DraftField::parse(field.trim()).ok_or_else(invalid)?,
        value: value.trim().parse().map_err(|_| invalid())?,
    })
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(ws: &Workspace, budget: &Budget, outcome: &Outcome, json: bool) -> Result<()> {
    if json {
        print_json(outcome)?;
    } else {
        render(ws, budget, outcome)?;
    }
    if matches!(outcome, Outcome::Error { .. }) {
        std::process::exit(1);
    }
    Ok(())
}

fn render(ws: &Workspace, budget: &Budget, outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Ok { transactions, batch_id, summary } => {
            // Reloaded so payees created by this batch have names.
            let view = load_budget_view(&ws.conn, budget.id)?;
            println!("{} {summary}", "Recorded".green().bold());
            println!("{}", entries_table(&view, transactions));
            println!("Batch {batch_id}  (undo with `tally undo {batch_id}`)");
        }
        Outcome::NeedsClarification { session_token, questions } => {
            println!("{}", "A few details are missing:".yellow().bold());
            for q in questions {
                println!("  Transaction {} needs {}:", q.transaction_index, q.field.as_str());
                for c in &q.candidates {
                    println!("    {:>5}  {}", c.id, c.name);
                }
            }
            println!();
            println!("Answer with:");
            println!("  tally clarify --session {session_token} --answer INDEX:FIELD:ID");
        }
        Outcome::Error { message } => eprintln!("{} {message}", "Error:".red().bold()),
        Outcome::Empty => println!("Nothing to record."),
    }
    Ok(())
}

fn entries_table(view: &BudgetView, entries: &[LedgerEntry]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Type", "Account", "Amount", "Category", "Payee"]);
    for e in entries {
        let account = view.account(e.account_id).map(|a| a.name.clone()).unwrap_or_default();
        let category = e
            .category_id
            .and_then(|id| view.category(id))
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let payee = e
            .payee_id
            .and_then(|id| view.payee(id))
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let amount = money(e.amount);
        let amount = if e.amount < 0.0 { amount.red() } else { amount.green() };
        table.add_row(vec![
            Cell::new(&e.date),
            Cell::new(e.kind.as_str()),
            Cell::new(account),
            Cell::new(amount),
            Cell::new(category),
            Cell::new(payee),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        let a = parse_answer("0:category_id:12").unwrap();
        assert_eq!(a.transaction_index, 0);
        assert_eq!(a.field, DraftField::CategoryId);
        assert_eq!(a.value, 12);
        let a = parse_answer(" 2 : to_account_id : 7 ").unwrap();
        assert_eq!(a.field, DraftField::ToAccountId);
        assert_eq!(a.value, 7);
    }

    #[test]
    fn test_parse_answer_rejects_garbage() {
        for raw in ["", "0", "0:category_id", "x:category_id:1", "0:payee:1", "0:account_id:abc"] {
            assert!(
                matches!(parse_answer(raw), Err(TallyError::AnswerInvalid(_))),
                "accepted {raw:?}"
            );
        }
    }
}
