use std::fmt;

use rusqlite::{Connection, OptionalExtension, Transaction};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::drafts::{DraftTransaction, PayeeRef};
use crate::error::{Result, SessionFault, TallyError};
use crate::models::{Actor, LedgerEntry, TransactionKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub income: usize,
    pub expense: usize,
    pub transfer: usize,
}

impl BatchSummary {
    fn count(&mut self, kind: TransactionKind) {
        match kind {
            TransactionKind::Income => self.income += 1,
            TransactionKind::Expense => self.expense += 1,
            TransactionKind::Transfer => self.transfer += 1,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            (self.income, "income", "incomes"),
            (self.expense, "expense", "expenses"),
            (self.transfer, "transfer", "transfers"),
        ]
        .iter()
        .filter(|(n, _, _)| *n > 0)
        .map(|(n, one, many)| format!("{n} {}", if *n == 1 { one } else { many }))
        .collect();
        if parts.is_empty() {
            f.write_str("nothing")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub created: usize,
    pub summary: BatchSummary,
    pub entries: Vec<LedgerEntry>,
}

fn failure(msg: impl Into<String>) -> TallyError {
    TallyError::CommitFailure(msg.into())
}

fn to_cents(amount: Decimal) -> Result<f64> {
    amount
        .round_dp(2)
        .to_f64()
        .ok_or_else(|| failure(format!("amount {amount} is out of range")))
}

fn owned_by(tx: &Transaction, table: &str, id: i64, budget_id: i64) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ?1 AND budget_id = ?2");
    Ok(tx.prepare(&sql)?.exists(rusqlite::params![id, budget_id])?)
}

fn resolve_payee(tx: &Transaction, payee: &PayeeRef, budget_id: i64) -> Result<Option<i64>> {
    match payee {
        PayeeRef::None => Ok(None),
        PayeeRef::Existing(id) => {
            if owned_by(tx, "payees", *id, budget_id)? {
                Ok(Some(*id))
            } else {
                Ok(None)
            }
        }
        PayeeRef::New(name) => {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM payees WHERE budget_id = ?1 AND name = ?2 COLLATE NOCASE",
                    rusqlite::params![budget_id, name],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok(Some(id));
            }
            tx.execute(
                "INSERT INTO payees (budget_id, name) VALUES (?1, ?2)",
                rusqlite::params![budget_id, name],
            )?;
            Ok(Some(tx.last_insert_rowid()))
        }
    }
}

struct NewEntry<'a> {
    kind: TransactionKind,
    account_id: i64,
    amount: f64,
    draft: &'a DraftTransaction,
    category_id: Option<i64>,
    payee_id: Option<i64>,
    transfer_pair_id: Option<i64>,
}

fn insert_entry(
    tx: &Transaction,
    budget_id: i64,
    batch_id: &str,
    actor: &Actor,
    e: &NewEntry,
) -> Result<LedgerEntry> {
    let date = e.draft.date.format("%Y-%m-%d").to_string();
    tx.execute(
        "INSERT INTO transactions (budget_id, account_id, kind, date, amount, memo, category_id, \
         payee_id, transfer_pair_id, batch_id, created_by) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            budget_id,
            e.account_id,
            e.kind.as_str(),
            date,
            e.amount,
            e.draft.memo,
            e.category_id,
            e.payee_id,
            e.transfer_pair_id,
            batch_id,
            actor.name,
        ],
    )?;
    Ok(LedgerEntry {
        id: tx.last_insert_rowid(),
        kind: e.kind,
        account_id: e.account_id,
        date,
        amount: e.amount,
        memo: e.draft.memo.clone(),
        category_id: e.category_id,
        payee_id: e.payee_id,
        transfer_pair_id: e.transfer_pair_id,
    })
}

fn write_draft(
    tx: &Transaction,
    index: usize,
    draft: &DraftTransaction,
    budget_id: i64,
    batch_id: &str,
    actor: &Actor,
) -> Result<Vec<LedgerEntry>> {
    if !draft.is_complete() {
        return Err(failure(format!("draft {index} is incomplete")));
    }
    let account_id = draft.account_id.unwrap_or_default();
    if !owned_by(tx, "accounts", account_id, budget_id)? {
        return Err(failure(format!("account {account_id} is not in this budget")));
    }

    if draft.kind == TransactionKind::Transfer {
        let to_account_id = draft.to_account_id.unwrap_or_default();
        if to_account_id == account_id {
            return Err(failure(format!("draft {index} transfers to its own account")));
        }
        if !owned_by(tx, "accounts", to_account_id, budget_id)? {
            return Err(failure(format!("account {to_account_id} is not in this budget")));
        }
        let magnitude = to_cents(draft.amount.abs())?;
        let mut source = insert_entry(tx, budget_id, batch_id, actor, &NewEntry {
            kind: TransactionKind::Transfer,
            account_id,
            amount: -magnitude,
            draft,
            category_id: None,
            payee_id: None,
            transfer_pair_id: None,
        })?;
        let dest = insert_entry(tx, budget_id, batch_id, actor, &NewEntry {
            kind: TransactionKind::Transfer,
            account_id: to_account_id,
            amount: magnitude,
            draft,
            category_id: None,
            payee_id: None,
            transfer_pair_id: Some(source.id),
        })?;
        tx.execute(
            "UPDATE transactions SET transfer_pair_id = ?1 WHERE id = ?2",
            rusqlite::params![dest.id, source.id],
        )?;
        source.transfer_pair_id = Some(dest.id);
        return Ok(vec![source, dest]);
    }

    if let Some(id) = draft.category_id {
        if !owned_by(tx, "categories", id, budget_id)? {
            return Err(failure(format!("category {id} is not in this budget")));
        }
    }
    let payee_id = resolve_payee(tx, &draft.payee, budget_id)?;
    let entry = insert_entry(tx, budget_id, batch_id, actor, &NewEntry {
        kind: draft.kind,
        account_id,
        amount: to_cents(draft.amount)?,
        draft,
        category_id: draft.category_id,
        payee_id,
        transfer_pair_id: None,
    })?;
    Ok(vec![entry])
}

pub fn commit(
    conn: &mut Connection,
    drafts: &[DraftTransaction],
    budget_id: i64,
    actor: &Actor,
) -> Result<BatchResult> {
    commit_batch(conn, drafts, budget_id, actor, None)
}

/// A session id to burn with the batch. Burned ids older than `keep_for` can
/// no longer be replayed (their token has expired) and are pruned.
#[derive(Debug, Clone, Copy)]
pub struct SessionClaim {
    pub session_id: Uuid,
    pub keep_for: chrono::Duration,
}

/// Writes the drafts under one fresh batch id, all or nothing. A claimed
/// session is burned in the same database transaction, so a replayed token
/// can never write a second batch.
pub fn commit_batch(
    conn: &mut Connection,
    drafts: &[DraftTransaction],
    budget_id: i64,
    actor: &Actor,
    claim: Option<SessionClaim>,
) -> Result<BatchResult> {
    if drafts.is_empty() {
        return Err(failure("nothing to commit"));
    }
    let batch_id = Uuid::new_v4().to_string();
    let tx = conn.transaction()?;

    let written: Result<(Vec<LedgerEntry>, BatchSummary)> = (|| {
        if let Some(claim) = claim {
            tx.execute(
                "DELETE FROM consumed_sessions WHERE consumed_at < datetime('now', ?1)",
                [format!("-{} seconds", claim.keep_for.num_seconds())],
            )?;
            let fresh = tx.execute(
                "INSERT OR IGNORE INTO consumed_sessions (session_id, budget_id, batch_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![claim.session_id.to_string(), budget_id, batch_id],
            )?;
            if fresh == 0 {
                return Err(TallyError::SessionInvalid(SessionFault::AlreadyUsed));
            }
        }
        let mut entries = Vec::new();
        let mut summary = BatchSummary::default();
        for (i, draft) in drafts.iter().enumerate() {
            entries.extend(write_draft(&tx, i, draft, budget_id, &batch_id, actor)?);
            summary.count(draft.kind);
        }
        Ok((entries, summary))
    })();

    let (entries, summary) = match written {
        Ok(done) => done,
        Err(e) => {
            // Dropping `tx` rolls everything back.
            tracing::error!(budget_id, batch_id = %batch_id, error = %e, "voice batch rolled back");
            return Err(match e {
                TallyError::Db(db) => failure(db.to_string()),
                other => other,
            });
        }
    };
    tx.commit().map_err(|e| failure(e.to_string()))?;

    tracing::info!(budget_id, batch_id = %batch_id, created = entries.len(), "voice batch committed");
    Ok(BatchResult {
        batch_id,
        created: entries.len(),
        summary,
        entries,
    })
}

/// Deletes every entry of a batch inside one budget. Unknown batches delete
/// nothing and are not an error.
pub fn undo(conn: &mut Connection, batch_id: &str, budget_id: i64) -> Result<usize> {
    let tx = conn.transaction()?;
    let deleted = tx.execute(
        "DELETE FROM transactions WHERE batch_id = ?1 AND budget_id = ?2",
        rusqlite::params![batch_id, budget_id],
    )?;
    tx.commit()?;
    tracing::info!(budget_id, batch_id, deleted, "voice batch undone");
    Ok(deleted)
}
