//! Creating categories by voice: "add Pet Food and Vet under Pets".
//!
//! Same guards as transaction entry (checked by the caller), one model call,
//! then every new category is inserted in a single database transaction.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{Result, TallyError};
use crate::gateway::ModelGateway;
use crate::ledger::{add_category, load_budget_view};
use crate::matcher::same_name;
use crate::models::Category;
use crate::normalizer::{normalize, PayloadStatus, RawCategory};
use crate::prompt::category_prompt;
use crate::voice::validate_transcript;

const MAX_NAME_CHARS: usize = 60;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryOutcome {
    Ok {
        created: Vec<Category>,
        /// Names that already existed or were not usable.
        skipped: Vec<String>,
    },
    Error {
        message: String,
    },
    Empty,
}

fn clean(raw: Option<&str>) -> Option<String> {
    let name = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

/// Existing group spelling wins over the model's.
fn group_for(raw: Option<&str>, existing: &[Category]) -> Option<String> {
    let group = clean(raw)?;
    existing
        .iter()
        .filter_map(|c| c.group_name.as_deref())
        .find(|g| same_name(g, &group))
        .map(str::to_string)
        .or(Some(group))
}

pub fn speak<G: ModelGateway>(gateway: &G, conn: &mut Connection, transcript: &str, budget_id: i64) -> CategoryOutcome {
    create_spoken(gateway, conn, transcript, budget_id).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "voice category request failed");
        CategoryOutcome::Error {
            message: e.user_message(),
        }
    })
}

fn create_spoken<G: ModelGateway>(
    gateway: &G,
    conn: &mut Connection,
    transcript: &str,
    budget_id: i64,
) -> Result<CategoryOutcome> {
    let transcript = validate_transcript(transcript)?;
    let view = load_budget_view(conn, budget_id)?;
    let raw = gateway
        .complete(&category_prompt(&view), transcript)
        .ok_or(TallyError::GatewayUnavailable)?;
    let payload = normalize(&raw).ok_or(TallyError::MalformedResponse)?;

    match payload.status {
        PayloadStatus::Empty => return Ok(CategoryOutcome::Empty),
        PayloadStatus::Error => {
            tracing::info!(model_message = ?payload.message, "model declined category request");
            return Err(TallyError::InvalidTranscript("no categories could be recognized".into()));
        }
        PayloadStatus::Ok | PayloadStatus::NeedsClarification => {}
    }
    if payload.categories.is_empty() {
        return Ok(CategoryOutcome::Empty);
    }

    let (wanted, skipped) = plan(&payload.categories, &view.categories);
    let tx = conn.transaction()?;
    let mut created = Vec::with_capacity(wanted.len());
    for (name, group) in wanted {
        let id = add_category(&tx, budget_id, &name, group.as_deref())?;
        created.push(Category { id, name, group_name: group });
    }
    tx.commit()?;

    tracing::info!(budget_id, created = created.len(), skipped = skipped.len(), "voice categories created");
    Ok(CategoryOutcome::Ok { created, skipped })
}

/// Splits the model's list into (name, group) pairs to insert and names to
/// skip: blanks, overlong names, and anything already in the budget or
/// earlier in the same list.
fn plan(raw: &[RawCategory], existing: &[Category]) -> (Vec<(String, Option<String>)>, Vec<String>) {
    let mut wanted: Vec<(String, Option<String>)> = Vec::new();
    let mut skipped = Vec::new();
    for item in raw {
        let Some(name) = clean(item.name.as_deref()) else {
            continue;
        };
        let taken = existing.iter().any(|c| same_name(&c.name, &name))
            || wanted.iter().any(|(w, _)| same_name(w, &name));
        if taken || name.chars().count() > MAX_NAME_CHARS {
            skipped.push(name);
            continue;
        }
        let group = group_for(item.group.as_deref(), existing);
        wanted.push((name, group));
    }
    (wanted, skipped)
}
