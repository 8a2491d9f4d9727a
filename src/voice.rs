//! The three operations exposed to callers: `parse`, `clarify`, `undo_batch`.
//!
//! Both the AI feature flag and the active budget are checked by the caller;
//! everything here receives the budget and actor explicitly.

use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

use crate::clarifier::{merge, Answer};
use crate::committer::{commit, commit_batch, undo, BatchResult, SessionClaim};
use crate::drafts::{build, Candidate, DraftField, DraftTransaction};
use crate::error::{Result, TallyError};
use crate::gateway::ModelGateway;
use crate::ledger::load_budget_view;
use crate::models::{Actor, LedgerEntry};
use crate::normalizer::{normalize, PayloadStatus};
use crate::prompt::system_prompt;
use crate::session::{ParseSession, SessionCodec};

pub const MAX_TRANSCRIPT_CHARS: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub transaction_index: usize,
    pub field: DraftField,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ok {
        transactions: Vec<LedgerEntry>,
        batch_id: String,
        summary: String,
    },
    NeedsClarification {
        session_token: String,
        questions: Vec<Question>,
    },
    Error {
        message: String,
    },
    Empty,
}

impl Outcome {
    fn committed(result: BatchResult) -> Self {
        Self::Ok {
            summary: result.summary.to_string(),
            transactions: result.entries,
            batch_id: result.batch_id,
        }
    }

    fn failed(err: &TallyError) -> Self {
        tracing::warn!(error = %err, "voice request failed");
        Self::Error {
            message: err.user_message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UndoOutcome {
    pub status: &'static str,
    pub deleted: usize,
}

/// Trims the transcript and refuses empty or oversized input.
pub(crate) fn validate_transcript(transcript: &str) -> Result<&str> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(TallyError::InvalidTranscript("nothing was said".into()));
    }
    if transcript.chars().count() > MAX_TRANSCRIPT_CHARS {
        return Err(TallyError::InvalidTranscript(format!(
            "keep it under {MAX_TRANSCRIPT_CHARS} characters"
        )));
    }
    Ok(transcript)
}

fn questions(drafts: &[DraftTransaction]) -> Vec<Question> {
    drafts
        .iter()
        .enumerate()
        .flat_map(|(i, d)| {
            d.questions.iter().map(move |q| Question {
                transaction_index: i,
                field: q.field,
                candidates: q.candidates.clone(),
            })
        })
        .collect()
}

pub struct VoiceService<G> {
    gateway: G,
    codec: SessionCodec,
}

impl<G: ModelGateway> VoiceService<G> {
    pub fn new(gateway: G, codec: SessionCodec) -> Self {
        Self { gateway, codec }
    }

    pub fn parse(&self, conn: &mut Connection, transcript: &str, budget_id: i64, actor: &Actor) -> Outcome {
        let today = Local::now().date_naive();
        self.parse_on(conn, transcript, budget_id, actor, today)
            .unwrap_or_else(|e| Outcome::failed(&e))
    }

    fn parse_on(
        &self,
        conn: &mut Connection,
        transcript: &str,
        budget_id: i64,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<Outcome> {
        let transcript = validate_transcript(transcript)?;
        let view = load_budget_view(conn, budget_id)?;
        let raw = self
            .gateway
            .complete(&system_prompt(&view, today), transcript)
            .ok_or(TallyError::GatewayUnavailable)?;
        let payload = normalize(&raw).ok_or(TallyError::MalformedResponse)?;

        match payload.status {
            PayloadStatus::Empty => return Ok(Outcome::Empty),
            PayloadStatus::Error => {
                tracing::info!(model_message = ?payload.message, "model declined transcript");
                return Err(TallyError::InvalidTranscript(
                    "no transactions could be recognized".into(),
                ));
            }
            PayloadStatus::Ok | PayloadStatus::NeedsClarification => {}
        }
        if payload.transactions.is_empty() {
            return Ok(Outcome::Empty);
        }

        let drafts = build(&payload, &view, today)?;
        if drafts.iter().all(DraftTransaction::is_complete) {
            return Ok(Outcome::committed(commit(conn, &drafts, budget_id, actor)?));
        }

        let session = ParseSession::new(budget_id, drafts);
        let questions = questions(&session.drafts);
        let session_token = self.codec.encode(&session)?;
        tracing::info!(budget_id, open = questions.len(), "parse needs clarification");
        Ok(Outcome::NeedsClarification {
            session_token,
            questions,
        })
    }

    pub fn clarify(
        &self,
        conn: &mut Connection,
        session_token: &str,
        answers: &[Answer],
        budget_id: i64,
        actor: &Actor,
    ) -> Outcome {
        self.apply_answers(conn, session_token, answers, budget_id, actor)
            .unwrap_or_else(|e| Outcome::failed(&e))
    }

    fn apply_answers(
        &self,
        conn: &mut Connection,
        session_token: &str,
        answers: &[Answer],
        budget_id: i64,
        actor: &Actor,
    ) -> Result<Outcome> {
        let session = self.codec.decode(session_token, budget_id)?;
        let drafts = merge(&session, answers)?;
        let claim = SessionClaim {
            session_id: session.session_id,
            keep_for: self.codec.replay_window(),
        };
        let result = commit_batch(conn, &drafts, budget_id, actor, Some(claim))?;
        Ok(Outcome::committed(result))
    }
}

pub fn undo_batch(conn: &mut Connection, batch_id: &str, budget_id: i64) -> Result<UndoOutcome> {
    let deleted = undo(conn, batch_id.trim(), budget_id)?;
    Ok(UndoOutcome { status: "ok", deleted })
}
