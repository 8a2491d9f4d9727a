use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TallyError};
use crate::matcher::{resolve, Resolution};
use crate::models::{BudgetView, TransactionKind};
use crate::normalizer::{ModelPayload, RawItem};

pub const MAX_CANDIDATES: usize = 20;

/// The fields a clarification can fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    AccountId,
    CategoryId,
    ToAccountId,
}

impl DraftField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountId => "account_id",
            Self::CategoryId => "category_id",
            Self::ToAccountId => "to_account_id",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "account_id" | "accountId" => Some(Self::AccountId),
            "category_id" | "categoryId" => Some(Self::CategoryId),
            "to_account_id" | "toAccountId" => Some(Self::ToAccountId),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub field: DraftField,
    pub candidates: Vec<Candidate>,
}

impl OpenQuestion {
    pub fn offers(&self, id: i64) -> bool {
        self.candidates.iter().any(|c| c.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PayeeRef {
    None,
    Existing(i64),
    /// Created at commit time.
    New(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftTransaction {
    pub kind: TransactionKind,
    /// Income positive, expense negative, transfer the positive magnitude moved.
    pub amount: Decimal,
    pub date: NaiveDate,
    pub memo: Option<String>,
    pub account_id: Option<i64>,
    pub to_account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub payee: PayeeRef,
    #[serde(default)]
    pub questions: Vec<OpenQuestion>,
}

impl DraftTransaction {
    pub fn is_complete(&self) -> bool {
        self.questions.is_empty()
            && self.account_id.is_some()
            && (self.kind != TransactionKind::Transfer || self.to_account_id.is_some())
    }

    pub fn question(&self, field: DraftField) -> Option<&OpenQuestion> {
        self.questions.iter().find(|q| q.field == field)
    }

    pub fn set(&mut self, field: DraftField, id: i64) {
        match field {
            DraftField::AccountId => self.account_id = Some(id),
            DraftField::CategoryId => self.category_id = Some(id),
            DraftField::ToAccountId => self.to_account_id = Some(id),
        }
        self.questions.retain(|q| q.field != field);
    }
}

enum Slot {
    Set(i64),
    Ask(Vec<i64>),
    Empty,
}

fn invalid(index: usize, reason: &str) -> TallyError {
    TallyError::InvalidTranscript(format!("transaction {}: {reason}", index + 1))
}

pub fn parse_amount(raw: &Value) -> Option<Decimal> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.replace(['$', ',', ' '], ""),
        _ => return None,
    };
    Decimal::from_str(&text).ok()
}

fn plausible_payee(name: &str) -> bool {
    let len = name.chars().count();
    (2..=60).contains(&len) && name.chars().any(char::is_alphabetic)
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn account_slot(view: &BudgetView, name: Option<&str>, exclude: Option<i64>) -> Slot {
    let others: Vec<i64> = view
        .accounts
        .iter()
        .map(|a| a.id)
        .filter(|id| Some(*id) != exclude)
        .collect();
    let Some(name) = name else {
        return match others.as_slice() {
            [only] => Slot::Set(*only),
            _ => Slot::Ask(others),
        };
    };
    match resolve(name, view.accounts.iter().map(|a| (a.id, a.name.as_str()))) {
        Resolution::Resolved(id) => Slot::Set(id),
        Resolution::Ambiguous(ids) => {
            let ids: Vec<i64> = ids.into_iter().filter(|id| Some(*id) != exclude).collect();
            match ids.as_slice() {
                [only] => Slot::Set(*only),
                [] => Slot::Ask(others),
                _ => Slot::Ask(ids),
            }
        }
        Resolution::NotFound => Slot::Ask(others),
    }
}

fn category_slot(view: &BudgetView, name: Option<&str>, payee: &PayeeRef) -> Slot {
    let Some(name) = name else {
        return match payee {
            PayeeRef::Existing(id) => view
                .payee(*id)
                .and_then(|p| p.default_category_id)
                .filter(|c| view.category(*c).is_some())
                .map_or(Slot::Empty, Slot::Set),
            _ => Slot::Empty,
        };
    };
    match resolve(name, view.categories.iter().map(|c| (c.id, c.name.as_str()))) {
        Resolution::Resolved(id) => Slot::Set(id),
        Resolution::Ambiguous(ids) => Slot::Ask(ids),
        Resolution::NotFound if view.categories.is_empty() => Slot::Empty,
        Resolution::NotFound => Slot::Ask(view.categories.iter().map(|c| c.id).collect()),
    }
}

fn payee_ref(view: &BudgetView, name: Option<&str>) -> PayeeRef {
    let Some(name) = name.filter(|n| plausible_payee(n)) else {
        return PayeeRef::None;
    };
    match resolve(name, view.payees.iter().map(|p| (p.id, p.name.as_str()))) {
        Resolution::Resolved(id) => PayeeRef::Existing(id),
        Resolution::Ambiguous(ids) => {
            tracing::debug!(payee = name, candidates = ?ids, "ambiguous payee left unlinked");
            PayeeRef::None
        }
        Resolution::NotFound => PayeeRef::New(name.to_string()),
    }
}

fn question(view: &BudgetView, field: DraftField, ids: &[i64]) -> OpenQuestion {
    let candidates = ids
        .iter()
        .take(MAX_CANDIDATES)
        .filter_map(|id| {
            let name = match field {
                DraftField::CategoryId => view.category(*id).map(|c| c.name.clone()),
                _ => view.account(*id).map(|a| a.name.clone()),
            };
            name.map(|name| Candidate { id: *id, name })
        })
        .collect();
    OpenQuestion { field, candidates }
}

fn build_one(index: usize, item: &RawItem, view: &BudgetView, today: NaiveDate) -> Result<DraftTransaction> {
    let kind = item
        .kind
        .as_deref()
        .and_then(TransactionKind::parse)
        .ok_or_else(|| invalid(index, "unknown transaction type"))?;

    let magnitude = item
        .amount
        .as_ref()
        .and_then(parse_amount)
        .map(|a| a.abs().round_dp(2))
        .filter(|a| !a.is_zero())
        .ok_or_else(|| invalid(index, "missing amount"))?;
    let amount = match kind {
        TransactionKind::Expense => -magnitude,
        TransactionKind::Income | TransactionKind::Transfer => magnitude,
    };

    let date = non_empty(&item.date)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or(today);

    let mut draft = DraftTransaction {
        kind,
        amount,
        date,
        memo: non_empty(&item.memo).map(str::to_string),
        account_id: None,
        to_account_id: None,
        category_id: None,
        payee: PayeeRef::None,
        questions: Vec::new(),
    };

    let mut slots = vec![(DraftField::AccountId, account_slot(view, non_empty(&item.account), None))];

    if kind == TransactionKind::Transfer {
        let source = match slots[0].1 {
            Slot::Set(id) => Some(id),
            _ => None,
        };
        let dest = account_slot(view, non_empty(&item.to_account), source);
        if let (Some(from), Slot::Set(to)) = (source, &dest) {
            if from == *to {
                return Err(invalid(index, "transfer source and destination are the same account"));
            }
        }
        slots.push((DraftField::ToAccountId, dest));
    } else {
        draft.payee = payee_ref(view, non_empty(&item.payee));
        slots.push((
            DraftField::CategoryId,
            category_slot(view, non_empty(&item.category), &draft.payee),
        ));
    }

    for (field, slot) in slots {
        match slot {
            Slot::Set(id) => draft.set(field, id),
            Slot::Ask(ids) => {
                let q = question(view, field, &ids);
                if q.candidates.is_empty() {
                    return Err(invalid(index, "budget has no accounts to choose from"));
                }
                draft.questions.push(q);
            }
            Slot::Empty => {}
        }
    }
    Ok(draft)
}

/// Builds drafts in transcript order. That order is the index space answers
/// refer to later.
pub fn build(payload: &ModelPayload, view: &BudgetView, today: NaiveDate) -> Result<Vec<DraftTransaction>> {
    payload
        .transactions
        .iter()
        .enumerate()
        .map(|(i, item)| build_one(i, item, view, today))
        .collect()
}
