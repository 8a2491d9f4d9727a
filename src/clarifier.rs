use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::drafts::{DraftField, DraftTransaction};
use crate::error::{Result, TallyError};
use crate::models::TransactionKind;
use crate::session::ParseSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub transaction_index: usize,
    pub field: DraftField,
    pub value: i64,
}

fn reject(msg: String) -> TallyError {
    TallyError::AnswerInvalid(msg)
}

/// Applies every answer or none of them. The session itself is left as is,
/// so a rejected answer set can be retried against the same token.
pub fn merge(session: &ParseSession, answers: &[Answer]) -> Result<Vec<DraftTransaction>> {
    let mut seen = HashSet::new();
    for a in answers {
        let i = a.transaction_index;
        let draft = session
            .drafts
            .get(i)
            .ok_or_else(|| reject(format!("no transaction at index {i}")))?;
        if !seen.insert((i, a.field)) {
            return Err(reject(format!("{} answered twice for index {i}", a.field.as_str())));
        }
        let question = draft
            .question(a.field)
            .ok_or_else(|| reject(format!("{} was not asked for index {i}", a.field.as_str())))?;
        if !question.offers(a.value) {
            return Err(reject(format!(
                "{} is not one of the choices for {} at index {i}",
                a.value,
                a.field.as_str()
            )));
        }
    }

    let mut drafts = session.drafts.clone();
    for a in answers {
        drafts[a.transaction_index].set(a.field, a.value);
    }

    for (i, draft) in drafts.iter_mut().enumerate() {
        if draft.kind != TransactionKind::Transfer {
            draft.questions.retain(|q| q.field != DraftField::CategoryId);
        }
        if let Some(q) = draft.questions.first() {
            return Err(reject(format!("{} still needs an answer at index {i}", q.field.as_str())));
        }
        if draft.kind == TransactionKind::Transfer && draft.account_id == draft.to_account_id {
            return Err(reject(format!("transfer at index {i} moves money to the same account")));
        }
        if !draft.is_complete() {
            return Err(reject(format!("transaction at index {i} is incomplete")));
        }
    }
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::{Candidate, OpenQuestion, PayeeRef};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn question(field: DraftField, ids: &[i64]) -> OpenQuestion {
        OpenQuestion {
            field,
            candidates: ids
                .iter()
                .map(|id| Candidate { id: *id, name: format!("#{id}") })
                .collect(),
        }
    }

    fn draft(kind: TransactionKind, questions: Vec<OpenQuestion>) -> DraftTransaction {
        DraftTransaction {
            kind,
            amount: Decimal::from(10),
            date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            memo: None,
            account_id: if questions.iter().any(|q| q.field == DraftField::AccountId) { None } else { Some(1) },
            to_account_id: None,
            category_id: None,
            payee: PayeeRef::None,
            questions,
        }
    }

    fn session() -> ParseSession {
        ParseSession::new(
            1,
            vec![
                draft(TransactionKind::Expense, vec![question(DraftField::CategoryId, &[11, 12])]),
                draft(
                    TransactionKind::Transfer,
                    vec![question(DraftField::ToAccountId, &[2, 3])],
                ),
                draft(TransactionKind::Income, vec![question(DraftField::AccountId, &[1, 2])]),
            ],
        )
    }

    fn answer(i: usize, field: DraftField, value: i64) -> Answer {
        Answer { transaction_index: i, field, value }
    }

    #[test]
    fn test_complete_answer_set() {
        let drafts = merge(
            &session(),
            &[
                answer(0, DraftField::CategoryId, 12),
                answer(1, DraftField::ToAccountId, 3),
                answer(2, DraftField::AccountId, 2),
            ],
        )
        .unwrap();
        assert_eq!(drafts[0].category_id, Some(12));
        assert_eq!(drafts[1].to_account_id, Some(3));
        assert_eq!(drafts[2].account_id, Some(2));
        assert!(drafts.iter().all(DraftTransaction::is_complete));
    }

    #[test]
    fn test_category_may_stay_unanswered() {
        let drafts = merge(
            &session(),
            &[answer(1, DraftField::ToAccountId, 2), answer(2, DraftField::AccountId, 1)],
        )
        .unwrap();
        assert!(drafts[0].category_id.is_none());
        assert!(drafts[0].is_complete());
    }

    #[test]
    fn test_missing_required_answer() {
        let err = merge(&session(), &[answer(1, DraftField::ToAccountId, 2)]).unwrap_err();
        assert!(matches!(err, TallyError::AnswerInvalid(_)));
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(merge(&session(), &[answer(9, DraftField::AccountId, 1)]).is_err());
    }

    #[test]
    fn test_field_not_asked() {
        let err = merge(&session(), &[answer(0, DraftField::AccountId, 1)]).unwrap_err();
        assert!(err.to_string().contains("was not asked"));
    }

    #[test]
    fn test_value_not_a_candidate() {
        let err = merge(&session(), &[answer(0, DraftField::CategoryId, 99)]).unwrap_err();
        assert!(err.to_string().contains("not one of the choices"));
    }

    #[test]
    fn test_duplicate_answer() {
        let err = merge(
            &session(),
            &[answer(0, DraftField::CategoryId, 11), answer(0, DraftField::CategoryId, 12)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_transfer_to_same_account_rejected() {
        let s = ParseSession::new(
            1,
            vec![draft(
                TransactionKind::Transfer,
                vec![
                    question(DraftField::AccountId, &[1, 2]),
                    question(DraftField::ToAccountId, &[1, 2]),
                ],
            )],
        );
        let err = merge(
            &s,
            &[answer(0, DraftField::AccountId, 2), answer(0, DraftField::ToAccountId, 2)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("same account"));
    }

    #[test]
    fn test_session_untouched_after_rejection() {
        let s = session();
        let before = s.clone();
        let _ = merge(&s, &[answer(0, DraftField::CategoryId, 11)]);
        assert_eq!(s, before);
    }
}
