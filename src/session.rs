//! Stateless carry-over of drafts between `parse` and `clarify`.
//!
//! A token is `v2.<sealed>` where `sealed` is base64url of a random 96-bit
//! nonce followed by the AES-256-GCM ciphertext of the JSON session. The key
//! is SHA-256 of the configured secret and the version tag is bound as
//! associated data. Nothing inside is read until the tag verifies; then the
//! age is checked, then the budget.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::drafts::DraftTransaction;
use crate::error::{Result, SessionFault, TallyError};

const TOKEN_VERSION: &str = "v2";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const CLOCK_SKEW_SECS: i64 = 60;
pub const DEFAULT_MAX_AGE_SECS: i64 = 15 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseSession {
    pub session_id: Uuid,
    pub budget_id: i64,
    pub created_at: DateTime<Utc>,
    pub drafts: Vec<DraftTransaction>,
}

impl ParseSession {
    pub fn new(budget_id: i64, drafts: Vec<DraftTransaction>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            budget_id,
            created_at: Utc::now(),
            drafts,
        }
    }
}

/// A fresh 256-bit secret, hex encoded for the settings file.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct SessionCodec {
    cipher: Aes256Gcm,
    max_age: Duration,
}

fn refuse(fault: SessionFault) -> TallyError {
    TallyError::SessionInvalid(fault)
}

impl SessionCodec {
    pub fn new(secret: &[u8], max_age: Duration) -> Self {
        let key = Sha256::digest(secret);
        Self {
            cipher: Aes256Gcm::new(&key),
            max_age,
        }
    }

    pub fn from_hex(secret: &str, max_age_secs: i64) -> Result<Self> {
        let key = hex::decode(secret.trim())
            .map_err(|e| TallyError::Settings(format!("session secret is not hex: {e}")))?;
        if key.len() < 16 {
            return Err(TallyError::Settings("session secret is too short".into()));
        }
        Ok(Self::new(&key, Duration::seconds(max_age_secs)))
    }

    /// How long a consumed session id must be remembered to refuse replays.
    pub fn replay_window(&self) -> Duration {
        self.max_age + Duration::seconds(CLOCK_SKEW_SECS)
    }

    pub fn encode(&self, session: &ParseSession) -> Result<String> {
        let payload = serde_json::to_vec(session)?;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload { msg: &payload, aad: TOKEN_VERSION.as_bytes() },
            )
            .map_err(|_| TallyError::Settings("session could not be sealed".into()))?;

        let mut body = nonce.to_vec();
        body.extend_from_slice(&sealed);
        Ok(format!("{TOKEN_VERSION}.{}", URL_SAFE_NO_PAD.encode(body)))
    }

    pub fn decode(&self, token: &str, budget_id: i64) -> Result<ParseSession> {
        self.decode_at(token, budget_id, Utc::now())
    }

    pub fn decode_at(&self, token: &str, budget_id: i64, now: DateTime<Utc>) -> Result<ParseSession> {
        let (version, body) = token
            .trim()
            .split_once('.')
            .ok_or(refuse(SessionFault::Malformed))?;
        if version != TOKEN_VERSION {
            return Err(refuse(SessionFault::Malformed));
        }
        let body = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| refuse(SessionFault::Malformed))?;
        if body.len() < NONCE_LEN + TAG_LEN {
            return Err(refuse(SessionFault::Malformed));
        }
        let (nonce, sealed) = body.split_at(NONCE_LEN);
        let payload = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload { msg: sealed, aad: TOKEN_VERSION.as_bytes() },
            )
            .map_err(|_| refuse(SessionFault::Tampered))?;
        let session: ParseSession =
            serde_json::from_slice(&payload).map_err(|_| refuse(SessionFault::Malformed))?;

        let age = now - session.created_at;
        if age > self.max_age || age < -Duration::seconds(CLOCK_SKEW_SECS) {
            return Err(refuse(SessionFault::Expired));
        }
        if session.budget_id != budget_id {
            return Err(refuse(SessionFault::BudgetMismatch));
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::{Candidate, DraftField, OpenQuestion, PayeeRef};
    use crate::models::TransactionKind;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn codec() -> SessionCodec {
        SessionCodec::new(b"0123456789abcdef0123456789abcdef", Duration::seconds(DEFAULT_MAX_AGE_SECS))
    }

    fn session() -> ParseSession {
        ParseSession::new(
            7,
            vec![DraftTransaction {
                kind: TransactionKind::Expense,
                amount: Decimal::new(-1200, 2),
                date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
                memo: None,
                account_id: Some(1),
                to_account_id: None,
                category_id: None,
                payee: PayeeRef::New("Target".into()),
                questions: vec![OpenQuestion {
                    field: DraftField::CategoryId,
                    candidates: vec![
                        Candidate { id: 11, name: "Target Shopping".into() },
                        Candidate { id: 12, name: "Target Household".into() },
                    ],
                }],
            }],
        )
    }

    fn fault(result: Result<ParseSession>) -> SessionFault {
        match result {
            Err(TallyError::SessionInvalid(f)) => f,
            other => panic!("expected SessionInvalid, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_returns_same_session() {
        let s = session();
        let token = codec().encode(&s).unwrap();
        assert_eq!(codec().decode(&token, 7).unwrap(), s);
    }

    #[test]
    fn test_token_body_is_not_readable() {
        let mut s = session();
        s.drafts[0].memo = Some("secret memo".into());
        let token = codec().encode(&s).unwrap();
        let (version, body) = token.split_once('.').unwrap();
        assert_eq!(version, "v2");
        let raw = URL_SAFE_NO_PAD.decode(body).unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(&raw).is_err());
        assert!(serde_json::from_slice::<serde_json::Value>(&raw[NONCE_LEN..]).is_err());
        let text = String::from_utf8_lossy(&raw);
        assert!(!text.contains("secret memo"));
        assert!(!text.contains("Target"));
    }

    #[test]
    fn test_same_session_seals_differently() {
        let s = session();
        assert_ne!(codec().encode(&s).unwrap(), codec().encode(&s).unwrap());
    }

    #[test]
    fn test_truncated_body_refused() {
        let token = codec().encode(&session()).unwrap();
        let short = URL_SAFE_NO_PAD.encode([0u8; NONCE_LEN + TAG_LEN - 1]);
        assert_eq!(fault(codec().decode(&format!("v2.{short}"), 7)), SessionFault::Malformed);
        let mut body = URL_SAFE_NO_PAD.decode(&token[3..]).unwrap();
        body.truncate(body.len() - 1);
        let cut = format!("v2.{}", URL_SAFE_NO_PAD.encode(body));
        assert_eq!(fault(codec().decode(&cut, 7)), SessionFault::Tampered);
    }

    #[test]
    fn test_any_flipped_byte_is_refused() {
        let token = codec().encode(&session()).unwrap();
        let bytes = token.as_bytes();
        for i in 0..bytes.len() {
            let mut flipped = bytes.to_vec();
            flipped[i] ^= 0x01;
            let flipped = String::from_utf8(flipped).unwrap();
            assert!(
                matches!(codec().decode(&flipped, 7), Err(TallyError::SessionInvalid(_))),
                "byte {i} flip was accepted"
            );
        }
    }

    #[test]
    fn test_expired_token_refused() {
        let s = session();
        let token = codec().encode(&s).unwrap();
        let later = s.created_at + Duration::seconds(DEFAULT_MAX_AGE_SECS + 1);
        assert_eq!(fault(codec().decode_at(&token, 7, later)), SessionFault::Expired);
        let inside = s.created_at + Duration::seconds(DEFAULT_MAX_AGE_SECS - 1);
        assert!(codec().decode_at(&token, 7, inside).is_ok());
    }

    #[test]
    fn test_other_budget_refused() {
        let token = codec().encode(&session()).unwrap();
        assert_eq!(fault(codec().decode(&token, 8)), SessionFault::BudgetMismatch);
    }

    #[test]
    fn test_other_key_refused() {
        let token = codec().encode(&session()).unwrap();
        let other = SessionCodec::new(b"another-secret-key-of-some-length", Duration::minutes(15));
        assert_eq!(fault(other.decode(&token, 7)), SessionFault::Tampered);
    }

    #[test]
    fn test_garbage_refused() {
        assert_eq!(fault(codec().decode("", 7)), SessionFault::Malformed);
        assert_eq!(fault(codec().decode("not-a-token", 7)), SessionFault::Malformed);
        assert_eq!(fault(codec().decode("v1.abc.def", 7)), SessionFault::Malformed);
        assert_eq!(fault(codec().decode("v2.abc.def", 7)), SessionFault::Malformed);
    }

    #[test]
    fn test_from_hex_validates_secret() {
        assert!(SessionCodec::from_hex(&generate_secret(), 900).is_ok());
        assert!(SessionCodec::from_hex("zz", 900).is_err());
        assert!(SessionCodec::from_hex("abcd", 900).is_err());
    }
}
