use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStatus {
    Ok,
    NeedsClarification,
    Error,
    Empty,
}

impl PayloadStatus {
    fn from_raw(raw: &str) -> Self {
        match raw {
            "ok" => Self::Ok,
            "needs_clarification" => Self::NeedsClarification,
            "empty" => Self::Empty,
            _ => Self::Error,
        }
    }
}

/// One transaction-like item as the model wrote it. Names, not ids.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawItem {
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default, alias = "account_name", alias = "from_account")]
    pub account: Option<String>,
    #[serde(default, alias = "to_account_name")]
    pub to_account: Option<String>,
    #[serde(default, alias = "category_name")]
    pub category: Option<String>,
    #[serde(default, alias = "payee_name")]
    pub payee: Option<String>,
}

/// A category the speaker asked for, as the model wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCategory {
    #[serde(default, alias = "category_name")]
    pub name: Option<String>,
    #[serde(default, alias = "group_name")]
    pub group: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelPayload {
    pub status: PayloadStatus,
    pub message: Option<String>,
    pub transactions: Vec<RawItem>,
    pub categories: Vec<RawCategory>,
}

fn items<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Option<Vec<T>> {
    match value {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(items) => serde_json::from_value(items.clone()).ok(),
    }
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^```(?:json)?\s*|\s*```$").expect("static regex"))
}

pub fn strip_code_fence(raw: &str) -> String {
    fence_re().replace_all(raw.trim(), "").into_owned()
}

/// Turns raw model text into a payload, or `None` when no status can be read.
pub fn normalize(raw: &str) -> Option<ModelPayload> {
    let cleaned = strip_code_fence(raw);

    let parsed: Option<ModelPayload> = (|| {
        let value: Value = serde_json::from_str(&cleaned).ok()?;
        let obj = value.as_object()?;
        let status = PayloadStatus::from_raw(obj.get("status")?.as_str()?);
        let message = obj.get("message").and_then(Value::as_str).map(str::to_string);
        Some(ModelPayload {
            status,
            message,
            transactions: items(obj.get("transactions"))?,
            categories: items(obj.get("categories"))?,
        })
    })();

    if parsed.is_none() {
        tracing::warn!(response = %raw, "failed to parse model response");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_json_fence() {
        let raw = "```json\n{\"status\": \"empty\"}\n```";
        let payload = normalize(raw).unwrap();
        assert_eq!(payload.status, PayloadStatus::Empty);
        assert!(payload.transactions.is_empty());
    }

    #[test]
    fn test_strips_bare_fence() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    }

    #[test]
    fn test_unfenced_payload_with_items() {
        let raw = r#"{"status":"ok","transactions":[{"type":"expense","amount":45.5,"account":"Checking","category":"Groceries","payee":"Costco"}]}"#;
        let payload = normalize(raw).unwrap();
        assert_eq!(payload.status, PayloadStatus::Ok);
        assert_eq!(payload.transactions.len(), 1);
        let item = &payload.transactions[0];
        assert_eq!(item.kind.as_deref(), Some("expense"));
        assert_eq!(item.payee.as_deref(), Some("Costco"));
        assert!(item.to_account.is_none());
    }

    #[test]
    fn test_unknown_status_is_error() {
        let payload = normalize(r#"{"status":"maybe"}"#).unwrap();
        assert_eq!(payload.status, PayloadStatus::Error);
    }

    #[test]
    fn test_missing_status_fails() {
        assert!(normalize(r#"{"transactions":[]}"#).is_none());
        assert!(normalize(r#"{"status": 3}"#).is_none());
    }

    #[test]
    fn test_non_json_fails() {
        assert!(normalize("Sure! Here are your transactions.").is_none());
        assert!(normalize("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_error_message_is_kept() {
        let payload = normalize(r#"{"status":"error","message":"no amount"}"#).unwrap();
        assert_eq!(payload.message.as_deref(), Some("no amount"));
    }

    #[test]
    fn test_category_items() {
        let raw = r#"{"status":"ok","categories":[{"name":"Pet Food","group_name":"Pets"},{"name":"Vet"}]}"#;
        let payload = normalize(raw).unwrap();
        assert!(payload.transactions.is_empty());
        assert_eq!(payload.categories.len(), 2);
        assert_eq!(payload.categories[0].group.as_deref(), Some("Pets"));
        assert!(payload.categories[1].group.is_none());
        assert!(normalize(r#"{"status":"ok","categories":"Vet"}"#).is_none());
    }
}
