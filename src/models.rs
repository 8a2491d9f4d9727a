use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Budget {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payee {
    pub id: i64,
    pub name: String,
    pub default_category_id: Option<i64>,
}

/// Read-only snapshot of one budget's entities, taken before extraction.
#[derive(Debug, Clone)]
pub struct BudgetView {
    pub budget_id: i64,
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub payees: Vec<Payee>,
}

impl BudgetView {
    pub fn account(&self, id: i64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn category(&self, id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn payee(&self, id: i64) -> Option<&Payee> {
        self.payees.iter().find(|p| p.id == id)
    }
}

/// Whoever is speaking. Stamped on every entry they create.
#[derive(Debug, Clone)]
pub struct Actor {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }
}

/// A row written to the ledger by the commit engine.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub kind: TransactionKind,
    pub account_id: i64,
    pub date: String,
    pub amount: f64,
    pub memo: Option<String>,
    pub category_id: Option<i64>,
    pub payee_id: Option<i64>,
    pub transfer_pair_id: Option<i64>,
}
