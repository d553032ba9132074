use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Amount;

/// Direction of cash flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Money coming in (salary, gifts, refunds)
    Income,
    /// Money going out
    Expense,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Income => "income",
            Kind::Expense => "expense",
        }
    }

    /// Parse a kind cell. Legacy sheets use the Vietnamese labels
    /// "Thu" (income) and "Chi" (expense), so both spellings are accepted.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "thu" => Some(Kind::Income),
            "expense" | "chi" => Some(Kind::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categories offered by the input form when none are configured.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Food", "Transport", "Salary", "Shopping", "Other"];

/// A transaction as submitted by the input form, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub kind: Kind,
    pub category: String,
    pub amount: Amount,
    pub note: String,
}

impl TransactionDraft {
    pub fn new(date: NaiveDate, kind: Kind, category: impl Into<String>, amount: Amount) -> Self {
        Self {
            date,
            kind,
            category: category.into(),
            amount,
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// One income or expense event as read back from the ledger.
/// Transactions are never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// When the event happened. `None` when a stored date cell could not be read.
    pub date: Option<NaiveDate>,
    pub kind: Kind,
    pub category: String,
    /// Minor units; strictly positive for anything written through the store
    pub amount: Amount,
    /// Free-text annotation, empty when absent
    pub note: String,
}

impl From<TransactionDraft> for Transaction {
    fn from(draft: TransactionDraft) -> Self {
        Self {
            date: Some(draft.date),
            kind: draft.kind,
            category: draft.category,
            amount: draft.amount,
            note: draft.note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!(Kind::from_str("income"), Some(Kind::Income));
        assert_eq!(Kind::from_str("Expense"), Some(Kind::Expense));
        assert_eq!(Kind::from_str(" Thu "), Some(Kind::Income));
        assert_eq!(Kind::from_str("Chi"), Some(Kind::Expense));
        assert_eq!(Kind::from_str("transfer"), None);
        assert_eq!(Kind::from_str(""), None);
    }

    #[test]
    fn test_draft_into_transaction() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let draft = TransactionDraft::new(date, Kind::Expense, "Food", 50000).with_note("lunch");

        let transaction = Transaction::from(draft);

        assert_eq!(transaction.date, Some(date));
        assert_eq!(transaction.kind, Kind::Expense);
        assert_eq!(transaction.category, "Food");
        assert_eq!(transaction.amount, 50000);
        assert_eq!(transaction.note, "lunch");
    }
}
