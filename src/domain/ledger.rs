use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Amount, Kind, Transaction};

/// Sum of amounts over all transactions of the given kind.
/// Saturates at the `Amount` bounds.
pub fn total_by_kind(ledger: &[Transaction], kind: Kind) -> Amount {
    ledger
        .iter()
        .filter(|t| t.kind == kind)
        .fold(0, |total: Amount, t| total.saturating_add(t.amount))
}

/// Balance = total income - total expense
pub fn balance(ledger: &[Transaction]) -> Amount {
    total_by_kind(ledger, Kind::Income).saturating_sub(total_by_kind(ledger, Kind::Expense))
}

/// Grouped sum per category for one kind.
/// Categories without a matching transaction are absent, not zero.
pub fn breakdown_by_category(ledger: &[Transaction], kind: Kind) -> BTreeMap<String, Amount> {
    let mut breakdown: BTreeMap<String, Amount> = BTreeMap::new();

    for transaction in ledger.iter().filter(|t| t.kind == kind) {
        let total = breakdown.entry(transaction.category.clone()).or_insert(0);
        *total = total.saturating_add(transaction.amount);
    }

    breakdown
}

/// One slice of the category-share chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub total: Amount,
    pub percentage: f64,
}

/// Everything the dashboard shows for a ledger snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_income: Amount,
    pub total_expense: Amount,
    pub balance: Amount,
    pub count: usize,
    /// Largest share first
    pub expense_by_category: Vec<CategoryShare>,
}

pub fn category_shares(ledger: &[Transaction], kind: Kind) -> Vec<CategoryShare> {
    let total = total_by_kind(ledger, kind);

    let mut shares: Vec<CategoryShare> = breakdown_by_category(ledger, kind)
        .into_iter()
        .map(|(category, amount)| CategoryShare {
            category,
            total: amount,
            percentage: if total != 0 {
                amount as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    // BTreeMap order breaks ties alphabetically; sort_by is stable
    shares.sort_by(|a, b| b.total.cmp(&a.total));
    shares
}

pub fn summarize(ledger: &[Transaction]) -> LedgerSummary {
    let total_income = total_by_kind(ledger, Kind::Income);
    let total_expense = total_by_kind(ledger, Kind::Expense);

    LedgerSummary {
        total_income,
        total_expense,
        balance: total_income.saturating_sub(total_expense),
        count: ledger.len(),
        expense_by_category: category_shares(ledger, Kind::Expense),
    }
}

/// Newest first for the history view. Undated rows go last; ties keep
/// ledger order.
pub fn history_order(ledger: &[Transaction]) -> Vec<&Transaction> {
    let mut history: Vec<&Transaction> = ledger.iter().collect();
    history.sort_by(|a, b| match (a.date, b.date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    history
}
