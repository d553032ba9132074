use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Kind, Transaction, parse_amount};

/// Column order shared by every table-shaped backend.
pub const COLUMNS: [&str; 5] = ["date", "type", "category", "amount", "note"];

/// A raw backend row: five text cells, exactly as the store holds them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub date: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub note: String,
}

impl Row {
    /// Build a row from cells in `COLUMNS` order. Missing trailing cells are empty.
    pub fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells = cells.into_iter().map(Into::into);
        Self {
            date: cells.next().unwrap_or_default(),
            kind: cells.next().unwrap_or_default(),
            category: cells.next().unwrap_or_default(),
            amount: cells.next().unwrap_or_default(),
            note: cells.next().unwrap_or_default(),
        }
    }

    pub fn cells(&self) -> [&str; 5] {
        [
            &self.date,
            &self.kind,
            &self.category,
            &self.amount,
            &self.note,
        ]
    }

    /// Spreadsheets hand back rows where every cell is empty.
    pub fn is_blank(&self) -> bool {
        self.cells().iter().all(|cell| cell.trim().is_empty())
    }
}

impl From<&Transaction> for Row {
    fn from(transaction: &Transaction) -> Self {
        Self {
            date: transaction
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            kind: transaction.kind.as_str().to_string(),
            category: transaction.category.clone(),
            amount: transaction.amount.to_string(),
            note: transaction.note.clone(),
        }
    }
}

/// How to treat cells that fail numeric or date coercion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Unreadable amount becomes 0, unreadable date becomes unset
    #[default]
    Permissive,
    /// Rows with an unreadable amount or date are rejected
    Strict,
}

impl RowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowPolicy::Permissive => "permissive",
            RowPolicy::Strict => "strict",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "permissive" => Some(RowPolicy::Permissive),
            "strict" => Some(RowPolicy::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowProblem {
    UnknownKind(String),
    BadAmount(String),
    BadDate(String),
}

/// A fetched row that could not be turned into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// Index of the row in backend order, blank rows included
    pub position: usize,
    pub problem: RowProblem,
}

impl std::fmt::Display for RowProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowProblem::UnknownKind(v) => write!(f, "unknown type '{}'", v),
            RowProblem::BadAmount(v) => write!(f, "unreadable amount '{}'", v),
            RowProblem::BadDate(v) => write!(f, "unreadable date '{}'", v),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.position, self.problem)
    }
}

impl std::error::Error for RowError {}

/// Parse a date cell. Besides ISO dates, sheets and dataframes write
/// timestamps (`2024-01-01 00:00:00`, RFC 3339) and day-first dates.
pub fn parse_date_cell(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    if let Ok(date) = NaiveDate::parse_from_str(cell, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(cell) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(cell, "%d/%m/%Y").ok()
}

/// Turn one non-blank row into a transaction under the given policy.
pub fn normalize_row(position: usize, row: &Row, policy: RowPolicy) -> Result<Transaction, RowError> {
    let reject = |problem| RowError { position, problem };

    let kind =
        Kind::from_str(&row.kind).ok_or_else(|| reject(RowProblem::UnknownKind(row.kind.clone())))?;

    let amount = match parse_amount(&row.amount) {
        Ok(amount) => amount,
        Err(_) if policy == RowPolicy::Permissive => 0,
        Err(_) => return Err(reject(RowProblem::BadAmount(row.amount.clone()))),
    };

    let date = match parse_date_cell(&row.date) {
        Some(date) => Some(date),
        None if policy == RowPolicy::Permissive => None,
        None => return Err(reject(RowProblem::BadDate(row.date.clone()))),
    };

    Ok(Transaction {
        date,
        kind,
        category: row.category.trim().to_string(),
        amount,
        note: row.note.clone(),
    })
}

/// Normalize a fetched table: blank rows are dropped silently, rejected rows
/// are returned separately, order is preserved.
pub fn normalize_rows(rows: &[Row], policy: RowPolicy) -> (Vec<Transaction>, Vec<RowError>) {
    let mut transactions = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (position, row) in rows.iter().enumerate() {
        if row.is_blank() {
            continue;
        }
        match normalize_row(position, row, policy) {
            Ok(transaction) => transactions.push(transaction),
            Err(err) => rejected.push(err),
        }
    }

    (transactions, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: [&str; 5]) -> Row {
        Row::from_cells(cells)
    }

    #[test]
    fn test_blank_rows() {
        assert!(Row::default().is_blank());
        assert!(row(["", "  ", "", "\t", ""]).is_blank());
        assert!(!row(["", "", "", "", "x"]).is_blank());
    }

    #[test]
    fn test_from_cells_pads_missing() {
        let r = Row::from_cells(["2024-01-01", "expense"]);
        assert_eq!(r.kind, "expense");
        assert_eq!(r.amount, "");
        assert_eq!(r.note, "");
    }

    #[test]
    fn test_parse_date_cell_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date_cell("2024-03-09"), expected);
        assert_eq!(parse_date_cell("2024-03-09 00:00:00"), expected);
        assert_eq!(parse_date_cell("2024-03-09T10:00:00+07:00"), expected);
        assert_eq!(parse_date_cell("09/03/2024"), expected);
        assert_eq!(parse_date_cell("yesterday"), None);
    }

    #[test]
    fn test_permissive_coerces_bad_cells() {
        let r = row(["not a date", "Chi", "Food", "lots", "?"]);
        let t = normalize_row(0, &r, RowPolicy::Permissive).unwrap();

        assert_eq!(t.kind, Kind::Expense);
        assert_eq!(t.amount, 0);
        assert_eq!(t.date, None);
    }

    #[test]
    fn test_strict_rejects_bad_amount() {
        let r = row(["2024-01-01", "expense", "Food", "lots", ""]);
        let err = normalize_row(4, &r, RowPolicy::Strict).unwrap_err();

        assert_eq!(err.position, 4);
        assert_eq!(err.problem, RowProblem::BadAmount("lots".into()));
    }

    #[test]
    fn test_strict_rejects_bad_date() {
        let r = row(["someday", "income", "Salary", "100", ""]);
        let err = normalize_row(0, &r, RowPolicy::Strict).unwrap_err();
        assert!(matches!(err.problem, RowProblem::BadDate(_)));
    }

    #[test]
    fn test_unknown_kind_rejected_under_any_policy() {
        let r = row(["2024-01-01", "transfer", "Food", "100", ""]);
        for policy in [RowPolicy::Permissive, RowPolicy::Strict] {
            let err = normalize_row(0, &r, policy).unwrap_err();
            assert!(matches!(err.problem, RowProblem::UnknownKind(_)));
        }
    }

    #[test]
    fn test_normalize_rows_keeps_order_and_positions() {
        let rows = vec![
            row(["2024-01-02", "income", "Salary", "100000", ""]),
            Row::default(),
            row(["2024-01-01", "bogus", "Food", "5", ""]),
            row(["2024-01-01", "expense", "Food", "30000", "rice"]),
        ];

        let (transactions, rejected) = normalize_rows(&rows, RowPolicy::Permissive);

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].amount, 100000);
        assert_eq!(transactions[1].note, "rice");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].position, 2);
    }

    #[test]
    fn test_row_from_transaction() {
        let t = Transaction {
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            kind: Kind::Income,
            category: "Salary".into(),
            amount: 100000,
            note: String::new(),
        };
        let r = Row::from(&t);
        assert_eq!(r.cells(), ["2024-01-01", "income", "Salary", "100000", ""]);
    }
}
