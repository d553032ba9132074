// Property tests for the ledger aggregates.
// Default 256 cases; override with PROPTEST_CASES.

use cashbook::domain::{
    Amount, Kind, MAX_AMOUNT, Transaction, balance, breakdown_by_category, history_order,
    parse_amount, summarize, total_by_kind,
};
use chrono::NaiveDate;
use proptest::prelude::*;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn arb_kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Income), Just(Kind::Expense)]
}

fn arb_category() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(vec!["Food", "Transport", "Salary", "Shopping", "Other"])
            .prop_map(String::from),
        1 => r"[A-Za-z ]{0,10}",
    ]
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        prop::option::weighted(0.9, 0u32..365),
        arb_kind(),
        arb_category(),
        1..=MAX_AMOUNT,
    )
        .prop_map(|(day, kind, category, amount)| Transaction {
            date: day.and_then(|d| {
                NaiveDate::from_ymd_opt(2024, 1, 1)
                    .and_then(|start| start.checked_add_days(chrono::Days::new(d.into())))
            }),
            kind,
            category,
            amount,
            note: String::new(),
        })
}

fn arb_ledger() -> impl Strategy<Value = Vec<Transaction>> {
    prop::collection::vec(arb_transaction(), 0..40)
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn balance_is_income_minus_expense(ledger in arb_ledger()) {
        let income = total_by_kind(&ledger, Kind::Income);
        let expense = total_by_kind(&ledger, Kind::Expense);

        prop_assert_eq!(balance(&ledger), income - expense);
        prop_assert_eq!(summarize(&ledger).balance, income - expense);
    }

    #[test]
    fn breakdown_sums_to_total(ledger in arb_ledger(), kind in arb_kind()) {
        let breakdown = breakdown_by_category(&ledger, kind);
        let sum: Amount = breakdown.values().sum();

        prop_assert_eq!(sum, total_by_kind(&ledger, kind));
        prop_assert!(breakdown.values().all(|total| *total > 0));
    }

    #[test]
    fn history_is_a_reordering_of_the_ledger(ledger in arb_ledger()) {
        let history = history_order(&ledger);

        prop_assert_eq!(history.len(), ledger.len());
        for pair in history.windows(2) {
            match (pair[0].date, pair[1].date) {
                (Some(a), Some(b)) => prop_assert!(a >= b),
                (None, Some(_)) => prop_assert!(false, "undated row before a dated one"),
                _ => {}
            }
        }
    }

    #[test]
    fn formatted_amounts_parse_back(amount in -MAX_AMOUNT..=MAX_AMOUNT) {
        let formatted = cashbook::domain::format_amount(amount);
        prop_assert_eq!(parse_amount(&formatted), Ok(amount));
    }
}
