// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cashbook::application::{LedgerStore, RemovedRow, StoreOptions, WriteStrategy};
use cashbook::domain::{Kind, Row, RowPolicy, TransactionDraft};
use cashbook::storage::{Backend, BackendError, MemoryBackend, Revision};
use chrono::NaiveDate;
use tokio::sync::Barrier;

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn expense(category: &str, amount: i64) -> TransactionDraft {
    TransactionDraft::new(parse_date("2024-01-01"), Kind::Expense, category, amount)
}

pub fn income(category: &str, amount: i64) -> TransactionDraft {
    TransactionDraft::new(parse_date("2024-01-01"), Kind::Income, category, amount)
}

pub fn options(write_strategy: WriteStrategy) -> StoreOptions {
    StoreOptions {
        write_strategy,
        row_policy: RowPolicy::Permissive,
        timeout: Duration::from_secs(5),
    }
}

/// Store over a fresh in-memory table, plus a handle on that table
pub fn memory_store(write_strategy: WriteStrategy) -> (LedgerStore<MemoryBackend>, MemoryBackend) {
    let backend = MemoryBackend::new();
    let store = LedgerStore::with_options(backend.clone(), options(write_strategy));
    (store, backend)
}

pub fn row(cells: [&str; 5]) -> Row {
    Row::from_cells(cells)
}

/// Amount of a removed transaction, `None` if nothing readable was removed
pub fn removed_amount(removed: Option<RemovedRow>) -> Option<i64> {
    match removed {
        Some(RemovedRow::Transaction(transaction)) => Some(transaction.amount),
        _ => None,
    }
}

/// Holds the first `gated` reads until all of them have completed, so
/// concurrent writers are guaranteed to start from the same snapshot.
pub struct Lockstep<B> {
    pub inner: B,
    barrier: Barrier,
    gated: AtomicUsize,
}

impl<B: Backend> Lockstep<B> {
    pub fn new(inner: B, writers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(writers),
            gated: AtomicUsize::new(writers),
        }
    }

    async fn gate(&self) {
        let gated = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
    }
}

impl<B: Backend> Backend for Lockstep<B> {
    fn name(&self) -> &'static str {
        "lockstep"
    }

    async fn read(&self) -> Result<Vec<Row>, BackendError> {
        let rows = self.inner.read().await?;
        self.gate().await;
        Ok(rows)
    }

    async fn overwrite(&self, rows: &[Row]) -> Result<(), BackendError> {
        self.inner.overwrite(rows).await
    }

    async fn append(&self, row: &Row) -> Result<(), BackendError> {
        self.inner.append(row).await
    }

    async fn read_versioned(&self) -> Result<(Vec<Row>, Revision), BackendError> {
        let versioned = self.inner.read_versioned().await?;
        self.gate().await;
        Ok(versioned)
    }

    async fn overwrite_if(&self, expected: Revision, rows: &[Row]) -> Result<(), BackendError> {
        self.inner.overwrite_if(expected, rows).await
    }
}

/// A backend that never answers.
pub struct Stalled;

impl Backend for Stalled {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn read(&self) -> Result<Vec<Row>, BackendError> {
        std::future::pending().await
    }

    async fn overwrite(&self, _rows: &[Row]) -> Result<(), BackendError> {
        std::future::pending().await
    }
}

/// A backend without the append capability, counting full rewrites.
#[derive(Default)]
pub struct OverwriteOnly {
    pub inner: MemoryBackend,
    pub overwrites: Arc<AtomicUsize>,
}

impl Backend for OverwriteOnly {
    fn name(&self) -> &'static str {
        "overwrite-only"
    }

    async fn read(&self) -> Result<Vec<Row>, BackendError> {
        self.inner.read().await
    }

    async fn overwrite(&self, rows: &[Row]) -> Result<(), BackendError> {
        self.overwrites.fetch_add(1, Ordering::SeqCst);
        self.inner.overwrite(rows).await
    }
}
