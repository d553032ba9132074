use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{
    MAX_AMOUNT, Row, RowError, RowPolicy, Transaction, TransactionDraft, normalize_row,
    normalize_rows,
};
use crate::storage::{Backend, BackendError};

use super::LedgerError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How `record` and `remove_last` persist their change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Read everything, change it in memory, write everything back.
    /// Last writer wins: concurrent writers can drop each other's rows.
    #[default]
    Overwrite,
    /// Single-row append where the backend offers it, otherwise `Overwrite`.
    Append,
    /// Overwrite only if the table is unchanged since it was read, re-reading
    /// up to `max_attempts` times.
    Optimistic { max_attempts: u32 },
}

impl WriteStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteStrategy::Overwrite => "overwrite",
            WriteStrategy::Append => "append",
            WriteStrategy::Optimistic { .. } => "optimistic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub write_strategy: WriteStrategy,
    pub row_policy: RowPolicy,
    /// Upper bound for every single backend call
    pub timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            write_strategy: WriteStrategy::default(),
            row_policy: RowPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// What `remove_last` took off the end of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovedRow {
    Transaction(Transaction),
    /// The row did not normalize; it is returned as stored
    Unreadable { row: Row, error: RowError },
}

/// The only gateway between the presentation layer and the backend.
///
/// Holds no copy of the ledger: every call fetches afresh.
pub struct LedgerStore<B> {
    backend: B,
    options: StoreOptions,
}

impl<B: Backend> LedgerStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    pub fn with_options(backend: B, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // ========================
    // Queries
    // ========================

    /// The ledger for display. Fails open: if the backend cannot be read the
    /// error is logged and an empty ledger is returned.
    pub async fn current_ledger(&self) -> Vec<Transaction> {
        match self.load_ledger().await {
            Ok(ledger) => ledger,
            Err(err) => {
                warn!(backend = self.backend.name(), error = %err, "showing an empty ledger");
                Vec::new()
            }
        }
    }

    /// The ledger, or the reason it could not be read.
    pub async fn load_ledger(&self) -> Result<Vec<Transaction>, LedgerError> {
        let rows = self.read_rows().await?;
        let (ledger, rejected) = normalize_rows(&rows, self.options.row_policy);

        for issue in rejected {
            warn!(
                policy = self.options.row_policy.as_str(),
                error = %LedgerError::from(issue),
                "skipping row"
            );
        }
        debug!(rows = rows.len(), transactions = ledger.len(), "ledger loaded");
        Ok(ledger)
    }

    // ========================
    // Commands
    // ========================

    /// Validate a draft and add it at the end of the ledger.
    pub async fn record(&self, draft: TransactionDraft) -> Result<Transaction, LedgerError> {
        if draft.amount <= 0 || draft.amount > MAX_AMOUNT {
            return Err(LedgerError::InvalidAmount(draft.amount));
        }

        let mut transaction = Transaction::from(draft);
        transaction.category = transaction.category.trim().to_string();
        let row = Row::from(&transaction);

        if self.options.write_strategy == WriteStrategy::Append {
            match self.timed(self.backend.append(&row)).await? {
                Ok(()) => {
                    self.log_recorded(&transaction);
                    return Ok(transaction);
                }
                Err(BackendError::Unsupported(_)) => {
                    debug!(
                        backend = self.backend.name(),
                        "append unsupported, rewriting the table"
                    );
                }
                Err(err) => return Err(LedgerError::BackendWriteFailed(err.to_string())),
            }
        }

        self.rewrite(|rows| {
            rows.push(row.clone());
            Some(())
        })
        .await?;
        self.log_recorded(&transaction);
        Ok(transaction)
    }

    /// Drop the last non-blank row of the ledger. `None` when there was
    /// nothing to drop, in which case the backend is not written.
    pub async fn remove_last(&self) -> Result<Option<RemovedRow>, LedgerError> {
        let policy = self.options.row_policy;
        let removed = self
            .rewrite(|rows| {
                while rows.last().is_some_and(Row::is_blank) {
                    rows.pop();
                }
                let row = rows.pop()?;
                Some((rows.len(), row))
            })
            .await?;

        let Some((position, row)) = removed else {
            debug!(backend = self.backend.name(), "nothing to remove");
            return Ok(None);
        };
        info!(position, "removed last ledger row");
        Ok(Some(match normalize_row(position, &row, policy) {
            Ok(transaction) => RemovedRow::Transaction(transaction),
            Err(error) => {
                warn!(error = %error, "removed row could not be read");
                RemovedRow::Unreadable { row, error }
            }
        }))
    }

    /// Replace the ledger with an empty table. Cannot be undone.
    pub async fn reset_ledger(&self) -> Result<(), LedgerError> {
        self.write(self.backend.overwrite(&[])).await?;
        info!(backend = self.backend.name(), "ledger reset");
        Ok(())
    }

    // ========================
    // Read-modify-write
    // ========================

    /// Run `modify` over the fetched rows and persist the result, minus blank
    /// rows, with the configured strategy. When `modify` returns `None` the
    /// table is left untouched. The read here fails closed: writing back after
    /// a failed read would wipe the table.
    async fn rewrite<T, F>(&self, mut modify: F) -> Result<Option<T>, LedgerError>
    where
        F: FnMut(&mut Vec<Row>) -> Option<T>,
    {
        let WriteStrategy::Optimistic { max_attempts } = self.options.write_strategy else {
            let mut rows = self.read_rows().await?;
            let Some(out) = modify(&mut rows) else {
                return Ok(None);
            };
            rows.retain(|r| !r.is_blank());
            self.write(self.backend.overwrite(&rows)).await?;
            return Ok(Some(out));
        };
        let max_attempts = max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let (mut rows, revision) = match self.timed(self.backend.read_versioned()).await? {
                Ok(versioned) => versioned,
                Err(err) => return Err(LedgerError::BackendReadFailed(err.to_string())),
            };
            let Some(out) = modify(&mut rows) else {
                return Ok(None);
            };
            rows.retain(|r| !r.is_blank());

            match self.timed(self.backend.overwrite_if(revision, &rows)).await? {
                Ok(()) => return Ok(Some(out)),
                Err(BackendError::Conflict { expected, found }) => {
                    debug!(attempt, %expected, %found, "ledger changed during save, retrying");
                }
                Err(err) => return Err(LedgerError::BackendWriteFailed(err.to_string())),
            }
        }

        warn!(attempts = max_attempts, "giving up on a contended save");
        Err(LedgerError::Conflict {
            attempts: max_attempts,
        })
    }

    async fn read_rows(&self) -> Result<Vec<Row>, LedgerError> {
        self.timed(self.backend.read())
            .await?
            .map_err(|err| LedgerError::BackendReadFailed(err.to_string()))
    }

    async fn write<F>(&self, call: F) -> Result<(), LedgerError>
    where
        F: Future<Output = Result<(), BackendError>>,
    {
        self.timed(call)
            .await?
            .map_err(|err| LedgerError::BackendWriteFailed(err.to_string()))
    }

    async fn timed<T, F>(&self, call: F) -> Result<Result<T, BackendError>, LedgerError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        tokio::time::timeout(self.options.timeout, call)
            .await
            .map_err(|_| LedgerError::Timeout(self.options.timeout))
    }

    fn log_recorded(&self, transaction: &Transaction) {
        info!(
            backend = self.backend.name(),
            strategy = self.options.write_strategy.as_str(),
            kind = %transaction.kind,
            category = %transaction.category,
            amount = transaction.amount,
            "recorded transaction"
        );
    }
}
