use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::domain::Row;

/// Fingerprint of a table's content, compared before an optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision {
    pub rows: usize,
    pub digest: u64,
}

impl Revision {
    pub fn of(rows: &[Row]) -> Self {
        let mut hasher = DefaultHasher::new();
        rows.hash(&mut hasher);
        Self {
            rows: rows.len(),
            digest: hasher.finish(),
        }
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rows/{:016x}", self.rows, self.digest)
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed table: {0}")]
    Malformed(String),

    #[error("Table changed since it was read (expected {expected}, found {found})")]
    Conflict { expected: Revision, found: Revision },

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// A table-shaped store holding the ledger rows in order.
///
/// `read` and `overwrite` are required. `append` is an optional capability.
/// The versioned pair has a check-then-write default; backends that can
/// compare and swap atomically should override `overwrite_if`.
pub trait Backend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// All rows in table order.
    fn read(&self) -> impl Future<Output = Result<Vec<Row>, BackendError>> + Send;

    /// Replace the entire table content with `rows`.
    fn overwrite(&self, rows: &[Row]) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Add one row at the end of the table.
    fn append(&self, row: &Row) -> impl Future<Output = Result<(), BackendError>> + Send {
        let _ = row;
        async { Err(BackendError::Unsupported("append")) }
    }

    fn read_versioned(
        &self,
    ) -> impl Future<Output = Result<(Vec<Row>, Revision), BackendError>> + Send {
        async {
            let rows = self.read().await?;
            let revision = Revision::of(&rows);
            Ok((rows, revision))
        }
    }

    /// Overwrite only if the table still has revision `expected`.
    fn overwrite_if(
        &self,
        expected: Revision,
        rows: &[Row],
    ) -> impl Future<Output = Result<(), BackendError>> + Send {
        async move {
            let (_, found) = self.read_versioned().await?;
            if found != expected {
                return Err(BackendError::Conflict { expected, found });
            }
            self.overwrite(rows).await
        }
    }
}
