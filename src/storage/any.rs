use crate::domain::Row;

#[cfg(feature = "sheets")]
use super::SheetsBackend;
use super::{Backend, BackendError, CsvFileBackend, MemoryBackend, Revision, SqliteBackend};

/// A backend chosen at runtime from configuration.
pub enum AnyBackend {
    Memory(MemoryBackend),
    Csv(CsvFileBackend),
    Sqlite(SqliteBackend),
    #[cfg(feature = "sheets")]
    Sheets(SheetsBackend),
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            AnyBackend::Memory($backend) => $call,
            AnyBackend::Csv($backend) => $call,
            AnyBackend::Sqlite($backend) => $call,
            #[cfg(feature = "sheets")]
            AnyBackend::Sheets($backend) => $call,
        }
    };
}

impl Backend for AnyBackend {
    fn name(&self) -> &'static str {
        dispatch!(self, b => b.name())
    }

    async fn read(&self) -> Result<Vec<Row>, BackendError> {
        dispatch!(self, b => b.read().await)
    }

    async fn overwrite(&self, rows: &[Row]) -> Result<(), BackendError> {
        dispatch!(self, b => b.overwrite(rows).await)
    }

    async fn append(&self, row: &Row) -> Result<(), BackendError> {
        dispatch!(self, b => b.append(row).await)
    }

    async fn read_versioned(&self) -> Result<(Vec<Row>, Revision), BackendError> {
        dispatch!(self, b => b.read_versioned().await)
    }

    async fn overwrite_if(&self, expected: Revision, rows: &[Row]) -> Result<(), BackendError> {
        dispatch!(self, b => b.overwrite_if(expected, rows).await)
    }
}
