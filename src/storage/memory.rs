use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::Row;

use super::{Backend, BackendError, Revision};

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<Row>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-process table. Clones share the same rows.
///
/// Reads and writes can be made to fail on demand to exercise outage paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        let backend = Self::new();
        if let Ok(mut state) = backend.state.lock() {
            state.rows = rows;
        }
        backend
    }

    /// Snapshot of the current rows.
    pub fn rows(&self) -> Vec<Row> {
        self.lock().map(|s| s.rows.clone()).unwrap_or_default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_reads = fail;
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_writes = fail;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        self.state
            .lock()
            .map_err(|_| BackendError::Unavailable("memory table lock poisoned".to_string()))
    }

    fn writable(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        let state = self.lock()?;
        if state.fail_writes {
            return Err(BackendError::Unavailable("write refused".to_string()));
        }
        Ok(state)
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self) -> Result<Vec<Row>, BackendError> {
        let state = self.lock()?;
        if state.fail_reads {
            return Err(BackendError::Unavailable("read refused".to_string()));
        }
        Ok(state.rows.clone())
    }

    async fn overwrite(&self, rows: &[Row]) -> Result<(), BackendError> {
        self.writable()?.rows = rows.to_vec();
        Ok(())
    }

    async fn append(&self, row: &Row) -> Result<(), BackendError> {
        self.writable()?.rows.push(row.clone());
        Ok(())
    }

    async fn overwrite_if(&self, expected: Revision, rows: &[Row]) -> Result<(), BackendError> {
        let mut state = self.writable()?;
        let found = Revision::of(&state.rows);
        if found != expected {
            return Err(BackendError::Conflict { expected, found });
        }
        state.rows = rows.to_vec();
        Ok(())
    }
}
