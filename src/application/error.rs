use std::time::Duration;

use thiserror::Error;

use crate::domain::{Amount, MAX_AMOUNT, RowError};

/// Everything the store reports to the presentation layer.
/// Backend errors arrive here as text; their types never leak out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid amount: {0} (must be greater than zero and at most {max})", max = MAX_AMOUNT)]
    InvalidAmount(Amount),

    #[error("Could not read the ledger: {0}")]
    BackendReadFailed(String),

    #[error("Save failed, please retry: {0}")]
    BackendWriteFailed(String),

    #[error("Malformed row {position}: {reason}")]
    MalformedRow { position: usize, reason: String },

    #[error("Backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Ledger kept changing during the save ({attempts} attempts), please retry")]
    Conflict { attempts: u32 },
}

impl From<RowError> for LedgerError {
    fn from(err: RowError) -> Self {
        LedgerError::MalformedRow {
            position: err.position,
            reason: err.problem.to_string(),
        }
    }
}
